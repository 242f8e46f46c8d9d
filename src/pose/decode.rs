use super::landmark::{Landmark, LandmarkIndex, LandmarkSet};

/// ランドマーク1点あたりの値の数 (x, y, z, visibility, presence)
pub const VALUES_PER_LANDMARK: usize = 5;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// ランドマークモデルの生出力を入力画像基準の正規化座標に変換
///
/// 出力は 39 点 × 5 値（入力ピクセル単位）。先頭 33 点のみ使う。
/// visibility はロジットなので sigmoid を通す。
pub fn decode_landmarks(raw: &[f32], input_size: usize) -> Option<LandmarkSet> {
    if raw.len() < LandmarkIndex::COUNT * VALUES_PER_LANDMARK || input_size == 0 {
        return None;
    }

    let size = input_size as f32;
    let mut set = LandmarkSet::default();
    for (i, chunk) in raw.chunks_exact(VALUES_PER_LANDMARK).enumerate() {
        // 34 点目以降は補助点
        let Some(index) = LandmarkIndex::from_index(i) else {
            break;
        };
        set.set(
            index,
            Landmark {
                x: chunk[0] / size,
                y: chunk[1] / size,
                z: chunk[2] / size,
                visibility: sigmoid(chunk[3]),
            },
        );
    }

    Some(set)
}
