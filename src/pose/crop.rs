use super::landmark::{Landmark, LandmarkIndex, LandmarkSet};

/// 追跡時のクロップ拡張率
pub const CROP_EXPAND: f32 = 1.25;

/// クロップ領域（正規化座標 0.0〜1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRegion {
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.width >= 1.0 && self.height >= 1.0
    }

    /// ピクセル単位の矩形 (x, y, w, h)。幅・高さは最低1。
    pub fn to_pixels(&self, frame_w: u32, frame_h: u32) -> (i32, i32, i32, i32) {
        let fw = frame_w as f32;
        let fh = frame_h as f32;
        let x = ((self.x * fw) as i32).clamp(0, frame_w as i32 - 1);
        let y = ((self.y * fh) as i32).clamp(0, frame_h as i32 - 1);
        let w = ((self.width * fw) as i32).clamp(1, (frame_w as i32 - x).max(1));
        let h = ((self.height * fh) as i32).clamp(1, (frame_h as i32 - y).max(1));
        (x, y, w, h)
    }
}

/// 人物の外接矩形（ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// visibility が閾値以上のランドマークの min/max から BBox を作る
///
/// 有効な点が2個未満ならNone。
pub fn bbox_from_landmarks(
    landmarks: &LandmarkSet,
    frame_w: u32,
    frame_h: u32,
    visibility_threshold: f32,
) -> Option<BBox> {
    let fw = frame_w as f32;
    let fh = frame_h as f32;
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut count = 0u32;

    for lm in landmarks.landmarks.iter() {
        if lm.visibility >= visibility_threshold && lm.x.is_finite() && lm.y.is_finite() {
            let px = lm.x * fw;
            let py = lm.y * fh;
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
            count += 1;
        }
    }

    if count < 2 {
        return None;
    }

    Some(BBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

/// BBox からランドマークモデル用のクロップ領域を計算
///
/// - 1.25倍に拡張し、ピクセル空間で正方形にする（中心を保持）
/// - フレーム境界にクリップ
pub fn crop_from_bbox(bbox: &BBox, frame_w: u32, frame_h: u32) -> Option<CropRegion> {
    if frame_w == 0 || frame_h == 0 {
        return None;
    }
    if !(bbox.x.is_finite() && bbox.y.is_finite() && bbox.width.is_finite() && bbox.height.is_finite()) {
        return None;
    }

    let fw = frame_w as f32;
    let fh = frame_h as f32;
    let cx = bbox.x + bbox.width / 2.0;
    let cy = bbox.y + bbox.height / 2.0;
    let side = bbox.width.max(bbox.height) * CROP_EXPAND;
    if side < 1.0 {
        return None;
    }

    let x0 = (cx - side / 2.0).clamp(0.0, fw);
    let y0 = (cy - side / 2.0).clamp(0.0, fh);
    let x1 = (cx + side / 2.0).clamp(0.0, fw);
    let y1 = (cy + side / 2.0).clamp(0.0, fh);
    if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
        return None;
    }

    Some(CropRegion {
        x: x0 / fw,
        y: y0 / fh,
        width: (x1 - x0) / fw,
        height: (y1 - y0) / fh,
    })
}

/// 前フレームのランドマークから次フレームのクロップ領域を推定
pub fn crop_from_landmarks(
    landmarks: &LandmarkSet,
    frame_w: u32,
    frame_h: u32,
    visibility_threshold: f32,
) -> Option<CropRegion> {
    let bbox = bbox_from_landmarks(landmarks, frame_w, frame_h, visibility_threshold)?;
    crop_from_bbox(&bbox, frame_w, frame_h)
}

/// クロップ画像内の正規化座標をフレーム全体の正規化座標に変換
pub fn remap_landmarks(landmarks: &LandmarkSet, crop: &CropRegion) -> LandmarkSet {
    let mut out = LandmarkSet::default();
    for i in 0..LandmarkIndex::COUNT {
        let lm = &landmarks.landmarks[i];
        out.landmarks[i] = Landmark {
            x: crop.x + lm.x * crop.width,
            y: crop.y + lm.y * crop.height,
            z: lm.z * crop.width,
            visibility: lm.visibility,
        };
    }
    out
}

#[cfg(feature = "desktop")]
pub fn crop_frame(
    frame: &opencv::core::Mat,
    crop: &CropRegion,
) -> anyhow::Result<opencv::core::Mat> {
    use opencv::{core::Rect, prelude::*};

    let (x, y, w, h) = crop.to_pixels(frame.cols() as u32, frame.rows() as u32);
    let roi = opencv::core::Mat::roi(frame, Rect::new(x, y, w, h))?;
    Ok(roi.try_clone()?)
}
