use anyhow::Result;

use super::landmark::LandmarkSet;

/// 1フレームから全身ランドマークを推定する
///
/// 人物が見つからなかったフレームは `Ok(None)`。
pub trait PoseEstimator<F> {
    fn estimate(&mut self, frame: &F) -> Result<Option<LandmarkSet>>;
}

/// 検出/追跡の2段階しきい値
///
/// 追跡中でなければ `min_detection`、直前フレームで検出できていれば `min_tracking` を使う。
#[derive(Debug, Clone)]
pub struct PresenceGate {
    min_detection: f32,
    min_tracking: f32,
    tracking: bool,
}

impl PresenceGate {
    pub fn new(min_detection: f32, min_tracking: f32) -> Self {
        Self {
            min_detection,
            min_tracking,
            tracking: false,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// スコアを判定し、追跡状態を更新する
    pub fn admit(&mut self, score: f32) -> bool {
        let threshold = if self.tracking {
            self.min_tracking
        } else {
            self.min_detection
        };
        self.tracking = score.is_finite() && score >= threshold;
        self.tracking
    }

    pub fn reset(&mut self) {
        self.tracking = false;
    }
}
