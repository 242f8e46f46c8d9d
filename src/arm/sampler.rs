use serde::Deserialize;

use super::geometry::Point2D;
use crate::pose::{LandmarkIndex, LandmarkSet};

/// 追跡する腕
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmSide {
    #[default]
    Left,
    Right,
}

impl ArmSide {
    /// (肩, 肘, 手首, 人差し指) のランドマーク
    pub fn landmarks(self) -> [LandmarkIndex; 4] {
        match self {
            ArmSide::Left => [
                LandmarkIndex::LeftShoulder,
                LandmarkIndex::LeftElbow,
                LandmarkIndex::LeftWrist,
                LandmarkIndex::LeftIndex,
            ],
            ArmSide::Right => [
                LandmarkIndex::RightShoulder,
                LandmarkIndex::RightElbow,
                LandmarkIndex::RightWrist,
                LandmarkIndex::RightIndex,
            ],
        }
    }
}

/// 1フレーム分の腕の点（ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPoints {
    pub shoulder: Point2D,
    pub elbow: Point2D,
    pub wrist: Point2D,
    pub hand: Point2D,
}

/// ランドマークから腕の4点を取り出し、フレームサイズでピクセル座標に変換
///
/// 未検出、または座標が有限でない点があれば None。
pub fn sample(
    landmarks: Option<&LandmarkSet>,
    side: ArmSide,
    frame_width: u32,
    frame_height: u32,
) -> Option<ArmPoints> {
    let landmarks = landmarks?;
    let w = f64::from(frame_width);
    let h = f64::from(frame_height);

    let [shoulder, elbow, wrist, hand] = side.landmarks().map(|index| {
        let lm = landmarks.get(index);
        Point2D::new(f64::from(lm.x) * w, f64::from(lm.y) * h)
    });

    let points = ArmPoints {
        shoulder,
        elbow,
        wrist,
        hand,
    };
    [shoulder, elbow, wrist, hand]
        .iter()
        .all(Point2D::is_finite)
        .then_some(points)
}
