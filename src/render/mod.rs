pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

pub use skeleton::SKELETON_CONNECTIONS;
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;

use anyhow::Result;

use crate::arm::{ArmAngles, ArmSolution};
use crate::pose::LandmarkSet;

/// 1フレーム分の表示内容
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameReport<'a> {
    pub landmarks: Option<&'a LandmarkSet>,
    pub solution: Option<&'a ArmSolution>,
}

/// 表示とオペレータ入力
pub trait Presenter<F> {
    fn present(&mut self, frame: &F, report: &FrameReport<'_>) -> Result<()>;

    /// 停止要求（`q` キーなど）があれば true
    fn stop_requested(&mut self) -> bool;
}

/// 画面に重ねる角度テキスト（整数に切り捨て）
pub fn overlay_lines(angles: &ArmAngles) -> Vec<String> {
    angles
        .joints()
        .iter()
        .map(|j| format!("{} Angle: {}", j.joint.label(), j.degrees as i32))
        .collect()
}
