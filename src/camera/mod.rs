#[cfg(feature = "desktop")]
pub mod capture;

#[cfg(feature = "desktop")]
pub use capture::OpenCvCamera;

use anyhow::Result;

/// フレームの供給元
///
/// `read_frame` の失敗はストリーム終端として扱われる。
/// `release` は何度呼ばれてもよい。
pub trait FrameSource {
    type Frame;

    fn resolution(&self) -> (u32, u32);

    fn read_frame(&mut self) -> Result<Self::Frame>;

    fn release(&mut self);
}
