use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs, VideoCaptureTrait},
};
use tracing::{debug, info, warn};

use super::FrameSource;
use crate::config::CameraConfig;

/// OpenCVを使用したカメラキャプチャ
pub struct OpenCvCamera {
    capture: VideoCapture,
    width: u32,
    height: u32,
    mirror: bool,
    released: bool,
}

impl OpenCvCamera {
    pub fn from_config(config: &CameraConfig) -> Result<Self> {
        let fps = (config.fps > 0).then_some(config.fps);
        Self::open_with_config(config.index, Some(config.width), Some(config.height), fps, config.mirror)
    }

    /// 解像度とFPSを指定してカメラを開く
    pub fn open_with_config(
        index: i32,
        width: Option<u32>,
        height: Option<u32>,
        fps: Option<u32>,
        mirror: bool,
    ) -> Result<Self> {
        let mut capture =
            VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32).context("Failed to open camera")?;

        if !capture.is_opened()? {
            anyhow::bail!("Camera {} is not available", index);
        }

        // 解像度を設定
        if let Some(w) = width {
            capture.set(videoio::CAP_PROP_FRAME_WIDTH, w as f64)?;
        }
        if let Some(h) = height {
            capture.set(videoio::CAP_PROP_FRAME_HEIGHT, h as f64)?;
        }
        if let Some(f) = fps {
            capture.set(videoio::CAP_PROP_FPS, f as f64)?;
        }
        capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

        let actual_width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let actual_height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let actual_fps = capture.get(videoio::CAP_PROP_FPS)?;
        info!(index, width = actual_width, height = actual_height, fps = actual_fps, "camera opened");

        Ok(Self {
            capture,
            width: actual_width,
            height: actual_height,
            mirror,
            released: false,
        })
    }
}

impl FrameSource for OpenCvCamera {
    type Frame = Mat;

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// フレームを読み込む（BGR形式, mirror 指定時は左右反転）
    fn read_frame(&mut self) -> Result<Mat> {
        if self.released {
            anyhow::bail!("Camera already released");
        }

        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if !ok || frame.empty() {
            anyhow::bail!("Empty frame received");
        }

        if !self.mirror {
            return Ok(frame);
        }
        let mut flipped = Mat::default();
        core::flip(&frame, &mut flipped, 1)?;
        Ok(flipped)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.capture.release() {
            Ok(()) => debug!("camera released"),
            Err(e) => warn!("camera release failed: {}", e),
        }
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        self.release();
    }
}
