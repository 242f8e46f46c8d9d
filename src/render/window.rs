use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc;
use opencv::prelude::*;

use super::skeleton::{
    LANDMARK_COLOR, LANDMARK_RADIUS, LINE_THICKNESS, SKELETON_COLOR, SKELETON_CONNECTIONS, TEXT_COLOR,
    VISIBILITY_THRESHOLD,
};
use super::{overlay_lines, FrameReport, Presenter};
use crate::pose::LandmarkSet;

fn scalar((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

/// minifbを使用したレンダラー
///
/// `q` キーかウィンドウを閉じると停止要求になる。
pub struct MinifbRenderer {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    overlay: bool,
}

impl MinifbRenderer {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize, overlay: bool) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        let buffer = vec![0u32; width * height];

        Ok(Self {
            window,
            buffer,
            width,
            height,
            overlay,
        })
    }

    /// ウィンドウが開いているか
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// BGR Mat をバッファにコピー
    fn draw_frame(&mut self, frame: &Mat) -> Result<()> {
        let frame_width = frame.cols() as usize;
        let frame_height = frame.rows() as usize;

        // サイズが異なる場合はクロップ/パディング
        for y in 0..self.height.min(frame_height) {
            for x in 0..self.width.min(frame_width) {
                let pixel = frame.at_2d::<opencv::core::Vec3b>(y as i32, x as i32)?;
                // BGR -> RGB -> u32
                let r = pixel[2] as u32;
                let g = pixel[1] as u32;
                let b = pixel[0] as u32;
                self.buffer[y * self.width + x] = (r << 16) | (g << 8) | b;
            }
        }

        Ok(())
    }

    /// 骨格線とランドマークを描画
    fn draw_landmarks(canvas: &mut Mat, landmarks: &LandmarkSet) -> Result<()> {
        let w = canvas.cols() as u32;
        let h = canvas.rows() as u32;
        let to_point = |index| {
            let (x, y) = landmarks.get(index).to_pixel(w, h);
            Point::new(x, y)
        };

        for (start, end) in SKELETON_CONNECTIONS.iter() {
            if landmarks.get(*start).visibility < VISIBILITY_THRESHOLD
                || landmarks.get(*end).visibility < VISIBILITY_THRESHOLD
            {
                continue;
            }
            imgproc::line(
                canvas,
                to_point(*start),
                to_point(*end),
                scalar(SKELETON_COLOR),
                LINE_THICKNESS,
                imgproc::LINE_8,
                0,
            )?;
        }

        for lm in landmarks.landmarks.iter() {
            if lm.visibility < VISIBILITY_THRESHOLD {
                continue;
            }
            let (x, y) = lm.to_pixel(w, h);
            imgproc::circle(
                canvas,
                Point::new(x, y),
                LANDMARK_RADIUS,
                scalar(LANDMARK_COLOR),
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )?;
        }

        Ok(())
    }

    fn draw_text(canvas: &mut Mat, lines: &[String]) -> Result<()> {
        for (i, line) in lines.iter().enumerate() {
            imgproc::put_text(
                canvas,
                line,
                Point::new(50, 50 + 50 * i as i32),
                imgproc::FONT_HERSHEY_SIMPLEX,
                1.0,
                scalar(TEXT_COLOR),
                2,
                imgproc::LINE_8,
                false,
            )?;
        }
        Ok(())
    }
}

impl Presenter<Mat> for MinifbRenderer {
    fn present(&mut self, frame: &Mat, report: &FrameReport<'_>) -> Result<()> {
        if !self.overlay || (report.landmarks.is_none() && report.solution.is_none()) {
            self.draw_frame(frame)?;
        } else {
            let mut canvas = frame.try_clone()?;
            if let Some(landmarks) = report.landmarks {
                Self::draw_landmarks(&mut canvas, landmarks)?;
            }
            if let Some(solution) = report.solution {
                Self::draw_text(&mut canvas, &overlay_lines(&solution.angles))?;
            }
            self.draw_frame(&canvas)?;
        }

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }

    fn stop_requested(&mut self) -> bool {
        !self.is_open() || self.is_key_pressed(Key::Q)
    }
}
