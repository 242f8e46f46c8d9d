use super::landmark::{Landmark, LandmarkIndex, LandmarkSet};

/// ランドマークモデルの入力サイズ
pub const LANDMARK_INPUT_SIZE: i32 = 256;

/// アスペクト比を保ったまま正方形入力へ縮小したときの配置情報
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    pub input_size: i32,
    pub scaled_w: i32,
    pub scaled_h: i32,
    pub pad_x: i32,
    pub pad_y: i32,
}

impl LetterboxInfo {
    pub fn fit(src_w: i32, src_h: i32, input_size: i32) -> Self {
        let scale = (input_size as f32 / src_w.max(1) as f32).min(input_size as f32 / src_h.max(1) as f32);
        let scaled_w = ((src_w as f32 * scale).round() as i32).clamp(1, input_size);
        let scaled_h = ((src_h as f32 * scale).round() as i32).clamp(1, input_size);
        Self {
            input_size,
            scaled_w,
            scaled_h,
            pad_x: (input_size - scaled_w) / 2,
            pad_y: (input_size - scaled_h) / 2,
        }
    }

    /// 入力画像基準の正規化座標 → 元画像基準の正規化座標
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        let size = self.input_size as f32;
        let ux = (x * size - self.pad_x as f32) / self.scaled_w as f32;
        let uy = (y * size - self.pad_y as f32) / self.scaled_h as f32;
        (ux, uy)
    }
}

/// レターボックスを外したランドマークを返す
pub fn unletterbox_landmarks(landmarks: &LandmarkSet, info: &LetterboxInfo) -> LandmarkSet {
    let mut out = LandmarkSet::default();
    for i in 0..LandmarkIndex::COUNT {
        let lm = &landmarks.landmarks[i];
        let (x, y) = info.unmap(lm.x, lm.y);
        out.landmarks[i] = Landmark {
            x,
            y,
            z: lm.z * info.input_size as f32 / info.scaled_w as f32,
            visibility: lm.visibility,
        };
    }
    out
}

/// OpenCV Mat をランドマークモデル用の入力テンソルに変換
///
/// - BGR -> RGB
/// - アスペクト比を保って 256x256 にレターボックス（黒パディング）
/// - [1, 256, 256, 3] の f32 テンソル (0.0-1.0)
#[cfg(feature = "desktop")]
pub fn preprocess_for_landmarks(
    frame: &opencv::core::Mat,
) -> anyhow::Result<(ndarray::Array4<f32>, LetterboxInfo)> {
    use ndarray::Array4;
    use opencv::{
        core::{self, AlgorithmHint, Mat, Scalar, Size, CV_32FC3},
        imgproc,
        prelude::*,
    };

    let info = LetterboxInfo::fit(frame.cols(), frame.rows(), LANDMARK_INPUT_SIZE);

    let mut rgb = Mat::default();
    imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(info.scaled_w, info.scaled_h),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut padded = Mat::default();
    core::copy_make_border(
        &resized,
        &mut padded,
        info.pad_y,
        LANDMARK_INPUT_SIZE - info.scaled_h - info.pad_y,
        info.pad_x,
        LANDMARK_INPUT_SIZE - info.scaled_w - info.pad_x,
        core::BORDER_CONSTANT,
        Scalar::all(0.0),
    )?;

    let mut float_mat = Mat::default();
    padded.convert_to(&mut float_mat, CV_32FC3, 1.0 / 255.0, 0.0)?;

    let size = LANDMARK_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));

    for y in 0..LANDMARK_INPUT_SIZE {
        for x in 0..LANDMARK_INPUT_SIZE {
            let pixel = float_mat.at_2d::<core::Vec3f>(y, x)?;
            tensor[[0, y as usize, x as usize, 0]] = pixel[0];
            tensor[[0, y as usize, x as usize, 1]] = pixel[1];
            tensor[[0, y as usize, x as usize, 2]] = pixel[2];
        }
    }

    Ok((tensor, info))
}
