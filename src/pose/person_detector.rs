use super::crop::BBox;

/// YOLOv8 の出力 `[1, 4 + クラス数, N]`（チャネル優先）から最もスコアの高い人物を選ぶ
///
/// class 0 = person。座標はモデル入力基準のまま返す。
pub fn best_person(output: &[f32], num_detections: usize, min_score: f32) -> Option<(BBox, f32)> {
    if num_detections == 0 || output.len() < 5 * num_detections {
        return None;
    }
    let at = |channel: usize, i: usize| output[channel * num_detections + i];

    let mut best: Option<(usize, f32)> = None;
    for i in 0..num_detections {
        let score = at(4, i);
        if score >= min_score && best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }

    let (idx, score) = best?;
    let (cx, cy, w, h) = (at(0, idx), at(1, idx), at(2, idx), at(3, idx));
    Some((
        BBox {
            x: cx - w / 2.0,
            y: cy - h / 2.0,
            width: w,
            height: h,
        },
        score,
    ))
}

#[cfg(feature = "desktop")]
pub use onnx::PersonDetector;

#[cfg(feature = "desktop")]
mod onnx {
    use anyhow::{Context, Result};
    use ndarray::Array4;
    use opencv::{
        core::{Mat, Size, Vec3f, CV_32FC3},
        imgproc,
        prelude::*,
    };
    use ort::session::builder::GraphOptimizationLevel;
    use ort::session::Session;
    use ort::value::Tensor;
    use tracing::info;

    use super::best_person;
    use crate::pose::crop::BBox;

    /// YOLOv8nベースの人物検出器（追跡開始前のクロップ用）
    pub struct PersonDetector {
        session: Session,
        input_size: i32,
        min_score: f32,
    }

    impl PersonDetector {
        pub fn new(model_path: &str, input_size: i32, min_score: f32) -> Result<Self> {
            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .commit_from_file(model_path)
                .with_context(|| format!("Failed to load person detection model: {}", model_path))?;
            info!(model = model_path, input_size, "person detector loaded");
            Ok(Self {
                session,
                input_size,
                min_score,
            })
        }

        /// フレームから人物を検出し、最もスコアの高い人物のBBox（フレーム座標）を返す
        pub fn detect(&mut self, frame: &Mat) -> Result<Option<BBox>> {
            let frame_w = frame.cols();
            let frame_h = frame.rows();
            let input = self.preprocess(frame)?;

            let input_tensor = Tensor::from_array(input)?;
            let outputs = self
                .session
                .run(ort::inputs!["images" => input_tensor])
                .context("Person detection inference failed")?;

            let output: ndarray::ArrayViewD<f32> = outputs["output0"]
                .try_extract_array()
                .context("Failed to extract person detection output")?;
            let shape = output.shape();
            if shape.len() != 3 {
                anyhow::bail!("Unexpected person detection output shape: {:?}", shape);
            }
            let n = shape[2];
            let flat: Vec<f32> = output.iter().copied().collect();

            let Some((bbox, _score)) = best_person(&flat, n, self.min_score) else {
                return Ok(None);
            };

            // 入力サイズ基準 → フレーム座標
            let scale_x = frame_w as f32 / self.input_size as f32;
            let scale_y = frame_h as f32 / self.input_size as f32;
            Ok(Some(BBox {
                x: bbox.x * scale_x,
                y: bbox.y * scale_y,
                width: bbox.width * scale_x,
                height: bbox.height * scale_y,
            }))
        }

        /// BGR Mat → NCHW [1, 3, input_size, input_size]
        fn preprocess(&self, frame: &Mat) -> Result<Array4<f32>> {
            let size = self.input_size;

            let mut rgb = Mat::default();
            imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;

            let mut resized = Mat::default();
            imgproc::resize(&rgb, &mut resized, Size::new(size, size), 0.0, 0.0, imgproc::INTER_LINEAR)?;

            let mut float_mat = Mat::default();
            resized.convert_to(&mut float_mat, CV_32FC3, 1.0 / 255.0, 0.0)?;

            let s = size as usize;
            let mut tensor = Array4::<f32>::zeros((1, 3, s, s));
            for y in 0..size {
                for x in 0..size {
                    let pixel = float_mat.at_2d::<Vec3f>(y, x)?;
                    for c in 0..3 {
                        tensor[[0, c, y as usize, x as usize]] = pixel[c];
                    }
                }
            }

            Ok(tensor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 候補 [cx, cy, w, h, person] をチャネル優先に並べ替える
    fn yolo_output(candidates: &[[f32; 5]]) -> Vec<f32> {
        let n = candidates.len();
        let mut out = vec![0.0; 5 * n];
        for (i, c) in candidates.iter().enumerate() {
            for ch in 0..5 {
                out[ch * n + i] = c[ch];
            }
        }
        out
    }

    #[test]
    fn test_best_person_picks_highest_score() {
        let out = yolo_output(&[
            [100.0, 100.0, 20.0, 40.0, 0.3],
            [320.0, 300.0, 100.0, 200.0, 0.9],
            [500.0, 500.0, 10.0, 10.0, 0.1],
        ]);
        let (bbox, score) = best_person(&out, 3, 0.25).unwrap();
        assert_eq!(score, 0.9);
        assert_eq!(
            bbox,
            BBox {
                x: 270.0,
                y: 200.0,
                width: 100.0,
                height: 200.0
            }
        );
    }

    #[test]
    fn test_best_person_below_threshold() {
        let out = yolo_output(&[[100.0, 100.0, 20.0, 40.0, 0.2]]);
        assert!(best_person(&out, 1, 0.25).is_none());
    }

    #[test]
    fn test_best_person_short_output() {
        assert!(best_person(&[0.0; 4], 1, 0.0).is_none());
        assert!(best_person(&[], 0, 0.0).is_none());
    }
}
