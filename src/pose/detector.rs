use anyhow::{Context, Result};
use ndarray::Array4;
use opencv::{core::Mat, prelude::*};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use super::crop::{crop_frame, crop_from_bbox, crop_from_landmarks, remap_landmarks, CropRegion};
use super::decode::decode_landmarks;
use super::estimator::{PoseEstimator, PresenceGate};
use super::landmark::LandmarkSet;
use super::person_detector::PersonDetector;
use super::preprocess::{preprocess_for_landmarks, unletterbox_landmarks, LANDMARK_INPUT_SIZE};
use crate::config::PoseConfig;

/// 追跡用クロップに含めるランドマークの visibility 下限
const CROP_VISIBILITY: f32 = 0.5;

/// 全身ランドマークモデル（ONNX）を使用した姿勢検出器
///
/// 検出できている間は前フレームのランドマーク周辺だけをクロップして推論する。
/// 追跡していないときは人物検出の BBox でクロップする。
pub struct LandmarkDetector {
    session: Session,
    person: Option<PersonDetector>,
    input_name: String,
    landmarks_output: String,
    presence_output: String,
    gate: PresenceGate,
    previous: Option<LandmarkSet>,
}

impl LandmarkDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new(config: &PoseConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&config.model_path)
            .with_context(|| format!("Failed to load ONNX model: {}", config.model_path))?;
        info!(model = %config.model_path, "pose model loaded");

        let person = if config.person_detection {
            Some(PersonDetector::new(
                &config.person_model_path,
                config.person_input_size,
                config.min_person_score,
            )?)
        } else {
            None
        };

        Ok(Self {
            session,
            person,
            input_name: config.input_name.clone(),
            landmarks_output: config.landmarks_output.clone(),
            presence_output: config.presence_output.clone(),
            gate: PresenceGate::new(config.min_detection_confidence, config.min_tracking_confidence),
            previous: None,
        })
    }

    /// 推論に使う領域を決める。人物が見つからなければ None。
    fn locate(&mut self, frame: &Mat, frame_w: u32, frame_h: u32) -> Result<Option<CropRegion>> {
        if self.gate.is_tracking() {
            let tracked = self
                .previous
                .as_ref()
                .and_then(|prev| crop_from_landmarks(prev, frame_w, frame_h, CROP_VISIBILITY));
            if tracked.is_some() {
                return Ok(tracked);
            }
            debug!("tracking crop unavailable, re-detecting");
            self.gate.reset();
            self.previous = None;
        }

        let Some(person) = self.person.as_mut() else {
            return Ok(Some(CropRegion::full()));
        };
        Ok(person
            .detect(frame)?
            .map(|bbox| crop_from_bbox(&bbox, frame_w, frame_h).unwrap_or_else(CropRegion::full)))
    }

    /// 前処理済みテンソルから (生ランドマーク, 人物存在スコア) を得る
    fn infer(&mut self, input: Array4<f32>) -> Result<(Vec<f32>, f32)> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .context("Inference failed")?;

        let landmarks: ndarray::ArrayViewD<f32> = outputs[self.landmarks_output.as_str()]
            .try_extract_array()
            .context("Failed to extract landmark tensor")?;
        let raw: Vec<f32> = landmarks.iter().copied().collect();

        let presence: ndarray::ArrayViewD<f32> = outputs[self.presence_output.as_str()]
            .try_extract_array()
            .context("Failed to extract presence tensor")?;
        let score = presence.iter().next().copied().unwrap_or(0.0);

        Ok((raw, score))
    }
}

impl PoseEstimator<Mat> for LandmarkDetector {
    fn estimate(&mut self, frame: &Mat) -> Result<Option<LandmarkSet>> {
        let frame_w = frame.cols() as u32;
        let frame_h = frame.rows() as u32;

        let Some(crop) = self.locate(frame, frame_w, frame_h)? else {
            return Ok(None);
        };

        let (input, letterbox) = if crop.is_full() {
            preprocess_for_landmarks(frame)?
        } else {
            preprocess_for_landmarks(&crop_frame(frame, &crop)?)?
        };

        let (raw, score) = self.infer(input)?;

        if !self.gate.admit(score) {
            if self.previous.take().is_some() {
                debug!(score, "pose lost");
            }
            return Ok(None);
        }

        let Some(decoded) = decode_landmarks(&raw, LANDMARK_INPUT_SIZE as usize) else {
            anyhow::bail!("Unexpected landmark tensor length: {}", raw.len());
        };
        let landmarks = remap_landmarks(&unletterbox_landmarks(&decoded, &letterbox), &crop);
        self.previous = Some(landmarks.clone());

        Ok(Some(landmarks))
    }
}
