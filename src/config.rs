use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::arm::{AngleRange, ArmSide, JointMapping, MapError};
use crate::servo::{ChannelMap, ChannelSpec, ChannelSpecError, ServoParams};

pub const DEFAULT_REFERENCE_OFFSET: f64 = 100.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub arm: ArmConfig,
    #[serde(default)]
    pub servo: ServoConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// 0 ならドライバのデフォルト
    #[serde(default)]
    pub fps: u32,
    /// 左右反転（鏡像）して扱う
    #[serde(default = "default_true")]
    pub mirror: bool,
}

fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_true() -> bool { true }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_width(),
            height: default_height(),
            fps: 0,
            mirror: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoseConfig {
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_input_name")]
    pub input_name: String,
    /// [1, 195] ランドマーク出力
    #[serde(default = "default_landmarks_output")]
    pub landmarks_output: String,
    /// [1, 1] 人物存在スコア
    #[serde(default = "default_presence_output")]
    pub presence_output: String,
    /// 初回検出のしきい値
    #[serde(default = "default_confidence")]
    pub min_detection_confidence: f32,
    /// 追跡継続のしきい値
    #[serde(default = "default_confidence")]
    pub min_tracking_confidence: f32,
    /// 追跡開始前に人物検出でクロップする（false ならフレーム全体を使う）
    #[serde(default = "default_true")]
    pub person_detection: bool,
    #[serde(default = "default_person_model_path")]
    pub person_model_path: String,
    #[serde(default = "default_person_input_size")]
    pub person_input_size: i32,
    #[serde(default = "default_min_person_score")]
    pub min_person_score: f32,
}

fn default_model_path() -> String { "models/pose_landmark_full.onnx".to_string() }
fn default_input_name() -> String { "input_1".to_string() }
fn default_landmarks_output() -> String { "Identity".to_string() }
fn default_presence_output() -> String { "Identity_1".to_string() }
fn default_confidence() -> f32 { 0.8 }
fn default_person_model_path() -> String { "models/yolov8n.onnx".to_string() }
fn default_person_input_size() -> i32 { 640 }
fn default_min_person_score() -> f32 { 0.25 }

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            input_name: default_input_name(),
            landmarks_output: default_landmarks_output(),
            presence_output: default_presence_output(),
            min_detection_confidence: default_confidence(),
            min_tracking_confidence: default_confidence(),
            person_detection: true,
            person_model_path: default_person_model_path(),
            person_input_size: default_person_input_size(),
            min_person_score: default_min_person_score(),
        }
    }
}

/// 関節ごとの入力区間 → 出力区間
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct RangePair {
    #[serde(default)]
    pub source: AngleRange,
    #[serde(default)]
    pub target: AngleRange,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct MappingConfig {
    #[serde(default)]
    pub shoulder: RangePair,
    #[serde(default)]
    pub elbow: RangePair,
    #[serde(default)]
    pub wrist: RangePair,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArmConfig {
    #[serde(default)]
    pub side: ArmSide,
    /// 肩角度の基準にする「肩の真上」点までの距離（ピクセル）
    #[serde(default = "default_reference_offset")]
    pub reference_offset: f64,
    #[serde(default)]
    pub mapping: MappingConfig,
}

fn default_reference_offset() -> f64 { DEFAULT_REFERENCE_OFFSET }

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            side: ArmSide::Left,
            reference_offset: DEFAULT_REFERENCE_OFFSET,
            mapping: MappingConfig::default(),
        }
    }
}

impl ArmConfig {
    /// 肩・肘・手首の順
    pub fn mappings(&self) -> Result<[JointMapping; 3], MapError> {
        let m = &self.mapping;
        Ok([
            JointMapping::new(m.shoulder.source, m.shoulder.target)?,
            JointMapping::new(m.elbow.source, m.elbow.target)?,
            JointMapping::new(m.wrist.source, m.wrist.target)?,
        ])
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PinConfig {
    #[serde(default = "default_shoulder_pin")]
    pub shoulder: ChannelSpec,
    #[serde(default = "default_elbow_pin")]
    pub elbow: ChannelSpec,
    #[serde(default = "default_wrist_pin")]
    pub wrist: ChannelSpec,
    #[serde(default = "default_hand_pin")]
    pub hand: ChannelSpec,
}

fn default_shoulder_pin() -> ChannelSpec { ChannelSpec::servo(9) }
fn default_elbow_pin() -> ChannelSpec { ChannelSpec::servo(10) }
fn default_wrist_pin() -> ChannelSpec { ChannelSpec::servo(11) }
fn default_hand_pin() -> ChannelSpec { ChannelSpec::servo(12) }

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            shoulder: default_shoulder_pin(),
            elbow: default_elbow_pin(),
            wrist: default_wrist_pin(),
            hand: default_hand_pin(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServoConfig {
    /// シリアルデバイスのパス
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// 接続直後のボード再起動待ち
    #[serde(default = "default_setup_wait_ms")]
    pub setup_wait_ms: u64,
    /// パルス幅（マイクロ秒）
    #[serde(default = "default_min_pulse")]
    pub min_pulse: u16,
    #[serde(default = "default_max_pulse")]
    pub max_pulse: u16,
    /// 接続時に全チャンネルへ書き込む角度
    #[serde(default)]
    pub initial_angle: u8,
    #[serde(default)]
    pub pins: PinConfig,
}

fn default_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 57600 }
fn default_write_timeout_ms() -> u64 { 100 }
fn default_setup_wait_ms() -> u64 { 5000 }
fn default_min_pulse() -> u16 { crate::servo::firmata::DEFAULT_MIN_PULSE }
fn default_max_pulse() -> u16 { crate::servo::firmata::DEFAULT_MAX_PULSE }

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            write_timeout_ms: default_write_timeout_ms(),
            setup_wait_ms: default_setup_wait_ms(),
            min_pulse: default_min_pulse(),
            max_pulse: default_max_pulse(),
            initial_angle: 0,
            pins: PinConfig::default(),
        }
    }
}

impl ServoConfig {
    pub fn channel_map(&self) -> Result<ChannelMap, ChannelSpecError> {
        ChannelMap::new(self.pins.shoulder, self.pins.elbow, self.pins.wrist, self.pins.hand)
    }

    pub fn params(&self) -> ServoParams {
        ServoParams {
            min_pulse: self.min_pulse,
            max_pulse: self.max_pulse,
            initial_angle: self.initial_angle,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// 角度テキストとランドマークを重ねる
    #[serde(default = "default_true")]
    pub overlay: bool,
}

fn default_title() -> String { "Arm Tracking".to_string() }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            overlay: true,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// ファイルが無ければデフォルト設定。壊れたファイルはエラー。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("{} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            bail!("camera resolution must be non-zero");
        }

        for (name, value) in [
            ("min_detection_confidence", self.pose.min_detection_confidence),
            ("min_tracking_confidence", self.pose.min_tracking_confidence),
            ("min_person_score", self.pose.min_person_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("pose.{} must be within [0, 1], got {}", name, value);
            }
        }

        if self.pose.person_input_size <= 0 {
            bail!("pose.person_input_size must be positive");
        }

        if !self.arm.reference_offset.is_finite() || self.arm.reference_offset <= 0.0 {
            bail!("arm.reference_offset must be positive");
        }
        let mappings = self.arm.mappings().context("arm.mapping")?;
        for mapping in &mappings {
            let target = mapping.target();
            if !AngleRange::SERVO.contains(target.lo) || !AngleRange::SERVO.contains(target.hi) {
                bail!("arm.mapping target [{}, {}] exceeds [0, 180]", target.lo, target.hi);
            }
        }

        self.servo.channel_map().context("servo.pins")?;
        if self.servo.min_pulse >= self.servo.max_pulse {
            bail!("servo.min_pulse must be below servo.max_pulse");
        }
        // Firmata の 14bit 値に収まること
        if self.servo.max_pulse > 0x3FFF {
            bail!("servo.max_pulse must be at most {}", 0x3FFF);
        }
        if self.servo.initial_angle > 180 {
            bail!("servo.initial_angle must be at most 180");
        }

        Ok(())
    }
}
