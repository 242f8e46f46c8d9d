use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MapError {
    /// 入力側の区間幅が0（ゼロ除算）または端点が有限でない
    #[error("invalid source range [{lo}, {hi}]")]
    InvalidRange { lo: f64, hi: f64 },
    #[error("value {0} is not finite")]
    NonFinite(f64),
}

/// 角度の区間 `[lo, hi]`
///
/// 出力側は `lo > hi` でもよい（サーボを逆向きに取り付けた場合）。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct AngleRange {
    pub lo: f64,
    pub hi: f64,
}

impl AngleRange {
    pub const SERVO: AngleRange = AngleRange { lo: 0.0, hi: 180.0 };

    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    fn min(&self) -> f64 {
        self.lo.min(self.hi)
    }

    fn max(&self) -> f64 {
        self.lo.max(self.hi)
    }

    pub fn is_degenerate(&self) -> bool {
        !self.lo.is_finite() || !self.hi.is_finite() || self.lo == self.hi
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min() && value <= self.max()
    }
}

impl From<[f64; 2]> for AngleRange {
    fn from([lo, hi]: [f64; 2]) -> Self {
        Self::new(lo, hi)
    }
}

impl Default for AngleRange {
    fn default() -> Self {
        Self::SERVO
    }
}

/// `source` 区間の値を `target` 区間へ線形補間し、`target` にクランプしてから0方向に切り捨てる
pub fn map_range(value: f64, source: AngleRange, target: AngleRange) -> Result<i32, MapError> {
    if source.is_degenerate() {
        return Err(MapError::InvalidRange {
            lo: source.lo,
            hi: source.hi,
        });
    }
    if !value.is_finite() {
        return Err(MapError::NonFinite(value));
    }

    // 傾きを先に求める（恒等写像なら value がそのまま残る）
    let slope = (target.hi - target.lo) / (source.hi - source.lo);
    let out = slope * (value - source.lo) + target.lo;
    let clamped = out.clamp(target.min(), target.max());

    Ok(clamped as i32)
}

/// 関節ごとの入力区間と出力区間の組（検証済み）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMapping {
    source: AngleRange,
    target: AngleRange,
}

impl JointMapping {
    pub fn new(source: AngleRange, target: AngleRange) -> Result<Self, MapError> {
        if source.is_degenerate() {
            return Err(MapError::InvalidRange {
                lo: source.lo,
                hi: source.hi,
            });
        }
        if !target.lo.is_finite() || !target.hi.is_finite() {
            return Err(MapError::InvalidRange {
                lo: target.lo,
                hi: target.hi,
            });
        }
        Ok(Self { source, target })
    }

    pub fn identity() -> Self {
        Self {
            source: AngleRange::SERVO,
            target: AngleRange::SERVO,
        }
    }

    pub fn target(&self) -> AngleRange {
        self.target
    }

    pub fn apply(&self, degrees: f64) -> Result<i32, MapError> {
        map_range(degrees, self.source, self.target)
    }
}

impl Default for JointMapping {
    fn default() -> Self {
        Self::identity()
    }
}
