use std::f64::consts::PI;

/// ピクセル座標の2D点
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// 頂点 `b` における関節角度（度, 0〜180）
///
/// `b→a` と `b→c` の2本のレイの atan2 差から求める。
/// 180度を超えた場合は 360 から引いて折り返すので、回転方向やレイの順序に依らない。
/// 長さ0のレイ（a == b など）でも atan2(0, 0) = 0 として値を返す。
pub fn joint_angle(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let angle = (radians * 180.0 / PI).abs();

    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}
