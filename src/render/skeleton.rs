use crate::pose::LandmarkIndex;
use crate::pose::LandmarkIndex::*;

/// 骨格の接続定義 (開始ランドマーク, 終了ランドマーク)
pub const SKELETON_CONNECTIONS: [(LandmarkIndex, LandmarkIndex); 35] = [
    // 顔
    (Nose, LeftEyeInner),
    (LeftEyeInner, LeftEye),
    (LeftEye, LeftEyeOuter),
    (LeftEyeOuter, LeftEar),
    (Nose, RightEyeInner),
    (RightEyeInner, RightEye),
    (RightEye, RightEyeOuter),
    (RightEyeOuter, RightEar),
    (MouthLeft, MouthRight),
    // 上半身
    (LeftShoulder, RightShoulder),
    (LeftShoulder, LeftElbow),
    (LeftElbow, LeftWrist),
    (LeftWrist, LeftPinky),
    (LeftWrist, LeftIndex),
    (LeftWrist, LeftThumb),
    (LeftPinky, LeftIndex),
    (RightShoulder, RightElbow),
    (RightElbow, RightWrist),
    (RightWrist, RightPinky),
    (RightWrist, RightIndex),
    (RightWrist, RightThumb),
    (RightPinky, RightIndex),
    // 胴体
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    (LeftHip, RightHip),
    // 下半身
    (LeftHip, LeftKnee),
    (RightHip, RightKnee),
    (LeftKnee, LeftAnkle),
    (RightKnee, RightAnkle),
    (LeftAnkle, LeftHeel),
    (RightAnkle, RightHeel),
    (LeftHeel, LeftFootIndex),
    (RightHeel, RightFootIndex),
    (LeftAnkle, LeftFootIndex),
    (RightAnkle, RightFootIndex),
];

/// この visibility 未満の点と線は描かない
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// ランドマークの色 (B, G, R): 黄色
pub const LANDMARK_COLOR: (f64, f64, f64) = (0.0, 255.0, 255.0);

/// 骨格線の色 (B, G, R): 黒
pub const SKELETON_COLOR: (f64, f64, f64) = (0.0, 0.0, 0.0);

/// 角度テキストの色 (B, G, R): 青
pub const TEXT_COLOR: (f64, f64, f64) = (255.0, 0.0, 0.0);

pub const LINE_THICKNESS: i32 = 4;
pub const LANDMARK_RADIUS: i32 = 7;
