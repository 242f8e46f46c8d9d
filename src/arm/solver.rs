use super::geometry::joint_angle;
use super::mapping::{JointMapping, MapError};
use super::sampler::{sample, ArmPoints, ArmSide};
use crate::config::ArmConfig;
use crate::pose::LandmarkSet;
use crate::servo::{ServoChannel, ServoCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Shoulder,
    Elbow,
    Wrist,
}

impl Joint {
    /// 送信順
    pub const ALL: [Joint; 3] = [Joint::Shoulder, Joint::Elbow, Joint::Wrist];

    pub fn channel(self) -> ServoChannel {
        match self {
            Joint::Shoulder => ServoChannel::Shoulder,
            Joint::Elbow => ServoChannel::Elbow,
            Joint::Wrist => ServoChannel::Wrist,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Joint::Shoulder => "Shoulder",
            Joint::Elbow => "Elbow",
            Joint::Wrist => "Wrist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngle {
    pub joint: Joint,
    pub degrees: f64,
}

/// 1フレーム分の3関節角度（度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmAngles {
    pub shoulder: f64,
    pub elbow: f64,
    pub wrist: f64,
}

impl ArmAngles {
    /// 肩: 肩の真上の参照点との角度 / 肘: 肩-肘-手首 / 手首: 肘-手首-人差し指
    pub fn from_points(points: &ArmPoints, reference_offset: f64) -> Self {
        let up = points.shoulder.offset(0.0, -reference_offset);
        Self {
            shoulder: joint_angle(points.elbow, points.shoulder, up),
            elbow: joint_angle(points.shoulder, points.elbow, points.wrist),
            wrist: joint_angle(points.elbow, points.wrist, points.hand),
        }
    }

    pub fn get(&self, joint: Joint) -> f64 {
        match joint {
            Joint::Shoulder => self.shoulder,
            Joint::Elbow => self.elbow,
            Joint::Wrist => self.wrist,
        }
    }

    pub fn joints(&self) -> [JointAngle; 3] {
        Joint::ALL.map(|joint| JointAngle {
            joint,
            degrees: self.get(joint),
        })
    }
}

/// 1フレームの解析結果
#[derive(Debug, Clone, PartialEq)]
pub struct ArmSolution {
    pub points: ArmPoints,
    pub angles: ArmAngles,
    /// 肩・肘・手首の順
    pub commands: [ServoCommand; 3],
}

/// ランドマーク → 腕の点 → 関節角度 → サーボ指令値
#[derive(Debug, Clone)]
pub struct ArmSolver {
    side: ArmSide,
    reference_offset: f64,
    mappings: [JointMapping; 3],
}

impl ArmSolver {
    pub fn new(side: ArmSide, reference_offset: f64, mappings: [JointMapping; 3]) -> Self {
        Self {
            side,
            reference_offset,
            mappings,
        }
    }

    pub fn from_config(config: &ArmConfig) -> Result<Self, MapError> {
        Ok(Self::new(config.side, config.reference_offset, config.mappings()?))
    }

    pub fn side(&self) -> ArmSide {
        self.side
    }

    pub fn points(&self, landmarks: Option<&LandmarkSet>, frame_w: u32, frame_h: u32) -> Option<ArmPoints> {
        sample(landmarks, self.side, frame_w, frame_h)
    }

    pub fn commands(&self, angles: &ArmAngles) -> Result<[ServoCommand; 3], MapError> {
        let mut commands = [ServoCommand::new(ServoChannel::Shoulder, 0); 3];
        for (i, joint) in Joint::ALL.into_iter().enumerate() {
            let value = self.mappings[i].apply(angles.get(joint))?;
            commands[i] = ServoCommand::new(joint.channel(), value);
        }
        Ok(commands)
    }

    /// 未検出なら `Ok(None)`
    pub fn solve(
        &self,
        landmarks: Option<&LandmarkSet>,
        frame_w: u32,
        frame_h: u32,
    ) -> Result<Option<ArmSolution>, MapError> {
        let Some(points) = self.points(landmarks, frame_w, frame_h) else {
            return Ok(None);
        };
        let angles = ArmAngles::from_points(&points, self.reference_offset);
        let commands = self.commands(&angles)?;
        Ok(Some(ArmSolution {
            points,
            angles,
            commands,
        }))
    }
}

impl Default for ArmSolver {
    fn default() -> Self {
        Self::new(
            ArmSide::default(),
            crate::config::DEFAULT_REFERENCE_OFFSET,
            [JointMapping::identity(); 3],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::geometry::Point2D;
    use crate::arm::mapping::AngleRange;
    use crate::pose::{Landmark, LandmarkIndex};

    /// 肩 (640,300) 肘 (640,450) 手首 (700,450), 1280x720
    fn right_angle_elbow() -> LandmarkSet {
        let mut set = LandmarkSet::default();
        set.set(LandmarkIndex::LeftShoulder, Landmark::new(0.5, 300.0 / 720.0, 0.9));
        set.set(LandmarkIndex::LeftElbow, Landmark::new(0.5, 0.625, 0.9));
        set.set(LandmarkIndex::LeftWrist, Landmark::new(700.0 / 1280.0, 0.625, 0.9));
        set.set(LandmarkIndex::LeftIndex, Landmark::new(760.0 / 1280.0, 0.625, 0.9));
        set
    }

    #[test]
    fn test_elbow_right_angle_end_to_end() {
        let solver = ArmSolver::default();
        let set = right_angle_elbow();
        let solution = solver.solve(Some(&set), 1280, 720).unwrap().unwrap();

        assert!((solution.angles.elbow - 90.0).abs() < 1e-3, "elbow = {}", solution.angles.elbow);
        assert_eq!(solution.commands[1], ServoCommand { channel: ServoChannel::Elbow, value: 90 });
    }

    #[test]
    fn test_shoulder_uses_vertical_reference() {
        let solver = ArmSolver::default();
        let set = right_angle_elbow();
        let solution = solver.solve(Some(&set), 1280, 720).unwrap().unwrap();

        // 肘が肩の真下 → 真上の参照点と反対方向
        assert!((solution.angles.shoulder - 180.0).abs() < 1e-3);
        // 肘-手首-指が一直線
        assert!((solution.angles.wrist - 180.0).abs() < 1e-3);
        assert_eq!(solution.commands[0].value, 180);
        assert_eq!(solution.commands[2].value, 180);
    }

    #[test]
    fn test_command_order_and_channels() {
        let solver = ArmSolver::default();
        let solution = solver.solve(Some(&right_angle_elbow()), 1280, 720).unwrap().unwrap();
        let channels: Vec<ServoChannel> = solution.commands.iter().map(|c| c.channel).collect();
        assert_eq!(
            channels,
            vec![ServoChannel::Shoulder, ServoChannel::Elbow, ServoChannel::Wrist]
        );
    }

    #[test]
    fn test_absent_landmarks_produce_nothing() {
        let solver = ArmSolver::default();
        assert_eq!(solver.solve(None, 1280, 720), Ok(None));
    }

    #[test]
    fn test_same_input_same_commands() {
        let solver = ArmSolver::default();
        let set = right_angle_elbow();
        let first = solver.solve(Some(&set), 1280, 720).unwrap().unwrap();
        let second = solver.solve(Some(&set), 1280, 720).unwrap().unwrap();
        assert_eq!(first.commands, second.commands);
        assert_eq!(first.angles, second.angles);
    }

    #[test]
    fn test_custom_mapping_applied_per_joint() {
        let half = JointMapping::new(AngleRange::SERVO, AngleRange::new(0.0, 90.0)).unwrap();
        let solver = ArmSolver::new(
            ArmSide::Left,
            100.0,
            [JointMapping::identity(), half, JointMapping::identity()],
        );
        let solution = solver.solve(Some(&right_angle_elbow()), 1280, 720).unwrap().unwrap();
        assert_eq!(solution.commands[1].value, 45);
    }

    #[test]
    fn test_diagonal_angle_keeps_exact_degree() {
        let b = Point2D::new(640.0, 450.0);
        let angle = joint_angle(Point2D::new(628.0, 438.0), b, Point2D::new(628.0, 450.0));
        assert_eq!(JointMapping::identity().apply(angle), Ok(45));
    }

    #[test]
    fn test_axis_and_diagonal_rays_map_to_exact_degrees() {
        // (dx, dy, 向き[度])
        const DIRS: [(f64, f64, i32); 8] = [
            (1.0, 0.0, 0),
            (1.0, 1.0, 45),
            (0.0, 1.0, 90),
            (-1.0, 1.0, 135),
            (-1.0, 0.0, 180),
            (-1.0, -1.0, 225),
            (0.0, -1.0, 270),
            (1.0, -1.0, 315),
        ];
        let b = Point2D::new(640.0, 450.0);
        let identity = JointMapping::identity();
        for (ax, ay, ta) in DIRS {
            for (cx, cy, tc) in DIRS {
                let diff = (ta - tc).abs();
                let expected = if diff > 180 { 360 - diff } else { diff };
                for k in 1..=12 {
                    for m in 1..=12 {
                        let (k, m) = (k as f64, m as f64);
                        let a = b.offset(ax * k, ay * k);
                        let c = b.offset(cx * m, cy * m);
                        assert_eq!(
                            identity.apply(joint_angle(a, b, c)),
                            Ok(expected),
                            "a = {:?}, c = {:?}",
                            a,
                            c
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_diagonal_elbow_end_to_end() {
        // 1024 で割り切れる座標なので正規化しても誤差が出ない
        let mut set = LandmarkSet::default();
        set.set(LandmarkIndex::LeftShoulder, Landmark::new(628.0 / 1024.0, 438.0 / 1024.0, 0.9));
        set.set(LandmarkIndex::LeftElbow, Landmark::new(640.0 / 1024.0, 450.0 / 1024.0, 0.9));
        set.set(LandmarkIndex::LeftWrist, Landmark::new(628.0 / 1024.0, 450.0 / 1024.0, 0.9));
        set.set(LandmarkIndex::LeftIndex, Landmark::new(600.0 / 1024.0, 450.0 / 1024.0, 0.9));

        let solution = ArmSolver::default().solve(Some(&set), 1024, 1024).unwrap().unwrap();
        assert_eq!(solution.points.elbow, Point2D::new(640.0, 450.0));
        assert_eq!(solution.commands[1], ServoCommand::new(ServoChannel::Elbow, 45));
        assert_eq!(solution.commands[2].value, 180);
    }

    #[test]
    fn test_angles_joints_listing() {
        let angles = ArmAngles {
            shoulder: 10.0,
            elbow: 20.0,
            wrist: 30.0,
        };
        let joints = angles.joints();
        assert_eq!(joints[0].joint, Joint::Shoulder);
        assert_eq!(joints[2].degrees, 30.0);
    }
}
