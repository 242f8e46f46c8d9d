pub mod geometry;
pub mod mapping;
pub mod sampler;
pub mod solver;

pub use geometry::{joint_angle, Point2D};
pub use mapping::{map_range, AngleRange, JointMapping, MapError};
pub use sampler::{sample, ArmPoints, ArmSide};
pub use solver::{ArmAngles, ArmSolution, ArmSolver, Joint, JointAngle};
