pub mod crop;
pub mod decode;
#[cfg(feature = "desktop")]
pub mod detector;
pub mod estimator;
pub mod landmark;
pub mod person_detector;
pub mod preprocess;

pub use crop::{bbox_from_landmarks, crop_from_bbox, crop_from_landmarks, remap_landmarks, BBox, CropRegion};
pub use decode::decode_landmarks;
#[cfg(feature = "desktop")]
pub use detector::LandmarkDetector;
pub use estimator::{PoseEstimator, PresenceGate};
pub use landmark::{Landmark, LandmarkIndex, LandmarkSet};
#[cfg(feature = "desktop")]
pub use preprocess::preprocess_for_landmarks;
pub use preprocess::{unletterbox_landmarks, LetterboxInfo};
