pub mod camera;
pub mod landmarks;

pub use camera::{CameraConnection, FrameProcessor, VideoFeed};
pub use landmarks::{FaceLandmarks, Frame, LandmarkEstimator};
