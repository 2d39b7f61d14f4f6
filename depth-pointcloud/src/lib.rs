//! Depth Point Cloud - budgeted colored point clouds from AR depth frames
//!
//! Turns one depth image, its confidence map and the matching color image into
//! a world-space point cloud of at most `max_points` points, each carrying the
//! confidence of its depth sample and the color seen at that pixel. Frames are
//! tagged with the anchor and camera pose they were captured under so they can
//! be re-posed as tracking refines.

pub mod camera;
pub mod cloud;
pub mod config;
pub mod error;
pub mod frame;
pub mod pipeline;

pub use camera::{AnchorHandle, AnchorId, CameraIntrinsics, CaptureCamera, Pose, TrackingState};
pub use cloud::{AssemblyStats, ColorRgb, FrameAnchor, Point3D, PointCloudFrame};
pub use config::{PointCloudConfig, PointSpace, DEFAULT_MAX_POINTS};
pub use error::{NotYetAvailable, PointCloudError, Result};
pub use frame::{ColorSource, ConfidenceImage, DepthEncoding, DepthImage, FrameInputs, FrameSource};
pub use pipeline::{BudgetSampler, PointCloudAssembler, ProduceResult};
