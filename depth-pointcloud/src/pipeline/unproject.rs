//! Pixel + depth to 3D point.

use glam::Vec3;

use crate::camera::{CameraIntrinsics, Pose};
use crate::cloud::Point3D;

const MILLIMETERS_PER_METER: f32 = 1000.0;

/// One depth reading at a depth-image pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSample {
    pub row: u32,
    pub col: u32,
    pub depth_mm: f32,
    /// Normalized confidence, carried into the point unchanged
    pub confidence: f32,
}

impl DepthSample {
    /// A reading of zero (or less) means the sensor reported nothing.
    pub fn is_valid(&self) -> bool {
        self.depth_mm > 0.0 && self.depth_mm.is_finite()
    }
}

/// Pinhole unprojection into the camera frame, in meters.
#[inline]
pub fn unproject_to_camera(sample: &DepthSample, intrinsics: &CameraIntrinsics) -> Option<Vec3> {
    if !sample.is_valid() {
        return None;
    }
    let z = sample.depth_mm / MILLIMETERS_PER_METER;
    let x = (sample.col as f32 - intrinsics.cx) * z / intrinsics.fx;
    let y = (sample.row as f32 - intrinsics.cy) * z / intrinsics.fy;
    Some(Vec3::new(x, y, z))
}

/// Unproject and move into the space of `pose`.
#[inline]
pub fn unproject(sample: &DepthSample, intrinsics: &CameraIntrinsics, pose: &Pose) -> Option<Point3D> {
    let camera_point = unproject_to_camera(sample, intrinsics)?;
    Some(Point3D::new(pose.transform_point(camera_point), sample.confidence))
}
