//! Camera model and tracking handles
//!
//! Intrinsics and poses are owned by the tracking side. The pipeline only
//! borrows them for one frame and keeps value snapshots in its output.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{PointCloudError, Result};

/// Pinhole intrinsics in pixels for an image of `width` x `height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length X
    pub fx: f32,
    /// Focal length Y
    pub fy: f32,
    /// Principal point X
    pub cx: f32,
    /// Principal point Y
    pub cy: f32,
    /// Image width the intrinsics were reported for
    pub width: u32,
    /// Image height the intrinsics were reported for
    pub height: u32,
}

impl CameraIntrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    /// Reject intrinsics that cannot unproject anything.
    pub fn validate(&self) -> Result<()> {
        if !self.fx.is_finite() || !self.fy.is_finite() {
            return Err(PointCloudError::DegenerateIntrinsics("focal length is not finite"));
        }
        if self.fx == 0.0 || self.fy == 0.0 {
            return Err(PointCloudError::DegenerateIntrinsics("focal length is zero"));
        }
        if !self.cx.is_finite() || !self.cy.is_finite() {
            return Err(PointCloudError::DegenerateIntrinsics("principal point is not finite"));
        }
        Ok(())
    }

    /// Rescale to another resolution of the same sensor.
    ///
    /// Tracking usually reports intrinsics for the color texture; the depth
    /// image is smaller and needs them scaled per axis.
    pub fn scaled_to(&self, width: u32, height: u32) -> Self {
        if self.width == 0 || self.height == 0 {
            return *self;
        }
        let sx = width as f32 / self.width as f32;
        let sy = height as f32 / self.height as f32;
        Self {
            fx: self.fx * sx,
            fy: self.fy * sy,
            cx: self.cx * sx,
            cy: self.cy * sy,
            width,
            height,
        }
    }
}

/// Rigid transform from a local frame into world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub fn new(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation: rotation.normalize(),
            translation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            translation,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.rotation.is_finite() && self.translation.is_finite()
    }

    /// Map a point from the local frame into world space.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// `self` applied after `other`.
    pub fn compose(&self, other: &Pose) -> Self {
        Self {
            rotation: (self.rotation * other.rotation).normalize(),
            translation: self.transform_point(other.translation),
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Linearized column-major 4x4 matrix, the layout GPU uniforms expect.
    pub fn to_column_major(&self) -> [f32; 16] {
        self.to_matrix().to_cols_array()
    }
}

/// Camera state at the moment the depth image was captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureCamera {
    /// Intrinsics matching the depth image resolution
    pub intrinsics: CameraIntrinsics,
    /// Camera-to-world pose
    pub pose: Pose,
}

impl CaptureCamera {
    pub fn new(intrinsics: CameraIntrinsics, pose: Pose) -> Self {
        Self { intrinsics, pose }
    }
}

/// Tracking state reported for an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingState {
    #[default]
    Tracking,
    /// Tracking lost for now, may resume
    Paused,
    /// Anchor detached, will never resume
    Stopped,
}

/// Identifier of an anchor owned by the tracking side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub u64);

/// Borrowed view of an anchor, valid for a single frame.
#[derive(Debug, Clone, Copy)]
pub struct AnchorHandle<'a> {
    id: AnchorId,
    pose: &'a Pose,
    state: TrackingState,
}

impl<'a> AnchorHandle<'a> {
    pub fn new(id: AnchorId, pose: &'a Pose, state: TrackingState) -> Self {
        Self { id, pose, state }
    }

    pub fn id(&self) -> AnchorId {
        self.id
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    /// Tracked and holding a usable transform.
    pub fn is_valid(&self) -> bool {
        self.state == TrackingState::Tracking && self.pose.is_finite()
    }

    /// Copy of the anchor pose, if the handle is valid.
    pub fn pose(&self) -> Option<Pose> {
        self.is_valid().then_some(*self.pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_intrinsics_validation() {
        assert!(CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 640, 480).validate().is_ok());
        assert!(CameraIntrinsics::new(0.0, 500.0, 320.0, 240.0, 640, 480).validate().is_err());
        assert!(CameraIntrinsics::new(500.0, f32::NAN, 320.0, 240.0, 640, 480).validate().is_err());
        assert!(CameraIntrinsics::new(500.0, 500.0, f32::INFINITY, 240.0, 640, 480).validate().is_err());
    }

    #[test]
    fn test_intrinsics_scaling() {
        let intrinsics = CameraIntrinsics::new(1000.0, 900.0, 640.0, 360.0, 1280, 720);
        let scaled = intrinsics.scaled_to(160, 90);
        assert_eq!(scaled.fx, 125.0);
        assert_eq!(scaled.fy, 112.5);
        assert_eq!(scaled.cx, 80.0);
        assert_eq!(scaled.cy, 45.0);
        assert_eq!((scaled.width, scaled.height), (160, 90));
    }

    #[test]
    fn test_pose_inverse_round_trip() {
        let pose = Pose::new(
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let p = Vec3::new(0.5, -1.0, 2.0);
        let back = pose.inverse().transform_point(pose.transform_point(p));
        assert!(approx(back, p));
        assert!(approx(pose.compose(&pose.inverse()).translation, Vec3::ZERO));
    }

    #[test]
    fn test_column_major_layout() {
        let pose = Pose::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let m = pose.to_column_major();
        // Translation lives in the last column.
        assert_eq!(&m[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(m[15], 1.0);
        assert_eq!(m[0], 1.0);
    }

    #[test]
    fn test_anchor_handle_validity() {
        let pose = Pose::IDENTITY;
        let tracked = AnchorHandle::new(AnchorId(7), &pose, TrackingState::Tracking);
        assert!(tracked.is_valid());
        assert_eq!(tracked.pose(), Some(Pose::IDENTITY));
        assert_eq!(tracked.id(), AnchorId(7));

        let paused = AnchorHandle::new(AnchorId(7), &pose, TrackingState::Paused);
        assert!(!paused.is_valid());
        assert_eq!(paused.pose(), None);

        let broken = Pose::from_translation(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(!AnchorHandle::new(AnchorId(8), &broken, TrackingState::Tracking).is_valid());
    }
}
