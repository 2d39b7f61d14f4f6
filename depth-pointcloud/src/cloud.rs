//! Point cloud output
//!
//! A [`PointCloudFrame`] owns two parallel buffers: positions with confidence
//! and colors. Index `i` in one describes the same point as index `i` in the
//! other. Both are `Pod` so they upload to the GPU without repacking.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::camera::{AnchorId, Pose};
use crate::config::PointSpace;

/// Point position with the confidence of the depth sample it came from
/// (16 bytes, same layout as `ImageFormat.DEPTH_POINT_CLOUD`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub confidence: f32,
}

impl Point3D {
    pub fn new(position: Vec3, confidence: f32) -> Self {
        Self {
            x: position.x,
            y: position.y,
            z: position.z,
            confidence,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// RGB color, each channel in [0, 1]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ColorRgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl ColorRgb {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// From 8-bit channels, 255 maps to exactly 1.0.
    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        Self::new(
            rgb[0] as f32 / 255.0,
            rgb[1] as f32 / 255.0,
            rgb[2] as f32 / 255.0,
        )
    }
}

/// Anchor the frame was attached to, copied at assembly time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAnchor {
    pub id: AnchorId,
    pub pose: Pose,
}

/// Per-frame sampling counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblyStats {
    /// Pixels chosen by the budget sampler
    pub sampled: usize,
    /// Dropped for a missing or non-positive depth reading
    pub invalid_depth: usize,
    /// Dropped below the confidence threshold
    pub low_confidence: usize,
    /// Dropped because the color lookup fell outside the color image
    pub color_out_of_bounds: usize,
    /// Points in the frame
    pub emitted: usize,
}

impl AssemblyStats {
    pub fn dropped(&self) -> usize {
        self.invalid_depth + self.low_confidence + self.color_out_of_bounds
    }
}

/// Colored point cloud for one depth frame.
#[derive(Debug, Clone)]
pub struct PointCloudFrame {
    points: Vec<Point3D>,
    colors: Vec<ColorRgb>,
    timestamp_ns: u64,
    anchor: FrameAnchor,
    camera_pose: Pose,
    point_space: PointSpace,
    stats: AssemblyStats,
}

impl PointCloudFrame {
    pub(crate) fn new(
        points: Vec<Point3D>,
        colors: Vec<ColorRgb>,
        timestamp_ns: u64,
        anchor: FrameAnchor,
        camera_pose: Pose,
        point_space: PointSpace,
        stats: AssemblyStats,
    ) -> Self {
        debug_assert_eq!(points.len(), colors.len());
        Self {
            points,
            colors,
            timestamp_ns,
            anchor,
            camera_pose,
            point_space,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    pub fn colors(&self) -> &[ColorRgb] {
        &self.colors
    }

    /// Points as flat `x, y, z, confidence` quadruples
    pub fn points_as_f32(&self) -> &[f32] {
        bytemuck::cast_slice(&self.points)
    }

    /// Colors as flat `r, g, b` triples
    pub fn colors_as_f32(&self) -> &[f32] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn points_as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }

    pub fn colors_as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Point3D, &ColorRgb)> {
        self.points.iter().zip(self.colors.iter())
    }

    /// Capture time of the depth image, monotonic nanoseconds
    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    pub fn anchor(&self) -> &FrameAnchor {
        &self.anchor
    }

    /// Camera-to-world pose at capture time
    pub fn camera_pose(&self) -> &Pose {
        &self.camera_pose
    }

    pub fn point_space(&self) -> PointSpace {
        self.point_space
    }

    pub fn stats(&self) -> &AssemblyStats {
        &self.stats
    }

    /// Column-major point-cloud-to-world matrix using the anchor pose
    /// captured with the frame.
    pub fn model_matrix(&self) -> [f32; 16] {
        self.model_matrix_for(&self.anchor.pose)
    }

    /// Column-major point-cloud-to-world matrix for the anchor's current pose.
    ///
    /// Tracking keeps refining anchors after capture. Camera-space clouds ride
    /// the anchor directly. World-space clouds were baked with the capture
    /// camera pose, so only the anchor's drift since capture is applied.
    pub fn model_matrix_for(&self, anchor_pose: &Pose) -> [f32; 16] {
        match self.point_space {
            PointSpace::Camera => anchor_pose.to_column_major(),
            PointSpace::World => anchor_pose
                .compose(&self.camera_pose.inverse())
                .to_column_major(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn frame_with(point_space: PointSpace, anchor_pose: Pose, camera_pose: Pose) -> PointCloudFrame {
        PointCloudFrame::new(
            vec![
                Point3D::new(Vec3::new(1.0, 2.0, 3.0), 0.5),
                Point3D::new(Vec3::new(4.0, 5.0, 6.0), 1.0),
            ],
            vec![ColorRgb::new(1.0, 0.0, 0.0), ColorRgb::new(0.0, 0.0, 1.0)],
            42,
            FrameAnchor {
                id: AnchorId(1),
                pose: anchor_pose,
            },
            camera_pose,
            point_space,
            AssemblyStats::default(),
        )
    }

    #[test]
    fn test_struct_layout() {
        assert_eq!(std::mem::size_of::<Point3D>(), 16);
        assert_eq!(std::mem::size_of::<ColorRgb>(), 12);
    }

    #[test]
    fn test_flat_buffers() {
        let frame = frame_with(PointSpace::World, Pose::IDENTITY, Pose::IDENTITY);
        assert_eq!(frame.len(), 2);
        assert_eq!(
            frame.points_as_f32(),
            &[1.0, 2.0, 3.0, 0.5, 4.0, 5.0, 6.0, 1.0]
        );
        assert_eq!(frame.colors_as_f32(), &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(frame.points_as_bytes().len(), 32);
        assert_eq!(frame.colors_as_bytes().len(), 24);
        assert_eq!(frame.iter().len(), 2);
    }

    #[test]
    fn test_color_from_rgb8() {
        assert_eq!(ColorRgb::from_rgb8([255, 0, 0]), ColorRgb::new(1.0, 0.0, 0.0));
        let mid = ColorRgb::from_rgb8([0, 51, 102]);
        assert!((mid.g - 0.2).abs() < 1e-6);
        assert!((mid.b - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_model_matrix_world_space_at_capture_is_identity() {
        let camera = Pose::new(Quat::from_rotation_z(0.3), Vec3::new(1.0, 0.0, -2.0));
        let frame = frame_with(PointSpace::World, camera, camera);
        let m = frame.model_matrix();
        let identity = glam::Mat4::IDENTITY.to_cols_array();
        for (a, b) in m.iter().zip(identity.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_model_matrix_follows_anchor_drift() {
        let camera = Pose::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let frame = frame_with(PointSpace::World, camera, camera);
        let refined = Pose::from_translation(Vec3::new(0.5, 1.0, 0.0));
        let m = frame.model_matrix_for(&refined);
        assert!((m[12] - 0.5).abs() < 1e-6);
        assert!(m[13].abs() < 1e-6);

        let camera_space = frame_with(PointSpace::Camera, camera, camera);
        assert_eq!(camera_space.model_matrix(), camera.to_column_major());
    }
}
