//! Point cloud assembly
//!
//! Drives sampling, unprojection and color matching over one depth frame and
//! packs the result into parallel buffers. Stateless: every call stands alone.

use rayon::prelude::*;

use crate::camera::{AnchorHandle, CaptureCamera, Pose};
use crate::cloud::{AssemblyStats, ColorRgb, FrameAnchor, Point3D, PointCloudFrame};
use crate::config::{PointCloudConfig, PointSpace};
use crate::error::{NotYetAvailable, PointCloudError, Result};
use crate::frame::{ColorSource, ConfidenceImage, DepthImage, FrameSource};

use super::color::match_color;
use super::sampler::{BudgetSampler, PixelCoord};
use super::unproject::{unproject, DepthSample};

/// Outcome of one [`PointCloudAssembler::produce`] call.
#[derive(Debug)]
pub enum ProduceResult {
    Frame(PointCloudFrame),
    /// Inputs or tracking not available yet. Expected during startup.
    NotReady,
    /// The caller handed over inconsistent data.
    Error(PointCloudError),
}

impl ProduceResult {
    pub fn is_frame(&self) -> bool {
        matches!(self, ProduceResult::Frame(_))
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, ProduceResult::NotReady)
    }

    pub fn frame(self) -> Option<PointCloudFrame> {
        match self {
            ProduceResult::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// `Ok(None)` for not ready.
    pub fn into_result(self) -> Result<Option<PointCloudFrame>> {
        match self {
            ProduceResult::Frame(frame) => Ok(Some(frame)),
            ProduceResult::NotReady => Ok(None),
            ProduceResult::Error(err) => Err(err),
        }
    }
}

/// Why a sampled pixel produced no point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dropped {
    InvalidDepth,
    LowConfidence,
    ColorOutOfBounds,
}

type PixelOutcome = std::result::Result<(Point3D, ColorRgb), Dropped>;

/// Read-only state shared by every pixel of one call.
struct PixelContext<'a, C: ColorSource + ?Sized> {
    depth: &'a DepthImage<'a>,
    confidence: &'a ConfidenceImage<'a>,
    color: &'a C,
    camera: &'a CaptureCamera,
    /// Pose applied to camera-space points
    output_pose: Pose,
    min_confidence: f32,
}

impl<C: ColorSource + ?Sized> PixelContext<'_, C> {
    #[inline]
    fn process(&self, coord: PixelCoord) -> PixelOutcome {
        let PixelCoord { col, row } = coord;
        let sample = DepthSample {
            row,
            col,
            depth_mm: self.depth.depth_mm(col, row).ok_or(Dropped::InvalidDepth)?,
            confidence: self.confidence.confidence(col, row).unwrap_or(0.0),
        };
        if !sample.is_valid() {
            return Err(Dropped::InvalidDepth);
        }
        if sample.confidence < self.min_confidence {
            return Err(Dropped::LowConfidence);
        }
        let point = unproject(&sample, &self.camera.intrinsics, &self.output_pose)
            .ok_or(Dropped::InvalidDepth)?;
        let color = match_color(col, row, self.depth.dimensions(), self.color)
            .ok_or(Dropped::ColorOutOfBounds)?;
        Ok((point, color))
    }
}

/// Output buffers sized to the sample count up front.
struct Collector {
    points: Vec<Point3D>,
    colors: Vec<ColorRgb>,
    stats: AssemblyStats,
}

impl Collector {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
            stats: AssemblyStats {
                sampled: capacity,
                ..Default::default()
            },
        }
    }

    #[inline]
    fn push(&mut self, outcome: PixelOutcome) {
        match outcome {
            Ok((point, color)) => {
                self.points.push(point);
                self.colors.push(color);
            }
            Err(Dropped::InvalidDepth) => self.stats.invalid_depth += 1,
            Err(Dropped::LowConfidence) => self.stats.low_confidence += 1,
            Err(Dropped::ColorOutOfBounds) => self.stats.color_out_of_bounds += 1,
        }
    }
}

/// Everything a [`FrameSource`] has to deliver for one frame.
struct Acquired<'s, C: ?Sized> {
    depth: DepthImage<'s>,
    confidence: ConfidenceImage<'s>,
    color: &'s C,
    camera: CaptureCamera,
    anchor: AnchorHandle<'s>,
}

impl<'s, C: ColorSource + ?Sized> Acquired<'s, C> {
    fn from_source<S>(source: &'s S) -> std::result::Result<Self, NotYetAvailable>
    where
        S: FrameSource<Color = C> + ?Sized,
    {
        Ok(Self {
            depth: source.depth()?,
            confidence: source.confidence()?,
            color: source.color()?,
            camera: source.camera()?,
            anchor: source.anchor()?,
        })
    }
}

/// Builds a [`PointCloudFrame`] from depth, confidence and color.
#[derive(Debug, Clone, Default)]
pub struct PointCloudAssembler {
    config: PointCloudConfig,
}

impl PointCloudAssembler {
    pub fn new(config: PointCloudConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PointCloudConfig {
        &self.config
    }

    /// Pull this frame's inputs from `source` and assemble them.
    ///
    /// Missing inputs or a non-tracking anchor give [`ProduceResult::NotReady`].
    pub fn produce<S: FrameSource + ?Sized>(&self, source: &S) -> ProduceResult {
        let Acquired {
            depth,
            confidence,
            color,
            camera,
            anchor,
        } = match Acquired::from_source(source) {
            Ok(acquired) => acquired,
            Err(NotYetAvailable) => {
                log::trace!("Depth frame not yet available");
                return ProduceResult::NotReady;
            }
        };

        let Some(anchor_pose) = anchor.pose() else {
            log::trace!("Anchor {:?} not tracking ({:?})", anchor.id(), anchor.state());
            return ProduceResult::NotReady;
        };
        if !camera.pose.is_finite() {
            log::trace!("Camera pose not tracked yet");
            return ProduceResult::NotReady;
        }
        let anchor = FrameAnchor {
            id: anchor.id(),
            pose: anchor_pose,
        };

        match self.assemble(&depth, &confidence, color, &camera, anchor, source.timestamp_ns()) {
            Ok(frame) => ProduceResult::Frame(frame),
            Err(err) => {
                log::warn!("Rejected depth frame: {}", err);
                ProduceResult::Error(err)
            }
        }
    }

    /// Assemble a frame from inputs that are known to be available.
    ///
    /// Unlike [`Self::produce`], a non-finite camera pose is an error here.
    pub fn assemble<C: ColorSource + ?Sized>(
        &self,
        depth: &DepthImage<'_>,
        confidence: &ConfidenceImage<'_>,
        color: &C,
        camera: &CaptureCamera,
        anchor: FrameAnchor,
        timestamp_ns: u64,
    ) -> Result<PointCloudFrame> {
        let (depth_width, depth_height) = depth.dimensions();
        let (confidence_width, confidence_height) = confidence.dimensions();
        if (depth_width, depth_height) != (confidence_width, confidence_height) {
            return Err(PointCloudError::DimensionMismatch {
                depth_width,
                depth_height,
                confidence_width,
                confidence_height,
            });
        }
        camera.intrinsics.validate()?;
        if !camera.pose.is_finite() {
            return Err(PointCloudError::NonFinitePose);
        }

        let sampler = BudgetSampler::new(depth_width, depth_height, self.config.max_points);
        let output_pose = match self.config.point_space {
            PointSpace::World => camera.pose,
            PointSpace::Camera => Pose::IDENTITY,
        };
        let context = PixelContext {
            depth,
            confidence,
            color,
            camera,
            output_pose,
            min_confidence: self.config.min_confidence,
        };

        let mut collector = Collector::with_capacity(sampler.len());
        if self.config.parallel {
            // One slot per sample position, compacted in order afterwards.
            let mut slots: Vec<PixelOutcome> = vec![Err(Dropped::InvalidDepth); sampler.len()];
            slots.par_iter_mut().enumerate().for_each(|(index, slot)| {
                if let Some(coord) = sampler.coord_at(index) {
                    *slot = context.process(coord);
                }
            });
            for outcome in slots {
                collector.push(outcome);
            }
        } else {
            for coord in &sampler {
                collector.push(context.process(coord));
            }
        }

        let Collector {
            points,
            colors,
            mut stats,
        } = collector;
        stats.emitted = points.len();

        log::debug!(
            "Assembled {} points from {}x{} depth (stride {}, sampled {}, dropped {})",
            stats.emitted,
            depth_width,
            depth_height,
            sampler.stride(),
            stats.sampled,
            stats.dropped()
        );

        Ok(PointCloudFrame::new(
            points,
            colors,
            timestamp_ns,
            anchor,
            camera.pose,
            self.config.point_space,
            stats,
        ))
    }
}
