//! Per-frame inputs handed over by the acquisition side
//!
//! Everything here borrows caller-owned buffers. Nothing is retained once the
//! assembler returns, so the caller may recycle the buffers immediately.

mod color;
mod depth;

pub use color::{ColorSource, Yuv420Image, YuvPlane};
pub use depth::{ConfidenceImage, DepthEncoding, DepthImage, GridView};

use crate::camera::{AnchorHandle, CaptureCamera};
use crate::error::NotYetAvailable;

/// Acquisition seam. Any accessor may report that its data for the current
/// frame does not exist yet; the assembler then produces no frame.
pub trait FrameSource {
    type Color: ColorSource + ?Sized;

    /// Monotonic capture time of the depth image
    fn timestamp_ns(&self) -> u64;

    fn depth(&self) -> Result<DepthImage<'_>, NotYetAvailable>;

    fn confidence(&self) -> Result<ConfidenceImage<'_>, NotYetAvailable>;

    fn color(&self) -> Result<&Self::Color, NotYetAvailable>;

    fn camera(&self) -> Result<CaptureCamera, NotYetAvailable>;

    /// Anchor the resulting cloud is attached to
    fn anchor(&self) -> Result<AnchorHandle<'_>, NotYetAvailable>;
}

/// Fully acquired inputs for one frame.
pub struct FrameInputs<'a, C: ColorSource + ?Sized> {
    pub depth: DepthImage<'a>,
    pub confidence: ConfidenceImage<'a>,
    pub color: &'a C,
    pub camera: CaptureCamera,
    pub anchor: AnchorHandle<'a>,
    pub timestamp_ns: u64,
}

impl<C: ColorSource + ?Sized> FrameSource for FrameInputs<'_, C> {
    type Color = C;

    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    fn depth(&self) -> Result<DepthImage<'_>, NotYetAvailable> {
        Ok(self.depth)
    }

    fn confidence(&self) -> Result<ConfidenceImage<'_>, NotYetAvailable> {
        Ok(self.confidence)
    }

    fn color(&self) -> Result<&C, NotYetAvailable> {
        Ok(self.color)
    }

    fn camera(&self) -> Result<CaptureCamera, NotYetAvailable> {
        Ok(self.camera)
    }

    fn anchor(&self) -> Result<AnchorHandle<'_>, NotYetAvailable> {
        Ok(self.anchor)
    }
}
