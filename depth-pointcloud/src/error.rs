//! Error types
//!
//! Only contract violations surface as [`PointCloudError`]. A frame whose
//! inputs are still being acquired is not an error; see [`NotYetAvailable`].

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PointCloudError>;

/// Errors reported to the caller as hard failures.
#[derive(Error, Debug)]
pub enum PointCloudError {
    #[error("Depth image is {depth_width}x{depth_height} but confidence image is {confidence_width}x{confidence_height}")]
    DimensionMismatch {
        depth_width: u32,
        depth_height: u32,
        confidence_width: u32,
        confidence_height: u32,
    },
    #[error("{name} buffer holds {actual} values, expected {expected} for its dimensions")]
    BufferSize {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{name} row stride {row_stride} is smaller than its width {width}")]
    RowStride {
        name: &'static str,
        width: u32,
        row_stride: usize,
    },
    #[error("Capture camera pose is not finite")]
    NonFinitePose,
    #[error("Degenerate camera intrinsics: {0}")]
    DegenerateIntrinsics(&'static str),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to read or write config {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl PointCloudError {
    /// True for errors caused by the caller handing over inconsistent frame data.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            PointCloudError::DimensionMismatch { .. }
                | PointCloudError::BufferSize { .. }
                | PointCloudError::RowStride { .. }
                | PointCloudError::DegenerateIntrinsics(_)
                | PointCloudError::NonFinitePose
        )
    }
}

/// Signal from the acquisition side that an input for the current frame
/// does not exist yet (tracking startup, reacquisition, depth still computing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotYetAvailable;

impl std::fmt::Display for NotYetAvailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("frame data not yet available")
    }
}
