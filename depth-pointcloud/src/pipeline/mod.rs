//! Reprojection pipeline
//!
//! Leaf stages first: [`unproject`] and [`color`] handle a single pixel,
//! [`sampler`] picks which pixels to visit, [`assembler`] drives them.

pub mod assembler;
pub mod color;
pub mod sampler;
pub mod unproject;

pub use assembler::{PointCloudAssembler, ProduceResult};
pub use color::{color_coordinate, match_color};
pub use sampler::{BudgetSampler, PixelCoord, Samples};
pub use unproject::{unproject, unproject_to_camera, DepthSample};
