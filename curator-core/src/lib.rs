//! curator-core: Core types for calcium-imaging curation.
//!
//! This crate provides the immutable region registry, boundary
//! rasterization into label and scalar images, and the SNR histogram.
//!

pub mod error;
pub mod histogram;
pub mod region;
pub mod registry;

pub use error::{Error, Result};
pub use histogram::{SnrHistogram, DEFAULT_HISTOGRAM_EDGES};
pub use region::{BoundaryPoint, BoundingBox, RasterShape, Region, RegionId};
pub use registry::{
    check_region_count, LabelImage, RegionRegistry, ScalarImage, TraceMatrix, MAX_REGIONS,
};
