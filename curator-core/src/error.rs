//! Error types for curator-core.

use thiserror::Error;

/// Result type alias for curator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for region registry and curation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Region id outside `0..count`.
    #[error("unknown region {id} (registry holds {count} regions)")]
    UnknownRegion { id: i64, count: usize },

    /// A rounded boundary coordinate falls outside the raster.
    #[error(
        "region {region} boundary point ({row}, {col}) lies outside the {height}x{width} raster"
    )]
    OutOfBounds {
        region: usize,
        row: f64,
        col: f64,
        height: usize,
        width: usize,
    },

    /// Unrecognized display mode name.
    #[error("invalid mode: {0:?} (expected all, focus or snr)")]
    InvalidMode(String),

    /// Boundary with fewer than three points.
    #[error("region {region} boundary has {points} points, at least 3 required")]
    DegenerateBoundary { region: usize, points: usize },

    /// Trace or spike signal with the wrong number of frames.
    #[error("region {region} has {found} samples, expected {expected}")]
    TraceLengthMismatch {
        region: usize,
        expected: usize,
        found: usize,
    },

    /// More regions than label images can encode.
    #[error("registry holds {count} regions, at most {max} can be labelled")]
    TooManyRegions { count: usize, max: usize },

    /// Initial accept vector does not cover every region.
    #[error("accept vector has {found} entries, registry holds {expected} regions")]
    AcceptLengthMismatch { expected: usize, found: usize },

    /// Non-finite SNR threshold.
    #[error("invalid SNR threshold: {0}")]
    InvalidThreshold(f64),

    /// Frame index past the end of the movie.
    #[error("frame {frame} out of range (movie has {n_frames} frames)")]
    FrameOutOfRange { frame: usize, n_frames: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Builds an [`Error::UnknownRegion`] from an unsigned id.
    #[must_use]
    pub fn unknown_region(id: usize, count: usize) -> Self {
        Self::UnknownRegion {
            id: i64::try_from(id).unwrap_or(i64::MAX),
            count,
        }
    }
}
