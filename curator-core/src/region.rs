//! Region geometry and per-region signals.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable 0-based index of a region in its registry.
pub type RegionId = usize;

/// Minimum number of points in a closed boundary.
pub const MIN_BOUNDARY_POINTS: usize = 3;

/// Raster shape of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RasterShape {
    /// Number of rows.
    pub height: usize,
    /// Number of columns.
    pub width: usize,
}

impl RasterShape {
    /// Creates a new raster shape.
    #[inline]
    #[must_use]
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Shape as an ndarray `(rows, cols)` tuple.
    #[inline]
    #[must_use]
    pub fn dims(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Rounds a sub-pixel coordinate to the nearest pixel.
    ///
    /// Ties round to even. The bounds check applies to the rounded pixel,
    /// not to the raw coordinate: `-0.4` rounds to row 0 and is accepted,
    /// while `11.6` rounds to 12 and is rejected for a width of 12.
    /// Returns `None` when the rounded pixel falls outside the raster
    /// (including NaN coordinates).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel(&self, point: BoundaryPoint) -> Option<(usize, usize)> {
        let row = point.row.round_ties_even();
        let col = point.col.round_ties_even();
        let in_range = |value: f64, limit: usize| value >= 0.0 && value < limit as f64;
        if in_range(row, self.height) && in_range(col, self.width) {
            Some((row as usize, col as usize))
        } else {
            None
        }
    }
}

/// A single (row, col) boundary vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundaryPoint {
    /// Row coordinate (sub-pixel).
    pub row: f64,
    /// Column coordinate (sub-pixel).
    pub col: f64,
}

impl BoundaryPoint {
    /// Creates a new boundary point.
    #[inline]
    #[must_use]
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }
}

impl From<[f64; 2]> for BoundaryPoint {
    fn from([row, col]: [f64; 2]) -> Self {
        Self { row, col }
    }
}

/// Axis-aligned box enclosing a boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    pub min_row: f64,
    pub min_col: f64,
    pub max_row: f64,
    pub max_col: f64,
}

impl BoundingBox {
    /// Rectangle corners in drawing order: top-left, top-right,
    /// bottom-right, bottom-left.
    #[must_use]
    pub fn corners(&self) -> [BoundaryPoint; 4] {
        [
            BoundaryPoint::new(self.min_row, self.min_col),
            BoundaryPoint::new(self.min_row, self.max_col),
            BoundaryPoint::new(self.max_row, self.max_col),
            BoundaryPoint::new(self.max_row, self.min_col),
        ]
    }

    /// Box height in pixels.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_row - self.min_row
    }

    /// Box width in pixels.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_col - self.min_col
    }
}

/// One candidate cell: its outline and derived signals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    /// Index assigned by the registry at load time.
    pub id: RegionId,
    /// Closed outline, ordered.
    pub boundary: Vec<BoundaryPoint>,
    /// Fluorescence intensity, one sample per movie frame.
    pub trace: Vec<f64>,
    /// Deconvolved spike signal, one sample per movie frame.
    pub spikes: Option<Vec<f64>>,
    /// Signal-to-noise ratio.
    pub snr: f64,
}

impl Region {
    /// Creates a region without a spike signal.
    ///
    /// The id is assigned when the region is added to a registry.
    #[must_use]
    pub fn new(boundary: Vec<BoundaryPoint>, trace: Vec<f64>, snr: f64) -> Self {
        Self {
            id: 0,
            boundary,
            trace,
            spikes: None,
            snr,
        }
    }

    /// Attaches a spike signal.
    #[must_use]
    pub fn with_spikes(mut self, spikes: Vec<f64>) -> Self {
        self.spikes = Some(spikes);
        self
    }

    /// Number of movie frames covered by the trace.
    #[must_use]
    pub fn n_frames(&self) -> usize {
        self.trace.len()
    }

    /// Frames whose spike signal exceeds `threshold`.
    ///
    /// Empty when the region carries no spike signal.
    #[must_use]
    pub fn spike_indices(&self, threshold: f64) -> Vec<usize> {
        self.spikes
            .as_deref()
            .map(|spikes| {
                spikes
                    .iter()
                    .enumerate()
                    .filter(|(_, value)| **value > threshold)
                    .map(|(frame, _)| frame)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Axis-aligned box around the boundary.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        self.boundary.iter().fold(
            BoundingBox {
                min_row: f64::INFINITY,
                min_col: f64::INFINITY,
                max_row: f64::NEG_INFINITY,
                max_col: f64::NEG_INFINITY,
            },
            |bbox, point| BoundingBox {
                min_row: bbox.min_row.min(point.row),
                min_col: bbox.min_col.min(point.col),
                max_row: bbox.max_row.max(point.row),
                max_col: bbox.max_col.max(point.col),
            },
        )
    }

    /// Rounded boundary pixels, in boundary order.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] for the first point that rounds
    /// outside `shape`.
    pub fn pixels(&self, shape: RasterShape) -> Result<Vec<(usize, usize)>> {
        self.boundary
            .iter()
            .map(|&point| {
                shape.pixel(point).ok_or(Error::OutOfBounds {
                    region: self.id,
                    row: point.row,
                    col: point.col,
                    height: shape.height,
                    width: shape.width,
                })
            })
            .collect()
    }
}
