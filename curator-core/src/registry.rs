//! Immutable region registry and rasterization primitives.
//!
//! The registry owns every candidate region of a session together with the
//! raster shape their boundaries are drawn into. It is never mutated after
//! construction and can be shared between readers through an `Arc`.

use crate::region::{BoundingBox, RasterShape, Region, RegionId, MIN_BOUNDARY_POINTS};
use crate::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// 2-D label image: 0 is background, positive values are region labels.
pub type LabelImage = Array2<u32>;

/// 2-D scalar image: 0.0 is background/unset.
pub type ScalarImage = Array2<f64>;

/// Per-region fluorescence traces, `N x T`.
pub type TraceMatrix = Array2<f64>;

/// Largest region count whose labels `1..=N` fit in a [`LabelImage`].
pub const MAX_REGIONS: usize = (u32::MAX - 1) as usize;

/// Checks that `count` regions can be labelled.
///
/// # Errors
/// Returns [`Error::TooManyRegions`] past [`MAX_REGIONS`].
pub fn check_region_count(count: usize) -> Result<()> {
    if count > MAX_REGIONS {
        return Err(Error::TooManyRegions {
            count,
            max: MAX_REGIONS,
        });
    }
    Ok(())
}

/// Ordered, immutable set of candidate regions.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRegistry {
    regions: Vec<Region>,
    shape: RasterShape,
    n_frames: usize,
}

impl RegionRegistry {
    /// Builds a registry, assigning ids `0..N` in input order.
    ///
    /// Every trace (and spike signal, when present) must cover the same
    /// number of frames as the first region's trace.
    ///
    /// # Errors
    /// Returns [`Error::TooManyRegions`] past [`MAX_REGIONS`],
    /// [`Error::DegenerateBoundary`] for boundaries with fewer than three
    /// points and [`Error::TraceLengthMismatch`] for ragged signals.
    pub fn new(shape: RasterShape, mut regions: Vec<Region>) -> Result<Self> {
        check_region_count(regions.len())?;
        let n_frames = regions.first().map_or(0, Region::n_frames);

        for (id, region) in regions.iter_mut().enumerate() {
            region.id = id;

            if region.boundary.len() < MIN_BOUNDARY_POINTS {
                return Err(Error::DegenerateBoundary {
                    region: id,
                    points: region.boundary.len(),
                });
            }

            let spike_len = region.spikes.as_ref().map_or(n_frames, Vec::len);
            for found in [region.trace.len(), spike_len] {
                if found != n_frames {
                    return Err(Error::TraceLengthMismatch {
                        region: id,
                        expected: n_frames,
                        found,
                    });
                }
            }
        }

        Ok(Self {
            regions,
            shape,
            n_frames,
        })
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns true if the registry holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Raster shape boundaries are drawn into.
    #[must_use]
    pub fn shape(&self) -> RasterShape {
        self.shape
    }

    /// Number of movie frames per trace.
    #[must_use]
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// All regions in id order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Looks up a region by id.
    ///
    /// # Errors
    /// Returns [`Error::UnknownRegion`] if `id` is out of range.
    pub fn region(&self, id: RegionId) -> Result<&Region> {
        self.regions
            .get(id)
            .ok_or_else(|| Error::unknown_region(id, self.regions.len()))
    }

    /// Checks that `id` names a region.
    ///
    /// # Errors
    /// Returns [`Error::UnknownRegion`] if `id` is out of range.
    pub fn check_id(&self, id: RegionId) -> Result<()> {
        self.region(id).map(|_| ())
    }

    /// Label drawn for `id` in label images.
    ///
    /// Registry ids never exceed [`MAX_REGIONS`]; larger ids saturate at
    /// `u32::MAX`.
    #[must_use]
    pub fn label_of(id: RegionId) -> u32 {
        id.checked_add(1)
            .and_then(|label| u32::try_from(label).ok())
            .unwrap_or(u32::MAX)
    }

    /// Region drawn with `label`, or `None` for background.
    #[must_use]
    pub fn region_at_label(&self, label: u32) -> Option<RegionId> {
        let id = usize::try_from(label).ok()?.checked_sub(1)?;
        (id < self.regions.len()).then_some(id)
    }

    /// SNR of every region in id order.
    #[must_use]
    pub fn snr_values(&self) -> Vec<f64> {
        self.regions.iter().map(|region| region.snr).collect()
    }

    /// Fluorescence traces as an `N x T` matrix.
    #[must_use]
    pub fn traces(&self) -> TraceMatrix {
        let mut traces = Array2::zeros((self.regions.len(), self.n_frames));
        for (mut row, region) in traces.rows_mut().into_iter().zip(&self.regions) {
            for (dst, &value) in row.iter_mut().zip(&region.trace) {
                *dst = value;
            }
        }
        traces
    }

    /// Checks every boundary against the raster shape.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] for the first offending region.
    pub fn validate(&self) -> Result<()> {
        let ids: Vec<RegionId> = (0..self.regions.len()).collect();
        self.collect_pixels(&ids).map(|_| ())
    }

    /// Axis-aligned box enclosing a region's boundary.
    ///
    /// # Errors
    /// Returns [`Error::UnknownRegion`] if `id` is out of range.
    pub fn bounding_box(&self, id: RegionId) -> Result<BoundingBox> {
        self.region(id).map(Region::bounding_box)
    }

    /// Draws the boundaries of `region_ids` into a fresh label image.
    ///
    /// Regions are drawn in the given order; where boundaries share a pixel
    /// the later region wins.
    ///
    /// # Errors
    /// Returns [`Error::UnknownRegion`] for an id out of range and
    /// [`Error::OutOfBounds`] when a boundary pixel lies outside the raster.
    /// Nothing is drawn on error.
    pub fn rasterize<F>(&self, region_ids: &[RegionId], label_of: F) -> Result<LabelImage>
    where
        F: Fn(RegionId) -> u32,
    {
        self.paint(region_ids, label_of)
    }

    /// Draws a scalar value per region, e.g. an SNR heat-mask.
    ///
    /// Same ordering and bounds rules as [`rasterize`](Self::rasterize).
    ///
    /// # Errors
    /// See [`rasterize`](Self::rasterize).
    pub fn rasterize_scalar<F>(&self, region_ids: &[RegionId], value_of: F) -> Result<ScalarImage>
    where
        F: Fn(RegionId) -> f64,
    {
        self.paint(region_ids, value_of)
    }

    fn paint<T, F>(&self, region_ids: &[RegionId], value_of: F) -> Result<Array2<T>>
    where
        T: Clone + Default,
        F: Fn(RegionId) -> T,
    {
        let pixels = self.collect_pixels(region_ids)?;
        let mut image = Array2::from_elem(self.shape.dims(), T::default());
        for (&id, region_pixels) in region_ids.iter().zip(&pixels) {
            let value = value_of(id);
            for &(row, col) in region_pixels {
                image[[row, col]] = value.clone();
            }
        }
        Ok(image)
    }

    /// Resolves boundary pixels for each id.
    ///
    /// Pixel lists are computed in parallel; errors are reported for the
    /// first failing region in input order.
    fn collect_pixels(&self, region_ids: &[RegionId]) -> Result<Vec<Vec<(usize, usize)>>> {
        for &id in region_ids {
            self.check_id(id)?;
        }
        let shape = self.shape;
        let results: Vec<Result<Vec<(usize, usize)>>> = region_ids
            .par_iter()
            .map(|&id| self.regions[id].pixels(shape))
            .collect();
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::BoundaryPoint;
    use approx::assert_relative_eq;

    fn square(row: f64, col: f64, size: f64) -> Vec<BoundaryPoint> {
        vec![
            BoundaryPoint::new(row, col),
            BoundaryPoint::new(row, col + size),
            BoundaryPoint::new(row + size, col + size),
            BoundaryPoint::new(row + size, col),
        ]
    }

    fn registry() -> RegionRegistry {
        let regions = vec![
            Region::new(square(0.0, 0.0, 2.0), vec![1.0, 2.0, 3.0], 5.0),
            Region::new(square(2.0, 2.0, 2.0), vec![4.0, 5.0, 6.0], 1.0),
            Region::new(square(5.0, 5.0, 1.0), vec![7.0, 8.0, 9.0], 3.0),
        ];
        RegionRegistry::new(RasterShape::new(8, 8), regions).unwrap()
    }

    #[test]
    fn test_ids_assigned_in_order() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        for (expected, region) in registry.regions().iter().enumerate() {
            assert_eq!(region.id, expected);
        }
        assert_eq!(registry.n_frames(), 3);
    }

    #[test]
    fn test_rejects_degenerate_boundary() {
        let regions = vec![Region::new(
            vec![BoundaryPoint::new(0.0, 0.0), BoundaryPoint::new(1.0, 1.0)],
            vec![],
            1.0,
        )];
        let err = RegionRegistry::new(RasterShape::new(4, 4), regions).unwrap_err();
        assert_eq!(
            err,
            Error::DegenerateBoundary {
                region: 0,
                points: 2
            }
        );
    }

    #[test]
    fn test_rejects_ragged_traces() {
        let regions = vec![
            Region::new(square(0.0, 0.0, 1.0), vec![0.0; 4], 1.0),
            Region::new(square(0.0, 0.0, 1.0), vec![0.0; 4], 1.0).with_spikes(vec![0.0; 3]),
        ];
        let err = RegionRegistry::new(RasterShape::new(4, 4), regions).unwrap_err();
        assert_eq!(
            err,
            Error::TraceLengthMismatch {
                region: 1,
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_rasterize_labels() {
        let registry = registry();
        let image = registry
            .rasterize(&[0, 2], RegionRegistry::label_of)
            .unwrap();
        assert_eq!(image.dim(), (8, 8));
        assert_eq!(image[[0, 0]], 1);
        assert_eq!(image[[2, 2]], 1);
        assert_eq!(image[[5, 6]], 3);
        // Region 1 was not requested.
        assert_eq!(image[[4, 4]], 0);
        assert_eq!(image.iter().filter(|&&v| v != 0).count(), 8);
    }

    #[test]
    fn test_rasterize_last_write_wins() {
        let registry = registry();
        // Regions 0 and 1 share pixel (2, 2).
        let forward = registry.rasterize(&[0, 1], |_| 7).unwrap();
        assert_eq!(forward[[2, 2]], 7);

        let image = registry
            .rasterize(&[0, 1], RegionRegistry::label_of)
            .unwrap();
        assert_eq!(image[[2, 2]], 2);
        let reversed = registry
            .rasterize(&[1, 0], RegionRegistry::label_of)
            .unwrap();
        assert_eq!(reversed[[2, 2]], 1);
    }

    #[test]
    fn test_rasterize_unknown_region() {
        let registry = registry();
        let err = registry
            .rasterize(&[0, 3], RegionRegistry::label_of)
            .unwrap_err();
        assert_eq!(err, Error::UnknownRegion { id: 3, count: 3 });
    }

    #[test]
    fn test_rasterize_scalar() {
        let registry = registry();
        let snr = registry.snr_values();
        let image = registry.rasterize_scalar(&[0, 2], |id| snr[id]).unwrap();
        assert_relative_eq!(image[[0, 2]], 5.0);
        assert_relative_eq!(image[[6, 6]], 3.0);
        assert_relative_eq!(image[[4, 4]], 0.0);
    }

    #[test]
    fn test_bounding_box_lookup() {
        let registry = registry();
        let bbox = registry.bounding_box(1).unwrap();
        assert_relative_eq!(bbox.min_row, 2.0);
        assert_relative_eq!(bbox.max_col, 4.0);
        assert!(matches!(
            registry.bounding_box(9),
            Err(Error::UnknownRegion { id: 9, .. })
        ));
    }

    #[test]
    fn test_region_count_limit() {
        assert!(check_region_count(MAX_REGIONS).is_ok());
        assert_eq!(
            check_region_count(MAX_REGIONS + 1).unwrap_err(),
            Error::TooManyRegions {
                count: MAX_REGIONS + 1,
                max: MAX_REGIONS
            }
        );
        assert_eq!(RegionRegistry::label_of(MAX_REGIONS - 1), u32::MAX - 1);
        assert_eq!(RegionRegistry::label_of(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_label_mapping() {
        let registry = registry();
        assert_eq!(RegionRegistry::label_of(0), 1);
        assert_eq!(registry.region_at_label(0), None);
        assert_eq!(registry.region_at_label(1), Some(0));
        assert_eq!(registry.region_at_label(3), Some(2));
        assert_eq!(registry.region_at_label(4), None);
    }

    #[test]
    fn test_traces_matrix() {
        let traces = registry().traces();
        assert_eq!(traces.dim(), (3, 3));
        assert_relative_eq!(traces[[1, 2]], 6.0);
        assert_relative_eq!(traces[[2, 0]], 7.0);
    }
}
