//! SNR histogram backing the threshold control.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of bin edges.
pub const DEFAULT_HISTOGRAM_EDGES: usize = 20;

/// Histogram of per-region SNR values.
///
/// `edges` holds `counts.len() + 1` evenly spaced values; every bin is
/// half-open except the last, which also includes its right edge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnrHistogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl SnrHistogram {
    /// Bins `values` using `n_edges` edges spanning `floor(min)..=ceil(max)`.
    ///
    /// Non-finite values are ignored.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] when `n_edges < 2`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn from_values(values: &[f64], n_edges: usize) -> Result<Self> {
        if n_edges < 2 {
            return Err(Error::ConfigError(format!(
                "histogram needs at least 2 edges, got {n_edges}"
            )));
        }

        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (lo, hi) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (lo, hi) = if finite.is_empty() {
            (0.0, 1.0)
        } else {
            let (lo, hi) = (lo.floor(), hi.ceil());
            if hi > lo {
                (lo, hi)
            } else {
                (lo, lo + 1.0)
            }
        };

        let n_bins = n_edges - 1;
        let step = (hi - lo) / n_bins as f64;
        let edges: Vec<f64> = (0..n_edges)
            .map(|i| if i == n_bins { hi } else { lo + step * i as f64 })
            .collect();

        let mut counts = vec![0usize; n_bins];
        for v in finite {
            let bin = (((v - lo) / step) as usize).min(n_bins - 1);
            counts[bin] += 1;
        }

        Ok(Self { edges, counts })
    }

    /// Number of bins.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Total number of binned values.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Centre of each bin, for bar plots.
    #[must_use]
    pub fn centers(&self) -> Vec<f64> {
        self.edges
            .windows(2)
            .map(|pair| 0.5 * (pair[0] + pair[1]))
            .collect()
    }
}
