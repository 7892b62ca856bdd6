//! Curation configuration.

use crate::render::Color;
use curator_core::DEFAULT_HISTOGRAM_EDGES;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the manual decision and the SNR threshold combine into the final
/// accept vector and the SNR heat-mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AcceptancePolicy {
    /// Accepted by hand and SNR above the threshold.
    #[default]
    AcceptedAndSnr,
    /// SNR above the threshold, regardless of the manual decision.
    SnrOnly,
}

impl AcceptancePolicy {
    /// Whether a region passes.
    #[inline]
    #[must_use]
    pub fn passes(self, accepted: bool, snr: f64, threshold: f64) -> bool {
        let above = snr > threshold;
        match self {
            AcceptancePolicy::AcceptedAndSnr => accepted && above,
            AcceptancePolicy::SnrOnly => above,
        }
    }
}

/// Display and acceptance parameters for a curation session.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CurationConfig {
    /// Spike marker threshold for the first displayed trace.
    pub primary_spike_threshold: f64,
    /// Spike marker threshold for every additional trace.
    pub additional_spike_threshold: f64,
    /// Final accept vector rule.
    pub acceptance: AcceptancePolicy,
    /// Selection edge color when every selected region is accepted.
    pub accepted_color: Color,
    /// Selection edge color when any selected region is rejected.
    pub rejected_color: Color,
    /// Number of SNR histogram edges.
    pub histogram_edges: usize,
    /// Initial SNR threshold.
    pub snr_threshold: f64,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            primary_spike_threshold: 50.0,
            additional_spike_threshold: 25.0,
            acceptance: AcceptancePolicy::default(),
            accepted_color: Color::GREEN,
            rejected_color: Color::MAGENTA,
            histogram_edges: DEFAULT_HISTOGRAM_EDGES,
            snr_threshold: 0.0,
        }
    }
}

impl CurationConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets both spike marker thresholds.
    #[must_use]
    pub fn with_spike_thresholds(mut self, primary: f64, additional: f64) -> Self {
        self.primary_spike_threshold = primary;
        self.additional_spike_threshold = additional;
        self
    }

    /// Sets the acceptance policy.
    #[must_use]
    pub fn with_acceptance(mut self, acceptance: AcceptancePolicy) -> Self {
        self.acceptance = acceptance;
        self
    }

    /// Sets the selection edge colors.
    #[must_use]
    pub fn with_colors(mut self, accepted: Color, rejected: Color) -> Self {
        self.accepted_color = accepted;
        self.rejected_color = rejected;
        self
    }

    /// Sets the number of SNR histogram edges.
    #[must_use]
    pub fn with_histogram_edges(mut self, edges: usize) -> Self {
        self.histogram_edges = edges;
        self
    }

    /// Sets the initial SNR threshold.
    #[must_use]
    pub fn with_snr_threshold(mut self, threshold: f64) -> Self {
        self.snr_threshold = threshold;
        self
    }

    /// Spike threshold for the trace at `position` in the plot.
    #[must_use]
    pub fn spike_threshold(&self, position: usize) -> f64 {
        if position == 0 {
            self.primary_spike_threshold
        } else {
            self.additional_spike_threshold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptance_policy() {
        let policy = AcceptancePolicy::AcceptedAndSnr;
        assert!(policy.passes(true, 5.0, 2.0));
        assert!(!policy.passes(false, 5.0, 2.0));
        assert!(!policy.passes(true, 2.0, 2.0));

        assert!(AcceptancePolicy::SnrOnly.passes(false, 5.0, 2.0));
    }

    #[test]
    fn test_config_builder() {
        let config = CurationConfig::new()
            .with_spike_thresholds(40.0, 10.0)
            .with_acceptance(AcceptancePolicy::SnrOnly)
            .with_histogram_edges(8)
            .with_snr_threshold(1.5);

        assert!((config.spike_threshold(0) - 40.0).abs() < f64::EPSILON);
        assert!((config.spike_threshold(3) - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.acceptance, AcceptancePolicy::SnrOnly);
        assert_eq!(config.histogram_edges, 8);
        assert!((config.snr_threshold - 1.5).abs() < f64::EPSILON);
    }
}
