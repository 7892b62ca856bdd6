//! Render output handed to the display, plot and threshold surfaces.
//!
//! Every state transition produces a [`RenderUpdate`]. Fields left as
//! `None` mean the surface keeps what it already shows.

use crate::mode::Mode;
use curator_core::{BoundingBox, LabelImage, RegionId, ScalarImage};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RGB edge color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);

    /// Creates a color from its components.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Which layers the image surface shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVisibility {
    pub image: bool,
    pub accepted_labels: bool,
    pub rejected_labels: bool,
    pub snr_mask: bool,
}

impl LayerVisibility {
    /// Layer visibility for a display mode.
    #[must_use]
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::All => Self {
                image: true,
                accepted_labels: true,
                rejected_labels: false,
                snr_mask: false,
            },
            Mode::Focus => Self {
                image: true,
                accepted_labels: true,
                rejected_labels: true,
                snr_mask: false,
            },
            Mode::SnrThreshold => Self {
                image: true,
                accepted_labels: false,
                rejected_labels: false,
                snr_mask: true,
            },
        }
    }
}

/// Acceptance summary of the whole selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStatus {
    /// Every selected region is accepted.
    AllAccepted,
    /// At least one selected region is rejected.
    ContainsRejected,
}

/// Selection rectangles drawn over the image.
///
/// An overlay without rectangles clears the previous selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionOverlay {
    pub rectangles: Vec<BoundingBox>,
    pub status: Option<SelectionStatus>,
    pub edge_color: Option<Color>,
}

impl SelectionOverlay {
    /// Overlay that removes every selection rectangle.
    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Returns true if the overlay draws nothing.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.rectangles.is_empty()
    }
}

/// One region's trace with its spike markers.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSeries {
    pub region: RegionId,
    pub values: Vec<f64>,
    /// Frames marked as spike events.
    pub events: Vec<usize>,
}

/// Data for the trace plot.
#[derive(Debug, Clone, PartialEq)]
pub struct TracePlot {
    /// Frame axis, `0..T`.
    pub x: Vec<f64>,
    pub series: Vec<TraceSeries>,
    /// Position of the vertical frame marker.
    pub current_frame: usize,
}

/// Change to the trace plot.
#[derive(Debug, Clone, PartialEq)]
pub enum TracePlotUpdate {
    /// Remove every trace.
    Clear,
    /// Replace the plotted traces.
    Show(TracePlot),
    /// Move the frame marker only.
    CurrentFrame(usize),
}

/// Everything the surfaces must redraw after a transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderUpdate {
    pub accepted_labels: Option<LabelImage>,
    pub rejected_labels: Option<LabelImage>,
    pub snr_mask: Option<ScalarImage>,
    pub visibility: Option<LayerVisibility>,
    pub selection: Option<SelectionOverlay>,
    pub traces: Option<TracePlotUpdate>,
}

impl RenderUpdate {
    /// Returns true if nothing needs redrawing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accepted_labels.is_none()
            && self.rejected_labels.is_none()
            && self.snr_mask.is_none()
            && self.visibility.is_none()
            && self.selection.is_none()
            && self.traces.is_none()
    }

    /// Layers that changed, for logging.
    #[must_use]
    pub fn changed_layers(&self) -> Vec<&'static str> {
        let mut layers = Vec::new();
        if self.accepted_labels.is_some() {
            layers.push("accepted_labels");
        }
        if self.rejected_labels.is_some() {
            layers.push("rejected_labels");
        }
        if self.snr_mask.is_some() {
            layers.push("snr_mask");
        }
        if self.visibility.is_some() {
            layers.push("visibility");
        }
        if self.selection.is_some() {
            layers.push("selection");
        }
        if self.traces.is_some() {
            layers.push("traces");
        }
        layers
    }
}
