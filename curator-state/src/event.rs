//! User events and their mapping onto state operations.

use crate::mode::Mode;
use crate::render::RenderUpdate;
use crate::state::{CurationOutput, CurationState};
use curator_core::{RegionId, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Input from the display, plot and control surfaces.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CurationEvent {
    /// Click on the label image; `-1` for background.
    RegionClick(i64),
    /// Accept/reject key for the current selection.
    KeyToggle,
    /// Mode button.
    ModeButton(Mode),
    /// Drag on the SNR histogram.
    ThresholdDrag(f64),
    /// Region spinbox.
    SpinboxChange(RegionId),
    /// Frame slider.
    FrameChange(usize),
    /// Save button.
    Save,
}

impl CurationEvent {
    /// Click event for a pixel value read from a label image.
    #[must_use]
    pub fn from_label_click(label: u32) -> Self {
        CurationEvent::RegionClick(i64::from(label) - 1)
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Surfaces to redraw.
    Render(RenderUpdate),
    /// Data to persist.
    Saved(CurationOutput),
}

impl CurationState {
    /// Applies one user event.
    ///
    /// # Errors
    /// Propagates the error of the underlying operation; the state is
    /// unchanged on error.
    pub fn handle(&mut self, event: &CurationEvent) -> Result<EventOutcome> {
        let update = match *event {
            CurationEvent::RegionClick(id) => self.select_raw(&[id])?,
            CurationEvent::KeyToggle => self.toggle_selected()?,
            CurationEvent::ModeButton(mode) => self.set_mode(mode)?,
            CurationEvent::ThresholdDrag(value) => self.set_snr_threshold(value)?,
            CurationEvent::SpinboxChange(id) => self.select(&[id])?,
            CurationEvent::FrameChange(frame) => self.set_current_frame(frame)?,
            CurationEvent::Save => return Ok(EventOutcome::Saved(self.save())),
        };
        Ok(EventOutcome::Render(update))
    }
}
