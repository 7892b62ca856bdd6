//! Event loop glue between a [`CurationState`] and a display.

use crate::event::{CurationEvent, EventOutcome};
use crate::render::RenderUpdate;
use crate::state::{CurationOutput, CurationState};
use curator_core::{Result, SnrHistogram};
use log::{debug, info, warn};

/// Sink for render output and user-facing messages.
pub trait DisplaySurface {
    /// Redraws the layers present in `update`.
    fn present(&mut self, update: &RenderUpdate);

    /// Draws the SNR histogram. Called once when the session opens.
    fn show_histogram(&mut self, _histogram: &SnrHistogram) {}

    /// Shows a message for a rejected event.
    fn report_error(&mut self, message: &str);
}

/// A curation state bound to the surface it draws on.
pub struct CurationSession<S> {
    state: CurationState,
    surface: S,
}

impl<S: DisplaySurface> CurationSession<S> {
    /// Draws the initial render and the histogram, then returns the session.
    ///
    /// # Errors
    /// Returns a rasterization or histogram error; nothing is presented.
    pub fn open(state: CurationState, mut surface: S) -> Result<Self> {
        let update = state.initial_render()?;
        let histogram = state.snr_histogram()?;
        surface.present(&update);
        surface.show_histogram(&histogram);
        info!(
            "Opened curation session with {} regions",
            state.registry().len()
        );
        Ok(Self { state, surface })
    }

    /// Applies one event and presents its render output.
    ///
    /// A save event returns the output to persist. Failed events are logged,
    /// reported to the surface and returned; the state is unchanged.
    ///
    /// # Errors
    /// Returns the error of the rejected event.
    pub fn dispatch(&mut self, event: &CurationEvent) -> Result<Option<CurationOutput>> {
        match self.state.handle(event) {
            Ok(EventOutcome::Render(update)) => {
                if !update.is_empty() {
                    debug!("{event:?} redraws {:?}", update.changed_layers());
                    self.surface.present(&update);
                }
                Ok(None)
            }
            Ok(EventOutcome::Saved(output)) => {
                info!(
                    "Saving {} of {} regions as accepted",
                    output.accepted_count(),
                    output.accept_vector.len()
                );
                Ok(Some(output))
            }
            Err(err) => {
                warn!("Rejected {event:?}: {err}");
                self.surface.report_error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &CurationState {
        &self.state
    }

    /// The bound surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Unbinds the state from its surface.
    #[must_use]
    pub fn into_parts(self) -> (CurationState, S) {
        (self.state, self.surface)
    }
}
