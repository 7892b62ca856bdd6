//! curator-state: Curation state machine.
//!
//! This crate tracks the accept/reject partition, the selection and the
//! display mode over a fixed [`RegionRegistry`](curator_core::RegionRegistry),
//! and turns every transition into a [`RenderUpdate`]:
//! - **State** - all-or-nothing transitions over a shared registry
//! - **Events** - user input mapped onto state operations
//! - **Session** - a state bound to a [`DisplaySurface`]
//!

pub mod config;
mod event;
mod mode;
pub mod render;
mod session;
mod state;

pub use config::{AcceptancePolicy, CurationConfig};
pub use event::{CurationEvent, EventOutcome};
pub use mode::Mode;
pub use render::{
    Color, LayerVisibility, RenderUpdate, SelectionOverlay, SelectionStatus, TracePlot,
    TracePlotUpdate, TraceSeries,
};
pub use session::{CurationSession, DisplaySurface};
pub use state::{CurationOutput, CurationState, InitialState, NO_SELECTION};

// Re-export core types used in the public API
pub use curator_core::{Error, RegionId, RegionRegistry, Result};
