//! Curation state machine.
//!
//! [`CurationState`] tracks, for the fixed regions of a [`RegionRegistry`],
//! which are accepted, which are selected and which display mode is active.
//! Each operation renders the candidate state first and commits it only if
//! rendering succeeds, so a failed operation leaves the state untouched.

use crate::config::CurationConfig;
use crate::mode::Mode;
use crate::render::{
    LayerVisibility, RenderUpdate, SelectionOverlay, SelectionStatus, TracePlot, TracePlotUpdate,
    TraceSeries,
};
use curator_core::{
    Error, LabelImage, RegionId, RegionRegistry, Result, ScalarImage, SnrHistogram, TraceMatrix,
};
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Id reported by a click on background.
pub const NO_SELECTION: i64 = -1;

/// Initial accept/reject partition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InitialState {
    /// Every region starts accepted.
    #[default]
    AllAccepted,
    /// Every region starts rejected.
    AllRejected,
    /// One flag per region.
    Flags(Vec<bool>),
}

/// Data handed to the persistence layer on save.
#[derive(Debug, Clone, PartialEq)]
pub struct CurationOutput {
    /// 1 for regions passing the acceptance policy, else 0.
    pub accept_vector: Vec<u8>,
    /// Fluorescence traces of every region, `N x T`.
    pub traces: TraceMatrix,
}

impl CurationOutput {
    /// Number of accepted regions.
    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.accept_vector.iter().filter(|&&flag| flag == 1).count()
    }
}

/// Point-in-time view of the mutable state used by one render pass.
struct Snapshot<'a> {
    accepted: &'a [bool],
    selected: &'a BTreeSet<RegionId>,
    mode: Mode,
    snr_threshold: f64,
}

/// Accept/reject, selection and display-mode state of a curation session.
#[derive(Debug, Clone)]
pub struct CurationState {
    registry: Arc<RegionRegistry>,
    config: CurationConfig,
    accepted: Vec<bool>,
    selected: BTreeSet<RegionId>,
    mode: Mode,
    snr_threshold: f64,
    current_frame: usize,
}

impl CurationState {
    /// Creates the session state in `All` mode with region 0 selected.
    ///
    /// # Errors
    /// Returns [`Error::AcceptLengthMismatch`] if the initial flags do not
    /// cover every region and [`Error::InvalidThreshold`] for a non-finite
    /// configured threshold.
    pub fn new(
        registry: Arc<RegionRegistry>,
        initial: InitialState,
        config: CurationConfig,
    ) -> Result<Self> {
        let n = registry.len();
        let accepted = match initial {
            InitialState::AllAccepted => vec![true; n],
            InitialState::AllRejected => vec![false; n],
            InitialState::Flags(flags) => {
                if flags.len() != n {
                    return Err(Error::AcceptLengthMismatch {
                        expected: n,
                        found: flags.len(),
                    });
                }
                flags
            }
        };

        if !config.snr_threshold.is_finite() {
            return Err(Error::InvalidThreshold(config.snr_threshold));
        }

        let selected = if registry.is_empty() {
            BTreeSet::new()
        } else {
            BTreeSet::from([0])
        };

        Ok(Self {
            snr_threshold: config.snr_threshold,
            registry,
            config,
            accepted,
            selected,
            mode: Mode::All,
            current_frame: 0,
        })
    }

    /// The shared region registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<RegionRegistry> {
        &self.registry
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CurationConfig {
        &self.config
    }

    /// Active display mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current SNR threshold.
    #[must_use]
    pub fn snr_threshold(&self) -> f64 {
        self.snr_threshold
    }

    /// Frame under the trace-plot marker.
    #[must_use]
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Selected regions, ascending.
    #[must_use]
    pub fn selected(&self) -> &BTreeSet<RegionId> {
        &self.selected
    }

    /// Manual accept flag per region.
    #[must_use]
    pub fn accepted_flags(&self) -> &[bool] {
        &self.accepted
    }

    /// Whether a region is currently accepted.
    ///
    /// # Errors
    /// Returns [`Error::UnknownRegion`] if `id` is out of range.
    pub fn is_accepted(&self, id: RegionId) -> Result<bool> {
        self.registry.check_id(id)?;
        Ok(self.accepted[id])
    }

    /// Ids of accepted regions, ascending.
    #[must_use]
    pub fn accepted_ids(&self) -> Vec<RegionId> {
        self.ids_where(true)
    }

    /// Ids of rejected regions, ascending.
    #[must_use]
    pub fn rejected_ids(&self) -> Vec<RegionId> {
        self.ids_where(false)
    }

    fn ids_where(&self, accepted: bool) -> Vec<RegionId> {
        self.accepted
            .iter()
            .enumerate()
            .filter(|(_, flag)| **flag == accepted)
            .map(|(id, _)| id)
            .collect()
    }

    /// Full render for a freshly loaded session.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if a boundary cannot be rasterized.
    pub fn initial_render(&self) -> Result<RenderUpdate> {
        let snap = self.snapshot();
        let (accepted, rejected) = self.render_labels(&snap)?;
        Ok(RenderUpdate {
            accepted_labels: Some(accepted),
            rejected_labels: Some(rejected),
            snr_mask: Some(self.render_snr_mask(&snap)?),
            visibility: Some(LayerVisibility::for_mode(self.mode)),
            selection: Some(self.selection_overlay(&snap)?),
            traces: Some(self.trace_update(&snap)),
        })
    }

    /// Flips accepted/rejected membership of every listed region.
    ///
    /// Duplicate ids flip once. An empty list is a no-op.
    ///
    /// # Errors
    /// Returns [`Error::UnknownRegion`] for an id out of range, or a
    /// rasterization error; the state is unchanged on error.
    pub fn toggle(&mut self, region_ids: &[RegionId]) -> Result<RenderUpdate> {
        for &id in region_ids {
            self.registry.check_id(id)?;
        }
        if region_ids.is_empty() {
            return Ok(RenderUpdate::default());
        }

        let targets: BTreeSet<RegionId> = region_ids.iter().copied().collect();
        let mut accepted = self.accepted.clone();
        for &id in &targets {
            accepted[id] = !accepted[id];
        }

        let snap = Snapshot {
            accepted: &accepted,
            selected: &self.selected,
            mode: self.mode,
            snr_threshold: self.snr_threshold,
        };
        let (accepted_labels, rejected_labels) = self.render_labels(&snap)?;
        let snr_mask = if self.mode == Mode::SnrThreshold {
            Some(self.render_snr_mask(&snap)?)
        } else {
            None
        };
        let selection = if self.selected.is_empty() {
            None
        } else {
            Some(self.selection_overlay(&snap)?)
        };

        debug!("toggled regions {targets:?}");
        self.accepted = accepted;
        Ok(RenderUpdate {
            accepted_labels: Some(accepted_labels),
            rejected_labels: Some(rejected_labels),
            snr_mask,
            selection,
            ..RenderUpdate::default()
        })
    }

    /// Flips every selected region.
    ///
    /// # Errors
    /// See [`toggle`](Self::toggle).
    pub fn toggle_selected(&mut self) -> Result<RenderUpdate> {
        let selected: Vec<RegionId> = self.selected.iter().copied().collect();
        self.toggle(&selected)
    }

    /// Replaces the selection.
    ///
    /// An empty list clears the overlay and the trace plot.
    ///
    /// # Errors
    /// Returns [`Error::UnknownRegion`] for an id out of range, or a
    /// rasterization error; the state is unchanged on error.
    pub fn select(&mut self, region_ids: &[RegionId]) -> Result<RenderUpdate> {
        for &id in region_ids {
            self.registry.check_id(id)?;
        }
        let selected: BTreeSet<RegionId> = region_ids.iter().copied().collect();

        let snap = Snapshot {
            accepted: &self.accepted,
            selected: &selected,
            mode: self.mode,
            snr_threshold: self.snr_threshold,
        };
        let mut update = RenderUpdate {
            selection: Some(self.selection_overlay(&snap)?),
            traces: Some(self.trace_update(&snap)),
            ..RenderUpdate::default()
        };
        if self.mode.restricts_to_selection() {
            let (accepted_labels, rejected_labels) = self.render_labels(&snap)?;
            update.accepted_labels = Some(accepted_labels);
            update.rejected_labels = Some(rejected_labels);
        }

        debug!("selected regions {selected:?}");
        self.selected = selected;
        Ok(update)
    }

    /// Selection entry point for the event layer.
    ///
    /// Any [`NO_SELECTION`] id clears the selection.
    ///
    /// # Errors
    /// Returns [`Error::UnknownRegion`] for other negative or out-of-range
    /// ids.
    pub fn select_raw(&mut self, region_ids: &[i64]) -> Result<RenderUpdate> {
        if region_ids.contains(&NO_SELECTION) {
            return self.select(&[]);
        }
        let count = self.registry.len();
        let ids = region_ids
            .iter()
            .map(|&raw| usize::try_from(raw).map_err(|_| Error::UnknownRegion { id: raw, count }))
            .collect::<Result<Vec<_>>>()?;
        self.select(&ids)
    }

    /// Switches display mode.
    ///
    /// Entering `Focus` with nothing selected selects region 0. Switching to
    /// the active mode is a no-op.
    ///
    /// # Errors
    /// Returns a rasterization error; the state is unchanged on error.
    pub fn set_mode(&mut self, mode: Mode) -> Result<RenderUpdate> {
        if mode == self.mode {
            return Ok(RenderUpdate::default());
        }

        let auto_select =
            mode == Mode::Focus && self.selected.is_empty() && !self.registry.is_empty();
        let selected = if auto_select {
            BTreeSet::from([0])
        } else {
            self.selected.clone()
        };

        let snap = Snapshot {
            accepted: &self.accepted,
            selected: &selected,
            mode,
            snr_threshold: self.snr_threshold,
        };
        let (accepted_labels, rejected_labels) = self.render_labels(&snap)?;
        let mut update = RenderUpdate {
            accepted_labels: Some(accepted_labels),
            rejected_labels: Some(rejected_labels),
            visibility: Some(LayerVisibility::for_mode(mode)),
            ..RenderUpdate::default()
        };
        if mode == Mode::SnrThreshold {
            update.snr_mask = Some(self.render_snr_mask(&snap)?);
        }
        if auto_select {
            update.selection = Some(self.selection_overlay(&snap)?);
            update.traces = Some(self.trace_update(&snap));
        }

        debug!("mode {} -> {mode}", self.mode);
        self.mode = mode;
        self.selected = selected;
        Ok(update)
    }

    /// Switches display mode by control-panel name.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMode`] for an unknown name before any change.
    pub fn set_mode_named(&mut self, name: &str) -> Result<RenderUpdate> {
        let mode: Mode = name.parse()?;
        self.set_mode(mode)
    }

    /// Moves the SNR threshold.
    ///
    /// The SNR mask is re-rendered only in `SnrThreshold` mode. Acceptance
    /// flags are never changed.
    ///
    /// # Errors
    /// Returns [`Error::InvalidThreshold`] for a non-finite value.
    pub fn set_snr_threshold(&mut self, value: f64) -> Result<RenderUpdate> {
        if !value.is_finite() {
            return Err(Error::InvalidThreshold(value));
        }

        let mut update = RenderUpdate::default();
        if self.mode == Mode::SnrThreshold {
            let snap = Snapshot {
                accepted: &self.accepted,
                selected: &self.selected,
                mode: self.mode,
                snr_threshold: value,
            };
            update.snr_mask = Some(self.render_snr_mask(&snap)?);
        }

        self.snr_threshold = value;
        Ok(update)
    }

    /// Moves the trace-plot frame marker.
    ///
    /// # Errors
    /// Returns [`Error::FrameOutOfRange`] past the last movie frame.
    pub fn set_current_frame(&mut self, frame: usize) -> Result<RenderUpdate> {
        let n_frames = self.registry.n_frames();
        if frame >= n_frames {
            return Err(Error::FrameOutOfRange { frame, n_frames });
        }

        self.current_frame = frame;
        let traces = (!self.selected.is_empty()).then_some(TracePlotUpdate::CurrentFrame(frame));
        Ok(RenderUpdate {
            traces,
            ..RenderUpdate::default()
        })
    }

    /// Final 0/1 decision per region under the configured policy.
    #[must_use]
    pub fn compute_final_accept_vector(&self) -> Vec<u8> {
        let policy = self.config.acceptance;
        self.registry
            .regions()
            .iter()
            .map(|region| {
                u8::from(policy.passes(self.accepted[region.id], region.snr, self.snr_threshold))
            })
            .collect()
    }

    /// Accept vector plus every region's trace, for persistence.
    #[must_use]
    pub fn save(&self) -> CurationOutput {
        CurationOutput {
            accept_vector: self.compute_final_accept_vector(),
            traces: self.registry.traces(),
        }
    }

    /// Histogram of region SNR for the threshold surface.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if fewer than 2 edges are configured.
    pub fn snr_histogram(&self) -> Result<SnrHistogram> {
        SnrHistogram::from_values(&self.registry.snr_values(), self.config.histogram_edges)
    }

    fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            accepted: &self.accepted,
            selected: &self.selected,
            mode: self.mode,
            snr_threshold: self.snr_threshold,
        }
    }

    fn render_labels(&self, snap: &Snapshot<'_>) -> Result<(LabelImage, LabelImage)> {
        let (accepted, rejected): (Vec<RegionId>, Vec<RegionId>) = (0..self.registry.len())
            .filter(|id| !snap.mode.restricts_to_selection() || snap.selected.contains(id))
            .partition(|&id| snap.accepted[id]);

        Ok((
            self.registry.rasterize(&accepted, RegionRegistry::label_of)?,
            self.registry.rasterize(&rejected, RegionRegistry::label_of)?,
        ))
    }

    fn render_snr_mask(&self, snap: &Snapshot<'_>) -> Result<ScalarImage> {
        let policy = self.config.acceptance;
        let regions = self.registry.regions();
        let ids: Vec<RegionId> = regions
            .iter()
            .filter(|region| policy.passes(snap.accepted[region.id], region.snr, snap.snr_threshold))
            .map(|region| region.id)
            .collect();
        self.registry.rasterize_scalar(&ids, |id| regions[id].snr)
    }

    fn selection_overlay(&self, snap: &Snapshot<'_>) -> Result<SelectionOverlay> {
        if snap.selected.is_empty() {
            return Ok(SelectionOverlay::cleared());
        }

        let rectangles = snap
            .selected
            .iter()
            .map(|&id| self.registry.bounding_box(id))
            .collect::<Result<Vec<_>>>()?;
        let (status, edge_color) = if snap.selected.iter().all(|&id| snap.accepted[id]) {
            (SelectionStatus::AllAccepted, self.config.accepted_color)
        } else {
            (SelectionStatus::ContainsRejected, self.config.rejected_color)
        };

        Ok(SelectionOverlay {
            rectangles,
            status: Some(status),
            edge_color: Some(edge_color),
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn trace_update(&self, snap: &Snapshot<'_>) -> TracePlotUpdate {
        if snap.selected.is_empty() {
            return TracePlotUpdate::Clear;
        }

        let regions = self.registry.regions();
        let series = snap
            .selected
            .iter()
            .enumerate()
            .map(|(position, &id)| {
                let region = &regions[id];
                TraceSeries {
                    region: id,
                    values: region.trace.clone(),
                    events: region.spike_indices(self.config.spike_threshold(position)),
                }
            })
            .collect();

        TracePlotUpdate::Show(TracePlot {
            x: (0..self.registry.n_frames()).map(|t| t as f64).collect(),
            series,
            current_frame: self.current_frame,
        })
    }
}
