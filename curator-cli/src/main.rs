//! calcium-curator command-line interface.
//!
//! Loads a curation session, renders label images for inspection and
//! replays recorded event scripts through the curation state machine.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};
use curator_core::{LabelImage, ScalarImage, SnrHistogram};
use curator_io::{
    read_accept_csv, read_session, save_curation, AcceptMatrix, CurationWriter, LoadedSession,
    OutputFormat, SaveOptions,
};
use curator_state::{
    CurationConfig, CurationEvent, CurationSession, CurationState, DisplaySurface, LayerVisibility,
    Mode, RenderUpdate, TracePlotUpdate,
};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    CuratorIo(#[from] curator_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] curator_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output format for saved results.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Comma separated text
    Csv,
    /// Little-endian binary
    Binary,
    /// HDF5
    #[cfg(feature = "hdf5")]
    Hdf5,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Binary => OutputFormat::Binary,
            #[cfg(feature = "hdf5")]
            Format::Hdf5 => OutputFormat::Hdf5,
        }
    }
}

/// Curation of calcium-imaging cell segmentation results.
#[derive(Parser)]
#[command(name = "calcium-curator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a session file
    Info {
        /// Session file (JSON)
        session: PathBuf,

        /// Accept matrix (CSV) overriding the session's
        #[arg(long)]
        accept: Option<PathBuf>,
    },

    /// Render label images and the SNR mask as CSV
    Render {
        /// Session file (JSON)
        session: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Display mode (all, focus, snr)
        #[arg(short, long, default_value = "all")]
        mode: Mode,

        /// Regions to select
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<usize>,

        /// SNR threshold
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Accept matrix (CSV) overriding the session's
        #[arg(long)]
        accept: Option<PathBuf>,
    },

    /// Replay an event script and save the curated result
    Curate {
        /// Session file (JSON)
        session: PathBuf,

        /// Event script (JSON array of events)
        #[arg(short, long)]
        events: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,

        /// Initial SNR threshold
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Accept matrix (CSV) overriding the session's
        #[arg(long)]
        accept: Option<PathBuf>,

        /// Curation configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Surface that keeps the latest layers and logs everything else.
#[derive(Default)]
struct RecordingSurface {
    accepted_labels: Option<LabelImage>,
    rejected_labels: Option<LabelImage>,
    snr_mask: Option<ScalarImage>,
    visibility: Option<LayerVisibility>,
    errors: usize,
}

impl DisplaySurface for RecordingSurface {
    fn present(&mut self, update: &RenderUpdate) {
        debug!("Redrawing {:?}", update.changed_layers());
        if let Some(image) = &update.accepted_labels {
            self.accepted_labels = Some(image.clone());
        }
        if let Some(image) = &update.rejected_labels {
            self.rejected_labels = Some(image.clone());
        }
        if let Some(image) = &update.snr_mask {
            self.snr_mask = Some(image.clone());
        }
        if let Some(visibility) = update.visibility {
            self.visibility = Some(visibility);
        }
        if let Some(selection) = &update.selection {
            info!(
                "Selection: {} rectangle(s), {:?}",
                selection.rectangles.len(),
                selection.status
            );
        }
        match &update.traces {
            Some(TracePlotUpdate::Show(plot)) => {
                for series in &plot.series {
                    info!(
                        "Trace of region {}: {} frames, {} spike events",
                        series.region,
                        series.values.len(),
                        series.events.len()
                    );
                }
            }
            Some(TracePlotUpdate::Clear) => info!("Traces cleared"),
            Some(TracePlotUpdate::CurrentFrame(frame)) => debug!("Frame marker at {frame}"),
            None => {}
        }
    }

    fn show_histogram(&mut self, histogram: &SnrHistogram) {
        if let (Some(first), Some(last)) = (histogram.edges.first(), histogram.edges.last()) {
            info!(
                "SNR histogram: {} bins over [{}, {}]",
                histogram.n_bins(),
                first,
                last
            );
        }
    }

    fn report_error(&mut self, message: &str) {
        eprintln!("error: {message}");
        self.errors += 1;
    }
}

impl RecordingSurface {
    /// Writes every layer received so far as CSV.
    fn write_layers(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut paths = Vec::new();
        for (name, image) in [
            ("accepted_labels", &self.accepted_labels),
            ("rejected_labels", &self.rejected_labels),
        ] {
            if let Some(image) = image {
                let path = dir.join(format!("{name}.csv"));
                CurationWriter::create(&path)?.write_label_image_csv(image)?;
                paths.push(path);
            }
        }
        if let Some(mask) = &self.snr_mask {
            let path = dir.join("snr_mask.csv");
            CurationWriter::create(&path)?.write_scalar_image_csv(mask)?;
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Loads a session, applying an accept-matrix override.
fn load_session(path: &Path, accept: Option<&Path>) -> Result<LoadedSession> {
    let mut session = read_session(path)?;
    if let Some(accept_path) = accept {
        let matrix = read_accept_csv(accept_path)?;
        matrix.check_len(session.registry.len())?;
        session.accept = Some(matrix);
    }
    Ok(session)
}

fn load_config(path: Option<&Path>) -> Result<CurationConfig> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(CurationConfig::default()),
    }
}

fn build_state(session: LoadedSession, config: CurationConfig) -> Result<CurationState> {
    let initial = session.initial_state();
    Ok(CurationState::new(
        Arc::new(session.registry),
        initial,
        config,
    )?)
}

/// One line per selected region: decision and bounding-box size.
fn selection_summary(state: &CurationState) -> Result<Vec<String>> {
    state
        .selected()
        .iter()
        .map(|&id| -> Result<String> {
            let decision = if state.is_accepted(id)? {
                "accepted"
            } else {
                "rejected"
            };
            let bbox = state.registry().bounding_box(id)?;
            Ok(format!(
                "Region {}: {}, box {:.1}x{:.1}",
                id,
                decision,
                bbox.height(),
                bbox.width()
            ))
        })
        .collect()
}

/// Histogram table rows: bin range, bin center and count.
fn histogram_table(histogram: &SnrHistogram) -> Vec<String> {
    histogram
        .centers()
        .iter()
        .zip(&histogram.counts)
        .enumerate()
        .map(|(bin, (center, count))| {
            let range = format!(
                "[{:.2}, {:.2})",
                histogram.edges[bin],
                histogram.edges[bin + 1]
            );
            format!("{:<20} | {:<8.2} | {:<8}", range, center, count)
        })
        .collect()
}

fn passthrough_of(accept: Option<&AcceptMatrix>) -> Option<Vec<f64>> {
    accept.and_then(|matrix| matrix.passthrough.clone())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { session, accept } => {
            let loaded = load_session(&session, accept.as_deref())?;
            let registry = &loaded.registry;
            let shape = registry.shape();

            println!("Session: {}", session.display());
            println!("Shape: {}x{}", shape.height, shape.width);
            println!("Regions: {}", registry.len());
            println!("Frames: {}", registry.n_frames());

            let accepted = loaded
                .accept
                .as_ref()
                .map_or(registry.len(), |matrix| {
                    matrix.flags.iter().filter(|&&flag| flag).count()
                });
            println!("Initially accepted: {}", accepted);

            let snr = registry.snr_values();
            if !snr.is_empty() {
                let min = snr.iter().copied().fold(f64::INFINITY, f64::min);
                let max = snr.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                println!("SNR range: {:.2} - {:.2}", min, max);

                let histogram =
                    SnrHistogram::from_values(&snr, CurationConfig::default().histogram_edges)?;
                println!("{:<20} | {:<8} | {:<8}", "SNR bin", "Center", "Regions");
                println!("{:-<42}", "");
                for row in histogram_table(&histogram) {
                    println!("{}", row);
                }
            }
        }

        Commands::Render {
            session,
            output_dir,
            mode,
            select,
            threshold,
            accept,
        } => {
            let loaded = load_session(&session, accept.as_deref())?;
            let mut state = build_state(loaded, CurationConfig::default())?;

            if let Some(value) = threshold {
                state.set_snr_threshold(value)?;
            }
            state.set_mode(mode)?;
            if !select.is_empty() {
                state.select(&select)?;
            }
            let summary = selection_summary(&state)?;

            let session = CurationSession::open(state, RecordingSurface::default())?;
            let (_, surface) = session.into_parts();
            let paths = surface.write_layers(&output_dir)?;

            if let Some(visibility) = surface.visibility {
                println!(
                    "Mode {}: accepted {}, rejected {}, SNR mask {}",
                    mode,
                    visibility.accepted_labels,
                    visibility.rejected_labels,
                    visibility.snr_mask
                );
            }
            for line in &summary {
                println!("{}", line);
            }
            for path in &paths {
                println!("Wrote {}", path.display());
            }
        }

        Commands::Curate {
            session,
            events,
            output_dir,
            format,
            threshold,
            accept,
            config,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(value) = threshold {
                config = config.with_snr_threshold(value);
            }

            let loaded = load_session(&session, accept.as_deref())?;
            let passthrough = passthrough_of(loaded.accept.as_ref());
            let state = build_state(loaded, config)?;
            let mut session = CurationSession::open(state, RecordingSurface::default())?;

            let script: Vec<CurationEvent> = match &events {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
                None => Vec::new(),
            };

            let options = SaveOptions::new(&output_dir).with_format(format.into());
            let mut saves = 0usize;
            for event in &script {
                // Rejected events are reported by the surface; replay continues.
                if let Ok(Some(output)) = session.dispatch(event) {
                    save_curation(&output, passthrough.as_deref(), &options)?;
                    saves += 1;
                }
            }

            let output = session.state().save();
            let paths = save_curation(&output, passthrough.as_deref(), &options)?;

            let errors = session.surface().errors;
            if errors > 0 {
                warn!("{} of {} events were rejected", errors, script.len());
            }
            println!(
                "Replayed {} events ({} saves, {} rejected)",
                script.len(),
                saves,
                errors
            );
            println!(
                "Accepted: {} of {}",
                output.accepted_count(),
                output.accept_vector.len()
            );
            for path in &paths {
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_io::parse_session;
    use tempfile::tempdir;

    const SESSION: &str = r#"{
        "shape": [6, 6],
        "regions": [
            {"boundary": [[0, 0], [0, 2], [2, 1]], "trace": [1, 2], "snr": 4.0},
            {"boundary": [[3, 3], [3, 5], [5, 4]], "trace": [0, 1], "snr": 1.0}
        ]
    }"#;

    #[test]
    fn test_recording_surface_keeps_layers() {
        let state = build_state(parse_session(SESSION).unwrap(), CurationConfig::default())
            .unwrap();
        let mut session = CurationSession::open(state, RecordingSurface::default()).unwrap();
        session
            .dispatch(&CurationEvent::ModeButton(Mode::SnrThreshold))
            .unwrap();
        assert!(session.dispatch(&CurationEvent::SpinboxChange(7)).is_err());

        let (_, surface) = session.into_parts();
        assert_eq!(surface.errors, 1);
        assert!(surface.visibility.unwrap().snr_mask);

        let dir = tempdir().unwrap();
        let paths = surface.write_layers(dir.path()).unwrap();
        assert_eq!(paths.len(), 3);
        let mask = fs::read_to_string(dir.path().join("snr_mask.csv")).unwrap();
        assert!(mask.starts_with("4,0,4"));
    }

    #[test]
    fn test_selection_summary() {
        let mut state =
            build_state(parse_session(SESSION).unwrap(), CurationConfig::default()).unwrap();
        state.toggle(&[1]).unwrap();
        state.select(&[0, 1]).unwrap();
        assert_eq!(
            selection_summary(&state).unwrap(),
            vec![
                "Region 0: accepted, box 2.0x2.0".to_string(),
                "Region 1: rejected, box 2.0x2.0".to_string(),
            ]
        );
    }

    #[test]
    fn test_histogram_table() {
        let histogram = SnrHistogram::from_values(&[1.0, 4.0], 4).unwrap();
        let rows = histogram_table(&histogram);
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("[1.00, 2.00)"));
        assert!(rows[0].contains("| 1.50"));
        assert!(rows[2].trim_end().ends_with('1'));
    }

    #[test]
    fn test_mode_argument_parses() {
        let cli = Cli::try_parse_from([
            "calcium-curator",
            "render",
            "session.json",
            "--output-dir",
            "out",
            "--mode",
            "snr",
            "--select",
            "0,2",
        ])
        .unwrap();
        match cli.command {
            Commands::Render { mode, select, .. } => {
                assert_eq!(mode, Mode::SnrThreshold);
                assert_eq!(select, vec![0, 2]);
            }
            _ => panic!("expected render"),
        }
        assert!(Cli::try_parse_from([
            "calcium-curator",
            "render",
            "s.json",
            "-o",
            "out",
            "--mode",
            "zoom"
        ])
        .is_err());
    }
}
