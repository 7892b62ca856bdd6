//! Session and accept-matrix readers.
//!

use crate::{Error, Result};
use curator_core::{BoundaryPoint, RasterShape, Region, RegionRegistry};
use curator_state::InitialState;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One region as stored in a session file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Closed boundary as `[row, col]` pairs.
    pub boundary: Vec<[f64; 2]>,
    /// Fluorescence trace, one value per frame.
    pub trace: Vec<f64>,
    /// Deconvolved spike signal, one value per frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spikes: Option<Vec<f64>>,
    /// Signal-to-noise ratio.
    pub snr: f64,
}

impl From<RegionRecord> for Region {
    fn from(record: RegionRecord) -> Self {
        let boundary = record.boundary.into_iter().map(BoundaryPoint::from).collect();
        let region = Region::new(boundary, record.trace, record.snr);
        match record.spikes {
            Some(spikes) => region.with_spikes(spikes),
            None => region,
        }
    }
}

/// JSON session file: image shape, regions and an optional accept matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    /// `[height, width]` of the source image.
    pub shape: [usize; 2],
    /// Regions in id order.
    pub regions: Vec<RegionRecord>,
    /// Initial accept matrix, one row per region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<Vec<Vec<f64>>>,
}

/// A loaded session, ready to build a curation state from.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub registry: RegionRegistry,
    pub accept: Option<AcceptMatrix>,
}

impl LoadedSession {
    /// Initial partition: the accept matrix flags, or all accepted.
    #[must_use]
    pub fn initial_state(&self) -> InitialState {
        self.accept
            .as_ref()
            .map_or(InitialState::AllAccepted, AcceptMatrix::to_initial_state)
    }
}

impl SessionFile {
    /// Builds the registry and accept matrix.
    ///
    /// # Errors
    /// Returns an error if a region is malformed, a boundary falls outside
    /// the image, or the accept matrix does not match the region count.
    pub fn into_session(self) -> Result<LoadedSession> {
        let [height, width] = self.shape;
        let regions: Vec<Region> = self.regions.into_iter().map(Region::from).collect();
        let registry = RegionRegistry::new(RasterShape::new(height, width), regions)?;
        registry.validate()?;

        let accept = self
            .accept
            .map(|rows| AcceptMatrix::from_rows(&rows))
            .transpose()?;
        if let Some(accept) = &accept {
            accept.check_len(registry.len())?;
        }

        Ok(LoadedSession { registry, accept })
    }
}

/// Parses a session from JSON text.
///
/// # Errors
/// Returns an error for malformed JSON or an invalid session.
pub fn parse_session(json: &str) -> Result<LoadedSession> {
    let file: SessionFile = serde_json::from_str(json)?;
    file.into_session()
}

/// Reads a session file.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid session.
pub fn read_session<P: AsRef<Path>>(path: P) -> Result<LoadedSession> {
    let path = path.as_ref();
    let session = parse_session(&fs::read_to_string(path)?)?;
    info!(
        "Loaded {} regions ({} frames) from {}",
        session.registry.len(),
        session.registry.n_frames(),
        path.display()
    );
    Ok(session)
}

/// Initial accept flags plus the optional pass-through column.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptMatrix {
    /// Column 0: nonzero means accepted.
    pub flags: Vec<bool>,
    /// Column 1, written back unchanged on save.
    pub passthrough: Option<Vec<f64>>,
}

impl AcceptMatrix {
    /// Builds the matrix from numeric rows.
    ///
    /// Every row needs the same width, at least one column. Columns past
    /// the second are ignored.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for ragged or empty rows and
    /// non-finite flags.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows.first().map_or(1, Vec::len);
        if width == 0 {
            return Err(Error::InvalidFormat("accept rows have no columns".into()));
        }

        let mut flags = Vec::with_capacity(rows.len());
        let mut passthrough = (width > 1).then(|| Vec::with_capacity(rows.len()));
        for (index, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(Error::InvalidFormat(format!(
                    "accept row {index} has {} columns, expected {width}",
                    row.len()
                )));
            }
            let flag = row[0];
            if !flag.is_finite() {
                return Err(Error::InvalidFormat(format!(
                    "accept row {index} has non-finite flag {flag}"
                )));
            }
            flags.push(flag != 0.0);
            if let Some(column) = passthrough.as_mut() {
                column.push(row[1]);
            }
        }

        Ok(Self { flags, passthrough })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns true if the matrix has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Checks that the matrix covers `n_regions` regions.
    ///
    /// # Errors
    /// Returns [`curator_core::Error::AcceptLengthMismatch`] otherwise.
    pub fn check_len(&self, n_regions: usize) -> Result<()> {
        if self.len() == n_regions {
            Ok(())
        } else {
            Err(curator_core::Error::AcceptLengthMismatch {
                expected: n_regions,
                found: self.len(),
            }
            .into())
        }
    }

    /// Initial partition from the flag column.
    #[must_use]
    pub fn to_initial_state(&self) -> InitialState {
        InitialState::Flags(self.flags.clone())
    }
}

/// Parses an accept matrix from CSV text.
///
/// A first non-blank line that does not parse as numbers is treated as a
/// header. Blank lines are skipped.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] for non-numeric values past the header
/// or ragged rows.
pub fn parse_accept_csv(text: &str) -> Result<AcceptMatrix> {
    let mut rows = Vec::new();
    let mut first = true;
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let header_allowed = std::mem::replace(&mut first, false);
        match parse_row(line) {
            Some(row) => rows.push(row),
            None if header_allowed => debug!("Skipping accept header {line:?}"),
            None => {
                return Err(Error::InvalidFormat(format!(
                    "line {}: non-numeric accept row {line:?}",
                    index + 1
                )))
            }
        }
    }
    AcceptMatrix::from_rows(&rows)
}

/// Reads an accept matrix from a CSV file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_accept_csv<P: AsRef<Path>>(path: P) -> Result<AcceptMatrix> {
    parse_accept_csv(&fs::read_to_string(path)?)
}

fn parse_row(line: &str) -> Option<Vec<f64>> {
    line.split(',')
        .map(|field| field.trim().parse::<f64>().ok())
        .collect()
}
