//! File writers for curation output.

use crate::{Error, Result};
use curator_core::{LabelImage, ScalarImage, TraceMatrix};
use curator_state::CurationOutput;
use log::info;
use ndarray::Array2;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default file stem for the saved accept vector.
pub const DEFAULT_ACCEPT_NAME: &str = "iscell_curated";
/// Default file stem for the saved trace matrix.
pub const DEFAULT_TRACES_NAME: &str = "f_curated";

/// On-disk format for saved output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Comma separated text with a header line.
    #[default]
    Csv,
    /// Little-endian binary.
    Binary,
    /// Single HDF5 file.
    #[cfg(feature = "hdf5")]
    Hdf5,
}

impl OutputFormat {
    /// File extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Binary => "bin",
            #[cfg(feature = "hdf5")]
            OutputFormat::Hdf5 => "h5",
        }
    }
}

/// Where and how [`save_curation`] writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub accept_name: String,
    pub traces_name: String,
}

impl SaveOptions {
    /// Default names in `output_dir`, CSV format.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            format: OutputFormat::default(),
            accept_name: DEFAULT_ACCEPT_NAME.to_string(),
            traces_name: DEFAULT_TRACES_NAME.to_string(),
        }
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the accept-vector and trace-matrix file stems.
    #[must_use]
    pub fn with_names(mut self, accept: &str, traces: &str) -> Self {
        self.accept_name = accept.to_string();
        self.traces_name = traces.to_string();
        self
    }

    fn path_for(&self, stem: &str) -> PathBuf {
        self.output_dir
            .join(stem)
            .with_extension(self.format.extension())
    }
}

/// Buffered writer for accept vectors, trace matrices and images.
pub struct CurationWriter {
    writer: BufWriter<File>,
}

impl CurationWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes the accept vector as CSV, with the pass-through column if given.
    ///
    /// # Errors
    /// Returns an error on write failure or a pass-through length mismatch.
    pub fn write_accept_csv(&mut self, accept: &[u8], passthrough: Option<&[f64]>) -> Result<()> {
        check_passthrough(accept, passthrough)?;
        match passthrough {
            Some(extra) => {
                writeln!(self.writer, "accepted,passthrough")?;
                for (flag, value) in accept.iter().zip(extra) {
                    writeln!(self.writer, "{flag},{value}")?;
                }
            }
            None => {
                writeln!(self.writer, "accepted")?;
                for flag in accept {
                    writeln!(self.writer, "{flag}")?;
                }
            }
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes the accept vector as binary data.
    ///
    /// Format: one u8 per region, or f64 (flag) + f64 (pass-through) per
    /// region when a pass-through column is given.
    ///
    /// # Errors
    /// Returns an error on write failure or a pass-through length mismatch.
    pub fn write_accept_binary(
        &mut self,
        accept: &[u8],
        passthrough: Option<&[f64]>,
    ) -> Result<()> {
        check_passthrough(accept, passthrough)?;
        match passthrough {
            Some(extra) => {
                for (&flag, value) in accept.iter().zip(extra) {
                    self.writer.write_all(&f64::from(flag).to_le_bytes())?;
                    self.writer.write_all(&value.to_le_bytes())?;
                }
            }
            None => self.writer.write_all(accept)?,
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes an `N x T` trace matrix as CSV, one region per line.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_traces_csv(&mut self, traces: &TraceMatrix) -> Result<()> {
        let header: Vec<String> = (0..traces.ncols()).map(|t| format!("t{t}")).collect();
        writeln!(self.writer, "{}", header.join(","))?;
        self.write_rows(traces)
    }

    /// Writes an `N x T` trace matrix as binary data.
    ///
    /// Format: u64 (rows) + u64 (cols) + row-major f64 values.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_traces_binary(&mut self, traces: &TraceMatrix) -> Result<()> {
        let (rows, cols) = traces.dim();
        self.writer.write_all(&(rows as u64).to_le_bytes())?;
        self.writer.write_all(&(cols as u64).to_le_bytes())?;
        for value in traces {
            self.writer.write_all(&value.to_le_bytes())?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes a label image as CSV, one pixel row per line.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_label_image_csv(&mut self, image: &LabelImage) -> Result<()> {
        self.write_rows(image)
    }

    /// Writes a scalar mask as CSV, one pixel row per line.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_scalar_image_csv(&mut self, image: &ScalarImage) -> Result<()> {
        self.write_rows(image)
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error on flush failure.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn write_rows<T: Display>(&mut self, matrix: &Array2<T>) -> Result<()> {
        for row in matrix.rows() {
            let line: Vec<String> = row.iter().map(ToString::to_string).collect();
            writeln!(self.writer, "{}", line.join(","))?;
        }

        self.writer.flush()?;
        Ok(())
    }
}

fn check_passthrough(accept: &[u8], passthrough: Option<&[f64]>) -> Result<()> {
    match passthrough {
        Some(extra) if extra.len() != accept.len() => Err(Error::InvalidFormat(format!(
            "pass-through column has {} rows, accept vector has {}",
            extra.len(),
            accept.len()
        ))),
        _ => Ok(()),
    }
}

/// Writes the accept vector and trace matrix of a save event.
///
/// Returns the paths written. HDF5 output goes to a single file named after
/// the accept stem.
///
/// # Errors
/// Returns an error if the directory or a file cannot be written.
pub fn save_curation(
    output: &CurationOutput,
    passthrough: Option<&[f64]>,
    options: &SaveOptions,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&options.output_dir)?;

    let paths = match options.format {
        OutputFormat::Csv => {
            let accept_path = options.path_for(&options.accept_name);
            let traces_path = options.path_for(&options.traces_name);
            CurationWriter::create(&accept_path)?
                .write_accept_csv(&output.accept_vector, passthrough)?;
            CurationWriter::create(&traces_path)?.write_traces_csv(&output.traces)?;
            vec![accept_path, traces_path]
        }
        OutputFormat::Binary => {
            let accept_path = options.path_for(&options.accept_name);
            let traces_path = options.path_for(&options.traces_name);
            CurationWriter::create(&accept_path)?
                .write_accept_binary(&output.accept_vector, passthrough)?;
            CurationWriter::create(&traces_path)?.write_traces_binary(&output.traces)?;
            vec![accept_path, traces_path]
        }
        #[cfg(feature = "hdf5")]
        OutputFormat::Hdf5 => {
            let path = options.path_for(&options.accept_name);
            crate::hdf5::write_curation_hdf5(&path, output, passthrough)?;
            vec![path]
        }
    };

    info!(
        "Saved {} accepted of {} regions to {}",
        output.accepted_count(),
        output.accept_vector.len(),
        options.output_dir.display()
    );
    Ok(paths)
}
