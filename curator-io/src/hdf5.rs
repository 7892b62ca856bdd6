//! HDF5 output for saved curation results.
//!
//! Layout:
//! - `/curation/accepted`: `u8`, `(N,)`
//! - `/curation/passthrough`: `f64`, `(N,)`, only when an input column was given
//! - `/curation/traces`: `f64`, `(N, T)`

use crate::{Error, Result};
use curator_state::CurationOutput;
use hdf5::types::{H5Type, VarLenUnicode};
use hdf5::{File, Group};
use ndarray::{Array2, ArrayView1};
use std::path::Path;
use std::str::FromStr;

const FORMAT_VERSION: &str = "0.1";

/// Curation results read back from an HDF5 file.
#[derive(Debug, Clone, PartialEq)]
pub struct CurationData {
    pub accepted: Vec<u8>,
    pub passthrough: Option<Vec<f64>>,
    pub traces: Array2<f64>,
    pub format_version: Option<String>,
}

/// Writes an accept vector and trace matrix to a new HDF5 file.
///
/// # Errors
/// Returns an error if the file or datasets cannot be created.
pub fn write_curation_hdf5<P: AsRef<Path>>(
    path: P,
    output: &CurationOutput,
    passthrough: Option<&[f64]>,
) -> Result<()> {
    if let Some(extra) = passthrough {
        if extra.len() != output.accept_vector.len() {
            return Err(Error::InvalidFormat(format!(
                "pass-through column has {} rows, accept vector has {}",
                extra.len(),
                output.accept_vector.len()
            )));
        }
    }

    let file = File::create(path)?;
    set_attr_str(&file, "curator_format_version", FORMAT_VERSION)?;

    let group = file.create_group("curation")?;
    write_1d(&group, "accepted", &output.accept_vector)?;
    if let Some(extra) = passthrough {
        write_1d(&group, "passthrough", extra)?;
    }

    let traces = group
        .new_dataset::<f64>()
        .shape(output.traces.dim())
        .create("traces")?;
    traces.write(output.traces.view())?;
    Ok(())
}

/// Reads curation results written by [`write_curation_hdf5`].
///
/// # Errors
/// Returns an error if the file or a required dataset is missing.
pub fn read_curation_hdf5<P: AsRef<Path>>(path: P) -> Result<CurationData> {
    let file = File::open(path)?;
    let format_version = match file.attr("curator_format_version") {
        Ok(attr) => Some(attr.read_scalar::<VarLenUnicode>()?.to_string()),
        Err(_) => None,
    };

    let group = file.group("curation")?;
    let accepted = group.dataset("accepted")?.read_raw::<u8>()?;
    let passthrough = match group.dataset("passthrough") {
        Ok(dataset) => Some(dataset.read_raw::<f64>()?),
        Err(_) => None,
    };
    let traces = group.dataset("traces")?.read_2d::<f64>()?;

    Ok(CurationData {
        accepted,
        passthrough,
        traces,
        format_version,
    })
}

fn write_1d<T: H5Type>(group: &Group, name: &str, values: &[T]) -> Result<()> {
    let dataset = group
        .new_dataset::<T>()
        .shape((values.len(),))
        .create(name)?;
    dataset.write(ArrayView1::from(values))?;
    Ok(())
}

fn set_attr_str(group: &Group, name: &str, value: &str) -> Result<()> {
    let value = VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))?;
    group
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}
