//! curator-io: Session loading and output writers for calcium-curator.
//!
//! This crate reads JSON session files and accept matrices, and writes
//! saved curation results and rendered images as CSV, binary or HDF5.
//!

mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
mod reader;
mod writer;

pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use hdf5::{read_curation_hdf5, write_curation_hdf5, CurationData};
pub use reader::{
    parse_accept_csv, parse_session, read_accept_csv, read_session, AcceptMatrix, LoadedSession,
    RegionRecord, SessionFile,
};
pub use writer::{
    save_curation, CurationWriter, OutputFormat, SaveOptions, DEFAULT_ACCEPT_NAME,
    DEFAULT_TRACES_NAME,
};
