//! Crate-level error type.
//!
//! Problems inside a template never surface here; they are recorded as
//! diagnostics.  This type covers the I/O around rendering: reading the
//! template and data files and writing the output.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The template file could not be read.
    #[error("can't open template {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A data file could not be read.
    #[error("can't open data file {}: {source}", path.display())]
    Data {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output file could not be created or written.
    #[error("can't write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
