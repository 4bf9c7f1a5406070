//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON backend error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HDF5 backend error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// No backend matches the file extension.
    #[error("unknown file format: {0}")]
    UnknownFormat(String),

    /// Backend not compiled into this build.
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// File content does not match the expected series layout.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Dataset missing from the opened series.
    #[error("missing dataset: {0}")]
    MissingDataset(String),

    /// Dataset holds a different scalar type than requested.
    #[error("type mismatch at {path}: expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
    },

    /// Chunk transfer past the declared dataset extent.
    #[error("chunk [{offset}, {offset}+{count}) out of bounds at {path} (extent {extent})")]
    ChunkOutOfBounds {
        path: String,
        offset: u64,
        count: u64,
        extent: u64,
    },

    /// A flush would push the committed row count past the declared
    /// maximum. Fatal: nothing is written.
    #[error(
        "schema bound exceeded: {buffered} buffered rows do not fit, \
         {committed} of {max_rays} already committed"
    )]
    SchemaBoundExceeded {
        committed: u64,
        buffered: u64,
        max_rays: u64,
    },

    /// More rays requested on open-for-read than were committed.
    #[error("read bound exceeded: requested {requested} rays, file holds {committed}")]
    ReadBoundExceeded { requested: u64, committed: u64 },
}
