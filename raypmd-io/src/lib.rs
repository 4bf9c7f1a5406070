//! raypmd-io: openPMD-style ray-trace series I/O for raypmd.
//!
//! This crate stores and reloads [`raypmd_core`] ray batches in the openPMD
//! group-based layout, buffered and committed one chunk at a time. JSON is
//! always available; HDF5 sits behind the `hdf5` feature.

pub mod backend;
mod error;
pub mod format;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod json;
pub mod schema;
mod store;

pub use backend::{
    create_backend, open_backend, AttrValue, ColumnSlice, ColumnVec, ScalarKind, SeriesBackend,
};
pub use error::{Error, Result};
pub use format::{resolve_path, Format};
#[cfg(feature = "hdf5")]
pub use hdf5::Hdf5Backend;
pub use json::JsonBackend;
pub use store::{
    series_info, FieldRange, RayReader, RayWriter, SeriesInfo, SpeciesInfo, StoreOptions,
    DEFAULT_CHUNK_SIZE,
};
