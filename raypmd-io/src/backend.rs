//! Storage backend seam.
//!
//! [`SeriesBackend`] is the call surface this layer drives on the wrapped
//! storage library: fixed-extent dataset declaration, chunked store/load at
//! an offset, attribute get/set and iteration discovery. The chunking,
//! offset and bound bookkeeping above it lives in [`crate::store`]; the
//! byte-level encoding below it belongs entirely to the backend crates.

use crate::format::Format;
use crate::{Error, Result};
use std::path::Path;

/// Scalar datatypes a dataset can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// 32-bit float (all physical quantities).
    F32,
    /// Signed 32-bit integer (particle status).
    I32,
    /// Unsigned 64-bit integer (ray id).
    U64,
}

impl ScalarKind {
    /// Datatype tag written into JSON series.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::F32 => "FLOAT",
            Self::I32 => "INT",
            Self::U64 => "ULONGLONG",
        }
    }

    /// Parses the datatype tag of a JSON series.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "FLOAT" => Some(Self::F32),
            "INT" => Some(Self::I32),
            "ULONGLONG" => Some(Self::U64),
            _ => None,
        }
    }
}

/// Borrowed column data on its way into a backend.
#[derive(Debug, Clone, Copy)]
pub enum ColumnSlice<'a> {
    F32(&'a [f32]),
    I32(&'a [i32]),
    U64(&'a [u64]),
}

impl ColumnSlice<'_> {
    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(values) => values.len(),
            Self::I32(values) => values.len(),
            Self::U64(values) => values.len(),
        }
    }

    /// Whether the slice holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Datatype of the carried values.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::F32(_) => ScalarKind::F32,
            Self::I32(_) => ScalarKind::I32,
            Self::U64(_) => ScalarKind::U64,
        }
    }
}

/// Owned column data on its way out of a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnVec {
    F32(Vec<f32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
}

impl ColumnVec {
    /// Zero-filled column of the given kind and length.
    #[must_use]
    pub fn zeros(kind: ScalarKind, len: usize) -> Self {
        match kind {
            ScalarKind::F32 => Self::F32(vec![0.0; len]),
            ScalarKind::I32 => Self::I32(vec![0; len]),
            ScalarKind::U64 => Self::U64(vec![0; len]),
        }
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(values) => values.len(),
            Self::I32(values) => values.len(),
            Self::U64(values) => values.len(),
        }
    }

    /// Whether the column holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Datatype of the carried values.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::F32(_) => ScalarKind::F32,
            Self::I32(_) => ScalarKind::I32,
            Self::U64(_) => ScalarKind::U64,
        }
    }

    /// The f32 values, or a type-mismatch error naming `path`.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] when the column holds another kind.
    pub fn as_f32(&self, path: &str) -> Result<&[f32]> {
        match self {
            Self::F32(values) => Ok(values),
            _ => Err(Error::TypeMismatch {
                path: path.to_string(),
                expected: "FLOAT",
            }),
        }
    }

    /// The i32 values, or a type-mismatch error naming `path`.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] when the column holds another kind.
    pub fn as_i32(&self, path: &str) -> Result<&[i32]> {
        match self {
            Self::I32(values) => Ok(values),
            _ => Err(Error::TypeMismatch {
                path: path.to_string(),
                expected: "INT",
            }),
        }
    }

    /// The u64 values, or a type-mismatch error naming `path`.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] when the column holds another kind.
    pub fn as_u64(&self, path: &str) -> Result<&[u64]> {
        match self {
            Self::U64(values) => Ok(values),
            _ => Err(Error::TypeMismatch {
                path: path.to_string(),
                expected: "ULONGLONG",
            }),
        }
    }
}

/// Attribute values attached to the file root, groups and datasets.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    F64(f64),
    I64(i64),
    U64(u64),
    Str(String),
    F64Vec(Vec<f64>),
}

impl AttrValue {
    /// Numeric value as u64 where the representation allows it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::U64(value) => Some(value),
            Self::I64(value) => u64::try_from(value).ok(),
            Self::F64(value) if value >= 0.0 && value.fract() == 0.0 => Some(value as u64),
            _ => None,
        }
    }

    /// Numeric value as f64 where the representation allows it.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F64(value) => Some(value),
            Self::I64(value) => Some(value as f64),
            Self::U64(value) => Some(value as f64),
            _ => None,
        }
    }

    /// String value, if this is a string attribute.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

/// Call surface of the wrapped storage library.
///
/// Paths are slash-separated hierarchies (see [`crate::schema`]); the empty
/// path addresses the file root. Implementations own the underlying file
/// handle and release it on drop.
pub trait SeriesBackend {
    /// Declares a dataset with a fixed total extent. Declaring an existing
    /// path again resets it.
    fn create_dataset(&mut self, path: &str, kind: ScalarKind, extent: u64) -> Result<()>;

    /// Total declared extent of a dataset.
    fn dataset_extent(&self, path: &str) -> Result<u64>;

    /// Writes `data` at `offset..offset + data.len()`.
    fn store_chunk(&mut self, path: &str, offset: u64, data: ColumnSlice<'_>) -> Result<()>;

    /// Reads `count` values starting at `offset`.
    fn load_chunk(
        &self,
        path: &str,
        kind: ScalarKind,
        offset: u64,
        count: u64,
    ) -> Result<ColumnVec>;

    /// Sets (or overwrites) an attribute on the node at `path`.
    fn set_attr(&mut self, path: &str, name: &str, value: AttrValue) -> Result<()>;

    /// Reads an attribute from the node at `path`, `None` when absent.
    fn attr(&self, path: &str, name: &str) -> Result<Option<AttrValue>>;

    /// Iteration indices present in the series, ascending.
    fn iterations(&self) -> Result<Vec<u64>>;

    /// Species names present under one iteration, ascending.
    fn species_names(&self, iteration: u64) -> Result<Vec<String>>;

    /// Pushes pending writes to disk.
    fn flush(&mut self) -> Result<()>;
}

/// Opens a backend over a fresh file in write mode.
///
/// # Errors
/// Fails when the backend is not compiled in or the file cannot be created.
pub fn create_backend(format: Format, path: &Path) -> Result<Box<dyn SeriesBackend>> {
    match format {
        Format::Json => Ok(Box::new(crate::json::JsonBackend::create(path))),
        Format::Hdf5 => {
            #[cfg(feature = "hdf5")]
            {
                Ok(Box::new(crate::hdf5::Hdf5Backend::create(path)?))
            }
            #[cfg(not(feature = "hdf5"))]
            {
                Err(Error::UnsupportedBackend(format!(
                    "hdf5 backend not compiled in (enable the `hdf5` feature): {}",
                    path.display()
                )))
            }
        }
    }
}

/// Opens a backend over an existing file in read mode.
///
/// # Errors
/// Fails when the backend is not compiled in or the file cannot be opened.
pub fn open_backend(format: Format, path: &Path) -> Result<Box<dyn SeriesBackend>> {
    match format {
        Format::Json => Ok(Box::new(crate::json::JsonBackend::open(path)?)),
        Format::Hdf5 => {
            #[cfg(feature = "hdf5")]
            {
                Ok(Box::new(crate::hdf5::Hdf5Backend::open(path)?))
            }
            #[cfg(not(feature = "hdf5"))]
            {
                Err(Error::UnsupportedBackend(format!(
                    "hdf5 backend not compiled in (enable the `hdf5` feature): {}",
                    path.display()
                )))
            }
        }
    }
}
