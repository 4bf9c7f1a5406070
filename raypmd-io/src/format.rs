//! Output format selection and filename resolution.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Available storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// openPMD-style JSON series (always available).
    Json,
    /// HDF5 series (requires the `hdf5` cargo feature).
    Hdf5,
}

impl Format {
    /// Canonical file extension.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Hdf5 => "h5",
        }
    }

    /// Maps a file extension onto a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "h5" | "hdf5" => Some(Self::Hdf5),
            _ => None,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Resolves the on-disk path and backend for a requested file.
///
/// With an explicit format the canonical extension is appended unless the
/// path already carries it. Without one, the existing extension selects the
/// backend; an unknown or missing extension is an error.
///
/// # Errors
/// Returns [`Error::UnknownFormat`] when no format can be inferred.
pub fn resolve_path(path: &Path, format: Option<Format>) -> Result<(PathBuf, Format)> {
    let current = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Format::from_extension);

    match (format, current) {
        (Some(requested), Some(existing)) if requested == existing => {
            Ok((path.to_path_buf(), requested))
        }
        (Some(requested), _) => {
            let mut name = path.as_os_str().to_owned();
            name.push(".");
            name.push(requested.extension());
            Ok((PathBuf::from(name), requested))
        }
        (None, Some(existing)) => Ok((path.to_path_buf(), existing)),
        (None, None) => Err(Error::UnknownFormat(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_format_appends_extension() {
        let (path, format) = resolve_path(Path::new("run42"), Some(Format::Json)).unwrap();
        assert_eq!(path, PathBuf::from("run42.json"));
        assert_eq!(format, Format::Json);
    }

    #[test]
    fn test_explicit_format_keeps_matching_extension() {
        let (path, format) = resolve_path(Path::new("run42.h5"), Some(Format::Hdf5)).unwrap();
        assert_eq!(path, PathBuf::from("run42.h5"));
        assert_eq!(format, Format::Hdf5);
    }

    #[test]
    fn test_inferred_from_extension() {
        let (path, format) = resolve_path(Path::new("out.json"), None).unwrap();
        assert_eq!(path, PathBuf::from("out.json"));
        assert_eq!(format, Format::Json);

        let (_, format) = resolve_path(Path::new("out.hdf5"), None).unwrap();
        assert_eq!(format, Format::Hdf5);
    }

    #[test]
    fn test_unknown_extension_is_error() {
        assert!(matches!(
            resolve_path(Path::new("out.xyz"), None),
            Err(Error::UnknownFormat(_))
        ));
        assert!(matches!(
            resolve_path(Path::new("out"), None),
            Err(Error::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_mismatched_explicit_format_appends() {
        // explicit format wins; "data.json.h5" targets the HDF5 backend
        let (path, format) = resolve_path(Path::new("data.json"), Some(Format::Hdf5)).unwrap();
        assert_eq!(path, PathBuf::from("data.json.h5"));
        assert_eq!(format, Format::Hdf5);
    }
}
