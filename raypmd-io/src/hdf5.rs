//! HDF5 series backend.
//!
//! Maps series paths (`data/<iter>/particles/<species>/...`) onto HDF5
//! groups and fixed-extent 1-D datasets. Chunked writes go through
//! hyperslab selections so a dataset is only ever touched in the region
//! being stored.

use crate::backend::{AttrValue, ColumnSlice, ColumnVec, ScalarKind, SeriesBackend};
use crate::{Error, Result};
use hdf5::types::{H5Type, TypeDescriptor, VarLenUnicode};
use hdf5::{Dataset, File, Group, Location};
use ndarray::{s, Array1, ArrayView1};
use std::path::Path;
use std::str::FromStr;

/// HDF5-backed series bound to one file.
pub struct Hdf5Backend {
    file: File,
}

impl Hdf5Backend {
    /// Creates a new file, truncating any existing one.
    ///
    /// # Errors
    /// Returns an error if the HDF5 file cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            file: File::create(path)?,
        })
    }

    /// Opens an existing file read-only.
    ///
    /// # Errors
    /// Returns an error if the HDF5 file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            file: File::open(path)?,
        })
    }

    fn ensure_group(&self, path: &str) -> Result<Group> {
        let mut current = self.file.group("/")?;
        for segment in path.split('/') {
            current = match current.group(segment) {
                Ok(group) => group,
                Err(_) => current.create_group(segment)?,
            };
        }
        Ok(current)
    }

    fn dataset(&self, path: &str) -> Result<Dataset> {
        self.file
            .dataset(path)
            .map_err(|_| Error::MissingDataset(path.to_string()))
    }
}

impl SeriesBackend for Hdf5Backend {
    fn create_dataset(&mut self, path: &str, kind: ScalarKind, extent: u64) -> Result<()> {
        let (parent, name) = split_dataset_path(path)?;
        let group = self.ensure_group(parent)?;
        let extent = usize::try_from(extent)
            .map_err(|_| Error::InvalidFormat(format!("{path}: extent too large")))?;
        match kind {
            ScalarKind::F32 => create_column_dataset::<f32>(&group, name, extent)?,
            ScalarKind::I32 => create_column_dataset::<i32>(&group, name, extent)?,
            ScalarKind::U64 => create_column_dataset::<u64>(&group, name, extent)?,
        }
        Ok(())
    }

    fn dataset_extent(&self, path: &str) -> Result<u64> {
        let dataset = self.dataset(path)?;
        Ok(dataset.shape().first().copied().unwrap_or(0) as u64)
    }

    fn store_chunk(&mut self, path: &str, offset: u64, data: ColumnSlice<'_>) -> Result<()> {
        let dataset = self.dataset(path)?;
        let (start, end) = chunk_range(path, &dataset, offset, data.len() as u64)?;
        match data {
            ColumnSlice::F32(src) => {
                dataset.write_slice(ArrayView1::from(src), s![start..end])?;
            }
            ColumnSlice::I32(src) => {
                dataset.write_slice(ArrayView1::from(src), s![start..end])?;
            }
            ColumnSlice::U64(src) => {
                dataset.write_slice(ArrayView1::from(src), s![start..end])?;
            }
        }
        Ok(())
    }

    fn load_chunk(
        &self,
        path: &str,
        kind: ScalarKind,
        offset: u64,
        count: u64,
    ) -> Result<ColumnVec> {
        let dataset = self.dataset(path)?;
        let (start, end) = chunk_range(path, &dataset, offset, count)?;
        let data = match kind {
            ScalarKind::F32 => {
                let values: Array1<f32> = dataset.read_slice_1d(s![start..end])?;
                ColumnVec::F32(values.to_vec())
            }
            ScalarKind::I32 => {
                let values: Array1<i32> = dataset.read_slice_1d(s![start..end])?;
                ColumnVec::I32(values.to_vec())
            }
            ScalarKind::U64 => {
                let values: Array1<u64> = dataset.read_slice_1d(s![start..end])?;
                ColumnVec::U64(values.to_vec())
            }
        };
        Ok(data)
    }

    fn set_attr(&mut self, path: &str, name: &str, value: AttrValue) -> Result<()> {
        if path.is_empty() {
            return write_attr(&self.file, name, &value);
        }
        if let Ok(dataset) = self.file.dataset(path) {
            return write_attr(&dataset, name, &value);
        }
        let group = self.ensure_group(path)?;
        write_attr(&group, name, &value)
    }

    fn attr(&self, path: &str, name: &str) -> Result<Option<AttrValue>> {
        if path.is_empty() {
            return read_attr(&self.file, name);
        }
        if let Ok(dataset) = self.file.dataset(path) {
            return read_attr(&dataset, name);
        }
        match self.file.group(path) {
            Ok(group) => read_attr(&group, name),
            Err(_) => Ok(None),
        }
    }

    fn iterations(&self) -> Result<Vec<u64>> {
        let Ok(data) = self.file.group("data") else {
            return Ok(Vec::new());
        };
        let mut iterations: Vec<u64> = data
            .member_names()?
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        iterations.sort_unstable();
        Ok(iterations)
    }

    fn species_names(&self, iteration: u64) -> Result<Vec<String>> {
        let path = format!("data/{iteration}/particles");
        let Ok(particles) = self.file.group(&path) else {
            return Ok(Vec::new());
        };
        let mut names = particles.member_names()?;
        names.sort_unstable();
        Ok(names)
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

fn split_dataset_path(path: &str) -> Result<(&str, &str)> {
    path.rsplit_once('/')
        .ok_or_else(|| Error::InvalidFormat(format!("{path}: dataset path has no parent group")))
}

fn create_column_dataset<T: H5Type>(group: &Group, name: &str, extent: usize) -> Result<()> {
    group.new_dataset::<T>().shape((extent,)).create(name)?;
    Ok(())
}

fn chunk_range(path: &str, dataset: &Dataset, offset: u64, count: u64) -> Result<(usize, usize)> {
    let extent = dataset.shape().first().copied().unwrap_or(0) as u64;
    if offset + count > extent {
        return Err(Error::ChunkOutOfBounds {
            path: path.to_string(),
            offset,
            count,
            extent,
        });
    }
    #[allow(clippy::cast_possible_truncation)]
    let start = offset as usize;
    #[allow(clippy::cast_possible_truncation)]
    let end = start + count as usize;
    Ok((start, end))
}

fn write_attr(location: &Location, name: &str, value: &AttrValue) -> Result<()> {
    match value {
        AttrValue::F64(v) => write_scalar_attr(location, name, v),
        AttrValue::I64(v) => write_scalar_attr(location, name, v),
        AttrValue::U64(v) => write_scalar_attr(location, name, v),
        AttrValue::Str(v) => {
            let value = to_var_len_unicode(v)?;
            write_scalar_attr(location, name, &value)
        }
        AttrValue::F64Vec(values) => {
            let view = ArrayView1::from(values.as_slice());
            if let Ok(attr) = location.attr(name) {
                attr.write(view)?;
            } else {
                location
                    .new_attr::<f64>()
                    .shape((values.len(),))
                    .create(name)?
                    .write(view)?;
            }
            Ok(())
        }
    }
}

// Overwrites in place so repeated flushes can refresh an attribute.
fn write_scalar_attr<T: H5Type>(location: &Location, name: &str, value: &T) -> Result<()> {
    if let Ok(attr) = location.attr(name) {
        attr.write_scalar(value)?;
    } else {
        location
            .new_attr::<T>()
            .create(name)?
            .write_scalar(value)?;
    }
    Ok(())
}

fn read_attr(location: &Location, name: &str) -> Result<Option<AttrValue>> {
    let Ok(attr) = location.attr(name) else {
        return Ok(None);
    };
    let descriptor = attr.dtype()?.to_descriptor()?;
    let value = match descriptor {
        TypeDescriptor::Unsigned(_) => AttrValue::U64(attr.read_scalar::<u64>()?),
        TypeDescriptor::Integer(_) => AttrValue::I64(attr.read_scalar::<i64>()?),
        TypeDescriptor::Float(_) => {
            if attr.ndim() == 0 {
                AttrValue::F64(attr.read_scalar::<f64>()?)
            } else {
                AttrValue::F64Vec(attr.read_raw::<f64>()?)
            }
        }
        TypeDescriptor::VarLenUnicode | TypeDescriptor::VarLenAscii => {
            AttrValue::Str(attr.read_scalar::<VarLenUnicode>()?.to_string())
        }
        other => {
            return Err(Error::InvalidFormat(format!(
                "attribute {name} has unsupported type {other}"
            )))
        }
    };
    Ok(Some(value))
}

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode> {
    VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_hdf5_chunked_store_and_load() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = Hdf5Backend::create(file.path()).unwrap();

        let path = "data/1/particles/neutron/position/x";
        backend.create_dataset(path, ScalarKind::F32, 4).unwrap();
        backend
            .store_chunk(path, 0, ColumnSlice::F32(&[1.0, 2.0]))
            .unwrap();
        backend
            .store_chunk(path, 2, ColumnSlice::F32(&[3.0, 4.0]))
            .unwrap();
        backend.flush().unwrap();
        drop(backend);

        let reopened = Hdf5Backend::open(file.path()).unwrap();
        assert_eq!(reopened.dataset_extent(path).unwrap(), 4);
        let loaded = reopened.load_chunk(path, ScalarKind::F32, 1, 2).unwrap();
        assert_eq!(loaded.as_f32(path).unwrap(), &[2.0, 3.0]);
        assert_eq!(reopened.iterations().unwrap(), vec![1]);
        assert_eq!(reopened.species_names(1).unwrap(), vec!["neutron"]);
    }

    #[test]
    fn test_hdf5_attrs_round_trip_and_overwrite() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = Hdf5Backend::create(file.path()).unwrap();

        backend
            .set_attr("", "author", AttrValue::Str("tester".to_string()))
            .unwrap();
        backend
            .set_attr("data/1/particles/neutron", "numParticles", AttrValue::U64(2))
            .unwrap();
        backend
            .set_attr("data/1/particles/neutron", "numParticles", AttrValue::U64(5))
            .unwrap();
        backend
            .set_attr(
                "data/1/particles/neutron",
                "unitDimension",
                AttrValue::F64Vec(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            )
            .unwrap();
        backend.flush().unwrap();
        drop(backend);

        let reopened = Hdf5Backend::open(file.path()).unwrap();
        assert_eq!(
            reopened.attr("", "author").unwrap(),
            Some(AttrValue::Str("tester".to_string()))
        );
        assert_eq!(
            reopened
                .attr("data/1/particles/neutron", "numParticles")
                .unwrap()
                .and_then(|v| v.as_u64()),
            Some(5)
        );
        assert_eq!(
            reopened
                .attr("data/1/particles/neutron", "unitDimension")
                .unwrap(),
            Some(AttrValue::F64Vec(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
        );
        assert_eq!(reopened.attr("", "missing").unwrap(), None);
    }

    #[test]
    fn test_hdf5_store_past_extent_is_error() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = Hdf5Backend::create(file.path()).unwrap();
        backend.create_dataset("g/d", ScalarKind::U64, 2).unwrap();
        let err = backend
            .store_chunk("g/d", 1, ColumnSlice::U64(&[1, 2]))
            .unwrap_err();
        assert!(matches!(err, Error::ChunkOutOfBounds { .. }));
    }
}
