//! JSON series backend.
//!
//! Mirrors the openPMD JSON layout: one nested object tree where every
//! group node carries an `attributes` object and every dataset node carries
//! `datatype`, `data` and `attributes`. The whole series lives in memory
//! and is rewritten on flush; datasets are materialized at their declared
//! extent so chunked writes are plain slice splices.
//!
//! Number encoding is delegated to serde_json. f32 values pass through f64
//! losslessly; non-finite floats are not representable in JSON and fail the
//! flush.

use crate::backend::{AttrValue, ColumnSlice, ColumnVec, ScalarKind, SeriesBackend};
use crate::{Error, Result};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

type AttrMap = BTreeMap<String, AttrValue>;

const ATTRIBUTES_KEY: &str = "attributes";
const DATA_KEY: &str = "data";
const DATATYPE_KEY: &str = "datatype";

#[derive(Debug, Clone)]
struct JsonDataset {
    kind: ScalarKind,
    data: ColumnVec,
    attrs: AttrMap,
}

/// In-memory JSON series bound to one file.
pub struct JsonBackend {
    path: PathBuf,
    writable: bool,
    root_attrs: AttrMap,
    group_attrs: BTreeMap<String, AttrMap>,
    datasets: BTreeMap<String, JsonDataset>,
}

impl JsonBackend {
    /// Starts an empty writable series; the file appears on the first
    /// flush.
    #[must_use]
    pub fn create(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            writable: true,
            root_attrs: AttrMap::new(),
            group_attrs: BTreeMap::new(),
            datasets: BTreeMap::new(),
        }
    }

    /// Parses an existing series for reading.
    ///
    /// # Errors
    /// Fails on unreadable files or layouts that are not a series tree.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let root: Value = serde_json::from_reader(BufReader::new(file))?;
        let Some(object) = root.as_object() else {
            return Err(Error::InvalidFormat(format!(
                "{}: top level is not an object",
                path.display()
            )));
        };

        let mut backend = Self {
            path: path.to_path_buf(),
            writable: false,
            root_attrs: AttrMap::new(),
            group_attrs: BTreeMap::new(),
            datasets: BTreeMap::new(),
        };
        backend.absorb("", object)?;
        Ok(backend)
    }

    fn absorb(&mut self, prefix: &str, object: &Map<String, Value>) -> Result<()> {
        if let Some(attrs) = object.get(ATTRIBUTES_KEY).and_then(Value::as_object) {
            let decoded = decode_attrs(prefix, attrs)?;
            if prefix.is_empty() {
                self.root_attrs = decoded;
            } else {
                self.group_attrs.insert(prefix.to_string(), decoded);
            }
        }

        for (key, value) in object {
            if key == ATTRIBUTES_KEY {
                continue;
            }
            let child_path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}/{key}")
            };
            let Some(child) = value.as_object() else {
                return Err(Error::InvalidFormat(format!(
                    "{child_path}: expected an object node"
                )));
            };
            if child.contains_key(DATA_KEY) {
                let dataset = decode_dataset(&child_path, child)?;
                self.datasets.insert(child_path, dataset);
            } else {
                self.absorb(&child_path, child)?;
            }
        }
        Ok(())
    }

    fn to_value(&self) -> Result<Value> {
        let mut root = Map::new();
        root.insert(
            ATTRIBUTES_KEY.to_string(),
            encode_attrs("", &self.root_attrs)?,
        );

        for (path, attrs) in &self.group_attrs {
            let node = node_mut(&mut root, path)?;
            node.insert(ATTRIBUTES_KEY.to_string(), encode_attrs(path, attrs)?);
        }

        for (path, dataset) in &self.datasets {
            let node = node_mut(&mut root, path)?;
            node.insert(
                DATATYPE_KEY.to_string(),
                Value::String(dataset.kind.name().to_string()),
            );
            node.insert(DATA_KEY.to_string(), encode_column(path, &dataset.data)?);
            node.insert(
                ATTRIBUTES_KEY.to_string(),
                encode_attrs(path, &dataset.attrs)?,
            );
        }

        Ok(Value::Object(root))
    }

    fn dataset(&self, path: &str) -> Result<&JsonDataset> {
        self.datasets
            .get(path)
            .ok_or_else(|| Error::MissingDataset(path.to_string()))
    }
}

impl SeriesBackend for JsonBackend {
    fn create_dataset(&mut self, path: &str, kind: ScalarKind, extent: u64) -> Result<()> {
        let extent = usize::try_from(extent)
            .map_err(|_| Error::InvalidFormat(format!("{path}: extent too large")))?;
        self.datasets.insert(
            path.to_string(),
            JsonDataset {
                kind,
                data: ColumnVec::zeros(kind, extent),
                attrs: AttrMap::new(),
            },
        );
        Ok(())
    }

    fn dataset_extent(&self, path: &str) -> Result<u64> {
        Ok(self.dataset(path)?.data.len() as u64)
    }

    fn store_chunk(&mut self, path: &str, offset: u64, data: ColumnSlice<'_>) -> Result<()> {
        let dataset = self
            .datasets
            .get_mut(path)
            .ok_or_else(|| Error::MissingDataset(path.to_string()))?;

        let extent = dataset.data.len() as u64;
        let count = data.len() as u64;
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
        let end = start + data.len();
        match (&mut dataset.data, data) {
            (ColumnVec::F32(dst), ColumnSlice::F32(src)) => dst[start..end].copy_from_slice(src),
            (ColumnVec::I32(dst), ColumnSlice::I32(src)) => dst[start..end].copy_from_slice(src),
            (ColumnVec::U64(dst), ColumnSlice::U64(src)) => dst[start..end].copy_from_slice(src),
            (stored, _) => {
                return Err(Error::TypeMismatch {
                    path: path.to_string(),
                    expected: stored.kind().name(),
                })
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
        let extent = dataset.data.len() as u64;
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
        match (&dataset.data, kind) {
            (ColumnVec::F32(values), ScalarKind::F32) => {
                Ok(ColumnVec::F32(values[start..end].to_vec()))
            }
            (ColumnVec::I32(values), ScalarKind::I32) => {
                Ok(ColumnVec::I32(values[start..end].to_vec()))
            }
            (ColumnVec::U64(values), ScalarKind::U64) => {
                Ok(ColumnVec::U64(values[start..end].to_vec()))
            }
            _ => Err(Error::TypeMismatch {
                path: path.to_string(),
                expected: kind.name(),
            }),
        }
    }

    fn set_attr(&mut self, path: &str, name: &str, value: AttrValue) -> Result<()> {
        if path.is_empty() {
            self.root_attrs.insert(name.to_string(), value);
        } else if let Some(dataset) = self.datasets.get_mut(path) {
            dataset.attrs.insert(name.to_string(), value);
        } else {
            self.group_attrs
                .entry(path.to_string())
                .or_default()
                .insert(name.to_string(), value);
        }
        Ok(())
    }

    fn attr(&self, path: &str, name: &str) -> Result<Option<AttrValue>> {
        let map = if path.is_empty() {
            Some(&self.root_attrs)
        } else if let Some(dataset) = self.datasets.get(path) {
            Some(&dataset.attrs)
        } else {
            self.group_attrs.get(path)
        };
        Ok(map.and_then(|attrs| attrs.get(name)).cloned())
    }

    fn iterations(&self) -> Result<Vec<u64>> {
        let mut found = BTreeSet::new();
        for path in self.datasets.keys().chain(self.group_attrs.keys()) {
            let mut parts = path.split('/');
            if parts.next() == Some("data") {
                if let Some(Ok(iteration)) = parts.next().map(str::parse) {
                    found.insert(iteration);
                }
            }
        }
        Ok(found.into_iter().collect())
    }

    fn species_names(&self, iteration: u64) -> Result<Vec<String>> {
        let prefix = format!("data/{iteration}/particles/");
        let mut found = BTreeSet::new();
        for path in self.datasets.keys() {
            if let Some(rest) = path.strip_prefix(&prefix) {
                if let Some(species) = rest.split('/').next() {
                    found.insert(species.to_string());
                }
            }
        }
        Ok(found.into_iter().collect())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.writable {
            return Ok(());
        }
        let value = self.to_value()?;
        let file = File::create(&self.path)?;
        serde_json::to_writer(BufWriter::new(file), &value)?;
        Ok(())
    }
}

fn node_mut<'a>(root: &'a mut Map<String, Value>, path: &str) -> Result<&'a mut Map<String, Value>> {
    let mut current = root;
    for segment in path.split('/') {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = entry.as_object_mut().ok_or_else(|| {
            Error::InvalidFormat(format!("{path}: {segment} is not a group node"))
        })?;
    }
    Ok(current)
}

fn finite_number(path: &str, value: f64) -> Result<Number> {
    Number::from_f64(value)
        .ok_or_else(|| Error::InvalidFormat(format!("{path}: non-finite value {value}")))
}

fn encode_attrs(path: &str, attrs: &AttrMap) -> Result<Value> {
    let mut object = Map::new();
    for (name, value) in attrs {
        let encoded = match value {
            AttrValue::F64(v) => Value::Number(finite_number(path, *v)?),
            AttrValue::I64(v) => Value::from(*v),
            AttrValue::U64(v) => Value::from(*v),
            AttrValue::Str(v) => Value::String(v.clone()),
            AttrValue::F64Vec(values) => Value::Array(
                values
                    .iter()
                    .map(|&v| finite_number(path, v).map(Value::Number))
                    .collect::<Result<_>>()?,
            ),
        };
        object.insert(name.clone(), encoded);
    }
    Ok(Value::Object(object))
}

fn decode_attrs(path: &str, object: &Map<String, Value>) -> Result<AttrMap> {
    let mut attrs = AttrMap::new();
    for (name, value) in object {
        attrs.insert(name.clone(), decode_attr(path, name, value)?);
    }
    Ok(attrs)
}

fn decode_attr(path: &str, name: &str, value: &Value) -> Result<AttrValue> {
    match value {
        Value::String(s) => Ok(AttrValue::Str(s.clone())),
        Value::Number(n) => Ok(number_attr(n)),
        Value::Array(values) => {
            let mut decoded = Vec::with_capacity(values.len());
            for v in values {
                let number = v.as_f64().ok_or_else(|| {
                    Error::InvalidFormat(format!("{path}: attribute {name} has a non-numeric entry"))
                })?;
                decoded.push(number);
            }
            Ok(AttrValue::F64Vec(decoded))
        }
        _ => Err(Error::InvalidFormat(format!(
            "{path}: attribute {name} has an unsupported type"
        ))),
    }
}

fn number_attr(n: &Number) -> AttrValue {
    if let Some(u) = n.as_u64() {
        AttrValue::U64(u)
    } else if let Some(i) = n.as_i64() {
        AttrValue::I64(i)
    } else {
        AttrValue::F64(n.as_f64().unwrap_or(0.0))
    }
}

fn encode_column(path: &str, data: &ColumnVec) -> Result<Value> {
    let values = match data {
        ColumnVec::F32(values) => values
            .iter()
            .map(|&v| finite_number(path, f64::from(v)).map(Value::Number))
            .collect::<Result<Vec<_>>>()?,
        ColumnVec::I32(values) => values.iter().map(|&v| Value::from(v)).collect(),
        ColumnVec::U64(values) => values.iter().map(|&v| Value::from(v)).collect(),
    };
    Ok(Value::Array(values))
}

fn decode_dataset(path: &str, object: &Map<String, Value>) -> Result<JsonDataset> {
    let kind = object
        .get(DATATYPE_KEY)
        .and_then(Value::as_str)
        .and_then(ScalarKind::from_name)
        .ok_or_else(|| Error::InvalidFormat(format!("{path}: missing or unknown datatype")))?;

    let Some(values) = object.get(DATA_KEY).and_then(Value::as_array) else {
        return Err(Error::InvalidFormat(format!("{path}: data is not an array")));
    };

    let data = match kind {
        ScalarKind::F32 => {
            let mut decoded = Vec::with_capacity(values.len());
            for v in values {
                let number = v.as_f64().ok_or_else(|| {
                    Error::InvalidFormat(format!("{path}: non-numeric data entry"))
                })?;
                #[allow(clippy::cast_possible_truncation)]
                decoded.push(number as f32);
            }
            ColumnVec::F32(decoded)
        }
        ScalarKind::I32 => {
            let mut decoded = Vec::with_capacity(values.len());
            for v in values {
                let number = v
                    .as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .ok_or_else(|| {
                        Error::InvalidFormat(format!("{path}: data entry out of i32 range"))
                    })?;
                decoded.push(number);
            }
            ColumnVec::I32(decoded)
        }
        ScalarKind::U64 => {
            let mut decoded = Vec::with_capacity(values.len());
            for v in values {
                let number = v.as_u64().ok_or_else(|| {
                    Error::InvalidFormat(format!("{path}: data entry out of u64 range"))
                })?;
                decoded.push(number);
            }
            ColumnVec::U64(decoded)
        }
    };

    let attrs = match object.get(ATTRIBUTES_KEY).and_then(Value::as_object) {
        Some(attrs) => decode_attrs(path, attrs)?,
        None => AttrMap::new(),
    };

    Ok(JsonDataset { kind, data, attrs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_store_load_round_trip_through_file() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = JsonBackend::create(file.path());

        backend
            .create_dataset("data/1/particles/neutron/position/x", ScalarKind::F32, 5)
            .unwrap();
        backend
            .store_chunk(
                "data/1/particles/neutron/position/x",
                1,
                ColumnSlice::F32(&[1.5, -2.25, 3.0]),
            )
            .unwrap();
        backend
            .set_attr("", "author", AttrValue::Str("tester".to_string()))
            .unwrap();
        backend
            .set_attr(
                "data/1/particles/neutron",
                "numParticles",
                AttrValue::U64(3),
            )
            .unwrap();
        backend.flush().unwrap();

        let reopened = JsonBackend::open(file.path()).unwrap();
        assert_eq!(
            reopened
                .dataset_extent("data/1/particles/neutron/position/x")
                .unwrap(),
            5
        );
        let loaded = reopened
            .load_chunk("data/1/particles/neutron/position/x", ScalarKind::F32, 0, 5)
            .unwrap();
        assert_eq!(
            loaded.as_f32("x").unwrap(),
            &[0.0, 1.5, -2.25, 3.0, 0.0]
        );
        assert_eq!(
            reopened.attr("", "author").unwrap(),
            Some(AttrValue::Str("tester".to_string()))
        );
        assert_eq!(
            reopened
                .attr("data/1/particles/neutron", "numParticles")
                .unwrap()
                .and_then(|v| v.as_u64()),
            Some(3)
        );
        assert_eq!(reopened.iterations().unwrap(), vec![1]);
        assert_eq!(reopened.species_names(1).unwrap(), vec!["neutron"]);
    }

    #[test]
    fn test_store_past_extent_is_error() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = JsonBackend::create(file.path());
        backend.create_dataset("d", ScalarKind::F32, 2).unwrap();
        let err = backend
            .store_chunk("d", 1, ColumnSlice::F32(&[1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(err, Error::ChunkOutOfBounds { .. }));
    }

    #[test]
    fn test_type_mismatch() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = JsonBackend::create(file.path());
        backend.create_dataset("d", ScalarKind::U64, 2).unwrap();
        let err = backend
            .store_chunk("d", 0, ColumnSlice::F32(&[1.0]))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        let err = backend.load_chunk("d", ScalarKind::I32, 0, 1).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_missing_dataset() {
        let file = NamedTempFile::new().unwrap();
        let backend = JsonBackend::create(file.path());
        assert!(matches!(
            backend.dataset_extent("nope"),
            Err(Error::MissingDataset(_))
        ));
    }

    #[test]
    fn test_integer_columns_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = JsonBackend::create(file.path());
        backend
            .create_dataset("data/1/particles/p/id", ScalarKind::U64, 3)
            .unwrap();
        backend
            .create_dataset("data/1/particles/p/particleStatus", ScalarKind::I32, 3)
            .unwrap();
        backend
            .store_chunk(
                "data/1/particles/p/id",
                0,
                ColumnSlice::U64(&[u64::MAX, 7, 0]),
            )
            .unwrap();
        backend
            .store_chunk(
                "data/1/particles/p/particleStatus",
                0,
                ColumnSlice::I32(&[1, 0, -5]),
            )
            .unwrap();
        backend.flush().unwrap();

        let reopened = JsonBackend::open(file.path()).unwrap();
        let ids = reopened
            .load_chunk("data/1/particles/p/id", ScalarKind::U64, 0, 3)
            .unwrap();
        assert_eq!(ids.as_u64("id").unwrap(), &[u64::MAX, 7, 0]);
        let status = reopened
            .load_chunk("data/1/particles/p/particleStatus", ScalarKind::I32, 0, 3)
            .unwrap();
        assert_eq!(status.as_i32("particleStatus").unwrap(), &[1, 0, -5]);
    }
}
