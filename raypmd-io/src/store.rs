//! Buffered, chunked access to a ray series.
//!
//! [`RayWriter`] collects rays in a [`RayBuffer`] and commits them to the
//! backend one chunk at a time; [`RayReader`] loads them back the same way.
//! Dataset extents are fixed when the species is declared, so a writer can
//! never grow a file past the bound it announced up front.

use crate::backend::{
    create_backend, open_backend, AttrValue, ColumnSlice, ScalarKind, SeriesBackend,
};
use crate::format::{resolve_path, Format};
use crate::schema::{self, attrs};
use crate::{Error, Result};
use log::warn;
use raypmd_core::{ParticleKind, Ray, RayBuffer};
use std::path::{Path, PathBuf};

/// Rows buffered before a write is committed, and rows loaded per read.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Provenance and tuning knobs shared by writers.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Rows collected before an automatic flush.
    pub chunk_size: usize,
    /// Iteration index the series is written under.
    pub iteration: u64,
    /// File author recorded at the root.
    pub author: String,
    /// Producing software name.
    pub code_name: String,
    /// Producing software version.
    pub code_version: String,
    /// Instrument the rays were traced through.
    pub instrument_name: String,
    /// Beamline component that emitted the rays.
    pub component_name: String,
    /// Creation date string; written only when non-empty.
    pub date: String,
    /// Gravity direction in the local frame.
    pub direction_of_gravity: [f64; 3],
    /// Horizontal coordinate axis in the local frame.
    pub horizontal_coordinate: [f64; 3],
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            iteration: 1,
            author: "unknown".to_string(),
            code_name: "raypmd".to_string(),
            code_version: env!("CARGO_PKG_VERSION").to_string(),
            instrument_name: String::new(),
            component_name: String::new(),
            date: String::new(),
            direction_of_gravity: [0.0, -1.0, 0.0],
            horizontal_coordinate: [1.0, 0.0, 0.0],
        }
    }
}

/// Buffered writer over one species of one iteration.
///
/// Created against a fresh file with a declared row bound; [`append`] buffers
/// rays and flushes a full chunk transparently, [`finish`] commits whatever
/// is left.
///
/// [`append`]: Self::append
/// [`finish`]: Self::finish
pub struct RayWriter {
    backend: Box<dyn SeriesBackend>,
    buffer: RayBuffer,
    path: PathBuf,
    species: String,
    iteration: u64,
    chunk_size: usize,
    max_rays: u64,
    committed: u64,
}

impl RayWriter {
    /// Creates the file, writes the series attributes and declares every
    /// ray record at its full extent of `max_rays` rows.
    ///
    /// # Errors
    /// Returns an error if the path has an unknown format or the backend
    /// cannot create the file.
    pub fn create(
        path: &Path,
        format: Option<Format>,
        kind: ParticleKind,
        max_rays: u64,
        options: &StoreOptions,
    ) -> Result<Self> {
        let (resolved, format) = resolve_path(path, format)?;
        let mut backend = create_backend(format, &resolved)?;

        write_root_attrs(backend.as_mut(), options)?;

        let species = kind.species_type().to_string();
        declare_species(backend.as_mut(), options.iteration, &species, kind, max_rays, options)?;
        backend.flush()?;

        Ok(Self {
            backend,
            buffer: RayBuffer::new(),
            path: resolved,
            species,
            iteration: options.iteration,
            chunk_size: options.chunk_size.max(1),
            max_rays,
            committed: 0,
        })
    }

    /// Buffers one ray, committing the current chunk first when the buffer
    /// has reached the chunk size.
    ///
    /// # Errors
    /// Propagates a flush failure; the ray is not buffered in that case.
    pub fn append(&mut self, ray: &Ray) -> Result<()> {
        if self.buffer.len() >= self.chunk_size {
            self.flush()?;
        }
        self.buffer.push(ray);
        Ok(())
    }

    /// Commits all buffered rays at the current write offset.
    ///
    /// A no-op on an empty buffer. When the buffered rows do not fit under
    /// the declared bound, nothing is written and the buffer is kept intact
    /// so the caller can inspect it.
    ///
    /// # Errors
    /// Returns [`Error::SchemaBoundExceeded`] when the chunk does not fit,
    /// or a backend error.
    pub fn flush(&mut self) -> Result<()> {
        let rows = self.buffer.len() as u64;
        if rows == 0 {
            return Ok(());
        }
        if self.committed + rows > self.max_rays {
            return Err(Error::SchemaBoundExceeded {
                committed: self.committed,
                buffered: rows,
                max_rays: self.max_rays,
            });
        }

        let offset = self.committed;
        for (record, component, column) in self.buffer.float_columns() {
            let path = schema::component_path(self.iteration, &self.species, record, component);
            self.backend
                .store_chunk(&path, offset, ColumnSlice::F32(column.values()))?;
            self.backend.set_attr(
                &path,
                attrs::MIN_VALUE,
                AttrValue::F64(f64::from(column.min())),
            )?;
            self.backend.set_attr(
                &path,
                attrs::MAX_VALUE,
                AttrValue::F64(f64::from(column.max())),
            )?;
        }

        let id_path = schema::component_path(self.iteration, &self.species, "id", None);
        self.backend
            .store_chunk(&id_path, offset, ColumnSlice::U64(self.buffer.id.values()))?;
        self.backend
            .set_attr(&id_path, attrs::MIN_VALUE, AttrValue::U64(self.buffer.id.min()))?;
        self.backend
            .set_attr(&id_path, attrs::MAX_VALUE, AttrValue::U64(self.buffer.id.max()))?;

        let status_path =
            schema::component_path(self.iteration, &self.species, "particleStatus", None);
        self.backend.store_chunk(
            &status_path,
            offset,
            ColumnSlice::I32(self.buffer.status.values()),
        )?;
        self.backend.set_attr(
            &status_path,
            attrs::MIN_VALUE,
            AttrValue::I64(i64::from(self.buffer.status.min())),
        )?;
        self.backend.set_attr(
            &status_path,
            attrs::MAX_VALUE,
            AttrValue::I64(i64::from(self.buffer.status.max())),
        )?;

        self.committed += rows;
        let species_path = schema::species_path(self.iteration, &self.species);
        self.backend.set_attr(
            &species_path,
            attrs::NUM_PARTICLES,
            AttrValue::U64(self.committed),
        )?;
        self.backend.flush()?;
        self.buffer.clear();
        Ok(())
    }

    /// Flushes the remaining rays and returns the total committed count.
    ///
    /// # Errors
    /// Propagates the final flush failure.
    pub fn finish(mut self) -> Result<u64> {
        self.flush()?;
        Ok(self.committed)
    }

    /// Rows committed to the file so far.
    #[must_use]
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Rows buffered but not yet committed.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Declared row bound of the species.
    #[must_use]
    pub fn max_rays(&self) -> u64 {
        self.max_rays
    }

    /// Resolved path of the file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_root_attrs(backend: &mut dyn SeriesBackend, options: &StoreOptions) -> Result<()> {
    let root = [
        (attrs::OPENPMD, schema::OPENPMD_VERSION),
        (attrs::OPENPMD_EXTENSION, schema::OPENPMD_EXTENSION),
        (attrs::BASE_PATH, "data/%T/"),
        (attrs::PARTICLES_PATH, "particles"),
        (attrs::ITERATION_ENCODING, "groupBased"),
        (attrs::ITERATION_FORMAT, "data/%T/"),
        (attrs::AUTHOR, options.author.as_str()),
        (attrs::SOFTWARE, options.code_name.as_str()),
        (attrs::SOFTWARE_VERSION, options.code_version.as_str()),
        (attrs::INSTRUMENT, options.instrument_name.as_str()),
        (attrs::COMPONENT, options.component_name.as_str()),
    ];
    for (name, value) in root {
        backend.set_attr("", name, AttrValue::Str(value.to_string()))?;
    }
    if !options.date.is_empty() {
        backend.set_attr("", attrs::DATE, AttrValue::Str(options.date.clone()))?;
    }
    Ok(())
}

fn declare_species(
    backend: &mut dyn SeriesBackend,
    iteration: u64,
    species: &str,
    kind: ParticleKind,
    max_rays: u64,
    options: &StoreOptions,
) -> Result<()> {
    // Datasets first: a dataset node must exist before attributes land on it.
    for field in schema::ray_fields() {
        let record_path = schema::record_path(iteration, species, field.record);
        if field.vector {
            for axis in schema::VECTOR_COMPONENTS {
                let path = schema::component_path(iteration, species, field.record, Some(axis));
                backend.create_dataset(&path, field.kind, max_rays)?;
                backend.set_attr(&path, attrs::UNIT_SI, AttrValue::F64(field.unit_si))?;
            }
        } else {
            backend.create_dataset(&record_path, field.kind, max_rays)?;
            backend.set_attr(&record_path, attrs::UNIT_SI, AttrValue::F64(field.unit_si))?;
        }
        backend.set_attr(
            &record_path,
            attrs::UNIT_DIMENSION,
            AttrValue::F64Vec(field.unit_dimension.to_vec()),
        )?;
    }

    let species_path = schema::species_path(iteration, species);
    backend.set_attr(
        &species_path,
        attrs::SPECIES_TYPE,
        AttrValue::Str(species.to_string()),
    )?;
    backend.set_attr(&species_path, attrs::PDG_ID, AttrValue::I64(kind.pdg_id()))?;
    backend.set_attr(&species_path, attrs::MASS, AttrValue::F64(kind.mass_kg()))?;
    backend.set_attr(&species_path, attrs::NUM_PARTICLES, AttrValue::U64(0))?;
    backend.set_attr(
        &species_path,
        attrs::DIRECTION_OF_GRAVITY,
        AttrValue::F64Vec(options.direction_of_gravity.to_vec()),
    )?;
    backend.set_attr(
        &species_path,
        attrs::HORIZONTAL_COORDINATE,
        AttrValue::F64Vec(options.horizontal_coordinate.to_vec()),
    )?;
    Ok(())
}

/// Chunked reader over one species of one iteration.
///
/// Serves rays in stored order, loading one chunk at a time. With a repeat
/// factor above one every ray is handed out that many times in a row;
/// repeats never straddle a chunk boundary.
pub struct RayReader {
    backend: Box<dyn SeriesBackend>,
    buffer: RayBuffer,
    species: String,
    iteration: u64,
    chunk_size: usize,
    committed: u64,
    total: u64,
    offset: u64,
    n_repeat: usize,
    i_repeat: usize,
}

impl std::fmt::Debug for RayReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayReader")
            .field("species", &self.species)
            .field("iteration", &self.iteration)
            .field("chunk_size", &self.chunk_size)
            .field("committed", &self.committed)
            .field("total", &self.total)
            .field("offset", &self.offset)
            .field("n_repeat", &self.n_repeat)
            .field("i_repeat", &self.i_repeat)
            .finish_non_exhaustive()
    }
}

impl RayReader {
    /// Opens a series for reading with the default chunk size.
    ///
    /// `requested` caps the rows served; zero means everything committed.
    /// `repeat` hands out each ray that many times (zero behaves as one).
    ///
    /// # Errors
    /// Returns [`Error::ReadBoundExceeded`] when `requested` exceeds the
    /// committed rows, or a backend error.
    pub fn open(path: &Path, format: Option<Format>, requested: u64, repeat: usize) -> Result<Self> {
        Self::open_with_chunk_size(path, format, requested, repeat, DEFAULT_CHUNK_SIZE)
    }

    /// Same as [`open`](Self::open) with an explicit chunk size.
    ///
    /// # Errors
    /// See [`open`](Self::open).
    pub fn open_with_chunk_size(
        path: &Path,
        format: Option<Format>,
        requested: u64,
        repeat: usize,
        chunk_size: usize,
    ) -> Result<Self> {
        let (resolved, format) = resolve_path(path, format)?;
        let backend = open_backend(format, &resolved)?;

        let iterations = backend.iterations()?;
        let iteration = match iterations.as_slice() {
            [] => {
                warn!("{}: no iterations found, nothing to read", resolved.display());
                None
            }
            [single] => Some(*single),
            [first, ..] => {
                warn!(
                    "{}: {} iterations found, reading iteration {first} only",
                    resolved.display(),
                    iterations.len()
                );
                Some(*first)
            }
        };

        let mut species = String::new();
        let mut committed = 0;
        let mut iteration_index = 0;
        if let Some(iteration) = iteration {
            iteration_index = iteration;
            let names = backend.species_names(iteration)?;
            match names.as_slice() {
                [] => {
                    warn!(
                        "{}: iteration {iteration} holds no species, nothing to read",
                        resolved.display()
                    );
                }
                [name, rest @ ..] => {
                    if !rest.is_empty() {
                        warn!(
                            "{}: {} species found, reading {name} only",
                            resolved.display(),
                            names.len()
                        );
                    }
                    species = name.clone();
                    committed = committed_rows(backend.as_ref(), iteration, name)?;
                }
            }
        }

        if requested > committed {
            return Err(Error::ReadBoundExceeded {
                requested,
                committed,
            });
        }
        let total = if requested == 0 { committed } else { requested };

        Ok(Self {
            backend,
            buffer: RayBuffer::new(),
            species,
            iteration: iteration_index,
            chunk_size: chunk_size.max(1),
            committed,
            total,
            offset: 0,
            n_repeat: repeat.max(1),
            i_repeat: 0,
        })
    }

    /// Serves the next ray, or `None` once all requested rows (times the
    /// repeat factor) have been handed out.
    ///
    /// # Errors
    /// Propagates a backend failure while loading the next chunk.
    pub fn read_next(&mut self) -> Result<Option<Ray>> {
        if self.i_repeat == 0 && self.buffer.is_chunk_finished() {
            if self.offset >= self.total {
                return Ok(None);
            }
            self.load_chunk()?;
        }

        let advance = self.i_repeat + 1 >= self.n_repeat;
        let ray = self.buffer.pop(advance);
        if ray.is_some() {
            self.i_repeat = (self.i_repeat + 1) % self.n_repeat;
        }
        Ok(ray)
    }

    fn load_chunk(&mut self) -> Result<()> {
        let count = (self.total - self.offset).min(self.chunk_size as u64);
        self.buffer.clear();

        for (record, component, column) in self.buffer.float_columns_mut() {
            let path = schema::component_path(self.iteration, &self.species, record, component);
            let data = self
                .backend
                .load_chunk(&path, ScalarKind::F32, self.offset, count)?;
            column.extend_from_slice(data.as_f32(&path)?);
        }

        let id_path = schema::component_path(self.iteration, &self.species, "id", None);
        let data = self
            .backend
            .load_chunk(&id_path, ScalarKind::U64, self.offset, count)?;
        self.buffer.id.extend_from_slice(data.as_u64(&id_path)?);

        let status_path =
            schema::component_path(self.iteration, &self.species, "particleStatus", None);
        let data = self
            .backend
            .load_chunk(&status_path, ScalarKind::I32, self.offset, count)?;
        self.buffer
            .status
            .extend_from_slice(data.as_i32(&status_path)?);

        #[allow(clippy::cast_possible_truncation)]
        self.buffer.set_loaded(count as usize);
        self.offset += count;
        Ok(())
    }

    /// Rows committed in the file.
    #[must_use]
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Rows this reader will serve (before the repeat factor).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Species being read; empty when the file held none.
    #[must_use]
    pub fn species(&self) -> &str {
        &self.species
    }

    /// Repeat factor applied to every ray.
    #[must_use]
    pub fn repeat(&self) -> usize {
        self.n_repeat
    }
}

fn field_ranges(
    backend: &dyn SeriesBackend,
    iteration: u64,
    species: &str,
) -> Result<Vec<FieldRange>> {
    let mut ranges = Vec::new();
    for field in schema::ray_fields() {
        let components: &[Option<&'static str>] = if field.vector {
            &[Some("x"), Some("y"), Some("z")]
        } else {
            &[None]
        };
        for &component in components {
            let path = schema::component_path(iteration, species, field.record, component);
            let min = backend
                .attr(&path, attrs::MIN_VALUE)?
                .and_then(|value| value.as_f64());
            let max = backend
                .attr(&path, attrs::MAX_VALUE)?
                .and_then(|value| value.as_f64());
            ranges.push(FieldRange {
                record: field.record,
                component,
                min,
                max,
            });
        }
    }
    Ok(ranges)
}

// numParticles is authoritative; the dataset extent only bounds capacity.
fn committed_rows(backend: &dyn SeriesBackend, iteration: u64, species: &str) -> Result<u64> {
    let species_path = schema::species_path(iteration, species);
    if let Some(count) = backend
        .attr(&species_path, attrs::NUM_PARTICLES)?
        .and_then(|value| value.as_u64())
    {
        return Ok(count);
    }
    let fallback = schema::component_path(iteration, species, "position", Some("x"));
    backend.dataset_extent(&fallback)
}

/// Summary of a series, for inspection tooling.
#[derive(Debug, Clone)]
pub struct SeriesInfo {
    /// Detected container format.
    pub format: Format,
    /// Root author attribute, when present.
    pub author: Option<String>,
    /// Root software attribute, when present.
    pub software: Option<String>,
    /// Root software version attribute, when present.
    pub software_version: Option<String>,
    /// Iteration indices, ascending.
    pub iterations: Vec<u64>,
    /// Species across all iterations.
    pub species: Vec<SpeciesInfo>,
}

/// One species group in a series.
#[derive(Debug, Clone)]
pub struct SpeciesInfo {
    /// Iteration the species lives under.
    pub iteration: u64,
    /// Group name.
    pub name: String,
    /// `speciesType` attribute, when present.
    pub species_type: Option<String>,
    /// Committed rows.
    pub num_particles: Option<u64>,
    /// Stored value range of every component, in schema order.
    pub field_ranges: Vec<FieldRange>,
}

/// `minValue`/`maxValue` of one stored component.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRange {
    /// Record name.
    pub record: &'static str,
    /// Component axis; `None` for scalar records.
    pub component: Option<&'static str>,
    /// Smallest stored value, when recorded.
    pub min: Option<f64>,
    /// Largest stored value, when recorded.
    pub max: Option<f64>,
}

/// Reads the summary of a series without loading any ray data.
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed.
pub fn series_info(path: &Path, format: Option<Format>) -> Result<SeriesInfo> {
    let (resolved, format) = resolve_path(path, format)?;
    let backend = open_backend(format, &resolved)?;

    let root_str = |name: &str| -> Result<Option<String>> {
        Ok(backend
            .attr("", name)?
            .and_then(|value| value.as_str().map(ToString::to_string)))
    };
    let author = root_str(attrs::AUTHOR)?;
    let software = root_str(attrs::SOFTWARE)?;
    let software_version = root_str(attrs::SOFTWARE_VERSION)?;

    let iterations = backend.iterations()?;
    let mut species = Vec::new();
    for &iteration in &iterations {
        for name in backend.species_names(iteration)? {
            let species_path = schema::species_path(iteration, &name);
            let species_type = backend
                .attr(&species_path, attrs::SPECIES_TYPE)?
                .and_then(|value| value.as_str().map(ToString::to_string));
            let num_particles = backend
                .attr(&species_path, attrs::NUM_PARTICLES)?
                .and_then(|value| value.as_u64());
            let field_ranges = field_ranges(backend.as_ref(), iteration, &name)?;
            species.push(SpeciesInfo {
                iteration,
                name,
                species_type,
                num_particles,
                field_ranges,
            });
        }
    }

    Ok(SeriesInfo {
        format,
        author,
        software,
        software_version,
        iterations,
        species,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_ray(i: u64) -> Ray {
        let mut ray = Ray::new();
        #[allow(clippy::cast_precision_loss)]
        let offset = i as f64;
        ray.set_position(offset, 2.0 * offset, -offset, 1.0);
        ray.set_direction(0.0, 0.0, 1.0, 1.0);
        ray.wavelength = 1.8;
        ray.weight = 0.5;
        ray.id = i;
        ray
    }

    fn small_options(chunk_size: usize) -> StoreOptions {
        StoreOptions {
            chunk_size,
            author: "tester".to_string(),
            instrument_name: "test instrument".to_string(),
            component_name: "test monitor".to_string(),
            ..StoreOptions::default()
        }
    }

    #[test]
    fn test_append_flushes_at_chunk_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let mut writer = RayWriter::create(
            &path,
            None,
            ParticleKind::Neutron,
            10,
            &small_options(3),
        )
        .unwrap();

        for i in 0..4 {
            writer.append(&sample_ray(i)).unwrap();
        }
        // the fourth append pushed the first full chunk out
        assert_eq!(writer.committed(), 3);
        assert_eq!(writer.buffered(), 1);

        assert_eq!(writer.finish().unwrap(), 4);
    }

    #[test]
    fn test_flush_on_empty_buffer_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let mut writer =
            RayWriter::create(&path, None, ParticleKind::Neutron, 5, &small_options(3)).unwrap();
        writer.flush().unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.committed(), 0);
        assert_eq!(writer.finish().unwrap(), 0);

        let mut reader = RayReader::open(&path, None, 0, 1).unwrap();
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_bound_exceeded_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let mut writer =
            RayWriter::create(&path, None, ParticleKind::Neutron, 2, &small_options(10)).unwrap();
        for i in 0..3 {
            writer.append(&sample_ray(i)).unwrap();
        }
        let err = writer.flush().unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaBoundExceeded {
                committed: 0,
                buffered: 3,
                max_rays: 2,
            }
        ));
        // nothing was committed, the buffer is intact
        assert_eq!(writer.committed(), 0);
        assert_eq!(writer.buffered(), 3);
    }

    #[test]
    fn test_commit_exactly_at_bound() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let mut writer =
            RayWriter::create(&path, None, ParticleKind::Neutron, 3, &small_options(10)).unwrap();
        for i in 0..3 {
            writer.append(&sample_ray(i)).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 3);
    }

    #[test]
    fn test_round_trip_in_order_across_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let mut writer =
            RayWriter::create(&path, None, ParticleKind::Neutron, 10, &small_options(4)).unwrap();
        for i in 0..10 {
            writer.append(&sample_ray(i)).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 10);

        let mut reader = RayReader::open_with_chunk_size(&path, None, 0, 1, 3).unwrap();
        assert_eq!(reader.total(), 10);
        assert_eq!(reader.species(), "neutron");
        for i in 0..10 {
            let ray = reader.read_next().unwrap().expect("ray missing");
            assert_eq!(ray.id, i);
            #[allow(clippy::cast_precision_loss)]
            let expected = i as f32;
            assert_eq!(ray.position[0], expected);
            assert_eq!(ray.position[1], 2.0 * expected);
        }
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_requested_subset_and_over_request() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let mut writer =
            RayWriter::create(&path, None, ParticleKind::Photon, 5, &small_options(10)).unwrap();
        for i in 0..5 {
            writer.append(&sample_ray(i)).unwrap();
        }
        writer.finish().unwrap();

        let mut reader = RayReader::open(&path, None, 2, 1).unwrap();
        assert_eq!(reader.total(), 2);
        assert_eq!(reader.read_next().unwrap().unwrap().id, 0);
        assert_eq!(reader.read_next().unwrap().unwrap().id, 1);
        assert!(reader.read_next().unwrap().is_none());

        let err = RayReader::open(&path, None, 6, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::ReadBoundExceeded {
                requested: 6,
                committed: 5,
            }
        ));
    }

    #[test]
    fn test_repeat_serves_each_ray_in_a_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let mut writer =
            RayWriter::create(&path, None, ParticleKind::Neutron, 2, &small_options(10)).unwrap();
        writer.append(&sample_ray(7)).unwrap();
        writer.append(&sample_ray(8)).unwrap();
        writer.finish().unwrap();

        let mut reader = RayReader::open(&path, None, 0, 3).unwrap();
        let mut ids = Vec::new();
        while let Some(ray) = reader.read_next().unwrap() {
            ids.push(ray.id);
        }
        assert_eq!(ids, vec![7, 7, 7, 8, 8, 8]);
    }

    #[test]
    fn test_repeat_does_not_straddle_chunk_boundary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let mut writer =
            RayWriter::create(&path, None, ParticleKind::Neutron, 3, &small_options(10)).unwrap();
        for i in 0..3 {
            writer.append(&sample_ray(i)).unwrap();
        }
        writer.finish().unwrap();

        // chunk of 2 splits the repeat stream at ray 1/ray 2
        let mut reader = RayReader::open_with_chunk_size(&path, None, 0, 2, 2).unwrap();
        let mut ids = Vec::new();
        while let Some(ray) = reader.read_next().unwrap() {
            ids.push(ray.id);
        }
        assert_eq!(ids, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_write_under_configured_iteration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let options = StoreOptions {
            iteration: 7,
            ..small_options(10)
        };
        let mut writer =
            RayWriter::create(&path, None, ParticleKind::Neutron, 2, &options).unwrap();
        writer.append(&sample_ray(4)).unwrap();
        writer.append(&sample_ray(5)).unwrap();
        writer.finish().unwrap();

        let info = series_info(&path, None).unwrap();
        assert_eq!(info.iterations, vec![7]);
        assert_eq!(info.species[0].iteration, 7);

        let mut reader = RayReader::open(&path, None, 0, 1).unwrap();
        assert_eq!(reader.total(), 2);
        assert_eq!(reader.read_next().unwrap().unwrap().id, 4);
        assert_eq!(reader.read_next().unwrap().unwrap().id, 5);
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_series_info_reports_species_and_counts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rays.json");
        let mut writer =
            RayWriter::create(&path, None, ParticleKind::Photon, 4, &small_options(10)).unwrap();
        for i in 0..4 {
            writer.append(&sample_ray(i)).unwrap();
        }
        writer.finish().unwrap();

        let info = series_info(&path, None).unwrap();
        assert_eq!(info.format, Format::Json);
        assert_eq!(info.author.as_deref(), Some("tester"));
        assert_eq!(info.software.as_deref(), Some("raypmd"));
        assert_eq!(info.iterations, vec![1]);
        assert_eq!(info.species.len(), 1);
        assert_eq!(info.species[0].name, "photon");
        assert_eq!(info.species[0].species_type.as_deref(), Some("photon"));
        assert_eq!(info.species[0].num_particles, Some(4));

        // 5 vector records (3 components each) + 7 scalar records
        let ranges = &info.species[0].field_ranges;
        assert_eq!(ranges.len(), 22);
        let x_range = ranges
            .iter()
            .find(|r| r.record == "position" && r.component == Some("x"))
            .unwrap();
        assert_eq!(x_range.min, Some(0.0));
        assert_eq!(x_range.max, Some(3.0));
        let id_range = ranges.iter().find(|r| r.record == "id").unwrap();
        assert_eq!(id_range.min, Some(0.0));
        assert_eq!(id_range.max, Some(3.0));
    }
}
