//! On-disk schema of the ray-trace series.
//!
//! One place for the record table, the path layout and the attribute names
//! both backends must agree on. The layout follows the openPMD group-based
//! iteration encoding: `data/<iteration>/particles/<species>/<record>`,
//! with `x`/`y`/`z` component datasets under vector records and scalar
//! records being datasets themselves.

use crate::backend::ScalarKind;

/// Component names of vector records.
pub const VECTOR_COMPONENTS: [&str; 3] = ["x", "y", "z"];

/// openPMD standard version written to new files.
pub const OPENPMD_VERSION: &str = "1.1.0";

/// Extension name written to new files.
pub const OPENPMD_EXTENSION: &str = "raytrace";

/// Declared shape, datatype and units of one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Record name in the species group.
    pub record: &'static str,
    /// Three `x`/`y`/`z` components, or a single scalar dataset.
    pub vector: bool,
    /// Storage datatype.
    pub kind: ScalarKind,
    /// openPMD `unitDimension` powers (L, M, T, I, theta, N, J).
    pub unit_dimension: [f64; 7],
    /// SI scale of the stored values.
    pub unit_si: f64,
}

const NO_DIM: [f64; 7] = [0.0; 7];
const LENGTH: [f64; 7] = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
const TIME: [f64; 7] = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

/// The full record table of one ray species, in write order.
///
/// Values are stored in cm (position, unitSI 1e-2), ms (rayTime, unitSI
/// 1e-3) and Angstrom (wavelength, unitSI 1e-10); everything else is
/// dimensionless.
#[must_use]
pub fn ray_fields() -> [FieldSpec; 12] {
    [
        FieldSpec {
            record: "position",
            vector: true,
            kind: ScalarKind::F32,
            unit_dimension: LENGTH,
            unit_si: 1e-2,
        },
        FieldSpec {
            record: "direction",
            vector: true,
            kind: ScalarKind::F32,
            unit_dimension: NO_DIM,
            unit_si: 1.0,
        },
        FieldSpec {
            record: "nonPhotonPolarization",
            vector: true,
            kind: ScalarKind::F32,
            unit_dimension: NO_DIM,
            unit_si: 1.0,
        },
        FieldSpec {
            record: "photonSPolarizationAmplitude",
            vector: true,
            kind: ScalarKind::F32,
            unit_dimension: NO_DIM,
            unit_si: 1.0,
        },
        FieldSpec {
            record: "photonSPolarizationPhase",
            vector: false,
            kind: ScalarKind::F32,
            unit_dimension: NO_DIM,
            unit_si: 1.0,
        },
        FieldSpec {
            record: "photonPPolarizationAmplitude",
            vector: true,
            kind: ScalarKind::F32,
            unit_dimension: NO_DIM,
            unit_si: 1.0,
        },
        FieldSpec {
            record: "photonPPolarizationPhase",
            vector: false,
            kind: ScalarKind::F32,
            unit_dimension: NO_DIM,
            unit_si: 1.0,
        },
        FieldSpec {
            record: "wavelength",
            vector: false,
            kind: ScalarKind::F32,
            unit_dimension: LENGTH,
            unit_si: 1e-10,
        },
        FieldSpec {
            record: "weight",
            vector: false,
            kind: ScalarKind::F32,
            unit_dimension: NO_DIM,
            unit_si: 1.0,
        },
        FieldSpec {
            record: "rayTime",
            vector: false,
            kind: ScalarKind::F32,
            unit_dimension: TIME,
            unit_si: 1e-3,
        },
        FieldSpec {
            record: "id",
            vector: false,
            kind: ScalarKind::U64,
            unit_dimension: NO_DIM,
            unit_si: 1.0,
        },
        FieldSpec {
            record: "particleStatus",
            vector: false,
            kind: ScalarKind::I32,
            unit_dimension: NO_DIM,
            unit_si: 1.0,
        },
    ]
}

/// Path of one species group.
#[must_use]
pub fn species_path(iteration: u64, species: &str) -> String {
    format!("data/{iteration}/particles/{species}")
}

/// Path of one record group (vector records) or scalar dataset.
#[must_use]
pub fn record_path(iteration: u64, species: &str, record: &str) -> String {
    format!("data/{iteration}/particles/{species}/{record}")
}

/// Path of one record component dataset. `component == None` addresses a
/// scalar record's dataset directly.
#[must_use]
pub fn component_path(
    iteration: u64,
    species: &str,
    record: &str,
    component: Option<&str>,
) -> String {
    match component {
        Some(axis) => format!("data/{iteration}/particles/{species}/{record}/{axis}"),
        None => record_path(iteration, species, record),
    }
}

/// Attribute names shared by both backends.
pub mod attrs {
    /// Root: openPMD standard version.
    pub const OPENPMD: &str = "openPMD";
    /// Root: openPMD extension in use.
    pub const OPENPMD_EXTENSION: &str = "openPMDextension";
    /// Root: iteration group template.
    pub const BASE_PATH: &str = "basePath";
    /// Root: particles subgroup name.
    pub const PARTICLES_PATH: &str = "particlesPath";
    /// Root: iteration encoding (always group-based here).
    pub const ITERATION_ENCODING: &str = "iterationEncoding";
    /// Root: iteration format string.
    pub const ITERATION_FORMAT: &str = "iterationFormat";
    /// Root: file author.
    pub const AUTHOR: &str = "author";
    /// Root: producing software name.
    pub const SOFTWARE: &str = "software";
    /// Root: producing software version.
    pub const SOFTWARE_VERSION: &str = "softwareVersion";
    /// Root: instrument the rays were traced through.
    pub const INSTRUMENT: &str = "instrument";
    /// Root: beamline component that wrote the rays.
    pub const COMPONENT: &str = "component";
    /// Root: creation date string supplied by the producer.
    pub const DATE: &str = "date";

    /// Species: particle kind name.
    pub const SPECIES_TYPE: &str = "speciesType";
    /// Species: Particle Data Group id.
    pub const PDG_ID: &str = "PDGID";
    /// Species: rows committed so far.
    pub const NUM_PARTICLES: &str = "numParticles";
    /// Species: rest mass in kg.
    pub const MASS: &str = "mass";
    /// Species: gravity direction in the local frame.
    pub const DIRECTION_OF_GRAVITY: &str = "directionOfGravity";
    /// Species: horizontal coordinate axis in the local frame.
    pub const HORIZONTAL_COORDINATE: &str = "horizontalCoordinate";

    /// Record: unit dimension powers.
    pub const UNIT_DIMENSION: &str = "unitDimension";
    /// Component: SI scale factor.
    pub const UNIT_SI: &str = "unitSI";
    /// Component: smallest stored value.
    pub const MIN_VALUE: &str = "minValue";
    /// Component: largest stored value.
    pub const MAX_VALUE: &str = "maxValue";
}
