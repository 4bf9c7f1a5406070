//! raypmd-core: Ray records and columnar buffers for ray-trace I/O.
//!
//! This crate holds the in-memory side of raypmd: the [`Ray`] value type,
//! the generic min/max-tracking [`Record`] column, and the columnar
//! [`RayBuffer`] that batches rays for chunked file transfer.
//!

pub mod buffer;
pub mod ray;
pub mod record;

pub use buffer::RayBuffer;
pub use ray::{ParticleKind, ParticleStatus, Ray};
pub use record::{Extrema, Record};
