//! Columnar ray buffer.
//!
//! [`RayBuffer`] keeps rays between the caller and the file as one
//! [`Record`](crate::Record) per physical attribute (struct-of-arrays). The
//! storage backends want per-component contiguous slices for chunked
//! transfer, so this layout writes out with no transpose.

use crate::ray::{ParticleStatus, Ray};
use crate::record::Record;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Buffered rays in columnar layout.
///
/// Every push appends to all columns, so the columns always share one
/// length. The read cursor walks the rows on the way back out; `clear` is
/// the only operation that removes rows.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RayBuffer {
    /// Position x in cm.
    pub x: Record<f32>,
    /// Position y in cm.
    pub y: Record<f32>,
    /// Position z in cm.
    pub z: Record<f32>,
    /// Direction x.
    pub dx: Record<f32>,
    /// Direction y.
    pub dy: Record<f32>,
    /// Direction z.
    pub dz: Record<f32>,
    /// Non-photon polarization x.
    pub sx: Record<f32>,
    /// Non-photon polarization y.
    pub sy: Record<f32>,
    /// Non-photon polarization z.
    pub sz: Record<f32>,
    /// Photon s-polarization amplitude x.
    pub s_pol_ax: Record<f32>,
    /// Photon s-polarization amplitude y.
    pub s_pol_ay: Record<f32>,
    /// Photon s-polarization amplitude z.
    pub s_pol_az: Record<f32>,
    /// Photon s-polarization phase.
    pub s_pol_ph: Record<f32>,
    /// Photon p-polarization amplitude x.
    pub p_pol_ax: Record<f32>,
    /// Photon p-polarization amplitude y.
    pub p_pol_ay: Record<f32>,
    /// Photon p-polarization amplitude z.
    pub p_pol_az: Record<f32>,
    /// Photon p-polarization phase.
    pub p_pol_ph: Record<f32>,
    /// Wavelength in Angstrom.
    pub wavelength: Record<f32>,
    /// Ray time in ms.
    pub time: Record<f32>,
    /// Statistical weight.
    pub weight: Record<f32>,
    /// Ray identifier.
    pub id: Record<u64>,
    /// Liveness flag as stored.
    pub status: Record<i32>,
    size: usize,
    read: usize,
}

impl RayBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the buffer holds no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Current read cursor position.
    #[inline]
    #[must_use]
    pub fn read_cursor(&self) -> usize {
        self.read
    }

    /// True once every buffered row has been popped (vacuously true when
    /// empty).
    #[inline]
    #[must_use]
    pub fn is_chunk_finished(&self) -> bool {
        self.read == self.size
    }

    /// Decomposes a ray into the columns. All columns grow together; no
    /// partial-row state is observable.
    pub fn push(&mut self, ray: &Ray) {
        self.x.push(ray.position[0]);
        self.y.push(ray.position[1]);
        self.z.push(ray.position[2]);

        self.dx.push(ray.direction[0]);
        self.dy.push(ray.direction[1]);
        self.dz.push(ray.direction[2]);

        self.sx.push(ray.polarization[0]);
        self.sy.push(ray.polarization[1]);
        self.sz.push(ray.polarization[2]);

        self.s_pol_ax.push(ray.s_polarization_amplitude[0]);
        self.s_pol_ay.push(ray.s_polarization_amplitude[1]);
        self.s_pol_az.push(ray.s_polarization_amplitude[2]);
        self.s_pol_ph.push(ray.s_polarization_phase);

        self.p_pol_ax.push(ray.p_polarization_amplitude[0]);
        self.p_pol_ay.push(ray.p_polarization_amplitude[1]);
        self.p_pol_az.push(ray.p_polarization_amplitude[2]);
        self.p_pol_ph.push(ray.p_polarization_phase);

        self.wavelength.push(ray.wavelength);
        self.time.push(ray.time);
        self.weight.push(ray.weight);

        self.id.push(ray.id);
        self.status.push(ray.status.as_i32());

        self.size += 1;
    }

    /// Reconstructs the ray at the read cursor, advancing the cursor when
    /// `advance` is true. Returns `None` once the chunk is finished.
    pub fn pop(&mut self, advance: bool) -> Option<Ray> {
        if self.read >= self.size {
            return None;
        }
        let i = self.read;
        let ray = Ray {
            position: [self.x[i], self.y[i], self.z[i]],
            direction: [self.dx[i], self.dy[i], self.dz[i]],
            polarization: [self.sx[i], self.sy[i], self.sz[i]],
            s_polarization_amplitude: [self.s_pol_ax[i], self.s_pol_ay[i], self.s_pol_az[i]],
            s_polarization_phase: self.s_pol_ph[i],
            p_polarization_amplitude: [self.p_pol_ax[i], self.p_pol_ay[i], self.p_pol_az[i]],
            p_polarization_phase: self.p_pol_ph[i],
            wavelength: self.wavelength[i],
            time: self.time[i],
            weight: self.weight[i],
            id: self.id[i],
            status: ParticleStatus::from_i32(self.status[i]),
        };
        if advance {
            self.read += 1;
        }
        Some(ray)
    }

    /// Marks bulk-loaded columns as holding `rows` readable rows starting
    /// from a fresh cursor.
    ///
    /// # Panics
    /// Panics if any column does not hold exactly `rows` values.
    pub fn set_loaded(&mut self, rows: usize) {
        assert_eq!(self.x.len(), rows, "column length mismatch after load");
        assert_eq!(self.status.len(), rows, "column length mismatch after load");
        self.size = rows;
        self.read = 0;
    }

    /// Empties every column and resets both cursors.
    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.z.clear();

        self.dx.clear();
        self.dy.clear();
        self.dz.clear();

        self.sx.clear();
        self.sy.clear();
        self.sz.clear();

        self.s_pol_ax.clear();
        self.s_pol_ay.clear();
        self.s_pol_az.clear();
        self.s_pol_ph.clear();

        self.p_pol_ax.clear();
        self.p_pol_ay.clear();
        self.p_pol_az.clear();
        self.p_pol_ph.clear();

        self.wavelength.clear();
        self.time.clear();
        self.weight.clear();

        self.id.clear();
        self.status.clear();

        self.size = 0;
        self.read = 0;
    }

    /// The f32 columns paired with their record/component names, in schema
    /// order. Used by the I/O layer to iterate the float fields uniformly.
    #[must_use]
    pub fn float_columns(&self) -> [(&'static str, Option<&'static str>, &Record<f32>); 20] {
        [
            ("position", Some("x"), &self.x),
            ("position", Some("y"), &self.y),
            ("position", Some("z"), &self.z),
            ("direction", Some("x"), &self.dx),
            ("direction", Some("y"), &self.dy),
            ("direction", Some("z"), &self.dz),
            ("nonPhotonPolarization", Some("x"), &self.sx),
            ("nonPhotonPolarization", Some("y"), &self.sy),
            ("nonPhotonPolarization", Some("z"), &self.sz),
            ("photonSPolarizationAmplitude", Some("x"), &self.s_pol_ax),
            ("photonSPolarizationAmplitude", Some("y"), &self.s_pol_ay),
            ("photonSPolarizationAmplitude", Some("z"), &self.s_pol_az),
            ("photonSPolarizationPhase", None, &self.s_pol_ph),
            ("photonPPolarizationAmplitude", Some("x"), &self.p_pol_ax),
            ("photonPPolarizationAmplitude", Some("y"), &self.p_pol_ay),
            ("photonPPolarizationAmplitude", Some("z"), &self.p_pol_az),
            ("photonPPolarizationPhase", None, &self.p_pol_ph),
            ("wavelength", None, &self.wavelength),
            ("rayTime", None, &self.time),
            ("weight", None, &self.weight),
        ]
    }

    /// Mutable f32 columns in the same order as
    /// [`float_columns`](Self::float_columns).
    #[must_use]
    pub fn float_columns_mut(
        &mut self,
    ) -> [(&'static str, Option<&'static str>, &mut Record<f32>); 20] {
        [
            ("position", Some("x"), &mut self.x),
            ("position", Some("y"), &mut self.y),
            ("position", Some("z"), &mut self.z),
            ("direction", Some("x"), &mut self.dx),
            ("direction", Some("y"), &mut self.dy),
            ("direction", Some("z"), &mut self.dz),
            ("nonPhotonPolarization", Some("x"), &mut self.sx),
            ("nonPhotonPolarization", Some("y"), &mut self.sy),
            ("nonPhotonPolarization", Some("z"), &mut self.sz),
            ("photonSPolarizationAmplitude", Some("x"), &mut self.s_pol_ax),
            ("photonSPolarizationAmplitude", Some("y"), &mut self.s_pol_ay),
            ("photonSPolarizationAmplitude", Some("z"), &mut self.s_pol_az),
            ("photonSPolarizationPhase", None, &mut self.s_pol_ph),
            ("photonPPolarizationAmplitude", Some("x"), &mut self.p_pol_ax),
            ("photonPPolarizationAmplitude", Some("y"), &mut self.p_pol_ay),
            ("photonPPolarizationAmplitude", Some("z"), &mut self.p_pol_az),
            ("photonPPolarizationPhase", None, &mut self.p_pol_ph),
            ("wavelength", None, &mut self.wavelength),
            ("rayTime", None, &mut self.time),
            ("weight", None, &mut self.weight),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ray(seed: f32) -> Ray {
        let mut ray = Ray::new();
        ray.set_position(f64::from(seed), f64::from(seed) + 1.0, f64::from(seed) + 2.0, 1.0);
        ray.set_velocity(0.0, 0.0, 2200.0);
        ray.set_polarization(0.0, 1.0, 0.0, 1.0);
        ray.set_s_polarization(0.1, 0.2, 0.3, 0.4);
        ray.set_p_polarization(0.5, 0.6, 0.7, 0.8);
        ray.wavelength = 1.8;
        ray.time = seed * 0.5;
        ray.weight = 2.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            ray.id = seed as u64;
        }
        ray
    }

    #[test]
    fn test_columns_share_length() {
        let mut buffer = RayBuffer::new();
        for i in 0..5 {
            #[allow(clippy::cast_precision_loss)]
            buffer.push(&sample_ray(i as f32));
        }
        assert_eq!(buffer.len(), 5);
        for (_, _, column) in buffer.float_columns() {
            assert_eq!(column.len(), 5);
        }
        assert_eq!(buffer.id.len(), 5);
        assert_eq!(buffer.status.len(), 5);
    }

    #[test]
    fn test_push_pop_round_trip() {
        let mut buffer = RayBuffer::new();
        let ray = sample_ray(3.0);
        buffer.push(&ray);
        let back = buffer.pop(true).unwrap();
        assert_eq!(back, ray);
        assert!(buffer.is_chunk_finished());
    }

    #[test]
    fn test_pop_without_advance_repeats() {
        let mut buffer = RayBuffer::new();
        buffer.push(&sample_ray(1.0));
        buffer.push(&sample_ray(2.0));
        let first = buffer.pop(false).unwrap();
        let again = buffer.pop(false).unwrap();
        assert_eq!(first, again);
        let advanced = buffer.pop(true).unwrap();
        assert_eq!(advanced, first);
        let second = buffer.pop(true).unwrap();
        assert_ne!(second, first);
        assert!(buffer.pop(true).is_none());
    }

    #[test]
    fn test_chunk_finished_states() {
        let mut buffer = RayBuffer::new();
        assert!(buffer.is_chunk_finished());
        buffer.push(&sample_ray(0.0));
        assert!(!buffer.is_chunk_finished());
        buffer.pop(true);
        assert!(buffer.is_chunk_finished());
    }

    #[test]
    fn test_clear_resets_cursors() {
        let mut buffer = RayBuffer::new();
        buffer.push(&sample_ray(1.0));
        buffer.pop(true);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.read_cursor(), 0);
        assert!(buffer.pop(true).is_none());
    }

    #[test]
    fn test_status_survives_round_trip() {
        let mut buffer = RayBuffer::new();
        let mut dead = sample_ray(1.0);
        dead.status = ParticleStatus::Dead;
        buffer.push(&dead);
        assert_eq!(buffer.pop(true).unwrap().status, ParticleStatus::Dead);
    }
}
