//! Ray record types.
//!
//! A [`Ray`] holds the full per-particle state that gets persisted: position,
//! direction, polarization, timing, statistical weight and identity. Unit
//! conversions happen in the setters so the stored state is always coherent
//! (positions in centimeters, times in milliseconds); the I/O layer only
//! attaches the SI scale factors on disk.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Liveness of a traced particle.
///
/// Stored on disk as a signed 32-bit integer; `1` is alive, everything else
/// counts as dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParticleStatus {
    /// Particle terminated (absorbed, lost, killed).
    Dead = 0,
    /// Particle still propagating.
    #[default]
    Alive = 1,
}

impl ParticleStatus {
    /// Storage representation.
    #[inline]
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Decodes the storage representation; any value other than `1` is dead.
    #[inline]
    #[must_use]
    pub fn from_i32(value: i32) -> Self {
        if value == 1 {
            Self::Alive
        } else {
            Self::Dead
        }
    }
}

/// Particle kind written as the species metadata of a file.
///
/// The kinds share the [`Ray`] layout; the tag only selects the species
/// attributes (name, PDG id, rest mass) attached on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParticleKind {
    /// Photon rays (x-ray tracing); polarization lives in the s/p amplitude
    /// and phase fields.
    Photon,
    /// Neutron rays; polarization lives in the non-photon polarization
    /// vector.
    Neutron,
}

impl ParticleKind {
    /// Species name used in the file hierarchy.
    #[must_use]
    pub fn species_type(self) -> &'static str {
        match self {
            Self::Photon => "photon",
            Self::Neutron => "neutron",
        }
    }

    /// Particle Data Group numbering-scheme id.
    #[must_use]
    pub fn pdg_id(self) -> i64 {
        match self {
            Self::Photon => 22,
            Self::Neutron => 2112,
        }
    }

    /// Rest mass in kg.
    #[must_use]
    pub fn mass_kg(self) -> f64 {
        match self {
            Self::Photon => 0.0,
            Self::Neutron => 1.674_927_498_04e-27,
        }
    }
}

/// State of one traced particle.
///
/// Passed by value; construct one per particle, fill it through the setters
/// and hand it to the I/O layer. Direction is expected to be unit length
/// ([`Ray::set_velocity`] normalizes for you, [`Ray::set_direction`] trusts
/// the caller).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ray {
    /// Position in cm.
    pub position: [f32; 3],
    /// Unit direction of flight.
    pub direction: [f32; 3],
    /// Polarization vector for non-photons.
    pub polarization: [f32; 3],
    /// Photon s-polarization amplitude.
    pub s_polarization_amplitude: [f32; 3],
    /// Photon s-polarization phase.
    pub s_polarization_phase: f32,
    /// Photon p-polarization amplitude.
    pub p_polarization_amplitude: [f32; 3],
    /// Photon p-polarization phase.
    pub p_polarization_phase: f32,
    /// Wavelength in Angstrom.
    pub wavelength: f32,
    /// Time since ray generation in ms.
    pub time: f32,
    /// Statistical weight.
    pub weight: f32,
    /// Unique ray identifier.
    pub id: u64,
    /// Liveness flag.
    pub status: ParticleStatus,
}

impl Ray {
    /// Creates a ray with unit weight and alive status, everything else
    /// zeroed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            weight: 1.0,
            ..Self::default()
        }
    }

    /// Scales and sets the position; `scale` converts the caller's length
    /// unit to cm (e.g. 100.0 for meters).
    #[inline]
    pub fn set_position(&mut self, x: f64, y: f64, z: f64, scale: f64) {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.position = [(x * scale) as f32, (y * scale) as f32, (z * scale) as f32];
        }
    }

    /// Scales and sets the direction. The result is stored as given; pass a
    /// unit vector or a scale that makes it one.
    #[inline]
    pub fn set_direction(&mut self, x: f64, y: f64, z: f64, scale: f64) {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.direction = [(x * scale) as f32, (y * scale) as f32, (z * scale) as f32];
        }
    }

    /// Sets the direction from a velocity vector, normalizing it. A zero
    /// velocity leaves the direction untouched.
    pub fn set_velocity(&mut self, vx: f64, vy: f64, vz: f64) {
        let speed = (vx * vx + vy * vy + vz * vz).sqrt();
        if speed > 0.0 {
            self.set_direction(vx, vy, vz, 1.0 / speed);
        }
    }

    /// Scales and sets the non-photon polarization vector.
    #[inline]
    pub fn set_polarization(&mut self, x: f64, y: f64, z: f64, scale: f64) {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.polarization = [(x * scale) as f32, (y * scale) as f32, (z * scale) as f32];
        }
    }

    /// Sets the photon s-polarization amplitude and phase.
    #[inline]
    pub fn set_s_polarization(&mut self, x: f32, y: f32, z: f32, phase: f32) {
        self.s_polarization_amplitude = [x, y, z];
        self.s_polarization_phase = phase;
    }

    /// Sets the photon p-polarization amplitude and phase.
    #[inline]
    pub fn set_p_polarization(&mut self, x: f32, y: f32, z: f32, phase: f32) {
        self.p_polarization_amplitude = [x, y, z];
        self.p_polarization_phase = phase;
    }

    /// Position in meters (cm stored internally).
    #[inline]
    #[must_use]
    pub fn position_m(&self) -> [f64; 3] {
        [
            f64::from(self.position[0]) * 1e-2,
            f64::from(self.position[1]) * 1e-2,
            f64::from(self.position[2]) * 1e-2,
        ]
    }

    /// Time in seconds (ms stored internally).
    #[inline]
    #[must_use]
    pub fn time_s(&self) -> f64 {
        f64::from(self.time) * 1e-3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_ray_defaults() {
        let ray = Ray::new();
        assert_eq!(ray.weight, 1.0);
        assert_eq!(ray.status, ParticleStatus::Alive);
        assert_eq!(ray.position, [0.0; 3]);
        assert_eq!(ray.id, 0);
    }

    #[test]
    fn test_position_scaling() {
        let mut ray = Ray::new();
        // meters in, cm stored
        ray.set_position(1.0, 2.0, 3.0, 100.0);
        assert_eq!(ray.position, [100.0, 200.0, 300.0]);
        assert_relative_eq!(ray.position_m()[0], 1.0);
        assert_relative_eq!(ray.position_m()[2], 3.0);
    }

    #[test]
    fn test_velocity_normalizes() {
        let mut ray = Ray::new();
        ray.set_velocity(300.0, 0.0, 400.0);
        assert_relative_eq!(ray.direction[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(ray.direction[2], 0.8, epsilon = 1e-6);
        let norm: f32 = ray.direction.iter().map(|d| d * d).sum();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_velocity_leaves_direction() {
        let mut ray = Ray::new();
        ray.set_direction(0.0, 0.0, 1.0, 1.0);
        ray.set_velocity(0.0, 0.0, 0.0);
        assert_eq!(ray.direction, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_status_codec() {
        assert_eq!(ParticleStatus::Alive.as_i32(), 1);
        assert_eq!(ParticleStatus::Dead.as_i32(), 0);
        assert_eq!(ParticleStatus::from_i32(1), ParticleStatus::Alive);
        assert_eq!(ParticleStatus::from_i32(0), ParticleStatus::Dead);
        // any other value is conventionally dead
        assert_eq!(ParticleStatus::from_i32(-7), ParticleStatus::Dead);
        assert_eq!(ParticleStatus::from_i32(2), ParticleStatus::Dead);
    }

    #[test]
    fn test_particle_kind_metadata() {
        assert_eq!(ParticleKind::Neutron.pdg_id(), 2112);
        assert_eq!(ParticleKind::Photon.pdg_id(), 22);
        assert_eq!(ParticleKind::Photon.mass_kg(), 0.0);
        assert!(ParticleKind::Neutron.mass_kg() > 0.0);
        assert_eq!(ParticleKind::Neutron.species_type(), "neutron");
    }
}
