use glam::Vec3;

use crate::color::Color;

/// Emitter configuration.
///
/// All randomized fields are `(min, max)` ranges sampled uniformly per
/// particle. Direction is a cone: `direction` is the axis, `spread` the
/// half-angle in radians (`0` = a perfect beam, `PI` = a full sphere).
#[derive(Debug, Clone)]
pub struct ParticleEmitter {
    /// Particles spawned per second.
    pub rate: f32,

    /// Hard cap on live particles; spawning pauses at the cap.
    pub max_particles: usize,

    /// Lifetime range in seconds.
    pub lifetime: (f32, f32),

    /// Initial speed range in units per second.
    pub speed: (f32, f32),

    /// Cone axis for initial velocities. Normalized on use.
    pub direction: Vec3,

    /// Cone half-angle in radians.
    pub spread: f32,

    /// Constant acceleration, typically gravity.
    pub gravity: Vec3,

    /// Linear drag factor per second (`0` = none).
    pub drag: f32,

    /// Color over normalized age (linear interpolation start → end).
    pub start_color: Color,
    pub end_color: Color,

    /// Billboard size over normalized age (world units, linear start → end).
    pub start_size: f32,
    pub end_size: f32,
}

impl Default for ParticleEmitter {
    /// A small upward fountain with warm colors.
    fn default() -> Self {
        Self {
            rate: 60.0,
            max_particles: 1024,
            lifetime: (1.0, 2.0),
            speed: (2.0, 4.0),
            direction: Vec3::Y,
            spread: 0.35,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            drag: 0.1,
            start_color: Color::new(1.0, 0.8, 0.3, 1.0),
            end_color: Color::new(1.0, 0.2, 0.05, 0.0),
            start_size: 0.15,
            end_size: 0.02,
        }
    }
}
