use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::{ParticleEmitter, SeededRng};

/// One live particle. Color and size are derived from age on demand.
#[derive(Debug, Copy, Clone)]
struct Particle {
    position: Vec3,
    velocity: Vec3,
    age: f32,
    lifetime: f32,
}

/// GPU instance data for one billboard.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
}

impl ParticleInstance {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Float32x3, // position
        2 => Float32,   // size
        3 => Float32x4  // color
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// A particle system: emitter config plus simulation state.
///
/// Particles live in world space; moving `origin` moves the spawn point but
/// not particles already in flight.
#[derive(Debug)]
pub struct ParticleSystem {
    pub emitter: ParticleEmitter,
    pub origin: Vec3,

    particles: Vec<Particle>,
    instances: Vec<ParticleInstance>,
    spawn_accumulator: f32,
    rng: SeededRng,
}

impl ParticleSystem {
    pub fn new(emitter: ParticleEmitter, seed: u32) -> Self {
        Self {
            emitter,
            origin: Vec3::ZERO,
            particles: Vec::new(),
            instances: Vec::new(),
            spawn_accumulator: 0.0,
            rng: SeededRng::new(seed),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Removes all live particles and pending spawns.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.spawn_accumulator = 0.0;
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Spawning uses an accumulator so fractional spawns carry over between
    /// frames and the emission rate is framerate-independent.
    pub fn update(&mut self, dt: f32) {
        if !(dt > 0.0) {
            return;
        }

        // Age, integrate, kill.
        let gravity = self.emitter.gravity;
        let drag = (1.0 - self.emitter.drag * dt).max(0.0);
        self.particles.retain_mut(|p| {
            p.age += dt;
            if p.age >= p.lifetime {
                return false;
            }
            p.velocity += gravity * dt;
            p.velocity *= drag;
            p.position += p.velocity * dt;
            true
        });

        // Spawn.
        self.spawn_accumulator += self.emitter.rate * dt;
        while self.spawn_accumulator >= 1.0 {
            self.spawn_accumulator -= 1.0;
            if self.particles.len() >= self.emitter.max_particles {
                // Keep draining the accumulator so a full system does not
                // burst-spawn the backlog once particles die.
                continue;
            }
            let p = self.spawn_one();
            self.particles.push(p);
        }
    }

    fn spawn_one(&mut self) -> Particle {
        let e = &self.emitter;

        let lifetime = self.rng.next_range(e.lifetime.0, e.lifetime.1).max(1e-3);
        let speed = self.rng.next_range(e.speed.0, e.speed.1);

        // Uniform direction inside the cone around `e.direction`.
        let axis = e.direction.normalize_or(Vec3::Y);
        let tangent = axis.any_orthonormal_vector();
        let bitangent = axis.cross(tangent);

        // sqrt biases toward the rim, giving uniform density over the cap.
        let polar = e.spread * self.rng.next_f32().sqrt();
        let azimuth = self.rng.next_range(0.0, std::f32::consts::TAU);
        let (sin_p, cos_p) = polar.sin_cos();
        let (sin_a, cos_a) = azimuth.sin_cos();
        let dir = axis * cos_p + (tangent * cos_a + bitangent * sin_a) * sin_p;

        Particle {
            position: self.origin,
            velocity: dir * speed,
            age: 0.0,
            lifetime,
        }
    }

    /// Builds billboard instances for the current particle set.
    ///
    /// The backing storage is reused across frames; the slice is valid until
    /// the next call.
    pub fn instances(&mut self) -> &[ParticleInstance] {
        self.instances.clear();
        self.instances.reserve(self.particles.len());

        let e = &self.emitter;
        for p in &self.particles {
            let t = (p.age / p.lifetime).clamp(0.0, 1.0);
            let color = e.start_color.lerp(e.end_color, t);
            let size = e.start_size + (e.end_size - e.start_size) * t;
            self.instances.push(ParticleInstance {
                position: p.position.to_array(),
                size,
                color: color.to_array(),
            });
        }

        &self.instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn quiet_emitter() -> ParticleEmitter {
        ParticleEmitter {
            rate: 10.0,
            max_particles: 100,
            lifetime: (1.0, 1.0),
            speed: (1.0, 1.0),
            direction: Vec3::Y,
            spread: 0.0,
            gravity: Vec3::ZERO,
            drag: 0.0,
            start_color: Color::WHITE,
            end_color: Color::TRANSPARENT,
            start_size: 1.0,
            end_size: 0.0,
        }
    }

    // ── spawning ──────────────────────────────────────────────────────────

    #[test]
    fn spawn_rate_is_framerate_independent() {
        let mut many_small = ParticleSystem::new(quiet_emitter(), 1);
        for _ in 0..10 {
            many_small.update(0.05); // 0.5 s in 10 steps
        }

        let mut one_big = ParticleSystem::new(quiet_emitter(), 1);
        one_big.update(0.5);

        assert_eq!(many_small.len(), 5);
        assert_eq!(one_big.len(), 5);
    }

    #[test]
    fn max_particles_caps_population() {
        let mut emitter = quiet_emitter();
        emitter.rate = 1000.0;
        emitter.max_particles = 8;
        emitter.lifetime = (100.0, 100.0);

        let mut sys = ParticleSystem::new(emitter, 1);
        sys.update(1.0);
        assert_eq!(sys.len(), 8);
    }

    #[test]
    fn particles_die_after_lifetime() {
        let mut sys = ParticleSystem::new(quiet_emitter(), 1);
        sys.update(0.5); // spawns 5, all with 1 s lifetime
        assert_eq!(sys.len(), 5);

        // Stop emitting, let them age out.
        sys.emitter.rate = 0.0;
        sys.update(2.0);
        assert!(sys.is_empty());
    }

    // ── integration ───────────────────────────────────────────────────────

    #[test]
    fn zero_spread_moves_along_axis() {
        let mut sys = ParticleSystem::new(quiet_emitter(), 1);
        sys.update(0.2);

        for inst in sys.instances() {
            let p = Vec3::from_array(inst.position);
            assert!(p.x.abs() < 1e-5 && p.z.abs() < 1e-5, "{p:?}");
            assert!(p.y >= 0.0);
        }
    }

    #[test]
    fn gravity_accelerates_particles() {
        let mut emitter = quiet_emitter();
        emitter.gravity = Vec3::new(0.0, -10.0, 0.0);
        emitter.speed = (0.0, 0.0);
        emitter.lifetime = (10.0, 10.0);
        emitter.rate = 2.0;

        let mut sys = ParticleSystem::new(emitter, 1);
        sys.update(0.5); // spawn
        sys.emitter.rate = 0.0;
        sys.update(1.0); // fall

        let inst = sys.instances()[0];
        assert!(inst.position[1] < -5.0, "fell {}", inst.position[1]);
    }

    #[test]
    fn deterministic_for_a_seed() {
        let mut a = ParticleSystem::new(ParticleEmitter::default(), 99);
        let mut b = ParticleSystem::new(ParticleEmitter::default(), 99);
        for _ in 0..30 {
            a.update(1.0 / 60.0);
            b.update(1.0 / 60.0);
        }
        assert_eq!(a.instances(), b.instances());
    }

    // ── appearance ────────────────────────────────────────────────────────

    #[test]
    fn color_and_size_fade_with_age() {
        let mut sys = ParticleSystem::new(quiet_emitter(), 1);
        sys.update(0.15); // one particle, age 0.05
        sys.emitter.rate = 0.0;
        sys.update(0.85); // age ≈ 0.9

        let inst = sys.instances()[0];
        assert!(inst.color[3] < 0.2, "alpha {}", inst.color[3]);
        assert!(inst.size < 0.2, "size {}", inst.size);
    }

    #[test]
    fn origin_moves_spawn_point_only() {
        let mut sys = ParticleSystem::new(quiet_emitter(), 1);
        sys.update(0.15);
        let first = Vec3::from_array(sys.instances()[0].position);

        sys.origin = Vec3::new(100.0, 0.0, 0.0);
        sys.update(0.1);

        let instances = sys.instances();
        // The old particle stayed near the old origin; a new one spawned far away.
        assert!(instances.iter().any(|i| i.position[0] < 1.0));
        assert!(instances.iter().any(|i| i.position[0] > 99.0));
        let _ = first;
    }
}
