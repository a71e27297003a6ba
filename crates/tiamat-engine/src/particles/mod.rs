//! CPU particle system.
//!
//! Responsibilities:
//! - emitter configuration (spawn rate, lifetimes, velocity cone, forces)
//! - per-frame simulation: spawn, integrate, age, kill
//! - produce billboard instance data for the renderer
//!
//! Simulation is deterministic for a given seed and dt sequence, which keeps
//! it unit-testable; the renderer only ever sees plain instance buffers.

mod emitter;
mod rng;
mod system;

pub use emitter::ParticleEmitter;
pub use rng::SeededRng;
pub use system::{ParticleInstance, ParticleSystem};
