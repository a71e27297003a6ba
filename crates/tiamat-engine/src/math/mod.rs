//! 3D math types.
//!
//! Matrices, vectors and quaternions come from `glam`; this module adds the
//! engine's own `Transform` on top. Conventions used throughout the engine:
//! - right-handed coordinates, +Y up
//! - a node's "forward" direction is local -Z (cameras and spot lights look
//!   down -Z)
//! - matrices compose as `T * R * S`

mod transform;

pub use transform::Transform;
