//! CPU-side mesh data.
//!
//! Responsibilities:
//! - define the engine vertex format and its GPU layout description
//! - build analytic primitives (cube, sphere, plane)
//!
//! GPU upload lives in `render`; scene nodes reference uploaded meshes through
//! the copyable [`MeshId`] handle.

mod data;
mod vertex;

pub use data::MeshData;
pub use vertex::Vertex;

slotmap::new_key_type! {
    /// Handle to a mesh uploaded to the renderer.
    pub struct MeshId;
}
