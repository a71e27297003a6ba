//! Scene graph.
//!
//! Responsibilities:
//! - own nodes in a generational arena, addressed by copyable [`NodeId`]s
//! - maintain the parent/child tree and its cached world matrices
//!   (lazy recompute, dirty flags propagated down the tree)
//! - attach renderable components to nodes: mesh instance, light, camera
//!
//! The renderer consumes the scene through [`Scene::flush_transforms`] +
//! [`Scene::visit_visible`]; gameplay code mutates transforms through the
//! `set_*` accessors, which handle dirty propagation.

mod camera;
mod graph;
mod light;

pub use camera::{Camera, Projection};
pub use graph::{MeshInstance, Node, NodeId, Scene, SceneError};
pub use light::{Light, LightKind, MAX_LIGHTS};

pub(crate) use light::{pack_lights, PackedLight};
