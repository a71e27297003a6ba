//! Tiamat engine crate.
//!
//! A forward-rendering 3D engine: scene graph with cached world transforms,
//! materials with CPU-mirrored uniform blocks, a multi-pass forward renderer
//! (MSAA + bloom compositing), a debug line overlay and a CPU particle system,
//! all on top of a wgpu/winit runtime.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod color;
pub mod math;
pub mod mesh;
pub mod material;
pub mod scene;
pub mod debug;
pub mod particles;
pub mod render;
