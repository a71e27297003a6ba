//! GPU rendering subsystem.
//!
//! The forward path consumes a `Scene` and issues GPU commands via wgpu:
//! collect visible draw items, sort them by render-queue key, shade opaque and
//! blended geometry against all lights in one pass over MSAA HDR targets, then
//! resolve, bloom and composite into the backbuffer.
//!
//! Each pass owns its GPU resources (pipelines, buffers); intermediate targets
//! are lazily (re)created when the surface size or format changes.

mod bloom;
mod ctx;
mod forward;
mod key;
mod targets;
mod uniforms;

pub use ctx::{RenderCtx, RenderTarget};
pub use forward::{ForwardRenderer, FramePacket, RendererConfig};
