//! Materials.
//!
//! Responsibilities:
//! - classify draws into render-queue buckets (opaque vs. alpha-blended order)
//! - describe fixed-function pass state that maps 1:1 onto a pipeline
//! - mirror the material's GPU uniform block on the CPU with named-offset
//!   bookkeeping (`PropertyLayout` / `PropertyBlock`)
//!
//! The renderer owns one uniform buffer per material, sized by the layout, and
//! re-uploads whenever the block is dirty.

mod pass;
mod property;
mod queue;

pub use pass::{BlendMode, CullMode, ShaderKind, ShaderPass};
pub use property::{PropertyBlock, PropertyError, PropertyLayout, PropertyType};
pub use queue::RenderQueue;

use crate::color::Color;

slotmap::new_key_type! {
    /// Handle to a material registered with the renderer.
    pub struct MaterialId;
}

/// A material: queue class + pass state + uniform block.
///
/// Mutating properties through [`Material::properties_mut`] marks the block
/// dirty; the renderer picks the change up on the next frame.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub queue: RenderQueue,
    pub pass: ShaderPass,
    properties: PropertyBlock,
}

impl Material {
    /// Creates a material with a caller-provided uniform layout.
    pub fn new(name: impl Into<String>, queue: RenderQueue, pass: ShaderPass, layout: PropertyLayout) -> Self {
        Self {
            name: name.into(),
            queue,
            pass,
            properties: PropertyBlock::new(layout),
        }
    }

    /// The standard lit (Blinn-Phong) surface material.
    ///
    /// Uniform block: `base_color`, `emissive`, `specular` (rgb + unused w),
    /// `shininess`. Offsets follow the forward shader's `MaterialUniforms`.
    pub fn lit(name: impl Into<String>, base_color: Color) -> Self {
        let mut mat = Self::new(
            name,
            RenderQueue::OPAQUE,
            ShaderPass::opaque(),
            standard_layout(),
        );
        // Defaults chosen for a dielectric-looking surface.
        let p = mat.properties_mut();
        let _ = p.set_vec4("base_color", base_color.to_array());
        let _ = p.set_vec4("emissive", [0.0, 0.0, 0.0, 0.0]);
        let _ = p.set_vec4("specular", [0.35, 0.35, 0.35, 0.0]);
        let _ = p.set_float("shininess", 32.0);
        mat
    }

    /// An unlit material; `base_color` (plus `emissive`) is output directly.
    ///
    /// Emissive values above 1.0 feed the bloom threshold.
    pub fn unlit(name: impl Into<String>, base_color: Color) -> Self {
        let mut mat = Self::lit(name, base_color);
        mat.pass.shader = ShaderKind::Unlit;
        mat
    }

    /// A transparent lit material (alpha blend, no depth write).
    pub fn transparent(name: impl Into<String>, base_color: Color) -> Self {
        let mut mat = Self::lit(name, base_color);
        mat.queue = RenderQueue::TRANSPARENT;
        mat.pass = ShaderPass::alpha_blended();
        mat
    }

    #[inline]
    pub fn properties(&self) -> &PropertyBlock {
        &self.properties
    }

    #[inline]
    pub fn properties_mut(&mut self) -> &mut PropertyBlock {
        &mut self.properties
    }
}

/// Uniform layout shared by the lit and unlit forward shaders.
fn standard_layout() -> PropertyLayout {
    PropertyLayout::build([
        ("base_color", PropertyType::Vec4),
        ("emissive", PropertyType::Vec4),
        ("specular", PropertyType::Vec4),
        ("shininess", PropertyType::Float),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_matches_forward_shader_struct() {
        // Must mirror `MaterialUniforms` in forward.wgsl exactly.
        let layout = standard_layout();
        assert_eq!(layout.offset_of("base_color"), Some(0));
        assert_eq!(layout.offset_of("emissive"), Some(16));
        assert_eq!(layout.offset_of("specular"), Some(32));
        assert_eq!(layout.offset_of("shininess"), Some(48));
        assert_eq!(layout.size(), 64);
    }

    #[test]
    fn lit_material_defaults() {
        let mat = Material::lit("test", Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(mat.queue, RenderQueue::OPAQUE);
        assert_eq!(mat.pass.shader, ShaderKind::Lit);
        assert_eq!(
            mat.properties().get_vec4("base_color").unwrap(),
            [1.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn transparent_material_does_not_write_depth() {
        let mat = Material::transparent("glass", Color::new(1.0, 1.0, 1.0, 0.5));
        assert_eq!(mat.queue, RenderQueue::TRANSPARENT);
        assert!(mat.pass.depth_test);
        assert!(!mat.pass.depth_write);
    }
}
