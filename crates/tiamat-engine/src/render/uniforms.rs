//! CPU mirrors of the forward shaders' uniform blocks.
//!
//! Field order and padding must match the WGSL structs byte for byte; the
//! layout tests below pin the agreed offsets.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::scene::{PackedLight, MAX_LIGHTS};

/// Per-frame uniforms: camera, ambient term, time, light array.
///
/// Mirrors `FrameUniforms` in `forward.wgsl` (also bound by the line and
/// particle shaders).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    /// xyz camera world position, w unused.
    pub camera_pos: [f32; 4],
    /// Billboard basis for particles: xyz camera right axis.
    pub camera_right: [f32; 4],
    /// Billboard basis for particles: xyz camera up axis.
    pub camera_up: [f32; 4],
    /// rgb ambient color (already scaled by intensity), w unused.
    pub ambient: [f32; 4],
    /// x seconds since startup, yzw unused.
    pub time: [f32; 4],
    /// x active light count, yzw unused.
    pub counts: [u32; 4],
    pub lights: [PackedLight; MAX_LIGHTS],
}

/// Per-draw uniforms, bound at a dynamic offset.
///
/// Mirrors `ObjectUniforms` in `forward.wgsl`. The normal matrix is the
/// inverse-transpose of the model matrix, stored as a full mat4 to keep
/// uniform alignment trivial.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl ObjectUniforms {
    pub fn new(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
        }
    }
}

/// Dynamic-offset stride for [`ObjectUniforms`].
///
/// 256 satisfies `min_uniform_buffer_offset_alignment` on every backend wgpu
/// supports with default limits.
pub(crate) const OBJECT_UNIFORM_STRIDE: u64 = 256;

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn frame_uniforms_offsets_match_wgsl() {
        assert_eq!(offset_of!(FrameUniforms, view), 0);
        assert_eq!(offset_of!(FrameUniforms, proj), 64);
        assert_eq!(offset_of!(FrameUniforms, camera_pos), 128);
        assert_eq!(offset_of!(FrameUniforms, camera_right), 144);
        assert_eq!(offset_of!(FrameUniforms, camera_up), 160);
        assert_eq!(offset_of!(FrameUniforms, ambient), 176);
        assert_eq!(offset_of!(FrameUniforms, time), 192);
        assert_eq!(offset_of!(FrameUniforms, counts), 208);
        assert_eq!(offset_of!(FrameUniforms, lights), 224);
        // 224 + 8 lights * 64 bytes; already 16-aligned.
        assert_eq!(size_of::<FrameUniforms>(), 736);
    }

    #[test]
    fn object_uniforms_fit_the_stride() {
        assert_eq!(size_of::<ObjectUniforms>(), 128);
        assert!((size_of::<ObjectUniforms>() as u64) <= OBJECT_UNIFORM_STRIDE);
    }

    #[test]
    fn normal_matrix_undoes_nonuniform_scale() {
        use glam::{Vec3, Vec4Swizzles};

        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let u = ObjectUniforms::new(model);
        let normal = Mat4::from_cols_array_2d(&u.normal);

        // A +X normal on a surface stretched along X must shrink, then
        // renormalize to unit; direction is preserved for axis-aligned scale.
        let n = (normal * glam::Vec4::new(1.0, 0.0, 0.0, 0.0)).xyz();
        assert!((n.normalize() - Vec3::X).length() < 1e-6);
        assert!((n.x - 0.5).abs() < 1e-6);
    }
}
