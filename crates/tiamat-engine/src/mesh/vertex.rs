use bytemuck::{Pod, Zeroable};

/// Engine vertex format: position, normal, linear RGBA color, uv.
///
/// One format for every mesh pass keeps pipeline management simple; unused
/// attributes cost a few bytes per vertex and nothing else.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x4, // color
        3 => Float32x2  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// A white vertex at `position` with `normal`, uv zero.
    #[inline]
    pub const fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            color: [1.0, 1.0, 1.0, 1.0],
            uv: [0.0, 0.0],
        }
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new([0.0; 3], [0.0, 1.0, 0.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_matches_attribute_layout() {
        // 3 + 3 + 4 + 2 floats.
        assert_eq!(std::mem::size_of::<Vertex>(), 12 * 4);
        assert_eq!(Vertex::layout().array_stride, 48);
    }
}
