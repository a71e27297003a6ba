use glam::Vec3;

use super::Vertex;

/// CPU mesh: vertices plus `u32` triangle indices.
///
/// Index count must be a multiple of 3; the constructors here guarantee it.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        debug_assert!(indices.len() % 3 == 0, "indices must form whole triangles");
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned unit cube centered at the origin, face normals.
    ///
    /// 24 vertices (4 per face) so each face gets a flat normal.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;

        // (normal, four corners counter-clockwise seen from outside)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]]),
            ([0.0, 0.0, -1.0], [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]]),
            ([1.0, 0.0, 0.0], [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]]),
            ([-1.0, 0.0, 0.0], [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]]),
            ([0.0, 1.0, 0.0], [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]]),
            ([0.0, -1.0, 0.0], [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
            for (corner, uv) in corners.iter().zip(uvs) {
                vertices.push(Vertex {
                    position: *corner,
                    normal,
                    color: [1.0; 4],
                    uv,
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    /// UV sphere centered at the origin with smooth normals.
    ///
    /// `rings >= 2`, `segments >= 3`; inputs below that are raised to the
    /// minimum rather than rejected.
    pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for ring in 0..=rings {
            // Polar angle from +Y pole.
            let v = ring as f32 / rings as f32;
            let theta = v * std::f32::consts::PI;
            let (sin_t, cos_t) = theta.sin_cos();

            for seg in 0..=segments {
                let u = seg as f32 / segments as f32;
                let phi = u * std::f32::consts::TAU;
                let (sin_p, cos_p) = phi.sin_cos();

                let n = Vec3::new(sin_t * cos_p, cos_t, sin_t * sin_p);
                vertices.push(Vertex {
                    position: (n * radius).to_array(),
                    normal: n.to_array(),
                    color: [1.0; 4],
                    uv: [u, v],
                });
            }
        }

        let stride = segments + 1;
        for ring in 0..rings {
            for seg in 0..segments {
                let a = ring * stride + seg;
                let b = a + stride;
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }

        Self { vertices, indices }
    }

    /// Flat quad in the XZ plane, +Y normal, centered at the origin.
    pub fn plane(width: f32, depth: f32) -> Self {
        let (hw, hd) = (width * 0.5, depth * 0.5);
        let normal = [0.0, 1.0, 0.0];

        let vertices = vec![
            Vertex { position: [-hw, 0.0, hd], normal, color: [1.0; 4], uv: [0.0, 1.0] },
            Vertex { position: [hw, 0.0, hd], normal, color: [1.0; 4], uv: [1.0, 1.0] },
            Vertex { position: [hw, 0.0, -hd], normal, color: [1.0; 4], uv: [1.0, 0.0] },
            Vertex { position: [-hw, 0.0, -hd], normal, color: [1.0; 4], uv: [0.0, 0.0] },
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];

        Self { vertices, indices }
    }

    /// Tints every vertex with a linear RGBA color.
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        for v in &mut self.vertices {
            v.color = color;
        }
        self
    }

    /// Recomputes smooth per-vertex normals from triangle geometry.
    ///
    /// Area-weighted: larger triangles contribute more, which is the usual
    /// artifact-free default.
    pub fn recompute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = Vec3::from_array(self.vertices[a].position);
            let pb = Vec3::from_array(self.vertices[b].position);
            let pc = Vec3::from_array(self.vertices[c].position);

            // Cross product length is twice the triangle area.
            let face = (pb - pa).cross(pc - pa);
            acc[a] += face;
            acc[b] += face;
            acc[c] += face;
        }

        for (v, n) in self.vertices.iter_mut().zip(acc) {
            v.normal = n.normalize_or_zero().to_array();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── cube ──────────────────────────────────────────────────────────────

    #[test]
    fn cube_has_six_faces() {
        let cube = MeshData::cube(1.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn cube_normals_are_unit_axis_vectors() {
        let cube = MeshData::cube(2.0);
        for v in &cube.vertices {
            let n = Vec3::from_array(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-6);
            // Exactly one non-zero component per face normal.
            let nonzero = v.normal.iter().filter(|c| c.abs() > 0.5).count();
            assert_eq!(nonzero, 1);
        }
    }

    #[test]
    fn cube_indices_are_in_range() {
        let cube = MeshData::cube(1.0);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));
    }

    // ── sphere ────────────────────────────────────────────────────────────

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = MeshData::uv_sphere(3.0, 8, 12);
        for v in &sphere.vertices {
            let r = Vec3::from_array(v.position).length();
            assert!((r - 3.0).abs() < 1e-4, "r = {r}");
        }
    }

    #[test]
    fn sphere_normals_point_outward() {
        let sphere = MeshData::uv_sphere(1.0, 6, 8);
        for v in &sphere.vertices {
            let p = Vec3::from_array(v.position);
            let n = Vec3::from_array(v.normal);
            assert!(p.dot(n) > 0.99);
        }
    }

    #[test]
    fn sphere_clamps_degenerate_tessellation() {
        let sphere = MeshData::uv_sphere(1.0, 0, 0);
        assert!(sphere.triangle_count() > 0);
    }

    // ── normals ───────────────────────────────────────────────────────────

    #[test]
    fn recompute_normals_on_plane_gives_plus_y() {
        let mut plane = MeshData::plane(2.0, 2.0);
        for v in &mut plane.vertices {
            v.normal = [0.0; 3];
        }
        plane.recompute_normals();
        for v in &plane.vertices {
            assert!((Vec3::from_array(v.normal) - Vec3::Y).length() < 1e-5);
        }
    }
}
