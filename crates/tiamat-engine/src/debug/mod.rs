//! Debug-render task queue.
//!
//! Responsibilities:
//! - queue one frame's worth of debug tasks (lines, rays, boxes, grids)
//! - flatten tasks into colored line segments for the overlay pass
//! - reuse allocations across frames
//!
//! Tasks accumulate between frames until the renderer drains the queue; apps
//! push whatever is useful for the current frame and forget about it.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::color::Color;

/// One vertex of the overlay line list.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl LineVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4  // color
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// A queued debug task.
#[derive(Debug, Clone)]
enum DebugTask {
    Line {
        from: Vec3,
        to: Vec3,
        color: Color,
    },
    Aabb {
        min: Vec3,
        max: Vec3,
        color: Color,
    },
    Axes {
        world: Mat4,
        size: f32,
    },
    Grid {
        y: f32,
        half_extent: f32,
        step: f32,
        color: Color,
    },
    WireSphere {
        center: Vec3,
        radius: f32,
        color: Color,
    },
}

/// Segments used per circle when flattening wire spheres.
const SPHERE_SEGMENTS: usize = 24;

/// Per-frame queue of debug draw tasks.
///
/// `push` methods are O(1); flattening happens once per frame in
/// [`DebugDraw::drain_lines`]. Both the task list and the vertex scratch
/// buffer keep their capacity across frames.
#[derive(Debug, Default)]
pub struct DebugDraw {
    tasks: Vec<DebugTask>,
    vertices: Vec<LineVertex>,
}

impl DebugDraw {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[inline]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Queues a single line segment.
    pub fn line(&mut self, from: Vec3, to: Vec3, color: Color) {
        self.tasks.push(DebugTask::Line { from, to, color });
    }

    /// Queues a ray: `length` world units from `origin` along `dir`.
    pub fn ray(&mut self, origin: Vec3, dir: Vec3, length: f32, color: Color) {
        let to = origin + dir.normalize_or_zero() * length;
        self.tasks.push(DebugTask::Line {
            from: origin,
            to,
            color,
        });
    }

    /// Queues an axis-aligned wire box.
    pub fn aabb(&mut self, min: Vec3, max: Vec3, color: Color) {
        self.tasks.push(DebugTask::Aabb { min, max, color });
    }

    /// Queues an RGB axis cross for the given world matrix
    /// (+X red, +Y green, +Z blue).
    pub fn axes(&mut self, world: Mat4, size: f32) {
        self.tasks.push(DebugTask::Axes { world, size });
    }

    /// Queues a square grid in the XZ plane at height `y`.
    pub fn grid(&mut self, y: f32, half_extent: f32, step: f32, color: Color) {
        self.tasks.push(DebugTask::Grid {
            y,
            half_extent,
            step,
            color,
        });
    }

    /// Queues three axis-aligned great circles approximating a sphere.
    pub fn wire_sphere(&mut self, center: Vec3, radius: f32, color: Color) {
        self.tasks.push(DebugTask::WireSphere {
            center,
            radius,
            color,
        });
    }

    /// Flattens all queued tasks into line-list vertices and clears the queue.
    ///
    /// The returned slice is valid until the next call; its backing storage is
    /// reused across frames.
    pub fn drain_lines(&mut self) -> &[LineVertex] {
        self.vertices.clear();

        for task in self.tasks.drain(..) {
            match task {
                DebugTask::Line { from, to, color } => {
                    push_line(&mut self.vertices, from, to, color);
                }

                DebugTask::Aabb { min, max, color } => {
                    let c = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
                    let corners = [
                        c(min.x, min.y, min.z),
                        c(max.x, min.y, min.z),
                        c(max.x, min.y, max.z),
                        c(min.x, min.y, max.z),
                        c(min.x, max.y, min.z),
                        c(max.x, max.y, min.z),
                        c(max.x, max.y, max.z),
                        c(min.x, max.y, max.z),
                    ];
                    // Bottom loop, top loop, verticals.
                    const EDGES: [(usize, usize); 12] = [
                        (0, 1), (1, 2), (2, 3), (3, 0),
                        (4, 5), (5, 6), (6, 7), (7, 4),
                        (0, 4), (1, 5), (2, 6), (3, 7),
                    ];
                    for (a, b) in EDGES {
                        push_line(&mut self.vertices, corners[a], corners[b], color);
                    }
                }

                DebugTask::Axes { world, size } => {
                    let origin = world.transform_point3(Vec3::ZERO);
                    let axes = [
                        (Vec3::X, Color::rgb(0.9, 0.15, 0.15)),
                        (Vec3::Y, Color::rgb(0.15, 0.9, 0.15)),
                        (Vec3::Z, Color::rgb(0.15, 0.35, 0.9)),
                    ];
                    for (axis, color) in axes {
                        let tip = world.transform_point3(axis * size);
                        push_line(&mut self.vertices, origin, tip, color);
                    }
                }

                DebugTask::Grid {
                    y,
                    half_extent,
                    step,
                    color,
                } => {
                    if step <= 0.0 || half_extent <= 0.0 {
                        continue;
                    }
                    let n = (half_extent / step).floor() as i32;
                    for i in -n..=n {
                        let t = i as f32 * step;
                        push_line(
                            &mut self.vertices,
                            Vec3::new(t, y, -half_extent),
                            Vec3::new(t, y, half_extent),
                            color,
                        );
                        push_line(
                            &mut self.vertices,
                            Vec3::new(-half_extent, y, t),
                            Vec3::new(half_extent, y, t),
                            color,
                        );
                    }
                }

                DebugTask::WireSphere {
                    center,
                    radius,
                    color,
                } => {
                    for axis in 0..3 {
                        for seg in 0..SPHERE_SEGMENTS {
                            let a = seg as f32 / SPHERE_SEGMENTS as f32 * std::f32::consts::TAU;
                            let b = (seg + 1) as f32 / SPHERE_SEGMENTS as f32
                                * std::f32::consts::TAU;
                            let point = |angle: f32| {
                                let (s, c) = angle.sin_cos();
                                center
                                    + match axis {
                                        0 => Vec3::new(0.0, c, s), // about X
                                        1 => Vec3::new(c, 0.0, s), // about Y
                                        _ => Vec3::new(c, s, 0.0), // about Z
                                    } * radius
                            };
                            push_line(&mut self.vertices, point(a), point(b), color);
                        }
                    }
                }
            }
        }

        &self.vertices
    }
}

#[inline]
fn push_line(out: &mut Vec<LineVertex>, from: Vec3, to: Vec3, color: Color) {
    let color = color.to_array();
    out.push(LineVertex {
        position: from.to_array(),
        color,
    });
    out.push(LineVertex {
        position: to.to_array(),
        color,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── flattening ────────────────────────────────────────────────────────

    #[test]
    fn line_produces_two_vertices() {
        let mut dbg = DebugDraw::new();
        dbg.line(Vec3::ZERO, Vec3::X, Color::WHITE);

        let verts = dbg.drain_lines();
        assert_eq!(verts.len(), 2);
        assert_eq!(verts[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(verts[1].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn aabb_produces_twelve_edges() {
        let mut dbg = DebugDraw::new();
        dbg.aabb(Vec3::ZERO, Vec3::ONE, Color::WHITE);
        assert_eq!(dbg.drain_lines().len(), 24);
    }

    #[test]
    fn axes_produce_three_lines() {
        let mut dbg = DebugDraw::new();
        dbg.axes(Mat4::IDENTITY, 2.0);

        let verts = dbg.drain_lines();
        assert_eq!(verts.len(), 6);
        // +X axis tip.
        assert_eq!(verts[1].position, [2.0, 0.0, 0.0]);
    }

    #[test]
    fn grid_line_count_matches_extent() {
        let mut dbg = DebugDraw::new();
        // n = 2 → i in -2..=2 → 5 positions, 2 lines each.
        dbg.grid(0.0, 2.0, 1.0, Color::WHITE);
        assert_eq!(dbg.drain_lines().len(), 5 * 2 * 2);
    }

    #[test]
    fn degenerate_grid_is_ignored() {
        let mut dbg = DebugDraw::new();
        dbg.grid(0.0, 2.0, 0.0, Color::WHITE);
        assert!(dbg.drain_lines().is_empty());
    }

    #[test]
    fn ray_normalizes_direction() {
        let mut dbg = DebugDraw::new();
        dbg.ray(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0), 3.0, Color::WHITE);

        let verts = dbg.drain_lines();
        assert_eq!(verts[1].position, [0.0, 3.0, 0.0]);
    }

    // ── queue behavior ────────────────────────────────────────────────────

    #[test]
    fn drain_empties_the_queue() {
        let mut dbg = DebugDraw::new();
        dbg.line(Vec3::ZERO, Vec3::X, Color::WHITE);

        assert_eq!(dbg.task_count(), 1);
        dbg.drain_lines();
        assert!(dbg.is_empty());
        assert!(dbg.drain_lines().is_empty());
    }

    #[test]
    fn wire_sphere_vertices_lie_on_radius() {
        let mut dbg = DebugDraw::new();
        let center = Vec3::new(1.0, 2.0, 3.0);
        dbg.wire_sphere(center, 5.0, Color::WHITE);

        for v in dbg.drain_lines() {
            let d = (Vec3::from_array(v.position) - center).length();
            assert!((d - 5.0).abs() < 1e-4);
        }
    }
}
