use glam::{Mat4, Vec3, Vec4};

/// Camera projection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        /// Half the vertical extent of the view volume, in world units.
        half_height: f32,
        near: f32,
        far: f32,
    },
}

/// Camera component.
///
/// The camera looks down its node's local -Z axis; the view matrix is the
/// inverse of the node's world matrix. `aspect` is written by the forward
/// path every frame to track the render-target size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    pub aspect: f32,
}

impl Camera {
    /// Perspective camera; `fov_y` in radians.
    pub fn perspective(fov_y: f32, near: f32, far: f32) -> Self {
        debug_assert!(near > 0.0 && far > near);
        Self {
            projection: Projection::Perspective { fov_y, near, far },
            aspect: 1.0,
        }
    }

    /// Orthographic camera spanning `2 * half_height` vertically.
    pub fn orthographic(half_height: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                half_height,
                near,
                far,
            },
            aspect: 1.0,
        }
    }

    /// Projection matrix (right-handed, 0..1 depth as wgpu expects).
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y, near, far } => {
                Mat4::perspective_rh(fov_y, self.aspect, near, far)
            }
            Projection::Orthographic {
                half_height,
                near,
                far,
            } => {
                let half_width = half_height * self.aspect;
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, near, far)
            }
        }
    }

    /// View matrix for a camera whose node has the given world matrix.
    pub fn view_matrix(world: Mat4) -> Mat4 {
        world.inverse()
    }

    /// Combined view-projection for the given camera world matrix.
    pub fn view_projection(&self, world: Mat4) -> Mat4 {
        self.projection_matrix() * Self::view_matrix(world)
    }

    /// Projects a world-space point to normalized device coordinates.
    ///
    /// Returns `None` for points at or behind the camera plane (w <= 0),
    /// where the perspective division is meaningless.
    pub fn world_to_ndc(&self, world: Mat4, point: Vec3) -> Option<Vec3> {
        let clip = self.view_projection(world) * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        Some(Vec3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w))
    }

    /// Builds a world-space picking ray through the NDC point `(x, y)`
    /// (`-1..1`, +Y up). Returns `(origin, direction)` with a unit direction.
    pub fn ndc_to_ray(&self, world: Mat4, ndc_x: f32, ndc_y: f32) -> (Vec3, Vec3) {
        let inv = self.view_projection(world).inverse();

        let unproject = |z: f32| -> Vec3 {
            let p: Vec4 = inv * Vec4::new(ndc_x, ndc_y, z, 1.0);
            Vec3::new(p.x / p.w, p.y / p.w, p.z / p.w)
        };

        // wgpu clip space: near plane at z = 0, far at z = 1.
        let near = unproject(0.0);
        let far = unproject(1.0);

        (near, (far - near).normalize_or_zero())
    }
}

impl Default for Camera {
    /// 60° vertical FOV, 0.1 .. 500 clip range.
    fn default() -> Self {
        Self::perspective(60f32.to_radians(), 0.1, 500.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;

    fn camera_world(position: Vec3, target: Vec3) -> Mat4 {
        let mut t = Transform::from_position(position);
        t.look_at(target, Vec3::Y);
        t.matrix()
    }

    // ── projection ────────────────────────────────────────────────────────

    #[test]
    fn point_on_axis_projects_to_center() {
        let cam = Camera::perspective(60f32.to_radians(), 0.1, 100.0);
        let world = camera_world(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);

        let ndc = cam.world_to_ndc(world, Vec3::ZERO).unwrap();
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4, "{ndc:?}");
    }

    #[test]
    fn depth_range_is_zero_to_one() {
        let cam = Camera::perspective(60f32.to_radians(), 1.0, 100.0);
        let world = Mat4::IDENTITY; // camera at origin looking down -Z

        let near = cam.world_to_ndc(world, Vec3::new(0.0, 0.0, -1.0)).unwrap();
        let far = cam.world_to_ndc(world, Vec3::new(0.0, 0.0, -100.0)).unwrap();
        assert!(near.z.abs() < 1e-4, "near plane maps to 0, got {}", near.z);
        assert!((far.z - 1.0).abs() < 1e-4, "far plane maps to 1, got {}", far.z);
    }

    #[test]
    fn points_behind_camera_are_rejected() {
        let cam = Camera::default();
        let world = Mat4::IDENTITY;
        assert!(cam.world_to_ndc(world, Vec3::new(0.0, 0.0, 5.0)).is_none());
    }

    #[test]
    fn aspect_stretches_horizontal() {
        let mut cam = Camera::perspective(90f32.to_radians(), 0.1, 100.0);
        cam.aspect = 2.0;
        let world = Mat4::IDENTITY;

        // The same off-axis point lands closer to center on a wider screen.
        let p = Vec3::new(1.0, 1.0, -2.0);
        let ndc = cam.world_to_ndc(world, p).unwrap();
        assert!((ndc.x - ndc.y / 2.0).abs() < 1e-4, "{ndc:?}");
    }

    #[test]
    fn orthographic_ignores_distance() {
        let cam = Camera::orthographic(10.0, 0.1, 100.0);
        let world = Mat4::IDENTITY;

        let a = cam.world_to_ndc(world, Vec3::new(5.0, 0.0, -1.0)).unwrap();
        let b = cam.world_to_ndc(world, Vec3::new(5.0, 0.0, -90.0)).unwrap();
        assert!((a.x - b.x).abs() < 1e-5);
    }

    // ── picking rays ──────────────────────────────────────────────────────

    #[test]
    fn center_ray_points_forward() {
        let position = Vec3::new(0.0, 2.0, 10.0);
        let cam = Camera::default();
        let world = camera_world(position, Vec3::new(0.0, 2.0, 0.0));

        let (origin, dir) = cam.ndc_to_ray(world, 0.0, 0.0);
        assert!((dir - Vec3::NEG_Z).length() < 1e-3, "{dir:?}");
        // Ray starts on the near plane in front of the camera.
        assert!(origin.z < position.z);
    }

    #[test]
    fn ndc_ray_round_trips_through_projection() {
        let cam = Camera::default();
        let world = camera_world(Vec3::new(3.0, 4.0, 5.0), Vec3::ZERO);

        let (origin, dir) = cam.ndc_to_ray(world, 0.3, -0.4);
        let sample = origin + dir * 5.0;
        let ndc = cam.world_to_ndc(world, sample).unwrap();
        assert!((ndc.x - 0.3).abs() < 1e-3 && (ndc.y + 0.4).abs() < 1e-3, "{ndc:?}");
    }
}
