use glam::{Mat4, Quat, Vec3};

/// Local position / rotation / scale of a scene node.
///
/// `matrix()` composes as `translation * rotation * scale`, so scale applies
/// in the node's local frame before rotation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub const fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Builds the local matrix (`T * R * S`).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decomposes a matrix back into a transform.
    ///
    /// Lossy for matrices with shear or negative determinants across multiple
    /// axes; fine for anything this engine produces.
    #[inline]
    pub fn from_matrix(m: Mat4) -> Self {
        let (scale, rotation, position) = m.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// The node's forward direction (local -Z rotated into the parent frame).
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// The node's right direction (local +X rotated into the parent frame).
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// The node's up direction (local +Y rotated into the parent frame).
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Rotates the transform so `forward()` points from `position` at `target`.
    ///
    /// Degenerate inputs (target at position, or a direction parallel to `up`)
    /// leave the rotation unchanged.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let dir = target - self.position;
        if dir.length_squared() < 1e-12 || dir.cross(up).length_squared() < 1e-12 {
            return;
        }
        // look_at_rh builds the view matrix; its inverse orients the node.
        let view = Mat4::look_at_rh(self.position, target, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        self.rotation = rotation;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    // ── identity / composition ────────────────────────────────────────────

    #[test]
    fn identity_matrix() {
        assert_eq!(Transform::IDENTITY.matrix(), Mat4::IDENTITY);
        assert_eq!(Transform::default(), Transform::IDENTITY);
    }

    #[test]
    fn composition_order_is_trs() {
        // With T*R*S, a scaled point is rotated and then translated.
        let t = Transform {
            position: Vec3::new(10.0, 0.0, 0.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        // (1,0,0) → scale → (2,0,0) → rotate 90° about Z → (0,2,0) → translate.
        let p = t.matrix().transform_point3(Vec3::X);
        assert!(approx(p, Vec3::new(10.0, 2.0, 0.0)), "{p:?}");
    }

    #[test]
    fn matrix_round_trip() {
        let t = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let back = Transform::from_matrix(t.matrix());
        assert!(approx(back.position, t.position));
        assert!(approx(back.scale, t.scale));
        assert!(back.rotation.dot(t.rotation).abs() > 0.9999);
    }

    // ── directions / look_at ──────────────────────────────────────────────

    #[test]
    fn default_forward_is_negative_z() {
        assert!(approx(Transform::IDENTITY.forward(), Vec3::NEG_Z));
        assert!(approx(Transform::IDENTITY.up(), Vec3::Y));
        assert!(approx(Transform::IDENTITY.right(), Vec3::X));
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let mut t = Transform::from_position(Vec3::new(0.0, 5.0, 10.0));
        t.look_at(Vec3::ZERO, Vec3::Y);
        let expected = (Vec3::ZERO - t.position).normalize();
        assert!(approx(t.forward(), expected), "{:?}", t.forward());
    }

    #[test]
    fn look_at_degenerate_is_a_no_op() {
        let mut t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let before = t.rotation;
        t.look_at(t.position, Vec3::Y);
        assert_eq!(t.rotation, before);
    }
}
