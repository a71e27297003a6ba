use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::color::Color;

/// Maximum lights evaluated per frame.
///
/// The forward path shades every object against all lights in a single pass,
/// so the array is part of the per-frame uniform block and must be fixed-size.
/// Excess lights are dropped (the renderer warns once).
pub const MAX_LIGHTS: usize = 8;

/// Light kind plus its kind-specific parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LightKind {
    /// Infinitely distant light along the node's -Z axis. No falloff.
    Directional,
    /// Omnidirectional light with a finite range.
    Point { range: f32 },
    /// Cone light along the node's -Z axis.
    ///
    /// `inner_angle <= outer_angle` (half-angles, radians); intensity fades
    /// smoothly between the two cones.
    Spot {
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
    },
}

/// Light component.
///
/// Position and orientation come from the owning node's world transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// Linear RGB; alpha is ignored.
    pub color: Color,
    pub intensity: f32,
}

impl Light {
    pub fn directional(color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
        }
    }

    pub fn point(color: Color, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point { range },
            color,
            intensity,
        }
    }

    pub fn spot(
        color: Color,
        intensity: f32,
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
    ) -> Self {
        debug_assert!(inner_angle <= outer_angle);
        Self {
            kind: LightKind::Spot {
                range,
                inner_angle,
                outer_angle,
            },
            color,
            intensity,
        }
    }
}

/// GPU mirror of one light, matching `Light` in forward.wgsl.
///
/// Everything is packed into vec4 slots so the array stride works in a
/// uniform block:
/// - `position_range`:  xyz world position, w range (0 = directional)
/// - `direction_cone`:  xyz world direction (normalized), w unused
/// - `color_intensity`: rgb linear color, w intensity
/// - `params`:          x kind (0/1/2), y cos(inner), z cos(outer), w unused
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct PackedLight {
    pub position_range: [f32; 4],
    pub direction_cone: [f32; 4],
    pub color_intensity: [f32; 4],
    pub params: [f32; 4],
}

pub(crate) const KIND_DIRECTIONAL: f32 = 0.0;
pub(crate) const KIND_POINT: f32 = 1.0;
pub(crate) const KIND_SPOT: f32 = 2.0;

/// Packs up to [`MAX_LIGHTS`] `(light, world matrix)` pairs for upload.
///
/// Returns the packed array and the number of lights actually used; the
/// caller decides how to report truncation.
pub(crate) fn pack_lights(lights: &[(Light, Mat4)]) -> ([PackedLight; MAX_LIGHTS], u32) {
    let mut packed = [PackedLight::zeroed(); MAX_LIGHTS];
    let count = lights.len().min(MAX_LIGHTS);

    for (slot, (light, world)) in packed.iter_mut().zip(&lights[..count]) {
        let position = world.transform_point3(Vec3::ZERO);
        // Node forward (-Z) rotated into world space; renormalized because
        // the world matrix may carry scale.
        let direction = world
            .transform_vector3(Vec3::NEG_Z)
            .normalize_or(Vec3::NEG_Z);

        let (kind, range, cos_inner, cos_outer) = match light.kind {
            LightKind::Directional => (KIND_DIRECTIONAL, 0.0, 0.0, 0.0),
            LightKind::Point { range } => (KIND_POINT, range, 0.0, 0.0),
            LightKind::Spot {
                range,
                inner_angle,
                outer_angle,
            } => (KIND_SPOT, range, inner_angle.cos(), outer_angle.cos()),
        };

        *slot = PackedLight {
            position_range: [position.x, position.y, position.z, range],
            direction_cone: [direction.x, direction.y, direction.z, 0.0],
            color_intensity: [light.color.r, light.color.g, light.color.b, light.intensity],
            params: [kind, cos_inner, cos_outer, 0.0],
        };
    }

    (packed, count as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    // ── packing ───────────────────────────────────────────────────────────

    #[test]
    fn point_light_packs_position_and_range() {
        let light = Light::point(Color::rgb(1.0, 0.5, 0.0), 3.0, 25.0);
        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));

        let (packed, count) = pack_lights(&[(light, world)]);
        assert_eq!(count, 1);
        assert_eq!(packed[0].position_range, [1.0, 2.0, 3.0, 25.0]);
        assert_eq!(packed[0].params[0], KIND_POINT);
        assert_eq!(packed[0].color_intensity[3], 3.0);
    }

    #[test]
    fn directional_light_direction_follows_rotation() {
        let light = Light::directional(Color::WHITE, 1.0);
        // 90° about +X rotates -Z onto -Y: pointing straight down.
        let world = Mat4::from_quat(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2));

        let (packed, _) = pack_lights(&[(light, world)]);
        let d = packed[0].direction_cone;
        assert!((d[0]).abs() < 1e-6);
        assert!((d[1] + 1.0).abs() < 1e-6, "direction {d:?}");
        assert!((d[2]).abs() < 1e-6);
    }

    #[test]
    fn spot_cone_cosines_are_ordered() {
        let light = Light::spot(Color::WHITE, 1.0, 10.0, 0.3, 0.6);
        let (packed, _) = pack_lights(&[(light, Mat4::IDENTITY)]);

        let [kind, cos_inner, cos_outer, _] = packed[0].params;
        assert_eq!(kind, KIND_SPOT);
        // Cosine flips the ordering: the tighter inner cone has the larger cosine.
        assert!(cos_inner > cos_outer);
    }

    #[test]
    fn scaled_world_still_yields_unit_direction() {
        let light = Light::directional(Color::WHITE, 1.0);
        let world = Mat4::from_scale(Vec3::splat(5.0));

        let (packed, _) = pack_lights(&[(light, world)]);
        let d = Vec3::new(
            packed[0].direction_cone[0],
            packed[0].direction_cone[1],
            packed[0].direction_cone[2],
        );
        assert!((d.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn excess_lights_are_truncated() {
        let lights: Vec<_> = (0..12)
            .map(|i| {
                (
                    Light::point(Color::WHITE, 1.0, i as f32),
                    Mat4::IDENTITY,
                )
            })
            .collect();

        let (packed, count) = pack_lights(&lights);
        assert_eq!(count, MAX_LIGHTS as u32);
        // Unused trailing slots stay zeroed (none here), used ones keep order.
        assert_eq!(packed[MAX_LIGHTS - 1].position_range[3], 7.0);
    }

    #[test]
    fn struct_size_matches_wgsl_stride() {
        assert_eq!(std::mem::size_of::<PackedLight>(), 64);
    }
}
