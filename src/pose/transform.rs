//! Rigid transform with non-uniform scale.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Translation, rotation and scale of one sub-part or bone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Lerp translation and scale, slerp rotation.
    ///
    /// `alpha` is expected in `[0, 1]`; the caller clamps.
    pub fn blend(&self, next: &Transform, alpha: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(next.translation, alpha),
            rotation: self.rotation.slerp(next.rotation, alpha).normalize(),
            scale: self.scale.lerp(next.scale, alpha),
        }
    }

    /// Largest per-component deviation between two transforms, per channel.
    ///
    /// Rotation distance accounts for `q` and `-q` describing the same rotation.
    pub fn max_error(&self, other: &Transform) -> (f32, f32, f32) {
        let t = (self.translation - other.translation).abs().max_element();
        let s = (self.scale - other.scale).abs().max_element();
        let dot = self.rotation.dot(other.rotation).abs().min(1.0);
        let r = 1.0 - dot;
        (t, r, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_endpoints() {
        let a = Transform::from_translation(Vec3::new(0.0, 0.0, 0.0));
        let b = Transform::new(
            Vec3::new(10.0, -4.0, 2.0),
            Quat::from_rotation_y(1.0),
            Vec3::splat(2.0),
        );

        let start = a.blend(&b, 0.0);
        let (t, r, s) = start.max_error(&a);
        assert!(t < 1e-6 && r < 1e-6 && s < 1e-6);

        let end = a.blend(&b, 1.0);
        let (t, r, s) = end.max_error(&b);
        assert!(t < 1e-5 && r < 1e-5 && s < 1e-5);
    }

    #[test]
    fn test_blend_midpoint() {
        let a = Transform::IDENTITY;
        let b = Transform::new(
            Vec3::new(2.0, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::splat(3.0),
        );
        let mid = a.blend(&b, 0.5);
        assert!((mid.translation.x - 1.0).abs() < 1e-6);
        assert!((mid.scale.y - 2.0).abs() < 1e-6);
        let expected = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
        assert!(mid.rotation.dot(expected).abs() > 0.9999);
    }

    #[test]
    fn test_max_error_sign_invariant() {
        let a = Transform::new(Vec3::ZERO, Quat::from_rotation_x(0.3), Vec3::ONE);
        let mut b = a;
        b.rotation = -a.rotation;
        let (_, r, _) = a.max_error(&b);
        assert!(r < 1e-6);
    }
}
