//! Rigid transforms in 3D space.

use std::ops::Mul;

use nalgebra::{Matrix3, Matrix4, Vector3};

use crate::rotation::Rotation;

/// A rigid transform: a rotation plus a translation.
///
/// Written `a_T_b`, a pose maps points expressed in frame B into frame A.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose3 {
    rotation: Rotation,
    translation: Vector3<f64>,
}

impl Pose3 {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: Rotation::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn new(rotation: Rotation, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// A pure translation.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            rotation: Rotation::identity(),
            translation,
        }
    }

    /// A pure rotation.
    pub fn from_rotation(rotation: Rotation) -> Self {
        Self {
            rotation,
            translation: Vector3::zeros(),
        }
    }

    /// Creates a pose from a 4x4 affine matrix, orthogonalizing the
    /// rotation block.
    pub fn from_matrix(affine: &Matrix4<f64>) -> Self {
        let rotation_block: Matrix3<f64> = affine.fixed_view::<3, 3>(0, 0).clone_owned();
        let translation: Vector3<f64> = affine.fixed_view::<3, 1>(0, 3).clone_owned();
        Self {
            rotation: Rotation::from_matrix(&rotation_block),
            translation,
        }
    }

    #[inline]
    pub fn rotation(&self) -> &Rotation {
        &self.rotation
    }

    #[inline]
    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Self {
        let rotation_inverse = self.rotation.inverse();
        Self {
            translation: -rotation_inverse.rotate(&self.translation),
            rotation: rotation_inverse,
        }
    }

    /// Applies the transform to a point.
    pub fn apply(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.translation + self.rotation.rotate(point)
    }

    /// The pose as an affine 4x4 matrix.
    pub fn matrix(&self) -> Matrix4<f64> {
        let mut out = Matrix4::identity();
        out.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.rotation.matrix());
        out.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        out
    }

    /// Checks equality with a shared tolerance for the linear and angular
    /// parts.
    pub fn is_approx(&self, other: &Pose3, tolerance: f64) -> bool {
        self.is_approx_split(other, tolerance, tolerance)
    }

    /// Checks equality with independent linear and angular tolerances.
    pub fn is_approx_split(
        &self,
        other: &Pose3,
        linear_tolerance: f64,
        angular_tolerance: f64,
    ) -> bool {
        (self.translation - other.translation).norm() < linear_tolerance
            && self.rotation.is_approx(&other.rotation, angular_tolerance)
    }
}

impl Default for Pose3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Pose3 {
    type Output = Pose3;

    fn mul(self, rhs: Pose3) -> Pose3 {
        Pose3 {
            translation: self.translation + self.rotation.rotate(&rhs.translation),
            rotation: self.rotation * rhs.rotation,
        }
    }
}
