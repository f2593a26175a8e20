//! 3D rotations represented as unit quaternions.

use std::ops::Mul;

use icon_common::{IconError, IconResult};
use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

/// Tolerance under which a quaternion counts as normalized.
const NORMALIZED_TOLERANCE: f64 = 1e-12;

/// Rotations below this angle are linearized in the angle-axis conversion.
const ANGLE_AXIS_CUTOFF: f64 = 1e-7;

/// A 3D rotation stored as a unit quaternion `(w, x, y, z)`.
///
/// The quaternion is normalized at every observable point. Construction
/// from arbitrary quaternions either normalizes ([`Rotation::from_quaternion`])
/// or asserts unit norm by construction
/// ([`Rotation::from_quaternion_unchecked`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    quaternion: Quaternion<f64>,
}

impl Rotation {
    /// The identity rotation `(1, 0, 0, 0)`.
    pub fn identity() -> Self {
        Self {
            quaternion: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }

    /// Creates a rotation from an arbitrary 3x3 matrix by orthogonalizing
    /// it with a singular value decomposition.
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Self {
        let rotation_matrix = orthogonalize_rotation_matrix(matrix);
        let unit = UnitQuaternion::from_rotation_matrix(
            &nalgebra::Rotation3::from_matrix_unchecked(rotation_matrix),
        );
        Self {
            quaternion: unit.into_inner(),
        }
    }

    /// Creates a rotation from roll-pitch-yaw angles (Z-Y-X intrinsic).
    pub fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            quaternion: quaternion_from_rpy(roll, pitch, yaw),
        }
    }

    /// Creates a rotation from `quaternion`, normalizing it first. Returns
    /// an error carrying the offending quaternion and its squared norm if
    /// it cannot be normalized.
    pub fn from_quaternion(quaternion: Quaternion<f64>) -> IconResult<Self> {
        let normalized = quaternion.normalize();
        if !is_normalized_quaternion(&normalized) {
            return Err(IconError::invalid_argument(format!(
                "Cannot create rotation from quaternion. Quaternion must be normalized \
                 (quaternion=({:.18e}, {:.18e}, {:.18e}, {:.18e}), squared norm={:.18e})",
                quaternion.scalar(),
                quaternion.imag().x,
                quaternion.imag().y,
                quaternion.imag().z,
                quaternion.norm_squared(),
            )));
        }
        Ok(Self {
            quaternion: normalized,
        })
    }

    /// Creates a rotation from a quaternion that is already unit by
    /// construction. Used on realtime paths where the invariant is
    /// guaranteed by the caller.
    #[inline]
    pub fn from_quaternion_unchecked(quaternion: Quaternion<f64>) -> Self {
        debug_assert!(is_normalized_quaternion(&quaternion));
        Self { quaternion }
    }

    /// The underlying unit quaternion.
    #[inline]
    pub fn quaternion(&self) -> &Quaternion<f64> {
        &self.quaternion
    }

    /// The rotation as a 3x3 matrix.
    pub fn matrix(&self) -> Matrix3<f64> {
        UnitQuaternion::new_unchecked(self.quaternion)
            .to_rotation_matrix()
            .into_inner()
    }

    /// The inverse rotation. The conjugate of a unit quaternion is unit, so
    /// no renormalization is needed.
    #[inline]
    pub fn inverse(&self) -> Self {
        Self {
            quaternion: self.quaternion.conjugate(),
        }
    }

    /// Magnitude of the rotation in radians.
    pub fn norm(&self) -> f64 {
        (2.0 * self.quaternion.imag().norm() * self.quaternion.scalar())
            .asin()
            .abs()
    }

    /// Rotation angle in radians, on the hemisphere with `w >= 0`.
    pub fn angle(&self) -> f64 {
        let w = self.quaternion.scalar().abs();
        2.0 * self.quaternion.imag().norm().atan2(w)
    }

    /// Rotates a 3D point.
    #[inline]
    pub fn rotate(&self, point: &Vector3<f64>) -> Vector3<f64> {
        UnitQuaternion::new_unchecked(self.quaternion).transform_vector(point)
    }

    /// Converts to roll-pitch-yaw angles; see [`quaternion_to_rpy`].
    pub fn to_rpy(&self) -> (f64, f64, f64) {
        quaternion_to_rpy(&self.quaternion)
    }

    /// Converts to an angle-axis vector; see
    /// [`quaternion_to_angle_axis_vector`].
    pub fn to_angle_axis_vector(&self) -> Vector3<f64> {
        quaternion_to_angle_axis_vector(self.quaternion)
    }

    /// Checks equality under `tolerance` using the chord metric
    /// `1 - dot(q1, q2)^2`: 0 for identical orientations, 1 at 180 degrees.
    pub fn is_approx(&self, other: &Rotation, tolerance: f64) -> bool {
        let dot = self
            .quaternion
            .normalize()
            .dot(&other.quaternion.normalize());
        1.0 - dot * dot < tolerance
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Rotation {
    type Output = Rotation;

    /// Composes two rotations.
    ///
    /// Assuming the product's norm is `1 + e` due to floating-point
    /// rounding, the correction below reduces the error to order `e^3/32`.
    fn mul(self, rhs: Rotation) -> Rotation {
        let mut quaternion = self.quaternion * rhs.quaternion;
        let nsq = quaternion.norm_squared();
        if nsq != 1.0 {
            quaternion.coords *= (3.0 + nsq) / (1.0 + 3.0 * nsq);
        }
        Rotation { quaternion }
    }
}

/// True if `quaternion` has unit norm within [`NORMALIZED_TOLERANCE`].
pub fn is_normalized_quaternion(quaternion: &Quaternion<f64>) -> bool {
    (quaternion.norm_squared() - 1.0).abs() < NORMALIZED_TOLERANCE
}

/// Orthogonalizes an arbitrary 3x3 matrix into a rotation matrix via SVD.
pub fn orthogonalize_rotation_matrix(matrix: &Matrix3<f64>) -> Matrix3<f64> {
    let svd = matrix.svd(true, true);
    let u = svd.u.expect("SVD computed with U");
    let v_t = svd.v_t.expect("SVD computed with V^T");
    u * v_t
}

/// Converts roll-pitch-yaw angles (Z-Y-X intrinsic) to a unit quaternion
/// using the closed-form half-angle formula.
pub fn quaternion_from_rpy(roll: f64, pitch: f64, yaw: f64) -> Quaternion<f64> {
    let phi = roll / 2.0;
    let the = pitch / 2.0;
    let psi = yaw / 2.0;

    let w = phi.cos() * the.cos() * psi.cos() + phi.sin() * the.sin() * psi.sin();
    let x = phi.sin() * the.cos() * psi.cos() - phi.cos() * the.sin() * psi.sin();
    let y = phi.cos() * the.sin() * psi.cos() + phi.sin() * the.cos() * psi.sin();
    let z = phi.cos() * the.cos() * psi.sin() - phi.sin() * the.sin() * psi.cos();

    Quaternion::new(w, x, y, z).normalize()
}

/// Converts a quaternion to roll-pitch-yaw angles.
///
/// At pitch = +/- pi/2 (gimbal lock) roll is set to 0 and yaw absorbs the
/// full rotation about the vertical axis as `2 * atan2(z, w)`.
pub fn quaternion_to_rpy(q: &Quaternion<f64>) -> (f64, f64, f64) {
    let almost_one = 1.0 - f64::EPSILON;
    let (w, v) = (q.scalar(), q.imag());
    let sin_pitch = -2.0 * (v.x * v.z - w * v.y);
    if sin_pitch > almost_one {
        (0.0, std::f64::consts::FRAC_PI_2, 2.0 * v.z.atan2(w))
    } else if sin_pitch < -almost_one {
        (0.0, -std::f64::consts::FRAC_PI_2, 2.0 * v.z.atan2(w))
    } else {
        let roll = (2.0 * (v.y * v.z + w * v.x))
            .atan2(w * w - v.x * v.x - v.y * v.y + v.z * v.z);
        let pitch = sin_pitch.asin();
        let yaw = (2.0 * (v.x * v.y + w * v.z))
            .atan2(w * w + v.x * v.x - v.y * v.y - v.z * v.z);
        (roll, pitch, yaw)
    }
}

/// Converts a quaternion to an angle-axis vector: a vector along the
/// rotation axis whose length is the rotation angle.
///
/// The hemisphere with positive `w` is chosen, so `q` and `-q` map to the
/// same vector. Angles below [`ANGLE_AXIS_CUTOFF`] are linearized to
/// `2 * (x, y, z)` for numerical stability under auto-differentiation.
pub fn quaternion_to_angle_axis_vector(quaternion: Quaternion<f64>) -> Vector3<f64> {
    let mut q = quaternion.normalize();
    if q.scalar() < 0.0 {
        q.coords *= -1.0;
    }
    let vec = q.imag();
    let vec_norm = vec.norm();
    let angle = 2.0 * vec_norm.atan2(q.scalar());
    if angle < ANGLE_AXIS_CUTOFF {
        2.0 * vec
    } else {
        (angle / vec_norm) * vec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn identity_is_unit_w() {
        let rotation = Rotation::identity();
        assert_eq!(rotation.quaternion().scalar(), 1.0);
        assert_eq!(rotation.quaternion().imag(), Vector3::zeros());
    }

    #[test]
    fn rpy_literal() {
        // roll=0.1, pitch=0.2, yaw=0.3
        let rotation = Rotation::from_rpy(0.1, 0.2, 0.3);
        let q = rotation.quaternion();
        assert_relative_eq!(q.scalar(), 0.983347, epsilon = 1e-6);
        assert_relative_eq!(q.imag().x, 0.034271, epsilon = 1e-6);
        assert_relative_eq!(q.imag().y, 0.106021, epsilon = 1e-6);
        assert_relative_eq!(q.imag().z, 0.143572, epsilon = 1e-6);

        let (roll, pitch, yaw) = rotation.to_rpy();
        assert_relative_eq!(roll, 0.1, epsilon = 1e-9);
        assert_relative_eq!(pitch, 0.2, epsilon = 1e-9);
        assert_relative_eq!(yaw, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn gimbal_lock_sets_roll_to_zero() {
        // Quarter turn about y: sin(pitch) saturates and yaw absorbs the
        // whole vertical rotation.
        let q = Quaternion::new(
            std::f64::consts::FRAC_1_SQRT_2,
            0.0,
            std::f64::consts::FRAC_1_SQRT_2,
            0.0,
        );
        let (roll, pitch, yaw) = quaternion_to_rpy(&q);
        assert_eq!(roll, 0.0);
        assert_eq!(pitch, std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(yaw, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rpy_survives_roundtrip_near_gimbal_lock() {
        // Roll and yaw collapse onto one degree of freedom at pitch
        // +/- pi/2; the rotation itself must survive the round trip.
        let rotation = Rotation::from_rpy(0.4, std::f64::consts::FRAC_PI_2, 0.7);
        let (roll, pitch, yaw) = rotation.to_rpy();
        let back = Rotation::from_rpy(roll, pitch, yaw);
        assert!(back.is_approx(&rotation, 1e-12));
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let rotation = Rotation::from_rpy(0.7, -0.4, 2.1);
        let composed = rotation * rotation.inverse();
        assert!(composed.is_approx(&Rotation::identity(), f64::EPSILON));
    }

    #[test]
    fn angle_axis_linearization_is_exact() {
        let q = Quaternion::new(1.0, 5e-9, 0.0, 0.0);
        let vector = quaternion_to_angle_axis_vector(q);
        assert_eq!(vector, Vector3::new(1e-8, 0.0, 0.0));
    }

    #[test]
    fn angle_axis_flips_negative_hemisphere() {
        let q = quaternion_from_rpy(0.3, -0.2, 0.9);
        let negated = Quaternion::new(-q.scalar(), -q.imag().x, -q.imag().y, -q.imag().z);
        assert_eq!(
            quaternion_to_angle_axis_vector(q),
            quaternion_to_angle_axis_vector(negated)
        );
    }

    #[test]
    fn from_quaternion_rejects_unnormalizable() {
        let err = Rotation::from_quaternion(Quaternion::new(0.0, 0.0, 0.0, 0.0)).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("must be normalized"));
        assert!(text.contains("squared norm"));
    }

    #[test]
    fn from_quaternion_normalizes() {
        let rotation = Rotation::from_quaternion(Quaternion::new(2.0, 0.0, 0.0, 0.0)).unwrap();
        assert!(rotation.is_approx(&Rotation::identity(), 1e-12));
    }

    #[test]
    fn from_matrix_orthogonalizes() {
        // A slightly skewed rotation matrix still yields a unit quaternion.
        let reference = Rotation::from_rpy(0.2, 0.1, -0.5);
        let mut matrix = reference.matrix();
        matrix[(0, 0)] += 1e-4;
        let rotation = Rotation::from_matrix(&matrix);
        assert!(is_normalized_quaternion(rotation.quaternion()));
        assert!(rotation.is_approx(&reference, 1e-6));
    }

    #[test]
    fn is_approx_chord_metric_extremes() {
        let identity = Rotation::identity();
        assert!(identity.is_approx(&identity, f64::EPSILON));

        // 180 degrees about x: chord metric distance is exactly 1.
        let half_turn = Rotation::from_rpy(std::f64::consts::PI, 0.0, 0.0);
        assert!(!identity.is_approx(&half_turn, 0.999));
    }

    #[test]
    fn composition_renormalizes_drift() {
        let step = Rotation::from_rpy(1e-3, 2e-3, -1e-3);
        let mut accumulated = Rotation::identity();
        for _ in 0..10_000 {
            accumulated = accumulated * step;
        }
        assert!(is_normalized_quaternion(accumulated.quaternion()));
    }

    #[test]
    fn rotate_point() {
        let quarter_turn_z = Rotation::from_rpy(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let rotated = quarter_turn_z.rotate(&Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-15);
        assert_relative_eq!(rotated.y, 1.0, epsilon = 1e-15);
        assert_relative_eq!(rotated.z, 0.0, epsilon = 1e-15);
    }

    proptest! {
        #[test]
        fn rpy_roundtrip(
            roll in -3.0f64..3.0,
            pitch in -1.4f64..1.4,
            yaw in -3.0f64..3.0,
        ) {
            let (r, p, y) = Rotation::from_rpy(roll, pitch, yaw).to_rpy();
            prop_assert!((r - roll).abs() < 1e-9);
            prop_assert!((p - pitch).abs() < 1e-9);
            prop_assert!((y - yaw).abs() < 1e-9);
        }

        #[test]
        fn inverse_composition_is_identity(
            roll in -3.0f64..3.0,
            pitch in -1.4f64..1.4,
            yaw in -3.0f64..3.0,
        ) {
            let rotation = Rotation::from_rpy(roll, pitch, yaw);
            let composed = rotation * rotation.inverse();
            prop_assert!(composed.is_approx(&Rotation::identity(), f64::EPSILON));
        }
    }
}
