//! Wire-form conversions for math primitives.
//!
//! Two deserialization policies exist for quaternions. The strict mode
//! rejects anything outside `1 +/- 32*eps` of unit squared norm; the
//! lenient mode accepts up to `1 +/- 1e-3` and renormalizes. Both preserve
//! the exact bits when the input is already normalized, so
//! `from_wire(to_wire(pose))` is bit-true.

use icon_common::{IconError, IconResult};
use icon_wire::math as wire;
use nalgebra::{Matrix3, Quaternion, Vector3};

use crate::pose::Pose3;
use crate::rotation::Rotation;

/// 5 bits of mantissa error; adequate for common floating-point noise.
const STD_ERROR: f64 = 32.0 * f64::EPSILON;

/// Tolerance of the lenient normalize-on-load mode.
const NORMALIZATION_ERROR: f64 = 1e-3;

/// Tests whether two values are close enough to be considered equal,
/// avoiding false rejections from minute arithmetic differences.
fn almost_equals(x: f64, y: f64, std_error: f64) -> bool {
    if x == y {
        return true;
    }
    let abs_x = x.abs();
    let abs_y = y.abs();
    if abs_x <= std_error && abs_y <= std_error {
        return true;
    }
    if x.is_infinite() || x.is_nan() || y.is_infinite() || y.is_nan() {
        return false;
    }
    let relative_margin = std_error * abs_x.max(abs_y);
    let max_error = std_error.max(relative_margin);
    (x - y).abs() <= max_error
}

pub fn vector_to_wire(vector: &Vector3<f64>) -> wire::Point {
    wire::Point {
        x: vector.x,
        y: vector.y,
        z: vector.z,
    }
}

pub fn vector_from_wire(point: &wire::Point) -> Vector3<f64> {
    Vector3::new(point.x, point.y, point.z)
}

pub fn quaternion_to_wire(quaternion: &Quaternion<f64>) -> wire::Quaternion {
    wire::Quaternion {
        w: quaternion.scalar(),
        x: quaternion.imag().x,
        y: quaternion.imag().y,
        z: quaternion.imag().z,
    }
}

pub fn quaternion_from_wire(quaternion: &wire::Quaternion) -> Quaternion<f64> {
    Quaternion::new(quaternion.w, quaternion.x, quaternion.y, quaternion.z)
}

pub fn matrix_to_wire(matrix: &Matrix3<f64>) -> wire::Matrix3x3 {
    let mut values = [0.0; 9];
    for row in 0..3 {
        for col in 0..3 {
            values[row * 3 + col] = matrix[(row, col)];
        }
    }
    wire::Matrix3x3 { values }
}

pub fn matrix_from_wire(matrix: &wire::Matrix3x3) -> Matrix3<f64> {
    Matrix3::from_row_slice(&matrix.values)
}

pub fn pose_to_wire(pose: &Pose3) -> wire::Pose {
    wire::Pose {
        position: vector_to_wire(pose.translation()),
        orientation: quaternion_to_wire(pose.rotation().quaternion()),
    }
}

/// Strict deserialization: rejects quaternions whose squared norm is
/// outside `1 +/- 32*eps`, reporting the offending values at full
/// precision.
pub fn pose_from_wire(pose: &wire::Pose) -> IconResult<Pose3> {
    let quaternion = quaternion_from_wire(&pose.orientation);
    let squared_norm = quaternion.norm_squared();
    if !almost_equals(squared_norm, 1.0, STD_ERROR) {
        let normalized = quaternion.normalize();
        return Err(IconError::invalid_argument(format!(
            "Failed to create pose from wire form which contains a non-unit quaternion \
             with norm(quat) == {:.17} . The normalized quaternion would be \
             {:.17}, {:.17}, {:.17}, {:.17}",
            squared_norm.sqrt(),
            normalized.imag().x,
            normalized.imag().y,
            normalized.imag().z,
            normalized.scalar(),
        )));
    }
    Ok(Pose3::new(
        Rotation::from_quaternion_unchecked(quaternion),
        vector_from_wire(&pose.position),
    ))
}

/// Lenient deserialization: accepts squared norms within `1 +/- 1e-3` and
/// renormalizes. Inputs that are already normalized are passed through
/// bit-true, so `from_wire_normalized(to_wire(pose))` returns the same
/// pose.
pub fn pose_from_wire_normalized(pose: &wire::Pose) -> IconResult<Pose3> {
    let quaternion = quaternion_from_wire(&pose.orientation);
    let squared_norm = quaternion.norm_squared();
    if almost_equals(squared_norm, 1.0, STD_ERROR) {
        return Ok(Pose3::new(
            Rotation::from_quaternion_unchecked(quaternion),
            vector_from_wire(&pose.position),
        ));
    }
    if !almost_equals(squared_norm, 1.0, NORMALIZATION_ERROR) {
        let normalized = quaternion.normalize();
        return Err(IconError::invalid_argument(format!(
            "Failed to create pose from wire form which contains a non-unit quaternion \
             with norm(quat) == {:.6} . The normalized quaternion would be \
             {:.4}, {:.4}, {:.4}, {:.4}",
            squared_norm.sqrt(),
            normalized.imag().x,
            normalized.imag().y,
            normalized.imag().z,
            normalized.scalar(),
        )));
    }
    Ok(Pose3::new(
        Rotation::from_quaternion_unchecked(quaternion.normalize()),
        vector_from_wire(&pose.position),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pose() -> Pose3 {
        Pose3::new(
            Rotation::from_rpy(0.2, -0.4, 1.1),
            Vector3::new(0.5, -1.0, 2.0),
        )
    }

    #[test]
    fn pose_wire_roundtrip_is_bit_true() {
        let pose = test_pose();
        let back = pose_from_wire(&pose_to_wire(&pose)).unwrap();
        assert_eq!(back.rotation().quaternion(), pose.rotation().quaternion());
        assert_eq!(back.translation(), pose.translation());

        let back = pose_from_wire_normalized(&pose_to_wire(&pose)).unwrap();
        assert_eq!(back.rotation().quaternion(), pose.rotation().quaternion());
    }

    #[test]
    fn strict_rejects_slightly_denormalized() {
        let mut wire_pose = pose_to_wire(&test_pose());
        wire_pose.orientation.w *= 1.0002;
        let err = pose_from_wire(&wire_pose).unwrap_err();
        assert!(err.to_string().contains("non-unit quaternion"));
    }

    #[test]
    fn lenient_accepts_and_renormalizes_small_drift() {
        let pose = test_pose();
        let mut wire_pose = pose_to_wire(&pose);
        let scale = 1.0 + 2e-4;
        wire_pose.orientation.w *= scale;
        wire_pose.orientation.x *= scale;
        wire_pose.orientation.y *= scale;
        wire_pose.orientation.z *= scale;

        let back = pose_from_wire_normalized(&wire_pose).unwrap();
        assert!(crate::rotation::is_normalized_quaternion(
            back.rotation().quaternion()
        ));
        assert!(back.is_approx(&pose, 1e-9));
    }

    #[test]
    fn lenient_rejects_large_drift() {
        let mut wire_pose = pose_to_wire(&test_pose());
        wire_pose.orientation.w *= 1.1;
        assert!(pose_from_wire_normalized(&wire_pose).is_err());
    }

    #[test]
    fn matrix_wire_roundtrip() {
        let matrix = Rotation::from_rpy(0.1, 0.2, 0.3).matrix();
        let back = matrix_from_wire(&matrix_to_wire(&matrix));
        assert_eq!(back, matrix);
    }
}
