//! Cartesian-space limits.

use icon_common::{IconError, IconResult};
use icon_math::conversions::{vector_from_wire, vector_to_wire};
use icon_wire::kinematics as wire;
use nalgebra::Vector3;

/// Cartesian limits for translational position, velocity, acceleration and
/// jerk (per axis), and rotational velocity, acceleration and jerk
/// (scalar magnitudes).
#[derive(Debug, Clone, Copy)]
pub struct CartesianLimits {
    pub min_translational_position: Vector3<f64>,
    pub max_translational_position: Vector3<f64>,
    pub min_translational_velocity: Vector3<f64>,
    pub max_translational_velocity: Vector3<f64>,
    pub min_translational_acceleration: Vector3<f64>,
    pub max_translational_acceleration: Vector3<f64>,
    pub min_translational_jerk: Vector3<f64>,
    pub max_translational_jerk: Vector3<f64>,
    pub max_rotational_velocity: f64,
    pub max_rotational_acceleration: f64,
    pub max_rotational_jerk: f64,
}

impl CartesianLimits {
    /// Limits with every range set to `(-infinity, infinity)`.
    pub fn unlimited() -> Self {
        let neg = Vector3::repeat(f64::NEG_INFINITY);
        let pos = Vector3::repeat(f64::INFINITY);
        Self {
            min_translational_position: neg,
            max_translational_position: pos,
            min_translational_velocity: neg,
            max_translational_velocity: pos,
            min_translational_acceleration: neg,
            max_translational_acceleration: pos,
            min_translational_jerk: neg,
            max_translational_jerk: pos,
            max_rotational_velocity: f64::INFINITY,
            max_rotational_acceleration: f64::INFINITY,
            max_rotational_jerk: f64::INFINITY,
        }
    }

    /// Symmetric limits from per-quantity magnitudes.
    pub fn simple(
        max_translational_position: f64,
        max_translational_velocity: f64,
        max_translational_acceleration: f64,
        max_translational_jerk: f64,
        max_rotational_velocity: f64,
        max_rotational_acceleration: f64,
        max_rotational_jerk: f64,
    ) -> Self {
        Self {
            min_translational_position: Vector3::repeat(-max_translational_position),
            max_translational_position: Vector3::repeat(max_translational_position),
            min_translational_velocity: Vector3::repeat(-max_translational_velocity),
            max_translational_velocity: Vector3::repeat(max_translational_velocity),
            min_translational_acceleration: Vector3::repeat(-max_translational_acceleration),
            max_translational_acceleration: Vector3::repeat(max_translational_acceleration),
            min_translational_jerk: Vector3::repeat(-max_translational_jerk),
            max_translational_jerk: Vector3::repeat(max_translational_jerk),
            max_rotational_velocity,
            max_rotational_acceleration,
            max_rotational_jerk,
        }
    }

    /// True if all limits are valid:
    /// * for all min/max pairs: min <= max;
    /// * for all quantities but position: min <= 0 and max >= 0;
    /// * rotational limits are non-negative.
    ///
    /// Infinities receive no special treatment, so unlimited limits are
    /// valid.
    pub fn is_valid(&self) -> bool {
        let le = |a: &Vector3<f64>, b: &Vector3<f64>| a.iter().zip(b.iter()).all(|(x, y)| x <= y);
        let zero = Vector3::zeros();
        le(
            &self.min_translational_position,
            &self.max_translational_position,
        ) && le(
            &self.min_translational_velocity,
            &self.max_translational_velocity,
        ) && le(
            &self.min_translational_acceleration,
            &self.max_translational_acceleration,
        ) && le(&self.min_translational_jerk, &self.max_translational_jerk)
            && le(&self.min_translational_velocity, &zero)
            && le(&zero, &self.max_translational_velocity)
            && le(&self.min_translational_acceleration, &zero)
            && le(&zero, &self.max_translational_acceleration)
            && le(&self.min_translational_jerk, &zero)
            && le(&zero, &self.max_translational_jerk)
            && self.max_rotational_velocity >= 0.0
            && self.max_rotational_acceleration >= 0.0
            && self.max_rotational_jerk >= 0.0
    }
}

impl Default for CartesianLimits {
    fn default() -> Self {
        Self::unlimited()
    }
}

fn compare_doubles(lhs: f64, rhs: f64) -> bool {
    if lhs.is_nan() && rhs.is_nan() {
        return true;
    }
    lhs == rhs
}

fn compare_vectors(lhs: &Vector3<f64>, rhs: &Vector3<f64>) -> bool {
    lhs.iter().zip(rhs.iter()).all(|(l, r)| compare_doubles(*l, *r))
}

impl PartialEq for CartesianLimits {
    fn eq(&self, other: &Self) -> bool {
        compare_vectors(
            &self.min_translational_position,
            &other.min_translational_position,
        ) && compare_vectors(
            &self.max_translational_position,
            &other.max_translational_position,
        ) && compare_vectors(
            &self.min_translational_velocity,
            &other.min_translational_velocity,
        ) && compare_vectors(
            &self.max_translational_velocity,
            &other.max_translational_velocity,
        ) && compare_vectors(
            &self.min_translational_acceleration,
            &other.min_translational_acceleration,
        ) && compare_vectors(
            &self.max_translational_acceleration,
            &other.max_translational_acceleration,
        ) && compare_vectors(&self.min_translational_jerk, &other.min_translational_jerk)
            && compare_vectors(&self.max_translational_jerk, &other.max_translational_jerk)
            && compare_doubles(self.max_rotational_velocity, other.max_rotational_velocity)
            && compare_doubles(
                self.max_rotational_acceleration,
                other.max_rotational_acceleration,
            )
            && compare_doubles(self.max_rotational_jerk, other.max_rotational_jerk)
    }
}

pub fn cartesian_limits_to_wire(limits: &CartesianLimits) -> wire::CartesianLimits {
    wire::CartesianLimits {
        min_translational_position: vector_to_wire(&limits.min_translational_position),
        max_translational_position: vector_to_wire(&limits.max_translational_position),
        min_translational_velocity: vector_to_wire(&limits.min_translational_velocity),
        max_translational_velocity: vector_to_wire(&limits.max_translational_velocity),
        min_translational_acceleration: vector_to_wire(&limits.min_translational_acceleration),
        max_translational_acceleration: vector_to_wire(&limits.max_translational_acceleration),
        min_translational_jerk: vector_to_wire(&limits.min_translational_jerk),
        max_translational_jerk: vector_to_wire(&limits.max_translational_jerk),
        max_rotational_velocity: limits.max_rotational_velocity,
        max_rotational_acceleration: limits.max_rotational_acceleration,
        max_rotational_jerk: limits.max_rotational_jerk,
    }
}

pub fn cartesian_limits_from_wire(proto: &wire::CartesianLimits) -> IconResult<CartesianLimits> {
    let limits = CartesianLimits {
        min_translational_position: vector_from_wire(&proto.min_translational_position),
        max_translational_position: vector_from_wire(&proto.max_translational_position),
        min_translational_velocity: vector_from_wire(&proto.min_translational_velocity),
        max_translational_velocity: vector_from_wire(&proto.max_translational_velocity),
        min_translational_acceleration: vector_from_wire(&proto.min_translational_acceleration),
        max_translational_acceleration: vector_from_wire(&proto.max_translational_acceleration),
        min_translational_jerk: vector_from_wire(&proto.min_translational_jerk),
        max_translational_jerk: vector_from_wire(&proto.max_translational_jerk),
        max_rotational_velocity: proto.max_rotational_velocity,
        max_rotational_acceleration: proto.max_rotational_acceleration,
        max_rotational_jerk: proto.max_rotational_jerk,
    };
    if !limits.is_valid() {
        return Err(IconError::invalid_argument(format!(
            "Cartesian limits wire form is invalid: {proto:?}"
        )));
    }
    Ok(limits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_is_valid() {
        assert!(CartesianLimits::unlimited().is_valid());
    }

    #[test]
    fn simple_limits_are_valid() {
        let limits = CartesianLimits::simple(1.0, 0.5, 2.0, 10.0, 1.0, 5.0, 20.0);
        assert!(limits.is_valid());
        assert_eq!(limits.min_translational_velocity, Vector3::repeat(-0.5));
    }

    #[test]
    fn negative_rotational_limit_is_invalid() {
        let mut limits = CartesianLimits::simple(1.0, 0.5, 2.0, 10.0, 1.0, 5.0, 20.0);
        limits.max_rotational_velocity = -0.1;
        assert!(!limits.is_valid());
    }

    #[test]
    fn positive_min_velocity_is_invalid() {
        let mut limits = CartesianLimits::simple(1.0, 0.5, 2.0, 10.0, 1.0, 5.0, 20.0);
        limits.min_translational_velocity = Vector3::repeat(0.1);
        assert!(!limits.is_valid());
    }

    #[test]
    fn equality_treats_infinities() {
        assert_eq!(CartesianLimits::unlimited(), CartesianLimits::unlimited());
        assert_ne!(
            CartesianLimits::unlimited(),
            CartesianLimits::simple(1.0, 0.5, 2.0, 10.0, 1.0, 5.0, 20.0)
        );
    }

    #[test]
    fn wire_roundtrip() {
        let limits = CartesianLimits::simple(1.0, 0.5, 2.0, 10.0, 1.0, 5.0, 20.0);
        let back = cartesian_limits_from_wire(&cartesian_limits_to_wire(&limits)).unwrap();
        assert_eq!(back, limits);
    }

    #[test]
    fn wire_rejects_invalid() {
        let mut proto = cartesian_limits_to_wire(&CartesianLimits::unlimited());
        proto.max_rotational_jerk = -1.0;
        assert!(cartesian_limits_from_wire(&proto).is_err());
    }
}
