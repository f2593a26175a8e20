//! Wire forms of kinematic limit and payload types.

use serde::{Deserialize, Serialize};

use crate::math::{Matrix3x3, Point, Pose};

/// Joint limits. An absent non-position vector means the corresponding
/// limit is unlimited; infinities are never serialized directly. All
/// present vectors must have equal length.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointLimits {
    pub min_position: Vec<f64>,
    pub max_position: Vec<f64>,
    pub max_velocity: Option<Vec<f64>>,
    pub max_acceleration: Option<Vec<f64>>,
    pub max_jerk: Option<Vec<f64>>,
    pub max_torque: Option<Vec<f64>>,
}

/// Cartesian-space limits. Translational limits are per-axis, rotational
/// limits are scalar magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianLimits {
    pub min_translational_position: Point,
    pub max_translational_position: Point,
    pub min_translational_velocity: Point,
    pub max_translational_velocity: Point,
    pub min_translational_acceleration: Point,
    pub max_translational_acceleration: Point,
    pub min_translational_jerk: Point,
    pub max_translational_jerk: Point,
    pub max_rotational_velocity: f64,
    pub max_rotational_acceleration: f64,
    pub max_rotational_jerk: f64,
}

/// Dynamic payload attached to a robot flange. Missing fields default to a
/// zero mass, identity transform and zero inertia.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotPayload {
    pub mass_kg: f64,
    pub tip_t_cog: Option<Pose>,
    pub inertia: Option<Matrix3x3>,
}
