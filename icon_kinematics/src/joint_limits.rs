//! Joint limits in dynamic and size-bounded form.

use icon_common::{IconError, IconResult};
use icon_wire::kinematics as wire;

/// Maximum joint count supported by the size-bounded types.
pub const MAX_JOINT_COUNT: usize = 25;

/// Joint limits with dynamically allocated size.
///
/// Six equal-length vectors. Realtime control converts this into
/// [`BoundedJointLimits`]; that conversion fails when the limits exceed the
/// supported size.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointLimits {
    pub min_position: Vec<f64>,
    pub max_position: Vec<f64>,
    pub max_velocity: Vec<f64>,
    pub max_acceleration: Vec<f64>,
    pub max_jerk: Vec<f64>,
    pub max_torque: Vec<f64>,
}

impl JointLimits {
    /// Makes limits of `size` joints with each range set to
    /// `(-infinity, infinity)`.
    pub fn unlimited(size: usize) -> Self {
        let mut limits = Self::default();
        limits.set_size(size);
        limits.set_unlimited();
        limits
    }

    /// Number of joints, from the `min_position` vector. Equals the length
    /// of every limit vector when [`is_size_consistent`](Self::is_size_consistent)
    /// holds.
    pub fn size(&self) -> usize {
        self.min_position.len()
    }

    /// True if all limit vectors have the same length.
    pub fn is_size_consistent(&self) -> bool {
        let size = self.size();
        self.max_position.len() == size
            && self.max_velocity.len() == size
            && self.max_acceleration.len() == size
            && self.max_jerk.len() == size
            && self.max_torque.len() == size
    }

    /// Resizes all limit vectors to `size`, clearing all values to 0.
    pub fn set_size(&mut self, size: usize) {
        self.min_position = vec![0.0; size];
        self.max_position = vec![0.0; size];
        self.max_velocity = vec![0.0; size];
        self.max_acceleration = vec![0.0; size];
        self.max_jerk = vec![0.0; size];
        self.max_torque = vec![0.0; size];
    }

    /// Sets each limit range to `(-infinity, infinity)`.
    pub fn set_unlimited(&mut self) {
        self.min_position.fill(f64::NEG_INFINITY);
        self.max_position.fill(f64::INFINITY);
        self.max_velocity.fill(f64::INFINITY);
        self.max_acceleration.fill(f64::INFINITY);
        self.max_jerk.fill(f64::INFINITY);
        self.max_torque.fill(f64::INFINITY);
    }

    /// True if sizes are consistent, `min <= max` holds per joint, and all
    /// non-position limits are non-negative.
    pub fn is_valid(&self) -> bool {
        if !self.is_size_consistent() {
            return false;
        }
        if self.size() == 0 {
            return true;
        }
        self.min_position
            .iter()
            .zip(&self.max_position)
            .all(|(min, max)| max - min >= 0.0)
            && self.max_velocity.iter().all(|v| *v >= 0.0)
            && self.max_acceleration.iter().all(|v| *v >= 0.0)
            && self.max_jerk.iter().all(|v| *v >= 0.0)
            && self.max_torque.iter().all(|v| *v >= 0.0)
    }
}

/// Joint limits with a compile-time size bound for realtime use.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundedJointLimits {
    pub min_position: heapless::Vec<f64, MAX_JOINT_COUNT>,
    pub max_position: heapless::Vec<f64, MAX_JOINT_COUNT>,
    pub max_velocity: heapless::Vec<f64, MAX_JOINT_COUNT>,
    pub max_acceleration: heapless::Vec<f64, MAX_JOINT_COUNT>,
    pub max_jerk: heapless::Vec<f64, MAX_JOINT_COUNT>,
    pub max_torque: heapless::Vec<f64, MAX_JOINT_COUNT>,
}

impl BoundedJointLimits {
    pub fn size(&self) -> usize {
        self.min_position.len()
    }
}

impl TryFrom<&JointLimits> for BoundedJointLimits {
    type Error = IconError;

    fn try_from(limits: &JointLimits) -> IconResult<Self> {
        if limits.size() > MAX_JOINT_COUNT {
            return Err(IconError::invalid_argument(format!(
                "Cannot construct bounded joint limits, max size exceeded. Got limits of \
                 size {}, but max size is {}.",
                limits.size(),
                MAX_JOINT_COUNT
            )));
        }
        fn bounded(values: &[f64]) -> heapless::Vec<f64, MAX_JOINT_COUNT> {
            heapless::Vec::from_slice(values).unwrap_or_default()
        }
        Ok(Self {
            min_position: bounded(&limits.min_position),
            max_position: bounded(&limits.max_position),
            max_velocity: bounded(&limits.max_velocity),
            max_acceleration: bounded(&limits.max_acceleration),
            max_jerk: bounded(&limits.max_jerk),
            max_torque: bounded(&limits.max_torque),
        })
    }
}

impl From<&BoundedJointLimits> for JointLimits {
    fn from(limits: &BoundedJointLimits) -> Self {
        Self {
            min_position: limits.min_position.to_vec(),
            max_position: limits.max_position.to_vec(),
            max_velocity: limits.max_velocity.to_vec(),
            max_acceleration: limits.max_acceleration.to_vec(),
            max_jerk: limits.max_jerk.to_vec(),
            max_torque: limits.max_torque.to_vec(),
        }
    }
}

fn has_infinite_component(values: &[f64]) -> bool {
    values.iter().any(|v| v.is_infinite())
}

/// Serializes limits to the wire form. Vectors containing infinite
/// components are omitted entirely rather than serializing infinities.
pub fn joint_limits_to_wire(limits: &JointLimits) -> wire::JointLimits {
    let optional = |values: &[f64]| {
        if has_infinite_component(values) {
            None
        } else {
            Some(values.to_vec())
        }
    };
    wire::JointLimits {
        min_position: limits.min_position.clone(),
        max_position: limits.max_position.clone(),
        max_velocity: optional(&limits.max_velocity),
        max_acceleration: optional(&limits.max_acceleration),
        max_jerk: optional(&limits.max_jerk),
        max_torque: optional(&limits.max_torque),
    }
}

/// Deserializes limits from the wire form. Absent vectors become
/// unlimited; all present vectors must have equal length and satisfy the
/// validity invariants.
pub fn joint_limits_from_wire(proto: &wire::JointLimits) -> IconResult<JointLimits> {
    let mut limits = JointLimits::unlimited(proto.min_position.len());
    limits.min_position = proto.min_position.clone();
    limits.max_position = proto.max_position.clone();
    if let Some(values) = &proto.max_velocity {
        limits.max_velocity = values.clone();
    }
    if let Some(values) = &proto.max_acceleration {
        limits.max_acceleration = values.clone();
    }
    if let Some(values) = &proto.max_jerk {
        limits.max_jerk = values.clone();
    }
    if let Some(values) = &proto.max_torque {
        limits.max_torque = values.clone();
    }
    if !limits.is_valid() {
        return Err(IconError::invalid_argument(format!(
            "Joint limits wire form is invalid: {proto:?}"
        )));
    }
    Ok(limits)
}
