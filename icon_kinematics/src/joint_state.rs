//! Joint state vectors.

use icon_common::{IconError, IconResult};

use crate::joint_limits::MAX_JOINT_COUNT;

/// Joint position, velocity, acceleration and torque, dynamically sized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointStatePvat {
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub acceleration: Vec<f64>,
    pub torque: Vec<f64>,
}

impl JointStatePvat {
    /// A zeroed state for `size` joints.
    pub fn zero(size: usize) -> Self {
        Self {
            position: vec![0.0; size],
            velocity: vec![0.0; size],
            acceleration: vec![0.0; size],
            torque: vec![0.0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.position.len()
    }

    pub fn is_size_consistent(&self) -> bool {
        let size = self.size();
        self.velocity.len() == size
            && self.acceleration.len() == size
            && self.torque.len() == size
    }
}

/// Size-bounded joint state for realtime code.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundedJointStatePvat {
    pub position: heapless::Vec<f64, MAX_JOINT_COUNT>,
    pub velocity: heapless::Vec<f64, MAX_JOINT_COUNT>,
    pub acceleration: heapless::Vec<f64, MAX_JOINT_COUNT>,
    pub torque: heapless::Vec<f64, MAX_JOINT_COUNT>,
}

impl BoundedJointStatePvat {
    pub fn size(&self) -> usize {
        self.position.len()
    }
}

impl TryFrom<&JointStatePvat> for BoundedJointStatePvat {
    type Error = IconError;

    fn try_from(state: &JointStatePvat) -> IconResult<Self> {
        if state.size() > MAX_JOINT_COUNT {
            return Err(IconError::invalid_argument(format!(
                "Cannot construct bounded joint state, max size exceeded. Got state of \
                 size {}, but max size is {}.",
                state.size(),
                MAX_JOINT_COUNT
            )));
        }
        fn bounded(values: &[f64]) -> heapless::Vec<f64, MAX_JOINT_COUNT> {
            heapless::Vec::from_slice(values).unwrap_or_default()
        }
        Ok(Self {
            position: bounded(&state.position),
            velocity: bounded(&state.velocity),
            acceleration: bounded(&state.acceleration),
            torque: bounded(&state.torque),
        })
    }
}

impl From<&BoundedJointStatePvat> for JointStatePvat {
    fn from(state: &BoundedJointStatePvat) -> Self {
        Self {
            position: state.position.to_vec(),
            velocity: state.velocity.to_vec(),
            acceleration: state.acceleration.to_vec(),
            torque: state.torque.to_vec(),
        }
    }
}
