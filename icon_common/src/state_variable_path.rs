//! State-variable path builder.
//!
//! Reactions reference robot state by rooted dotted paths of the form
//! `@<part_name>.<part_type>.<field>[index]`. This module holds the node
//! name constants, the generic path builder and typed helpers for every
//! addressable field of the standard part types.

use crate::error::{IconError, IconResult};

/// Maximum length of a single path node name, in bytes.
pub const MAX_NODE_NAME_LENGTH: usize = 40;
/// Prefix identifying a state variable path.
pub const PATH_PREFIX: &str = "@";
/// Separator between path nodes.
pub const PATH_SEPARATOR: &str = ".";

// Node names for part identification.
pub const ARM_TYPE_NODE: &str = "ArmPart";
pub const FT_TYPE_NODE: &str = "ForceTorqueSensorPart";
pub const ADIO_TYPE_NODE: &str = "ADIOPart";
pub const GRIPPER_TYPE_NODE: &str = "GripperPart";
pub const RANGEFINDER_TYPE_NODE: &str = "RangefinderPart";

// Additional top-level nodes that are not parts.
pub const SAFETY_TYPE_NODE: &str = "Safety";

// Arm fields.
pub const SENSED_POSITION_NODE: &str = "sensed_position";
pub const SENSED_VELOCITY_NODE: &str = "sensed_velocity";
pub const SENSED_ACCELERATION_NODE: &str = "sensed_acceleration";
pub const SENSED_TORQUE_NODE: &str = "sensed_torque";
pub const BASE_TWIST_TIP_SENSED_NODE: &str = "base_twist_tip_sensed";
pub const BASE_LINEAR_VELOCITY_TIP_SENSED_NODE: &str = "base_linear_velocity_tip_sensed";
pub const BASE_ANGULAR_VELOCITY_TIP_SENSED_NODE: &str = "base_angular_velocity_tip_sensed";
pub const CURRENT_CONTROL_MODE_NODE: &str = "current_control_mode";

// Force-torque sensor fields.
pub const WRENCH_AT_TIP_NODE: &str = "wrench_at_tip";
pub const FORCE_MAGNITUDE_AT_TIP_NODE: &str = "force_magnitude_at_tip";
pub const TORQUE_MAGNITUDE_AT_TIP_NODE: &str = "torque_magnitude_at_tip";

// Gripper fields.
pub const GRIPPER_SENSED_STATE_NODE: &str = "sensed_state";
pub const GRIPPER_OPENING_WIDTH_NODE: &str = "opening_width";

// ADIO fields.
pub const DIGITAL_INPUT_NODE: &str = "di";
pub const DIGITAL_OUTPUT_NODE: &str = "do";
pub const ANALOG_INPUT_NODE: &str = "ai";

// Rangefinder fields.
pub const RANGEFINDER_DISTANCE_NODE: &str = "distance";

// Safety fields.
pub const ENABLE_BUTTON_STATUS_NODE: &str = "enable_button_status";

/// Axis of a twist (linear x/y/z, then angular rx/ry/rz).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum TwistDimension {
    X = 0,
    Y = 1,
    Z = 2,
    Rx = 3,
    Ry = 4,
    Rz = 5,
}

/// Axis of a wrench (force x/y/z, then torque rx/ry/rz).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum WrenchDimension {
    X = 0,
    Y = 1,
    Z = 2,
    Rx = 3,
    Ry = 4,
    Rz = 5,
}

/// One node of a state variable path: a name plus an optional array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNode {
    pub name: String,
    pub index: Option<usize>,
}

impl PathNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}

/// Builds a state variable path by prepending [`PATH_PREFIX`] and joining
/// the nodes with [`PATH_SEPARATOR`].
///
/// Node names must be non-empty and at most [`MAX_NODE_NAME_LENGTH`] bytes.
pub fn build_state_variable_path(nodes: &[PathNode]) -> IconResult<String> {
    let mut node_strings = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.name.is_empty() {
            return Err(IconError::invalid_argument(
                "State variable path node name must not be empty",
            ));
        }
        if node.name.len() > MAX_NODE_NAME_LENGTH {
            return Err(IconError::invalid_argument(format!(
                "State variable path node \"{}\" exceeds the maximum length of {} characters",
                node.name, MAX_NODE_NAME_LENGTH
            )));
        }
        match node.index {
            Some(index) => node_strings.push(format!("{}[{}]", node.name, index)),
            None => node_strings.push(node.name.clone()),
        }
    }
    Ok(format!("{}{}", PATH_PREFIX, node_strings.join(PATH_SEPARATOR)))
}

fn indexed_arm_path(part_name: &str, field: &str, index: usize) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(ARM_TYPE_NODE),
        PathNode::indexed(field, index),
    ])
}

/// Path of a single sensed joint position. Double.
pub fn arm_sensed_position_path(part_name: &str, joint_index: usize) -> IconResult<String> {
    indexed_arm_path(part_name, SENSED_POSITION_NODE, joint_index)
}

/// Path of a single sensed joint velocity. Double.
pub fn arm_sensed_velocity_path(part_name: &str, joint_index: usize) -> IconResult<String> {
    indexed_arm_path(part_name, SENSED_VELOCITY_NODE, joint_index)
}

/// Path of a single sensed joint acceleration. Double.
pub fn arm_sensed_acceleration_path(part_name: &str, joint_index: usize) -> IconResult<String> {
    indexed_arm_path(part_name, SENSED_ACCELERATION_NODE, joint_index)
}

/// Path of a single sensed joint torque. Double.
pub fn arm_sensed_torque_path(part_name: &str, joint_index: usize) -> IconResult<String> {
    indexed_arm_path(part_name, SENSED_TORQUE_NODE, joint_index)
}

/// Path of one entry of the sensed tip twist in the robot base frame.
/// Double.
pub fn arm_base_twist_tip_sensed_path(
    part_name: &str,
    dimension: TwistDimension,
) -> IconResult<String> {
    indexed_arm_path(part_name, BASE_TWIST_TIP_SENSED_NODE, dimension as usize)
}

/// Path of the Cartesian linear velocity magnitude of the arm tip in the
/// robot base frame. Double.
pub fn arm_base_linear_velocity_tip_sensed_path(part_name: &str) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(ARM_TYPE_NODE),
        PathNode::named(BASE_LINEAR_VELOCITY_TIP_SENSED_NODE),
    ])
}

/// Path of the Cartesian angular velocity magnitude of the arm tip in the
/// robot base frame. Double.
pub fn arm_base_angular_velocity_tip_sensed_path(part_name: &str) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(ARM_TYPE_NODE),
        PathNode::named(BASE_ANGULAR_VELOCITY_TIP_SENSED_NODE),
    ])
}

/// Path of the currently used control mode. Int64.
pub fn arm_current_control_mode_path(part_name: &str) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(ARM_TYPE_NODE),
        PathNode::named(CURRENT_CONTROL_MODE_NODE),
    ])
}

/// Path of a single value of the wrench at the arm tip. Double.
pub fn ft_wrench_at_tip_path(part_name: &str, dimension: WrenchDimension) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(FT_TYPE_NODE),
        PathNode::indexed(WRENCH_AT_TIP_NODE, dimension as usize),
    ])
}

/// Path of the force magnitude sensed at the force torque sensor, in the
/// arm tip frame. Double.
pub fn ft_force_magnitude_at_tip_path(part_name: &str) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(FT_TYPE_NODE),
        PathNode::named(FORCE_MAGNITUDE_AT_TIP_NODE),
    ])
}

/// Path of the torque magnitude sensed at the force torque sensor, in the
/// arm tip frame. Double.
pub fn ft_torque_magnitude_at_tip_path(part_name: &str) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(FT_TYPE_NODE),
        PathNode::named(TORQUE_MAGNITUDE_AT_TIP_NODE),
    ])
}

/// Path of the sensed gripper state. Int64.
pub fn gripper_sensed_state_path(part_name: &str) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(GRIPPER_TYPE_NODE),
        PathNode::named(GRIPPER_SENSED_STATE_NODE),
    ])
}

/// Path of the gripper opening width. Double.
pub fn gripper_opening_width_path(part_name: &str) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(GRIPPER_TYPE_NODE),
        PathNode::named(GRIPPER_OPENING_WIDTH_NODE),
    ])
}

/// Path of a digital input signal in `block_name`. Bool.
pub fn adio_digital_input_path(
    part_name: &str,
    block_name: &str,
    signal_index: usize,
) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(ADIO_TYPE_NODE),
        PathNode::named(DIGITAL_INPUT_NODE),
        PathNode::indexed(block_name, signal_index),
    ])
}

/// Path of a digital output signal in `block_name`. Bool.
pub fn adio_digital_output_path(
    part_name: &str,
    block_name: &str,
    signal_index: usize,
) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(ADIO_TYPE_NODE),
        PathNode::named(DIGITAL_OUTPUT_NODE),
        PathNode::indexed(block_name, signal_index),
    ])
}

/// Path of an analog input signal in `block_name`. Double.
pub fn adio_analog_input_path(
    part_name: &str,
    block_name: &str,
    signal_index: usize,
) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(ADIO_TYPE_NODE),
        PathNode::named(ANALOG_INPUT_NODE),
        PathNode::indexed(block_name, signal_index),
    ])
}

/// Path of the sensed rangefinder distance. Double.
pub fn rangefinder_distance_path(part_name: &str) -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(part_name),
        PathNode::named(RANGEFINDER_TYPE_NODE),
        PathNode::named(RANGEFINDER_DISTANCE_NODE),
    ])
}

/// Path of the enable safety button status. Int64.
pub fn safety_enable_button_status_path() -> IconResult<String> {
    build_state_variable_path(&[
        PathNode::named(SAFETY_TYPE_NODE),
        PathNode::named(ENABLE_BUTTON_STATUS_NODE),
    ])
}
