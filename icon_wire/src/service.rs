//! Messages of the unary control surface.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::any::AnyMessage;
use crate::math::{Timestamp, WireDuration};

/// Operational state of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum OperationalState {
    Unspecified = 0,
    Disabled = 1,
    Enabled = 2,
    Faulted = 3,
}

/// Operational status, including the fault reason when faulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalStatus {
    pub state: OperationalState,
    pub fault_reason: String,
}

bitflags! {
    /// Feature interfaces a part implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FeatureInterfaces: u32 {
        const JOINT_POSITION        = 0x0001;
        const JOINT_VELOCITY        = 0x0002;
        const JOINT_TORQUE          = 0x0004;
        const JOINT_LIMITS          = 0x0008;
        const CARTESIAN_POSITION    = 0x0010;
        const FORCE_TORQUE_SENSOR   = 0x0020;
        const GRIPPER               = 0x0040;
        const ADIO                  = 0x0080;
        const RANGEFINDER           = 0x0100;
        const MANIPULATOR_KINEMATICS = 0x0200;
        const PAYLOAD               = 0x0400;
    }
}

/// Configuration of one part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartConfig {
    pub name: String,
    pub feature_interfaces: FeatureInterfaces,
    pub config: Option<AnyMessage>,
}

/// Server configuration bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetConfigResponse {
    /// Control loop frequency in Hz.
    pub control_frequency_hz: f64,
    /// Server display name used in logs and topic names.
    pub server_name: String,
    pub part_configs: Vec<PartConfig>,
}

/// Latest sensed state of one part.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartStatus {
    pub sensed_positions: Vec<f64>,
    pub sensed_velocities: Vec<f64>,
    pub sensed_accelerations: Vec<f64>,
    pub sensed_torques: Vec<f64>,
    pub current_action_instance_id: Option<i64>,
}

/// Sensed state of all parts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetStatusResponse {
    pub part_status: BTreeMap<String, PartStatus>,
}

/// Value type of an action state variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum StateVariableType {
    Unspecified = 0,
    Bool = 1,
    Double = 2,
    Int64 = 3,
}

/// A state variable published by an action type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVariableInfo {
    pub state_variable_name: String,
    pub value_type: StateVariableType,
}

/// A streaming input accepted by an action type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingInputInfo {
    pub input_name: String,
    pub value_message_type: String,
}

/// Signature of an action type known to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSignature {
    pub action_type_name: String,
    pub description: String,
    pub fixed_parameters_message_type: Option<String>,
    pub streaming_input_infos: Vec<StreamingInputInfo>,
    pub state_variable_infos: Vec<StateVariableInfo>,
}

/// Either a concrete part name or a full slot-to-part map for
/// compatibility checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompatibilityTarget {
    PartName(String),
    SlotPartMap(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsActionCompatibleRequest {
    pub action_type_name: String,
    pub target: CompatibilityTarget,
}

/// A part property value. The variant is chosen when the property is first
/// initialized and never changes afterwards; `Unset` only occurs on
/// malformed input and is rejected on conversion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PartPropertyValue {
    #[default]
    Unset,
    BoolValue(bool),
    DoubleValue(f64),
}

/// Property values of one part, keyed by property name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartPropertyValues {
    pub property_values_by_name: BTreeMap<String, PartPropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SetPartPropertiesRequest {
    pub part_properties_by_part_name: BTreeMap<String, PartPropertyValues>,
}

/// Part properties with the wall-clock and control-loop times at which
/// they were captured.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetPartPropertiesResponse {
    pub timestamp_wall: Timestamp,
    pub timestamp_control: WireDuration,
    pub part_properties_by_part_name: BTreeMap<String, PartPropertyValues>,
}

/// Latest streaming output published by an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingOutput {
    pub action_instance_id: i64,
    pub output: AnyMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLatestStreamingOutputRequest {
    pub session_id: i64,
    pub action_id: i64,
}

/// Which second-order limits (accelerations, torques) the server checks
/// when executing a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum DynamicLimitsCheckMode {
    #[default]
    Unspecified = 0,
    CheckJointAcceleration = 1,
    CheckNone = 2,
}

/// One segment of a planned joint trajectory, sampled as position,
/// velocity and acceleration per joint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointTrajectoryPva {
    /// Offsets from trajectory start, in seconds. Same length as the
    /// sample vectors below.
    pub time_since_start: Vec<f64>,
    pub positions: Vec<JointVec>,
    pub velocities: Vec<JointVec>,
    pub accelerations: Vec<JointVec>,
    pub joint_dynamic_limits_check_mode: DynamicLimitsCheckMode,
}

/// One joint-space sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointVec {
    pub joints: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPlannedTrajectoryRequest {
    pub session_id: i64,
    pub action_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPlannedTrajectoryResponse {
    pub planned_trajectory_segment: JointTrajectoryPva,
}
