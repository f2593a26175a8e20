//! Names of built-in action types and state variables.

/// Action type name of the built-in stop action. The server falls back to
/// this when an active action is removed or stopped.
pub const STOP_ACTION: &str = "xfa.stop";

/// Slot name of the stop action's single part slot.
pub const STOP_PART_SLOT: &str = "position_part";

/// State variable that tells whether an action has completed. All actions
/// expose this; the semantics are action-specific and actions are allowed
/// to never be done. Boolean.
pub const IS_DONE: &str = "xfa.is_done";

/// State variable that tells whether an action has brought the robot to a
/// stop. Stop actions must expose this. Boolean.
pub const IS_STOPPED: &str = "xfa.is_stopped";

/// State variable reporting the seconds since an action became active.
/// Exposed automatically by all actions. Double.
pub const ACTION_ELAPSED_TIME: &str = "xfa.action_elapsed_time";

/// Default gravity constant, in m/s^2.
pub const DEFAULT_GRAVITY: f64 = 9.81;
