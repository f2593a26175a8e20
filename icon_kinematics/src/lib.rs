//! Kinematic limit bookkeeping: joint limits, Cartesian limits, joint
//! state vectors and the robot payload.
//!
//! Joint limits and joint state exist in two flavors: a dynamically sized
//! one for configuration and RPC handling, and a size-bounded one (capacity
//! [`MAX_JOINT_COUNT`]) for realtime code, which must not allocate.

pub mod cartesian_limits;
pub mod joint_limits;
pub mod joint_state;
pub mod payload;

pub use cartesian_limits::CartesianLimits;
pub use joint_limits::{BoundedJointLimits, JointLimits, MAX_JOINT_COUNT};
pub use joint_state::{BoundedJointStatePvat, JointStatePvat};
pub use payload::Payload;
