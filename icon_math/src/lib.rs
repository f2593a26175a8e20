//! Rigid-body math primitives.
//!
//! - [`rotation`] - SO(3) as a unit quaternion, RPY and angle-axis
//!   conversions
//! - [`pose`] - SE(3) rigid transforms
//! - [`wrench`] - Wrenches and the wrench frame transform
//! - [`conversions`] - Wire-form conversions with strict and lenient
//!   quaternion normalization policies

pub mod conversions;
pub mod pose;
pub mod rotation;
pub mod wrench;

pub use pose::Pose3;
pub use rotation::Rotation;
pub use wrench::{Wrench, transform_wrench};
