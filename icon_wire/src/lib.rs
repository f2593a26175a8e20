//! On-wire message types for the ICON control service.
//!
//! These are the serde-serializable forms of every request and response the
//! client exchanges with the server: the unary control surface, the duplex
//! session stream, the one-way reaction watcher stream and the streaming
//! input writer. Native types (conditions, poses, limits) convert to and
//! from these; the conversions validate the invariants that the wire form
//! cannot express on its own.

pub mod any;
pub mod condition;
pub mod kinematics;
pub mod math;
pub mod service;
pub mod session;
pub mod status;

pub use any::AnyMessage;
pub use status::{RpcCode, RpcStatus};
