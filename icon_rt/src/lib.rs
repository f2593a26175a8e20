//! Realtime-safe status types.
//!
//! Code that runs on the realtime control thread must not allocate. This
//! crate provides [`RtStatus`], a fixed-capacity error value (a status code
//! plus a bounded message string), and [`RtResult`], the realtime variant of
//! a result-or-error. Non-realtime code converts these into the regular
//! error type at the realtime boundary.

pub mod status;

pub use status::{MAX_RT_MESSAGE_LEN, RtErrorCode, RtResult, RtStatus};
