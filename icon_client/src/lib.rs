//! Client session runtime for the ICON real-time control service.
//!
//! The entry points are [`Client`] for the unary control surface and
//! [`Session`] for reactive control: a session allocates parts, owns a
//! duplex action stream plus a one-way reaction watcher stream, and runs
//! user callbacks when reactions fire on the server's control loop.
//!
//! - [`transport`] - Channel, stub and stream seams the runtime is generic
//!   over
//! - [`client`] - Unary control surface
//! - [`condition`] - Strongly-typed predicate language over state variables
//! - [`descriptors`] - Action and reaction builders
//! - [`session`] - Session lifecycle, mutations and the watcher loop
//! - [`stream`] - Typed streaming input writer
//! - [`testing`] - In-memory fake channel for tests

pub mod client;
pub mod condition;
pub mod descriptors;
pub mod session;
pub mod stream;
pub mod testing;
pub mod transport;

pub use client::{Client, OperationalStatus, RobotConfig};
pub use condition::{
    Comparison, ComparisonOp, ComparisonValue, Condition, ConjunctionCondition, ConjunctionOp,
    NegatedCondition,
};
pub use descriptors::{Action, ActionDescriptor, ReactionDescriptor, SlotBinding};
pub use session::{Session, SessionOptions, WatcherLoopQuitter};
pub use stream::StreamWriter;
pub use transport::{CallContext, CallContextFactory, Channel, IconApi};
