//! Transport seams.
//!
//! The runtime is written against these traits rather than a concrete RPC
//! library: a [`Channel`] hands out the [`IconApi`] stub and a
//! [`CallContextFactory`], and the streaming traits carry the blocking
//! semantics the session logic relies on (`write`/`read` report liveness,
//! `finish` yields the final call status). A production backend wraps its
//! transport in these traits; tests use the in-memory fake from
//! [`crate::testing`].

use std::sync::Arc;
use std::time::Duration;

use icon_common::IconResult;
use icon_wire::service;
use icon_wire::session as wire_session;

/// Per-call settings: an optional deadline and client metadata attached to
/// the request.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Deadline for the call, measured from the moment it starts.
    pub deadline: Option<Duration>,
    /// Metadata key/value pairs propagated with the call.
    pub metadata: Vec<(String, String)>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Produces a fresh [`CallContext`] before each call. This is the hook for
/// propagating connection-wide metadata and default deadlines.
pub type CallContextFactory = Arc<dyn Fn() -> CallContext + Send + Sync>;

/// A factory producing default-constructed contexts.
pub fn default_call_context_factory() -> CallContextFactory {
    Arc::new(CallContext::new)
}

/// The duplex action stream of one session.
///
/// `write` and `read` return `false`/`None` when the call is dead; the
/// final status is then available from `finish`. Not thread-safe; callers
/// serialize access.
pub trait SessionStream: Send {
    fn write(&mut self, request: &wire_session::OpenSessionRequest) -> bool;
    /// Half-closes the write side. Must be called at most once.
    fn writes_done(&mut self) -> bool;
    fn read(&mut self) -> Option<wire_session::OpenSessionResponse>;
    /// Ends the call and returns its final status. Must be called after
    /// the read side is drained.
    fn finish(&mut self) -> IconResult<()>;
}

/// The one-way reaction watcher stream of one session.
pub trait WatcherStream: Send {
    fn read(&mut self) -> Option<wire_session::WatchReactionsResponse>;
    fn finish(&mut self) -> IconResult<()>;
}

/// The duplex stream behind a streaming input writer.
pub trait WriteStream: Send {
    fn write(&mut self, request: &wire_session::OpenWriteStreamRequest) -> bool;
    fn writes_done(&mut self) -> bool;
    fn read(&mut self) -> Option<wire_session::OpenWriteStreamResponse>;
    fn finish(&mut self) -> IconResult<()>;
}

/// Server-streaming planned-trajectory response.
pub trait TrajectoryStream: Send {
    fn read(&mut self) -> Option<service::GetPlannedTrajectoryResponse>;
    fn finish(&mut self) -> IconResult<()>;
}

/// The control service stub: one blocking method per RPC.
pub trait IconApi: Send + Sync {
    // Unary control surface.
    fn enable(&self, context: &CallContext) -> IconResult<()>;
    fn disable(&self, context: &CallContext) -> IconResult<()>;
    fn clear_faults(&self, context: &CallContext) -> IconResult<()>;
    fn get_operational_status(&self, context: &CallContext)
    -> IconResult<service::OperationalStatus>;
    fn get_config(&self, context: &CallContext) -> IconResult<service::GetConfigResponse>;
    fn get_status(&self, context: &CallContext) -> IconResult<service::GetStatusResponse>;
    /// Best effort; the transport is expected to drop during the restart.
    fn restart_server(&self, context: &CallContext) -> IconResult<()>;
    fn list_parts(&self, context: &CallContext) -> IconResult<Vec<String>>;
    fn list_compatible_parts(
        &self,
        context: &CallContext,
        action_type_names: &[String],
    ) -> IconResult<Vec<String>>;
    fn list_action_signatures(
        &self,
        context: &CallContext,
    ) -> IconResult<Vec<service::ActionSignature>>;
    /// Returns `None` when the action type is unknown.
    fn get_action_signature_by_name(
        &self,
        context: &CallContext,
        action_type_name: &str,
    ) -> IconResult<Option<service::ActionSignature>>;
    fn is_action_compatible(
        &self,
        context: &CallContext,
        request: &service::IsActionCompatibleRequest,
    ) -> IconResult<bool>;
    fn get_speed_override(&self, context: &CallContext) -> IconResult<f64>;
    fn set_speed_override(&self, context: &CallContext, override_factor: f64) -> IconResult<()>;
    fn get_part_properties(
        &self,
        context: &CallContext,
    ) -> IconResult<service::GetPartPropertiesResponse>;
    fn set_part_properties(
        &self,
        context: &CallContext,
        request: &service::SetPartPropertiesRequest,
    ) -> IconResult<()>;
    fn get_latest_streaming_output(
        &self,
        context: &CallContext,
        request: &service::GetLatestStreamingOutputRequest,
    ) -> IconResult<service::StreamingOutput>;

    // Streaming surfaces.
    fn open_session(&self, context: &CallContext) -> IconResult<Box<dyn SessionStream>>;
    fn watch_reactions(
        &self,
        context: &CallContext,
        request: &wire_session::WatchReactionsRequest,
    ) -> IconResult<Box<dyn WatcherStream>>;
    fn open_write_stream(&self, context: &CallContext) -> IconResult<Box<dyn WriteStream>>;
    fn get_planned_trajectory(
        &self,
        context: &CallContext,
        request: &service::GetPlannedTrajectoryRequest,
    ) -> IconResult<Box<dyn TrajectoryStream>>;
}

/// A connection to one control server. Owns the transport and hands out
/// the stub and the per-call context factory.
pub trait Channel: Send + Sync {
    fn api(&self) -> Arc<dyn IconApi>;
    fn call_context_factory(&self) -> CallContextFactory;
}
