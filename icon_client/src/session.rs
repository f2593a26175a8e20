//! Session lifecycle, structural mutations and the watcher loop.
//!
//! A session scopes control of a set of parts. It owns the duplex action
//! stream, the action/reaction graph bookkeeping, and a background reader
//! thread that pumps reaction events from the one-way watcher stream into
//! a bounded queue. All structural mutations are strict single-round-trip
//! exchanges: one request written, one response read, status checked.

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use icon_common::error::check_rpc_status;
use icon_common::{
    ActionInstanceId, IconError, IconResult, ReactionHandle, ReactionId, SequenceNumber, SessionId,
};
use icon_wire::math::Timestamp;
use icon_wire::service;
use icon_wire::session as wire_session;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::descriptors::{Action, ActionDescriptor, ReactionCallback, ReactionDescriptor};
use crate::stream::StreamWriter;
use crate::transport::{CallContextFactory, Channel, IconApi, SessionStream};

const ALREADY_ENDED_MESSAGE: &str = "The Session has already ended.";
const COMMUNICATION_FAILED_MESSAGE: &str = "Communication with server failed.";

/// Capacity of the reaction event queue between the reader thread and the
/// watcher loop.
const REACTION_QUEUE_CAPACITY: usize = 128;

/// Options for establishing a session.
#[derive(Default)]
pub struct SessionOptions {
    /// Logging context attached to the session for server-side
    /// correlation. When absent, server-side logs are tagged with the
    /// session and action ids only.
    pub log_context: Option<wire_session::LogContext>,
    /// Deadline for establishing the session. Overrides the deadline from
    /// the call context factory.
    pub deadline: Option<Duration>,
}

/// One entry in the reaction event queue.
enum WatcherEvent {
    /// A response read from the watcher stream.
    Event(wire_session::WatchReactionsResponse),
    /// The watcher call finished with this error.
    Error(IconError),
    /// The watcher call is over and the reader thread has exited.
    Closed,
    /// Wake-up sentinel written by [`Session::quit_watcher_loop`].
    Quit,
}

/// Quits a running watcher loop from another thread or from inside a
/// reaction callback.
#[derive(Clone)]
pub struct WatcherLoopQuitter {
    quit_flag: Arc<AtomicBool>,
    events_tx: SyncSender<WatcherEvent>,
}

impl WatcherLoopQuitter {
    /// Stops the watcher loop after the current event finishes processing.
    /// Thread-safe and idempotent.
    pub fn quit(&self) {
        self.quit_flag.store(true, Ordering::SeqCst);
        // The sentinel wakes a sleeping consumer; the flag covers the race
        // where the queue closed first.
        if let Err(TrySendError::Full(_)) = self.events_tx.try_send(WatcherEvent::Quit) {
            error!("Failed to quit watcher loop, event queue full.");
        }
    }
}

/// A scoped allocation of parts with an action/reaction graph on the
/// server.
///
/// Structural mutations and the watcher loop take `&mut self`: action
/// stream exchanges are not concurrency-safe and callers must serialize
/// them. [`Session::quit_watcher_loop`] and [`WatcherLoopQuitter`] are the
/// thread-safe exceptions.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("session_ended", &self.session_ended)
            .finish_non_exhaustive()
    }
}

pub struct Session {
    /// Keeps the channel alive for as long as the session exists.
    _channel: Arc<dyn Channel>,
    api: Arc<dyn IconApi>,
    context_factory: CallContextFactory,
    session_id: SessionId,
    session_ended: bool,
    action_stream: Box<dyn SessionStream>,
    reaction_callbacks: HashMap<ReactionId, ReactionCallback>,
    reaction_handles: HashMap<ReactionHandle, (ReactionId, &'static Location<'static>)>,
    reaction_id_sequence: SequenceNumber,
    events_rx: Receiver<WatcherEvent>,
    events_tx: SyncSender<WatcherEvent>,
    quit_flag: Arc<AtomicBool>,
    /// Set once the `Closed` marker has been consumed from the queue.
    watcher_closed: bool,
    /// Only this thread calls `read()` on the watcher stream.
    reader_thread: Option<JoinHandle<()>>,
}

impl Session {
    /// Opens a session for `parts` and starts it.
    ///
    /// This performs the initial-session-data exchange on the action
    /// stream, then opens the watcher stream keyed by the assigned session
    /// id. The watcher stream is opened right away so that no reaction can
    /// be missed; events buffer in the stream until the watcher loop runs.
    pub fn start(
        channel: Arc<dyn Channel>,
        parts: &[&str],
        options: SessionOptions,
    ) -> IconResult<Session> {
        let api = channel.api();
        let context_factory = channel.call_context_factory();

        let mut start_context = (context_factory)();
        if options.deadline.is_some() {
            start_context.deadline = options.deadline;
        }
        let mut action_stream = api.open_session(&start_context)?;
        let session_id =
            initialize_session_or_end_call(action_stream.as_mut(), parts, &options)?;

        let watcher_context = (context_factory)();
        let mut watcher_stream = api.watch_reactions(
            &watcher_context,
            &wire_session::WatchReactionsRequest {
                session_id: session_id.value(),
            },
        )?;
        match watcher_stream.read() {
            None => {
                return Err(match watcher_stream.finish() {
                    Ok(()) => IconError::aborted("Watcher stream closed before becoming ready"),
                    Err(error) => error,
                });
            }
            Some(response) if response.reaction_event.is_some() => {
                return Err(IconError::internal(
                    "Should receive an empty reaction first to indicate that the stream is ready.",
                ));
            }
            Some(_) => {}
        }

        let (events_tx, events_rx) = sync_channel(REACTION_QUEUE_CAPACITY);
        let quit_flag = Arc::new(AtomicBool::new(false));
        let reader_tx = events_tx.clone();
        let reader_thread = std::thread::Builder::new()
            .name("icon-watcher-reader".to_string())
            .spawn(move || watch_reactions_thread_body(watcher_stream, reader_tx))
            .map_err(|e| IconError::internal(format!("Failed to spawn watcher thread: {e}")))?;

        Ok(Session {
            _channel: channel,
            api,
            context_factory,
            session_id,
            session_ended: false,
            action_stream,
            reaction_callbacks: HashMap::new(),
            reaction_handles: HashMap::new(),
            reaction_id_sequence: SequenceNumber::new(),
            events_rx,
            events_tx,
            quit_flag,
            watcher_closed: false,
            reader_thread: Some(reader_thread),
        })
    }

    /// The server-assigned session id.
    pub fn id(&self) -> SessionId {
        self.session_id
    }

    /// Adds a single action; see [`Session::add_actions`].
    pub fn add_action(&mut self, action_descriptor: ActionDescriptor) -> IconResult<Action> {
        let mut actions = self.add_actions(vec![action_descriptor])?;
        Ok(actions.remove(0))
    }

    /// Adds the described actions and their reactions to the session.
    ///
    /// Returns `Aborted` if the session ended during the exchange. Other
    /// errors (unknown action type, reused action id, overlapping parallel
    /// part sets, ...) surface unchanged and leave the session usable.
    /// Reactions may reference action ids introduced later in the same
    /// batch; ids are validated by the server only.
    pub fn add_actions(
        &mut self,
        action_descriptors: Vec<ActionDescriptor>,
    ) -> IconResult<Vec<Action>> {
        if self.session_ended {
            return Err(IconError::failed_precondition(ALREADY_ENDED_MESSAGE));
        }
        self.check_reaction_handles_unique(
            action_descriptors
                .iter()
                .flat_map(|d| d.reaction_descriptors().iter()),
        )?;

        let action_ids: Vec<ActionInstanceId> =
            action_descriptors.iter().map(|d| d.id()).collect();
        let mut action_instances = Vec::with_capacity(action_descriptors.len());
        let mut reactions = Vec::new();
        let mut reaction_data = Vec::new();
        for descriptor in action_descriptors {
            let action_id = descriptor.id();
            let (instance, reaction_descriptors) = descriptor.into_wire_parts();
            action_instances.push(instance);
            for reaction_descriptor in reaction_descriptors {
                let reaction_id = ReactionId::new(self.reaction_id_sequence.next());
                let (reaction, callback, handle) =
                    reaction_descriptor.into_wire_parts(reaction_id, Some(action_id));
                reactions.push(reaction);
                reaction_data.push((reaction_id, callback, handle));
            }
        }

        let request = wire_session::OpenSessionRequest {
            log_context: None,
            data: wire_session::SessionRequestData::AddActionsAndReactions {
                action_instances,
                reactions,
            },
        };
        let response = self.exchange_or_end(&request)?;
        self.end_and_log_on_abort(&response.status)?;

        self.save_reaction_data(reaction_data);
        Ok(action_ids.into_iter().map(Action::new).collect())
    }

    /// Adds a single free-standing reaction; see
    /// [`Session::add_freestanding_reactions`].
    pub fn add_freestanding_reaction(
        &mut self,
        reaction_descriptor: ReactionDescriptor,
    ) -> IconResult<()> {
        self.add_freestanding_reactions(vec![reaction_descriptor])
    }

    /// Adds reactions that are not attached to any action. They stay
    /// active for the lifetime of the session.
    pub fn add_freestanding_reactions(
        &mut self,
        reaction_descriptors: Vec<ReactionDescriptor>,
    ) -> IconResult<()> {
        if self.session_ended {
            return Err(IconError::failed_precondition(ALREADY_ENDED_MESSAGE));
        }
        self.check_reaction_handles_unique(reaction_descriptors.iter())?;

        let mut reactions = Vec::with_capacity(reaction_descriptors.len());
        let mut reaction_data = Vec::new();
        for reaction_descriptor in reaction_descriptors {
            let reaction_id = ReactionId::new(self.reaction_id_sequence.next());
            let (reaction, callback, handle) =
                reaction_descriptor.into_wire_parts(reaction_id, None);
            reactions.push(reaction);
            reaction_data.push((reaction_id, callback, handle));
        }

        let request = wire_session::OpenSessionRequest {
            log_context: None,
            data: wire_session::SessionRequestData::AddActionsAndReactions {
                action_instances: Vec::new(),
                reactions,
            },
        };
        let response = self.exchange_or_end(&request)?;
        self.end_and_log_on_abort(&response.status)?;

        self.save_reaction_data(reaction_data);
        Ok(())
    }

    /// Removes a single action; see [`Session::remove_actions`].
    pub fn remove_action(&mut self, action_id: ActionInstanceId) -> IconResult<()> {
        self.remove_actions(&[action_id])
    }

    /// Removes the given actions along with any reactions that originate
    /// from or switch to them. If a removed action is active, the server
    /// falls back to the default action for its parts. Removed ids are not
    /// recycled.
    pub fn remove_actions(&mut self, action_ids: &[ActionInstanceId]) -> IconResult<()> {
        if self.session_ended {
            return Err(IconError::failed_precondition(ALREADY_ENDED_MESSAGE));
        }
        let request = wire_session::OpenSessionRequest {
            log_context: None,
            data: wire_session::SessionRequestData::RemoveActionAndReactionIds {
                action_instance_ids: action_ids.iter().map(|id| id.value()).collect(),
                reaction_ids: Vec::new(),
            },
        };
        let response = self.exchange_or_end(&request)?;
        self.end_and_log_on_abort(&response.status)
    }

    /// Removes the given free-standing reactions by id.
    pub fn remove_reactions(&mut self, reaction_ids: &[ReactionId]) -> IconResult<()> {
        if self.session_ended {
            return Err(IconError::failed_precondition(ALREADY_ENDED_MESSAGE));
        }
        let request = wire_session::OpenSessionRequest {
            log_context: None,
            data: wire_session::SessionRequestData::RemoveActionAndReactionIds {
                action_instance_ids: Vec::new(),
                reaction_ids: reaction_ids.iter().map(|id| id.value()).collect(),
            },
        };
        let response = self.exchange_or_end(&request)?;
        self.end_and_log_on_abort(&response.status)
    }

    /// Removes all actions and reactions. The server falls back to the
    /// default actions, which normally stop the robot. This invalidates
    /// every [`Action`] and [`ReactionHandle`] obtained from this session.
    pub fn clear_all_actions_and_reactions(&mut self) -> IconResult<()> {
        if self.session_ended {
            return Err(IconError::failed_precondition(ALREADY_ENDED_MESSAGE));
        }
        let request = wire_session::OpenSessionRequest {
            log_context: None,
            data: wire_session::SessionRequestData::ClearAllActionsReactions,
        };
        let response = self.exchange_or_end(&request)?;
        self.end_and_log_on_abort(&response.status)
    }

    /// Starts a single action; see [`Session::start_actions`].
    pub fn start_action(&mut self, action: &Action, stop_active_actions: bool) -> IconResult<()> {
        self.start_actions(&[*action], stop_active_actions)
    }

    /// Starts the given actions. All started actions must use
    /// non-overlapping part sets.
    ///
    /// With `stop_active_actions` every other active action is stopped and
    /// unused parts fall back to their default action. Otherwise only
    /// active actions whose part sets overlap the started ones are
    /// preempted.
    pub fn start_actions(
        &mut self,
        actions: &[Action],
        stop_active_actions: bool,
    ) -> IconResult<()> {
        if self.session_ended {
            return Err(IconError::failed_precondition(ALREADY_ENDED_MESSAGE));
        }
        let request = wire_session::OpenSessionRequest {
            log_context: None,
            data: wire_session::SessionRequestData::StartActionsRequest {
                action_instance_ids: actions.iter().map(|a| a.id().value()).collect(),
                stop_active_actions,
            },
        };
        let response = self.exchange_or_end(&request)?;
        self.end_and_log_on_abort(&response.status)
    }

    /// Stops all active actions; every part falls back to its default
    /// action.
    pub fn stop_all_actions(&mut self) -> IconResult<()> {
        self.start_actions(&[], true)
    }

    /// Runs the watcher callbacks of this session on the calling thread.
    ///
    /// Blocks until [`Session::quit_watcher_loop`] is called, the session
    /// ends, or `deadline` is reached. A deadline in the past still drains
    /// already-queued events before returning `DeadlineExceeded`. Returns
    /// `Aborted` (after ending the session) if the watcher call dies.
    pub fn run_watcher_loop(&mut self, deadline: Instant) -> IconResult<()> {
        self.run_watcher_loop_impl(deadline, None)
    }

    /// Like [`Session::run_watcher_loop`], but additionally returns `Ok`
    /// once the reaction bound to `reaction_handle` has fired (after
    /// running its callback, if any). Returns `NotFound` for unknown
    /// handles. Callbacks installed for the reaction stay installed.
    pub fn run_watcher_loop_until_reaction(
        &mut self,
        reaction_handle: ReactionHandle,
        deadline: Instant,
    ) -> IconResult<()> {
        let Some((reaction_id, _)) = self.reaction_handles.get(&reaction_handle).copied() else {
            return Err(IconError::not_found(format!(
                "There is no reaction with ReactionHandle({})",
                reaction_handle.value()
            )));
        };
        self.run_watcher_loop_impl(deadline, Some(reaction_id))
    }

    /// Stops a running watcher loop after the current event finishes
    /// processing. Thread-safe.
    pub fn quit_watcher_loop(&self) {
        self.watcher_loop_quitter().quit();
    }

    /// A cloneable handle for quitting the watcher loop from reaction
    /// callbacks or other threads.
    pub fn watcher_loop_quitter(&self) -> WatcherLoopQuitter {
        WatcherLoopQuitter {
            quit_flag: self.quit_flag.clone(),
            events_tx: self.events_tx.clone(),
        }
    }

    /// Returns the latest streaming output of the action with `id`.
    /// Blocks up to `deadline` if the action is active but has not
    /// published a value yet.
    pub fn get_latest_output(
        &self,
        id: ActionInstanceId,
        deadline: Duration,
    ) -> IconResult<service::StreamingOutput> {
        let mut context = (self.context_factory)();
        context.deadline = Some(deadline);
        self.api.get_latest_streaming_output(
            &context,
            &service::GetLatestStreamingOutputRequest {
                session_id: self.session_id.value(),
                action_id: id.value(),
            },
        )
    }

    /// Fetches the planned trajectory of the action with `id`,
    /// concatenating the streamed segments.
    pub fn get_planned_trajectory(
        &self,
        id: ActionInstanceId,
    ) -> IconResult<service::JointTrajectoryPva> {
        let context = (self.context_factory)();
        let mut stream = self.api.get_planned_trajectory(
            &context,
            &service::GetPlannedTrajectoryRequest {
                session_id: self.session_id.value(),
                action_id: id.value(),
            },
        )?;
        let mut segments = Vec::new();
        while let Some(response) = stream.read() {
            segments.push(response.planned_trajectory_segment);
        }
        stream.finish()?;
        concatenate_trajectory_segments(segments)
    }

    /// Creates a typed writer for the streaming input `input_name` of
    /// `action`.
    ///
    /// Returns `Aborted` if the session ended. Other errors (mismatched
    /// type, input already in use, ...) come from the server.
    pub fn stream_writer<T: Serialize>(
        &self,
        action: &Action,
        input_name: &str,
    ) -> IconResult<StreamWriter<T>> {
        StreamWriter::open(
            self.api.as_ref(),
            &self.context_factory,
            self.session_id,
            action.id(),
            input_name,
        )
    }

    /// Ends the session and returns the final call status. A second call
    /// returns `FailedPrecondition`.
    pub fn end(&mut self) -> IconResult<()> {
        if self.session_ended {
            return Err(IconError::failed_precondition(ALREADY_ENDED_MESSAGE));
        }
        self.session_ended = true;
        // Stop triggering client callbacks.
        self.quit_watcher_loop();

        self.action_stream.writes_done();
        // The server ends all watcher streams when the action session
        // ends, so the action session is cleaned up first.
        let session_call_status = drain_and_finish(self.action_stream.as_mut());

        self.join_reader_and_drain_queue();
        session_call_status
    }

    fn run_watcher_loop_impl(
        &mut self,
        deadline: Instant,
        stop_on: Option<ReactionId>,
    ) -> IconResult<()> {
        self.quit_flag.store(false, Ordering::SeqCst);
        loop {
            let Some(event) = self.next_event(deadline) else {
                return Err(IconError::deadline_exceeded(
                    "Deadline exceeded in run_watcher_loop()",
                ));
            };
            match event {
                WatcherEvent::Quit => return Ok(()),
                WatcherEvent::Closed => {
                    self.watcher_closed = true;
                    // A quit requested from a reaction callback can race
                    // with queue closure; honor it.
                    if self.quit_flag.load(Ordering::SeqCst) {
                        return Ok(());
                    }
                    let status = self.end();
                    info!(
                        "Session ended unexpectedly while running the watcher loop \
                         with status: {status:?}"
                    );
                    return Err(IconError::aborted(
                        "The call died while reading reactions, the session has been ended.",
                    ));
                }
                WatcherEvent::Error(error) => {
                    let status = self.end();
                    info!(
                        "Session ended unexpectedly while running the watcher loop \
                         with status: {error}\n end() status: {status:?}"
                    );
                    return Err(error);
                }
                WatcherEvent::Event(response) => {
                    let fired = self.trigger_reaction_callbacks(&response);
                    if stop_on.is_some() && fired == stop_on {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Takes the next queued event, waiting until `deadline`. Queued
    /// events are returned even when the deadline is already past.
    fn next_event(&mut self, deadline: Instant) -> Option<WatcherEvent> {
        match self.events_rx.try_recv() {
            Ok(event) => return Some(event),
            Err(_) => {}
        }
        let now = Instant::now();
        let timeout = deadline.checked_duration_since(now)?;
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            // Cannot normally happen while the session holds a sender.
            Err(RecvTimeoutError::Disconnected) => Some(WatcherEvent::Closed),
        }
    }

    /// Runs the callback bound to the event's reaction id, if any.
    /// Unknown ids are ignored. Returns the id of the fired reaction.
    fn trigger_reaction_callbacks(
        &mut self,
        response: &wire_session::WatchReactionsResponse,
    ) -> Option<ReactionId> {
        let event = response.reaction_event.as_ref()?;
        let reaction_id = ReactionId::new(event.reaction_id);
        if let Some(callback) = self.reaction_callbacks.get_mut(&reaction_id) {
            callback();
        }
        Some(reaction_id)
    }

    /// Returns `AlreadyExists` if any handle appears more than once across
    /// `descriptors` and the handles already registered in this session.
    fn check_reaction_handles_unique<'a>(
        &self,
        descriptors: impl Iterator<Item = &'a ReactionDescriptor>,
    ) -> IconResult<()> {
        let mut seen: HashMap<ReactionHandle, &'static Location<'static>> = self
            .reaction_handles
            .iter()
            .map(|(handle, (_, location))| (*handle, *location))
            .collect();
        for descriptor in descriptors {
            let Some((handle, location)) = descriptor.handle() else {
                continue;
            };
            if let Some(first_location) = seen.get(&handle) {
                return Err(IconError::already_exists(format!(
                    "The reaction handle {} already exists. First handle was applied at \
                     {}:{}. Second handle at: {}:{}",
                    handle.value(),
                    first_location.file(),
                    first_location.line(),
                    location.file(),
                    location.line()
                )));
            }
            seen.insert(handle, location);
        }
        Ok(())
    }

    /// Persists callbacks and handle bindings for successfully added
    /// reactions. The monotonic id sequence guarantees unique ids, so a
    /// duplicate insert is a logic bug.
    fn save_reaction_data(
        &mut self,
        reaction_data: Vec<(
            ReactionId,
            Option<ReactionCallback>,
            Option<(ReactionHandle, &'static Location<'static>)>,
        )>,
    ) {
        for (reaction_id, callback, handle) in reaction_data {
            if let Some((handle, location)) = handle {
                let previous = self.reaction_handles.insert(handle, (reaction_id, location));
                debug_assert!(
                    previous.is_none(),
                    "duplicate ReactionHandle survived the uniqueness check"
                );
            }
            if let Some(callback) = callback {
                let previous = self.reaction_callbacks.insert(reaction_id, callback);
                debug_assert!(
                    previous.is_none(),
                    "SequenceNumber generated duplicate ReactionId {reaction_id}"
                );
            }
        }
    }

    /// Performs one request/response exchange. If the call is dead, ends
    /// the session and returns `Aborted`.
    fn exchange_or_end(
        &mut self,
        request: &wire_session::OpenSessionRequest,
    ) -> IconResult<wire_session::OpenSessionResponse> {
        match write_message_and_read_response(self.action_stream.as_mut(), request) {
            Ok(response) => Ok(response),
            Err(error) => {
                error!("Call died while completing message exchange: {error}");
                let session_status = self.end();
                error!("Ended session with status: {session_status:?}");
                Err(IconError::aborted(
                    "The session ended while performing a remote operation.",
                ))
            }
        }
    }

    /// Maps a server status to a result. An `Aborted` status ends the
    /// session as a side effect; any other error leaves it usable.
    fn end_and_log_on_abort(&mut self, status: &icon_wire::RpcStatus) -> IconResult<()> {
        match check_rpc_status(status) {
            Ok(()) => Ok(()),
            Err(error @ IconError::Aborted(_)) => {
                error!("Session ending due to status: {error}");
                if let Err(call_status) = self.end() {
                    error!("Session ended with call status: {call_status}");
                }
                Err(IconError::aborted("Session ended"))
            }
            Err(error) => Err(error),
        }
    }

    /// Waits for the reader thread while draining the event queue (a full
    /// queue must not block the reader from exiting), then joins it and
    /// empties the queue.
    fn join_reader_and_drain_queue(&mut self) {
        let Some(handle) = self.reader_thread.take() else {
            return;
        };
        while !self.watcher_closed {
            match self.events_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(WatcherEvent::Closed) => self.watcher_closed = true,
                Ok(WatcherEvent::Event(response)) => {
                    if response.reaction_event.is_some() {
                        debug!(
                            "Had reaction event in queue after quitting watcher loop: \
                             {response:?}"
                        );
                    }
                }
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => {
                    if handle.is_finished() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        let _ = handle.join();
        while let Ok(event) = self.events_rx.try_recv() {
            if let WatcherEvent::Event(response) = event {
                if response.reaction_event.is_some() {
                    debug!(
                        "Had reaction event in queue after quitting watcher loop: {response:?}"
                    );
                }
            }
        }
        info!("Ended watcher call");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.session_ended {
            return;
        }
        if let Err(status) = self.end() {
            error!("Session ending with status: {status}");
        }
    }
}

/// Body of the watcher reader thread: reads until the call ends, then
/// finishes it. A finish error is enqueued before the closed marker. This
/// thread is the only caller of `read()` on the watcher stream.
fn watch_reactions_thread_body(
    mut watcher_stream: Box<dyn crate::transport::WatcherStream>,
    events_tx: SyncSender<WatcherEvent>,
) {
    // The call normally ends when the session is over; an earlier end is a
    // connection failure or a server bug.
    while let Some(response) = watcher_stream.read() {
        if events_tx.send(WatcherEvent::Event(response)).is_err() {
            return;
        }
    }
    if let Err(error) = watcher_stream.finish() {
        let _ = events_tx.send(WatcherEvent::Error(error));
    }
    let _ = events_tx.send(WatcherEvent::Closed);
}

/// Writes one request and reads one response. An error means the call is
/// dead.
fn write_message_and_read_response(
    stream: &mut dyn SessionStream,
    request: &wire_session::OpenSessionRequest,
) -> IconResult<wire_session::OpenSessionResponse> {
    if !stream.write(request) {
        return Err(IconError::aborted(COMMUNICATION_FAILED_MESSAGE));
    }
    match stream.read() {
        Some(response) => Ok(response),
        None => Err(IconError::aborted(COMMUNICATION_FAILED_MESSAGE)),
    }
}

/// Drains the read side until failure and finishes the call, returning the
/// call status. The server should not have responses in flight at this
/// point; any received are logged to guard against server bugs that would
/// otherwise deadlock the client.
fn drain_and_finish(stream: &mut dyn SessionStream) -> IconResult<()> {
    while let Some(response) = stream.read() {
        error!("Received unexpected response from the server: {response:?}");
    }
    stream.finish()
}

/// Performs the initial-session-data exchange. On any protocol deviation
/// the call is drained and finished, and the first error is returned.
fn initialize_session_or_end_call(
    stream: &mut dyn SessionStream,
    parts: &[&str],
    options: &SessionOptions,
) -> IconResult<SessionId> {
    let deadline = options
        .deadline
        .map(|d| Timestamp::from_system_time(SystemTime::now() + d));
    let request = wire_session::OpenSessionRequest {
        log_context: options.log_context.clone(),
        data: wire_session::SessionRequestData::InitialSessionData(
            wire_session::InitialSessionData {
                allocate_parts: parts.iter().map(|p| p.to_string()).collect(),
                deadline,
            },
        ),
    };

    let response = match write_message_and_read_response(stream, &request) {
        Ok(response) => response,
        Err(error) => {
            drain_and_finish(stream)?;
            return Err(error);
        }
    };

    if let Err(status) = check_rpc_status(&response.status) {
        // No error is expected at this point, so receiving one ends the
        // call.
        stream.writes_done();
        if let Err(cleanup_status) = drain_and_finish(stream) {
            error!("Call finished with status: {cleanup_status}");
        }
        return Err(status);
    }

    let Some(initial_session_data) = response.initial_session_data else {
        stream.writes_done();
        if let Err(cleanup_status) = drain_and_finish(stream) {
            error!("Call finished with status: {cleanup_status}");
        }
        return Err(IconError::internal(
            "Did not receive initial session data from the server",
        ));
    };

    Ok(SessionId::new(initial_session_data.session_id))
}

/// Concatenates streamed trajectory segments in order. All segments must
/// agree on the dynamic limits check mode.
fn concatenate_trajectory_segments(
    segments: Vec<service::JointTrajectoryPva>,
) -> IconResult<service::JointTrajectoryPva> {
    let mut iter = segments.into_iter();
    let Some(mut trajectory) = iter.next() else {
        return Err(IconError::failed_precondition(
            "Vector of trajectory segments is empty.",
        ));
    };
    for segment in iter {
        if segment.joint_dynamic_limits_check_mode != trajectory.joint_dynamic_limits_check_mode {
            return Err(IconError::invalid_argument(
                "All trajectory segments should have the same dynamic_limits_check_mode.",
            ));
        }
        trajectory.time_since_start.extend(segment.time_since_start);
        trajectory.positions.extend(segment.positions);
        trajectory.velocities.extend(segment.velocities);
        trajectory.accelerations.extend(segment.accelerations);
    }
    Ok(trajectory)
}
