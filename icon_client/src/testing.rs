//! In-memory fake channel.
//!
//! [`fake_channel`] returns a [`Channel`] backed by scripted state plus a
//! [`FakeServer`] handle for driving it: queueing session-stream
//! responses, firing reaction events, closing the watcher call and
//! inspecting recorded requests. Tests exercise the real session and
//! client logic against it without any transport.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use icon_common::{IconError, IconResult};
use icon_wire::session as wire_session;
use icon_wire::{RpcStatus, service};

use crate::transport::{
    CallContextFactory, Channel, IconApi, SessionStream, TrajectoryStream, WatcherStream,
    WriteStream, default_call_context_factory,
};

/// First message(s) the fake watcher stream delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherReadyBehavior {
    /// The empty ready sentinel (the conforming behavior).
    Ready,
    /// A reaction event before the ready sentinel (protocol violation).
    EventBeforeReady(i64),
    /// Close the stream without sending anything.
    CloseImmediately,
}

struct State {
    session_id: i64,
    session_requests: Vec<wire_session::OpenSessionRequest>,
    scripted_responses: VecDeque<wire_session::OpenSessionResponse>,
    pending_responses: VecDeque<wire_session::OpenSessionResponse>,
    fail_next_write: bool,
    fail_next_read: bool,
    action_finish: IconResult<()>,
    watcher_ready: WatcherReadyBehavior,
    watcher_tx: Option<Sender<wire_session::WatchReactionsResponse>>,
    watcher_finish: IconResult<()>,
    write_requests: Vec<wire_session::OpenWriteStreamRequest>,
    scripted_write_responses: VecDeque<wire_session::OpenWriteStreamResponse>,
    pending_write_responses: VecDeque<wire_session::OpenWriteStreamResponse>,
    write_finish: IconResult<()>,
    parts: Vec<String>,
    compatible_parts: Vec<String>,
    action_signatures: Vec<service::ActionSignature>,
    operational_status: service::OperationalStatus,
    config: service::GetConfigResponse,
    status: service::GetStatusResponse,
    speed_override: f64,
    part_properties: service::GetPartPropertiesResponse,
    set_part_properties_requests: Vec<service::SetPartPropertiesRequest>,
    streaming_output: Option<service::StreamingOutput>,
    trajectory_segments: Vec<service::JointTrajectoryPva>,
    is_compatible: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            session_id: 1,
            session_requests: Vec::new(),
            scripted_responses: VecDeque::new(),
            pending_responses: VecDeque::new(),
            fail_next_write: false,
            fail_next_read: false,
            action_finish: Ok(()),
            watcher_ready: WatcherReadyBehavior::Ready,
            watcher_tx: None,
            watcher_finish: Ok(()),
            write_requests: Vec::new(),
            scripted_write_responses: VecDeque::new(),
            pending_write_responses: VecDeque::new(),
            write_finish: Ok(()),
            parts: Vec::new(),
            compatible_parts: Vec::new(),
            action_signatures: Vec::new(),
            operational_status: service::OperationalStatus {
                state: service::OperationalState::Enabled,
                fault_reason: String::new(),
            },
            config: service::GetConfigResponse {
                control_frequency_hz: 1000.0,
                server_name: "fake-icon-server".to_string(),
                part_configs: Vec::new(),
            },
            status: service::GetStatusResponse::default(),
            speed_override: 1.0,
            part_properties: service::GetPartPropertiesResponse::default(),
            set_part_properties_requests: Vec::new(),
            streaming_output: None,
            trajectory_segments: Vec::new(),
            is_compatible: true,
        }
    }
}

/// Test-side handle for scripting and inspecting the fake server.
#[derive(Clone)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl FakeServer {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake server state poisoned")
    }

    /// Queues a response for the next non-initial session request. When no
    /// response is queued, requests are answered with an OK status.
    pub fn push_session_response(&self, response: wire_session::OpenSessionResponse) {
        self.lock().scripted_responses.push_back(response);
    }

    /// Queues an error-status response with the given code.
    pub fn push_session_status(&self, status: RpcStatus) {
        self.push_session_response(wire_session::OpenSessionResponse {
            status,
            initial_session_data: None,
        });
    }

    /// All requests written to the session stream so far.
    pub fn session_requests(&self) -> Vec<wire_session::OpenSessionRequest> {
        self.lock().session_requests.clone()
    }

    /// Makes the next session-stream write fail, simulating a dead call.
    pub fn fail_next_session_write(&self) {
        self.lock().fail_next_write = true;
    }

    /// Makes the next session-stream read fail, simulating a dead call.
    pub fn fail_next_session_read(&self) {
        self.lock().fail_next_read = true;
    }

    /// Final status of the action call.
    pub fn set_action_finish_status(&self, status: IconResult<()>) {
        self.lock().action_finish = status;
    }

    /// Configures what the watcher stream sends before becoming ready.
    pub fn set_watcher_ready_behavior(&self, behavior: WatcherReadyBehavior) {
        self.lock().watcher_ready = behavior;
    }

    /// Fires a reaction event on the watcher stream.
    pub fn send_reaction_event(&self, reaction_id: i64) {
        let state = self.lock();
        if let Some(tx) = &state.watcher_tx {
            let _ = tx.send(wire_session::WatchReactionsResponse {
                reaction_event: Some(wire_session::ReactionEvent {
                    reaction_id,
                    previous_action_instance_id: None,
                    current_action_instance_id: None,
                    timestamp: None,
                }),
            });
        }
    }

    /// Ends the watcher call with the given final status.
    pub fn close_watcher(&self, status: IconResult<()>) {
        let mut state = self.lock();
        state.watcher_finish = status;
        state.watcher_tx = None;
    }

    /// All requests written to the write stream so far.
    pub fn write_stream_requests(&self) -> Vec<wire_session::OpenWriteStreamRequest> {
        self.lock().write_requests.clone()
    }

    /// Queues a response for the next write-stream request.
    pub fn push_write_stream_response(&self, response: wire_session::OpenWriteStreamResponse) {
        self.lock().scripted_write_responses.push_back(response);
    }

    pub fn set_parts(&self, parts: Vec<String>) {
        self.lock().parts = parts;
    }

    pub fn set_compatible_parts(&self, parts: Vec<String>) {
        self.lock().compatible_parts = parts;
    }

    pub fn set_action_signatures(&self, signatures: Vec<service::ActionSignature>) {
        self.lock().action_signatures = signatures;
    }

    pub fn set_operational_status(&self, status: service::OperationalStatus) {
        self.lock().operational_status = status;
    }

    pub fn set_config(&self, config: service::GetConfigResponse) {
        self.lock().config = config;
    }

    pub fn set_status(&self, status: service::GetStatusResponse) {
        self.lock().status = status;
    }

    pub fn set_part_properties(&self, response: service::GetPartPropertiesResponse) {
        self.lock().part_properties = response;
    }

    /// All `SetPartProperties` requests received so far.
    pub fn recorded_part_property_writes(&self) -> Vec<service::SetPartPropertiesRequest> {
        self.lock().set_part_properties_requests.clone()
    }

    pub fn set_streaming_output(&self, output: service::StreamingOutput) {
        self.lock().streaming_output = Some(output);
    }

    pub fn set_trajectory_segments(&self, segments: Vec<service::JointTrajectoryPva>) {
        self.lock().trajectory_segments = segments;
    }

    pub fn set_is_compatible(&self, compatible: bool) {
        self.lock().is_compatible = compatible;
    }

    pub fn speed_override(&self) -> f64 {
        self.lock().speed_override
    }
}

struct FakeSessionStream {
    state: Arc<Mutex<State>>,
}

impl SessionStream for FakeSessionStream {
    fn write(&mut self, request: &wire_session::OpenSessionRequest) -> bool {
        let mut state = self.state.lock().expect("fake server state poisoned");
        if state.fail_next_write {
            state.fail_next_write = false;
            return false;
        }
        state.session_requests.push(request.clone());
        let response = match &request.data {
            wire_session::SessionRequestData::InitialSessionData(_) => {
                wire_session::OpenSessionResponse {
                    status: RpcStatus::ok(),
                    initial_session_data: Some(wire_session::InitialSessionDataResponse {
                        session_id: state.session_id,
                    }),
                }
            }
            _ => state
                .scripted_responses
                .pop_front()
                .unwrap_or(wire_session::OpenSessionResponse {
                    status: RpcStatus::ok(),
                    initial_session_data: None,
                }),
        };
        state.pending_responses.push_back(response);
        true
    }

    fn writes_done(&mut self) -> bool {
        let mut state = self.state.lock().expect("fake server state poisoned");
        // The server ends all watcher streams when the action session
        // ends.
        state.watcher_tx = None;
        true
    }

    fn read(&mut self) -> Option<wire_session::OpenSessionResponse> {
        let mut state = self.state.lock().expect("fake server state poisoned");
        if state.fail_next_read {
            state.fail_next_read = false;
            state.pending_responses.clear();
            return None;
        }
        state.pending_responses.pop_front()
    }

    fn finish(&mut self) -> IconResult<()> {
        self.state
            .lock()
            .expect("fake server state poisoned")
            .action_finish
            .clone()
    }
}

struct FakeWatcherStream {
    rx: Receiver<wire_session::WatchReactionsResponse>,
    state: Arc<Mutex<State>>,
}

impl WatcherStream for FakeWatcherStream {
    fn read(&mut self) -> Option<wire_session::WatchReactionsResponse> {
        self.rx.recv().ok()
    }

    fn finish(&mut self) -> IconResult<()> {
        self.state
            .lock()
            .expect("fake server state poisoned")
            .watcher_finish
            .clone()
    }
}

struct FakeWriteStream {
    state: Arc<Mutex<State>>,
}

impl WriteStream for FakeWriteStream {
    fn write(&mut self, request: &wire_session::OpenWriteStreamRequest) -> bool {
        let mut state = self.state.lock().expect("fake server state poisoned");
        state.write_requests.push(request.clone());
        let response = match state.scripted_write_responses.pop_front() {
            Some(response) => response,
            None => {
                let ok = RpcStatus::ok();
                let operation_response = match &request.stream_operation {
                    wire_session::StreamOperation::AddWriteStream { .. } => {
                        wire_session::StreamOperationResponse::AddStreamResponse(ok)
                    }
                    wire_session::StreamOperation::WriteValue { .. } => {
                        wire_session::StreamOperationResponse::WriteValueResponse(ok)
                    }
                };
                wire_session::OpenWriteStreamResponse {
                    stream_operation_response: Some(operation_response),
                }
            }
        };
        state.pending_write_responses.push_back(response);
        true
    }

    fn writes_done(&mut self) -> bool {
        true
    }

    fn read(&mut self) -> Option<wire_session::OpenWriteStreamResponse> {
        self.state
            .lock()
            .expect("fake server state poisoned")
            .pending_write_responses
            .pop_front()
    }

    fn finish(&mut self) -> IconResult<()> {
        self.state
            .lock()
            .expect("fake server state poisoned")
            .write_finish
            .clone()
    }
}

struct FakeTrajectoryStream {
    segments: VecDeque<service::JointTrajectoryPva>,
}

impl TrajectoryStream for FakeTrajectoryStream {
    fn read(&mut self) -> Option<service::GetPlannedTrajectoryResponse> {
        self.segments
            .pop_front()
            .map(|segment| service::GetPlannedTrajectoryResponse {
                planned_trajectory_segment: segment,
            })
    }

    fn finish(&mut self) -> IconResult<()> {
        Ok(())
    }
}

/// Fake stub backed by the shared scripted state.
pub struct FakeIconApi {
    state: Arc<Mutex<State>>,
}

impl FakeIconApi {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake server state poisoned")
    }
}

impl IconApi for FakeIconApi {
    fn enable(&self, _context: &crate::transport::CallContext) -> IconResult<()> {
        Ok(())
    }

    fn disable(&self, _context: &crate::transport::CallContext) -> IconResult<()> {
        Ok(())
    }

    fn clear_faults(&self, _context: &crate::transport::CallContext) -> IconResult<()> {
        Ok(())
    }

    fn get_operational_status(
        &self,
        _context: &crate::transport::CallContext,
    ) -> IconResult<service::OperationalStatus> {
        Ok(self.lock().operational_status.clone())
    }

    fn get_config(
        &self,
        _context: &crate::transport::CallContext,
    ) -> IconResult<service::GetConfigResponse> {
        Ok(self.lock().config.clone())
    }

    fn get_status(
        &self,
        _context: &crate::transport::CallContext,
    ) -> IconResult<service::GetStatusResponse> {
        Ok(self.lock().status.clone())
    }

    fn restart_server(&self, _context: &crate::transport::CallContext) -> IconResult<()> {
        Err(IconError::transport("fake server restarting"))
    }

    fn list_parts(&self, _context: &crate::transport::CallContext) -> IconResult<Vec<String>> {
        Ok(self.lock().parts.clone())
    }

    fn list_compatible_parts(
        &self,
        _context: &crate::transport::CallContext,
        _action_type_names: &[String],
    ) -> IconResult<Vec<String>> {
        Ok(self.lock().compatible_parts.clone())
    }

    fn list_action_signatures(
        &self,
        _context: &crate::transport::CallContext,
    ) -> IconResult<Vec<service::ActionSignature>> {
        Ok(self.lock().action_signatures.clone())
    }

    fn get_action_signature_by_name(
        &self,
        _context: &crate::transport::CallContext,
        action_type_name: &str,
    ) -> IconResult<Option<service::ActionSignature>> {
        Ok(self
            .lock()
            .action_signatures
            .iter()
            .find(|s| s.action_type_name == action_type_name)
            .cloned())
    }

    fn is_action_compatible(
        &self,
        _context: &crate::transport::CallContext,
        _request: &service::IsActionCompatibleRequest,
    ) -> IconResult<bool> {
        Ok(self.lock().is_compatible)
    }

    fn get_speed_override(&self, _context: &crate::transport::CallContext) -> IconResult<f64> {
        Ok(self.lock().speed_override)
    }

    fn set_speed_override(
        &self,
        _context: &crate::transport::CallContext,
        override_factor: f64,
    ) -> IconResult<()> {
        self.lock().speed_override = override_factor;
        Ok(())
    }

    fn get_part_properties(
        &self,
        _context: &crate::transport::CallContext,
    ) -> IconResult<service::GetPartPropertiesResponse> {
        Ok(self.lock().part_properties.clone())
    }

    fn set_part_properties(
        &self,
        _context: &crate::transport::CallContext,
        request: &service::SetPartPropertiesRequest,
    ) -> IconResult<()> {
        self.lock()
            .set_part_properties_requests
            .push(request.clone());
        Ok(())
    }

    fn get_latest_streaming_output(
        &self,
        _context: &crate::transport::CallContext,
        _request: &service::GetLatestStreamingOutputRequest,
    ) -> IconResult<service::StreamingOutput> {
        self.lock()
            .streaming_output
            .clone()
            .ok_or_else(|| IconError::not_found("No streaming output published"))
    }

    fn open_session(
        &self,
        _context: &crate::transport::CallContext,
    ) -> IconResult<Box<dyn SessionStream>> {
        Ok(Box::new(FakeSessionStream {
            state: self.state.clone(),
        }))
    }

    fn watch_reactions(
        &self,
        _context: &crate::transport::CallContext,
        _request: &wire_session::WatchReactionsRequest,
    ) -> IconResult<Box<dyn WatcherStream>> {
        let (tx, rx) = channel();
        let mut state = self.lock();
        match state.watcher_ready {
            WatcherReadyBehavior::Ready => {
                let _ = tx.send(wire_session::WatchReactionsResponse::default());
                state.watcher_tx = Some(tx);
            }
            WatcherReadyBehavior::EventBeforeReady(reaction_id) => {
                let _ = tx.send(wire_session::WatchReactionsResponse {
                    reaction_event: Some(wire_session::ReactionEvent {
                        reaction_id,
                        previous_action_instance_id: None,
                        current_action_instance_id: None,
                        timestamp: None,
                    }),
                });
                state.watcher_tx = Some(tx);
            }
            WatcherReadyBehavior::CloseImmediately => drop(tx),
        }
        Ok(Box::new(FakeWatcherStream {
            rx,
            state: self.state.clone(),
        }))
    }

    fn open_write_stream(
        &self,
        _context: &crate::transport::CallContext,
    ) -> IconResult<Box<dyn WriteStream>> {
        Ok(Box::new(FakeWriteStream {
            state: self.state.clone(),
        }))
    }

    fn get_planned_trajectory(
        &self,
        _context: &crate::transport::CallContext,
        _request: &service::GetPlannedTrajectoryRequest,
    ) -> IconResult<Box<dyn TrajectoryStream>> {
        Ok(Box::new(FakeTrajectoryStream {
            segments: self.lock().trajectory_segments.clone().into(),
        }))
    }
}

/// Channel handing out the fake stub.
pub struct FakeChannel {
    api: Arc<FakeIconApi>,
}

impl Channel for FakeChannel {
    fn api(&self) -> Arc<dyn IconApi> {
        self.api.clone()
    }

    fn call_context_factory(&self) -> CallContextFactory {
        default_call_context_factory()
    }
}

/// Creates a fake channel plus the server handle that drives it.
pub fn fake_channel() -> (Arc<FakeChannel>, FakeServer) {
    let state = Arc::new(Mutex::new(State::default()));
    let channel = Arc::new(FakeChannel {
        api: Arc::new(FakeIconApi {
            state: state.clone(),
        }),
    });
    (channel, FakeServer { state })
}
