//! Typed writer for streaming action inputs.

use std::marker::PhantomData;

use icon_common::{ActionInstanceId, IconError, IconResult, SessionId};
use icon_wire::AnyMessage;
use icon_wire::session as wire_session;
use serde::Serialize;
use tracing::error;

use crate::transport::{CallContextFactory, IconApi, WriteStream};

const COMMUNICATION_FAILED_MESSAGE: &str = "Communication with server failed.";

/// Untyped core of the stream writer: owns the duplex call and the
/// open/write/finish protocol.
struct GenericStreamWriter {
    stream: Box<dyn WriteStream>,
    session_id: SessionId,
    /// Once set, the stream must no longer be used.
    finish_status: Option<IconResult<()>>,
}

impl GenericStreamWriter {
    fn new(stream: Box<dyn WriteStream>, session_id: SessionId) -> Self {
        Self {
            stream,
            session_id,
            finish_status: None,
        }
    }

    /// First exchange: registers the write stream for `input_name` of the
    /// given action and checks the server's add-stream status.
    fn open_stream_writer(
        &mut self,
        action_instance_id: ActionInstanceId,
        input_name: &str,
    ) -> IconResult<()> {
        let request = wire_session::OpenWriteStreamRequest {
            session_id: self.session_id.value(),
            stream_operation: wire_session::StreamOperation::AddWriteStream {
                action_id: action_instance_id.value(),
                field_name: input_name.to_string(),
            },
        };
        if !self.stream.write(&request) {
            self.finish_if_needed()?;
            return Err(IconError::aborted(COMMUNICATION_FAILED_MESSAGE));
        }
        let Some(response) = self.stream.read() else {
            self.finish_if_needed()?;
            return Err(IconError::unknown(COMMUNICATION_FAILED_MESSAGE));
        };
        match response.stream_operation_response {
            Some(wire_session::StreamOperationResponse::AddStreamResponse(status)) => {
                icon_common::error::check_rpc_status(&status)
            }
            _ => Err(IconError::unknown(
                "Received unexpected response from write stream.",
            )),
        }
    }

    /// Writes one value and checks the per-message status.
    fn write_to_stream(&mut self, value: AnyMessage) -> IconResult<()> {
        let request = wire_session::OpenWriteStreamRequest {
            session_id: self.session_id.value(),
            stream_operation: wire_session::StreamOperation::WriteValue { value },
        };
        if !self.stream.write(&request) {
            self.finish_if_needed()?;
            return Err(IconError::aborted("Failed to write to stream."));
        }
        let Some(response) = self.stream.read() else {
            self.finish_if_needed()?;
            return Err(IconError::aborted("Failed to write to stream."));
        };
        match response.stream_operation_response {
            Some(wire_session::StreamOperationResponse::WriteValueResponse(status)) => {
                icon_common::error::check_rpc_status(&status)
            }
            _ => {
                self.finish_if_needed()?;
                Err(IconError::internal(
                    "Stream write response is missing `write_value_response` field after \
                     writing a value.",
                ))
            }
        }
    }

    /// Half-closes, drains any extra responses (logging them) and finishes
    /// the call. Idempotent; the first final status is retained.
    fn finish_if_needed(&mut self) -> IconResult<()> {
        if let Some(status) = &self.finish_status {
            return status.clone();
        }
        self.stream.writes_done();
        while let Some(response) = self.stream.read() {
            error!("Received unexpected response from the server: {response:?}");
        }
        let status = self.stream.finish();
        self.finish_status = Some(status.clone());
        status
    }
}

impl Drop for GenericStreamWriter {
    fn drop(&mut self) {
        if let Err(status) = self.finish_if_needed() {
            error!("Stream closing with status: {status}");
        }
    }
}

/// A typed endpoint for writing to one streaming input of an action.
///
/// Values are packed as type-tagged messages; the server validates the
/// type against the input's declared message type. Not thread-safe.
/// Dropping the writer half-closes and finishes the call.
pub struct StreamWriter<T: Serialize> {
    writer: GenericStreamWriter,
    _values: PhantomData<fn(&T)>,
}

impl<T: Serialize> StreamWriter<T> {
    pub(crate) fn open(
        api: &dyn IconApi,
        context_factory: &CallContextFactory,
        session_id: SessionId,
        action_instance_id: ActionInstanceId,
        input_name: &str,
    ) -> IconResult<Self> {
        let context = (context_factory)();
        let stream = api.open_write_stream(&context)?;
        let mut writer = GenericStreamWriter::new(stream, session_id);
        writer.open_stream_writer(action_instance_id, input_name)?;
        Ok(Self {
            writer,
            _values: PhantomData,
        })
    }

    /// Writes `value` to the action input stream and waits for the
    /// per-message acknowledgement.
    pub fn write(&mut self, value: &T) -> IconResult<()> {
        let message = AnyMessage::pack(std::any::type_name::<T>(), value)
            .map_err(|e| IconError::invalid_argument(format!("Cannot pack stream value: {e}")))?;
        self.writer.write_to_stream(message)
    }
}
