//! Messages exchanged on the duplex session stream, the reaction watcher
//! stream and the streaming input writer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::any::AnyMessage;
use crate::condition::Condition;
use crate::math::Timestamp;
use crate::status::RpcStatus;

/// Logging context attached to a session for server-side correlation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogContext {
    pub context_id: i64,
}

/// An action instance to add to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInstance {
    pub action_type_name: String,
    pub action_instance_id: i64,
    pub slot_data: SlotData,
    pub fixed_parameters: Option<AnyMessage>,
}

/// Slot binding of an action: either an explicit slot-to-part map or a
/// single part name (the server infers the map for single-slot actions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlotData {
    SlotPartMap(BTreeMap<String, String>),
    PartName(String),
}

/// Association between a reaction and the action it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionAssociation {
    pub action_instance_id: i64,
    /// True when the reaction switches away from the associated action,
    /// false when the target action starts in parallel.
    pub stop_associated_action: bool,
    pub triggered_signal_name: Option<String>,
}

/// The realtime response of a reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub start_action_instance_id: i64,
}

/// A reaction to add to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub reaction_instance_id: i64,
    pub condition: Condition,
    pub fire_once: bool,
    pub action_association: Option<ActionAssociation>,
    pub response: Option<ReactionResponse>,
}

/// First request on the session stream: parts to allocate plus an optional
/// session deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialSessionData {
    pub allocate_parts: Vec<String>,
    pub deadline: Option<Timestamp>,
}

/// The request oneof of the session stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionRequestData {
    InitialSessionData(InitialSessionData),
    AddActionsAndReactions {
        action_instances: Vec<ActionInstance>,
        reactions: Vec<Reaction>,
    },
    RemoveActionAndReactionIds {
        action_instance_ids: Vec<i64>,
        reaction_ids: Vec<i64>,
    },
    ClearAllActionsReactions,
    StartActionsRequest {
        action_instance_ids: Vec<i64>,
        stop_active_actions: bool,
    },
}

/// A request on the duplex session stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSessionRequest {
    pub log_context: Option<LogContext>,
    pub data: SessionRequestData,
}

/// Session id assigned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialSessionDataResponse {
    pub session_id: i64,
}

/// A response on the duplex session stream. Exactly one response is sent
/// per request; `initial_session_data` is only present on the first one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSessionResponse {
    pub status: RpcStatus,
    pub initial_session_data: Option<InitialSessionDataResponse>,
}

/// Opens the one-way reaction watcher stream for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchReactionsRequest {
    pub session_id: i64,
}

/// A fired reaction as observed by the watcher stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub reaction_id: i64,
    pub previous_action_instance_id: Option<i64>,
    pub current_action_instance_id: Option<i64>,
    pub timestamp: Option<Timestamp>,
}

/// A watcher stream response. The first response carries no event and acts
/// as the ready sentinel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WatchReactionsResponse {
    pub reaction_event: Option<ReactionEvent>,
}

/// The request oneof of the write stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamOperation {
    AddWriteStream { action_id: i64, field_name: String },
    WriteValue { value: AnyMessage },
}

/// A request on the streaming input writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenWriteStreamRequest {
    pub session_id: i64,
    pub stream_operation: StreamOperation,
}

/// The response oneof of the write stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamOperationResponse {
    AddStreamResponse(RpcStatus),
    WriteValueResponse(RpcStatus),
}

/// A response on the streaming input writer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpenWriteStreamResponse {
    pub stream_operation_response: Option<StreamOperationResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Comparison, ComparisonOp, ComparisonValue};

    #[test]
    fn open_session_request_roundtrip() {
        let request = OpenSessionRequest {
            log_context: Some(LogContext { context_id: 77 }),
            data: SessionRequestData::AddActionsAndReactions {
                action_instances: vec![ActionInstance {
                    action_type_name: "xfa.point_to_point_move".to_string(),
                    action_instance_id: 1,
                    slot_data: SlotData::PartName("arm0".to_string()),
                    fixed_parameters: None,
                }],
                reactions: vec![Reaction {
                    reaction_instance_id: 0,
                    condition: Condition::Comparison(Comparison {
                        state_variable_name: "xfa.is_done".to_string(),
                        operation: ComparisonOp::Equal,
                        value: Some(ComparisonValue::BoolValue(true)),
                        max_abs_error: 0.0,
                    }),
                    fire_once: true,
                    action_association: Some(ActionAssociation {
                        action_instance_id: 1,
                        stop_associated_action: true,
                        triggered_signal_name: None,
                    }),
                    response: Some(ReactionResponse {
                        start_action_instance_id: 2,
                    }),
                }],
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: OpenSessionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn ready_sentinel_has_no_event() {
        let sentinel = WatchReactionsResponse::default();
        assert!(sentinel.reaction_event.is_none());
    }
}
