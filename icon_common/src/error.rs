//! User-visible error model.
//!
//! Every fallible operation in the workspace returns [`IconError`]. The
//! variants mirror the status kinds the server speaks, plus `Transport` for
//! failures below the RPC layer. Server statuses and realtime statuses
//! convert into this type at their respective boundaries.

use icon_rt::{RtErrorCode, RtStatus};
use icon_wire::{RpcCode, RpcStatus};
use thiserror::Error;

/// Result alias used across the workspace.
pub type IconResult<T> = Result<T, IconError>;

/// Error kinds surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IconError {
    /// A request parameter or message violates an invariant.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not valid in the current state (e.g. after the
    /// session ended).
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// A named entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A named entity already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A deadline elapsed before the operation completed.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The session or stream died; retrying on the same session is futile.
    #[error("aborted: {0}")]
    Aborted(String),

    /// A protocol invariant was violated by the peer.
    #[error("internal: {0}")]
    Internal(String),

    /// The server does not implement the requested operation.
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// An error that fits no other kind.
    #[error("unknown: {0}")]
    Unknown(String),

    /// A failure below the RPC layer (connection, channel).
    #[error("transport: {0}")]
    Transport(String),
}

impl IconError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists(message.into())
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::DeadlineExceeded(message.into())
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(m)
            | Self::FailedPrecondition(m)
            | Self::NotFound(m)
            | Self::AlreadyExists(m)
            | Self::DeadlineExceeded(m)
            | Self::Aborted(m)
            | Self::Internal(m)
            | Self::Unimplemented(m)
            | Self::Unknown(m)
            | Self::Transport(m) => m,
        }
    }
}

/// Converts a server status into a result, mapping non-OK codes onto the
/// matching [`IconError`] kind.
pub fn check_rpc_status(status: &RpcStatus) -> IconResult<()> {
    if status.is_ok() {
        return Ok(());
    }
    Err(rpc_status_to_error(status))
}

fn rpc_status_to_error(status: &RpcStatus) -> IconError {
    let message = status.message.clone();
    match status.code {
        RpcCode::Ok => IconError::Unknown("OK status converted to error".to_string()),
        RpcCode::InvalidArgument => IconError::InvalidArgument(message),
        RpcCode::DeadlineExceeded => IconError::DeadlineExceeded(message),
        RpcCode::NotFound => IconError::NotFound(message),
        RpcCode::AlreadyExists => IconError::AlreadyExists(message),
        RpcCode::FailedPrecondition => IconError::FailedPrecondition(message),
        RpcCode::Aborted => IconError::Aborted(message),
        RpcCode::Unimplemented => IconError::Unimplemented(message),
        RpcCode::Internal => IconError::Internal(message),
        RpcCode::Unavailable => IconError::Transport(message),
        RpcCode::Cancelled
        | RpcCode::Unknown
        | RpcCode::PermissionDenied
        | RpcCode::ResourceExhausted
        | RpcCode::OutOfRange
        | RpcCode::DataLoss
        | RpcCode::Unauthenticated => IconError::Unknown(message),
    }
}

impl From<RtStatus> for IconError {
    fn from(status: RtStatus) -> Self {
        let message = status.message().to_string();
        match status.code() {
            RtErrorCode::InvalidArgument => Self::InvalidArgument(message),
            RtErrorCode::DeadlineExceeded => Self::DeadlineExceeded(message),
            RtErrorCode::NotFound => Self::NotFound(message),
            RtErrorCode::AlreadyExists => Self::AlreadyExists(message),
            RtErrorCode::FailedPrecondition => Self::FailedPrecondition(message),
            RtErrorCode::Aborted => Self::Aborted(message),
            RtErrorCode::Unimplemented => Self::Unimplemented(message),
            RtErrorCode::Internal => Self::Internal(message),
            RtErrorCode::Unavailable => Self::Transport(message),
            _ => Self::Unknown(message),
        }
    }
}
