//! Server status payload carried in streaming responses.

use serde::{Deserialize, Serialize};

/// Canonical RPC status codes as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum RpcCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

/// Status attached by the server to each session-stream response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    pub fn ok() -> Self {
        Self {
            code: RpcCode::Ok,
            message: String::new(),
        }
    }

    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.code == RpcCode::Ok
    }
}

impl Default for RpcStatus {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_ok() {
        assert!(RpcStatus::default().is_ok());
        assert!(!RpcStatus::new(RpcCode::Aborted, "gone").is_ok());
    }

    #[test]
    fn serde_roundtrip() {
        let status = RpcStatus::new(RpcCode::FailedPrecondition, "session ended");
        let json = serde_json::to_string(&status).unwrap();
        let back: RpcStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}
