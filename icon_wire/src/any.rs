//! Opaque type-tagged payloads.
//!
//! Fixed action parameters and streaming input values travel as an
//! [`AnyMessage`]: a type name plus an opaque payload. The schema of the
//! payload is determined by the action type on the server side; the client
//! only packs and unpacks values it knows the concrete type of.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// A type-tagged opaque message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyMessage {
    /// Fully qualified name of the payload type.
    pub type_name: String,
    /// Serialized payload bytes.
    pub payload: Vec<u8>,
}

impl AnyMessage {
    /// Packs `value` under `type_name`.
    pub fn pack<T: Serialize>(
        type_name: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            type_name: type_name.into(),
            payload: serde_json::to_vec(value)?,
        })
    }

    /// Unpacks the payload into `T`. The caller is responsible for matching
    /// `type_name` against the expected type.
    pub fn unpack<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}
