//! Wire messages exchanged with the privileged context.
//!
//! Requests are `{id, action, payload}`; responses are `{id, result}` on
//! success or `{id, error}` on failure. Messages travel as JSON text.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::BridgeError;

/// A call sent to the privileged context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub action: String,
    pub payload: JsonValue,
}

/// The privileged context's answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Failure { id: String, error: String },
    Success { id: String, result: JsonValue },
}

impl Response {
    /// A successful answer to call `id`.
    pub fn success(id: impl Into<String>, result: JsonValue) -> Self {
        Response::Success {
            id: id.into(),
            result,
        }
    }

    /// A failed answer to call `id`.
    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Response::Failure {
            id: id.into(),
            error: error.into(),
        }
    }

    /// The call this response answers.
    pub fn id(&self) -> &str {
        match self {
            Response::Failure { id, .. } | Response::Success { id, .. } => id,
        }
    }
}

/// Serialize a message to JSON text.
pub fn encode<T: Serialize>(message: &T) -> Result<String, BridgeError> {
    serde_json::to_string(message).map_err(|e| BridgeError::Malformed(e.to_string()))
}

/// Parse a request sent by the bridge.
pub fn decode_request(raw: &str) -> Result<Request, BridgeError> {
    serde_json::from_str(raw).map_err(|e| BridgeError::Malformed(e.to_string()))
}

/// Parse a response sent by the host.
pub fn decode_response(raw: &str) -> Result<Response, BridgeError> {
    serde_json::from_str(raw).map_err(|e| BridgeError::Malformed(e.to_string()))
}
