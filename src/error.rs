//! Errors surfaced by tool calls.

use serde_json::{json, Value};

/// Every way a tool call can fail.
///
/// The `Display` text is what the MCP client reads, so it stays short and
/// human-readable and never includes the credential.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// No credential was supplied for the current request
    #[error("Could not get Cal.com client")]
    MissingCredential,

    /// The credential cannot be sent as an HTTP header value
    #[error("Could not get Cal.com client: credential is not a valid header value")]
    InvalidCredential,

    /// A required argument was absent (or null)
    #[error("Missing '{0}' parameter")]
    MissingArgument(String),

    /// An argument had the wrong JSON type
    #[error("Invalid '{name}' parameter: expected {expected}")]
    InvalidArgument {
        name: String,
        expected: &'static str,
    },

    /// The remote API could not be reached or the exchange broke off
    #[error("Failed to {action}: {message}")]
    Network { action: String, message: String },

    /// The remote API answered with a non-success status
    #[error("HTTP error trying to {action}: {status}")]
    Http { action: String, status: u16 },

    /// A lookup by identifier returned 404
    #[error("{resource} not found with ID: {id}")]
    NotFound { resource: &'static str, id: String },

    /// A success response whose body was not JSON
    #[error("Invalid response format from server")]
    Decode,

    /// Anything else
    #[error("Unexpected error occurred")]
    Internal,
}

impl ToolError {
    /// Shorthand for [`ToolError::InvalidArgument`]
    pub fn invalid(name: &str, expected: &'static str) -> Self {
        ToolError::InvalidArgument {
            name: name.to_string(),
            expected,
        }
    }

    /// The structured error value: a map with a single `error` key.
    pub fn to_payload(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}
