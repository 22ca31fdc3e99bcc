//! Tool dispatch and response normalisation.
//!
//! [`Dispatcher::call`] never fails: whatever the handler does, the caller
//! gets a [`CallToolResult`] holding exactly one text block.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tools::{Args, CatalogMismatch, ToolDescriptor, ToolRegistry};

/// One block of tool output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Content::Text { text } => text,
        }
    }
}

/// The content envelope returned by every tool call.
///
/// Failures keep their human-readable text and are also flagged with
/// `isError` for clients that look at it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    pub is_error: bool,
}

impl CallToolResult {
    /// Pretty-printed JSON from a successful call
    pub fn success(value: &Value) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self {
                content: vec![Content::text(text)],
                is_error: false,
            },
            Err(e) => Self::fault(&e.to_string()),
        }
    }

    /// A failure reported by the tool itself, rendered as `{"error": "..."}`
    pub fn tool_error(err: &ToolError) -> Self {
        let payload = err.to_payload();
        let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| err.to_string());
        Self {
            content: vec![Content::text(text)],
            is_error: true,
        }
    }

    /// A fault that escaped the tool
    pub fn fault(message: &str) -> Self {
        Self {
            content: vec![Content::text(format!("Error: {}", message))],
            is_error: true,
        }
    }

    /// Text of the first block
    pub fn text(&self) -> &str {
        self.content.first().map(Content::as_text).unwrap_or_default()
    }
}

/// Routes tool calls by name and wraps every outcome
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    catalog: Arc<Vec<ToolDescriptor>>,
}

impl Dispatcher {
    /// Pair a routing table with its catalog, refusing mismatched pairs
    pub fn new(registry: ToolRegistry, catalog: Vec<ToolDescriptor>) -> Result<Self, CatalogMismatch> {
        registry.validate(&catalog)?;
        Ok(Self {
            registry: Arc::new(registry),
            catalog: Arc::new(catalog),
        })
    }

    /// Descriptors for `tools/list`
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.catalog
    }

    /// Invoke `name` with `arguments`, keeping the raw value on success.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, CallFailure> {
        let Some(handler) = self.registry.get(name) else {
            tracing::error!("Unknown tool requested: {}", name);
            return Err(CallFailure::UnknownTool(name.to_string()));
        };

        let outcome = AssertUnwindSafe(async move {
            let args = Args::from_value(arguments)?;
            handler.execute(args).await
        })
        .catch_unwind()
        .await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                tracing::warn!(tool = name, "Tool call failed: {}", err);
                Err(CallFailure::Tool(err))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(tool = name, "Error calling tool: {}", message);
                Err(CallFailure::Fault(message))
            }
        }
    }

    /// Invoke `name` with `arguments` and normalise the outcome.
    pub async fn call(&self, name: &str, arguments: Value) -> CallToolResult {
        match self.invoke(name, arguments).await {
            Ok(value) => CallToolResult::success(&value),
            Err(failure) => failure.into_result(),
        }
    }
}

/// Why a tool call produced no value
#[derive(Debug, Clone, PartialEq)]
pub enum CallFailure {
    UnknownTool(String),
    Tool(ToolError),
    /// The handler panicked
    Fault(String),
}

impl CallFailure {
    pub fn into_result(self) -> CallToolResult {
        match self {
            CallFailure::UnknownTool(name) => {
                CallToolResult::fault(&format!("Unknown tool: {}", name))
            }
            CallFailure::Tool(err) => CallToolResult::tool_error(&err),
            CallFailure::Fault(message) => CallToolResult::fault(&message),
        }
    }

    /// `{"error": msg}` for transports that wrap the value themselves
    pub fn to_payload(&self) -> Value {
        match self {
            CallFailure::UnknownTool(name) => {
                json!({ "error": format!("Unknown tool: {}", name) })
            }
            CallFailure::Tool(err) => err.to_payload(),
            CallFailure::Fault(message) => json!({ "error": message }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CalClient;
    use crate::credential;
    use crate::tools::{catalog, ToolHandler};
    use std::time::Duration;

    #[derive(Debug)]
    struct PanickingHandler;

    #[async_trait::async_trait]
    impl ToolHandler for PanickingHandler {
        async fn execute(&self, _args: Args) -> Result<Value, ToolError> {
            panic!("handler exploded")
        }
    }

    #[derive(Debug)]
    struct EchoHandler;

    #[async_trait::async_trait]
    impl ToolHandler for EchoHandler {
        async fn execute(&self, args: Args) -> Result<Value, ToolError> {
            Ok(json!({ "name": args.required_str("name")? }))
        }
    }

    fn dispatcher() -> Dispatcher {
        let client = CalClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        Dispatcher::new(ToolRegistry::new(client), catalog()).unwrap()
    }

    fn single(descriptor_name: &'static str, handler: impl ToolHandler + 'static) -> Dispatcher {
        let mut registry = ToolRegistry::empty();
        registry.register(descriptor_name, handler);
        let descriptors = vec![ToolDescriptor {
            name: descriptor_name,
            description: "test tool",
            input_schema: json!({ "type": "object", "properties": {}, "required": [] }),
        }];
        Dispatcher::new(registry, descriptors).unwrap()
    }

    #[test]
    fn test_new_rejects_mismatched_catalog() {
        let client = CalClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let mut descriptors = catalog();
        descriptors.pop();
        assert!(Dispatcher::new(ToolRegistry::new(client), descriptors).is_err());
    }

    #[tokio::test]
    async fn test_missing_credential_is_error_block() {
        let result = dispatcher().call("cal_get_all_schedules", json!({})).await;

        assert_eq!(result.content.len(), 1);
        assert!(result.is_error);
        assert!(result.text().contains("Could not get Cal.com client"));
        assert!(credential::current().is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_raise() {
        let result = dispatcher().call("cal_no_such_tool", json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.text(), "Error: Unknown tool: cal_no_such_tool");
    }

    #[tokio::test]
    async fn test_panicking_tool_becomes_error_block() {
        let result = single("boom", PanickingHandler).call("boom", json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.text(), "Error: handler exploded");
    }

    #[tokio::test]
    async fn test_success_is_pretty_json() {
        let result = single("echo", EchoHandler)
            .call("echo", json!({ "name": "cal" }))
            .await;
        assert!(!result.is_error);
        assert_eq!(result.text(), "{\n  \"name\": \"cal\"\n}");
    }

    #[tokio::test]
    async fn test_missing_argument_is_named() {
        let result = single("echo", EchoHandler).call("echo", json!({})).await;
        assert!(result.is_error);
        let parsed: Value = serde_json::from_str(result.text()).unwrap();
        assert_eq!(parsed, json!({ "error": "Missing 'name' parameter" }));
    }

    #[tokio::test]
    async fn test_non_object_arguments() {
        let result = single("echo", EchoHandler).call("echo", json!("oops")).await;
        assert!(result.is_error);
        assert!(result.text().contains("Invalid 'arguments' parameter"));
    }

    #[test]
    fn test_envelope_serialization() {
        let value = serde_json::to_value(CallToolResult::fault("x")).unwrap();
        assert_eq!(
            value,
            json!({ "content": [{ "type": "text", "text": "Error: x" }], "isError": true })
        );
    }

    #[test]
    fn test_failure_payloads() {
        assert_eq!(
            CallFailure::UnknownTool("nope".into()).to_payload(),
            json!({ "error": "Unknown tool: nope" })
        );
        assert_eq!(
            CallFailure::Tool(ToolError::MissingCredential).to_payload(),
            json!({ "error": "Could not get Cal.com client" })
        );
        assert_eq!(
            CallFailure::Fault("boom".into()).to_payload(),
            json!({ "error": "boom" })
        );
    }
}
