//! MCP server: HTTP routes for the SSE and streamable transports, plus a
//! stdio mode built on pmcp.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::routing::{get, post};
use axum::{Json, Router};
use pmcp::{Error, RequestHandlerExtra, Server, ServerCapabilities, ToolHandler, ToolInfo};
use serde_json::{json, Value};
use tokio::signal;

use super::dispatcher::Dispatcher;
use super::protocol::{McpProtocol, SERVER_NAME};
use super::sse::{self, SseState};
use super::streamable::{self, StatelessSessionManager};
use crate::client::{CalClient, ClientError};
use crate::config::Config;
use crate::credential::{self, AuthToken};
use crate::tools::{catalog, CatalogMismatch, ToolDescriptor, ToolRegistry};

/// Path of the SSE stream
pub const SSE_PATH: &str = "/sse";
/// Path SSE clients POST their messages to
pub const MESSAGES_PATH: &str = "/messages/";
/// Path of the streamable HTTP endpoint
pub const STREAMABLE_PATH: &str = "/mcp";

/// Errors that stop the server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(std::io::Error),

    #[error("stdio server failed: {0}")]
    Stdio(#[from] pmcp::Error),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Catalog(#[from] CatalogMismatch),
}

/// The MCP server for Cal.com
///
/// Serves the same dispatcher over every transport.
#[derive(Debug, Clone)]
pub struct McpServer {
    protocol: Arc<McpProtocol>,
    json_response: bool,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            protocol: Arc::new(McpProtocol::new(dispatcher)),
            json_response: false,
        }
    }

    /// Wire the Cal.com client, tool registry and catalog from `config`
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let client = CalClient::new(&config.api.base_url, config.api.timeout())?;
        let dispatcher = Dispatcher::new(ToolRegistry::new(client), catalog())?;
        Ok(Self::new(dispatcher).json_response(config.server.json_response))
    }

    /// Answer streamable HTTP requests with JSON bodies instead of SSE
    pub fn json_response(mut self, enabled: bool) -> Self {
        self.json_response = enabled;
        self
    }

    pub fn protocol(&self) -> &McpProtocol {
        &self.protocol
    }

    /// Build the axum router serving both HTTP transports
    pub fn router(&self) -> Router {
        let sse_routes = Router::new()
            .route(SSE_PATH, get(sse::connect))
            .route(MESSAGES_PATH, post(sse::post_message))
            .with_state(Arc::new(SseState::new(self.protocol.clone(), MESSAGES_PATH)));

        let streamable_routes = Router::new()
            .route(
                STREAMABLE_PATH,
                post(streamable::post)
                    .get(streamable::method_not_allowed)
                    .delete(streamable::method_not_allowed),
            )
            .with_state(Arc::new(StatelessSessionManager::new(
                self.protocol.clone(),
                self.json_response,
            )));

        Router::new()
            .route("/health", get(health))
            .merge(sse_routes)
            .merge(streamable_routes)
    }

    /// Serve HTTP on `addr` until Ctrl+C or SIGTERM
    pub async fn run_http(&self, addr: SocketAddr) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!("Starting MCP server on {}", addr);
        tracing::info!("SSE endpoint: {}", SSE_PATH);
        tracing::info!(
            "Streamable HTTP endpoint: {} (JSON responses: {})",
            STREAMABLE_PATH,
            self.json_response
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(ServerError::Serve)
    }

    /// Run over stdio with `token` as the credential for every call
    pub async fn run_stdio(&self, token: Option<AuthToken>) -> Result<(), ServerError> {
        tracing::info!("Starting MCP server in stdio mode");
        if token.is_none() {
            tracing::warn!("No Cal.com API key configured; tool calls will fail");
        }

        let server = self.build_stdio_server(token)?;
        server.run_stdio().await?;
        Ok(())
    }

    fn build_stdio_server(&self, token: Option<AuthToken>) -> Result<Server, pmcp::Error> {
        let dispatcher = self.protocol.dispatcher();
        let mut builder = Server::builder()
            .name(SERVER_NAME)
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for descriptor in dispatcher.tools() {
            let wrapper = ToolWrapper {
                descriptor: descriptor.clone(),
                dispatcher: dispatcher.clone(),
                token: token.clone(),
            };
            builder = builder.tool(descriptor.name.to_string(), wrapper);
        }

        builder.build()
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}

/// Adapts a dispatcher entry to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    descriptor: ToolDescriptor,
    dispatcher: Dispatcher,
    token: Option<AuthToken>,
}

impl ToolWrapper {
    /// Runs the tool under the configured token. Failures become the
    /// `{"error": ...}` payload so stdio clients see the same text block as
    /// HTTP clients.
    async fn call(&self, args: Value) -> Value {
        credential::scope(
            self.token.clone(),
            self.dispatcher.invoke(self.descriptor.name, args),
        )
        .await
        .unwrap_or_else(|failure| failure.to_payload())
    }
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        Ok(self.call(args).await)
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.descriptor.name.to_string(),
            Some(self.descriptor.description.to_string()),
            self.descriptor.input_schema.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn server() -> McpServer {
        let client = CalClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        McpServer::new(Dispatcher::new(ToolRegistry::new(client), catalog()).unwrap())
    }

    #[test]
    fn test_stdio_server_builds() {
        assert!(server().build_stdio_server(AuthToken::new("tok")).is_ok());
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.server.json_response = true;
        let server = McpServer::from_config(&config).unwrap();
        assert!(server.json_response);
        assert_eq!(server.protocol().dispatcher().tools().len(), 17);

        config.api.base_url = "not a url".to_string();
        assert!(matches!(
            McpServer::from_config(&config),
            Err(ServerError::Client(_))
        ));
    }

    fn wrapper(server: &McpServer, name: &str, token: Option<AuthToken>) -> ToolWrapper {
        let dispatcher = server.protocol().dispatcher().clone();
        let descriptor = dispatcher
            .tools()
            .iter()
            .find(|descriptor| descriptor.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("no descriptor for {}", name));
        ToolWrapper {
            descriptor,
            dispatcher,
            token,
        }
    }

    #[tokio::test]
    async fn test_stdio_missing_credential_is_payload() {
        let wrapper = wrapper(&server(), "cal_get_all_schedules", None);
        let value = wrapper.call(json!({})).await;
        assert_eq!(value, json!({ "error": "Could not get Cal.com client" }));
    }

    #[tokio::test]
    async fn test_stdio_not_found_is_payload() {
        let mut remote = mockito::Server::new_async().await;
        remote
            .mock("GET", "/webhooks/wh-9")
            .with_status(404)
            .create_async()
            .await;
        let client = CalClient::new(&remote.url(), Duration::from_secs(5)).unwrap();
        let server =
            McpServer::new(Dispatcher::new(ToolRegistry::new(client), catalog()).unwrap());

        let wrapper = wrapper(&server, "cal_get_webhook", AuthToken::new("tok"));
        let value = wrapper.call(json!({ "webhook_id": "wh-9" })).await;
        assert_eq!(value, json!({ "error": "Webhook not found with ID: wh-9" }));
    }

    #[tokio::test]
    async fn test_stdio_success_passes_value_through() {
        let mut remote = mockito::Server::new_async().await;
        remote
            .mock("GET", "/schedules/default")
            .match_header("authorization", "tok")
            .with_status(200)
            .with_body(r#"{"status":"success","data":{"id":3}}"#)
            .create_async()
            .await;
        let client = CalClient::new(&remote.url(), Duration::from_secs(5)).unwrap();
        let server =
            McpServer::new(Dispatcher::new(ToolRegistry::new(client), catalog()).unwrap());

        let wrapper = wrapper(&server, "cal_get_default_schedule", AuthToken::new("tok"));
        let value = wrapper.call(json!({})).await;
        assert_eq!(value["data"]["id"], 3);
    }

    #[test]
    fn test_json_response_flag() {
        assert!(!server().json_response);
        assert!(server().json_response(true).json_response);
    }

    #[tokio::test]
    async fn test_run_http_reports_bind_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let err = server().run_http(addr).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
