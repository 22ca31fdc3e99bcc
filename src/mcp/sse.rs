//! Legacy HTTP+SSE transport.
//!
//! `GET /sse` opens a session: the first event names the endpoint the client
//! must POST its messages to, and every response is pushed back down the same
//! stream. The `x-auth-token` header of the GET applies to the whole session;
//! headers on the individual POSTs are not consulted.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::Stream;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};
use uuid::Uuid;

use super::protocol::McpProtocol;
use crate::credential;

/// Buffered messages per direction and session
const CHANNEL_CAPACITY: usize = 32;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

type SessionMap = HashMap<Uuid, mpsc::Sender<Value>>;

/// Shared state for the SSE routes
#[derive(Debug)]
pub struct SseState {
    protocol: Arc<McpProtocol>,
    sessions: Arc<Mutex<SessionMap>>,
    message_path: String,
}

impl SseState {
    pub fn new(protocol: Arc<McpProtocol>, message_path: impl Into<String>) -> Self {
        Self {
            protocol,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            message_path: message_path.into(),
        }
    }
}

fn lock(sessions: &Mutex<SessionMap>) -> MutexGuard<'_, SessionMap> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Unregisters a session and stops its worker once the stream is dropped
struct SessionGuard {
    id: Uuid,
    sessions: Arc<Mutex<SessionMap>>,
    worker: AbortHandle,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        lock(&self.sessions).remove(&self.id);
        self.worker.abort();
        tracing::info!("SSE session {} closed", self.id.simple());
    }
}

/// `GET /sse`
pub async fn connect(
    State(state): State<Arc<SseState>>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let token = super::credential_from_headers(&headers);
    let id = Uuid::new_v4();
    let (inbound_tx, inbound_rx) = mpsc::channel::<Value>(CHANNEL_CAPACITY);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Value>(CHANNEL_CAPACITY);

    lock(&state.sessions).insert(id, inbound_tx);
    tracing::info!(
        "SSE session {} opened (credential supplied: {})",
        id.simple(),
        token.is_some()
    );

    let worker = tokio::spawn(credential::scope(
        token,
        run_session(state.protocol.clone(), inbound_rx, outbound_tx),
    ));
    let guard = SessionGuard {
        id,
        sessions: state.sessions.clone(),
        worker: worker.abort_handle(),
    };
    let endpoint = format!("{}?session_id={}", state.message_path, id.simple());

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().event("endpoint").data(endpoint));
        while let Some(message) = outbound_rx.recv().await {
            match serde_json::to_string(&message) {
                Ok(data) => yield Ok(Event::default().event("message").data(data)),
                Err(e) => tracing::error!("Failed to serialize SSE message: {}", e),
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

/// Reads client messages for one session until the session is closed.
///
/// Runs inside the session's credential scope; each message is handled on
/// its own task which re-enters that scope.
async fn run_session(
    protocol: Arc<McpProtocol>,
    mut inbound: mpsc::Receiver<Value>,
    outbound: mpsc::Sender<Value>,
) {
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            message = inbound.recv() => {
                let Some(message) = message else { break };
                let protocol = protocol.clone();
                let outbound = outbound.clone();
                in_flight.spawn(credential::scope(credential::current(), async move {
                    if let Some(response) = protocol.handle_value(message).await {
                        // The stream may already be gone
                        let _ = outbound.send(response).await;
                    }
                }));
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("SSE message task failed: {}", e);
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    session_id: Option<String>,
}

/// `POST /messages/?session_id=...`
pub async fn post_message(
    State(state): State<Arc<SseState>>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Response {
    let Some(raw_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };
    let Ok(id) = Uuid::parse_str(&raw_id) else {
        tracing::warn!("Received invalid session ID: {}", raw_id);
        return (StatusCode::BAD_REQUEST, "Invalid session ID").into_response();
    };

    let sender = lock(&state.sessions).get(&id).cloned();
    let Some(sender) = sender else {
        tracing::warn!("Could not find session for ID: {}", id.simple());
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };

    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Failed to parse message: {}", e);
            return (StatusCode::BAD_REQUEST, "Could not parse message").into_response();
        }
    };

    if sender.send(message).await.is_err() {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    }
    (StatusCode::ACCEPTED, "Accepted").into_response()
}
