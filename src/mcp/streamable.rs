//! Stateless streamable HTTP transport (`/mcp`).
//!
//! Each POST is a self-contained exchange: no session is created and nothing
//! survives the request. The `x-auth-token` header of the POST scopes the
//! credential for exactly that request.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream;
use serde_json::Value;

use super::protocol::{JsonRpcResponse, McpProtocol};
use crate::credential;

const JSON: &str = "application/json";
const EVENT_STREAM: &str = "text/event-stream";

/// Handles `/mcp` requests without keeping any per-client state
#[derive(Debug)]
pub struct StatelessSessionManager {
    protocol: Arc<McpProtocol>,
    json_response: bool,
}

impl StatelessSessionManager {
    /// With `json_response` set, replies are plain JSON bodies instead of a
    /// single-event SSE stream.
    pub fn new(protocol: Arc<McpProtocol>, json_response: bool) -> Self {
        Self {
            protocol,
            json_response,
        }
    }

    /// Process one request body under `headers`' credential
    pub async fn handle(&self, headers: &HeaderMap, body: &[u8]) -> Response {
        if let Err(rejection) = self.check_accept(headers) {
            return rejection;
        }
        if !content_type_is_json(headers) {
            return (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported Media Type: Content-Type must be application/json",
            )
                .into_response();
        }

        let message: Value = match serde_json::from_slice(body) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Failed to parse request body: {}", e);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(JsonRpcResponse::parse_error(e).to_value()),
                )
                    .into_response();
            }
        };

        let token = super::credential_from_headers(headers);
        let reply = credential::scope(token, self.protocol.handle_value(message)).await;

        match reply {
            None => StatusCode::ACCEPTED.into_response(),
            Some(reply) if self.json_response => Json(reply).into_response(),
            Some(reply) => single_event(reply),
        }
    }

    fn check_accept(&self, headers: &HeaderMap) -> Result<(), Response> {
        let accept = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        let accepts = |wanted: &str| {
            accept.split(',').any(|part| {
                let media = part.split(';').next().unwrap_or_default().trim();
                media == wanted || media == "*/*"
            })
        };

        let has_json = accepts(JSON);
        let has_sse = accepts(EVENT_STREAM);
        let ok = if self.json_response {
            has_json
        } else {
            has_json && has_sse
        };

        if ok {
            Ok(())
        } else {
            let message = if self.json_response {
                "Not Acceptable: Client must accept application/json"
            } else {
                "Not Acceptable: Client must accept both application/json and text/event-stream"
            };
            Err((StatusCode::NOT_ACCEPTABLE, message).into_response())
        }
    }
}

fn content_type_is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim() == JSON)
        .unwrap_or(false)
}

fn single_event(reply: Value) -> Response {
    let data = match serde_json::to_string(&reply) {
        Ok(data) => data,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    let event = Event::default().event("message").data(data);
    Sse::new(stream::once(async move { Ok::<_, Infallible>(event) })).into_response()
}

/// `POST /mcp`
pub async fn post(
    State(manager): State<Arc<StatelessSessionManager>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    manager.handle(&headers, &body).await
}

/// `GET` and `DELETE /mcp`: there is no session to stream from or close
pub async fn method_not_allowed() -> Response {
    let mut response = (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("POST"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_content_type_with_charset() {
        assert!(content_type_is_json(&headers(&[(
            "content-type",
            "application/json; charset=utf-8"
        )])));
        assert!(!content_type_is_json(&headers(&[("content-type", "text/plain")])));
        assert!(!content_type_is_json(&HeaderMap::new()));
    }
}
