//! MCP (Model Context Protocol) implementation.

mod dispatcher;
mod protocol;
pub mod server;
mod sse;
mod streamable;

pub use dispatcher::{CallFailure, CallToolResult, Content, Dispatcher};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpProtocol, SERVER_NAME};
pub use server::{McpServer, ServerError};
pub use sse::SseState;
pub use streamable::StatelessSessionManager;

use axum::http::HeaderMap;

use crate::credential::{self, AuthToken};

/// Header carrying the caller's Cal.com token
pub const AUTH_HEADER: &str = "x-auth-token";

fn credential_from_headers(headers: &HeaderMap) -> Option<AuthToken> {
    credential::from_header(headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_credential_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(credential_from_headers(&headers).is_none());

        headers.insert(AUTH_HEADER, HeaderValue::from_static(""));
        assert!(credential_from_headers(&headers).is_none());

        headers.insert(AUTH_HEADER, HeaderValue::from_static("cal_live_abc"));
        assert_eq!(
            credential_from_headers(&headers).unwrap().expose(),
            "cal_live_abc"
        );
    }
}
