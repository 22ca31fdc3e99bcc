//! Cal.com HTTP client.
//!
//! [`CalClient::headers`] derives the outbound header set from the credential
//! in scope and fails closed when there is none. [`CalClient::send`] performs
//! exactly one HTTP call and maps every outcome to `Result<Value, ToolError>`.

mod request;

pub use request::{ApiFamily, Lookup, RemoteRequest};

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use crate::credential;
use crate::error::ToolError;

/// Default Cal.com API root
pub const DEFAULT_BASE_URL: &str = "https://api.cal.com/v2";

const API_VERSION_HEADER: &str = "cal-api-version";

/// Errors building the client at startup
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid Cal.com base URL '{url}': {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Base URL cannot carry a path: {0}")]
    CannotBeABase(String),

    #[error("Failed to create HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Shared client for the Cal.com API
#[derive(Debug, Clone)]
pub struct CalClient {
    http: Arc<Client>,
    base_url: Url,
}

impl CalClient {
    /// Create a client against `base_url` with the given request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Self::with_client(Arc::new(http), base_url)
    }

    /// Create from an existing reqwest Client
    pub fn with_client(http: Arc<Client>, base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|source| ClientError::BaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::CannotBeABase(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    /// The API root every request path is appended to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the header set for one call of `family` from the scoped credential.
    ///
    /// Returns [`ToolError::MissingCredential`] when the current request has no
    /// token; callers must not touch the network in that case.
    pub fn headers(&self, family: ApiFamily) -> Result<HeaderMap, ToolError> {
        let token = credential::current().ok_or(ToolError::MissingCredential)?;

        let mut auth =
            HeaderValue::from_str(token.expose()).map_err(|_| ToolError::InvalidCredential)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        if let Some(version) = family.api_version() {
            headers.insert(
                HeaderName::from_static(API_VERSION_HEADER),
                HeaderValue::from_static(version),
            );
        }
        if family.sends_content_type() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(headers)
    }

    /// Resolve the path segments of a request against the base URL
    pub fn url_for(&self, segments: &[String]) -> Result<Url, ToolError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ToolError::Internal)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Perform one call and decode its JSON body.
    pub async fn send(&self, request: RemoteRequest) -> Result<Value, ToolError> {
        let headers = self.headers(request.family)?;
        let url = self.url_for(&request.segments)?;

        tracing::info!(method = %request.method, %url, "Calling Cal.com API");

        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Could not {} at {}: {}", request.action, url, e);
            ToolError::Network {
                action: request.action.clone(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::NOT_FOUND {
                if let Some(lookup) = request.lookup {
                    tracing::warn!("{} not found with ID: {}", lookup.resource, lookup.id);
                    return Err(ToolError::NotFound {
                        resource: lookup.resource,
                        id: lookup.id,
                    });
                }
            }
            tracing::warn!("Cal.com returned {} trying to {}", status, request.action);
            return Err(ToolError::Http {
                action: request.action,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| ToolError::Network {
            action: request.action.clone(),
            message: e.to_string(),
        })?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!("Invalid JSON from Cal.com trying to {}: {}", request.action, e);
            ToolError::Decode
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{self, AuthToken};
    use mockito::Matcher;

    fn client(base: &str) -> CalClient {
        CalClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_headers_fail_closed_without_token() {
        let client = client(DEFAULT_BASE_URL);
        assert_eq!(
            client.headers(ApiFamily::Schedules).unwrap_err(),
            ToolError::MissingCredential
        );
    }

    #[test]
    fn test_headers_per_family() {
        let client = client(DEFAULT_BASE_URL);
        credential::sync_scope(AuthToken::new("Bearer abc"), || {
            let schedules = client.headers(ApiFamily::Schedules).unwrap();
            assert_eq!(schedules[AUTHORIZATION], "Bearer abc");
            assert_eq!(schedules[API_VERSION_HEADER], "2024-06-11");
            assert!(schedules.get(CONTENT_TYPE).is_none());

            let webhooks = client.headers(ApiFamily::Webhooks).unwrap();
            assert_eq!(webhooks[CONTENT_TYPE], "application/json");
            assert!(webhooks.get(API_VERSION_HEADER).is_none());

            let verified = client.headers(ApiFamily::VerifiedResources).unwrap();
            assert_eq!(verified.len(), 1);
        });
    }

    #[test]
    fn test_headers_reject_invalid_token() {
        let client = client(DEFAULT_BASE_URL);
        credential::sync_scope(AuthToken::new("bad\ntoken"), || {
            assert_eq!(
                client.headers(ApiFamily::Webhooks).unwrap_err(),
                ToolError::InvalidCredential
            );
        });
    }

    #[test]
    fn test_url_for_segments() {
        let client = client("https://api.cal.com/v2/");
        let url = client
            .url_for(&["schedules".to_string(), String::new()])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.cal.com/v2/schedules/");

        let url = client
            .url_for(&["webhooks".to_string(), "a/b c".to_string()])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.cal.com/v2/webhooks/a%2Fb%20c");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(CalClient::new("not a url", Duration::from_secs(1)).is_err());
        assert!(CalClient::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_send_decodes_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/webhooks")
            .match_header("authorization", "tok")
            .match_query(Matcher::Exact("take=10".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","data":[]}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let request = RemoteRequest::get(ApiFamily::Webhooks, &["webhooks"]).query_opt("take", Some(10));
        let value = credential::scope(AuthToken::new("tok"), client.send(request))
            .await
            .unwrap();

        assert_eq!(value["status"], "success");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_maps_404_for_lookup() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/webhooks/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = client(&server.url());
        let request = RemoteRequest::get(ApiFamily::Webhooks, &["webhooks", "missing"])
            .action("get webhook")
            .lookup("Webhook", "missing");
        let err = credential::scope(AuthToken::new("tok"), client.send(request))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ToolError::NotFound {
                resource: "Webhook",
                id: "missing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_send_maps_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/webhooks")
            .with_status(404)
            .create_async()
            .await;

        let client = client(&server.url());
        let request = RemoteRequest::get(ApiFamily::Webhooks, &["webhooks"]).action("get webhooks");
        let err = credential::scope(AuthToken::new("tok"), client.send(request))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ToolError::Http {
                action: "get webhooks".to_string(),
                status: 404
            }
        );
    }

    #[tokio::test]
    async fn test_send_rejects_non_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/verified-resources/emails")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = client(&server.url());
        let request = RemoteRequest::get(ApiFamily::VerifiedResources, &["verified-resources", "emails"]);
        let err = credential::scope(AuthToken::new("tok"), client.send(request))
            .await
            .unwrap_err();

        assert_eq!(err, ToolError::Decode);
    }

    #[tokio::test]
    async fn test_send_empty_body_is_null() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/webhooks/1")
            .with_status(204)
            .create_async()
            .await;

        let client = client(&server.url());
        let request = RemoteRequest::delete(ApiFamily::Webhooks, &["webhooks", "1"]);
        let value = credential::scope(AuthToken::new("tok"), client.send(request))
            .await
            .unwrap();

        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_send_network_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = client(&format!("http://127.0.0.1:{}", port));
        let request = RemoteRequest::get(ApiFamily::Schedules, &["schedules", ""]).action("get schedules");
        let err = credential::scope(AuthToken::new("tok"), client.send(request))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Network { ref action, .. } if action == "get schedules"));
    }
}
