//! Description of a single outbound Cal.com call.

use reqwest::Method;
use serde_json::Value;

/// Which Cal.com API family a call belongs to.
///
/// The family decides the extra headers sent next to `Authorization`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFamily {
    /// `/schedules`, pinned to a dated API version
    Schedules,
    /// `/verified-resources/{emails,phones}`
    VerifiedResources,
    /// `/webhooks`
    Webhooks,
}

impl ApiFamily {
    /// Value of the `cal-api-version` header, if this family pins one
    pub fn api_version(self) -> Option<&'static str> {
        match self {
            ApiFamily::Schedules => Some("2024-06-11"),
            ApiFamily::VerifiedResources | ApiFamily::Webhooks => None,
        }
    }

    /// Whether the family expects an explicit JSON content type on every call
    pub fn sends_content_type(self) -> bool {
        matches!(self, ApiFamily::Webhooks)
    }
}

/// Identifies the resource a by-ID call targets, so a 404 can name it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub resource: &'static str,
    pub id: String,
}

/// One outbound request: method, path, query, body, and error context.
#[derive(Debug, Clone)]
pub struct RemoteRequest {
    pub method: Method,
    pub family: ApiFamily,
    pub segments: Vec<String>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
    pub action: String,
    pub lookup: Option<Lookup>,
}

impl RemoteRequest {
    /// Create a request for the path made of `segments` below the base URL.
    ///
    /// A trailing empty segment produces a trailing slash.
    pub fn new(method: Method, family: ApiFamily, segments: &[&str]) -> Self {
        Self {
            method,
            family,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            body: None,
            action: "complete the Cal.com request".to_string(),
            lookup: None,
        }
    }

    pub fn get(family: ApiFamily, segments: &[&str]) -> Self {
        Self::new(Method::GET, family, segments)
    }

    pub fn post(family: ApiFamily, segments: &[&str]) -> Self {
        Self::new(Method::POST, family, segments)
    }

    pub fn patch(family: ApiFamily, segments: &[&str]) -> Self {
        Self::new(Method::PATCH, family, segments)
    }

    pub fn delete(family: ApiFamily, segments: &[&str]) -> Self {
        Self::new(Method::DELETE, family, segments)
    }

    /// Human description used in error messages ("get webhooks")
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Add a query parameter; `None` leaves the query untouched
    pub fn query_opt(mut self, name: &'static str, value: Option<i64>) -> Self {
        if let Some(value) = value {
            self.query.push((name, value.to_string()));
        }
        self
    }

    /// Attach a JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Mark this as a lookup of `resource` by `id`
    pub fn lookup(mut self, resource: &'static str, id: impl Into<String>) -> Self {
        self.lookup = Some(Lookup {
            resource,
            id: id.into(),
        });
        self
    }
}
