//! Per-request credential scoping.
//!
//! Every inbound request (or long-lived connection) runs inside a
//! [`scope`] carrying the caller's Cal.com token. Code anywhere below the
//! transport layer reads it back with [`current`] without the token being
//! passed through function signatures.
//!
//! The value lives in tokio task-local storage, so two requests in flight on
//! the same process never observe each other's token. Leaving the scope
//! restores the previous value on every exit path: normal completion, error,
//! panic, and the future being dropped because the client went away.
//!
//! Work spawned onto a new task does not inherit the scope. Re-enter it with
//! [`scope`] and the token obtained from [`current`] before spawning.

use std::fmt;
use std::future::Future;

tokio::task_local! {
    static AUTH_TOKEN: Option<AuthToken>;
}

/// Opaque bearer credential forwarded to the Cal.com API.
///
/// Empty strings are not tokens: [`AuthToken::new`] returns `None` for them,
/// so "absent" and "empty" are indistinguishable downstream.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw header value, treating empty or whitespace-only input as absent
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// The token exactly as the caller supplied it
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Run `fut` with `token` as the active credential.
///
/// The previous credential (normally none) is restored when `fut` finishes or
/// is dropped.
pub async fn scope<F>(token: Option<AuthToken>, fut: F) -> F::Output
where
    F: Future,
{
    AUTH_TOKEN.scope(token, fut).await
}

/// Synchronous counterpart of [`scope`].
pub fn sync_scope<F, R>(token: Option<AuthToken>, f: F) -> R
where
    F: FnOnce() -> R,
{
    AUTH_TOKEN.sync_scope(token, f)
}

/// The credential for the current request, or `None` outside any scope.
pub fn current() -> Option<AuthToken> {
    AUTH_TOKEN.try_with(|token| token.clone()).ok().flatten()
}

/// Build the scoped credential from a raw inbound header value.
pub fn from_header(value: Option<&str>) -> Option<AuthToken> {
    value.and_then(AuthToken::new)
}
