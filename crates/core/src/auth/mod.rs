mod disabled;
mod mirror;
mod supabase;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use disabled::DisabledAuth;
pub use mirror::{AuthState, SessionMirror};
pub use supabase::SupabaseAuth;

const LOG_TARGET: &str = "auth";

/// Capacity of each provider's change-notification channel.
pub const EVENT_CAPACITY: usize = 16;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(**redacted**)")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("authentication is not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Live feed of session changes from a provider.
///
/// Dropping the subscription unsubscribes.
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    pub fn new(rx: broadcast::Receiver<AuthEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the provider has gone away.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                // Every event replaces the whole state, so skipped ones don't matter.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: LOG_TARGET, skipped, "auth subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

pub trait AuthProvider: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>>;

    fn subscribe(&self) -> AuthSubscription;

    fn sign_in_with_password(
        &self,
        email: String,
        password: String,
    ) -> BoxFuture<'_, Result<Session, AuthError>>;

    /// `Ok(None)` means the account exists but is waiting on email confirmation.
    fn sign_up(
        &self,
        email: String,
        password: String,
    ) -> BoxFuture<'_, Result<Option<Session>, AuthError>>;

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: AuthEventKind) -> AuthEvent {
        AuthEvent {
            kind,
            session: None,
        }
    }

    #[tokio::test]
    async fn subscription_skips_lagged_events() {
        let (tx, rx) = broadcast::channel(2);
        let mut sub = AuthSubscription::new(rx);
        tx.send(event(AuthEventKind::SignedOut)).expect("send");
        tx.send(event(AuthEventKind::SignedIn)).expect("send");
        tx.send(event(AuthEventKind::SignedOut)).expect("send");

        let first = sub.recv().await.expect("event");
        assert_eq!(first.kind, AuthEventKind::SignedIn);
        let second = sub.recv().await.expect("event");
        assert_eq!(second.kind, AuthEventKind::SignedOut);
    }

    #[tokio::test]
    async fn subscription_ends_when_provider_drops() {
        let (tx, rx) = broadcast::channel::<AuthEvent>(2);
        let mut sub = AuthSubscription::new(rx);
        drop(tx);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJhbGciOi");
        assert!(!format!("{token:?}").contains("eyJ"));
    }
}
