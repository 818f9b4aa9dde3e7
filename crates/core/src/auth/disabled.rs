use crate::auth::{AuthError, AuthEvent, AuthProvider, AuthSubscription, Session, EVENT_CAPACITY};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Provider used when no auth backend is configured: everyone stays anonymous.
#[derive(Clone)]
pub struct DisabledAuth {
    // Held so subscriptions stay open instead of ending immediately.
    events: Arc<broadcast::Sender<AuthEvent>>,
}

impl DisabledAuth {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events: Arc::new(tx),
        }
    }
}

impl Default for DisabledAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for DisabledAuth {
    fn is_enabled(&self) -> bool {
        false
    }

    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>> {
        async { Ok(None) }.boxed()
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }

    fn sign_in_with_password(
        &self,
        _email: String,
        _password: String,
    ) -> BoxFuture<'_, Result<Session, AuthError>> {
        async { Err(AuthError::NotConfigured) }.boxed()
    }

    fn sign_up(
        &self,
        _email: String,
        _password: String,
    ) -> BoxFuture<'_, Result<Option<Session>, AuthError>> {
        async { Err(AuthError::NotConfigured) }.boxed()
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        async { Ok(()) }.boxed()
    }
}
