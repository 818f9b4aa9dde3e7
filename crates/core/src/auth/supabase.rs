use crate::auth::{
    AuthError, AuthEvent, AuthEventKind, AuthProvider, AuthSubscription, Session, User,
    EVENT_CAPACITY,
};
use crate::config::SupabaseConfig;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use url::Url;

const LOG_TARGET: &str = "auth::supabase";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Email/password auth against a hosted Supabase (GoTrue) backend.
///
/// The session lives in memory for the life of the process. Every change is
/// broadcast to subscribers.
#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    config: SupabaseConfig,
    state: Arc<SupabaseState>,
}

struct SupabaseState {
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    PendingConfirmation(User),
}

impl SupabaseAuth {
    pub fn new(config: SupabaseConfig) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            client,
            config,
            state: Arc::new(SupabaseState {
                session: Mutex::new(None),
                events,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.config
            .url
            .join(path)
            .map_err(|e| AuthError::InvalidResponse(format!("bad endpoint {path}: {e}")))
    }

    fn with_api_key(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", self.config.anon_key.expose())
    }

    async fn replace_session(&self, kind: AuthEventKind, session: Option<Session>) {
        *self.state.session.lock().await = session.clone();
        // No receivers is fine: nobody is mirroring yet.
        let _ = self.state.events.send(AuthEvent { kind, session });
    }
}

async fn rejected(response: Response) -> AuthError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    AuthError::Rejected {
        status,
        message: error_message(&body).unwrap_or_else(|| format!("HTTP {status}")),
    }
}

/// GoTrue is inconsistent about which field carries the human-readable error.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
        .map(str::to_owned)
}

fn parse_sign_up(body: &str) -> Result<Option<Session>, AuthError> {
    match serde_json::from_str::<SignUpResponse>(body) {
        Ok(SignUpResponse::Session(session)) => Ok(Some(session)),
        Ok(SignUpResponse::PendingConfirmation(user)) => {
            tracing::debug!(target: LOG_TARGET, user_id = %user.id, "account awaits confirmation");
            Ok(None)
        }
        Err(e) => Err(AuthError::InvalidResponse(format!(
            "Failed to parse sign-up response: {e}"
        ))),
    }
}

impl AuthProvider for SupabaseAuth {
    fn is_enabled(&self) -> bool {
        true
    }

    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>> {
        async move { Ok(self.state.session.lock().await.clone()) }.boxed()
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.state.events.subscribe())
    }

    fn sign_in_with_password(
        &self,
        email: String,
        password: String,
    ) -> BoxFuture<'_, Result<Session, AuthError>> {
        async move {
            let mut url = self.endpoint("auth/v1/token")?;
            url.query_pairs_mut().append_pair("grant_type", "password");

            let response = self
                .with_api_key(self.client.post(url))
                .json(&Credentials {
                    email: &email,
                    password: &password,
                })
                .send()
                .await?;
            if !response.status().is_success() {
                let err = rejected(response).await;
                tracing::warn!(target: LOG_TARGET, error = %err, "sign-in rejected");
                return Err(err);
            }

            let session: Session = response.json().await.map_err(|e| {
                AuthError::InvalidResponse(format!("Failed to parse session: {e}"))
            })?;
            tracing::info!(target: LOG_TARGET, user_id = %session.user.id, "signed in");
            self.replace_session(AuthEventKind::SignedIn, Some(session.clone()))
                .await;
            Ok(session)
        }
        .boxed()
    }

    fn sign_up(
        &self,
        email: String,
        password: String,
    ) -> BoxFuture<'_, Result<Option<Session>, AuthError>> {
        async move {
            let url = self.endpoint("auth/v1/signup")?;
            let response = self
                .with_api_key(self.client.post(url))
                .json(&Credentials {
                    email: &email,
                    password: &password,
                })
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(rejected(response).await);
            }

            let body = response.text().await?;
            let session = parse_sign_up(&body)?;
            match &session {
                Some(s) => {
                    tracing::info!(target: LOG_TARGET, user_id = %s.user.id, "signed up");
                    self.replace_session(AuthEventKind::SignedIn, session.clone())
                        .await;
                }
                None => {
                    tracing::info!(target: LOG_TARGET, "sign-up pending email confirmation");
                }
            }
            Ok(session)
        }
        .boxed()
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        async move {
            let current = self.state.session.lock().await.clone();
            let Some(session) = current else {
                return Ok(());
            };

            let url = self.endpoint("auth/v1/logout")?;
            let response = self
                .with_api_key(self.client.post(url))
                .bearer_auth(session.access_token.expose())
                .send()
                .await?;

            let status = response.status();
            // An expired or already-revoked token still means we are signed out.
            if !status.is_success() && status.as_u16() != 401 && status.as_u16() != 404 {
                return Err(rejected(response).await);
            }

            tracing::info!(target: LOG_TARGET, "signed out");
            self.replace_session(AuthEventKind::SignedOut, None).await;
            Ok(())
        }
        .boxed()
    }
}
