use crate::auth::{AuthEvent, Session};
use serde::Serialize;

/// What the UI knows about sign-in: presence plus an email to display.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Unknown,
    Anonymous,
    Authenticated {
        email: String,
    },
}

impl AuthState {
    pub fn from_session(session: Option<&Session>) -> Self {
        match session {
            Some(s) => Self::Authenticated {
                email: s.user.email.clone().unwrap_or_default(),
            },
            None => Self::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Authenticated { email } => Some(email),
            _ => None,
        }
    }
}

/// Local cache of the provider's session.
#[derive(Clone, Debug, Default)]
pub struct SessionMirror {
    state: AuthState,
}

impl SessionMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, session: Option<&Session>) -> &AuthState {
        self.state = AuthState::from_session(session);
        &self.state
    }

    pub fn apply(&mut self, event: &AuthEvent) -> &AuthState {
        self.state = AuthState::from_session(event.session.as_ref());
        &self.state
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn email(&self) -> Option<&str> {
        self.state.email()
    }
}
