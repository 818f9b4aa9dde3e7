//! UI controller state and its per-event transitions.
//!
//! Transitions are synchronous and never touch I/O. Each one returns the
//! [`Effect`]s the runtime in [`crate::app`] must carry out.

use crate::auth::{AuthError, AuthState};
use crate::entitlement::{Admission, EntitlementGate};
use crate::language::Language;
use crate::translate::{TranslateError, TranslateRequest};
use serde::Serialize;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "state";

pub const TRANSLATION_FAILED: &str = "Translation failed. Please try again.";
pub const SIGNED_OUT: &str = "Signed out successfully";
pub const CONFIRM_EMAIL: &str = "Check your email to confirm your account";

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A transient toast.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Schedule(String),
    CancelPending,
    Translate {
        id: RequestId,
        request: TranslateRequest,
    },
    Notify(Notice),
    SignIn {
        email: String,
        password: String,
    },
    SignUp {
        email: String,
        password: String,
    },
    SignOut,
}

/// Everything a front end needs to draw the current screen.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ViewState {
    pub source_lang: Language,
    pub target_lang: Language,
    pub source_code: String,
    pub translated_code: String,
    pub is_translating: bool,
    pub sign_in_open: bool,
    pub auth: AuthState,
    pub auth_enabled: bool,
    pub free_used: bool,
    pub credential_missing: bool,
}

#[derive(Debug)]
pub struct TranslatorState {
    source_lang: &'static Language,
    target_lang: &'static Language,
    source_code: String,
    translated_code: String,
    sign_in_open: bool,
    auth: AuthState,
    auth_enabled: bool,
    credential_missing: bool,
    gate: EntitlementGate,
    in_flight: BTreeMap<RequestId, Admission>,
    last_issued: u64,
    // Only a response to this request may touch the output.
    current: Option<RequestId>,
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

impl TranslatorState {
    pub fn new(
        source_lang: &'static Language,
        target_lang: &'static Language,
        auth_enabled: bool,
        credential_missing: bool,
    ) -> Self {
        Self {
            source_lang,
            target_lang,
            source_code: String::new(),
            translated_code: String::new(),
            sign_in_open: false,
            auth: AuthState::Unknown,
            auth_enabled,
            credential_missing,
            gate: EntitlementGate::new(),
            in_flight: BTreeMap::new(),
            last_issued: 0,
            current: None,
        }
    }

    pub fn on_edit(&mut self, text: String) -> Vec<Effect> {
        self.source_code = text;
        if is_blank(&self.source_code) {
            self.clear_output();
            return vec![Effect::CancelPending];
        }
        vec![Effect::Schedule(self.source_code.clone())]
    }

    pub fn on_source_language(&mut self, lang: &'static Language) -> Vec<Effect> {
        self.source_lang = lang;
        self.reschedule()
    }

    pub fn on_target_language(&mut self, lang: &'static Language) -> Vec<Effect> {
        self.target_lang = lang;
        self.reschedule()
    }

    /// The debounce timer fired for `text`.
    pub fn on_settled(&mut self, text: String) -> Vec<Effect> {
        if is_blank(&text) {
            self.clear_output();
            return Vec::new();
        }

        let admission = self.gate.admit(&self.auth);
        if !admission.is_allowed() {
            tracing::debug!(target: LOG_TARGET, "free translation used, asking for sign-in");
            self.sign_in_open = true;
            return Vec::new();
        }

        self.last_issued += 1;
        let id = RequestId(self.last_issued);
        self.in_flight.insert(id, admission);
        self.current = Some(id);
        vec![Effect::Translate {
            id,
            request: TranslateRequest {
                code: text,
                from: self.source_lang.name.to_owned(),
                to: self.target_lang.name.to_owned(),
            },
        }]
    }

    pub fn on_translation_finished(
        &mut self,
        id: RequestId,
        result: Result<String, TranslateError>,
    ) -> Vec<Effect> {
        if let Some(admission) = self.in_flight.remove(&id) {
            self.gate.finish(admission, result.is_ok());
        }
        match result {
            Ok(text) => {
                if self.current == Some(id) {
                    self.translated_code = text;
                } else {
                    tracing::debug!(target: LOG_TARGET, request = id.0, "discarding stale translation");
                }
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, request = id.0, error = %e, "translation failed");
                vec![Effect::Notify(Notice::error(TRANSLATION_FAILED))]
            }
        }
    }

    pub fn on_auth_changed(&mut self, auth: AuthState) -> Vec<Effect> {
        let was_authenticated = self.auth.is_authenticated();
        self.auth = auth;
        if !was_authenticated && self.auth.is_authenticated() {
            self.sign_in_open = false;
            return self.reschedule();
        }
        Vec::new()
    }

    pub fn open_sign_in(&mut self) -> Vec<Effect> {
        self.sign_in_open = true;
        Vec::new()
    }

    pub fn dismiss_sign_in(&mut self) -> Vec<Effect> {
        self.sign_in_open = false;
        Vec::new()
    }

    pub fn request_sign_in(&mut self, email: String, password: String) -> Vec<Effect> {
        vec![Effect::SignIn { email, password }]
    }

    pub fn request_sign_up(&mut self, email: String, password: String) -> Vec<Effect> {
        vec![Effect::SignUp { email, password }]
    }

    pub fn request_sign_out(&mut self) -> Vec<Effect> {
        vec![Effect::SignOut]
    }

    /// `result` carries the signed-in email.
    pub fn on_sign_in_finished(&mut self, result: Result<String, AuthError>) -> Vec<Effect> {
        match result {
            Ok(email) => {
                self.sign_in_open = false;
                vec![Effect::Notify(Notice::success(format!(
                    "Signed in as {email}"
                )))]
            }
            Err(e) => vec![Effect::Notify(Notice::error(format!("Sign in failed: {e}")))],
        }
    }

    /// `Ok(None)` means the account awaits email confirmation.
    pub fn on_sign_up_finished(&mut self, result: Result<Option<String>, AuthError>) -> Vec<Effect> {
        match result {
            Ok(Some(email)) => {
                self.sign_in_open = false;
                vec![Effect::Notify(Notice::success(format!(
                    "Signed up as {email}"
                )))]
            }
            Ok(None) => vec![Effect::Notify(Notice::info(CONFIRM_EMAIL))],
            Err(e) => vec![Effect::Notify(Notice::error(format!("Sign up failed: {e}")))],
        }
    }

    pub fn on_sign_out_finished(&mut self, result: Result<(), AuthError>) -> Vec<Effect> {
        match result {
            Ok(()) => vec![Effect::Notify(Notice::success(SIGNED_OUT))],
            Err(e) => vec![Effect::Notify(Notice::error(format!("Sign out failed: {e}")))],
        }
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            source_lang: *self.source_lang,
            target_lang: *self.target_lang,
            source_code: self.source_code.clone(),
            translated_code: self.translated_code.clone(),
            is_translating: !self.in_flight.is_empty(),
            sign_in_open: self.sign_in_open,
            auth: self.auth.clone(),
            auth_enabled: self.auth_enabled,
            free_used: self.gate.free_used(),
            credential_missing: self.credential_missing,
        }
    }

    fn reschedule(&self) -> Vec<Effect> {
        if is_blank(&self.source_code) {
            return Vec::new();
        }
        vec![Effect::Schedule(self.source_code.clone())]
    }

    fn clear_output(&mut self) {
        self.translated_code.clear();
        self.current = None;
    }
}
