use crate::auth::{AuthError, AuthProvider, Session, SessionMirror};
use crate::config::AppConfig;
use crate::debounce::Debouncer;
use crate::language::Language;
use crate::state::{Effect, Notice, RequestId, TranslatorState, ViewState};
use crate::translate::{TranslateError, Translator};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const LOG_TARGET: &str = "app";

/// Input from the front end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    Edit(String),
    SetSourceLanguage(&'static Language),
    SetTargetLanguage(&'static Language),
    OpenSignIn,
    DismissSignIn,
    SignIn { email: String, password: String },
    SignUp { email: String, password: String },
    SignOut,
    Quit,
}

#[derive(Debug)]
enum Completion {
    Translation {
        id: RequestId,
        result: Result<String, TranslateError>,
    },
    SignIn(Result<String, AuthError>),
    SignUp(Result<Option<String>, AuthError>),
    SignOut(Result<(), AuthError>),
}

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub debounce: Duration,
    pub source_lang: &'static Language,
    pub target_lang: &'static Language,
    pub credential_missing: bool,
}

impl AppSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            debounce: cfg.debounce.duration(),
            source_lang: cfg.source_lang,
            target_lang: cfg.target_lang,
            credential_missing: cfg.openai_api_key.is_none(),
        }
    }

    fn new_state(&self, auth_enabled: bool) -> TranslatorState {
        TranslatorState::new(
            self.source_lang,
            self.target_lang,
            auth_enabled,
            self.credential_missing,
        )
    }
}

pub struct CodeTranslatorApp<T, A> {
    translator: T,
    auth: A,
    settings: AppSettings,
}

fn session_email(session: &Session) -> String {
    session.user.email.clone().unwrap_or_default()
}

impl<T, A> CodeTranslatorApp<T, A>
where
    T: Translator + Clone + 'static,
    A: AuthProvider + Clone + 'static,
{
    pub fn new(translator: T, auth: A, settings: AppSettings) -> Self {
        Self {
            translator,
            auth,
            settings,
        }
    }

    /// What the screen shows before [`run`](Self::run) has processed anything.
    pub fn initial_view(&self) -> ViewState {
        self.settings.new_state(self.auth.is_enabled()).view()
    }

    /// Drives the UI until `Quit` arrives or the action channel closes.
    pub async fn run(
        &self,
        mut actions: mpsc::Receiver<UserAction>,
        view: watch::Sender<ViewState>,
        notices: mpsc::UnboundedSender<Notice>,
    ) {
        // Subscribe before fetching so a change in between is not lost.
        let mut subscription = self.auth.subscribe();
        let mut mirror = SessionMirror::new();
        let initial = match self.auth.get_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "initial session fetch failed");
                None
            }
        };

        let mut state = self.settings.new_state(self.auth.is_enabled());
        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(self.settings.debounce, settled_tx);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        let effects = state.on_auth_changed(mirror.initialize(initial.as_ref()).clone());
        self.execute(effects, &mut debouncer, &done_tx, &notices);
        view.send_replace(state.view());
        tracing::info!(target: LOG_TARGET, auth = ?mirror.state(), "session started");

        let mut auth_open = true;
        loop {
            let effects = tokio::select! {
                action = actions.recv() => match action {
                    None | Some(UserAction::Quit) => break,
                    Some(action) => Self::handle_action(&mut state, action),
                },
                Some(settled) = settled_rx.recv() => {
                    if debouncer.is_current(settled.ticket) {
                        state.on_settled(settled.value)
                    } else {
                        Vec::new()
                    }
                }
                Some(done) = done_rx.recv() => Self::handle_completion(&mut state, done),
                event = subscription.recv(), if auth_open => match event {
                    Some(event) => {
                        tracing::debug!(target: LOG_TARGET, kind = ?event.kind, "auth change");
                        state.on_auth_changed(mirror.apply(&event).clone())
                    }
                    None => {
                        tracing::warn!(target: LOG_TARGET, "auth provider closed its change feed");
                        auth_open = false;
                        Vec::new()
                    }
                },
            };
            self.execute(effects, &mut debouncer, &done_tx, &notices);
            view.send_replace(state.view());
        }

        debouncer.cancel_pending();
        subscription.unsubscribe();
        tracing::info!(target: LOG_TARGET, "session ended");
    }

    fn handle_action(state: &mut TranslatorState, action: UserAction) -> Vec<Effect> {
        match action {
            UserAction::Edit(text) => state.on_edit(text),
            UserAction::SetSourceLanguage(lang) => state.on_source_language(lang),
            UserAction::SetTargetLanguage(lang) => state.on_target_language(lang),
            UserAction::OpenSignIn => state.open_sign_in(),
            UserAction::DismissSignIn => state.dismiss_sign_in(),
            UserAction::SignIn { email, password } => state.request_sign_in(email, password),
            UserAction::SignUp { email, password } => state.request_sign_up(email, password),
            UserAction::SignOut => state.request_sign_out(),
            // Handled by the loop.
            UserAction::Quit => Vec::new(),
        }
    }

    fn handle_completion(state: &mut TranslatorState, done: Completion) -> Vec<Effect> {
        match done {
            Completion::Translation { id, result } => state.on_translation_finished(id, result),
            Completion::SignIn(result) => state.on_sign_in_finished(result),
            Completion::SignUp(result) => state.on_sign_up_finished(result),
            Completion::SignOut(result) => state.on_sign_out_finished(result),
        }
    }

    fn execute(
        &self,
        effects: Vec<Effect>,
        debouncer: &mut Debouncer<String>,
        done_tx: &mpsc::UnboundedSender<Completion>,
        notices: &mpsc::UnboundedSender<Notice>,
    ) {
        for effect in effects {
            match effect {
                Effect::Schedule(text) => {
                    debouncer.schedule(text);
                }
                Effect::CancelPending => debouncer.cancel_pending(),
                Effect::Translate { id, request } => {
                    tracing::debug!(
                        target: LOG_TARGET,
                        request = id.0,
                        from = %request.from,
                        to = %request.to,
                        "translation issued"
                    );
                    let translator = self.translator.clone();
                    self.spawn_completion(done_tx, async move {
                        let result = translator.translate(request).await;
                        Completion::Translation { id, result }
                    });
                }
                Effect::Notify(notice) => {
                    if notices.send(notice).is_err() {
                        tracing::debug!(target: LOG_TARGET, "notice dropped, no listener");
                    }
                }
                Effect::SignIn { email, password } => {
                    let auth = self.auth.clone();
                    self.spawn_completion(done_tx, async move {
                        let result = auth.sign_in_with_password(email, password).await;
                        Completion::SignIn(result.map(|s| session_email(&s)))
                    });
                }
                Effect::SignUp { email, password } => {
                    let auth = self.auth.clone();
                    self.spawn_completion(done_tx, async move {
                        let result = auth.sign_up(email, password).await;
                        Completion::SignUp(result.map(|s| s.as_ref().map(session_email)))
                    });
                }
                Effect::SignOut => {
                    let auth = self.auth.clone();
                    self.spawn_completion(done_tx, async move {
                        Completion::SignOut(auth.sign_out().await)
                    });
                }
            }
        }
    }

    fn spawn_completion<F>(&self, done_tx: &mpsc::UnboundedSender<Completion>, task: F)
    where
        F: std::future::Future<Output = Completion> + Send + 'static,
    {
        let tx = done_tx.clone();
        tokio::spawn(async move {
            // The loop may have ended while this was in flight.
            let _ = tx.send(task.await);
        });
    }
}
