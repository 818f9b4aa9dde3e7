//! Interactive terminal front end.
//!
//! Plain lines are appended to the source buffer, and every append counts as
//! one edit. Lines starting with `:` are commands. Start a line with `\` to
//! enter code that itself begins with `:`.

use code_translator_core::app::{AppSettings, CodeTranslatorApp, UserAction};
use code_translator_core::auth::{AuthProvider, AuthState, DisabledAuth, SupabaseAuth};
use code_translator_core::config::AppConfig;
use code_translator_core::language::{self, LANGUAGES};
use code_translator_core::state::{Notice, NoticeLevel, ViewState};
use code_translator_core::translate::OpenAiTranslator;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

const HELP: &str = "\
commands:
  :from <lang>               set the source language
  :to <lang>                 set the target language
  :langs                     list languages
  :undo                      drop the last source line
  :clear                     clear the source
  :show                      print the source buffer
  :signin                    open the sign-in prompt
  :signin <email> <password> sign in
  :signup <email> <password> create an account
  :signout                   sign out
  :dismiss                   close the sign-in prompt
  :help                      this text
  :quit                      exit
anything else is appended to the source";

#[derive(Debug, Default)]
struct SourceBuffer {
    lines: Vec<String>,
}

impl SourceBuffer {
    fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Send(UserAction),
    Print(String),
}

fn interpret(line: &str, buffer: &mut SourceBuffer) -> Outcome {
    if let Some(code) = line.strip_prefix('\\') {
        buffer.lines.push(code.to_owned());
        return Outcome::Send(UserAction::Edit(buffer.text()));
    }
    let Some(command) = line.strip_prefix(':') else {
        buffer.lines.push(line.to_owned());
        return Outcome::Send(UserAction::Edit(buffer.text()));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();
    match (name, rest.as_slice()) {
        ("from", [..]) | ("to", [..]) if !rest.is_empty() => {
            let query = rest.join(" ");
            match language::find(&query) {
                Some(lang) if name == "from" => Outcome::Send(UserAction::SetSourceLanguage(lang)),
                Some(lang) => Outcome::Send(UserAction::SetTargetLanguage(lang)),
                None => Outcome::Print(format!("unknown language: {query} (see :langs)")),
            }
        }
        ("langs", []) => Outcome::Print(
            LANGUAGES
                .iter()
                .map(|l| l.name)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        ("undo", []) => {
            buffer.lines.pop();
            Outcome::Send(UserAction::Edit(buffer.text()))
        }
        ("clear", []) => {
            buffer.lines.clear();
            Outcome::Send(UserAction::Edit(String::new()))
        }
        ("show", []) => Outcome::Print(buffer.text()),
        ("signin", []) => Outcome::Send(UserAction::OpenSignIn),
        ("signin", [email, password]) => Outcome::Send(UserAction::SignIn {
            email: (*email).to_owned(),
            password: (*password).to_owned(),
        }),
        ("signup", [email, password]) => Outcome::Send(UserAction::SignUp {
            email: (*email).to_owned(),
            password: (*password).to_owned(),
        }),
        ("signout", []) => Outcome::Send(UserAction::SignOut),
        ("dismiss", []) => Outcome::Send(UserAction::DismissSignIn),
        ("help", []) => Outcome::Print(HELP.to_owned()),
        ("quit", []) | ("q", []) => Outcome::Send(UserAction::Quit),
        _ => Outcome::Print(format!("unknown command :{command} (see :help)")),
    }
}

pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    for warning in cfg.warnings() {
        println!("! {warning}");
    }

    let translator = OpenAiTranslator::new(cfg.openai_api_key.clone(), cfg.completion.clone())?;
    let settings = AppSettings::from_config(&cfg);
    match cfg.supabase.clone() {
        Some(supabase) => session(translator, SupabaseAuth::new(supabase)?, settings).await,
        None => session(translator, DisabledAuth::new(), settings).await,
    }
}

async fn session<A>(
    translator: OpenAiTranslator,
    auth: A,
    settings: AppSettings,
) -> anyhow::Result<()>
where
    A: AuthProvider + Clone + 'static,
{
    let app = CodeTranslatorApp::new(translator, auth, settings);
    let (actions_tx, actions_rx) = mpsc::channel(32);
    let (view_tx, view_rx) = watch::channel(app.initial_view());
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();

    {
        let view = view_rx.borrow();
        println!(
            "{} -> {}   (:help for commands)",
            view.source_lang, view.target_lang
        );
    }

    let render = tokio::spawn(render_views(view_rx));
    let toasts = tokio::spawn(print_notices(notice_rx));
    let input = tokio::spawn(read_input(actions_tx));

    app.run(actions_rx, view_tx, notice_tx).await;

    input.await??;
    let _ = render.await;
    let _ = toasts.await;
    Ok(())
}

async fn read_input(actions: mpsc::Sender<UserAction>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer = SourceBuffer::default();
    while let Some(line) = lines.next_line().await? {
        match interpret(&line, &mut buffer) {
            Outcome::Print(text) => println!("{text}"),
            Outcome::Send(UserAction::Quit) => {
                let _ = actions.send(UserAction::Quit).await;
                break;
            }
            Outcome::Send(action) => {
                if actions.send(action).await.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn render_views(mut rx: watch::Receiver<ViewState>) {
    let mut prev = rx.borrow_and_update().clone();
    while rx.changed().await.is_ok() {
        let next = rx.borrow_and_update().clone();
        render_change(&prev, &next);
        prev = next;
    }
}

fn render_change(prev: &ViewState, next: &ViewState) {
    if prev.source_lang != next.source_lang || prev.target_lang != next.target_lang {
        println!("{} -> {}", next.source_lang, next.target_lang);
    }
    if prev.auth != next.auth {
        match &next.auth {
            AuthState::Authenticated { email } => println!("[auth] signed in as {email}"),
            AuthState::Anonymous if prev.auth.is_authenticated() => println!("[auth] anonymous"),
            _ => {}
        }
    }
    if !prev.is_translating && next.is_translating {
        println!("... translating");
    }
    if prev.translated_code != next.translated_code {
        if next.translated_code.is_empty() {
            println!("--- {} (cleared) ---", next.target_lang);
        } else {
            println!("--- {} ---", next.target_lang);
            println!("{}", next.translated_code);
            println!("---");
        }
    }
    if !prev.sign_in_open && next.sign_in_open {
        println!("{}", sign_in_hint(next));
    }
}

fn sign_in_hint(view: &ViewState) -> String {
    let lead = if view.free_used || view.is_translating {
        "Your free translation is used. "
    } else {
        ""
    };
    if view.auth_enabled {
        format!("{lead}Sign in to continue: :signin <email> <password> (or :signup)")
    } else {
        format!("{lead}Sign-in is not configured for this session.")
    }
}

async fn print_notices(mut rx: mpsc::UnboundedReceiver<Notice>) {
    while let Some(notice) = rx.recv().await {
        let tag = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        println!("[{tag}] {}", notice.message);
    }
}
