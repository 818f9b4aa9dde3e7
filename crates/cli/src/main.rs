#![deny(warnings)]

mod repl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use code_translator_core::config::{
    resolve_api_key, resolve_language, resolve_string_with_default, resolve_supabase, AppConfig,
    CompletionSettings, DebounceInterval, Env, StdEnv, DEFAULT_DEBOUNCE_MS, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_TEMPERATURE, ENV_OPENAI_API_KEY,
    ENV_OPENAI_BASE_URL,
};
use code_translator_core::language::{self, LANGUAGES};
use code_translator_core::state::TRANSLATION_FAILED;
use code_translator_core::translate::{OpenAiTranslator, TranslateRequest, Translator};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "code-translator")]
#[command(about = "Translate source code between programming languages as you type")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Source language (name or editor key)
    #[arg(long, global = true)]
    from: Option<String>,

    /// Target language (name or editor key)
    #[arg(long, global = true)]
    to: Option<String>,

    #[arg(long)]
    openai_api_key: Option<String>,

    #[arg(long)]
    openai_base_url: Option<String>,

    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_MS)]
    debounce_ms: u64,

    #[arg(long)]
    supabase_url: Option<String>,

    #[arg(long)]
    supabase_anon_key: Option<String>,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported languages
    Languages,
    /// Translate a file (or stdin) once and print the result
    Translate { file: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;

    tracing::info!(
        from = %cfg.source_lang,
        to = %cfg.target_lang,
        model = %cfg.completion.model,
        auth = cfg.supabase.is_some(),
        "config loaded"
    );

    match args.command {
        Some(Command::Languages) => {
            print_languages();
            Ok(())
        }
        Some(Command::Translate { file }) => translate_once(&cfg, file).await,
        None => repl::run(cfg).await,
    }
}

fn print_languages() {
    for lang in LANGUAGES.iter() {
        println!("{:<12} {}", lang.name, lang.editor_key);
    }
}

async fn translate_once(cfg: &AppConfig, file: Option<PathBuf>) -> anyhow::Result<()> {
    for warning in cfg.warnings() {
        eprintln!("warning: {warning}");
    }

    let code = match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read stdin")?;
            buf
        }
    };
    if code.trim().is_empty() {
        return Ok(());
    }

    let translator = OpenAiTranslator::new(cfg.openai_api_key.clone(), cfg.completion.clone())?;
    let request = TranslateRequest {
        code,
        from: cfg.source_lang.name.to_owned(),
        to: cfg.target_lang.name.to_owned(),
    };
    match translator.translate(request).await {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "translation failed");
            anyhow::bail!(TRANSLATION_FAILED)
        }
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    // stdout carries translations; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: &Args, env: &impl Env) -> anyhow::Result<AppConfig> {
    let source_lang = match &args.from {
        Some(name) => resolve_language(name)?,
        None => language::default_source(),
    };
    let target_lang = match &args.to {
        Some(name) => resolve_language(name)?,
        None => language::default_target(),
    };

    let base_url = resolve_string_with_default(
        args.openai_base_url.clone(),
        ENV_OPENAI_BASE_URL,
        env,
        DEFAULT_OPENAI_BASE_URL,
    );
    let completion = CompletionSettings::new(
        &base_url,
        args.model.clone(),
        args.temperature,
        args.max_tokens,
    )?;

    Ok(AppConfig {
        openai_api_key: resolve_api_key(args.openai_api_key.clone(), ENV_OPENAI_API_KEY, env)?,
        completion,
        supabase: resolve_supabase(
            args.supabase_url.clone(),
            args.supabase_anon_key.clone(),
            env,
        )?,
        debounce: DebounceInterval::new(args.debounce_ms)?,
        source_lang,
        target_lang,
    })
}
