use crate::language::{self, Language};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use url::Url;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

/// Knobs sent with every completion request.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionSettings {
    pub base_url: Url,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionSettings {
    pub fn new(
        base_url: &str,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self, ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::TemperatureOutOfRange(temperature));
        }
        if max_tokens == 0 {
            return Err(ConfigError::ZeroMaxTokens);
        }
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            model,
            temperature,
            max_tokens,
        })
    }

    /// The hosted OpenAI endpoint with the fixed model and knobs.
    pub fn openai() -> Result<Self, ConfigError> {
        Self::new(
            DEFAULT_OPENAI_BASE_URL,
            DEFAULT_MODEL.to_owned(),
            DEFAULT_TEMPERATURE,
            DEFAULT_MAX_TOKENS,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: Url,
    pub anon_key: ApiKey,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DebounceInterval {
    pub quiet_ms: u64,
}

impl DebounceInterval {
    pub fn new(quiet_ms: u64) -> Result<Self, ConfigError> {
        if quiet_ms == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        Ok(Self { quiet_ms })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.quiet_ms)
    }
}

impl Default for DebounceInterval {
    fn default() -> Self {
        Self {
            quiet_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub openai_api_key: Option<ApiKey>,
    pub completion: CompletionSettings,
    pub supabase: Option<SupabaseConfig>,
    pub debounce: DebounceInterval,
    pub source_lang: &'static Language,
    pub target_lang: &'static Language,
}

impl AppConfig {
    /// Problems worth showing to the operator that still leave the app usable.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut out = Vec::new();
        if self.openai_api_key.is_none() {
            out.push(ConfigWarning::MissingApiKey);
        }
        if self.supabase.is_none() {
            out.push(ConfigWarning::AuthDisabled);
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigWarning {
    MissingApiKey,
    AuthDisabled,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => f.write_str("Please add your OpenAI API key to continue"),
            Self::AuthDisabled => f.write_str(
                "Supabase is not configured; sign-in is unavailable after the free translation",
            ),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("model must not be empty")]
    EmptyModel,
    #[error("temperature must be within 0.0..=2.0, got {0}")]
    TemperatureOutOfRange(f32),
    #[error("max tokens must be > 0")]
    ZeroMaxTokens,
    #[error("debounce interval must be > 0 ms")]
    ZeroDebounce,
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    #[error("{0} is set but {1} is missing")]
    IncompleteSupabase(&'static str, &'static str),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    // Url::join drops the last path segment unless it ends in '/'.
    let normalized = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })
}

pub fn resolve_language(name: &str) -> Result<&'static Language, ConfigError> {
    language::find(name).ok_or_else(|| ConfigError::UnknownLanguage(name.to_owned()))
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            // An exported-but-empty variable counts as absent.
            Some(v) if v.trim().is_empty() => Ok(None),
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

/// Both halves of the Supabase config must be present, or neither.
pub fn resolve_supabase(
    cli_url: Option<String>,
    cli_anon_key: Option<String>,
    env: &impl Env,
) -> Result<Option<SupabaseConfig>, ConfigError> {
    let url = resolve_optional_string(cli_url, ENV_SUPABASE_URL, env)
        .filter(|v| !v.trim().is_empty());
    let anon_key = resolve_api_key(cli_anon_key, ENV_SUPABASE_ANON_KEY, env)?;
    match (url, anon_key) {
        (Some(url), Some(anon_key)) => Ok(Some(SupabaseConfig {
            url: parse_base_url(&url)?,
            anon_key,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::IncompleteSupabase(
            ENV_SUPABASE_URL,
            ENV_SUPABASE_ANON_KEY,
        )),
        (None, Some(_)) => Err(ConfigError::IncompleteSupabase(
            ENV_SUPABASE_ANON_KEY,
            ENV_SUPABASE_URL,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_cli_takes_precedence_over_env() {
        let env = MapEnv::default().with_var(ENV_OPENAI_API_KEY, "env-key");
        let key = resolve_api_key(Some("cli-key".to_owned()), ENV_OPENAI_API_KEY, &env)
            .expect("valid key")
            .expect("present");
        assert_eq!(key.expose(), "cli-key");
    }

    #[test]
    fn api_key_env_used_when_cli_missing() {
        let env = MapEnv::default().with_var(ENV_OPENAI_API_KEY, "env-key");
        let key = resolve_api_key(None, ENV_OPENAI_API_KEY, &env)
            .expect("valid key")
            .expect("present");
        assert_eq!(key.expose(), "env-key");
    }

    #[test]
    fn empty_env_key_is_treated_as_missing() {
        let env = MapEnv::default().with_var(ENV_OPENAI_API_KEY, "  ");
        assert_eq!(resolve_api_key(None, ENV_OPENAI_API_KEY, &env), Ok(None));
    }

    #[test]
    fn empty_cli_key_is_rejected() {
        let env = MapEnv::default();
        assert_eq!(
            resolve_api_key(Some(String::new()), ENV_OPENAI_API_KEY, &env),
            Err(ConfigError::EmptyApiKey)
        );
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-secret").expect("valid");
        assert!(!format!("{key:?}").contains("sk-secret"));
    }

    #[test]
    fn missing_key_yields_warning_not_error() {
        let cfg = AppConfig {
            openai_api_key: None,
            completion: CompletionSettings::openai().expect("defaults are valid"),
            supabase: None,
            debounce: DebounceInterval::default(),
            source_lang: language::default_source(),
            target_lang: language::default_target(),
        };
        let warnings = cfg.warnings();
        assert!(warnings.contains(&ConfigWarning::MissingApiKey));
        assert_eq!(
            ConfigWarning::MissingApiKey.to_string(),
            "Please add your OpenAI API key to continue"
        );
    }

    #[test]
    fn debounce_interval_rejects_zero() {
        assert_eq!(DebounceInterval::new(0), Err(ConfigError::ZeroDebounce));
        assert_eq!(
            DebounceInterval::default().duration(),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn completion_defaults_match_fixed_knobs() {
        let s = CompletionSettings::openai().expect("defaults are valid");
        assert_eq!(s.model, "gpt-4o-mini");
        assert_eq!(s.temperature, 0.3);
        assert_eq!(s.max_tokens, 2048);
        assert_eq!(
            s.base_url.join("chat/completions").expect("join").as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn completion_settings_validate_temperature() {
        let err = CompletionSettings::new(DEFAULT_OPENAI_BASE_URL, "m".into(), 3.5, 10)
            .expect_err("out of range");
        assert_eq!(err, ConfigError::TemperatureOutOfRange(3.5));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("http://localhost:8080/v1").expect("valid");
        assert_eq!(url.as_str(), "http://localhost:8080/v1/");
    }

    #[test]
    fn supabase_requires_both_halves() {
        let env = MapEnv::default().with_var(ENV_SUPABASE_URL, "https://x.supabase.co");
        assert_eq!(
            resolve_supabase(None, None, &env),
            Err(ConfigError::IncompleteSupabase(
                ENV_SUPABASE_URL,
                ENV_SUPABASE_ANON_KEY
            ))
        );

        let env = env.with_var(ENV_SUPABASE_ANON_KEY, "anon");
        let cfg = resolve_supabase(None, None, &env)
            .expect("valid")
            .expect("present");
        assert_eq!(cfg.url.as_str(), "https://x.supabase.co/");
        assert_eq!(cfg.anon_key.expose(), "anon");
    }

    #[test]
    fn supabase_absent_disables_auth() {
        let env = MapEnv::default();
        assert_eq!(resolve_supabase(None, None, &env), Ok(None));
    }

    #[test]
    fn resolve_string_with_default_cli_takes_precedence() {
        let env = MapEnv::default().with_var(ENV_OPENAI_BASE_URL, "env");
        let v =
            resolve_string_with_default(Some("cli".to_owned()), ENV_OPENAI_BASE_URL, &env, "def");
        assert_eq!(v, "cli");
    }

    #[test]
    fn resolve_string_with_default_default_used_when_both_missing() {
        let env = MapEnv::default();
        let v = resolve_string_with_default(None, ENV_OPENAI_BASE_URL, &env, "def");
        assert_eq!(v, "def");
    }

    #[test]
    fn unknown_language_is_an_error() {
        assert_eq!(
            resolve_language("COBOL-2099"),
            Err(ConfigError::UnknownLanguage("COBOL-2099".into()))
        );
        assert_eq!(resolve_language("python").expect("known").name, "Python");
    }
}
