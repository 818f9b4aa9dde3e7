mod openai;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiTranslator;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslateRequest {
    pub code: String,
    pub from: String,
    pub to: String,
}

#[derive(thiserror::Error, Debug)]
pub enum TranslateError {
    #[error("no api key configured")]
    MissingApiKey,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("http error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// System prompt naming the source and target languages.
pub fn instruction(from: &str, to: &str) -> String {
    format!(
        "You are a code translator. Translate the provided code from {from} to {to}. \
         Only respond with the translated code, no explanations or additional text."
    )
}

pub trait Translator: Send + Sync {
    fn translate(&self, request: TranslateRequest) -> BoxFuture<'_, Result<String, TranslateError>>;
}
