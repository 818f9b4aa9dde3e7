use crate::config::{ApiKey, CompletionSettings};
use crate::translate::{instruction, TranslateError, TranslateRequest, Translator};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const LOG_TARGET: &str = "translate::openai";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat-completions client. One request per translation, never retried.
#[derive(Clone)]
pub struct OpenAiTranslator {
    client: Client,
    api_key: Option<ApiKey>,
    settings: CompletionSettings,
}

impl OpenAiTranslator {
    pub fn new(api_key: Option<ApiKey>, settings: CompletionSettings) -> Result<Self, TranslateError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            settings,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

fn build_body<'a>(
    settings: &'a CompletionSettings,
    system: &'a str,
    code: &'a str,
) -> ChatRequest<'a> {
    ChatRequest {
        model: &settings.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: code,
            },
        ],
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    }
}

fn parse_completion(body: &str) -> Result<String, TranslateError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| TranslateError::InvalidResponse(format!("Failed to parse JSON: {e}")))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TranslateError::InvalidResponse("No choices in response".to_string()))?;
    Ok(choice.message.content.unwrap_or_default())
}

impl Translator for OpenAiTranslator {
    fn translate(&self, request: TranslateRequest) -> BoxFuture<'_, Result<String, TranslateError>> {
        async move {
            let api_key = self.api_key.as_ref().ok_or(TranslateError::MissingApiKey)?;
            let url = self
                .settings
                .base_url
                .join("chat/completions")
                .map_err(|e| TranslateError::InvalidResponse(format!("bad endpoint: {e}")))?;

            let system = instruction(&request.from, &request.to);
            let body = build_body(&self.settings, &system, &request.code);

            tracing::debug!(
                target: LOG_TARGET,
                from = %request.from,
                to = %request.to,
                chars = request.code.len(),
                model = %self.settings.model,
                "sending completion request"
            );

            let response = self
                .client
                .post(url)
                .bearer_auth(api_key.expose())
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(target: LOG_TARGET, error = %e, "completion request failed");
                    TranslateError::Network(e)
                })?;

            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                tracing::error!(target: LOG_TARGET, status = status.as_u16(), "completion api error");
                return Err(TranslateError::Api {
                    status: status.as_u16(),
                    body: text,
                });
            }

            parse_completion(&text)
        }
        .boxed()
    }
}
