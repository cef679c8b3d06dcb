use serde::{Deserialize, Serialize};
use std::time::Duration;
use terrabot_core::{CompletionService, Error, Result, Translator, CEBUANO};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const TRANSLATION_MAX_TOKENS: u64 = 300;

/// Chat-completions client for any OpenAI-compatible endpoint.
///
/// Serves as both the completion fallback and the translator; the two may use different
/// models.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    translation_model: String,
    timeout: Duration,
}

impl OpenAiCompatClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            translation_model: model.to_string(),
            timeout: Duration::from_millis(60_000),
        }
    }

    pub fn with_translation_model(mut self, model: impl Into<String>) -> Self {
        self.translation_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint_chat_completions(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// One user turn, no system prompt. Errors are plain strings; callers pick the variant.
    async fn chat(
        &self,
        model: &str,
        user: &str,
        max_tokens: Option<u64>,
    ) -> std::result::Result<String, String> {
        let req = ChatCompletionsRequest {
            model: model.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: user.to_string(),
            }],
            max_tokens,
            stream: Some(false),
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb.json(&req).send().await.map_err(|e| e.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("chat.completions HTTP {status}"));
        }
        let parsed: ChatCompletionsResponse = resp.json().await.map_err(|e| e.to_string())?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "chat.completions returned no content".to_string())
    }
}

pub fn translation_prompt(text: &str, target: &str) -> String {
    let language = match target {
        CEBUANO => "Cebuano (Bisaya)",
        "en" => "English",
        other => other,
    };
    format!("Translate the following English text to {language}: '{text}'")
}

#[async_trait::async_trait]
impl CompletionService for OpenAiCompatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(&self.model, prompt, None)
            .await
            .map_err(Error::Completion)
    }
}

#[async_trait::async_trait]
impl Translator for OpenAiCompatClient {
    async fn translate(&self, text: &str, target: &str) -> Result<String> {
        self.chat(
            &self.translation_model,
            &translation_prompt(text, target),
            Some(TRANSLATION_MAX_TOKENS),
        )
        .await
        .map_err(Error::Translate)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}
