//! Client for an OpenAI-compatible generative API.
//!
//! Two endpoints are used: `chat/completions` for the writing assistant and
//! `images/generations` (with `b64_json` responses) for story covers.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
const DEFAULT_IMAGE_SIZE: &str = "1024x1792";
const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Chat completions can be slow for long stories.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success status from the provider.
    #[error("AI provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The provider answered 2xx but the body was not usable.
    #[error("Unexpected AI response: {0}")]
    InvalidResponse(String),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub image_size: String,
}

impl AiConfig {
    /// Load from `AI_API_KEY`, `AI_BASE_URL`, `AI_CHAT_MODEL`,
    /// `AI_IMAGE_MODEL` and `AI_IMAGE_SIZE`.
    ///
    /// Returns `None` when `AI_API_KEY` is unset.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("AI_API_KEY").ok().filter(|k| !k.is_empty())?;
        let var = |name: &str, default: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Some(Self {
            api_key,
            base_url: var("AI_BASE_URL", DEFAULT_BASE_URL),
            chat_model: var("AI_CHAT_MODEL", DEFAULT_CHAT_MODEL),
            image_model: var("AI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            image_size: var("AI_IMAGE_SIZE", DEFAULT_IMAGE_SIZE),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One message of a conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AiClient {
    http: reqwest::Client,
    config: AiConfig,
}

impl AiClient {
    pub fn new(config: AiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Run a chat completion and return the assistant's text.
    pub async fn chat(&self, messages: &[ChatTurn]) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages,
            temperature: DEFAULT_TEMPERATURE,
        };
        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let body: ChatResponse = check(response).await?.json().await?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::InvalidResponse("no choices in completion".into()))?;

        tracing::debug!(
            model = %self.config.chat_model,
            turns = messages.len(),
            reply_len = content.len(),
            "Chat completion finished"
        );
        Ok(content)
    }

    /// Generate one image and return its decoded bytes (PNG).
    pub async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, AiError> {
        let request = ImageRequest {
            model: &self.config.image_model,
            prompt,
            n: 1,
            size: &self.config.image_size,
            response_format: "b64_json",
        };
        let response = self
            .http
            .post(self.endpoint("images/generations"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let body: ImageResponse = check(response).await?.json().await?;

        let encoded = body
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| AiError::InvalidResponse("no image data in response".into()))?;

        let bytes = decode_image(&encoded)?;
        tracing::debug!(model = %self.config.image_model, bytes = bytes.len(), "Image generated");
        Ok(bytes)
    }
}

/// Decode a base64 image payload, tolerating a `data:` URL prefix.
fn decode_image(encoded: &str) -> Result<Vec<u8>, AiError> {
    let raw = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| AiError::InvalidResponse(format!("invalid base64 image: {e}")))
}

/// Map a non-success response to [`AiError::Upstream`], extracting the
/// provider's error message when present.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, AiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AiError::Upstream {
        status: status.as_u16(),
        message: upstream_message(&body),
    })
}

fn upstream_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect())
}
