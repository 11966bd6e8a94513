//! Cloud transcription through an OpenAI-compatible chat-completions endpoint.
//!
//! The image travels inline as a `data:` URL next to the caller's prompt; the model's reply is the
//! transcription.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::CloudTranscriber;
use crate::error::{BackendError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 1500;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the API base URL (for proxies and compatible servers).
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Configuration for [`OpenAiTranscriber`].
#[derive(Clone)]
pub struct OpenAiConfig {
    /// `None` leaves the transcriber in the "not ready" state.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,

    /// HTTP timeout for a single request.
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiConfig {
    /// Read credentials from the environment.
    ///
    /// A `.env` file in the working directory is loaded first (without overriding variables that
    /// are already set). A missing key is not an error here: the transcriber simply reports itself
    /// as not ready.
    pub fn from_env() -> Self {
        load_dotenv(Path::new(".env"));

        let api_key = non_empty_var(API_KEY_ENV);
        if api_key.is_none() {
            warn!(
                var = API_KEY_ENV,
                "no API key found; cloud transcription is unavailable"
            );
        }

        Self {
            api_key,
            base_url: non_empty_var(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn load_dotenv(path: &Path) {
    if !path.exists() {
        debug!(path = %path.display(), "no .env file; using process environment only");
        return;
    }

    match dotenvy::from_path(path) {
        Ok(()) => info!(path = %path.display(), "loaded environment variables"),
        Err(err) => warn!(path = %path.display(), error = %err, "failed to load .env file"),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Cloud transcriber backed by a chat-completions API.
pub struct OpenAiTranscriber {
    client: Client,
    cfg: OpenAiConfig,
}

impl OpenAiTranscriber {
    pub fn new(cfg: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("scrivener/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, cfg })
    }

    /// Build a transcriber configured from the environment (see [`OpenAiConfig::from_env`]).
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env())
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.cfg
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'))
    }
}

impl CloudTranscriber for OpenAiTranscriber {
    fn is_ready(&self) -> bool {
        self.cfg.api_key.is_some()
    }

    fn transcribe(&self, image: &Path, prompt: &str) -> Result<String> {
        let Some(api_key) = self.cfg.api_key.as_deref() else {
            return Err(BackendError::NotConfigured.into());
        };

        let image_url = image_data_uri(image)
            .map_err(|err| BackendError::CloudTranscription(format!("{err:#}")))?;
        let body = request_body(&self.cfg.model, prompt, image_url, self.cfg.max_tokens)?;

        info!(
            image = %image.display(),
            model = %self.cfg.model,
            "requesting cloud transcription"
        );

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|err| BackendError::CloudTranscription(format!("request failed: {err}")))?;

        let status = resp.status();
        let text = resp.text().map_err(|err| {
            BackendError::MalformedResponse(format!("failed to read response body: {err}"))
        })?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text).into());
        }

        let transcription = extract_transcription(&text)?;
        debug!(chars = transcription.chars().count(), "cloud transcription received");
        Ok(transcription)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

fn request_body(model: &str, prompt: &str, image_url: String, max_tokens: u32) -> Result<Vec<u8>> {
    let request = ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text { text: prompt },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url },
                },
            ],
        }],
        max_tokens,
    };
    Ok(serde_json::to_vec(&request)?)
}

/// Map a non-success HTTP status onto a backend error.
fn status_error(status: u16, body: &str) -> BackendError {
    let message = api_error_message(body);
    match status {
        400 => BackendError::BadRequest(message),
        401 | 403 => BackendError::Authentication(message),
        404 => BackendError::NotFound(message),
        429 => BackendError::RateLimited(message),
        _ => BackendError::Api { status, message },
    }
}

fn api_error_message(body: &str) -> String {
    if let Some(message) = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.message)
    {
        return message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    crate::prompt::preview(trimmed, 200)
}

/// Pull the transcription out of a chat-completions response body.
fn extract_transcription(body: &str) -> std::result::Result<String, BackendError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|err| BackendError::MalformedResponse(format!("invalid JSON: {err}")))?;

    let Some(choice) = response.choices.into_iter().next() else {
        return Err(BackendError::MalformedResponse(
            "response contains no choices".to_string(),
        ));
    };

    let content = choice
        .message
        .and_then(|m| m.content)
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty());

    match (content, choice.finish_reason) {
        (Some(text), _) => Ok(text),
        (None, Some(reason)) => Err(BackendError::MalformedResponse(format!(
            "no message content (finish_reason: {reason})"
        ))),
        (None, None) => Err(BackendError::MalformedResponse(
            "no message content".to_string(),
        )),
    }
}

/// Read an image and wrap it as a `data:image/<fmt>;base64,...` URL.
fn image_data_uri(path: &Path) -> anyhow::Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image '{}'", path.display()))?;

    let format = sniff_image_format(&bytes)
        .or_else(|| format_from_extension(path))
        .unwrap_or("jpeg");

    let encoded = STANDARD.encode(&bytes);
    debug!(
        image = %path.display(),
        format,
        encoded_len = encoded.len(),
        "encoded image"
    );
    Ok(format!("data:image/{format};base64,{encoded}"))
}

fn sniff_image_format(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        [b'B', b'M', ..] => Some("bmp"),
        _ => None,
    }
}

fn format_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("jpeg"),
        "png" => Some("png"),
        "gif" => Some("gif"),
        "bmp" => Some("bmp"),
        "webp" => Some("webp"),
        _ => None,
    }
}
