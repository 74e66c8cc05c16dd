//! # Page Composition
//!
//! Client for OpenAI-compatible chat-completion endpoints (hosted APIs,
//! Ollama, llama.cpp HTTP bindings) that turns an extracted page into a
//! freshly composed standalone HTML document.
//!
//! ## Features
//!
//! - Endpoint normalization to the `/v1/chat/completions` path (idempotent)
//! - Optional bearer authentication
//! - Low fixed sampling temperature for faithful output
//! - Rate-limit classification as a pure predicate on the error value
//! - Markdown code-fence stripping on the model reply
//!
//! ## Usage
//!
//! ```no_run
//! use refract_compose::{ComposeConfig, Composer};
//!
//! # async fn example(page: refract_scrape::ScrapedPage) -> Result<(), Box<dyn std::error::Error>> {
//! let composer = Composer::new(ComposeConfig {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3".to_string(),
//!     ..ComposeConfig::default()
//! });
//! if composer.available() {
//!     let html = composer.compose(&page).await?;
//!     println!("{html}");
//! }
//! # Ok(())
//! # }
//! ```

mod prompt;

pub use prompt::build_prompt;

use refract_scrape::ScrapedPage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result type alias for composition operations
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Default request timeout for composition calls.
pub const DEFAULT_COMPOSE_TIMEOUT: Duration = Duration::from_secs(55);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sampling temperature biasing the model toward deterministic, faithful
/// output.
const COMPOSE_TEMPERATURE: f32 = 0.2;

/// Error bodies are read up to this many bytes for the snippet.
const MAX_ERROR_BODY_BYTES: usize = 1024 * 1024;

const COMPLETIONS_SUFFIX: &str = "/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are an assistant that turns structured website data into clean, \
self-contained HTML pages without using Markdown code fences. Infer the purpose or theme of the \
content, tailor the layout accordingly, and preserve every piece of information and link without \
summarising or omitting details.";

/// Errors produced while composing a page.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// No endpoint is configured; the client is disabled.
    #[error("composer endpoint is not configured")]
    Unavailable,

    /// The request could not be completed (connect, timeout, read).
    #[error("post composer request: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("composer returned status {status}")]
    Http {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Body snippet, capped at a 1 MiB read.
        body: String,
    },

    /// The response body was not a chat-completion payload.
    #[error("decode composer response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The model reply was empty after sanitization.
    #[error("composer returned an empty page")]
    EmptyComposition,
}

impl ComposeError {
    /// Whether this error is a rate-limit response (HTTP 429).
    ///
    /// Pure predicate on the error value; the orchestrator uses it to pick
    /// the silent template fallback.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ComposeError::Http { status: 429, .. })
    }
}

/// Configuration for the composer client.
///
/// An empty `base_url` disables the client.
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    /// Endpoint base, e.g. `https://api.openai.com` or `http://localhost:11434/v1`.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Bearer credential; empty means no auth header.
    pub api_key: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: String::new(),
            api_key: String::new(),
            timeout: DEFAULT_COMPOSE_TIMEOUT,
        }
    }
}

fn create_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Talks to an OpenAI-compatible chat-completion endpoint.
pub struct Composer {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl Composer {
    /// Build a composer from `config`. An empty base URL yields a disabled
    /// client whose [`Composer::compose`] always fails with `Unavailable`.
    #[must_use]
    pub fn new(config: ComposeConfig) -> Self {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Self {
            base_url,
            model: config.model.trim().to_string(),
            api_key: config.api_key.trim().to_string(),
            client: create_http_client(config.timeout),
        }
    }

    /// Whether the client is configured and can be called.
    ///
    /// Callers must consult this before choosing the composed render path.
    #[must_use]
    pub fn available(&self) -> bool {
        !self.base_url.is_empty()
    }

    /// Ask the endpoint to turn `page` into a standalone HTML document.
    pub async fn compose(&self, page: &ScrapedPage) -> Result<String> {
        if !self.available() {
            return Err(ComposeError::Unavailable);
        }

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(page),
                },
            ],
            temperature: COMPOSE_TEMPERATURE,
        };

        let endpoint = completions_url(&self.base_url);
        tracing::debug!(endpoint = %endpoint, model = %self.model, "requesting composition");

        let mut builder = self.client.post(&endpoint).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            let body = read_error_snippet(response, MAX_ERROR_BODY_BYTES).await;
            return Err(ComposeError::Http { status, body });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_slice(&bytes).map_err(ComposeError::Decode)?;

        let html = sanitize_output(&parsed.first_message());
        if html.is_empty() {
            return Err(ComposeError::EmptyComposition);
        }

        Ok(html)
    }
}

/// Normalize a configured base into the full chat-completions endpoint.
///
/// A base already ending in the completions path is used as-is; a base
/// ending in the `/v1` segment gets only the completions suffix; anything
/// else gets both. Normalizing an already-normalized URL is a no-op.
#[must_use]
pub fn completions_url(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(COMPLETIONS_SUFFIX) {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/v1") {
        return format!("{trimmed}/chat/completions");
    }
    format!("{trimmed}{COMPLETIONS_SUFFIX}")
}

/// Strip a leading Markdown code fence (and optional `html` language tag)
/// from the model reply, truncating at the closing fence.
///
/// Replies without a fence are returned trimmed and otherwise unchanged.
#[must_use]
pub fn sanitize_output(content: &str) -> String {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    let rest = rest.trim_start();
    let rest = match rest.strip_prefix("html") {
        Some(tagged) => tagged.trim_start(),
        None => rest,
    };

    let rest = match rest.find("```") {
        Some(idx) => &rest[..idx],
        None => rest,
    };

    rest.trim().to_string()
}

/// Read the error body up to `cap` bytes. Read failures yield whatever was
/// received before the failure.
async fn read_error_snippet(mut response: reqwest::Response, cap: usize) -> String {
    let mut body: Vec<u8> = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let remaining = cap - body.len();
                if chunk.len() >= remaining {
                    body.extend_from_slice(&chunk[..remaining]);
                    break;
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

impl ChatCompletionResponse {
    /// Content of the first choice; empty when no choices are present.
    fn first_message(&self) -> String {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}
