// ABOUTME: Model provider abstraction for the deckgen application
// ABOUTME: Streaming event types, usage conventions and provider construction

use crate::anthropic::AnthropicProvider;
use crate::config::Config;
use crate::errors::{DeckError, Result};
use crate::openai::OpenAiProvider;
use crate::sse::BoxEventStream;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

/// Token counts carried by a single usage event. `None` means the event did
/// not report that direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// One decoded event from a model stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta(String),
    Usage(TokenUsage),
    Done,
}

/// How a provider's usage events combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageSemantics {
    /// Each event carries the current total; the last value wins.
    Latest,
    /// Each event carries a delta that is added to the running count.
    Additive,
}

/// A single completion request.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    fn usage_semantics(&self) -> UsageSemantics;

    /// Whether the credential was supplied by the caller (bring-your-own-key).
    fn has_custom_key(&self) -> bool;

    /// Start a streamed completion.
    async fn stream(&self, request: &ModelRequest) -> Result<BoxEventStream<StreamEvent>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Anthropic => "claude-3-5-sonnet-latest",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(DeckError::ConfigError(format!("Unknown provider: {}", other))),
        }
    }
}

/// API credential plus whether it belongs to the caller.
#[derive(Debug, Clone)]
pub struct Credential {
    pub api_key: String,
    pub custom: bool,
}

/// Build the configured provider. A caller-supplied key takes precedence over
/// the platform key from the environment and marks the generation as free.
pub fn build_provider(
    config: &Config,
    kind: ProviderKind,
    custom_key: Option<String>,
) -> Result<Arc<dyn ModelProvider>> {
    let platform_key = match kind {
        ProviderKind::OpenAi => config.openai_api_key.clone(),
        ProviderKind::Anthropic => config.anthropic_api_key.clone(),
    };

    let credential = match (custom_key, platform_key) {
        (Some(key), _) if !key.is_empty() => Credential {
            api_key: key,
            custom: true,
        },
        (_, Some(key)) if !key.is_empty() => Credential {
            api_key: key,
            custom: false,
        },
        _ => {
            return Err(DeckError::ConfigError(format!(
                "No API key configured for {:?}",
                kind
            )))
        }
    };

    let client = config.http_client()?;
    Ok(match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
            client,
            config.openai_base_url.clone(),
            credential,
        )),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            client,
            config.anthropic_base_url.clone(),
            credential,
        )),
    })
}

/// Read the body of a failed response into an `ApiError`.
pub(crate) async fn api_error(response: reqwest::Response) -> DeckError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
    DeckError::ApiError { status, message }
}
