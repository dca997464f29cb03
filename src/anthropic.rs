// ABOUTME: Anthropic messages adapter for the deckgen application
// ABOUTME: Streams message events and reports usage as running totals

use crate::errors::{DeckError, Result};
use crate::provider::{
    api_error, Credential, ModelProvider, ModelRequest, StreamEvent, TokenUsage, UsageSemantics,
};
use crate::sse::{self, BoxEventStream};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::{json, Value};
use url::Url;

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: Url,
    credential: Credential,
}

impl AnthropicProvider {
    pub fn new(client: reqwest::Client, base_url: Url, credential: Credential) -> Self {
        Self {
            client,
            base_url,
            credential,
        }
    }

    fn request_body(request: &ModelRequest) -> Value {
        json!({
            "model": request.model,
            "system": request.system,
            "messages": [
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": true,
        })
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    // message_start reports input tokens, each message_delta the output so far.
    fn usage_semantics(&self) -> UsageSemantics {
        UsageSemantics::Latest
    }

    fn has_custom_key(&self) -> bool {
        self.credential.custom
    }

    async fn stream(&self, request: &ModelRequest) -> Result<BoxEventStream<StreamEvent>> {
        let endpoint = self
            .base_url
            .join("v1/messages")
            .map_err(|e| DeckError::ConfigError(format!("Invalid Anthropic base URL: {}", e)))?;

        info!("Requesting Anthropic completion with model {}", request.model);
        let response = self
            .client
            .post(endpoint)
            .header("x-api-key", &self.credential.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&Self::request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(sse::decode_stream(response.bytes_stream(), parse_event))
    }
}

/// Map one messages-API SSE payload to stream events.
pub fn parse_event(data: &str) -> Result<Vec<StreamEvent>> {
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            warn!("Skipping unparseable Anthropic stream payload: {}", e);
            return Ok(Vec::new());
        }
    };

    let events = match value["type"].as_str().unwrap_or_default() {
        "message_start" => vec![StreamEvent::Usage(TokenUsage {
            input_tokens: value["message"]["usage"]["input_tokens"].as_u64(),
            output_tokens: None,
        })],
        "content_block_delta" => match value["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => vec![StreamEvent::TextDelta(text.to_string())],
            _ => Vec::new(),
        },
        "message_delta" => match value["usage"]["output_tokens"].as_u64() {
            Some(output) => vec![StreamEvent::Usage(TokenUsage {
                input_tokens: None,
                output_tokens: Some(output),
            })],
            None => Vec::new(),
        },
        "message_stop" => vec![StreamEvent::Done],
        "error" => {
            let message = value["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(DeckError::TransportError(format!(
                "Anthropic stream error: {}",
                message
            )));
        }
        _ => Vec::new(),
    };

    Ok(events)
}
