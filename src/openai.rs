// ABOUTME: OpenAI chat completions adapter for the deckgen application
// ABOUTME: Streams JSON-mode completions and reports usage as a terminal delta

use crate::errors::{DeckError, Result};
use crate::provider::{
    api_error, Credential, ModelProvider, ModelRequest, StreamEvent, TokenUsage, UsageSemantics,
};
use crate::sse::{self, BoxEventStream};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::{json, Value};
use url::Url;

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: Url,
    credential: Credential,
}

impl OpenAiProvider {
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
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "response_format": { "type": "json_object" },
            "stream": true,
            "stream_options": { "include_usage": true },
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    // Usage is sent once, in the final chunk, when include_usage is set.
    fn usage_semantics(&self) -> UsageSemantics {
        UsageSemantics::Additive
    }

    fn has_custom_key(&self) -> bool {
        self.credential.custom
    }

    async fn stream(&self, request: &ModelRequest) -> Result<BoxEventStream<StreamEvent>> {
        let endpoint = self
            .base_url
            .join("v1/chat/completions")
            .map_err(|e| DeckError::ConfigError(format!("Invalid OpenAI base URL: {}", e)))?;

        info!("Requesting OpenAI completion with model {}", request.model);
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.credential.api_key)
            .json(&Self::request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(sse::decode_stream(response.bytes_stream(), parse_event))
    }
}

/// Map one chat-completions SSE payload to stream events.
pub fn parse_event(data: &str) -> Result<Vec<StreamEvent>> {
    if data.trim() == "[DONE]" {
        return Ok(vec![StreamEvent::Done]);
    }

    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            warn!("Skipping unparseable OpenAI stream payload: {}", e);
            return Ok(Vec::new());
        }
    };

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let message = error["message"].as_str().unwrap_or("unknown error");
        return Err(DeckError::TransportError(format!("OpenAI stream error: {}", message)));
    }

    let mut events = Vec::new();

    if let Some(delta) = value["choices"][0]["delta"]["content"].as_str() {
        if !delta.is_empty() {
            events.push(StreamEvent::TextDelta(delta.to_string()));
        }
    }

    if let Some(usage) = value.get("usage").filter(|u| u.is_object()) {
        events.push(StreamEvent::Usage(TokenUsage {
            input_tokens: usage["prompt_tokens"].as_u64(),
            output_tokens: usage["completion_tokens"].as_u64(),
        }));
    }

    Ok(events)
}
