// ABOUTME: Research augmentation for the deckgen application
// ABOUTME: Queries a web search API and condenses the results into prompt text

use crate::errors::{DeckError, Result};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

/// Number of organic results kept in the research block.
pub const MAX_ORGANIC_RESULTS: usize = 5;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Raw JSON search response for `query`.
    async fn search(&self, query: &str) -> Result<Value>;
}

/// Google search through the Serper API.
pub struct SerperSearch {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl SerperSearch {
    pub fn new(client: reqwest::Client, endpoint: Url, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider for SerperSearch {
    async fn search(&self, query: &str) -> Result<Value> {
        info!("Searching the web for: {}", query);
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "hl": "en", "gl": "us" }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeckError::ApiError {
                status: status.as_u16(),
                message: "search request failed".to_string(),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Optional research step. Never fails: any search error yields no research.
#[derive(Clone)]
pub struct ResearchAugmenter {
    search: Arc<dyn SearchProvider>,
}

impl ResearchAugmenter {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self { search }
    }

    pub async fn research(&self, prompt: &str) -> String {
        match self.search.search(prompt).await {
            Ok(results) => condense_results(&results),
            Err(e) => {
                warn!("Research failed, continuing without it: {}", e);
                String::new()
            }
        }
    }
}

/// Condense a search response into a short findings block. Returns an empty
/// string when the response holds nothing usable.
pub fn condense_results(results: &Value) -> String {
    let organic: Vec<&Value> = results["organic"]
        .as_array()
        .map(|items| items.iter().take(MAX_ORGANIC_RESULTS).collect())
        .unwrap_or_default();
    let knowledge_graph = results.get("knowledgeGraph").filter(|kg| kg.is_object());

    if organic.is_empty() && knowledge_graph.is_none() {
        return String::new();
    }

    let mut research = String::from("RESEARCH FINDINGS:\n\n");
    for result in organic {
        research.push_str(&format!("- {}\n", result["title"].as_str().unwrap_or_default()));
        research.push_str(&format!("  {}\n\n", result["snippet"].as_str().unwrap_or_default()));
    }

    if let Some(kg) = knowledge_graph {
        research.push_str("KEY FACTS:\n");
        research.push_str(&format!("- {}\n", kg["description"].as_str().unwrap_or_default()));
        if let Some(attributes) = kg["attributes"].as_object() {
            for (key, value) in attributes {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                research.push_str(&format!("- {}: {}\n", key, value));
            }
        }
    }

    research
}
