// ABOUTME: Cost accounting for the deckgen application
// ABOUTME: Converts token usage into credits with a per-model rate table

use crate::errors::{DeckError, Result};
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Credits charged per thousand tokens in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ModelRate {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Per-model rates. Lookup tries an exact match, then the longest model-name
/// prefix (so dated snapshots share their family's rate), then `default`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateTable {
    pub default: ModelRate,
    #[serde(default)]
    pub models: HashMap<String, ModelRate>,
}

impl Default for RateTable {
    fn default() -> Self {
        let mut models = HashMap::new();
        let mut add = |name: &str, input_per_1k: f64, output_per_1k: f64| {
            models.insert(
                name.to_string(),
                ModelRate {
                    input_per_1k,
                    output_per_1k,
                },
            );
        };
        add("gpt-4o", 0.005, 0.015);
        add("gpt-4o-mini", 0.00015, 0.0006);
        add("gpt-4", 0.03, 0.06);
        add("gpt-4-turbo", 0.01, 0.03);
        add("gpt-3.5-turbo", 0.0005, 0.0015);
        add("claude-3-5-sonnet", 0.003, 0.015);
        add("claude-3-5-haiku", 0.0008, 0.004);
        add("claude-3-opus", 0.015, 0.075);
        add("claude-3-haiku", 0.00025, 0.00125);

        Self {
            default: ModelRate {
                input_per_1k: 0.01,
                output_per_1k: 0.03,
            },
            models,
        }
    }
}

impl RateTable {
    /// Load a rate table from a JSON file shaped like
    /// `{"default": {...}, "models": {"name": {...}}}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        info!("Loading rate table from {:?}", path);
        if !path.exists() {
            return Err(DeckError::PathNotFoundError(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let table: RateTable = serde_json::from_str(&raw)
            .map_err(|e| DeckError::ConfigError(format!("Invalid rate table {:?}: {}", path, e)))?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        let negative = |rate: &ModelRate| rate.input_per_1k < 0.0 || rate.output_per_1k < 0.0;
        if negative(&self.default) {
            return Err(DeckError::ConfigError("Default rate is negative".to_string()));
        }
        if let Some((name, _)) = self.models.iter().find(|(_, rate)| negative(*rate)) {
            return Err(DeckError::ConfigError(format!("Rate for {} is negative", name)));
        }
        Ok(())
    }

    pub fn rate_for(&self, model: &str) -> ModelRate {
        if let Some(rate) = self.models.get(model) {
            return *rate;
        }
        self.models
            .iter()
            .filter(|(name, _)| model.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, rate)| *rate)
            .unwrap_or(self.default)
    }

    /// Credits for `tokens` in one direction.
    pub fn rate(&self, model: &str, direction: Direction, tokens: u64) -> f64 {
        let rate = self.rate_for(model);
        let per_1k = match direction {
            Direction::Input => rate.input_per_1k,
            Direction::Output => rate.output_per_1k,
        };
        tokens as f64 / 1000.0 * per_1k
    }
}

/// Everything needed to price one generation.
#[derive(Debug, Clone)]
pub struct CostInput<'a> {
    pub model: &'a str,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub research_performed: bool,
    pub custom_key: bool,
}

#[derive(Debug, Clone)]
pub struct CostAccountant {
    rates: Arc<RateTable>,
    research_surcharge: f64,
}

impl CostAccountant {
    pub fn new(rates: Arc<RateTable>, research_surcharge: f64) -> Self {
        Self {
            rates,
            research_surcharge: research_surcharge.max(0.0),
        }
    }

    /// Credits charged for one generation. Bring-your-own-key requests are free.
    pub fn cost(&self, input: &CostInput<'_>) -> f64 {
        if input.custom_key {
            debug!("Custom API key in use; generation is not charged");
            return 0.0;
        }

        let mut total = self.rates.rate(input.model, Direction::Input, input.input_tokens)
            + self.rates.rate(input.model, Direction::Output, input.output_tokens);
        if input.research_performed {
            total += self.research_surcharge;
        }
        total.max(0.0)
    }
}
