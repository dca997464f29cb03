// ABOUTME: Configuration module for the deckgen application
// ABOUTME: Provides configuration settings and environment variable handling

use crate::cost::RateTable;
use crate::errors::{DeckError, Result};
use crate::export::ExportSettings;
use crate::orchestrator::GenerationSettings;
use crate::provider::ProviderKind;
use crate::theme::DEFAULT_THEME;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TEMPLATE: &str = "modern";

/// Global configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: String,
    pub model: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_base_url: Url,
    pub anthropic_base_url: Url,
    pub serper_api_key: Option<String>,
    pub serper_endpoint: Url,
    pub enable_web_search: bool,
    pub max_slides: u32,
    pub default_slide_count: u32,
    pub include_images: bool,
    pub include_data_placeholders: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub research_surcharge: f64,
    pub allow_negative_balance: bool,
    pub library_dir: PathBuf,
    pub export_dir: PathBuf,
    pub rates_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            openai_api_key: None,
            anthropic_api_key: None,
            openai_base_url: fixed_url("https://api.openai.com/"),
            anthropic_base_url: fixed_url("https://api.anthropic.com/"),
            serper_api_key: None,
            serper_endpoint: fixed_url("https://google.serper.dev/search"),
            enable_web_search: true,
            max_slides: 20,
            default_slide_count: 10,
            include_images: true,
            include_data_placeholders: true,
            temperature: 0.7,
            max_tokens: 4000,
            research_surcharge: 1.0,
            allow_negative_balance: false,
            library_dir: PathBuf::from("decks"),
            export_dir: PathBuf::from("exports"),
            rates_path: None,
            timeout_secs: 120,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let openai_base_url = match non_empty_var("OPENAI_BASE_URL") {
            Some(raw) => parse_base_url(&raw)?,
            None => defaults.openai_base_url,
        };
        let anthropic_base_url = match non_empty_var("ANTHROPIC_BASE_URL") {
            Some(raw) => parse_base_url(&raw)?,
            None => defaults.anthropic_base_url,
        };

        Ok(Self {
            provider: non_empty_var("DECKGEN_PROVIDER").unwrap_or(defaults.provider),
            model: non_empty_var("DECKGEN_MODEL"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            openai_base_url,
            anthropic_base_url,
            serper_api_key: non_empty_var("SERPER_API_KEY"),
            serper_endpoint: defaults.serper_endpoint,
            enable_web_search: env_bool("DECKGEN_WEB_SEARCH", defaults.enable_web_search),
            max_slides: env_parse("DECKGEN_MAX_SLIDES", defaults.max_slides),
            default_slide_count: env_parse("DECKGEN_SLIDE_COUNT", defaults.default_slide_count),
            include_images: env_bool("DECKGEN_INCLUDE_IMAGES", defaults.include_images),
            include_data_placeholders: env_bool(
                "DECKGEN_DATA_PLACEHOLDERS",
                defaults.include_data_placeholders,
            ),
            temperature: env_parse("DECKGEN_TEMPERATURE", defaults.temperature),
            max_tokens: env_parse("DECKGEN_MAX_TOKENS", defaults.max_tokens),
            research_surcharge: env_parse("DECKGEN_RESEARCH_SURCHARGE", defaults.research_surcharge),
            allow_negative_balance: env_bool(
                "DECKGEN_ALLOW_NEGATIVE_BALANCE",
                defaults.allow_negative_balance,
            ),
            library_dir: non_empty_var("DECKGEN_LIBRARY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.library_dir),
            export_dir: non_empty_var("DECKGEN_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            rates_path: non_empty_var("DECKGEN_RATES_PATH").map(PathBuf::from),
            timeout_secs: env_parse("DECKGEN_TIMEOUT_SECS", defaults.timeout_secs),
        })
    }

    pub fn provider_kind(&self) -> Result<ProviderKind> {
        ProviderKind::from_str(&self.provider)
    }

    /// Research runs only when enabled and a search key is present.
    pub fn research_available(&self) -> bool {
        self.enable_web_search && self.serper_api_key.is_some()
    }

    /// Rate table from `rates_path`, or the built-in one.
    pub fn rate_table(&self) -> Result<RateTable> {
        match &self.rates_path {
            Some(path) => RateTable::from_json_file(path),
            None => Ok(RateTable::default()),
        }
    }

    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?)
    }

    /// Get generation settings with defaults from this config
    pub fn generation_settings(&self, kind: ProviderKind, model: Option<String>) -> GenerationSettings {
        GenerationSettings {
            model: model
                .or_else(|| self.model.clone())
                .unwrap_or_else(|| kind.default_model().to_string()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            default_slide_count: self.default_slide_count,
            max_slides: self.max_slides,
            include_images: self.include_images,
            include_data_placeholders: self.include_data_placeholders,
            default_theme: DEFAULT_THEME.to_string(),
            default_template: DEFAULT_TEMPLATE.to_string(),
            allow_negative_balance: self.allow_negative_balance,
        }
    }

    /// Get export settings, with an optional output directory override
    pub fn export_settings(&self, output_dir: Option<PathBuf>) -> ExportSettings {
        ExportSettings {
            export_dir: output_dir.unwrap_or_else(|| self.export_dir.clone()),
        }
    }
}

/// Parse an API root, making sure relative joins append to its path.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| DeckError::ConfigError(format!("Invalid URL {}: {}", raw, e)))
}

fn fixed_url(raw: &str) -> Url {
    // Only called with the literal endpoints above.
    Url::parse(raw).expect("built-in URL is valid")
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(default)
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}
