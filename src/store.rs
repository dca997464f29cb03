// ABOUTME: Deck storage for the deckgen application
// ABOUTME: The completed deck resource and a JSON-file library keyed by deck id

use crate::errors::{DeckError, Result};
use crate::orchestrator::GenerationOutcome;
use crate::parser::{parse_value, UNTITLED_SLIDE};
use crate::slide::{SlideBody, SlideDocument};
use crate::theme::ThemeCatalog;
use crate::utils;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Maximum length of a title derived from the prompt.
pub const MAX_DERIVED_TITLE: usize = 80;

/// A generated deck together with its bookkeeping.
#[derive(Debug, Clone)]
pub struct DeckRecord {
    pub id: Uuid,
    pub title: String,
    pub model: String,
    pub document: SlideDocument,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub preset: Option<String>,
}

/// Wire form of a `DeckRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckResource {
    pub id: Uuid,
    pub title: String,
    pub model: String,
    pub slides: Vec<Value>,
    pub theme: String,
    pub template: String,
    pub slide_count: usize,
    pub cost: f64,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

impl DeckRecord {
    pub fn from_outcome(outcome: GenerationOutcome) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: derive_title(&outcome.document, &outcome.prompt),
            model: outcome.model,
            document: outcome.document,
            cost: outcome.cost,
            created_at: now,
            updated_at: now,
            preset: outcome.preset,
        }
    }

    pub fn to_resource(&self) -> DeckResource {
        DeckResource {
            id: self.id,
            title: self.title.clone(),
            model: self.model.clone(),
            slides: self.document.slides_json(),
            theme: self.document.theme.clone(),
            template: self.document.template.clone(),
            slide_count: self.document.len(),
            cost: self.cost,
            metadata: serde_json::to_value(&self.document.metadata).unwrap_or(Value::Null),
            created_at: self.created_at.timestamp(),
            updated_at: self.updated_at.timestamp(),
            preset: self.preset.clone(),
        }
    }

    /// Rebuild a record from its wire form. Slides go through the same
    /// permissive parser as model output.
    pub fn from_resource(resource: DeckResource, catalog: &ThemeCatalog) -> Result<Self> {
        let mut metadata = match resource.metadata {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        metadata.insert("theme".to_string(), Value::String(resource.theme.clone()));
        metadata.insert("template".to_string(), Value::String(resource.template.clone()));

        let payload = json!({ "slides": resource.slides, "metadata": metadata });
        let document = parse_value(&payload, catalog, &resource.theme, &resource.template)?;

        Ok(Self {
            id: resource.id,
            title: resource.title,
            model: resource.model,
            document,
            cost: resource.cost,
            created_at: timestamp(resource.created_at)?,
            updated_at: timestamp(resource.updated_at)?,
            preset: resource.preset,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| DeckError::ValidationError(format!("Invalid timestamp: {}", secs)))
}

/// Title of the first title slide, else the prompt cut to a readable length.
/// The parser's placeholder for a missing slide title does not count.
pub fn derive_title(document: &SlideDocument, prompt: &str) -> String {
    let from_title_slide = document
        .slides
        .iter()
        .find(|slide| matches!(slide.body, SlideBody::Title { .. }))
        .map(|slide| slide.title.trim().to_string())
        .filter(|title| !title.is_empty() && title.as_str() != UNTITLED_SLIDE);

    if let Some(title) = from_title_slide {
        return title;
    }

    let prompt = prompt.trim();
    if prompt.chars().count() <= MAX_DERIVED_TITLE {
        prompt.to_string()
    } else {
        let cut: String = prompt.chars().take(MAX_DERIVED_TITLE).collect();
        format!("{}...", cut.trim_end())
    }
}

/// One JSON file per deck under a library directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    catalog: ThemeCatalog,
}

impl JsonFileStore {
    pub fn new(dir: &Path, catalog: ThemeCatalog) -> Self {
        Self {
            dir: dir.to_path_buf(),
            catalog,
        }
    }

    fn path_for(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn save(&self, record: &DeckRecord) -> Result<PathBuf> {
        utils::ensure_directory_exists(&self.dir)?;
        let path = self.path_for(&record.id);
        let body = serde_json::to_vec_pretty(&record.to_resource())?;
        utils::write_atomic(&path, &body)?;
        info!("Saved deck {} to {:?}", record.id, path);
        Ok(path)
    }

    pub fn load(&self, id: &str) -> Result<DeckRecord> {
        let uuid = Uuid::parse_str(id.trim())
            .map_err(|e| DeckError::ValidationError(format!("Invalid deck id {}: {}", id, e)))?;
        let path = self.path_for(&uuid);
        if !path.exists() {
            return Err(DeckError::DeckNotFound(id.to_string()));
        }
        let raw = fs::read_to_string(&path)?;
        let resource: DeckResource = serde_json::from_str(&raw)?;
        DeckRecord::from_resource(resource, &self.catalog)
    }

    /// All stored decks, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<DeckRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let pattern = format!("{}/*.json", self.dir.to_string_lossy());
        let mut records = Vec::new();
        for entry in (glob::glob(&pattern)
            .map_err(|e| DeckError::ValidationError(format!("Invalid glob pattern: {}", e)))?)
        .flatten()
        {
            let loaded = fs::read_to_string(&entry)
                .map_err(DeckError::from)
                .and_then(|raw| Ok(serde_json::from_str::<DeckResource>(&raw)?))
                .and_then(|resource| DeckRecord::from_resource(resource, &self.catalog));
            match loaded {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable deck file {:?}: {}", entry, e),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
