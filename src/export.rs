// ABOUTME: Export module for the deckgen application
// ABOUTME: Picks a renderer per format, names the download and writes the artifact atomically

use crate::errors::{DeckError, Result};
use crate::html::render_html;
use crate::pptx::{render_pptx, PackageProperties};
use crate::store::DeckRecord;
use crate::theme::ThemeCatalog;
use crate::utils;
use log::info;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Longest sanitized file stem, before the extension.
pub const MAX_FILENAME_STEM: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pptx,
    Html,
    /// Alias of the PPTX artifact until a real conversion exists.
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pptx => "pptx",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ExportFormat::Html => "text/html",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// Format whose renderer actually produces the bytes.
    fn source(&self) -> ExportFormat {
        match self {
            ExportFormat::Pdf => ExportFormat::Pptx,
            other => *other,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pptx" | "office" => Ok(ExportFormat::Pptx),
            "html" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(DeckError::UnsupportedExportFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Replace characters outside `[A-Za-z0-9_-]` with `_` and cap the length.
/// A run of the same disallowed character becomes a single `_`, so `"a!!b"`
/// gives `a_b` rather than the one-for-one `a__b` of the web exporter, while
/// mixed runs still keep one `_` per character kind (`"!! "` gives `__`).
pub fn sanitize_filename(title: &str) -> String {
    let mut stem = String::new();
    let mut previous: Option<char> = None;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            stem.push(c);
        } else if previous != Some(c) {
            stem.push('_');
        }
        previous = Some(c);
    }
    stem.chars().take(MAX_FILENAME_STEM).collect()
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub export_dir: PathBuf,
}

/// A written export, ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub path: PathBuf,
    pub download_name: String,
    pub content_type: &'static str,
}

/// Renders stored decks to files. Rendering is a pure read of the record.
#[derive(Debug, Clone)]
pub struct Exporter {
    catalog: Arc<ThemeCatalog>,
    settings: ExportSettings,
}

impl Exporter {
    pub fn new(catalog: Arc<ThemeCatalog>, settings: ExportSettings) -> Self {
        Self { catalog, settings }
    }

    /// Rendered bytes for `format`, without touching the filesystem.
    pub fn render(&self, record: &DeckRecord, format: ExportFormat) -> Result<Vec<u8>> {
        let palette = self.catalog.resolve(&record.document.theme);
        match format.source() {
            ExportFormat::Html => {
                Ok(render_html(&record.document, palette, &record.title).into_bytes())
            }
            _ => render_pptx(
                &record.document,
                palette,
                &PackageProperties {
                    title: &record.title,
                    created_at: record.created_at,
                },
            ),
        }
    }

    pub fn export(&self, record: &DeckRecord, format: ExportFormat) -> Result<ExportArtifact> {
        let source = format.source();
        let bytes = self.render(record, source)?;

        let path = self
            .settings
            .export_dir
            .join(format!("{}.{}", record.id, source.extension()));
        utils::write_atomic(&path, &bytes)?;
        info!(
            "Exported deck {} as {} to {:?} ({} bytes)",
            record.id,
            format,
            path,
            bytes.len()
        );

        Ok(ExportArtifact {
            format,
            path,
            download_name: format!("{}.{}", sanitize_filename(&record.title), format.extension()),
            content_type: format.content_type(),
        })
    }

    /// Parse `format` and export in one step.
    pub fn export_named(&self, record: &DeckRecord, format: &str) -> Result<ExportArtifact> {
        self.export(record, format.parse()?)
    }
}
