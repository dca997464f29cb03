// ABOUTME: Library module for the deckgen program.
// ABOUTME: Contains generation, storage and export functionality for AI-written slide decks.

// Reexport modules
pub mod anthropic;
pub mod config;
pub mod cost;
pub mod errors;
pub mod export;
pub mod html;
pub mod inspect;
pub mod ledger;
pub mod openai;
pub mod orchestrator;
pub mod parser;
pub mod pptx;
pub mod prompt;
pub mod provider;
pub mod research;
pub mod slide;
pub mod sse;
pub mod store;
pub mod stream;
pub mod theme;
pub mod utils;

// Reexport common types and functions
pub use config::Config;
pub use cost::{CostAccountant, CostInput, RateTable};
pub use errors::{DeckError, Result};
pub use export::{sanitize_filename, ExportArtifact, ExportFormat, ExportSettings, Exporter};
pub use html::render_html;
pub use inspect::{inspect_bytes, inspect_file, PackageSummary};
pub use ledger::{CreditLedger, InMemoryLedger};
pub use orchestrator::{
    GenerationHandle, GenerationOrchestrator, GenerationOutcome, GenerationRequest,
    GenerationSettings,
};
pub use parser::parse_document;
pub use pptx::{layout_slide, render_pptx, PackageProperties};
pub use provider::{build_provider, ModelProvider, ProviderKind, StreamEvent, UsageSemantics};
pub use research::{ResearchAugmenter, SearchProvider, SerperSearch};
pub use slide::{ChartKind, SlideBody, SlideDocument, SlideUnit};
pub use store::{DeckRecord, JsonFileStore};
pub use theme::{ResolvedPalette, ThemeCatalog};
