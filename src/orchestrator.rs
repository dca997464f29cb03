// ABOUTME: Generation orchestrator for the deckgen application
// ABOUTME: Runs prompt, research, model stream, parse, cost and deduction as one pipeline

use crate::cost::{CostAccountant, CostInput};
use crate::errors::{DeckError, Result};
use crate::ledger::{ensure_credits, CreditLedger};
use crate::parser::parse_document;
use crate::prompt::{clamp_slide_count, compose_instruction, PromptParts, SYSTEM_PROMPT};
use crate::provider::{ModelProvider, ModelRequest};
use crate::research::ResearchAugmenter;
use crate::slide::SlideDocument;
use crate::stream::GenerationStream;
use crate::theme::ThemeCatalog;
use log::info;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const STATUS_RESEARCHING: &str = "Researching topic...\n";
pub const STATUS_DESIGNING: &str = "Designing presentation structure...\n";
pub const STATUS_DONE: &str = "\nPresentation created successfully!\n";

/// Per-process generation defaults.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub default_slide_count: u32,
    pub max_slides: u32,
    pub include_images: bool,
    pub include_data_placeholders: bool,
    pub default_theme: String,
    pub default_template: String,
    pub allow_negative_balance: bool,
}

/// One caller request. Unset options fall back to `GenerationSettings`.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub workspace: String,
    pub prompt: String,
    pub theme: Option<String>,
    pub template: Option<String>,
    pub slide_count: Option<u32>,
    pub include_images: Option<bool>,
    pub include_data_placeholders: Option<bool>,
    /// Skip research even when a search provider is configured.
    pub skip_research: bool,
    pub preset: Option<String>,
}

/// The terminal result of a successful generation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub document: SlideDocument,
    pub cost: f64,
    pub theme: String,
    pub template: String,
    pub model: String,
    pub prompt: String,
    pub preset: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub research_performed: bool,
}

/// A running generation: a progress channel plus a separate terminal result.
///
/// Dropping the handle (or calling `abort`) cancels the pipeline, including
/// an in-flight research call or model stream.
pub struct GenerationHandle {
    progress: mpsc::UnboundedReceiver<String>,
    task: Option<JoinHandle<Result<GenerationOutcome>>>,
}

impl GenerationHandle {
    /// Next progress fragment; `None` once the pipeline has stopped producing.
    pub async fn next_progress(&mut self) -> Option<String> {
        self.progress.recv().await
    }

    /// Wait for the terminal result.
    pub async fn finish(mut self) -> Result<GenerationOutcome> {
        let task = self
            .task
            .take()
            .ok_or_else(|| DeckError::Cancelled("generation already consumed".to_string()))?;

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(DeckError::Cancelled("generation aborted".to_string())),
            Err(e) => Err(DeckError::UnknownError(format!("generation task failed: {}", e))),
        }
    }

    pub fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

impl Drop for GenerationHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Drives one generation end to end. Cheap to clone; all collaborators are
/// shared read-only.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    provider: Arc<dyn ModelProvider>,
    research: Option<ResearchAugmenter>,
    catalog: Arc<ThemeCatalog>,
    accountant: CostAccountant,
    ledger: Arc<dyn CreditLedger>,
    settings: GenerationSettings,
}

impl GenerationOrchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        research: Option<ResearchAugmenter>,
        catalog: Arc<ThemeCatalog>,
        accountant: CostAccountant,
        ledger: Arc<dyn CreditLedger>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            research,
            catalog,
            accountant,
            ledger,
            settings,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Start a generation. Fails immediately, before any model or search
    /// call, when the workspace has no credits left.
    pub fn generate(&self, request: GenerationRequest) -> Result<GenerationHandle> {
        if request.prompt.trim().is_empty() {
            return Err(DeckError::ValidationError("prompt must not be empty".to_string()));
        }
        ensure_credits(self.ledger.as_ref(), &request.workspace)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = self.clone();
        let task = tokio::spawn(async move { pipeline.run(request, tx).await });

        Ok(GenerationHandle {
            progress: rx,
            task: Some(task),
        })
    }

    /// Run a generation to completion, forwarding progress to `on_progress`.
    pub async fn generate_with<F>(
        &self,
        request: GenerationRequest,
        mut on_progress: F,
    ) -> Result<GenerationOutcome>
    where
        F: FnMut(&str),
    {
        let mut handle = self.generate(request)?;
        while let Some(chunk) = handle.next_progress().await {
            on_progress(&chunk);
        }
        handle.finish().await
    }

    async fn run(
        self,
        request: GenerationRequest,
        progress: mpsc::UnboundedSender<String>,
    ) -> Result<GenerationOutcome> {
        // A closed receiver only means nobody is watching progress.
        let emit = |text: String| {
            let _ = progress.send(text);
        };

        let settings = &self.settings;
        let theme = request
            .theme
            .clone()
            .unwrap_or_else(|| settings.default_theme.clone());
        let template = request
            .template
            .clone()
            .unwrap_or_else(|| settings.default_template.clone());
        let slide_count = clamp_slide_count(
            request.slide_count,
            settings.default_slide_count,
            settings.max_slides,
        );

        let mut research = String::new();
        if let (Some(augmenter), false) = (&self.research, request.skip_research) {
            emit(STATUS_RESEARCHING.to_string());
            research = augmenter.research(&request.prompt).await;
        }
        let research_performed = !research.is_empty();

        let instruction = compose_instruction(&PromptParts {
            prompt: &request.prompt,
            theme: &theme,
            template: &template,
            slide_count,
            research: &research,
            include_images: request.include_images.unwrap_or(settings.include_images),
            include_data_placeholders: request
                .include_data_placeholders
                .unwrap_or(settings.include_data_placeholders),
        });

        emit(STATUS_DESIGNING.to_string());

        let model_request = ModelRequest {
            model: settings.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            user: instruction,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };
        let events = self.provider.stream(&model_request).await?;
        let mut stream = GenerationStream::new(events, self.provider.usage_semantics());
        while let Some(chunk) = stream.next_chunk().await? {
            emit(chunk);
        }
        let completion = stream.finish().await?;
        info!(
            "Model {} finished: {} input tokens, {} output tokens",
            settings.model, completion.input_tokens, completion.output_tokens
        );

        let document = parse_document(&completion.content, &self.catalog, &theme, &template)?;
        if document.is_empty() {
            return Err(DeckError::MalformedGenerationOutput(
                "generation produced no slides".to_string(),
            ));
        }
        info!("Parsed {} slides", document.len());

        let cost = self.accountant.cost(&CostInput {
            model: &settings.model,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            research_performed,
            custom_key: self.provider.has_custom_key(),
        });
        info!("Generation cost: {:.4} credits", cost);

        self.ledger
            .deduct(&request.workspace, cost, settings.allow_negative_balance);

        emit(STATUS_DONE.to_string());

        Ok(GenerationOutcome {
            theme: document.theme.clone(),
            template: document.template.clone(),
            document,
            cost,
            model: settings.model.clone(),
            prompt: request.prompt,
            preset: request.preset,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            research_performed,
        })
    }
}
