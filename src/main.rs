// ABOUTME: Main entry point for the deckgen program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use clap::{Args, Parser, Subcommand};
use deckgen::{
    build_provider, inspect_file, Config, CostAccountant, DeckError, DeckRecord, ExportFormat,
    Exporter, GenerationOrchestrator, GenerationRequest, InMemoryLedger, JsonFileStore,
    ProviderKind, ResearchAugmenter, SerperSearch, ThemeCatalog,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Workspace name used for credit bookkeeping from the command line.
const CLI_WORKSPACE: &str = "cli";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a deck from a prompt and store it in the library
    Generate(GenerateArgs),

    /// Export a stored deck
    Export(ExportArgs),

    /// List stored decks
    List,

    /// List available themes
    Themes,

    /// Summarize the slides of a written PPTX file
    Inspect(InspectArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// What the presentation is about
    #[arg(short, long)]
    prompt: String,

    /// Theme name (professional, creative, minimal, dark, colorful)
    #[arg(long)]
    theme: Option<String>,

    /// Template style, e.g. modern or academic
    #[arg(long)]
    template: Option<String>,

    /// Number of slides to request
    #[arg(short, long)]
    slides: Option<u32>,

    /// Model identifier; defaults to the provider's default model
    #[arg(short, long)]
    model: Option<String>,

    /// Model provider: openai or anthropic
    #[arg(long)]
    provider: Option<String>,

    /// Your own API key; generations with it are not charged
    #[arg(long)]
    api_key: Option<String>,

    /// Skip web research
    #[arg(long)]
    no_research: bool,

    /// Starting credit balance; omit for unmetered use
    #[arg(long)]
    credits: Option<f64>,

    /// Preset reference stored with the deck
    #[arg(long)]
    preset: Option<String>,

    /// Export formats to write after generation (pptx, html, pdf)
    #[arg(long, value_delimiter = ',')]
    export: Vec<String>,
}

#[derive(Args)]
struct ExportArgs {
    /// Deck id
    #[arg(short, long)]
    id: String,

    /// pptx, html or pdf
    #[arg(short, long, default_value = "pptx")]
    format: String,

    /// Directory to write into; defaults to DECKGEN_EXPORT_DIR
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args)]
struct InspectArgs {
    /// Path to a .pptx file
    path: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

async fn generate(config: &Config, args: &GenerateArgs) -> anyhow::Result<()> {
    // Fail on a bad format before spending anything on generation.
    let formats = args
        .export
        .iter()
        .map(|name| name.parse::<ExportFormat>())
        .collect::<Result<Vec<_>, _>>()?;

    let kind = match &args.provider {
        Some(name) => name.parse::<ProviderKind>()?,
        None => config.provider_kind()?,
    };
    let provider = build_provider(config, kind, args.api_key.clone())?;
    let catalog = Arc::new(ThemeCatalog::builtin());

    let research = match &config.serper_api_key {
        Some(key) if config.research_available() && !args.no_research => {
            let search = SerperSearch::new(
                config.http_client()?,
                config.serper_endpoint.clone(),
                key.clone(),
            );
            Some(ResearchAugmenter::new(Arc::new(search)))
        }
        _ => None,
    };

    let ledger = match args.credits {
        Some(balance) => InMemoryLedger::with_balance(CLI_WORKSPACE, balance),
        None => InMemoryLedger::new(),
    };
    let accountant = CostAccountant::new(Arc::new(config.rate_table()?), config.research_surcharge);

    let orchestrator = GenerationOrchestrator::new(
        provider,
        research,
        catalog.clone(),
        accountant,
        Arc::new(ledger),
        config.generation_settings(kind, args.model.clone()),
    );

    let request = GenerationRequest {
        workspace: CLI_WORKSPACE.to_string(),
        prompt: args.prompt.clone(),
        theme: args.theme.clone(),
        template: args.template.clone(),
        slide_count: args.slides,
        preset: args.preset.clone(),
        ..Default::default()
    };

    let outcome = orchestrator
        .generate_with(request, |chunk| {
            print!("{}", chunk);
            let _ = std::io::stdout().flush();
        })
        .await?;

    let record = DeckRecord::from_outcome(outcome);
    let store = JsonFileStore::new(&config.library_dir, catalog.as_ref().clone());
    let saved = store.save(&record)?;
    println!("\nSaved deck {} to {:?}", record.id, saved);

    let exporter = Exporter::new(catalog, config.export_settings(None));
    for format in formats {
        let artifact = exporter.export(&record, format)?;
        println!(
            "Exported {} to {:?} (download as {})",
            format, artifact.path, artifact.download_name
        );
    }

    println!("{}", serde_json::to_string_pretty(&record.to_resource())?);
    Ok(())
}

fn export(config: &Config, args: &ExportArgs) -> anyhow::Result<()> {
    let format: ExportFormat = args.format.parse()?;
    let catalog = ThemeCatalog::builtin();
    let store = JsonFileStore::new(&config.library_dir, catalog.clone());
    let record = store.load(&args.id)?;

    let exporter = Exporter::new(
        Arc::new(catalog),
        config.export_settings(args.output_dir.clone()),
    );
    let artifact = exporter.export(&record, format)?;

    println!("Path: {}", artifact.path.display());
    println!("Filename: {}", artifact.download_name);
    println!("Content-Type: {}", artifact.content_type);
    Ok(())
}

fn list(config: &Config) -> anyhow::Result<()> {
    let store = JsonFileStore::new(&config.library_dir, ThemeCatalog::builtin());
    let records = store.list()?;
    if records.is_empty() {
        println!("No decks in {:?}", config.library_dir);
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {}  {:>2} slides  {:<12}  {}",
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.document.len(),
            record.document.theme,
            record.title
        );
    }
    Ok(())
}

fn themes() {
    let catalog = ThemeCatalog::builtin();
    for name in catalog.names() {
        let palette = catalog.resolve(name);
        println!(
            "{:<12} primary #{} secondary #{} accent #{} background #{} text #{}",
            name,
            palette.primary,
            palette.secondary,
            palette.accent,
            palette.background,
            palette.text
        );
    }
}

fn inspect(args: &InspectArgs) -> anyhow::Result<()> {
    let summary = inspect_file(&args.path)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} slides, {} shapes", summary.slides.len(), summary.shape_count());
    for slide in &summary.slides {
        let charts: Vec<&str> = slide.charts.iter().map(|c| c.kind.as_str()).collect();
        println!(
            "Slide {}: {} text shapes, charts [{}], notes: {}",
            slide.number,
            slide.text_shapes,
            charts.join(", "),
            if slide.has_notes { "yes" } else { "no" }
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match Config::from_env() {
        Err(e) => Err(e.into()),
        Ok(config) => match &cli.command {
            Some(Commands::Generate(args)) => generate(&config, args).await,
            Some(Commands::Export(args)) => export(&config, args),
            Some(Commands::List) => list(&config),
            Some(Commands::Themes) => {
                themes();
                Ok(())
            }
            Some(Commands::Inspect(args)) => inspect(args),
            None => {
                println!("No command specified. Use --help for usage information.");
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        match e.downcast_ref::<DeckError>() {
            Some(deck_error) if deck_error.is_user_facing() => eprintln!("Error: {}", deck_error),
            _ => {
                eprintln!("Error: {:#}", e);
                eprintln!("Run with RUST_LOG=debug for more detail.");
            }
        }
        std::process::exit(1);
    }
}
