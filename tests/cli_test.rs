use chrono::DateTime;
use deckgen::{parse_document, DeckRecord, JsonFileStore, ThemeCatalog};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use uuid::Uuid;

const DECK: &str = r#"{"slides":[
  {"type":"title","title":"Q3 Review!! 2024"},
  {"type":"data","title":"Growth","chart":{"type":"line","data":{"values":[3,5,8]}}}
]}"#;

struct Workspace {
    _dir: TempDir,
    library: std::path::PathBuf,
    exports: std::path::PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let library = dir.path().join("library");
        let exports = dir.path().join("exports");
        Self {
            _dir: dir,
            library,
            exports,
        }
    }

    fn run_command(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_deckgen"))
            .args(args)
            .env("DECKGEN_LIBRARY_DIR", &self.library)
            .env("DECKGEN_EXPORT_DIR", &self.exports)
            .env("RUST_LOG", "warn")
            .env_remove("OPENAI_API_KEY")
            .env_remove("ANTHROPIC_API_KEY")
            .env_remove("SERPER_API_KEY")
            .output()
            .expect("Failed to execute command")
    }

    fn store_deck(&self) -> Uuid {
        let catalog = ThemeCatalog::builtin();
        let document = parse_document(DECK, &catalog, "professional", "modern").unwrap();
        let created = DateTime::from_timestamp(1_709_294_400, 0).unwrap();
        let record = DeckRecord {
            id: Uuid::new_v4(),
            title: "Q3 Review!! 2024".to_string(),
            model: "gpt-4o".to_string(),
            document,
            cost: 0.1,
            created_at: created,
            updated_at: created,
            preset: None,
        };
        JsonFileStore::new(&self.library, catalog)
            .save(&record)
            .expect("Failed to store deck");
        record.id
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn exported_files(dir: &Path, extension: &str) -> usize {
    let pattern = format!("{}/*.{}", dir.to_string_lossy(), extension);
    glob::glob(&pattern)
        .expect("Failed to read glob pattern")
        .filter_map(Result::ok)
        .count()
}

#[test]
fn test_themes_lists_every_builtin_theme() {
    let workspace = Workspace::new();
    let output = workspace.run_command(&["themes"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let listing = stdout(&output);
    for name in ["professional", "creative", "minimal", "dark", "colorful"] {
        assert!(listing.contains(name), "missing theme {}", name);
    }
    assert!(listing.contains("#111827"));
}

#[test]
fn test_export_pdf_of_stored_deck() {
    let workspace = Workspace::new();
    let id = workspace.store_deck();

    let output = workspace.run_command(&["export", "--id", &id.to_string(), "--format", "pdf"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let printed = stdout(&output);
    assert!(printed.contains("Filename: Q3_Review__2024.pdf"));
    assert!(printed.contains("Content-Type: application/pdf"));
    assert_eq!(exported_files(&workspace.exports, "pptx"), 1);
    assert!(workspace.exports.join(format!("{}.pptx", id)).exists());
}

#[test]
fn test_export_then_inspect() {
    let workspace = Workspace::new();
    let id = workspace.store_deck();

    let output = workspace.run_command(&["export", "--id", &id.to_string()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let path = workspace.exports.join(format!("{}.pptx", id));
    let output = workspace.run_command(&["inspect", &path.to_string_lossy(), "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let slides = summary["slides"].as_array().unwrap();
    assert_eq!(slides.len(), 2);
    assert_eq!(slides[1]["charts"][0]["kind"], "line");
}

#[test]
fn test_export_rejects_unknown_format() {
    let workspace = Workspace::new();
    let id = workspace.store_deck();

    let output = workspace.run_command(&["export", "--id", &id.to_string(), "--format", "docx"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unsupported export format: docx"));
    assert_eq!(exported_files(&workspace.exports, "*"), 0);
}

#[test]
fn test_export_of_unknown_deck_fails() {
    let workspace = Workspace::new();
    let output = workspace.run_command(&["export", "--id", &Uuid::new_v4().to_string()]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Deck not found"));
}

#[test]
fn test_list_shows_stored_decks() {
    let workspace = Workspace::new();
    let output = workspace.run_command(&["list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No decks"));

    let id = workspace.store_deck();
    let output = workspace.run_command(&["list"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let listing = stdout(&output);
    assert!(listing.contains(&id.to_string()));
    assert!(listing.contains("Q3 Review!! 2024"));
}

#[test]
fn test_generate_checks_formats_before_credentials() {
    let workspace = Workspace::new();

    let output = workspace.run_command(&["generate", "--prompt", "Rust", "--export", "pptx,keynote"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unsupported export format: keynote"));

    let output = workspace.run_command(&["generate", "--prompt", "Rust", "--provider", "openai"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No API key configured"));
}

#[test]
fn test_only_internal_errors_point_at_debug_logging() {
    let workspace = Workspace::new();

    let user_error = workspace.run_command(&["export", "--id", &Uuid::new_v4().to_string()]);
    assert!(!user_error.status.success());
    assert!(!stderr(&user_error).contains("RUST_LOG"));

    let config_error =
        workspace.run_command(&["generate", "--prompt", "Rust", "--provider", "anthropic"]);
    assert!(!config_error.status.success());
    assert!(stderr(&config_error).contains("Run with RUST_LOG=debug"));
}
