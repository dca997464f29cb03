use chrono::{DateTime, Utc};
use deckgen::pptx::Frame;
use deckgen::store::derive_title;
use deckgen::{
    inspect_bytes, inspect_file, parse_document, DeckError, DeckRecord, ExportFormat,
    ExportSettings, Exporter, JsonFileStore, ThemeCatalog,
};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;
use uuid::Uuid;

const DECK: &str = r#"{
  "slides": [
    {"type": "title", "title": "Q3 Review!! 2024", "subtitle": "Numbers and next steps"},
    {"type": "content", "title": "Highlights", "content": ["Revenue up", "Churn down"],
     "speaker_notes": "Pause for questions"},
    {"type": "data", "title": "Growth", "content": ["Steady"],
     "chart": {"type": "area", "data": {"labels": ["Q1", "Q2", "Q3"], "values": [1, 2, 3]}}},
    {"type": "quote", "quote": "Ship it", "author": "Ada", "author_title": "CTO"},
    {"type": "comparison", "title": "Then and now",
     "left_side": {"title": "Before", "points": ["Slow"]},
     "right_side": {"title": "After", "points": ["Fast"]}},
    {"type": "conclusion", "title": "Wrap up", "content": ["Hire", "Build"],
     "call_to_action": "Approve the budget"}
  ],
  "metadata": {"theme": "dark", "template": "modern"}
}"#;

fn created_at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_709_294_400, 0).unwrap()
}

fn record(content: &str) -> DeckRecord {
    let catalog = ThemeCatalog::builtin();
    let document = parse_document(content, &catalog, "professional", "modern").unwrap();
    DeckRecord {
        id: Uuid::new_v4(),
        title: derive_title(&document, "quarterly review"),
        model: "gpt-4o".to_string(),
        document,
        cost: 0.25,
        created_at: created_at(),
        updated_at: created_at(),
        preset: None,
    }
}

fn exporter(dir: &std::path::Path) -> Exporter {
    Exporter::new(
        Arc::new(ThemeCatalog::builtin()),
        ExportSettings {
            export_dir: dir.to_path_buf(),
        },
    )
}

#[test]
fn test_pdf_export_aliases_the_pptx_artifact() {
    let dir = tempdir().unwrap();
    let exporter = exporter(dir.path());
    let record = record(DECK);

    let pptx = exporter.export(&record, ExportFormat::Pptx).unwrap();
    let pptx_bytes = fs::read(&pptx.path).unwrap();

    let pdf = exporter.export_named(&record, "pdf").unwrap();
    assert_eq!(pdf.download_name, "Q3_Review__2024.pdf");
    assert_eq!(pdf.content_type, "application/pdf");
    assert_eq!(fs::read(&pdf.path).unwrap(), pptx_bytes);

    assert_eq!(pptx.download_name, "Q3_Review__2024.pptx");
    assert_eq!(
        pptx.content_type,
        "application/vnd.openxmlformats-officedocument.presentationml.presentation"
    );
}

#[test]
fn test_html_export_is_written_next_to_pptx() {
    let dir = tempdir().unwrap();
    let exporter = exporter(dir.path().join("exports").as_path());
    let record = record(DECK);

    let artifact = exporter.export(&record, ExportFormat::Html).unwrap();
    assert_eq!(artifact.content_type, "text/html");
    assert_eq!(artifact.download_name, "Q3_Review__2024.html");
    assert_eq!(
        artifact.path,
        dir.path().join("exports").join(format!("{}.html", record.id))
    );

    let html = fs::read_to_string(&artifact.path).unwrap();
    assert!(html.contains("<span id=\"totalSlides\">6</span>"));
    assert!(html.contains("Q3 Review!! 2024"));
    assert!(!html.contains("Pause for questions"));
}

#[test]
fn test_unsupported_format_writes_nothing() {
    let dir = tempdir().unwrap();
    let exporter = exporter(dir.path());
    let record = record(DECK);

    let result = exporter.export_named(&record, "keynote");
    assert!(matches!(result, Err(DeckError::UnsupportedExportFormat(_))));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_rendering_is_deterministic() {
    let dir = tempdir().unwrap();
    let exporter = exporter(dir.path());
    let record = record(DECK);

    let first = exporter.render(&record, ExportFormat::Pptx).unwrap();
    let second = exporter.render(&record, ExportFormat::Pptx).unwrap();
    assert_eq!(first, second);

    let html_first = exporter.render(&record, ExportFormat::Html).unwrap();
    let html_second = exporter.render(&record, ExportFormat::Html).unwrap();
    assert_eq!(html_first, html_second);
}

#[test]
fn test_written_package_reads_back() {
    let dir = tempdir().unwrap();
    let exporter = exporter(dir.path());
    let record = record(DECK);

    let artifact = exporter.export(&record, ExportFormat::Pptx).unwrap();
    let summary = inspect_file(&artifact.path).unwrap();

    assert_eq!(summary.slides.len(), record.document.len());
    assert!(summary.shape_count() >= summary.slides.len());
    for slide in &summary.slides {
        assert!(slide.shape_count() >= 1, "slide {} is empty", slide.number);
        assert_eq!(slide.background.as_deref(), Some("111827"));
    }

    assert!(summary.slides[0].texts.iter().any(|t| t == "Q3 Review!! 2024"));
    assert!(summary.slides[5].texts.iter().any(|t| t == "Approve the budget"));
}

#[test]
fn test_area_chart_renders_as_bar_in_the_data_frame() {
    let dir = tempdir().unwrap();
    let exporter = exporter(dir.path());
    let bytes = exporter.render(&record(DECK), ExportFormat::Pptx).unwrap();
    let summary = inspect_bytes(&bytes).unwrap();

    let data_slide = &summary.slides[2];
    assert_eq!(data_slide.charts.len(), 1);
    assert_eq!(data_slide.charts[0].kind, "bar");
    assert_eq!(data_slide.charts[0].frame(), Frame::new(100, 120, 450, 350));

    let chartless: usize = summary
        .slides
        .iter()
        .filter(|slide| slide.number != 3)
        .map(|slide| slide.charts.len())
        .sum();
    assert_eq!(chartless, 0);
}

#[test]
fn test_notes_are_attached_only_where_present() {
    let dir = tempdir().unwrap();
    let exporter = exporter(dir.path());
    let bytes = exporter.render(&record(DECK), ExportFormat::Pptx).unwrap();
    let summary = inspect_bytes(&bytes).unwrap();

    let with_notes: Vec<usize> = summary
        .slides
        .iter()
        .filter(|slide| slide.has_notes)
        .map(|slide| slide.number)
        .collect();
    assert_eq!(with_notes, vec![2]);
}

#[test]
fn test_inspect_rejects_missing_and_garbage_input() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.pptx");
    assert!(matches!(
        inspect_file(&missing),
        Err(DeckError::PathNotFoundError(_))
    ));
    assert!(inspect_bytes(b"definitely not a zip").is_err());
}

#[test]
fn test_store_round_trips_records() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(&dir.path().join("library"), ThemeCatalog::builtin());
    let record = record(DECK);

    let path = store.save(&record).unwrap();
    assert_eq!(path.file_name().unwrap().to_string_lossy(), format!("{}.json", record.id));

    let loaded = store.load(&record.id.to_string()).unwrap();
    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.title, "Q3 Review!! 2024");
    assert_eq!(loaded.created_at, created_at());
    assert_eq!(loaded.document.len(), 6);
    assert_eq!(loaded.document.theme, "dark");
    assert_eq!(loaded.document.slides_json(), record.document.slides_json());

    // A reloaded deck exports to the same bytes as the original.
    let exporter = exporter(dir.path());
    assert_eq!(
        exporter.render(&loaded, ExportFormat::Pptx).unwrap(),
        exporter.render(&record, ExportFormat::Pptx).unwrap()
    );
}

#[test]
fn test_store_lists_newest_first_and_skips_garbage() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path(), ThemeCatalog::builtin());

    let mut older = record(DECK);
    older.created_at = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
    let newer = record(DECK);
    store.save(&older).unwrap();
    store.save(&newer).unwrap();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let listed = store.list().unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[test]
fn test_store_reports_unknown_decks() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path(), ThemeCatalog::builtin());

    let unknown = Uuid::new_v4().to_string();
    assert!(matches!(store.load(&unknown), Err(DeckError::DeckNotFound(_))));
    assert!(matches!(
        store.load("not-a-uuid"),
        Err(DeckError::ValidationError(_))
    ));
}
