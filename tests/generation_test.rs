use async_trait::async_trait;
use deckgen::orchestrator::{STATUS_DESIGNING, STATUS_DONE, STATUS_RESEARCHING};
use deckgen::provider::{ModelRequest, TokenUsage};
use deckgen::sse::{decode_stream, BoxEventStream};
use deckgen::{
    CostAccountant, CreditLedger, DeckError, GenerationOrchestrator, GenerationRequest,
    GenerationSettings, InMemoryLedger, ModelProvider, RateTable, ResearchAugmenter,
    SearchProvider, StreamEvent, ThemeCatalog, UsageSemantics,
};
use futures_util::{stream, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DECK: &str = r#"{"slides":[{"type":"title","title":"Rust at Scale","subtitle":"2024"},{"type":"content","title":"Why","content":["Safety","Speed"],"speaker_notes":"Mention the survey"},{"type":"data","title":"Adoption","chart":{"type":"area","data":{"values":[1,2,3]}},"content":["Growing"]}],"metadata":{"theme":"dark","template":"startup"}}"#;

const WORKSPACE: &str = "team";

#[derive(Clone)]
enum Step {
    Text(String),
    Usage(Option<u64>, Option<u64>),
    Done,
    Fail(String),
    /// Never yields another event.
    Hang,
}

fn text_steps(content: &str, chunk: usize) -> Vec<Step> {
    content
        .as_bytes()
        .chunks(chunk)
        .map(|bytes| Step::Text(String::from_utf8_lossy(bytes).to_string()))
        .collect()
}

/// Sets its flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct ScriptedProvider {
    steps: Vec<Step>,
    semantics: UsageSemantics,
    custom_key: bool,
    calls: AtomicUsize,
    last_request: Mutex<Option<ModelRequest>>,
    stream_dropped: Arc<AtomicBool>,
}

impl ScriptedProvider {
    fn new(steps: Vec<Step>, semantics: UsageSemantics) -> Self {
        Self {
            steps,
            semantics,
            custom_key: false,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            stream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    fn with_custom_key(mut self) -> Self {
        self.custom_key = true;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn instruction(&self) -> String {
        self.last_request
            .lock()
            .as_ref()
            .map(|request| request.user.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn usage_semantics(&self) -> UsageSemantics {
        self.semantics
    }

    fn has_custom_key(&self) -> bool {
        self.custom_key
    }

    async fn stream(&self, request: &ModelRequest) -> deckgen::Result<BoxEventStream<StreamEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());

        let mut events = Vec::new();
        let mut hang = false;
        for step in &self.steps {
            match step {
                Step::Text(text) => events.push(Ok(StreamEvent::TextDelta(text.clone()))),
                Step::Usage(input, output) => events.push(Ok(StreamEvent::Usage(TokenUsage {
                    input_tokens: *input,
                    output_tokens: *output,
                }))),
                Step::Done => events.push(Ok(StreamEvent::Done)),
                Step::Fail(message) => {
                    events.push(Err(DeckError::TransportError(message.clone())))
                }
                Step::Hang => hang = true,
            }
        }

        // The flag tracks the stream as a whole, so it rides on the part that
        // is still alive when the scripted events run out.
        let guard = DropFlag(self.stream_dropped.clone());
        let scripted = stream::iter(events);
        if hang {
            let tail = stream::pending().map(move |event| {
                let _keep = &guard;
                event
            });
            Ok(Box::pin(scripted.chain(tail)))
        } else {
            let tracked = scripted.map(move |event| {
                let _keep = &guard;
                event
            });
            Ok(Box::pin(tracked))
        }
    }
}

struct ScriptedSearch {
    response: Option<Value>,
    hang: bool,
    calls: AtomicUsize,
    search_dropped: Arc<AtomicBool>,
}

impl ScriptedSearch {
    fn returning(response: Value) -> Self {
        Self {
            response: Some(response),
            hang: false,
            calls: AtomicUsize::new(0),
            search_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    fn failing() -> Self {
        Self {
            response: None,
            ..Self::returning(Value::Null)
        }
    }

    /// Never answers.
    fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::returning(Value::Null)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, _query: &str) -> deckgen::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            let _guard = DropFlag(self.search_dropped.clone());
            futures_util::future::pending::<()>().await;
        }
        self.response.clone().ok_or_else(|| DeckError::ApiError {
            status: 503,
            message: "search unavailable".to_string(),
        })
    }
}

fn settings() -> GenerationSettings {
    GenerationSettings {
        model: "gpt-4o".to_string(),
        temperature: 0.7,
        max_tokens: 4000,
        default_slide_count: 10,
        max_slides: 20,
        include_images: true,
        include_data_placeholders: true,
        default_theme: "professional".to_string(),
        default_template: "modern".to_string(),
        allow_negative_balance: false,
    }
}

fn orchestrator(
    provider: Arc<ScriptedProvider>,
    search: Option<Arc<ScriptedSearch>>,
    ledger: Arc<InMemoryLedger>,
) -> GenerationOrchestrator {
    let research = search.map(|search| ResearchAugmenter::new(search as Arc<dyn SearchProvider>));
    GenerationOrchestrator::new(
        provider,
        research,
        Arc::new(ThemeCatalog::builtin()),
        CostAccountant::new(Arc::new(RateTable::default()), 1.0),
        ledger,
        settings(),
    )
}

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest {
        workspace: WORKSPACE.to_string(),
        prompt: prompt.to_string(),
        ..Default::default()
    }
}

fn deck_steps() -> Vec<Step> {
    let mut steps = vec![Step::Usage(Some(1000), None)];
    steps.extend(text_steps(DECK, 7));
    steps.push(Step::Usage(None, Some(100)));
    steps.push(Step::Usage(None, Some(2000)));
    steps.push(Step::Done);
    steps
}

#[tokio::test]
async fn test_generation_streams_progress_and_returns_document() {
    let provider = Arc::new(ScriptedProvider::new(deck_steps(), UsageSemantics::Latest));
    let ledger = Arc::new(InMemoryLedger::with_balance(WORKSPACE, 10.0));
    let orchestrator = orchestrator(provider.clone(), None, ledger.clone());

    let mut progress = Vec::new();
    let outcome = orchestrator
        .generate_with(request("Rust in production"), |chunk| {
            progress.push(chunk.to_string())
        })
        .await
        .expect("generation should succeed");

    assert_eq!(progress.first().map(String::as_str), Some(STATUS_DESIGNING));
    assert_eq!(progress.last().map(String::as_str), Some(STATUS_DONE));
    let streamed: String = progress[1..progress.len() - 1].concat();
    assert_eq!(streamed, DECK);
    assert!(progress.len() > 3, "content should arrive in several chunks");

    assert_eq!(outcome.document.len(), 3);
    assert_eq!(outcome.theme, "dark");
    assert_eq!(outcome.template, "startup");
    assert_eq!(outcome.model, "gpt-4o");
    assert_eq!(outcome.input_tokens, 1000);
    assert_eq!(outcome.output_tokens, 2000);
    assert!(!outcome.research_performed);

    // gpt-4o: 1k input at 0.005 + 2k output at 0.015
    assert!((outcome.cost - 0.035).abs() < 1e-9);
    let balance = ledger.balance(WORKSPACE).expect("metered workspace");
    assert!((balance - (10.0 - 0.035)).abs() < 1e-9);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_additive_usage_is_summed() {
    let mut steps = text_steps(DECK, 50);
    steps.push(Step::Usage(Some(400), Some(300)));
    steps.push(Step::Usage(None, Some(700)));
    steps.push(Step::Done);
    let provider = Arc::new(ScriptedProvider::new(steps, UsageSemantics::Additive));
    let orchestrator = orchestrator(provider, None, Arc::new(InMemoryLedger::new()));

    let outcome = orchestrator
        .generate_with(request("Rust"), |_| {})
        .await
        .expect("generation should succeed");
    assert_eq!(outcome.input_tokens, 400);
    assert_eq!(outcome.output_tokens, 1000);
}

#[tokio::test]
async fn test_custom_key_generation_costs_nothing() {
    let mut steps = text_steps(DECK, 64);
    steps.push(Step::Usage(Some(10000), Some(5000)));
    steps.push(Step::Done);
    let provider = Arc::new(
        ScriptedProvider::new(steps, UsageSemantics::Additive).with_custom_key(),
    );
    let search = Arc::new(ScriptedSearch::returning(json!({
        "organic": [{"title": "Result", "snippet": "Snippet"}]
    })));
    let ledger = Arc::new(InMemoryLedger::with_balance(WORKSPACE, 5.0));
    let orchestrator = orchestrator(provider, Some(search), ledger.clone());

    let outcome = orchestrator
        .generate_with(request("Rust"), |_| {})
        .await
        .expect("generation should succeed");

    assert!(outcome.research_performed);
    assert_eq!(outcome.cost, 0.0);
    assert_eq!(ledger.balance(WORKSPACE), Some(5.0));
}

#[tokio::test]
async fn test_insufficient_credits_fail_before_any_call() {
    let provider = Arc::new(ScriptedProvider::new(deck_steps(), UsageSemantics::Latest));
    let search = Arc::new(ScriptedSearch::returning(json!({})));
    let ledger = Arc::new(InMemoryLedger::with_balance(WORKSPACE, 0.0));
    let orchestrator = orchestrator(provider.clone(), Some(search.clone()), ledger);

    let result = orchestrator.generate(request("Rust"));
    assert!(matches!(result, Err(DeckError::InsufficientCredits(_))));
    assert_eq!(provider.calls(), 0);
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn test_empty_prompt_is_rejected() {
    let provider = Arc::new(ScriptedProvider::new(deck_steps(), UsageSemantics::Latest));
    let orchestrator = orchestrator(provider.clone(), None, Arc::new(InMemoryLedger::new()));

    let result = orchestrator.generate(request("   "));
    assert!(matches!(result, Err(DeckError::ValidationError(_))));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_malformed_output_is_not_charged() {
    for content in ["this is not json", r#"{"title":"no slides"}"#, r#"{"slides":[]}"#] {
        let mut steps = text_steps(content, 8);
        steps.push(Step::Usage(Some(1000), Some(1000)));
        steps.push(Step::Done);
        let provider = Arc::new(ScriptedProvider::new(steps, UsageSemantics::Additive));
        let ledger = Arc::new(InMemoryLedger::with_balance(WORKSPACE, 3.0));
        let orchestrator = orchestrator(provider, None, ledger.clone());

        let result = orchestrator.generate_with(request("Rust"), |_| {}).await;
        assert!(
            matches!(result, Err(DeckError::MalformedGenerationOutput(_))),
            "content {:?} gave {:?}",
            content,
            result
        );
        assert_eq!(ledger.balance(WORKSPACE), Some(3.0));
    }
}

#[tokio::test]
async fn test_transport_failure_mid_stream_propagates() {
    let mut steps = text_steps(&DECK[..40], 8);
    steps.push(Step::Fail("connection reset".to_string()));
    steps.extend(text_steps(&DECK[40..], 8));
    steps.push(Step::Done);
    let provider = Arc::new(ScriptedProvider::new(steps, UsageSemantics::Latest));
    let ledger = Arc::new(InMemoryLedger::with_balance(WORKSPACE, 3.0));
    let orchestrator = orchestrator(provider, None, ledger.clone());

    let mut progress = Vec::new();
    let result = orchestrator
        .generate_with(request("Rust"), |chunk| progress.push(chunk.to_string()))
        .await;

    assert!(matches!(result, Err(DeckError::TransportError(_))));
    assert!(!progress.iter().any(|chunk| chunk == STATUS_DONE));
    assert_eq!(ledger.balance(WORKSPACE), Some(3.0));
}

#[tokio::test]
async fn test_research_findings_are_injected_and_charged() {
    let provider = Arc::new(ScriptedProvider::new(deck_steps(), UsageSemantics::Latest));
    let search = Arc::new(ScriptedSearch::returning(json!({
        "organic": [{"title": "Rust survey", "snippet": "Adoption keeps growing"}],
        "knowledgeGraph": {"description": "Systems programming language"}
    })));
    let orchestrator = orchestrator(
        provider.clone(),
        Some(search.clone()),
        Arc::new(InMemoryLedger::new()),
    );

    let mut progress = Vec::new();
    let outcome = orchestrator
        .generate_with(request("Rust"), |chunk| progress.push(chunk.to_string()))
        .await
        .expect("generation should succeed");

    assert_eq!(progress[0], STATUS_RESEARCHING);
    assert_eq!(progress[1], STATUS_DESIGNING);
    assert!(outcome.research_performed);
    assert!((outcome.cost - (0.035 + 1.0)).abs() < 1e-9);

    let instruction = provider.instruction();
    assert!(instruction.contains("RESEARCH FINDINGS:"));
    assert!(instruction.contains("- Rust survey\n  Adoption keeps growing"));
    assert!(instruction.contains("KEY FACTS:\n- Systems programming language"));
    assert_eq!(search.calls(), 1);
}

#[tokio::test]
async fn test_research_failure_degrades_to_no_research() {
    let provider = Arc::new(ScriptedProvider::new(deck_steps(), UsageSemantics::Latest));
    let search = Arc::new(ScriptedSearch::failing());
    let orchestrator = orchestrator(
        provider.clone(),
        Some(search),
        Arc::new(InMemoryLedger::new()),
    );

    let outcome = orchestrator
        .generate_with(request("Rust"), |_| {})
        .await
        .expect("research failure must not fail generation");

    assert!(!outcome.research_performed);
    assert!((outcome.cost - 0.035).abs() < 1e-9);
    assert!(!provider.instruction().contains("RESEARCH FINDINGS"));
}

#[tokio::test]
async fn test_skip_research_never_searches() {
    let provider = Arc::new(ScriptedProvider::new(deck_steps(), UsageSemantics::Latest));
    let search = Arc::new(ScriptedSearch::returning(json!({
        "organic": [{"title": "t", "snippet": "s"}]
    })));
    let orchestrator = orchestrator(provider, Some(search.clone()), Arc::new(InMemoryLedger::new()));

    let outcome = orchestrator
        .generate_with(
            GenerationRequest {
                skip_research: true,
                ..request("Rust")
            },
            |_| {},
        )
        .await
        .expect("generation should succeed");

    assert!(!outcome.research_performed);
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn test_request_options_reach_the_instruction() {
    let content = r#"{"slides":[{"type":"title","title":"Only"}]}"#;
    let mut steps = text_steps(content, 16);
    steps.push(Step::Done);
    let provider = Arc::new(ScriptedProvider::new(steps, UsageSemantics::Latest));
    let orchestrator = orchestrator(provider.clone(), None, Arc::new(InMemoryLedger::new()));

    let outcome = orchestrator
        .generate_with(
            GenerationRequest {
                theme: Some("minimal".to_string()),
                template: Some("academic".to_string()),
                slide_count: Some(50),
                include_images: Some(false),
                preset: Some("quarterly".to_string()),
                ..request("Quarterly review")
            },
            |_| {},
        )
        .await
        .expect("generation should succeed");

    let instruction = provider.instruction();
    assert!(instruction.contains("Number of slides: 20"));
    assert!(instruction.contains("Theme: minimal"));
    assert!(instruction.contains("Template style: academic"));
    assert!(!instruction.contains("image suggestions"));

    // Nothing in the model output overrides the caller's choices.
    assert_eq!(outcome.theme, "minimal");
    assert_eq!(outcome.template, "academic");
    assert_eq!(outcome.preset.as_deref(), Some("quarterly"));
    assert_eq!(outcome.prompt, "Quarterly review");
}

#[tokio::test]
async fn test_aborting_generation_drops_the_model_stream() {
    let mut steps = text_steps(&DECK[..30], 10);
    steps.push(Step::Hang);
    let provider = Arc::new(ScriptedProvider::new(steps, UsageSemantics::Latest));
    let orchestrator = orchestrator(provider.clone(), None, Arc::new(InMemoryLedger::new()));

    let mut handle = orchestrator
        .generate(request("Rust"))
        .expect("generation should start");
    assert_eq!(handle.next_progress().await.as_deref(), Some(STATUS_DESIGNING));
    while provider.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(!provider.stream_dropped.load(Ordering::SeqCst));

    handle.abort();
    let result = handle.finish().await;
    assert!(matches!(result, Err(DeckError::Cancelled(_))));
    assert!(provider.stream_dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_aborting_generation_cancels_pending_research() {
    let provider = Arc::new(ScriptedProvider::new(deck_steps(), UsageSemantics::Latest));
    let search = Arc::new(ScriptedSearch::hanging());
    let orchestrator = orchestrator(
        provider.clone(),
        Some(search.clone()),
        Arc::new(InMemoryLedger::new()),
    );

    let mut handle = orchestrator
        .generate(request("Rust"))
        .expect("generation should start");
    assert_eq!(handle.next_progress().await.as_deref(), Some(STATUS_RESEARCHING));
    while search.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(!search.search_dropped.load(Ordering::SeqCst));

    drop(handle);
    let cancelled = tokio::time::timeout(Duration::from_secs(5), async {
        while !search.search_dropped.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(cancelled.is_ok(), "search should be dropped with the handle");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_sse_transport_error_ends_decoded_stream() {
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
        Ok(b"data: one\n\ndata: tw".to_vec()),
        Ok(b"o\n\n".to_vec()),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        )),
        Ok(b"data: never\n\n".to_vec()),
    ];
    let mut events = decode_stream(stream::iter(chunks), |data| Ok(vec![data.to_string()]));

    assert_eq!(events.next().await.unwrap().unwrap(), "one");
    assert_eq!(events.next().await.unwrap().unwrap(), "two");
    assert!(matches!(
        events.next().await,
        Some(Err(DeckError::TransportError(_)))
    ));
    assert!(events.next().await.is_none());
}
