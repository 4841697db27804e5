//! End-to-end pipeline tests over the in-memory store and a stub
//! generation backend.
//!
//! Covers the degenerate corpus states, answer gating, source attribution,
//! the cross-lingual retry, ingestion failure handling, and the audit trail.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use docqa::answer::Language;
use docqa::blob::{BlobStore, FsBlobStore};
use docqa::config::{ChunkingConfig, RetrievalConfig};
use docqa::llm::TextGenerator;
use docqa::models::{ChunkRecord, DocumentRecord, DocumentStatus};
use docqa::service::{IngestError, RagService};
use docqa::store::memory::InMemoryStore;
use docqa::store::Store;

/// Generator stub that replays canned responses and records every prompt.
struct StubGenerator {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "stub answer".to_string()))
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

struct Harness {
    service: RagService,
    store: Arc<InMemoryStore>,
    generator: Arc<StubGenerator>,
    _blob_dir: TempDir,
}

fn harness(language: Language, responses: &[&str]) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let generator = Arc::new(StubGenerator::new(responses));
    let blob_dir = TempDir::new().unwrap();
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(blob_dir.path()));

    let service = RagService::new(
        store.clone() as Arc<dyn Store>,
        blobs,
        generator.clone() as Arc<dyn TextGenerator>,
        ChunkingConfig::default(),
        RetrievalConfig::default(),
        language,
    );

    Harness {
        service,
        store,
        generator,
        _blob_dir: blob_dir,
    }
}

fn completed_doc(id: &str, filename: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        original_filename: filename.to_string(),
        stored_name: format!("documents/{}/{}", id, filename),
        file_size: 100,
        status: DocumentStatus::Completed,
        chunk_count: 1,
        created_at: 0,
        updated_at: 0,
    }
}

fn chunk(doc_id: &str, index: i64, text: &str) -> ChunkRecord {
    ChunkRecord {
        id: format!("{}_p1_c{}", doc_id, index),
        document_id: doc_id.to_string(),
        text: text.to_string(),
        page_number: 1,
        chunk_index: index,
        word_count: text.split_whitespace().count() as i64,
    }
}

async fn seed(store: &InMemoryStore, id: &str, filename: &str, text: &str) {
    store.insert_document(&completed_doc(id, filename)).await.unwrap();
    store.insert_chunk(&chunk(id, 0, text)).await.unwrap();
}

#[tokio::test]
async fn empty_corpus_short_circuits_without_backend_call() {
    let h = harness(Language::En, &[]);

    let result = h.service.query("What is the capital of France?").await.unwrap();
    assert!(result.answer.contains("don't have any documents"));
    assert_eq!(result.confidence, 0.0);
    assert!(result.sources.is_empty());
    assert_eq!(result.context, "");
    assert_eq!(h.generator.call_count(), 0);

    // Every outcome is audited
    let queries = h.store.list_queries(10).await.unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].question, "What is the capital of France?");
}

#[tokio::test]
async fn documents_without_chunks_yield_no_content_answer() {
    let h = harness(Language::En, &[]);
    h.store
        .insert_document(&completed_doc("d1", "empty.pdf"))
        .await
        .unwrap();

    let result = h.service.query("anything at all").await.unwrap();
    assert!(result.answer.contains("processed content"));
    assert_eq!(result.confidence, 0.0);
    assert_eq!(h.generator.call_count(), 0);
}

#[tokio::test]
async fn irrelevant_corpus_yields_no_relevant_answer() {
    let h = harness(Language::En, &[]);
    seed(
        &h.store,
        "d1",
        "bread.pdf",
        "Mix flour, water, and salt, then let the dough rest overnight.",
    )
    .await;

    let result = h.service.query("quantum entanglement experiments").await.unwrap();
    assert!(result.answer.contains("enough relevant information"));
    assert_eq!(result.confidence, 0.0);
    assert!(result.sources.is_empty());
    assert_eq!(h.generator.call_count(), 0);
}

#[tokio::test]
async fn grounded_question_is_answered_with_sources() {
    let h = harness(Language::En, &["Paris is the capital of France."]);
    seed(
        &h.store,
        "d1",
        "geography.pdf",
        "The capital of France is Paris, located on the Seine.",
    )
    .await;

    let result = h.service.query("What is the capital of France?").await.unwrap();
    assert_eq!(result.answer, "Paris is the capital of France.");
    assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    assert_eq!(result.sources, vec!["d1|geography.pdf".to_string()]);
    assert!(result.context.contains("Paris"));

    // The grounding prompt embeds the retrieved context and the question
    assert_eq!(h.generator.call_count(), 1);
    let prompt = h.generator.prompt(0);
    assert!(prompt.contains("capital of France is Paris"));
    assert!(prompt.contains("What is the capital of France?"));
}

#[tokio::test]
async fn no_answer_marker_overrides_response() {
    let h = harness(
        Language::En,
        &["Unfortunately, I don't have enough information to say."],
    );
    seed(
        &h.store,
        "d1",
        "geography.pdf",
        "The capital of France is Paris, located on the Seine.",
    )
    .await;

    let result = h.service.query("What is the capital of France?").await.unwrap();
    assert_eq!(
        result.answer,
        "I don't have that information in the provided documents."
    );
    assert_eq!(result.confidence, 0.0);
    assert!(result.sources.is_empty());
    // The context is kept for the audit trail
    assert!(result.context.contains("Paris"));
}

#[tokio::test]
async fn source_list_is_capped() {
    let h = harness(Language::En, &["The reports agree."]);
    for i in 0..7 {
        seed(
            &h.store,
            &format!("d{}", i),
            &format!("report{}.pdf", i),
            "Annual report findings: the annual report shows steady annual growth.",
        )
        .await;
    }

    let result = h.service.query("annual report growth").await.unwrap();
    assert!(result.sources.len() <= 5);
    assert!(!result.sources.is_empty());
    for source in &result.sources {
        let (id, filename) = source.split_once('|').expect("documentId|filename format");
        assert!(id.starts_with('d'));
        assert!(filename.ends_with(".pdf"));
    }
}

#[tokio::test]
async fn persian_query_retries_with_translation() {
    // First backend call translates, second answers.
    let h = harness(
        Language::Fa,
        &["What is the capital of France?", "پاریس پایتخت فرانسه است."],
    );
    seed(
        &h.store,
        "d1",
        "geography.pdf",
        "The capital of France is Paris, located on the Seine.",
    )
    .await;

    let result = h.service.query("پایتخت فرانسه چیست؟").await.unwrap();
    assert_eq!(result.answer, "پاریس پایتخت فرانسه است.");
    assert!(result.confidence > 0.0);
    assert!(result.context.contains("Paris"));

    assert_eq!(h.generator.call_count(), 2);
    assert!(h.generator.prompt(0).contains("Translate the following text to English"));
    assert!(h.generator.prompt(1).contains("متن زمینه"));
}

#[tokio::test]
async fn english_corpus_never_triggers_translation() {
    let h = harness(Language::En, &[]);
    seed(
        &h.store,
        "d1",
        "bread.pdf",
        "Mix flour, water, and salt, then let the dough rest overnight.",
    )
    .await;

    let result = h.service.query("orbital mechanics of comets").await.unwrap();
    assert_eq!(result.confidence, 0.0);
    // No translation attempt for the default language
    assert_eq!(h.generator.call_count(), 0);
}

#[tokio::test]
async fn invalid_pdf_marks_document_failed() {
    let h = harness(Language::En, &[]);

    let err = h.service.ingest("bad.pdf", b"not a valid pdf").await.unwrap_err();
    assert!(matches!(err, IngestError::Extract(_)));

    let docs = h.store.list_documents().await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].status, DocumentStatus::Failed);
    assert_eq!(docs[0].chunk_count, 0);
}

#[tokio::test]
async fn failed_documents_do_not_participate_in_retrieval() {
    let h = harness(Language::En, &[]);
    let _ = h.service.ingest("bad.pdf", b"not a valid pdf").await;

    // Corpus has a document, but nothing completed
    let result = h.service.query("anything").await.unwrap();
    assert!(result.answer.contains("processed content"));
}

#[tokio::test]
async fn search_ranks_documents_without_generating() {
    let h = harness(Language::En, &[]);
    seed(
        &h.store,
        "d1",
        "geography.pdf",
        "The capital of France is Paris, located on the Seine.",
    )
    .await;
    seed(
        &h.store,
        "d2",
        "bread.pdf",
        "Mix flour, water, and salt, then let the dough rest overnight.",
    )
    .await;

    let sources = h.service.search_sources("capital of France").await.unwrap();
    assert_eq!(sources[0].filename, "geography.pdf");
    assert_eq!(sources[0].document_id, "d1");
    assert!(!sources.iter().any(|s| s.filename == "bread.pdf"));
    assert_eq!(h.generator.call_count(), 0);
}

#[tokio::test]
async fn stats_count_completed_documents_and_chunks() {
    let h = harness(Language::En, &[]);
    seed(&h.store, "d1", "a.pdf", "Useful text for the first document body.").await;
    let _ = h.service.ingest("bad.pdf", b"not a valid pdf").await;

    let stats = h.service.stats().await.unwrap();
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.completed_documents, 1);
    assert_eq!(stats.total_chunks, 1);
}

#[tokio::test]
async fn delete_document_removes_chunks_and_blob() {
    let h = harness(Language::En, &[]);
    seed(&h.store, "d1", "a.pdf", "Some chunk text that will be deleted shortly.").await;

    assert!(h.service.delete_document("d1").await.unwrap());
    assert!(h.store.get_document("d1").await.unwrap().is_none());
    assert!(h.store.chunks_for_document("d1").await.unwrap().is_empty());

    // Deleting again reports not found
    assert!(!h.service.delete_document("d1").await.unwrap());
}

#[tokio::test]
async fn flush_resets_the_corpus() {
    let h = harness(Language::En, &[]);
    seed(&h.store, "d1", "a.pdf", "Some chunk text that will be flushed away.").await;

    h.service.flush().await.unwrap();
    assert!(h.store.list_documents().await.unwrap().is_empty());

    let result = h.service.query("anything").await.unwrap();
    assert!(result.answer.contains("don't have any documents"));
}

#[tokio::test]
async fn every_query_outcome_is_audited() {
    let h = harness(Language::En, &["Grounded answer."]);

    // Outcome 1: empty corpus
    h.service.query("first question").await.unwrap();

    // Outcome 2: grounded answer
    seed(
        &h.store,
        "d1",
        "geography.pdf",
        "The capital of France is Paris, located on the Seine.",
    )
    .await;
    h.service.query("What is the capital of France?").await.unwrap();

    let queries = h.store.list_queries(10).await.unwrap();
    assert_eq!(queries.len(), 2);
    // Most recent first
    assert_eq!(queries[0].answer, "Grounded answer.");
    assert!(queries[0].sources.contains("geography.pdf"));
    assert!(queries[1].answer.contains("don't have any documents"));
    assert_eq!(queries[1].sources, "[]");
}
