//! Pipeline orchestration: ingestion, question answering, source search.
//!
//! [`RagService`] wires the collaborators together. Every question outcome,
//! including refusals, is written to the query audit table; audit failures
//! are logged and never surfaced to the caller.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use uuid::Uuid;

use crate::answer::{
    clamp_confidence, grounding_prompt, indicates_missing_answer, insufficient_answer,
    no_content_answer, no_documents_answer, no_relevant_answer, translation_prompt, Language,
};
use crate::blob::BlobStore;
use crate::chunker::{chunk_page, clean_page_text};
use crate::config::{ChunkingConfig, RetrievalConfig};
use crate::extract::{extract_pages, ExtractError};
use crate::llm::TextGenerator;
use crate::models::{
    ChunkRecord, CorpusStats, DocumentRecord, DocumentStatus, QueryRecord, QueryResult,
    SourceScore,
};
use crate::retrieval::{assemble_context, rank_chunks, rank_sources, RetrievalParams};
use crate::score::query_tokens;
use crate::store::Store;

/// Terminal ingestion failure. The document record is left as `Failed`.
#[derive(Debug)]
pub enum IngestError {
    Extract(ExtractError),
    /// Extraction succeeded but no passage cleared the minimum chunk length.
    NoChunks,
    Other(anyhow::Error),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Extract(e) => write!(f, "{}", e),
            IngestError::NoChunks => write!(f, "no usable text chunks extracted from document"),
            IngestError::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<anyhow::Error> for IngestError {
    fn from(e: anyhow::Error) -> Self {
        IngestError::Other(e)
    }
}

/// The retrieval-and-grounding service.
pub struct RagService {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
    generator: Arc<dyn TextGenerator>,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
    language: Language,
}

impl RagService {
    pub fn new(
        store: Arc<dyn Store>,
        blobs: Arc<dyn BlobStore>,
        generator: Arc<dyn TextGenerator>,
        chunking: ChunkingConfig,
        retrieval: RetrievalConfig,
        language: Language,
    ) -> Self {
        Self {
            store,
            blobs,
            generator,
            chunking,
            retrieval,
            language,
        }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Ingests one uploaded PDF: stores the bytes, extracts and chunks the
    /// text, and moves the document to `Completed` or `Failed`.
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<DocumentRecord, IngestError> {
        let doc_id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        let stored_name = format!("documents/{}/{}", doc_id, filename);

        self.blobs
            .put(&stored_name, bytes)
            .await
            .map_err(IngestError::Other)?;

        let doc = DocumentRecord {
            id: doc_id.clone(),
            original_filename: filename.to_string(),
            stored_name,
            file_size: bytes.len() as i64,
            status: DocumentStatus::Processing,
            chunk_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_document(&doc)
            .await
            .map_err(IngestError::Other)?;

        let pages = match extract_pages(bytes) {
            Ok(pages) => pages,
            Err(e) => {
                self.mark_failed(&doc_id).await;
                return Err(IngestError::Extract(e));
            }
        };

        let mut chunks: Vec<ChunkRecord> = Vec::new();
        for page in &pages {
            let cleaned = clean_page_text(&page.text);
            if cleaned.is_empty() {
                continue;
            }
            let next_index = chunks.len() as i64;
            chunks.extend(chunk_page(
                &doc_id,
                page.number,
                next_index,
                &cleaned,
                &self.chunking,
            ));
        }

        if chunks.is_empty() {
            self.mark_failed(&doc_id).await;
            return Err(IngestError::NoChunks);
        }

        let mut inserted = 0i64;
        for chunk in &chunks {
            match self.store.insert_chunk(chunk).await {
                Ok(()) => inserted += 1,
                Err(e) => warn!(chunk = %chunk.id, error = %e, "failed to store chunk"),
            }
        }

        self.store
            .set_document_status(&doc_id, DocumentStatus::Completed, inserted)
            .await
            .map_err(IngestError::Other)?;

        info!(
            document = %doc_id,
            filename = %filename,
            pages = pages.len(),
            chunks = inserted,
            "document ingested"
        );

        Ok(DocumentRecord {
            status: DocumentStatus::Completed,
            chunk_count: inserted,
            ..doc
        })
    }

    async fn mark_failed(&self, doc_id: &str) {
        if let Err(e) = self
            .store
            .set_document_status(doc_id, DocumentStatus::Failed, 0)
            .await
        {
            warn!(document = %doc_id, error = %e, "failed to mark document as failed");
        }
    }

    /// Answers a question against the corpus.
    ///
    /// Degenerate corpus states come back as valid zero-confidence results;
    /// only generation-backend failures are errors.
    pub async fn query(&self, question: &str) -> Result<QueryResult> {
        let tokens = query_tokens(question);

        let documents = self.store.list_documents().await?;
        if documents.is_empty() {
            return Ok(self
                .finish(question, no_documents_answer().to_string(), vec![], 0.0, String::new())
                .await);
        }

        let doc_chunks = self.completed_chunks(&documents).await;
        let all_chunks: Vec<ChunkRecord> = doc_chunks
            .iter()
            .flat_map(|(_, chunks)| chunks.iter().cloned())
            .collect();
        if all_chunks.is_empty() {
            return Ok(self
                .finish(question, no_content_answer().to_string(), vec![], 0.0, String::new())
                .await);
        }

        let ranked = rank_chunks(&tokens, all_chunks.clone());
        let mut ctx = assemble_context(&ranked, &RetrievalParams::primary(&self.retrieval));
        if ctx.is_empty() {
            ctx = assemble_context(&ranked, &RetrievalParams::fallback(&self.retrieval));
        }

        // Cross-lingual retry, at most once: translate the question to
        // English and re-rank with the translated tokens.
        if ctx.is_empty() && self.language != Language::En {
            match self.generator.generate(&translation_prompt(question)).await {
                Ok(translated) if !translated.trim().is_empty() => {
                    let en_tokens = query_tokens(&translated);
                    let reranked = rank_chunks(&en_tokens, all_chunks);
                    ctx = assemble_context(
                        &reranked,
                        &RetrievalParams::translation_retry(&self.retrieval),
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "question translation failed"),
            }
        }

        if ctx.is_empty() {
            return Ok(self
                .finish(question, no_relevant_answer().to_string(), vec![], 0.0, String::new())
                .await);
        }

        let prompt = grounding_prompt(self.language, &ctx.context, question);
        let answer = self.generator.generate(&prompt).await?;

        if indicates_missing_answer(&answer) {
            return Ok(self
                .finish(
                    question,
                    insufficient_answer(self.language).to_string(),
                    vec![],
                    0.0,
                    ctx.context,
                )
                .await);
        }

        let sources: Vec<String> = rank_sources(
            &tokens,
            &doc_chunks,
            self.retrieval.source_floor,
            self.retrieval.max_sources,
        )
        .into_iter()
        .map(|s| format!("{}|{}", s.document_id, s.filename))
        .collect();

        let confidence = clamp_confidence(ctx.best_score);
        Ok(self
            .finish(question, answer, sources, confidence, ctx.context)
            .await)
    }

    /// Ranks completed documents against a question without generating an
    /// answer.
    pub async fn search_sources(&self, question: &str) -> Result<Vec<SourceScore>> {
        let tokens = query_tokens(question);
        let documents = self.store.list_documents().await?;
        let doc_chunks = self.completed_chunks(&documents).await;
        Ok(rank_sources(
            &tokens,
            &doc_chunks,
            self.retrieval.source_floor,
            self.retrieval.max_sources,
        ))
    }

    pub async fn stats(&self) -> Result<CorpusStats> {
        let documents = self.store.list_documents().await?;
        let completed: Vec<&DocumentRecord> = documents
            .iter()
            .filter(|d| d.status == DocumentStatus::Completed)
            .collect();
        Ok(CorpusStats {
            total_documents: documents.len(),
            completed_documents: completed.len(),
            total_chunks: completed.iter().map(|d| d.chunk_count).sum(),
        })
    }

    /// Deletes a document, its chunks, and its blob. Returns `false` when
    /// the document did not exist.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        let Some(doc) = self.store.get_document(id).await? else {
            return Ok(false);
        };
        self.store.delete_document(id).await?;
        if let Err(e) = self.blobs.delete(&doc.stored_name).await {
            warn!(document = %id, error = %e, "failed to delete blob");
        }
        Ok(true)
    }

    /// Wipes the store and the blob store.
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await?;
        self.blobs.delete_all().await?;
        info!("corpus flushed");
        Ok(())
    }

    /// Fetches chunks for every completed document; per-document fetch
    /// failures are logged and the document is skipped.
    async fn completed_chunks(
        &self,
        documents: &[DocumentRecord],
    ) -> Vec<(DocumentRecord, Vec<ChunkRecord>)> {
        let mut out = Vec::new();
        for doc in documents {
            if doc.status != DocumentStatus::Completed {
                continue;
            }
            match self.store.chunks_for_document(&doc.id).await {
                Ok(chunks) => out.push((doc.clone(), chunks)),
                Err(e) => {
                    warn!(document = %doc.id, error = %e, "failed to fetch chunks")
                }
            }
        }
        out
    }

    /// Builds the final result and writes the audit record. Audit failures
    /// are logged, never surfaced.
    async fn finish(
        &self,
        question: &str,
        answer: String,
        sources: Vec<String>,
        confidence: f64,
        context: String,
    ) -> QueryResult {
        let result = QueryResult {
            answer,
            sources,
            confidence,
            context,
        };

        let record = QueryRecord {
            id: Uuid::new_v4().to_string(),
            question: question.to_string(),
            answer: result.answer.clone(),
            confidence: result.confidence,
            sources: serde_json::to_string(&result.sources).unwrap_or_else(|_| "[]".to_string()),
            context: result.context.clone(),
            created_at: chrono::Utc::now().timestamp(),
        };
        if let Err(e) = self.store.insert_query(&record).await {
            warn!(error = %e, "failed to store query audit record");
        }

        result
    }
}
