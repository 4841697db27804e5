//! Core data models shared across ingestion, retrieval, and the API layer.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an uploaded document.
///
/// A document is created as `Processing` and moved exactly once to
/// `Completed` (with its final chunk count) or `Failed`. Only `Completed`
/// documents participate in retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(DocumentStatus::Processing),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }
}

/// An uploaded document as stored in the relational store.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    /// Filename as supplied at upload time; used for source attribution.
    pub original_filename: String,
    /// Blob-store key of the raw bytes (`documents/{id}/{filename}`).
    pub stored_name: String,
    pub file_size: i64,
    pub status: DocumentStatus,
    pub chunk_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A retrieval unit: one bounded passage of a document's text.
///
/// Immutable once created; deleted together with its parent document.
/// `chunk_index` is unique and ordering-stable within the document.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRecord {
    pub id: String,
    pub document_id: String,
    pub text: String,
    pub page_number: i64,
    pub chunk_index: i64,
    pub word_count: i64,
}

/// Ephemeral pairing of a chunk with its relevance score for one query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: ChunkRecord,
    pub score: f64,
}

/// A document ranked by its best chunk score, for source attribution.
#[derive(Debug, Clone, Serialize)]
pub struct SourceScore {
    pub document_id: String,
    pub filename: String,
    pub score: f64,
}

/// The final answer produced for one question.
///
/// `sources` entries are `documentId|filename` pairs so callers can resolve
/// the original file without a second lookup. `confidence` is always in
/// `[0.0, 1.0]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub context: String,
}

/// Audit record of one answered (or refused) question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub confidence: f64,
    /// JSON-serialized list of `documentId|filename` strings.
    pub sources: String,
    pub context: String,
    pub created_at: i64,
}

/// A chat session grouping a transcript of messages.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One message in a chat session transcript.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    /// JSON-serialized sources for assistant messages, `"[]"` otherwise.
    pub sources: String,
    pub confidence: f64,
    pub created_at: i64,
}

/// Aggregate corpus counters reported by the stats command and endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub total_documents: usize,
    pub completed_documents: usize,
    pub total_chunks: i64,
}
