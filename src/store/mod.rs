//! Relational storage abstraction.
//!
//! The [`Store`] trait defines every persistence operation the service
//! needs, enabling pluggable backends. [`SqliteStore`](sqlite::SqliteStore)
//! is the production implementation; [`InMemoryStore`](memory::InMemoryStore)
//! backs the tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    ChatMessage, ChatSession, ChunkRecord, DocumentRecord, DocumentStatus, QueryRecord,
};

/// Abstract relational backend.
///
/// Deleting a document cascades to its chunks. Deleting a session cascades
/// to its messages.
#[async_trait]
pub trait Store: Send + Sync {
    // Documents
    async fn insert_document(&self, doc: &DocumentRecord) -> Result<()>;
    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>>;
    /// Lists documents in insertion order.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>>;
    /// Returns `false` when no document with the id existed.
    async fn delete_document(&self, id: &str) -> Result<bool>;
    /// Moves a document to a terminal status, recording its chunk count.
    async fn set_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
        chunk_count: i64,
    ) -> Result<()>;

    // Chunks
    async fn insert_chunk(&self, chunk: &ChunkRecord) -> Result<()>;
    /// Returns a document's chunks ordered by `chunk_index`.
    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<ChunkRecord>>;

    // Query audit
    async fn insert_query(&self, record: &QueryRecord) -> Result<()>;
    /// Most recent first.
    async fn list_queries(&self, limit: i64) -> Result<Vec<QueryRecord>>;

    // Chat sessions
    async fn create_session(&self, session: &ChatSession) -> Result<()>;
    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>>;
    async fn list_sessions(&self) -> Result<Vec<ChatSession>>;
    async fn rename_session(&self, id: &str, title: &str) -> Result<bool>;
    async fn delete_session(&self, id: &str) -> Result<bool>;
    async fn insert_message(&self, message: &ChatMessage) -> Result<()>;
    /// Oldest first.
    async fn messages_for_session(&self, session_id: &str) -> Result<Vec<ChatMessage>>;

    /// Wipes all stored data.
    async fn flush(&self) -> Result<()>;
}
