//! In-memory [`Store`] implementation for testing.
//!
//! Uses `Vec`s behind `std::sync::RwLock` for thread safety; insertion
//! order doubles as listing order.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{
    ChatMessage, ChatSession, ChunkRecord, DocumentRecord, DocumentStatus, QueryRecord,
};

use super::Store;

#[derive(Default)]
struct Inner {
    documents: Vec<DocumentRecord>,
    chunks: Vec<ChunkRecord>,
    queries: Vec<QueryRecord>,
    sessions: Vec<ChatSession>,
    messages: Vec<ChatMessage>,
}

/// In-memory store for tests.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_document(&self, doc: &DocumentRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.documents.iter().any(|d| d.id == doc.id) {
            bail!("document already exists: {}", doc.id);
        }
        inner.documents.push(doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.documents.clone())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        let before = inner.documents.len();
        inner.documents.retain(|d| d.id != id);
        inner.chunks.retain(|c| c.document_id != id);
        Ok(inner.documents.len() < before)
    }

    async fn set_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
        chunk_count: i64,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let doc = inner
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| anyhow::anyhow!("document not found: {}", id))?;
        doc.status = status;
        doc.chunk_count = chunk_count;
        doc.updated_at = chrono::Utc::now().timestamp();
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &ChunkRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.chunks.push(chunk.clone());
        Ok(())
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<ChunkRecord>> {
        let inner = self.inner.read().unwrap();
        let mut chunks: Vec<ChunkRecord> = inner
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn insert_query(&self, record: &QueryRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.queries.push(record.clone());
        Ok(())
    }

    async fn list_queries(&self, limit: i64) -> Result<Vec<QueryRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .queries
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn create_session(&self, session: &ChatSession) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.sessions.push(session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.sessions.clone())
    }

    async fn rename_session(&self, id: &str, title: &str) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        match inner.sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.title = title.to_string();
                session.updated_at = chrono::Utc::now().timestamp();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_session(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        let before = inner.sessions.len();
        inner.sessions.retain(|s| s.id != id);
        inner.messages.retain(|m| m.session_id != id);
        Ok(inner.sessions.len() < before)
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.messages.push(message.clone());
        Ok(())
    }

    async fn messages_for_session(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn flush(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        *inner = Inner::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            original_filename: format!("{}.pdf", id),
            stored_name: format!("documents/{}/{}.pdf", id, id),
            file_size: 10,
            status: DocumentStatus::Processing,
            chunk_count: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn chunk(doc_id: &str, index: i64) -> ChunkRecord {
        ChunkRecord {
            id: format!("{}_p1_c{}", doc_id, index),
            document_id: doc_id.to_string(),
            text: "chunk body text that is long enough to matter".to_string(),
            page_number: 1,
            chunk_index: index,
            word_count: 8,
        }
    }

    #[tokio::test]
    async fn document_lifecycle() {
        let store = InMemoryStore::new();
        store.insert_document(&doc("d1")).await.unwrap();
        assert!(store.insert_document(&doc("d1")).await.is_err());

        store
            .set_document_status("d1", DocumentStatus::Completed, 3)
            .await
            .unwrap();
        let fetched = store.get_document("d1").await.unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Completed);
        assert_eq!(fetched.chunk_count, 3);

        assert!(store.delete_document("d1").await.unwrap());
        assert!(!store.delete_document("d1").await.unwrap());
    }

    #[tokio::test]
    async fn delete_document_cascades_chunks() {
        let store = InMemoryStore::new();
        store.insert_document(&doc("d1")).await.unwrap();
        store.insert_chunk(&chunk("d1", 0)).await.unwrap();
        store.insert_chunk(&chunk("d1", 1)).await.unwrap();

        store.delete_document("d1").await.unwrap();
        assert!(store.chunks_for_document("d1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chunks_come_back_ordered() {
        let store = InMemoryStore::new();
        store.insert_document(&doc("d1")).await.unwrap();
        store.insert_chunk(&chunk("d1", 2)).await.unwrap();
        store.insert_chunk(&chunk("d1", 0)).await.unwrap();
        store.insert_chunk(&chunk("d1", 1)).await.unwrap();

        let chunks = store.chunks_for_document("d1").await.unwrap();
        let indices: Vec<i64> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn queries_list_most_recent_first() {
        let store = InMemoryStore::new();
        for i in 0..3 {
            store
                .insert_query(&QueryRecord {
                    id: format!("q{}", i),
                    question: format!("question {}", i),
                    answer: "answer".to_string(),
                    confidence: 0.5,
                    sources: "[]".to_string(),
                    context: String::new(),
                    created_at: i,
                })
                .await
                .unwrap();
        }
        let queries = store.list_queries(2).await.unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].id, "q2");
    }

    #[tokio::test]
    async fn flush_wipes_everything() {
        let store = InMemoryStore::new();
        store.insert_document(&doc("d1")).await.unwrap();
        store.insert_chunk(&chunk("d1", 0)).await.unwrap();
        store.flush().await.unwrap();
        assert!(store.list_documents().await.unwrap().is_empty());
        assert!(store.chunks_for_document("d1").await.unwrap().is_empty());
    }
}
