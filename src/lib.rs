//! # docqa
//!
//! Retrieval-grounded question answering over private PDF collections.
//!
//! Uploaded PDFs are split into overlapping text chunks; questions are
//! answered by ranking chunks with a lexical relevance scorer, assembling
//! the best passages into a grounding context, and gating the generated
//! answer on grounding quality.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration loading and validation |
//! | [`models`] | Shared record and result types |
//! | [`extract`] | Per-page PDF text extraction |
//! | [`chunker`] | Page-text cleaning and overlapping chunking |
//! | [`score`] | Lexical relevance scoring |
//! | [`retrieval`] | Chunk ranking, context assembly, source ranking |
//! | [`answer`] | Grounding prompts, canned answers, marker detection |
//! | [`llm`] | Text-generation providers (Ollama, Gemini, disabled) |
//! | [`blob`] | Blob storage for uploaded bytes |
//! | [`store`] | Relational storage (SQLite, in-memory) |
//! | [`db`] / [`migrate`] | SQLite pool setup and schema migrations |
//! | [`service`] | Ingestion and question-answering orchestration |
//! | [`server`] | JSON HTTP API |

pub mod answer;
pub mod blob;
pub mod chunker;
pub mod config;
pub mod db;
pub mod extract;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod retrieval;
pub mod score;
pub mod server;
pub mod service;
pub mod store;
