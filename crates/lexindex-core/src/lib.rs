//! # lexindex core
//!
//! Retrieval engine for legal documents: overlapping chunking, embedding
//! through a pluggable [`Embedder`], and cosine-similarity retrieval over an
//! in-memory corpus.
//!
//! ```text
//! ingest:   NewDocument ─▶ Chunker ─▶ Embedder (retry, rate limit, N workers) ─▶ Corpus
//! retrieve: query ─▶ Embedder ─▶ rank(corpus snapshot) ─▶ top-k SearchResult
//! ```
//!
//! This crate has no HTTP, file or configuration-file dependencies; concrete
//! embedding providers and the server live in the `lexindex` app crate.

pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod index;
pub mod limiter;
pub mod models;
pub mod retry;
pub mod search;

pub use config::{IndexConfig, ReingestPolicy};
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use index::Index;
pub use models::{DocType, IngestReport, NewDocument, SearchResult};
