//! The retrieval index: ingestion and similarity retrieval over a [`Corpus`].
//!
//! # Ingestion
//!
//! 1. Record the document's metadata (last write wins per id).
//! 2. Split the content with the index-wide [`Chunker`].
//! 3. Embed every chunk through the retrying embedder, `concurrency` calls at
//!    a time, paced by the [`RateLimiter`]. A failed chunk is logged, noted in
//!    the [`IngestReport`], and skipped; it never aborts the document.
//! 4. Append the embedded chunks in `chunk_index` order as one batch.
//!
//! # Retrieval
//!
//! 1. Empty corpus → empty result, without calling the embedder.
//! 2. Embed the query through the same retrying, paced embedder; a failure
//!    here fails the call.
//! 3. Rank a consistent snapshot of the corpus with [`rank`].
//!
//! No lock is held while an embedding call is in flight.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunk::{content_hash, Chunker};
use crate::config::IndexConfig;
use crate::corpus::Corpus;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::limiter::RateLimiter;
use crate::models::{
    chunk_id, Chunk, ChunkOutcome, Document, DocumentMetadata, DocumentResponse, IngestReport,
    NewDocument, SearchResult,
};
use crate::retry::RetryingEmbedder;
use crate::search::{format_context, rank, validate_request};

/// Owns a corpus and the embedding pipeline that feeds it.
///
/// Construct one per corpus and share it behind an `Arc`; every method takes
/// `&self`.
pub struct Index {
    config: IndexConfig,
    chunker: Chunker,
    embedder: RetryingEmbedder<Arc<dyn Embedder>>,
    corpus: Corpus,
}

impl Index {
    /// Build an empty index.
    ///
    /// The embedder is wrapped with the config's retry policy and paced by a
    /// limiter using `min_request_interval_ms`.
    pub fn new(config: IndexConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let chunker = config.validate()?;
        let embedder = RetryingEmbedder::new(embedder, config.retry_policy())
            .with_limiter(RateLimiter::new(config.min_request_interval()));
        Ok(Self {
            config,
            chunker,
            embedder,
            corpus: Corpus::new(),
        })
    }

    /// Replace the request pacing policy.
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.embedder = self.embedder.with_limiter(limiter);
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Chunk, embed, and store a document.
    ///
    /// Only an invalid document (blank title) fails the call; embedding
    /// failures are reported per chunk.
    pub async fn ingest(&self, doc: NewDocument) -> Result<IngestReport> {
        let NewDocument {
            id,
            title,
            doc_type,
            date,
            content,
        } = doc;

        if title.trim().is_empty() {
            return Err(Error::invalid_config("document title must not be empty"));
        }
        let id = id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let spans = self.chunker.spans(&content);
        let chunks_produced = spans.len();
        self.corpus.upsert_document(Document {
            id: id.clone(),
            title: title.clone(),
            doc_type,
            date,
            content,
            ingested_at: Utc::now(),
        });
        info!(
            document_id = %id,
            title = %title,
            chunks = chunks_produced,
            "chunked document"
        );

        let embedder = &self.embedder;
        let texts: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
        let results: Vec<Result<Vec<f32>>> = stream::iter(texts)
            .map(|text| async move { embedder.embed(&text).await })
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut outcomes = Vec::with_capacity(chunks_produced);
        let mut embedded = Vec::with_capacity(chunks_produced);
        for (span, result) in spans.into_iter().zip(results) {
            let id_for_chunk = chunk_id(&id, span.index);
            let error = match result {
                Ok(vector) => {
                    embedded.push(Chunk {
                        id: id_for_chunk.clone(),
                        document_id: id.clone(),
                        chunk_index: span.index,
                        title: format!("{} (Part {})", title, span.index + 1),
                        doc_type,
                        date,
                        start: span.start,
                        end: span.end,
                        hash: content_hash(&span.text),
                        content: span.text,
                        embedding: Some(vector),
                    });
                    None
                }
                Err(err) => {
                    warn!(
                        document_id = %id,
                        chunk_index = span.index,
                        error = %err,
                        "failed to embed chunk, skipping"
                    );
                    Some(err.to_string())
                }
            };
            outcomes.push(ChunkOutcome {
                chunk_id: id_for_chunk,
                chunk_index: span.index,
                start: span.start,
                end: span.end,
                error,
            });
        }

        let appended = self
            .corpus
            .append_chunks(&id, embedded, self.config.reingest);
        for (chunk_index, err) in appended.rejected {
            warn!(
                document_id = %id,
                chunk_index,
                error = %err,
                "embedding has wrong dimensionality, skipping"
            );
            if let Some(outcome) = outcomes.get_mut(chunk_index) {
                outcome.error = Some(err.to_string());
            }
        }

        info!(
            document_id = %id,
            inserted = appended.inserted,
            produced = chunks_produced,
            replaced = appended.replaced,
            "ingested document"
        );

        Ok(IngestReport {
            document_id: id,
            chunks_produced,
            chunks_inserted: appended.inserted,
            chunks_replaced: appended.replaced,
            outcomes,
        })
    }

    /// Top `k` chunks above the configured relevance threshold.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        self.retrieve_with_threshold(query, k, self.config.relevance_threshold)
            .await
    }

    /// Top `k` chunks scoring strictly above `threshold`.
    pub async fn retrieve_with_threshold(
        &self,
        query: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        validate_request(k, threshold)?;

        if self.corpus.is_empty() {
            debug!("corpus is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(query).await?;

        let results = self.corpus.with_chunks(|chunks, dims| match dims {
            Some(expected) if expected != query_vec.len() => Err(Error::DimensionMismatch {
                expected,
                actual: query_vec.len(),
            }),
            _ => Ok(rank(chunks, &query_vec, threshold, k)),
        })?;

        info!(
            k,
            threshold = f64::from(threshold),
            results = results.len(),
            "retrieved chunks"
        );
        Ok(results)
    }

    /// Retrieve and render the results as a context block for a generator.
    pub async fn context(&self, query: &str, k: usize) -> Result<String> {
        Ok(format_context(&self.retrieve(query, k).await?))
    }

    pub fn list_documents(&self) -> Vec<DocumentMetadata> {
        self.corpus.list_documents()
    }

    pub fn get_document(&self, id: &str) -> Option<DocumentResponse> {
        self.corpus.get_document(id)
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.corpus.document_count()
    }

    /// Forget every document and chunk.
    pub fn clear(&self) {
        self.corpus.clear();
        info!("index cleared");
    }
}
