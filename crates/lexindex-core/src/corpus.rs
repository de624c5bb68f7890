//! In-memory corpus: document metadata plus the chunk list.
//!
//! All state sits behind one `std::sync::RwLock`, which is the only mutual
//! exclusion boundary in the index. Writers hold it just long enough to
//! record metadata or append an already-embedded batch; readers hold it for
//! one scoring pass. It is never held across an embedding call.
//!
//! Vector search is brute-force cosine similarity over all stored chunks.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::ReingestPolicy;
use crate::error::Error;
use crate::models::{Chunk, ChunkResponse, Document, DocumentMetadata, DocumentResponse};

#[derive(Default)]
struct State {
    documents: Vec<Document>,
    positions: HashMap<String, usize>,
    chunks: Vec<Chunk>,
    /// Embedding length fixed by the first stored vector.
    dims: Option<usize>,
}

impl State {
    fn chunk_count(&self, document_id: &str) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .count()
    }

    fn metadata(&self, doc: &Document) -> DocumentMetadata {
        DocumentMetadata {
            id: doc.id.clone(),
            title: doc.title.clone(),
            doc_type: doc.doc_type,
            date: doc.date,
            ingested_at: doc.ingested_at,
            chunk_count: self.chunk_count(&doc.id),
        }
    }
}

/// Outcome of appending one document's embedded chunks.
#[derive(Debug, Default)]
pub struct AppendOutcome {
    pub inserted: usize,
    pub replaced: usize,
    /// Chunks refused because their vector length disagreed with the corpus.
    pub rejected: Vec<(usize, Error)>,
}

/// Thread-safe, append-only chunk store.
#[derive(Default)]
pub struct Corpus {
    state: RwLock<State>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite a document's metadata (last write wins).
    ///
    /// A re-ingested id keeps its original listing position.
    pub fn upsert_document(&self, doc: Document) {
        let mut state = self.write();
        match state.positions.get(&doc.id).copied() {
            Some(pos) => state.documents[pos] = doc,
            None => {
                let pos = state.documents.len();
                state.positions.insert(doc.id.clone(), pos);
                state.documents.push(doc);
            }
        }
    }

    /// Append a document's chunks as one atomic batch, in the given order.
    pub fn append_chunks(
        &self,
        document_id: &str,
        chunks: Vec<Chunk>,
        policy: ReingestPolicy,
    ) -> AppendOutcome {
        let mut state = self.write();
        let mut outcome = AppendOutcome::default();

        if policy == ReingestPolicy::Replace {
            let before = state.chunks.len();
            state.chunks.retain(|c| c.document_id != document_id);
            outcome.replaced = before - state.chunks.len();
            if state.chunks.is_empty() {
                state.dims = None;
            }
        }

        for chunk in chunks {
            if let Some(len) = chunk.embedding.as_ref().map(Vec::len) {
                let dims = state.dims;
                match dims {
                    Some(expected) if expected != len => {
                        outcome.rejected.push((
                            chunk.chunk_index,
                            Error::DimensionMismatch {
                                expected,
                                actual: len,
                            },
                        ));
                        continue;
                    }
                    Some(_) => {}
                    None => state.dims = Some(len),
                }
            }
            state.chunks.push(chunk);
            outcome.inserted += 1;
        }
        outcome
    }

    /// Run `f` over a consistent view of the stored chunks and the corpus
    /// dimensionality.
    pub fn with_chunks<R>(&self, f: impl FnOnce(&[Chunk], Option<usize>) -> R) -> R {
        let state = self.read();
        f(&state.chunks, state.dims)
    }

    /// All documents in first-ingestion order.
    pub fn list_documents(&self) -> Vec<DocumentMetadata> {
        let state = self.read();
        state.documents.iter().map(|d| state.metadata(d)).collect()
    }

    pub fn get_document(&self, id: &str) -> Option<DocumentResponse> {
        let state = self.read();
        let doc = &state.documents[*state.positions.get(id)?];
        let chunks = state
            .chunks
            .iter()
            .filter(|c| c.document_id == id)
            .map(|c| ChunkResponse {
                id: c.id.clone(),
                index: c.chunk_index,
                start: c.start,
                end: c.end,
                text: c.content.clone(),
                embedded: c.embedding.is_some(),
            })
            .collect();
        Some(DocumentResponse {
            metadata: state.metadata(doc),
            content: doc.content.clone(),
            chunks,
        })
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.read().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().chunks.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.read().documents.len()
    }

    pub fn dims(&self) -> Option<usize> {
        self.read().dims
    }

    /// Drop every document and chunk.
    pub fn clear(&self) {
        *self.write() = State::default();
    }
}
