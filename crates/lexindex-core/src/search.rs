//! Similarity ranking over stored chunks.
//!
//! The ranking algorithm is a pure function of the chunks and a query
//! vector, with no locking or embedding concerns; [`Index`](crate::index::Index)
//! calls it on a consistent snapshot of the corpus.
//!
//! # Algorithm
//!
//! 1. Score every chunk by cosine similarity to the query vector
//!    (chunks without an embedding score `0.0`).
//! 2. Keep chunks scoring strictly above `threshold`.
//! 3. Sort by similarity, descending. The sort is stable: equal scores keep
//!    their insertion order.
//! 4. Truncate to `k`.

use std::cmp::Ordering;

use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::{Chunk, SearchResult};

/// Default minimum similarity for a chunk to be returned.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.3;

/// Context block returned when nothing passed the threshold.
pub const NO_CONTEXT: &str = "No relevant documents found in the Knowledge Base.";

/// Reject `k == 0` and thresholds outside `[-1, 1]`.
pub fn validate_request(k: usize, threshold: f32) -> Result<()> {
    if k == 0 {
        return Err(Error::invalid_config("k must be >= 1"));
    }
    if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
        return Err(Error::invalid_config(format!(
            "relevance threshold must be within [-1.0, 1.0], got {}",
            threshold
        )));
    }
    Ok(())
}

/// Score of a single chunk against the query.
pub fn score_chunk(chunk: &Chunk, query_vec: &[f32]) -> f32 {
    chunk
        .embedding
        .as_deref()
        .map(|v| cosine_similarity(query_vec, v))
        .unwrap_or(0.0)
}

/// Rank `chunks` against `query_vec`, returning at most `k` results above
/// `threshold`.
pub fn rank<'a, I>(chunks: I, query_vec: &[f32], threshold: f32, k: usize) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    let mut scored: Vec<(&Chunk, f32)> = chunks
        .into_iter()
        .map(|c| (c, score_chunk(c, query_vec)))
        .filter(|(_, sim)| *sim > threshold)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(chunk, similarity)| SearchResult {
            chunk: chunk.clone(),
            similarity,
        })
        .collect()
}

/// Build the context block handed to a downstream answer generator.
///
/// ```text
/// <RAG_CONTEXT>
/// [Source: Smith v. Jones (Part 1) (CASE_LAW)]
/// ...chunk text...
///
/// [Source: Lease Agreement (Part 3) (CONTRACT)]
/// ...chunk text...
/// </RAG_CONTEXT>
/// ```
pub fn format_context(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_CONTEXT.to_string();
    }
    let matches = results
        .iter()
        .map(|r| {
            format!(
                "[Source: {} ({})]\n{}",
                r.chunk.title, r.chunk.doc_type, r.chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("<RAG_CONTEXT>\n{}\n</RAG_CONTEXT>", matches)
}
