//! Core data models used throughout lexindex.
//!
//! These types represent the documents, chunks, and search results that flow
//! through the ingestion and retrieval pipeline, plus the per-chunk report
//! returned from ingestion.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Closed set of document kinds accepted by the index.
///
/// Serialized as `CASE_LAW`, `STATUTE`, `CONTRACT`, `MEMO`. Parsing via
/// [`FromStr`] is lenient about case and separators, so `case-law`,
/// `case_law` and `CASE_LAW` all resolve to [`DocType::CaseLaw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocType {
    CaseLaw,
    Statute,
    Contract,
    Memo,
}

impl DocType {
    pub const ALL: [DocType; 4] = [
        DocType::CaseLaw,
        DocType::Statute,
        DocType::Contract,
        DocType::Memo,
    ];

    /// Canonical wire label, e.g. `"CASE_LAW"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::CaseLaw => "CASE_LAW",
            DocType::Statute => "STATUTE",
            DocType::Contract => "CONTRACT",
            DocType::Memo => "MEMO",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "CASE_LAW" | "CASELAW" => Ok(DocType::CaseLaw),
            "STATUTE" => Ok(DocType::Statute),
            "CONTRACT" => Ok(DocType::Contract),
            "MEMO" => Ok(DocType::Memo),
            _ => Err(Error::invalid_config(format!(
                "unknown document type '{}': expected case-law, statute, contract or memo",
                s
            ))),
        }
    }
}

/// A document as handed to [`Index::ingest`](crate::index::Index::ingest).
///
/// `id` is optional: when absent (or blank) a fresh UUID is assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub doc_type: DocType,
    pub date: NaiveDate,
    pub content: String,
}

impl NewDocument {
    pub fn new(
        title: impl Into<String>,
        doc_type: DocType,
        date: NaiveDate,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            doc_type,
            date,
            content: content.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A document retained by the index.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub doc_type: DocType,
    pub date: NaiveDate,
    pub content: String,
    pub ingested_at: DateTime<Utc>,
}

/// A contiguous span of a document plus its embedding.
///
/// `start` and `end` are character offsets into the parent document's
/// content. The embedding is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    /// Display title, `"{document title} (Part {chunk_index + 1})"`.
    pub title: String,
    pub doc_type: DocType,
    pub date: NaiveDate,
    pub start: usize,
    pub end: usize,
    pub content: String,
    /// SHA-256 of `content`, hex encoded.
    pub hash: String,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// Derive the deterministic chunk id for `(document_id, chunk_index)`.
pub fn chunk_id(document_id: &str, chunk_index: usize) -> String {
    format!("{}-chunk-{}", document_id, chunk_index)
}

/// A chunk decorated with its cosine similarity to a query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Lightweight document metadata for listings.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMetadata {
    pub id: String,
    pub title: String,
    pub doc_type: DocType,
    pub date: NaiveDate,
    pub ingested_at: DateTime<Utc>,
    /// Number of chunks currently stored for this document.
    pub chunk_count: usize,
}

/// Full document response including body and stored chunks.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub metadata: DocumentMetadata,
    pub content: String,
    pub chunks: Vec<ChunkResponse>,
}

/// A single stored chunk within a [`DocumentResponse`].
#[derive(Debug, Clone, Serialize)]
pub struct ChunkResponse {
    pub id: String,
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub embedded: bool,
}

/// What happened to one chunk during ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkOutcome {
    pub chunk_id: String,
    pub chunk_index: usize,
    pub start: usize,
    pub end: usize,
    /// `None` when the chunk was embedded and stored.
    pub error: Option<String>,
}

impl ChunkOutcome {
    pub fn is_embedded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a single ingestion.
///
/// `chunks_inserted < chunks_produced` signals a partially embedded
/// document; [`IngestReport::failures`] names the spans that were skipped.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunks_produced: usize,
    pub chunks_inserted: usize,
    /// Chunks from an earlier ingestion of the same id that were dropped.
    pub chunks_replaced: usize,
    pub outcomes: Vec<ChunkOutcome>,
}

impl IngestReport {
    pub fn failures(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.outcomes.iter().filter(|o| !o.is_embedded())
    }

    pub fn is_partial(&self) -> bool {
        self.chunks_inserted < self.chunks_produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_parsing_is_lenient() {
        assert_eq!("case-law".parse::<DocType>().unwrap(), DocType::CaseLaw);
        assert_eq!("CASE_LAW".parse::<DocType>().unwrap(), DocType::CaseLaw);
        assert_eq!("Statute".parse::<DocType>().unwrap(), DocType::Statute);
        assert_eq!(" memo ".parse::<DocType>().unwrap(), DocType::Memo);
        assert!("brief".parse::<DocType>().is_err());
    }

    #[test]
    fn test_doc_type_serde_labels() {
        let json = serde_json::to_string(&DocType::CaseLaw).unwrap();
        assert_eq!(json, "\"CASE_LAW\"");
        let parsed: DocType = serde_json::from_str("\"CONTRACT\"").unwrap();
        assert_eq!(parsed, DocType::Contract);
        assert!(serde_json::from_str::<DocType>("\"OPINION\"").is_err());
    }

    #[test]
    fn test_chunk_id_is_deterministic() {
        assert_eq!(chunk_id("doc1", 0), "doc1-chunk-0");
        assert_eq!(chunk_id("doc1", 7), chunk_id("doc1", 7));
    }

    #[test]
    fn test_embedding_not_serialized() {
        let chunk = Chunk {
            id: chunk_id("d", 0),
            document_id: "d".into(),
            chunk_index: 0,
            title: "T (Part 1)".into(),
            doc_type: DocType::Memo,
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            start: 0,
            end: 3,
            content: "abc".into(),
            hash: String::new(),
            embedding: Some(vec![1.0, 2.0]),
        };
        let value = serde_json::to_value(SearchResult {
            chunk,
            similarity: 0.5,
        })
        .unwrap();
        assert!(value.get("embedding").is_none());
        assert_eq!(value["similarity"], 0.5);
        assert_eq!(value["doc_type"], "MEMO");
        assert_eq!(value["date"], "2024-01-02");
    }
}
