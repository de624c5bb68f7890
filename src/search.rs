//! One-shot search for the `lex search` command.
//!
//! Loads a directory into a fresh index, runs a single retrieval, and prints
//! either a ranked list or the context block a generator would receive.

use anyhow::Result;
use lexindex_core::search::format_context;
use lexindex_core::{DocType, SearchResult};
use std::path::Path;

use crate::config::Config;
use crate::loader::ingest_directory;

const EXCERPT_CHARS: usize = 160;

/// Options for [`run_search`]; `None` falls back to the configuration.
#[derive(Debug, Default)]
pub struct SearchOptions {
    pub k: Option<usize>,
    pub threshold: Option<f32>,
    pub doc_type: Option<DocType>,
    /// Print the context block instead of the ranked list.
    pub context: bool,
}

pub async fn run_search(config: &Config, dir: &Path, query: &str, opts: &SearchOptions) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be empty");
    }

    if !config.embedding.is_enabled() {
        eprintln!("warning: embedding provider is disabled; no chunk can be indexed");
    }

    let index = config.build_index()?;
    let default_type = opts.doc_type.unwrap_or_else(|| config.default_doc_type());
    let reports = ingest_directory(&index, dir, default_type).await?;

    let failed: usize = reports.iter().map(|r| r.failures().count()).sum();
    if failed > 0 {
        eprintln!(
            "warning: {} chunk(s) could not be embedded and were skipped",
            failed
        );
    }

    let k = opts.k.unwrap_or(config.retrieval.default_k);
    let threshold = opts
        .threshold
        .unwrap_or(config.retrieval.relevance_threshold);
    let results = index.retrieve_with_threshold(query, k, threshold).await?;

    if opts.context {
        println!("{}", format_context(&results));
    } else {
        print_results(&results);
    }
    Ok(())
}

pub fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }

    for (i, result) in results.iter().enumerate() {
        let chunk = &result.chunk;
        println!(
            "{}. [{:.2}] {} / {}",
            i + 1,
            result.similarity,
            chunk.doc_type,
            chunk.title
        );
        println!("    date: {}", chunk.date);
        println!("    span: {}..{}", chunk.start, chunk.end);
        println!("    excerpt: \"{}\"", excerpt(&chunk.content));
        println!("    id: {}", chunk.id);
        println!();
    }
}

fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    match flat.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat.to_string(),
    }
}
