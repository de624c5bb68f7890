//! `lex chunk`: show how a file would be split, without embedding it.

use anyhow::{Context, Result};
use lexindex_core::chunk::ChunkSpan;
use std::path::Path;

use crate::config::Config;

pub fn run_chunk(config: &Config, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let chunker = config.index_config().validate()?;
    let spans = chunker.spans(&text);

    println!(
        "{}: {} chars, {} chunk(s) (size {}, overlap {})",
        path.display(),
        text.chars().count(),
        spans.len(),
        chunker.size(),
        chunker.overlap()
    );
    for span in &spans {
        println!("{}", describe(span));
    }
    Ok(())
}

fn describe(span: &ChunkSpan) -> String {
    let preview: String = span.text.chars().take(60).collect();
    format!(
        "  #{} [{}..{}] \"{}\"",
        span.index,
        span.start,
        span.end,
        preview.replace('\n', " ")
    )
}
