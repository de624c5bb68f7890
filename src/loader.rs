//! Plain-text document loader.
//!
//! Walks a directory for `.txt` and `.md` files and turns each into a
//! [`NewDocument`]. The relative path becomes the document id, the file name
//! the title, and the modification time the date. The document type comes
//! from the nearest ancestor directory named after a type:
//!
//! | Directory | Type |
//! |-----------|------|
//! | `case-law`, `case_law`, `cases` | `CASE_LAW` |
//! | `statute`, `statutes` | `STATUTE` |
//! | `contract`, `contracts` | `CONTRACT` |
//! | `memo`, `memos` | `MEMO` |
//!
//! Anything else gets the caller's default.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use lexindex_core::{DocType, Index, IngestReport, NewDocument};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

const EXTENSIONS: &[&str] = &["txt", "md"];

pub fn load_documents(root: &Path, default_type: DocType) -> Result<Vec<NewDocument>> {
    if !root.is_dir() {
        bail!("Document directory does not exist: {}", root.display());
    }

    let mut docs = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_text_extension(entry.path()) {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let doc = file_to_document(path, relative, default_type)?;
        docs.push(doc);
    }

    tracing::debug!(root = %root.display(), documents = docs.len(), "loaded documents");
    Ok(docs)
}

/// Load every text file under `root` and ingest it, in path order.
///
/// Per-chunk embedding failures are logged by the index and reported; only
/// an unreadable directory or an invalid document stops the run.
pub async fn ingest_directory(
    index: &Index,
    root: &Path,
    default_type: DocType,
) -> Result<Vec<IngestReport>> {
    let docs = load_documents(root, default_type)?;
    let mut reports = Vec::with_capacity(docs.len());
    for doc in docs {
        let title = doc.title.clone();
        let report = index
            .ingest(doc)
            .await
            .with_context(|| format!("Failed to ingest {}", title))?;
        reports.push(report);
    }
    Ok(reports)
}

fn file_to_document(path: &Path, relative: &Path, default_type: DocType) -> Result<NewDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let date = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Utc>::from(t).date_naive())
        .unwrap_or(NaiveDate::MIN);

    let doc_type = infer_doc_type(relative).unwrap_or(default_type);
    let id = relative.to_string_lossy().replace('\\', "/");

    Ok(NewDocument::new(title, doc_type, date, content).with_id(id))
}

/// Type named by the nearest ancestor directory of `relative`, if any.
pub fn infer_doc_type(relative: &Path) -> Option<DocType> {
    relative
        .parent()?
        .components()
        .rev()
        .find_map(|c| dir_doc_type(&c.as_os_str().to_string_lossy()))
}

fn dir_doc_type(name: &str) -> Option<DocType> {
    match name.to_ascii_lowercase().as_str() {
        "case-law" | "case_law" | "caselaw" | "cases" => Some(DocType::CaseLaw),
        "statute" | "statutes" => Some(DocType::Statute),
        "contract" | "contracts" => Some(DocType::Contract),
        "memo" | "memos" => Some(DocType::Memo),
        _ => None,
    }
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_infer_doc_type() {
        assert_eq!(
            infer_doc_type(Path::new("case-law/smith-v-jones.txt")),
            Some(DocType::CaseLaw)
        );
        assert_eq!(
            infer_doc_type(Path::new("Statutes/federal/ucc.md")),
            Some(DocType::Statute)
        );
        // Nearest ancestor wins.
        assert_eq!(
            infer_doc_type(Path::new("memos/contracts/nda.txt")),
            Some(DocType::Contract)
        );
        assert_eq!(infer_doc_type(Path::new("misc/notes.txt")), None);
        assert_eq!(infer_doc_type(Path::new("memo.txt")), None);
    }

    #[test]
    fn test_load_documents_walks_text_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("contracts")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("contracts/lease.txt"), "Tenant shall pay rent.").unwrap();
        fs::write(dir.path().join("notes.md"), "General notes.").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(dir.path().join(".git/HEAD.txt"), "ref").unwrap();

        let docs = load_documents(dir.path(), DocType::Memo).unwrap();
        assert_eq!(docs.len(), 2);

        assert_eq!(docs[0].id.as_deref(), Some("contracts/lease.txt"));
        assert_eq!(docs[0].title, "lease.txt");
        assert_eq!(docs[0].doc_type, DocType::Contract);
        assert_eq!(docs[0].content, "Tenant shall pay rent.");

        assert_eq!(docs[1].id.as_deref(), Some("notes.md"));
        assert_eq!(docs[1].doc_type, DocType::Memo);
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("statutes")).unwrap();
        fs::write(dir.path().join("statutes/ucc.txt"), "x".repeat(2400)).unwrap();
        fs::write(dir.path().join("memo.txt"), "short memo").unwrap();

        let config = crate::config::parse_config(
            "[embedding]\nprovider = \"hash\"\nmin_request_interval_ms = 0\n",
        )
        .unwrap();
        let index = config.build_index().unwrap();
        let reports = ingest_directory(&index, dir.path(), DocType::Memo)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].document_id, "memo.txt");
        assert_eq!(reports[0].chunks_inserted, 1);
        assert_eq!(reports[1].document_id, "statutes/ucc.txt");
        assert_eq!(reports[1].chunks_inserted, 3);
        assert_eq!(index.document_count(), 2);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_documents(&dir.path().join("nope"), DocType::Memo).is_err());
    }
}
