//! Plain-text corpus loading.
//!
//! The corpus is a flat directory of `*.txt` and `*.md` files, typically
//! produced by running `pdftotext` over the clinic's brochures. It is read
//! once at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One document of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// File name, used as the source label.
    pub name: String,
    /// Trimmed file contents. Never empty.
    pub content: String,
}

const EXTENSIONS: &[&str] = &["txt", "md"];

/// Load every corpus document in `dir`, sorted by file name.
///
/// A missing directory yields an empty corpus. Unreadable or blank files
/// are skipped.
pub fn load_corpus(dir: &Path) -> Vec<CorpusDocument> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Corpus directory unavailable");
            return Vec::new();
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %name, error = %e, "Skipping unreadable corpus file");
                continue;
            }
        };

        let content = content.trim();
        if content.is_empty() {
            debug!(file = %name, "Skipping empty corpus file");
            continue;
        }

        documents.push(CorpusDocument {
            name,
            content: content.to_string(),
        });
    }

    debug!(dir = %dir.display(), count = documents.len(), "Corpus loaded");
    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_empty() {
        assert!(load_corpus(Path::new("/nonexistent/asika/corpus")).is_empty());
    }

    #[test]
    fn loads_sorted_text_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_fees.txt"), "Consultation fees\n").unwrap();
        std::fs::write(dir.path().join("a_ivf.md"), "  IVF overview  ").unwrap();
        std::fs::write(dir.path().join("c_blank.txt"), "   \n\n").unwrap();
        std::fs::write(dir.path().join("d_scan.pdf"), "%PDF-1.4").unwrap();

        let docs = load_corpus(dir.path());
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a_ivf.md", "b_fees.txt"]);
        assert_eq!(docs[0].content, "IVF overview");
        assert_eq!(docs[1].content, "Consultation fees");
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::write(dir.path().join("b.txt"), "ok").unwrap();
        let docs = load_corpus(dir.path());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "b.txt");
    }
}
