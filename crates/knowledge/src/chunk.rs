//! Page-aware passage chunking.
//!
//! Documents converted with `pdftotext` separate pages with form-feed
//! characters. Each page is split into paragraphs, which are packed into
//! passages of at most `chunk_chars` characters.

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusDocument;

const FORM_FEED: char = '\u{000C}';

/// A retrievable passage of a corpus document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    /// 1-based page, present only when the document has page breaks.
    pub page: Option<u32>,
    pub content: String,
}

/// Split a document into passages of at most `chunk_chars` characters.
pub fn chunk_document(doc: &CorpusDocument, chunk_chars: usize) -> Vec<Chunk> {
    let chunk_chars = chunk_chars.max(1);
    let paged = doc.content.contains(FORM_FEED);
    let mut chunks = Vec::new();

    for (index, page) in doc.content.split(FORM_FEED).enumerate() {
        let page_number = paged.then_some(index as u32 + 1);
        for content in pack_paragraphs(page, chunk_chars) {
            chunks.push(Chunk {
                source: doc.name.clone(),
                page: page_number,
                content,
            });
        }
    }

    chunks
}

fn pack_paragraphs(text: &str, limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let paragraphs = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty());

    for paragraph in paragraphs {
        let len = paragraph.chars().count();

        if len > limit {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            out.extend(split_chars(paragraph, limit));
            continue;
        }

        let joined_len = if current.is_empty() { len } else { current_len + 2 + len };
        if joined_len > limit {
            out.push(std::mem::take(&mut current));
            current.push_str(paragraph);
            current_len = len;
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
            current_len = joined_len;
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn split_chars(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}
