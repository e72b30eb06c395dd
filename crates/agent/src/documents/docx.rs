//! DOCX text extraction.
//!
//! A `.docx` file is a zip archive; the body lives in `word/document.xml`.
//! Text runs (`<w:t>`) are concatenated, with a newline at each paragraph end.

use asika_core::error::ExtractionError;
use regex::{Captures, Regex};
use std::io::{Cursor, Read};
use std::sync::LazyLock;

use super::TextExtractor;

const DOCUMENT_PART: &str = "word/document.xml";

static TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab\s*/>|<w:br\s*/>|</w:p>")
        .expect("DOCX token pattern is valid")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9A-Fa-f]+)|(lt|gt|quot|apos|amp));")
        .expect("XML entity pattern is valid")
});

pub struct DocxTextExtractor;

impl TextExtractor for DocxTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(failure)?;
        let mut part = archive.by_name(DOCUMENT_PART).map_err(failure)?;

        let mut xml = String::new();
        part.read_to_string(&mut xml).map_err(failure)?;

        Ok(document_text(&xml))
    }
}

fn failure(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::ExtractionFailure {
        family: "docx".into(),
        reason: e.to_string(),
    }
}

/// Plain text of a WordprocessingML body.
fn document_text(xml: &str) -> String {
    let mut text = String::new();
    for token in TOKENS.captures_iter(xml) {
        match token.get(1) {
            Some(run) => text.push_str(&unescape(run.as_str())),
            None => match token.get(0).map(|m| m.as_str()) {
                Some(t) if t.starts_with("<w:tab") => text.push('\t'),
                _ => text.push('\n'),
            },
        }
    }
    text.trim().to_string()
}

/// Decode the predefined XML entities and numeric character references.
/// References that do not name a valid character are kept as written.
fn unescape(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &Captures| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else {
                match caps.get(3).map(|m| m.as_str()) {
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("amp") => Some('&'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
