//! Document field extraction.
//!
//! An upload moves through `Received → ExtractedText → Structured`, or fails:
//!
//! 1. The file-name suffix selects a [`TextExtractor`] (PDF or DOCX).
//!    Anything else is `UnsupportedFormat`.
//! 2. The extracted text is sent to the model with a fixed field-extraction
//!    instruction in JSON mode.
//! 3. The reply is parsed into fields. A reply that is not a JSON object
//!    degrades to its raw text instead of failing the upload.

pub mod docx;
pub mod pdf;

use asika_config::FieldSpec;
use asika_core::error::ExtractionError;
use asika_core::message::Message;
use asika_core::provider::{Provider, ProviderRequest};
use asika_telemetry::{PricingTable, UsageSummary};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::prompts;

pub use docx::DocxTextExtractor;
pub use pdf::PdfTextExtractor;

/// Key under which an unparseable model reply is surfaced.
pub const RAW_RESPONSE_KEY: &str = "raw_response";

/// Supported document families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Resolve the family from a file name suffix, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Result<Self, ExtractionError> {
        let lower = file_name.trim().to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Ok(Self::Pdf)
        } else if lower.ends_with(".docx") {
            Ok(Self::Docx)
        } else {
            Err(ExtractionError::UnsupportedFormat {
                file_name: file_name.to_string(),
            })
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

/// Binary document in, plain text out.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Best-effort structured fields.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredFields {
    /// The model returned a JSON object.
    Parsed(Map<String, Value>),
    /// The model replied, but not with a JSON object.
    Degraded { raw: String },
    /// The model call itself failed.
    Unavailable { reason: String },
}

impl StructuredFields {
    /// Parse a model reply, tolerating Markdown code fences.
    ///
    /// Every field in `fields` is present in a parsed result; fields the
    /// model omitted are null.
    pub fn from_reply(reply: &str, fields: &[FieldSpec]) -> Self {
        match serde_json::from_str::<Value>(strip_code_fences(reply)) {
            Ok(Value::Object(mut map)) => {
                for field in fields {
                    map.entry(field.name.clone()).or_insert(Value::Null);
                }
                Self::Parsed(map)
            }
            _ => Self::Degraded {
                raw: reply.to_string(),
            },
        }
    }

    /// The `extracted_data` mapping returned to callers.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Parsed(map) => Value::Object(map.clone()),
            Self::Degraded { raw } => {
                let mut map = Map::new();
                map.insert(RAW_RESPONSE_KEY.into(), Value::String(raw.clone()));
                Value::Object(map)
            }
            Self::Unavailable { .. } => Value::Object(Map::new()),
        }
    }
}

/// Strip a surrounding ```` ```json ```` fence if present.
pub(crate) fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the info string ("json") on the opening fence line.
    match inner.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with('{') => rest.trim(),
        _ => inner.trim(),
    }
}

/// Outcome of a successful upload extraction.
#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    pub file_name: String,
    pub kind: DocumentKind,
    pub fields: StructuredFields,
    /// Start of the extracted text, at most `preview_chars` characters.
    pub preview: String,
    pub usage: UsageSummary,
}

/// Runs uploads through text extraction and model structuring.
pub struct DocumentExtractor {
    provider: Arc<dyn Provider>,
    model: String,
    fields: Vec<FieldSpec>,
    preview_chars: usize,
    pricing: Arc<PricingTable>,
    pdf: Arc<dyn TextExtractor>,
    docx: Arc<dyn TextExtractor>,
}

impl DocumentExtractor {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        fields: Vec<FieldSpec>,
        preview_chars: usize,
        pricing: Arc<PricingTable>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            fields,
            preview_chars,
            pricing,
            pdf: Arc::new(PdfTextExtractor),
            docx: Arc::new(DocxTextExtractor),
        }
    }

    /// Replace the extractor used for one document family.
    pub fn with_text_extractor(
        mut self,
        kind: DocumentKind,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        match kind {
            DocumentKind::Pdf => self.pdf = extractor,
            DocumentKind::Docx => self.docx = extractor,
        }
        self
    }

    /// `Received → ExtractedText`.
    ///
    /// Extraction runs on the blocking pool. Blank text is a failure.
    pub async fn extract_text(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(DocumentKind, String), ExtractionError> {
        let kind = DocumentKind::from_file_name(file_name)?;
        let extractor = match kind {
            DocumentKind::Pdf => self.pdf.clone(),
            DocumentKind::Docx => self.docx.clone(),
        };

        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| ExtractionError::ExtractionFailure {
                family: kind.family().into(),
                reason: format!("extractor crashed: {e}"),
            })??;

        if text.trim().is_empty() {
            return Err(ExtractionError::ExtractionFailure {
                family: kind.family().into(),
                reason: "no extractable text".into(),
            });
        }

        debug!(
            file = %file_name,
            family = kind.family(),
            chars = text.chars().count(),
            "Document text extracted"
        );
        Ok((kind, text))
    }

    /// `ExtractedText → Structured`.
    pub async fn structure(&self, text: &str) -> (StructuredFields, UsageSummary) {
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![
                Message::system(prompts::document_instruction(&self.fields)),
                Message::user(text),
            ],
        )
        .with_temperature(0.0)
        .json();

        match self.provider.complete(request).await {
            Ok(response) => {
                let usage =
                    UsageSummary::from_usage(response.usage, &self.model, &self.pricing);
                let fields = StructuredFields::from_reply(&response.message.content, &self.fields);
                if let StructuredFields::Degraded { .. } = fields {
                    warn!("Document field extraction returned non-JSON; degrading to raw text");
                }
                (fields, usage)
            }
            Err(e) => {
                warn!(error = %e, "Document field extraction call failed");
                (
                    StructuredFields::Unavailable {
                        reason: e.to_string(),
                    },
                    UsageSummary::zero(),
                )
            }
        }
    }

    /// Run the full pipeline for one upload.
    pub async fn extract(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentExtraction, ExtractionError> {
        let (kind, text) = self.extract_text(file_name, bytes).await?;
        let (fields, usage) = self.structure(&text).await;

        info!(
            file = %file_name,
            family = kind.family(),
            structured = matches!(fields, StructuredFields::Parsed(_)),
            "Document processed"
        );

        Ok(DocumentExtraction {
            file_name: file_name.to_string(),
            kind,
            preview: preview(&text, self.preview_chars),
            fields,
            usage,
        })
    }
}

/// First `max_chars` characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
