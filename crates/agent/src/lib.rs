//! The Asika turn pipeline.
//!
//! A chat turn follows a fixed sequence:
//!
//! 1. **Window** the caller's message history into a transcript
//! 2. **Ground** the turn in the static corpus or retrieved passages
//! 3. **Ask** the model, with the registration marker protocol in the
//!    system instruction
//! 4. **Scan** the reply for a registration marker and remap its payload
//! 5. **Dispatch** a complete record to the external workflow
//!
//! Uploads and ID images take a shorter path through the document and image
//! extractors and never reach dispatch.

pub mod context;
pub mod dispatch;
pub mod documents;
pub mod history;
pub mod marker;
pub mod ocr;
pub mod orchestrator;
pub mod prompts;
pub mod report;

#[cfg(test)]
mod test_helpers;

pub use context::{ContextBlock, ContextSection, PromptContext};
pub use dispatch::{DispatchClient, DispatchOutcome, DispatchStatus};
pub use documents::{DocumentExtraction, DocumentExtractor, DocumentKind, StructuredFields};
pub use history::HistoryWindow;
pub use marker::{MarkerCodec, MarkerScan, PatientRecord};
pub use ocr::{ImageExtraction, ImageFieldExtractor};
pub use orchestrator::{KnowledgeBase, SourceCitation, TurnOrchestrator, TurnResponse};
pub use report::{ErrorKind, ErrorReport};
