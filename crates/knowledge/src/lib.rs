//! Knowledge corpus for Asika.
//!
//! Loads the plain-text corpus from disk, chunks it into page-aware
//! passages, and serves an in-memory cosine-similarity retriever built on
//! the provider's embedding endpoint.

pub mod chunk;
pub mod corpus;
pub mod index;
pub mod vector;

pub use chunk::{Chunk, chunk_document};
pub use corpus::{CorpusDocument, load_corpus};
pub use index::VectorIndex;
pub use vector::cosine_similarity;
