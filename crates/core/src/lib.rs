//! # Asika Core
//!
//! Domain types, collaborator traits, and error definitions for the Asika
//! clinic assistant. This crate has **no framework dependencies**: it defines
//! the model that every other crate implements against.
//!
//! ## Collaborators
//!
//! Every external service the pipeline talks to is a trait here:
//! - [`Provider`]: chat completion, vision, and embeddings
//! - [`Retriever`]: ranked knowledge passages for a query
//!
//! Implementations live in their respective crates and are injected into the
//! turn orchestrator at startup, which keeps request handling free of global
//! state and lets tests swap in scripted fakes.

pub mod error;
pub mod message;
pub mod provider;
pub mod retrieval;

// Re-export key types at crate root for ergonomics
pub use error::{
    ClientInputError, Error, ExtractionError, ProviderError, Result, RetrievalError,
};
pub use message::{Message, Role};
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
pub use retrieval::{Passage, Retriever};
