//! Retriever trait: ranked knowledge passages for a query.

use crate::error::RetrievalError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A passage returned by a retriever, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Human-readable source label (file name).
    pub source: String,
    /// 1-based page number when the source has pages.
    pub page: Option<u32>,
    /// Passage text.
    pub content: String,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// A knowledge retriever. Built once at startup; never mutated per request.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `top_k` passages ranked by relevance to `query`.
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, RetrievalError>;
}
