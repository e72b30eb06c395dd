//! In-memory vector index over the corpus.
//!
//! Built once at startup by embedding every passage through the provider's
//! embedding endpoint. Read-only afterwards and shared via `Arc`.

use async_trait::async_trait;
use asika_core::error::RetrievalError;
use asika_core::provider::{EmbeddingRequest, Provider};
use asika_core::retrieval::{Passage, Retriever};
use std::sync::Arc;
use tracing::{debug, info};

use crate::chunk::{Chunk, chunk_document};
use crate::corpus::CorpusDocument;
use crate::vector::top_k_by_similarity;

/// Passages embedded per request while building the index.
const EMBED_BATCH: usize = 64;

/// A cosine-similarity retriever over embedded corpus passages.
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    provider: Arc<dyn Provider>,
    model: String,
}

impl VectorIndex {
    /// Chunk and embed `documents`.
    pub async fn build(
        documents: &[CorpusDocument],
        chunk_chars: usize,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Result<Self, RetrievalError> {
        let model = model.into();
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| chunk_document(doc, chunk_chars))
            .collect();

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            let inputs = batch.iter().map(|c| c.content.clone()).collect();
            let mut vectors = embed(provider.as_ref(), &model, inputs).await?;
            if vectors.len() != batch.len() {
                return Err(RetrievalError::IndexUnavailable(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embeddings.append(&mut vectors);
        }

        info!(
            documents = documents.len(),
            passages = chunks.len(),
            model = %model,
            "Vector index built"
        );

        Ok(Self {
            chunks,
            embeddings,
            provider,
            model,
        })
    }

    /// Number of indexed passages.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

async fn embed(
    provider: &dyn Provider,
    model: &str,
    inputs: Vec<String>,
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    let response = provider
        .embed(EmbeddingRequest {
            model: model.to_string(),
            inputs,
        })
        .await
        .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;
    Ok(response.embeddings)
}

#[async_trait]
impl Retriever for VectorIndex {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, RetrievalError> {
        if self.is_empty() || query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = embed(self.provider.as_ref(), &self.model, vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("empty embedding response".into()))?;

        let ranked = top_k_by_similarity(&self.embeddings, &query_embedding, top_k);
        debug!(query_len = query.len(), hits = ranked.len(), "Retrieved passages");

        Ok(ranked
            .into_iter()
            .map(|(i, score)| {
                let chunk = &self.chunks[i];
                Passage {
                    source: chunk.source.clone(),
                    page: chunk.page,
                    content: chunk.content.clone(),
                    score,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asika_core::error::ProviderError;
    use asika_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    /// Embeds text as keyword counts over a tiny fixed vocabulary.
    struct KeywordEmbedder;

    const VOCAB: &[&str] = &["ivf", "fee", "freezing", "hours"];

    #[async_trait]
    impl Provider for KeywordEmbedder {
        fn name(&self) -> &str {
            "keyword"
        }

        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("embeddings only".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            let embeddings = request
                .inputs
                .iter()
                .map(|text| {
                    let lower = text.to_lowercase();
                    VOCAB
                        .iter()
                        .map(|w| lower.matches(w).count() as f32)
                        .collect()
                })
                .collect();
            Ok(EmbeddingResponse {
                embeddings,
                model: request.model,
            })
        }
    }

    fn corpus() -> Vec<CorpusDocument> {
        vec![
            CorpusDocument {
                name: "fees.txt".into(),
                content: "Our IVF fee schedule.\u{000C}Opening hours are 9 to 5.".into(),
            },
            CorpusDocument {
                name: "freezing.txt".into(),
                content: "Egg freezing preserves fertility.".into(),
            },
        ]
    }

    #[tokio::test]
    async fn retrieves_best_passage_with_page() {
        let index = VectorIndex::build(&corpus(), 1200, Arc::new(KeywordEmbedder), "kw")
            .await
            .unwrap();
        assert_eq!(index.len(), 3);

        let hits = index.retrieve("what are your hours?", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "fees.txt");
        assert_eq!(hits[0].page, Some(2));
        assert!(hits[0].content.contains("Opening hours"));
    }

    #[tokio::test]
    async fn top_k_bounds_results() {
        let index = VectorIndex::build(&corpus(), 1200, Arc::new(KeywordEmbedder), "kw")
            .await
            .unwrap();
        let hits = index.retrieve("ivf freezing", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn empty_corpus_retrieves_nothing() {
        let index = VectorIndex::build(&[], 1200, Arc::new(KeywordEmbedder), "kw")
            .await
            .unwrap();
        assert!(index.is_empty());
        assert!(index.retrieve("anything", 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_is_retrieval_error() {
        struct NoEmbeddings;

        #[async_trait]
        impl Provider for NoEmbeddings {
            fn name(&self) -> &str {
                "none"
            }
            async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
                Err(ProviderError::NotConfigured("none".into()))
            }
        }

        let result = VectorIndex::build(&corpus(), 1200, Arc::new(NoEmbeddings), "kw").await;
        assert!(matches!(result, Err(RetrievalError::EmbeddingFailed(_))));
    }
}
