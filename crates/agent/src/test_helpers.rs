//! Shared test helpers.

use asika_core::error::{ProviderError, RetrievalError};
use asika_core::message::Message;
use asika_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use asika_core::retrieval::{Passage, Retriever};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` pops the next result and records the request.
/// Panics if more calls are made than results provided.
pub struct ScriptedProvider {
    results: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(results: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers each call with the next text.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no more results (call #{call})"))
    }
}

/// A simple text response with fixed usage.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 100,
            completion_tokens: 20,
            total_tokens: 120,
        }),
        model: "mock-model".into(),
    }
}

/// A retriever returning fixed passages, or failing.
pub struct FixedRetriever {
    pub passages: Vec<Passage>,
    pub fail: bool,
    pub queries: Mutex<Vec<String>>,
}

impl FixedRetriever {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }
}

#[async_trait::async_trait]
impl Retriever for FixedRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, RetrievalError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(RetrievalError::IndexUnavailable("scripted failure".into()));
        }
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}
