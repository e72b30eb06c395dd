//! Turn orchestration.
//!
//! One chat turn runs sequentially inside the request task:
//!
//! 1. **Query**: the most recent user message
//! 2. **Context**: the static block, or passages from the retriever
//! 3. **Transcript**: the history window over the caller's messages
//! 4. **Model call**: system instruction plus one user turn
//! 5. **Marker**: scan the reply, remap, gate on required fields, dispatch
//!
//! Collaborator failures never escape as `Err`: retrieval falls back to the
//! no-context placeholder and provider failures become an in-band
//! [`ErrorReport`] with an apology reply.

use asika_config::{AppConfig, KnowledgeConfig, KnowledgeMode};
use asika_core::message::{Message, last_user_message};
use asika_core::provider::{Provider, ProviderRequest};
use asika_core::retrieval::{Passage, Retriever};
use asika_knowledge::{CorpusDocument, VectorIndex, load_corpus};
use asika_telemetry::{PricingTable, UsageSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{ContextBlock, PromptContext};
use crate::dispatch::{DispatchClient, DispatchOutcome};
use crate::history::HistoryWindow;
use crate::marker::{MarkerCodec, MarkerScan};
use crate::prompts;
use crate::report::ErrorReport;

/// Where a turn's grounding comes from. Built once at startup.
pub enum KnowledgeBase {
    Static(ContextBlock),
    Retrieval {
        retriever: Arc<dyn Retriever>,
        top_k: usize,
    },
}

impl KnowledgeBase {
    /// Load the corpus and build the configured knowledge mode.
    ///
    /// Retrieval mode needs `embedder`. If it is missing or the index cannot
    /// be built, the corpus is served as a static block instead.
    pub async fn from_config(
        config: &KnowledgeConfig,
        embedder: Option<Arc<dyn Provider>>,
    ) -> Self {
        let documents = load_corpus(&config.corpus_dir);
        let static_block = |docs: &[CorpusDocument]| {
            let block = ContextBlock::from_documents(docs, config.max_context_chars);
            info!(sections = block.sections().len(), "Static context loaded");
            Self::Static(block)
        };

        if config.mode == KnowledgeMode::Static {
            return static_block(&documents);
        }

        let Some(embedder) = embedder else {
            warn!("Retrieval mode needs an embedding provider; using static context");
            return static_block(&documents);
        };

        match VectorIndex::build(
            &documents,
            config.chunk_chars,
            embedder,
            config.embedding_model.clone(),
        )
        .await
        {
            Ok(index) => Self::Retrieval {
                retriever: Arc::new(index),
                top_k: config.top_k,
            },
            Err(e) => {
                warn!(error = %e, "Vector index build failed; using static context");
                static_block(&documents)
            }
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::Retrieval { .. } => "retrieval",
        }
    }
}

/// A `{source, page}` citation for a retrieved passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub source: String,
    pub page: Option<u32>,
}

/// The chat response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub reply: String,
    pub usage: UsageSummary,
    pub sources: Vec<SourceCitation>,
    pub rpa: DispatchOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl TurnResponse {
    fn reply_only(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            usage: UsageSummary::zero(),
            sources: Vec::new(),
            rpa: DispatchOutcome::not_triggered(),
            error: None,
        }
    }
}

/// Sequences one chat turn over injected collaborators.
pub struct TurnOrchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_instruction: String,
    history: HistoryWindow,
    knowledge: KnowledgeBase,
    codec: MarkerCodec,
    dispatch: DispatchClient,
    pricing: Arc<PricingTable>,
}

impl TurnOrchestrator {
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        knowledge: KnowledgeBase,
        dispatch: DispatchClient,
        pricing: Arc<PricingTable>,
    ) -> Self {
        Self {
            provider,
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: config.default_max_tokens,
            system_instruction: prompts::system_instruction(&config.registration),
            history: HistoryWindow::new(config.history.max_turns),
            knowledge,
            codec: MarkerCodec::from_config(&config.registration),
            dispatch,
            pricing,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn dispatch_configured(&self) -> bool {
        self.dispatch.is_configured()
    }

    /// Run one turn over the caller's full message history.
    pub async fn run_turn(&self, messages: &[Message]) -> TurnResponse {
        if messages.is_empty() {
            return TurnResponse::reply_only(prompts::NO_MESSAGE_REPLY);
        }

        let query = last_user_message(messages)
            .map(|m| m.content.trim())
            .unwrap_or_default();
        let (context, passages) = self.gather_context(query).await;
        let transcript = self.history.render(messages);

        debug!(
            messages = messages.len(),
            context = context.is_available(),
            passages = passages.len(),
            "Assembled turn prompt"
        );

        let request = ProviderRequest::new(
            self.model.clone(),
            vec![
                Message::system(self.system_instruction.clone()),
                Message::user(prompts::user_turn(&context, &transcript)),
            ],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Chat completion failed");
                return TurnResponse {
                    error: Some(ErrorReport::from(&e)),
                    ..TurnResponse::reply_only(prompts::APOLOGY_REPLY)
                };
            }
        };

        let usage = UsageSummary::from_usage(response.usage, &self.model, &self.pricing);
        let reply = response.message.content;
        let rpa = self.resolve_marker(&reply).await;

        info!(
            tokens = usage.total_tokens,
            rpa = ?rpa.status,
            "Turn complete"
        );

        TurnResponse {
            reply,
            usage,
            sources: citations(&passages),
            rpa,
            error: None,
        }
    }

    async fn gather_context(&self, query: &str) -> (PromptContext, Vec<Passage>) {
        match &self.knowledge {
            KnowledgeBase::Static(block) => (PromptContext::from_block(block), Vec::new()),
            KnowledgeBase::Retrieval { .. } if query.is_empty() => {
                (PromptContext::Unavailable, Vec::new())
            }
            KnowledgeBase::Retrieval { retriever, top_k } => {
                match retriever.retrieve(query, *top_k).await {
                    Ok(passages) => {
                        let block = ContextBlock::from_passages(&passages);
                        (PromptContext::from_block(&block), passages)
                    }
                    Err(e) => {
                        warn!(error = %e, "Retrieval failed; continuing without context");
                        (PromptContext::Unavailable, Vec::new())
                    }
                }
            }
        }
    }

    async fn resolve_marker(&self, reply: &str) -> DispatchOutcome {
        match self.codec.scan(reply) {
            MarkerScan::NotFound => DispatchOutcome::not_triggered(),
            MarkerScan::Invalid { payload, error } => {
                warn!(line = payload.line, error = %error, "Registration marker could not be parsed");
                DispatchOutcome::parse_failed(payload.raw, error.to_string())
            }
            MarkerScan::Parsed { record, .. } => {
                let missing = self.codec.missing_required(&record);
                if missing.is_empty() {
                    self.dispatch.dispatch(record).await
                } else {
                    info!(missing = ?missing, "Registration marker is missing required fields");
                    DispatchOutcome::missing_fields(record, missing)
                }
            }
        }
    }
}

/// One citation per distinct `(source, page)`, in rank order.
fn citations(passages: &[Passage]) -> Vec<SourceCitation> {
    let mut out: Vec<SourceCitation> = Vec::new();
    for passage in passages {
        let citation = SourceCitation {
            source: passage.source.clone(),
            page: passage.page,
        };
        if !out.contains(&citation) {
            out.push(citation);
        }
    }
    out
}
