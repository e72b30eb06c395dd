//! HTTP gateway for Asika.
//!
//! Exposes the health check, the chat endpoint (which also carries the ID
//! image task), and document upload. Built on Axum.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use asika_agent::{
    DispatchClient, DocumentExtractor, ImageFieldExtractor, KnowledgeBase, TurnOrchestrator,
};
use asika_config::{AppConfig, GatewayConfig, KnowledgeMode};
use asika_core::provider::Provider;
use asika_telemetry::{ModelPricing, PricingTable};

/// Everything a request handler needs. Built once at startup; read-only.
pub struct AppState {
    pub orchestrator: TurnOrchestrator,
    pub documents: DocumentExtractor,
    pub images: ImageFieldExtractor,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the handlers' collaborators around one provider.
    pub fn new(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        knowledge: KnowledgeBase,
        dispatch: DispatchClient,
        pricing: Arc<PricingTable>,
    ) -> Self {
        let fields = config.registration.fields.clone();
        Self {
            documents: DocumentExtractor::new(
                provider.clone(),
                config.extraction_model(),
                fields.clone(),
                config.extraction.preview_chars,
                pricing.clone(),
            ),
            images: ImageFieldExtractor::new(
                provider.clone(),
                config.extraction.vision_model.clone(),
                fields,
                pricing.clone(),
            ),
            orchestrator: TurnOrchestrator::from_config(
                config, provider, knowledge, dispatch, pricing,
            ),
        }
    }

    /// Build providers, pricing, knowledge and dispatch from configuration.
    pub async fn from_config(config: &AppConfig) -> Result<Self, asika_core::Error> {
        let router = asika_providers::build_from_config(config)?;
        let provider = router.default().ok_or_else(|| asika_core::Error::Config {
            message: format!("provider '{}' is not available", config.default_provider),
        })?;

        let embedder = match config.knowledge.mode {
            KnowledgeMode::Static => None,
            KnowledgeMode::Retrieval => {
                router.get_or_default(config.knowledge.embedding_provider.as_deref())
            }
        };
        let knowledge = KnowledgeBase::from_config(&config.knowledge, embedder).await;
        let dispatch = DispatchClient::from_config(&config.dispatch)?;
        let pricing = Arc::new(pricing_from_config(config));

        if !config.has_api_key() {
            warn!("No API key configured; chat and extraction calls will fail until one is set");
        }
        if !dispatch.is_configured() {
            warn!("No dispatch URL configured; confirmed registrations will not be sent");
        }

        Ok(Self::new(config, provider, knowledge, dispatch, pricing))
    }
}

/// Built-in pricing plus `telemetry.custom_pricing` overrides.
pub fn pricing_from_config(config: &AppConfig) -> PricingTable {
    let pricing = PricingTable::with_defaults();
    for (model, cfg) in &config.telemetry.custom_pricing {
        pricing.set(model.clone(), ModelPricing::new(cfg.input_per_m, cfg.output_per_m));
    }
    pricing
}

/// Build the router with every route and layer.
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/chat", post(api::chat_handler))
        .route("/api/upload", post(api::upload_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(gateway.max_upload_bytes))
        .layer(cors_layer(&gateway.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS for the configured origins. `"*"` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(AppState::from_config(&config).await?);

    info!(
        model = %state.orchestrator.model(),
        knowledge = state.orchestrator.knowledge().mode_name(),
        dispatch = state.orchestrator.dispatch_configured(),
        "Gateway state ready"
    );

    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
