//! `asika extract`: run one file through document or ID-image extraction.

use asika_agent::{ContextBlock, DispatchClient, KnowledgeBase};
use asika_config::AppConfig;
use asika_gateway::api::{OcrResponse, UploadResponse};
use asika_gateway::{AppState, pricing_from_config};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn run(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let router = asika_providers::build_from_config(&config)?;
    let provider = router
        .default()
        .ok_or_else(|| format!("provider '{}' is not available", config.default_provider))?;

    let state = AppState::new(
        &config,
        provider,
        KnowledgeBase::Static(ContextBlock::empty()),
        DispatchClient::disabled()?,
        Arc::new(pricing_from_config(&config)),
    );

    let bytes = std::fs::read(&file)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let output = match image_mime(&file) {
        Some(mime) => {
            let data_url = format!("data:{mime};base64,{}", STANDARD.encode(&bytes));
            let response = OcrResponse::from_result(state.images.extract(&data_url).await);
            serde_json::to_string_pretty(&response)?
        }
        None => {
            let response =
                UploadResponse::from_result(state.documents.extract(&file_name, bytes).await);
            serde_json::to_string_pretty(&response)?
        }
    };

    println!("{output}");
    Ok(())
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
