//! End-to-end tests for the Asika pipeline.
//!
//! These drive the HTTP router with a scripted model, a real corpus on disk,
//! and an in-process registration receiver.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use asika_agent::{DispatchClient, KnowledgeBase};
use asika_config::{AppConfig, KnowledgeMode};
use asika_core::error::ProviderError;
use asika_core::message::Message;
use asika_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use asika_gateway::{AppState, build_router, pricing_from_config};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

// ── Scripted provider ────────────────────────────────────────────────────

/// Answers chat calls from a script and embeds text as keyword counts.
struct ScriptedProvider {
    replies: Mutex<Vec<String>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

const VOCAB: &[&str] = &["ivf", "fee", "freezing", "hours"];

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider exhausted");
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 1_000,
                completion_tokens: 200,
                total_tokens: 1_200,
            }),
            model: "openai/gpt-oss-20b".into(),
        })
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

// ── Helpers ──────────────────────────────────────────────────────────────

async fn spawn_receiver() -> (String, Arc<Mutex<Vec<Value>>>) {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let sink = seen.clone();
    let router = Router::new().route(
        "/webhook/register",
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(body);
                Json(json!({"queued": true}))
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}/webhook/register"), seen)
}

async fn app(config: &AppConfig, provider: Arc<ScriptedProvider>) -> Router {
    let embedder: Option<Arc<dyn Provider>> = match config.knowledge.mode {
        KnowledgeMode::Static => None,
        KnowledgeMode::Retrieval => Some(provider.clone() as Arc<dyn Provider>),
    };
    let knowledge = KnowledgeBase::from_config(&config.knowledge, embedder).await;
    let dispatch = DispatchClient::from_config(&config.dispatch).unwrap();
    let state = AppState::new(
        config,
        provider,
        knowledge,
        dispatch,
        Arc::new(pricing_from_config(config)),
    );
    build_router(Arc::new(state), &config.gateway)
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn corpus_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("fees.txt"),
        "IVF fee: one cycle costs 1,500,000 NGN.\u{000C}Opening hours: 8am to 5pm.",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("freezing.md"),
        "Egg freezing is available for patients under 40.",
    )
    .unwrap();
    std::fs::write(dir.path().join("empty.txt"), "   ").unwrap();
    dir
}

fn make_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn registration_conversation_is_delivered() {
    let corpus = corpus_dir();
    let (url, seen) = spawn_receiver().await;

    let mut config = AppConfig::default();
    config.knowledge.corpus_dir = corpus.path().to_path_buf();
    config.dispatch.url = Some(url);

    let provider = Arc::new(ScriptedProvider::new(&[
        "Thank you, Ana. I've registered you now.\n\
         ~~~REGISTER_PATIENT_JSON: {\"first_name\":\"Ana\",\"lastName\":\"Lee\",\"date_of_birth\":\"1990-04-12\",\"gender\":\"female\",\"phoneNumber\":\"+2348000000\",\"reason\":\"IVF consultation\"}~~~",
    ]));
    let app = app(&config, provider.clone()).await;

    let body = json!({"messages": [
        {"role": "user", "content": "I'd like to book an IVF consultation"},
        {"role": "assistant", "content": "Sure. Could you share your details?"},
        {"role": "user", "content": "Ana Lee, born 1990-04-12, female, +2348000000"},
        {"role": "assistant", "content": "Please confirm: Ana Lee, 1990-04-12, female, +2348000000."},
        {"role": "user", "content": "Yes, that's correct"}
    ]});
    let (status, json) = post_json(app, "/api/chat", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rpa"]["status"], "delivered");
    assert_eq!(json["rpa"]["succeeded"], true);
    assert_eq!(json["rpa"]["httpStatus"], 200);
    assert_eq!(json["usage"]["total_tokens"], 1_200);
    assert!(json["usage"]["estimated_cost_usd"].as_f64().unwrap() > 0.0);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let patient = &seen[0]["patientData"];
    assert_eq!(patient["firstName"], "Ana");
    assert_eq!(patient["dateOfBirth"], "1990-04-12");
    assert_eq!(patient["phone"], "+2348000000");
    assert_eq!(patient["cause"], "IVF consultation");
    assert_eq!(patient["hospitalId"], Value::Null);

    // Static context: both non-empty corpus files, sorted by name.
    let user_turn = provider.last_request().messages[1].content.clone();
    let fees = user_turn.find("Source: fees.txt").unwrap();
    let freezing = user_turn.find("Source: freezing.md").unwrap();
    assert!(fees < freezing);
    assert!(!user_turn.contains("empty.txt"));
}

#[tokio::test]
async fn retrieval_mode_cites_pages() {
    let corpus = corpus_dir();
    let mut config = AppConfig::default();
    config.knowledge.corpus_dir = corpus.path().to_path_buf();
    config.knowledge.mode = KnowledgeMode::Retrieval;
    config.knowledge.top_k = 1;

    let provider = Arc::new(ScriptedProvider::new(&["We are open 8am to 5pm."]));
    let app = app(&config, provider.clone()).await;

    let body = json!({"messages": [{"role": "user", "content": "What are your opening hours?"}]});
    let (status, json) = post_json(app, "/api/chat", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sources"], json!([{"source": "fees.txt", "page": 2}]));
    let user_turn = provider.last_request().messages[1].content.clone();
    assert!(user_turn.contains("Opening hours: 8am to 5pm."));
    assert!(!user_turn.contains("Egg freezing"));
}

#[tokio::test]
async fn empty_corpus_uses_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.knowledge.corpus_dir = dir.path().join("missing");

    let provider = Arc::new(ScriptedProvider::new(&["I do not have that information."]));
    let app = app(&config, provider.clone()).await;

    let body = json!({"messages": [{"role": "user", "content": "Do you do surrogacy?"}]});
    let (status, json) = post_json(app, "/api/chat", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rpa"]["status"], "not_triggered");
    let user_turn = provider.last_request().messages[1].content.clone();
    assert!(user_turn.contains("No context available."));
}

#[tokio::test]
async fn unparseable_marker_is_reported_not_sent() {
    let (url, seen) = spawn_receiver().await;
    let mut config = AppConfig::default();
    config.dispatch.url = Some(url);
    config.dispatch.timeout_secs = 5;

    let provider = Arc::new(ScriptedProvider::new(&[
        "Registered!\n~~~REGISTER_PATIENT_JSON: {firstName: Ana}~~~",
    ]));
    let app = app(&config, provider).await;

    let body = json!({"messages": [{"role": "user", "content": "Yes"}]});
    let (status, json) = post_json(app, "/api/chat", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rpa"]["status"], "parse_failed");
    assert_eq!(json["rpa"]["attempted"], true);
    assert_eq!(json["rpa"]["succeeded"], false);
    assert_eq!(json["rpa"]["rawPayload"], "{firstName: Ana}");
    assert!(json["rpa"]["errorDetail"].is_string());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn docx_upload_is_structured() {
    let config = AppConfig::default();
    let provider = Arc::new(ScriptedProvider::new(&[
        "{\"firstName\":\"Ana\",\"lastName\":\"Lee\",\"referringPhysician\":\"Dr. Okafor\"}",
    ]));
    let app = app(&config, provider.clone()).await;

    let docx = make_docx(&[
        "Referral letter",
        "Patient: Ana Lee",
        "Referring physician: Dr. Okafor",
    ]);
    let req = Request::builder()
        .method("POST")
        .uri("/api/upload?filename=referral.docx")
        .header("content-type", "application/octet-stream")
        .body(Body::from(docx))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["extracted_data"]["referringPhysician"], "Dr. Okafor");
    assert_eq!(json["extracted_data"]["dateOfBirth"], Value::Null);
    assert_eq!(json["usage"]["total_tokens"], 1_200);
    assert!(json["document_text"].as_str().unwrap().contains("Patient: Ana Lee"));

    let request = provider.last_request();
    assert!(request.json_mode);
    assert!(request.messages[1].content.contains("Dr. Okafor"));
}

#[tokio::test]
async fn txt_upload_is_rejected_without_model_call() {
    let config = AppConfig::default();
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let app = app(&config, provider.clone()).await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("X-File-Name", "notes.txt")
        .body(Body::from("plain notes"))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(provider.calls(), 0);
}
