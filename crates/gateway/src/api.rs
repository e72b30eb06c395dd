//! `/api/chat` and `/api/upload` handlers.
//!
//! Every failure is answered with a JSON body. Client mistakes are 4xx;
//! collaborator failures are 429 (rate limited) or 502.

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::http::header::{CONTENT_TYPE, RETRY_AFTER};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use asika_agent::{DocumentExtraction, ErrorKind, ErrorReport, ImageExtraction, StructuredFields};
use asika_core::error::{ClientInputError, Error, ExtractionError};
use asika_core::message::Message;
use asika_telemetry::UsageSummary;

use crate::SharedState;

/// Header naming a raw-body upload when no `?filename=` is given.
pub const FILE_NAME_HEADER: &str = "X-File-Name";

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    pub success: bool,
    pub extracted_data: Value,
    #[serde(default)]
    pub usage: UsageSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl OcrResponse {
    pub fn failed(error: ErrorReport) -> Self {
        Self {
            success: false,
            extracted_data: Value::Object(Map::new()),
            usage: UsageSummary::zero(),
            error: Some(error),
        }
    }

    /// Envelope for one image extraction attempt.
    pub fn from_result(result: Result<ImageExtraction, Error>) -> Self {
        match result {
            Ok(extraction) => {
                let error = unavailable_report(&extraction.fields);
                Self {
                    success: error.is_none(),
                    extracted_data: extraction.fields.to_json(),
                    usage: extraction.usage,
                    error,
                }
            }
            Err(e) => Self::failed(ErrorReport::from(&e)),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.error.as_ref().map_or(StatusCode::OK, status_for)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub extracted_data: Value,
    pub document_text: String,
    #[serde(default)]
    pub usage: UsageSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl UploadResponse {
    pub fn failed(error: ErrorReport) -> Self {
        Self {
            success: false,
            extracted_data: Value::Object(Map::new()),
            document_text: String::new(),
            usage: UsageSummary::zero(),
            error: Some(error),
        }
    }

    /// Envelope for one document extraction attempt.
    ///
    /// When the model was unavailable the text preview is still returned.
    pub fn from_result(result: Result<DocumentExtraction, ExtractionError>) -> Self {
        match result {
            Ok(extraction) => {
                let error = unavailable_report(&extraction.fields);
                Self {
                    success: error.is_none(),
                    extracted_data: extraction.fields.to_json(),
                    document_text: extraction.preview,
                    usage: extraction.usage,
                    error,
                }
            }
            Err(e) => Self::failed(ErrorReport::from(&Error::Extraction(e))),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.error.as_ref().map_or(StatusCode::OK, status_for)
    }
}

fn unavailable_report(fields: &StructuredFields) -> Option<ErrorReport> {
    match fields {
        StructuredFields::Unavailable { reason } => {
            Some(ErrorReport::new(ErrorKind::Upstream, reason.clone()))
        }
        _ => None,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

/// HTTP status for an in-band error report.
pub fn status_for(report: &ErrorReport) -> StatusCode {
    match report.kind {
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::Extraction => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Authentication
        | ErrorKind::NotConfigured
        | ErrorKind::Timeout
        | ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
    }
}

/// Build a response, adding `Retry-After` when the report carries a hint.
fn respond<T: Serialize>(status: StatusCode, report: Option<&ErrorReport>, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Some(secs) = report.and_then(|r| r.retry_after_secs) {
        if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
    }
    response
}

fn client_error(err: ClientInputError) -> Response {
    let error = ErrorReport::from(&err);
    respond(StatusCode::BAD_REQUEST, None, ErrorBody { error })
}

// ── Chat ──────────────────────────────────────────────────────────────────

pub async fn chat_handler(State(state): State<SharedState>, body: Bytes) -> Response {
    let request: ChatRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ChatRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Rejecting malformed chat body");
                return client_error(ClientInputError::MalformedBody(e.to_string()));
            }
        }
    };

    match request.task.as_deref().map(str::trim) {
        None | Some("") | Some("chat") => {
            chat_turn(&state, request.messages.unwrap_or_default()).await
        }
        Some("ocr") => ocr_task(&state, request.image).await,
        Some(other) => client_error(ClientInputError::UnknownTask(other.to_string())),
    }
}

async fn chat_turn(state: &SharedState, messages: Vec<Message>) -> Response {
    info!(messages = messages.len(), "Chat request");
    let response = state.orchestrator.run_turn(&messages).await;
    let status = response.error.as_ref().map_or(StatusCode::OK, status_for);
    let error = response.error.clone();
    respond(status, error.as_ref(), response)
}

async fn ocr_task(state: &SharedState, image: Option<String>) -> Response {
    let Some(image) = image.filter(|i| !i.trim().is_empty()) else {
        let error = ErrorReport::from(&ClientInputError::MissingField("image".into()));
        return respond(StatusCode::BAD_REQUEST, None, OcrResponse::failed(error));
    };

    info!(image_len = image.len(), "OCR request");
    let response = OcrResponse::from_result(state.images.extract(&image).await);
    let error = response.error.clone();
    respond(response.status(), error.as_ref(), response)
}

// ── Upload ────────────────────────────────────────────────────────────────

pub async fn upload_handler(
    State(state): State<SharedState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let is_multipart = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let fallback_name = query.filename.or_else(|| {
        headers
            .get(FILE_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let upload = if is_multipart {
        read_multipart(request, fallback_name).await
    } else {
        read_raw(request, fallback_name).await
    };
    let (file_name, bytes) = match upload {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    info!(file = %file_name, bytes = bytes.len(), "Upload received");

    let result = state.documents.extract(&file_name, bytes).await;
    if let Err(e) = &result {
        warn!(file = %file_name, error = %e, "Upload rejected");
    }
    let response = UploadResponse::from_result(result);
    let error = response.error.clone();
    respond(response.status(), error.as_ref(), response)
}

fn upload_input_error(status: StatusCode, message: String) -> Response {
    let error = ErrorReport::new(ErrorKind::InvalidRequest, message);
    respond(status, None, UploadResponse::failed(error))
}

fn missing(field: &str) -> Response {
    let error = ErrorReport::from(&ClientInputError::MissingField(field.into()));
    respond(StatusCode::BAD_REQUEST, None, UploadResponse::failed(error))
}

async fn read_multipart(
    request: Request,
    fallback_name: Option<String>,
) -> Result<(String, Vec<u8>), Response> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| upload_input_error(e.status(), e.body_text()))?;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| upload_input_error(e.status(), e.body_text()))?;
        let Some(field) = field else {
            return Err(missing("file"));
        };
        if field.name() != Some("file") {
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .or_else(|| fallback_name.clone())
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| missing("filename"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| upload_input_error(e.status(), e.body_text()))?;
        return Ok((name, bytes.to_vec()));
    }
}

async fn read_raw(
    request: Request,
    fallback_name: Option<String>,
) -> Result<(String, Vec<u8>), Response> {
    let name = fallback_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| missing("filename"))?;
    let bytes = Bytes::from_request(request, &())
        .await
        .map_err(|e| upload_input_error(e.status(), e.body_text()))?;
    if bytes.is_empty() {
        return Err(missing("file"));
    }
    Ok((name, bytes.to_vec()))
}
