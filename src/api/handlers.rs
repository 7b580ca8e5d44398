//! HTTP request handlers

use super::auth::require_token;
use super::types::{ErrorResponse, HelloResponse, ServiceSummary, ServicesResponse};
use super::AppState;
use crate::error::{GatewayError, Operation, OperationError};
use crate::ops;
use crate::providers::VisionAnalysis;
use crate::validate::{FormData, Upload, ValidationError};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

/// Largest upload (25 MiB audio) plus room for the rest of the form
const BODY_LIMIT: usize = 26 * 1024 * 1024;

type JsonPayload = Result<Json<Value>, JsonRejection>;
type FormPayload = Result<Multipart, MultipartRejection>;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/hello", get(hello))
        .route("/api/services", get(list_services))
        .route("/api/services/:name", get(get_service))
        // Text generation
        .route("/api/summarize", post(summarize))
        .route("/api/keywords", post(keywords))
        .route("/api/sentiment", post(sentiment))
        .route("/api/generate-code", post(generate_code))
        .route("/api/tweet", post(tweet))
        // Vision
        .route("/api/caption-image", post(caption_image))
        .route("/api/analyze-image", post(analyze_image))
        // Moderation, translation, transcription
        .route("/api/moderate", post(moderate))
        .route("/api/translate", post(translate))
        .route("/api/transcribe", post(transcribe))
        // Documents
        .route("/api/ask-pdf", post(ask_pdf))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

// ============================================================
// Request plumbing
// ============================================================

fn parse_json<T>(
    operation: Operation,
    payload: JsonPayload,
    parse: fn(Value) -> Result<T, ValidationError>,
) -> Result<T, OperationError> {
    payload
        .map_err(|e| ValidationError::shape("body", "Invalid JSON body").with_details(e.body_text()))
        .and_then(|Json(body)| parse(body))
        .map_err(|e| GatewayError::from(e).during(operation))
}

async fn parse_form<T>(
    operation: Operation,
    payload: FormPayload,
    parse: fn(FormData) -> Result<T, ValidationError>,
) -> Result<T, OperationError> {
    let form = match payload {
        Ok(multipart) => read_form(multipart).await,
        Err(e) => Err(ValidationError::shape("body", "Invalid multipart form").with_details(e.body_text())),
    };
    form.and_then(parse)
        .map_err(|e| GatewayError::from(e).during(operation))
}

/// Buffer every field. Uploads stay owned by the request.
async fn read_form(mut multipart: Multipart) -> Result<FormData, ValidationError> {
    let mut form = FormData::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if field.file_name().is_some() {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            form.files.insert(
                name,
                Upload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                },
            );
        } else {
            let text = field.text().await.map_err(multipart_error)?;
            form.texts.insert(name, text);
        }
    }
    Ok(form)
}

fn multipart_error(e: MultipartError) -> ValidationError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::range("body", "File too large").with_details("Request body exceeds the upload limit")
    } else {
        ValidationError::shape("body", "Invalid multipart form").with_details(e.body_text())
    }
}

fn respond<T>(operation: Operation, result: Result<T, GatewayError>) -> Result<Json<T>, OperationError> {
    result.map(Json).map_err(|e| e.during(operation))
}

// ============================================================
// Service info
// ============================================================

async fn root() -> &'static str {
    concat!("ai-api-gateway ", env!("CARGO_PKG_VERSION"))
}

async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from the AI API gateway",
    })
}

async fn list_services(State(state): State<AppState>) -> Json<ServicesResponse> {
    Json(ServicesResponse {
        services: state
            .registry
            .list_services()
            .iter()
            .map(ServiceSummary::from)
            .collect(),
    })
}

async fn get_service(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.registry.service_by_name(&name) {
        Some(service) => Json(ServiceSummary::from(service)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Unknown service: {name}"))),
        )
            .into_response(),
    }
}

// ============================================================
// Text generation
// ============================================================

async fn summarize(
    State(state): State<AppState>,
    payload: JsonPayload,
) -> Result<Json<ops::SummarizeResponse>, OperationError> {
    let op = Operation::Summarize;
    let request = parse_json(op, payload, ops::SummarizeRequest::from_json)?;
    respond(op, ops::summarize(&state.registry, request).await)
}

async fn keywords(
    State(state): State<AppState>,
    payload: JsonPayload,
) -> Result<Json<ops::KeywordsResponse>, OperationError> {
    let op = Operation::Keywords;
    let request = parse_json(op, payload, ops::KeywordsRequest::from_json)?;
    respond(op, ops::keywords(&state.registry, request).await)
}

async fn sentiment(
    State(state): State<AppState>,
    payload: JsonPayload,
) -> Result<Json<ops::SentimentResponse>, OperationError> {
    let op = Operation::Sentiment;
    let request = parse_json(op, payload, ops::SentimentRequest::from_json)?;
    respond(op, ops::sentiment(&state.registry, request).await)
}

async fn generate_code(
    State(state): State<AppState>,
    payload: JsonPayload,
) -> Result<Json<ops::GenerateCodeResponse>, OperationError> {
    let op = Operation::GenerateCode;
    let request = parse_json(op, payload, ops::GenerateCodeRequest::from_json)?;
    respond(op, ops::generate_code(&state.registry, request).await)
}

async fn tweet(
    State(state): State<AppState>,
    payload: JsonPayload,
) -> Result<Json<ops::TweetResponse>, OperationError> {
    let op = Operation::Tweet;
    let request = parse_json(op, payload, ops::TweetRequest::from_json)?;
    respond(op, ops::tweet(&state.registry, request).await)
}

// ============================================================
// Vision
// ============================================================

async fn caption_image(
    State(state): State<AppState>,
    payload: JsonPayload,
) -> Result<Json<ops::CaptionResponse>, OperationError> {
    let op = Operation::CaptionImage;
    let request = parse_json(op, payload, ops::CaptionRequest::from_json)?;
    respond(op, ops::caption(&state.registry, request).await)
}

async fn analyze_image(
    State(state): State<AppState>,
    payload: FormPayload,
) -> Result<Json<VisionAnalysis>, OperationError> {
    let op = Operation::AnalyzeImage;
    let request = parse_form(op, payload, ops::AnalyzeImageRequest::from_form).await?;
    respond(op, ops::analyze(&state.registry, request).await)
}

// ============================================================
// Moderation, translation, transcription
// ============================================================

async fn moderate(
    State(state): State<AppState>,
    payload: JsonPayload,
) -> Result<Json<ops::ModerateResponse>, OperationError> {
    let op = Operation::Moderate;
    let request = parse_json(op, payload, ops::ModerateRequest::from_json)?;
    respond(op, ops::moderate(&state.registry, request).await)
}

async fn translate(
    State(state): State<AppState>,
    payload: JsonPayload,
) -> Result<Json<ops::TranslateResponse>, OperationError> {
    let op = Operation::Translate;
    let request = parse_json(op, payload, ops::TranslateRequest::from_json)?;
    respond(op, ops::translate(&state.registry, request).await)
}

async fn transcribe(
    State(state): State<AppState>,
    payload: FormPayload,
) -> Result<Json<ops::TranscribeResponse>, OperationError> {
    let op = Operation::Transcribe;
    let request = parse_form(op, payload, ops::TranscribeRequest::from_form).await?;
    respond(op, ops::transcribe(&state.registry, request).await)
}

// ============================================================
// Documents
// ============================================================

async fn ask_pdf(
    State(state): State<AppState>,
    payload: FormPayload,
) -> Result<Json<ops::AskPdfResponse>, OperationError> {
    let op = Operation::AskPdf;
    let request = parse_form(op, payload, ops::AskPdfRequest::from_form).await?;
    respond(op, ops::ask_pdf(&state.registry, request).await)
}
