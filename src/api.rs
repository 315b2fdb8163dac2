use std::any::Any;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::client::{ScrapeError, TikTokioClient};
use crate::models::{ApiResponse, DownloadRequest, ExtractionResult};
use crate::validate::{validate_reference, ValidationError, EXAMPLE_REFERENCE};

const SUCCESS_MESSAGE: &str = "Successfully retrieved content";

#[derive(Clone)]
pub struct AppState {
    client: TikTokioClient,
    environment: String,
}

impl AppState {
    pub fn new(client: TikTokioClient, environment: impl Into<String>) -> Self {
        Self {
            client,
            environment: environment.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/api", get(info))
        .route("/api/status", get(status))
        .route(
            "/api/download",
            post(download).fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ── Core operation ───────────────────────────────────────────────────────────

/// Validate a reference and extract its media; an extraction without any
/// media is reported as not found.
pub async fn handle(
    client: &TikTokioClient,
    reference: Option<&str>,
) -> Result<ExtractionResult, ApiError> {
    let reference = validate_reference(reference)?;

    tracing::info!(reference, "processing TikTok reference");
    let result = client.extract(reference).await?;

    if result.is_empty() {
        return Err(ApiError::NotFound);
    }
    tracing::info!(
        images = result.images.len(),
        "extracted content for {}",
        reference
    );
    Ok(result)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        // A body without a JSON content type carries no url.
        Err(JsonRejection::MissingJsonContentType(_)) => DownloadRequest::default(),
        Err(e) => return Err(ApiError::BadRequestBody(e.body_text())),
    };
    let reference = reference_text(request.url.as_ref())?;
    let result = handle(&state.client, reference).await?;
    Ok(Json(ApiResponse::ok(SUCCESS_MESSAGE, result)))
}

/// Falsy JSON values count as a missing reference; any other non-string
/// value can never be a TikTok URL.
fn reference_text(url: Option<&Value>) -> Result<Option<&str>, ValidationError> {
    match url {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ValidationError::InvalidFormat),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "status": "online",
        "message": "TikTok Downloader API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment,
        "timestamp": Utc::now().to_rfc3339(),
        "endpoints": {
            "download": "POST /api/download",
            "status": "GET /api/status"
        }
    }))
}

async fn info() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "name": "TikTok Downloader API",
        "description": "Fetch TikTok videos without watermark, audio tracks and image galleries",
        "endpoints": {
            "download": {
                "method": "POST",
                "url": "/api/download",
                "body": { "url": "TikTok URL to download" },
                "example": { "url": EXAMPLE_REFERENCE }
            },
            "status": {
                "method": "GET",
                "url": "/api/status",
                "description": "Server status"
            }
        }
    }))
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiResponse::failure("Method not allowed. Use POST.")),
    )
        .into_response()
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure("API endpoint not found")),
    )
        .into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(%detail, "request handler panicked");
    ApiError::Internal(detail).into_response()
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    BadRequestBody(String),
    #[error("no downloadable content found")]
    NotFound,
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, ApiResponse) {
        match self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, ApiResponse::failure(e.to_string())),
            ApiError::BadRequestBody(msg) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::failure(format!("Invalid request body: {msg}")),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                ApiResponse::failure(
                    "Could not find any content. The URL may be wrong or the video private.",
                ),
            ),
            ApiError::Scrape(ScrapeError::Connection(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::failure("Could not connect to the TikTok service. Try again later."),
            ),
            ApiError::Scrape(ScrapeError::UpstreamHttp { status, .. })
                if *status == StatusCode::NOT_FOUND =>
            {
                (
                    StatusCode::NOT_FOUND,
                    ApiResponse::failure("Video not found on TikTok"),
                )
            }
            ApiError::Scrape(e @ ScrapeError::UpstreamHttp { status, .. }) => (
                *status,
                ApiResponse::failure(format!(
                    "TikTok service returned an error: {}",
                    status.as_u16()
                ))
                .with_error(e.to_string()),
            ),
            ApiError::Scrape(ScrapeError::Timeout(_) | ScrapeError::NoResponse(_)) => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiResponse::failure("No response from the TikTok service. It may have timed out."),
            ),
            ApiError::Scrape(ScrapeError::Other(detail)) | ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::failure("Internal server error").with_error(detail.clone()),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation(_) | ApiError::BadRequestBody(_) | ApiError::NotFound => {
                tracing::info!("download rejected: {}", self)
            }
            ApiError::Scrape(ScrapeError::UpstreamHttp { status, body }) => {
                tracing::warn!(%status, body = %body, "upstream returned an error")
            }
            _ => tracing::error!("download failed: {}", self),
        }
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
