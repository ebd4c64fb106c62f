//! HTTP surface: axum routes over a shared [`Gateway`].
//!
//! | Route | Body | Success |
//! |-------|------|---------|
//! | `POST /pdf/enterprise-scrape` | multipart `file` | `{message, markdown_content}` |
//! | `POST /pdf/opensource-scrape` | multipart `file` | `{message, markdown_content}` |
//! | `POST /web/scrape` | `{url, method, api_key?}` | `{message, markdown_content, image_urls}` |
//! | `GET /health` | | `{status: "ok"}` |
//!
//! Every failure, including extractor rejections and handler panics, leaves
//! as `{"detail": "<message>"}` with the status category from
//! [`GatewayError::status`].

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{
    Gateway, PdfScrapeResponse, PdfVariant, WebScrapeRequest, WebScrapeResponse,
};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Error envelope shared by every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the router. `max_upload_bytes` caps request bodies.
pub fn router(gateway: Arc<Gateway>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/pdf/enterprise-scrape", post(enterprise_scrape))
        .route("/pdf/opensource-scrape", post(opensource_scrape))
        .route("/web/scrape", post(web_scrape))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(gateway: Arc<Gateway>, config: &GatewayConfig) -> Result<(), GatewayError> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| GatewayError::InvalidConfig(format!("cannot bind {}: {}", config.bind_addr, e)))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, router(gateway, config.max_upload_bytes))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("server error: {}", e)))
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn enterprise_scrape(
    State(gateway): State<Arc<Gateway>>,
    upload: Result<Multipart, MultipartRejection>,
) -> Result<Json<PdfScrapeResponse>, GatewayError> {
    pdf_scrape(&gateway, PdfVariant::Enterprise, upload).await
}

async fn opensource_scrape(
    State(gateway): State<Arc<Gateway>>,
    upload: Result<Multipart, MultipartRejection>,
) -> Result<Json<PdfScrapeResponse>, GatewayError> {
    pdf_scrape(&gateway, PdfVariant::OpenSource, upload).await
}

async fn pdf_scrape(
    gateway: &Gateway,
    variant: PdfVariant,
    upload: Result<Multipart, MultipartRejection>,
) -> Result<Json<PdfScrapeResponse>, GatewayError> {
    let multipart = upload.map_err(|e| GatewayError::MalformedRequest(e.body_text()))?;
    let (filename, bytes) = read_file_field(multipart).await?;
    let response = gateway.scrape_pdf(variant, &filename, bytes).await?;
    Ok(Json(response))
}

async fn web_scrape(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<WebScrapeRequest>, JsonRejection>,
) -> Result<Json<WebScrapeResponse>, GatewayError> {
    let Json(request) = payload.map_err(|e| GatewayError::MalformedRequest(e.body_text()))?;
    let response = gateway.scrape_web(&request).await?;
    Ok(Json(response))
}

/// Pull the `file` part out of a multipart body.
async fn read_file_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), GatewayError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::MalformedRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| GatewayError::MalformedRequest(e.body_text()))?;
        return Ok((filename, bytes.to_vec()));
    }
    Err(GatewayError::MalformedRequest(
        "multipart field 'file' is missing".into(),
    ))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let reason = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    GatewayError::Internal(reason).into_response()
}
