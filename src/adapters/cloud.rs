//! Cloud document analysis via the Document Intelligence REST API.
//!
//! The provider is asynchronous: the PDF is submitted once, the response
//! carries an `Operation-Location` URL, and that URL is polled until the
//! analysis reports `succeeded` or `failed`. The finished page/line/table
//! model is flattened into an [`ExtractionResult`].
//!
//! Provider failures (network, auth, quota, a `failed` status) are logged
//! and reported as `Ok(None)` so the router answers "no data extracted".
//! Nothing is retried.

use super::PdfExtractor;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::model::{ExtractionResult, PageText, TableBlock, TableCell};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION: &str = "operation-location";

/// Adapter for the cloud layout-analysis provider.
pub struct CloudDocumentAdapter {
    client: reqwest::Client,
    endpoint: Option<String>,
    key: Option<String>,
    model: String,
    api_version: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl CloudDocumentAdapter {
    pub fn from_config(config: &GatewayConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: config.analyze_endpoint.clone(),
            key: config.analyze_key.clone(),
            model: config.analyze_model.clone(),
            api_version: config.analyze_api_version.clone(),
            poll_interval: Duration::from_millis(config.analyze_poll_interval_ms),
            max_polls: config.analyze_max_polls,
        }
    }

    fn analyze_url(&self, endpoint: &str) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            endpoint.trim_end_matches('/'),
            self.model,
            self.api_version
        )
    }

    /// Submit the document and poll the operation to completion.
    async fn run_analysis(
        &self,
        endpoint: &str,
        key: &str,
        pdf: &[u8],
    ) -> Result<AnalyzeResult, String> {
        let response = self
            .client
            .post(self.analyze_url(endpoint))
            .header(KEY_HEADER, key)
            .header(CONTENT_TYPE, "application/pdf")
            .body(pdf.to_vec())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("analyze request rejected with HTTP {status}: {body}"));
        }

        let operation = response
            .headers()
            .get(OPERATION_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| "provider response has no Operation-Location header".to_string())?;
        debug!("Analysis submitted, polling {}", operation);

        for attempt in 1..=self.max_polls {
            sleep(self.poll_interval).await;

            let poll = self
                .client
                .get(&operation)
                .header(KEY_HEADER, key)
                .send()
                .await
                .map_err(|e| e.to_string())?;
            if !poll.status().is_success() {
                return Err(format!("status poll failed with HTTP {}", poll.status()));
            }
            let op: AnalyzeOperation = poll.json().await.map_err(|e| e.to_string())?;

            match op.state() {
                OperationState::Succeeded(result) => {
                    info!("Analysis finished after {} polls", attempt);
                    return Ok(result);
                }
                OperationState::Failed(reason) => return Err(reason),
                OperationState::Running => {
                    debug!("Analysis still running (poll {}/{})", attempt, self.max_polls)
                }
            }
        }

        Err(format!(
            "analysis did not finish after {} polls",
            self.max_polls
        ))
    }
}

#[async_trait]
impl PdfExtractor for CloudDocumentAdapter {
    fn name(&self) -> &str {
        "cloud-document-analysis"
    }

    async fn analyze(&self, pdf: &[u8]) -> Result<Option<ExtractionResult>, GatewayError> {
        let (Some(endpoint), Some(key)) = (self.endpoint.as_deref(), self.key.as_deref()) else {
            warn!("Document analysis endpoint or key not configured (AZURE_ENDPOINT_URL / AZURE_KEY_API)");
            return Ok(None);
        };

        match self.run_analysis(endpoint, key, pdf).await {
            Ok(result) => Ok(Some(flatten(result))),
            Err(reason) => {
                warn!("Error during extraction: {}", reason);
                Ok(None)
            }
        }
    }
}

// ── Provider wire model ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

enum OperationState {
    Running,
    Succeeded(AnalyzeResult),
    Failed(String),
}

impl AnalyzeOperation {
    fn state(self) -> OperationState {
        match self.status.to_ascii_lowercase().as_str() {
            "succeeded" => match self.analyze_result {
                Some(result) => OperationState::Succeeded(result),
                None => OperationState::Failed("succeeded without an analyzeResult".into()),
            },
            "failed" | "canceled" => {
                let detail = self
                    .error
                    .map(|e| {
                        format!(
                            "{}: {}",
                            e.code.unwrap_or_else(|| "Unknown".into()),
                            e.message.unwrap_or_default()
                        )
                    })
                    .unwrap_or_else(|| format!("operation {}", self.status));
                OperationState::Failed(detail)
            }
            _ => OperationState::Running,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResult {
    #[serde(default)]
    pages: Vec<AnalyzedPage>,
    #[serde(default)]
    tables: Vec<AnalyzedTable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzedPage {
    page_number: usize,
    #[serde(default)]
    lines: Vec<AnalyzedLine>,
}

#[derive(Debug, Deserialize)]
struct AnalyzedLine {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzedTable {
    #[serde(default)]
    cells: Vec<AnalyzedCell>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzedCell {
    row_index: usize,
    column_index: usize,
    #[serde(default)]
    content: String,
}

/// Page text is every line followed by `\n`; document text is the pages
/// concatenated; every provider table becomes one [`TableBlock`].
fn flatten(result: AnalyzeResult) -> ExtractionResult {
    let mut text = String::new();
    let mut pages = Vec::with_capacity(result.pages.len());

    for page in result.pages {
        let mut page_text = String::new();
        for line in page.lines {
            page_text.push_str(&line.content);
            page_text.push('\n');
        }
        text.push_str(&page_text);
        pages.push(PageText {
            page_number: page.page_number,
            text: page_text,
        });
    }

    let tables = result
        .tables
        .into_iter()
        .map(|table| TableBlock {
            cells: table
                .cells
                .into_iter()
                .map(|c| TableCell {
                    row: c.row_index,
                    column: c.column_index,
                    text: c.content,
                })
                .collect(),
        })
        .collect();

    ExtractionResult {
        text,
        tables,
        page_breakdown: Some(pages),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const FINISHED: &str = r#"{
        "status": "succeeded",
        "createdDateTime": "2024-01-01T00:00:00Z",
        "analyzeResult": {
            "apiVersion": "2023-07-31",
            "modelId": "prebuilt-layout",
            "pages": [
                {"pageNumber": 1, "lines": [{"content": "Invoice 42"}, {"content": "Total due"}]},
                {"pageNumber": 2, "lines": [{"content": "Thank you"}]}
            ],
            "tables": [
                {"rowCount": 2, "columnCount": 2, "cells": [
                    {"rowIndex": 0, "columnIndex": 0, "content": "Item"},
                    {"rowIndex": 0, "columnIndex": 1, "content": "Price"},
                    {"rowIndex": 1, "columnIndex": 1, "content": "9.99"}
                ]}
            ]
        }
    }"#;

    #[test]
    fn flattens_pages_and_tables() {
        let op: AnalyzeOperation = serde_json::from_str(FINISHED).unwrap();
        let OperationState::Succeeded(result) = op.state() else {
            panic!("expected a finished operation");
        };
        let extracted = flatten(result);

        assert_eq!(extracted.text, "Invoice 42\nTotal due\nThank you\n");
        let pages = extracted.page_breakdown.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].page_number, 2);
        assert_eq!(pages[1].text, "Thank you\n");

        assert_eq!(extracted.tables.len(), 1);
        let cells = &extracted.tables[0].cells;
        assert_eq!(cells.len(), 3, "absent cells stay absent");
        assert_eq!(
            cells[2],
            TableCell {
                row: 1,
                column: 1,
                text: "9.99".into()
            }
        );
        assert!(extracted.images.is_empty());
        assert!(extracted.layout_blocks.is_empty());
    }

    #[test]
    fn running_and_failed_states() {
        let op: AnalyzeOperation = serde_json::from_str(r#"{"status": "running"}"#).unwrap();
        assert!(matches!(op.state(), OperationState::Running));

        let op: AnalyzeOperation = serde_json::from_str(
            r#"{"status": "failed", "error": {"code": "InvalidContent", "message": "corrupt"}}"#,
        )
        .unwrap();
        match op.state() {
            OperationState::Failed(reason) => assert_eq!(reason, "InvalidContent: corrupt"),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn analyze_url_shape() {
        let config = GatewayConfig::builder()
            .storage_backend(StorageBackend::Memory)
            .build()
            .unwrap();
        let adapter = CloudDocumentAdapter::from_config(&config, reqwest::Client::new());
        assert_eq!(
            adapter.analyze_url("https://doc.cognitiveservices.azure.com/"),
            "https://doc.cognitiveservices.azure.com/formrecognizer/documentModels/prebuilt-layout:analyze?api-version=2023-07-31"
        );
    }

    #[tokio::test]
    async fn unconfigured_provider_reports_no_data() {
        let config = GatewayConfig::builder()
            .storage_backend(StorageBackend::Memory)
            .build()
            .unwrap();
        let adapter = CloudDocumentAdapter::from_config(&config, reqwest::Client::new());
        let out = adapter.analyze(b"%PDF-1.4").await.unwrap();
        assert!(out.is_none());
    }

    // ── Local provider ───────────────────────────────────────────────────

    #[derive(Clone, Copy)]
    enum Scenario {
        SucceedsOnSecondPoll,
        Fails,
        NeverFinishes,
        RejectsKey,
    }

    struct Submission {
        path_and_query: String,
        key: Option<String>,
        content_type: Option<String>,
        body: Vec<u8>,
    }

    struct Provider {
        scenario: Scenario,
        host: String,
        polls: AtomicUsize,
        poll_keys: Mutex<Vec<Option<String>>>,
        submitted: Mutex<Option<Submission>>,
    }

    fn header(headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    async fn submit(
        State(provider): State<Arc<Provider>>,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        *provider.submitted.lock().unwrap() = Some(Submission {
            path_and_query: uri
                .path_and_query()
                .map(|p| p.to_string())
                .unwrap_or_default(),
            key: header(&headers, KEY_HEADER),
            content_type: header(&headers, "content-type"),
            body: body.to_vec(),
        });

        if let Scenario::RejectsKey = provider.scenario {
            return (StatusCode::UNAUTHORIZED, "invalid subscription key").into_response();
        }
        (
            StatusCode::ACCEPTED,
            [("Operation-Location", format!("{}/operations/42", provider.host))],
        )
            .into_response()
    }

    async fn poll(State(provider): State<Arc<Provider>>, headers: HeaderMap) -> Response {
        let n = provider.polls.fetch_add(1, Ordering::SeqCst) + 1;
        provider
            .poll_keys
            .lock()
            .unwrap()
            .push(header(&headers, KEY_HEADER));

        let body = match provider.scenario {
            Scenario::SucceedsOnSecondPoll if n >= 2 => FINISHED,
            Scenario::Fails => {
                r#"{"status": "failed", "error": {"code": "InvalidContent", "message": "corrupt"}}"#
            }
            _ => r#"{"status": "running"}"#,
        };
        body.into_response()
    }

    /// Serve a fake analysis provider; returns it with an adapter pointed at it.
    async fn spawn_provider(scenario: Scenario) -> (Arc<Provider>, CloudDocumentAdapter) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());
        let provider = Arc::new(Provider {
            scenario,
            host: host.clone(),
            polls: AtomicUsize::new(0),
            poll_keys: Mutex::new(Vec::new()),
            submitted: Mutex::new(None),
        });

        let app = axum::Router::new()
            .route("/operations/:id", get(poll))
            .fallback(submit)
            .with_state(provider.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let config = GatewayConfig::builder()
            .storage_backend(StorageBackend::Memory)
            .analyze_endpoint(Some(host))
            .analyze_key(Some("secret-key".into()))
            .analyze_poll_interval_ms(5)
            .analyze_max_polls(3)
            .build()
            .unwrap();
        let adapter = CloudDocumentAdapter::from_config(&config, reqwest::Client::new());
        (provider, adapter)
    }

    #[tokio::test]
    async fn submits_then_polls_until_succeeded() {
        let (provider, adapter) = spawn_provider(Scenario::SucceedsOnSecondPoll).await;

        let out = adapter.analyze(b"%PDF-1.4 body").await.unwrap();
        let extracted = out.expect("analysis should succeed");
        assert_eq!(extracted.text, "Invoice 42\nTotal due\nThank you\n");
        assert_eq!(extracted.tables.len(), 1);

        let submitted = provider.submitted.lock().unwrap().take().unwrap();
        assert_eq!(
            submitted.path_and_query,
            "/formrecognizer/documentModels/prebuilt-layout:analyze?api-version=2023-07-31"
        );
        assert_eq!(submitted.key.as_deref(), Some("secret-key"));
        assert_eq!(submitted.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(submitted.body, b"%PDF-1.4 body");

        assert_eq!(provider.polls.load(Ordering::SeqCst), 2);
        assert!(provider
            .poll_keys
            .lock()
            .unwrap()
            .iter()
            .all(|k| k.as_deref() == Some("secret-key")));
    }

    #[tokio::test]
    async fn failed_operation_reports_no_data() {
        let (provider, adapter) = spawn_provider(Scenario::Fails).await;
        let out = adapter.analyze(b"%PDF-1.4").await.unwrap();
        assert!(out.is_none());
        assert_eq!(provider.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_polling_at_the_ceiling() {
        let (provider, adapter) = spawn_provider(Scenario::NeverFinishes).await;
        let out = adapter.analyze(b"%PDF-1.4").await.unwrap();
        assert!(out.is_none());
        assert_eq!(provider.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejected_submission_never_polls() {
        let (provider, adapter) = spawn_provider(Scenario::RejectsKey).await;
        let out = adapter.analyze(b"%PDF-1.4").await.unwrap();
        assert!(out.is_none());
        assert!(provider.submitted.lock().unwrap().is_some());
        assert_eq!(provider.polls.load(Ordering::SeqCst), 0);
    }
}
