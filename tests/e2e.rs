//! End-to-end tests against the real embedded extractor and a real
//! headless Chrome.
//!
//! They need pdfium and a Chrome/Chromium install, so they are gated behind
//! the `E2E_ENABLED` environment variable and do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Html;
use axum::routing::get;
use scrape_gateway::adapters::{
    BrowserAdapter, ChromeRenderer, EmbeddedPdfAdapter, PdfExtractor, ScrapeRequest,
    WebScraper,
};
use scrape_gateway::fetch::HttpFetcher;
use scrape_gateway::model::LayoutBlockKind;
use scrape_gateway::server::router;
use scrape_gateway::{
    ExtractionResult, Gateway, GatewayError, MemoryStore, ScrapeError, WebScrapeRequest,
    WebScrapeResult,
};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set; otherwise turn on adapter logs.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_logging();
    }};
}

/// Adapter logs on the test writer, visible with `--nocapture`.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scrape_gateway=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// A one-page PDF showing `text` in Helvetica.
fn single_page_pdf(text: &str) -> Vec<u8> {
    build_pdf(&[
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        stream_object("", &format!("BT /F1 24 Tf 72 720 Td ({}) Tj ET", text)),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ])
}

/// A one-page PDF whose only image is drawn from inside a form XObject.
fn form_wrapped_image_pdf() -> Vec<u8> {
    build_pdf(&[
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 5 0 R \
         /Resources << /XObject << /Fm1 4 0 R >> >> >>"
            .to_string(),
        stream_object(
            "/Type /XObject /Subtype /Form /BBox [0 0 612 792] \
             /Resources << /XObject << /Im1 6 0 R >> >>",
            "q 100 0 0 100 72 600 cm /Im1 Do Q",
        ),
        stream_object("", "q /Fm1 Do Q"),
        stream_object(
            "/Type /XObject /Subtype /Image /Width 2 /Height 2 \
             /ColorSpace /DeviceGray /BitsPerComponent 8",
            "@~~@",
        ),
    ])
}

fn stream_object(dict: &str, content: &str) -> String {
    format!(
        "<< {} /Length {} >>\nstream\n{}\nendstream",
        dict,
        content.len(),
        content
    )
}

/// Numbered objects `1 0 obj` onward, with a correct xref table.
fn build_pdf(objects: &[String]) -> Vec<u8> {
    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        let _ = write!(pdf, "{} 0 obj\n{}\nendobj\n", i + 1, body);
    }

    let xref = pdf.len();
    let _ = write!(pdf, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(pdf, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        pdf,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    );
    pdf.into_bytes()
}

/// Stands in for the backends a test does not exercise.
struct Unused;

#[async_trait]
impl PdfExtractor for Unused {
    fn name(&self) -> &str {
        "unused"
    }

    async fn analyze(&self, _pdf: &[u8]) -> Result<Option<ExtractionResult>, GatewayError> {
        panic!("unexpected PDF extraction");
    }
}

#[async_trait]
impl WebScraper for Unused {
    fn name(&self) -> &str {
        "unused"
    }

    async fn scrape(&self, _request: ScrapeRequest<'_>) -> Result<WebScrapeResult, ScrapeError> {
        panic!("unexpected web scrape");
    }
}

fn real_gateway(store: Arc<MemoryStore>) -> Gateway {
    Gateway::builder()
        .enterprise(Arc::new(Unused))
        .opensource(Arc::new(EmbeddedPdfAdapter::new(None)))
        .browser(Arc::new(BrowserAdapter::new(Arc::new(ChromeRenderer::new(
            Duration::from_secs(20),
            None,
        )))))
        .scraping_api(Arc::new(Unused))
        .store(store)
        .fetcher(Arc::new(HttpFetcher::default()))
        .build()
        .expect("valid gateway")
}

/// Serve a small page with two images on an ephemeral local port.
async fn spawn_fixture_site() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = axum::Router::new()
        .route(
            "/",
            get(|| async {
                Html(
                    r#"<html><body>
                    <h1>Fixture</h1>
                    <p>Two pictures follow.</p>
                    <img src="/second.png">
                    <img src="/first.png">
                    <a href="/about">About</a>
                    </body></html>"#,
                )
            }),
        )
        .route("/second.png", get(|| async { vec![2u8; 8] }))
        .route("/first.png", get(|| async { vec![1u8; 8] }));

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

// ── Fixture sanity (always runs) ─────────────────────────────────────────────

#[test]
fn test_fixture_pdfs_are_well_formed() {
    for pdf in [single_page_pdf("Hello World"), form_wrapped_image_pdf()] {
        let text = String::from_utf8(pdf).unwrap();
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));

        // every xref entry points at the object it names
        let xref_at = text.find("xref\n").unwrap();
        let mut lines = text[xref_at..].lines().skip(1);
        let size: usize = lines.next().unwrap()[2..].parse().unwrap();
        let entries: Vec<&str> = lines
            .skip(1)
            .take_while(|l| !l.starts_with("trailer"))
            .collect();
        assert_eq!(entries.len(), size - 1);
        for (i, line) in entries.iter().enumerate() {
            let offset: usize = line[..10].parse().unwrap();
            assert!(text[offset..].starts_with(&format!("{} 0 obj", i + 1)));
        }
    }
}

// ── Embedded PDF extraction ──────────────────────────────────────────────────

#[tokio::test]
async fn test_opensource_hello_world() {
    e2e_skip_unless_enabled!();

    let store = Arc::new(MemoryStore::default());
    let app = router(Arc::new(real_gateway(store.clone())), 10 * 1024 * 1024);

    let boundary = "e2e-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"hello.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&single_page_pdf("Hello World"));
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/pdf/opensource-scrape")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status, StatusCode::OK, "{json}");

    let md = json["markdown_content"].as_str().unwrap();
    println!("--- BEGIN OUTPUT ---\n{}\n--- END OUTPUT ---", md);
    assert!(md.contains("Hello World"));
    assert!(md.contains("### Page 1"));
    assert!(!md.contains("Tables"));
    assert!(store
        .get("pdf_extraction/opensource/markdown/hello.md")
        .is_some());
}

#[tokio::test]
async fn test_opensource_finds_images_inside_form_xobjects() {
    e2e_skip_unless_enabled!();

    let adapter = EmbeddedPdfAdapter::new(None);
    let result = adapter
        .analyze(&form_wrapped_image_pdf())
        .await
        .expect("extraction should succeed")
        .expect("embedded extraction always yields a result");

    assert_eq!(result.images.len(), 1);
    assert_eq!(result.images[0].filename, "image_1_1.png");
    assert!(result
        .layout_blocks
        .iter()
        .any(|b| b.kind == LayoutBlockKind::Image && b.page_number == 1));
}

#[tokio::test]
async fn test_opensource_corrupt_pdf_is_processing_failure() {
    e2e_skip_unless_enabled!();

    let adapter = EmbeddedPdfAdapter::new(None);
    let err = adapter
        .analyze(b"%PDF-1.4\nthis is not a real document")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::ProcessingFailed(_)), "{err}");
}

// ── Headless browser ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_selenium_unreachable_url() {
    e2e_skip_unless_enabled!();

    let gateway = real_gateway(Arc::new(MemoryStore::default()));
    let err = gateway
        .scrape_web(&WebScrapeRequest {
            // discard port: nothing listens there
            url: Some("http://127.0.0.1:9/".into()),
            method: "Selenium".into(),
            api_key: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        err.to_string().starts_with("Error during scraping:"),
        "{err}"
    );
}

#[tokio::test]
async fn test_selenium_two_images_in_dom_order() {
    e2e_skip_unless_enabled!();

    let site = spawn_fixture_site().await;
    let store = Arc::new(MemoryStore::default());
    let gateway = real_gateway(store.clone());

    let response = gateway
        .scrape_web(&WebScrapeRequest {
            url: Some(format!("{}/", site)),
            method: "Selenium".into(),
            api_key: None,
        })
        .await
        .expect("scrape should succeed");

    println!("{}", response.markdown_content);
    assert!(response.markdown_content.contains("Two pictures follow."));
    assert!(response
        .markdown_content
        .contains(&format!("![Image 1]({}/second.png)", site)));
    assert_eq!(
        response.image_urls,
        vec![
            "memory://web_scraping/selenium/images/image_1.jpg",
            "memory://web_scraping/selenium/images/image_2.jpg",
        ]
    );

    let first = store.get("web_scraping/selenium/images/image_1.jpg").unwrap();
    assert_eq!(first.bytes, vec![2u8; 8]);
}

#[tokio::test]
async fn test_selenium_concurrent_requests_use_separate_browsers() {
    e2e_skip_unless_enabled!();

    let site = spawn_fixture_site().await;
    let gateway = real_gateway(Arc::new(MemoryStore::default()));
    let request = WebScrapeRequest {
        url: Some(format!("{}/", site)),
        method: "Selenium".into(),
        api_key: None,
    };

    let (first, second) = tokio::join!(gateway.scrape_web(&request), gateway.scrape_web(&request));
    let first = first.expect("first scrape should succeed");
    let second = second.expect("second scrape should succeed");
    assert!(first.markdown_content.contains("Two pictures follow."));
    assert!(second.markdown_content.contains("Two pictures follow."));
}
