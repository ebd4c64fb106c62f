//! HTTP server binary for scrape-gateway.
//!
//! A thin shim that maps flags and environment variables to
//! `GatewayConfig` and serves the router.

use anyhow::{Context, Result};
use clap::Parser;
use scrape_gateway::config::{DEFAULT_ANALYZE_API_VERSION, DEFAULT_SCRAPING_API_ENDPOINT};
use scrape_gateway::{server, EmptyContentPolicy, Gateway, GatewayConfig, StorageBackend};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # S3 storage, credentials from the environment
  S3_BUCKET_NAME=my-bucket S3_REGION=us-east-1 scrape-gateway

  # Local run, artifacts under ./object-store
  scrape-gateway --storage filesystem --fs-root ./object-store

  # MinIO or another S3-compatible server
  scrape-gateway --s3-endpoint-url http://localhost:9000 --s3-bucket scrape

ROUTES:
  POST /pdf/enterprise-scrape   multipart `file`  cloud document analysis
  POST /pdf/opensource-scrape   multipart `file`  embedded pdfium
  POST /web/scrape              {url, method, api_key?}
  GET  /health

ENVIRONMENT VARIABLES:
  AZURE_ENDPOINT_URL      Document analysis endpoint
  AZURE_KEY_API           Document analysis key
  AWS_ACCESS_KEY_ID       S3 access key (falls back to the AWS default chain)
  AWS_SECRET_ACCESS_KEY   S3 secret key
  S3_BUCKET_NAME          Target bucket
  S3_REGION               Bucket region
  SCRAPING_BEE_KEY        Scraping API key
  SCRAPING_BEE_EP         Scraping API endpoint
  RUST_LOG                Log filter, e.g. scrape_gateway=debug,tower_http=debug
"#;

/// Serve the PDF and web extraction routes.
#[derive(Parser, Debug)]
#[command(
    name = "scrape-gateway",
    version,
    about = "PDF and web scraping gateway: extract to Markdown, persist to object storage",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Listen address.
    #[arg(long, env = "SCRAPE_GATEWAY_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// Maximum request body size in MiB.
    #[arg(long, env = "SCRAPE_GATEWAY_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: usize,

    /// Object-store backend.
    #[arg(long, env = "SCRAPE_GATEWAY_STORAGE", value_enum, default_value = "s3")]
    storage: StorageArg,

    /// S3 bucket.
    #[arg(long, env = "S3_BUCKET_NAME")]
    s3_bucket: Option<String>,

    /// S3 region.
    #[arg(long, env = "S3_REGION")]
    s3_region: Option<String>,

    /// Custom S3 endpoint for S3-compatible servers.
    #[arg(long, env = "S3_ENDPOINT_URL")]
    s3_endpoint_url: Option<String>,

    /// Root directory for `--storage filesystem`.
    #[arg(long, env = "SCRAPE_GATEWAY_FS_ROOT", default_value = "object-store")]
    fs_root: PathBuf,

    /// Document analysis endpoint.
    #[arg(long, env = "AZURE_ENDPOINT_URL")]
    analyze_endpoint: Option<String>,

    /// Document analysis model.
    #[arg(long, env = "AZURE_MODEL_ID", default_value = "prebuilt-layout")]
    analyze_model: String,

    /// Document analysis API version.
    #[arg(long, env = "AZURE_API_VERSION", default_value = DEFAULT_ANALYZE_API_VERSION)]
    analyze_api_version: String,

    /// Milliseconds between analysis status polls.
    #[arg(long, env = "AZURE_POLL_INTERVAL_MS", default_value_t = 1000)]
    analyze_poll_interval_ms: u64,

    /// Status polls before an analysis counts as failed.
    #[arg(long, env = "AZURE_MAX_POLLS", default_value_t = 300)]
    analyze_max_polls: u32,

    /// Scraping API endpoint.
    #[arg(long, env = "SCRAPING_BEE_EP", default_value = DEFAULT_SCRAPING_API_ENDPOINT)]
    scraping_api_endpoint: String,

    /// Seconds to wait for `<body>` in the headless browser.
    #[arg(long, env = "SCRAPE_GATEWAY_BROWSER_WAIT", default_value_t = 20)]
    browser_wait_secs: u64,

    /// Chrome/Chromium executable (auto-detected when unset).
    #[arg(long, env = "CHROME_EXECUTABLE")]
    chrome_executable: Option<PathBuf>,

    /// Directory holding the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_DIR")]
    pdfium_lib_dir: Option<PathBuf>,

    /// Fail PDF requests whose extraction is blank.
    #[arg(long, env = "SCRAPE_GATEWAY_REJECT_EMPTY")]
    reject_empty: bool,

    /// Append the embedded extractor's layout dump to its Markdown.
    #[arg(long, env = "SCRAPE_GATEWAY_LAYOUT_BLOCKS")]
    layout_blocks: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCRAPE_GATEWAY_VERBOSE")]
    verbose: bool,

    /// Log errors only.
    #[arg(short, long, env = "SCRAPE_GATEWAY_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StorageArg {
    S3,
    Filesystem,
    Memory,
}

impl From<StorageArg> for StorageBackend {
    fn from(v: StorageArg) -> Self {
        match v {
            StorageArg::S3 => StorageBackend::S3,
            StorageArg::Filesystem => StorageBackend::Filesystem,
            StorageArg::Memory => StorageBackend::Memory,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "scrape_gateway=debug,tower_http=debug"
    } else if cli.quiet {
        "error"
    } else {
        "scrape_gateway=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(cli)?;
    info!("Configuration: {:?}", config);

    // ── Serve ────────────────────────────────────────────────────────────
    let gateway = Gateway::from_config(&config)
        .await
        .context("Failed to initialise gateway")?;
    server::serve(Arc::new(gateway), &config)
        .await
        .context("Server failed")?;

    Ok(())
}

/// Map CLI args to `GatewayConfig`. Secrets come from the environment only.
fn build_config(cli: Cli) -> Result<GatewayConfig> {
    let env = |name: &str| std::env::var(name).ok();

    GatewayConfig::builder()
        .bind_addr(cli.bind)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024))
        .storage_backend(cli.storage.into())
        .s3_bucket(cli.s3_bucket)
        .s3_region(cli.s3_region)
        .s3_endpoint_url(cli.s3_endpoint_url)
        .aws_credentials(env("AWS_ACCESS_KEY_ID"), env("AWS_SECRET_ACCESS_KEY"))
        .fs_root(cli.fs_root)
        .analyze_endpoint(cli.analyze_endpoint)
        .analyze_key(env("AZURE_KEY_API"))
        .analyze_model(cli.analyze_model)
        .analyze_api_version(cli.analyze_api_version)
        .analyze_poll_interval_ms(cli.analyze_poll_interval_ms)
        .analyze_max_polls(cli.analyze_max_polls)
        .scraping_api_endpoint(cli.scraping_api_endpoint)
        .scraping_api_key(env("SCRAPING_BEE_KEY"))
        .browser_wait_secs(cli.browser_wait_secs)
        .chrome_executable(cli.chrome_executable)
        .pdfium_library_dir(cli.pdfium_lib_dir)
        .empty_content(if cli.reject_empty {
            EmptyContentPolicy::Reject
        } else {
            EmptyContentPolicy::Accept
        })
        .render_layout_blocks(cli.layout_blocks)
        .build()
        .context("Invalid configuration")
}
