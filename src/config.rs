//! Configuration for the gateway and its providers.
//!
//! Every knob lives in [`GatewayConfig`], built via [`GatewayConfigBuilder`].
//! The server binary maps CLI flags and environment variables onto the
//! builder; library users and tests set only the fields they care about.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default ScrapingBee endpoint.
pub const DEFAULT_SCRAPING_API_ENDPOINT: &str = "https://app.scrapingbee.com/api/v1/";

/// Default Document Intelligence REST API version.
pub const DEFAULT_ANALYZE_API_VERSION: &str = "2023-07-31";

/// Configuration for a gateway instance.
///
/// # Example
/// ```rust
/// use scrape_gateway::{GatewayConfig, StorageBackend};
///
/// let config = GatewayConfig::builder()
///     .storage_backend(StorageBackend::Memory)
///     .browser_wait_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.browser_wait_secs, 30);
/// ```
#[derive(Clone)]
pub struct GatewayConfig {
    /// Socket address the HTTP server binds to. Default: `0.0.0.0:8000`.
    pub bind_addr: String,

    /// Maximum accepted request body in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Where artifacts are written. Default: [`StorageBackend::S3`].
    pub storage_backend: StorageBackend,

    /// S3 bucket name. Required for the S3 backend.
    pub s3_bucket: Option<String>,

    /// S3 region, e.g. `us-east-2`. Falls back to the AWS default chain.
    pub s3_region: Option<String>,

    /// Static access key id. Falls back to the AWS default chain.
    pub aws_access_key_id: Option<String>,

    /// Static secret access key.
    pub aws_secret_access_key: Option<String>,

    /// Custom S3 endpoint (MinIO, LocalStack).
    pub s3_endpoint_url: Option<String>,

    /// Root directory for the filesystem backend. Default: `./object-store`.
    pub fs_root: PathBuf,

    /// Document Intelligence endpoint, e.g. `https://<name>.cognitiveservices.azure.com/`.
    pub analyze_endpoint: Option<String>,

    /// Document Intelligence subscription key.
    pub analyze_key: Option<String>,

    /// Model used for layout analysis. Default: `prebuilt-layout`.
    pub analyze_model: String,

    /// REST API version. Default: [`DEFAULT_ANALYZE_API_VERSION`].
    pub analyze_api_version: String,

    /// Delay between analysis status polls. Default: 1000 ms.
    pub analyze_poll_interval_ms: u64,

    /// Polls before an unfinished analysis is treated as a provider failure. Default: 300.
    pub analyze_max_polls: u32,

    /// ScrapingBee endpoint. Default: [`DEFAULT_SCRAPING_API_ENDPOINT`].
    pub scraping_api_endpoint: String,

    /// ScrapingBee API key. The web route refuses `ScrapingBee` without one.
    pub scraping_api_key: Option<String>,

    /// How long the browser waits for `<body>` to appear. Default: 20 s.
    pub browser_wait_secs: u64,

    /// Chrome/Chromium executable. Auto-detected when `None`.
    pub chrome_executable: Option<PathBuf>,

    /// Directory holding libpdfium. Falls back to `./`, then the system library.
    pub pdfium_library_dir: Option<PathBuf>,

    /// What to do when a PDF yields only whitespace. Default: accept.
    pub empty_content: EmptyContentPolicy,

    /// Render the embedded adapter's layout dump into the Markdown. Default: false.
    pub render_layout_blocks: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
            storage_backend: StorageBackend::default(),
            s3_bucket: None,
            s3_region: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            s3_endpoint_url: None,
            fs_root: PathBuf::from("object-store"),
            analyze_endpoint: None,
            analyze_key: None,
            analyze_model: "prebuilt-layout".to_string(),
            analyze_api_version: DEFAULT_ANALYZE_API_VERSION.to_string(),
            analyze_poll_interval_ms: 1000,
            analyze_max_polls: 300,
            scraping_api_endpoint: DEFAULT_SCRAPING_API_ENDPOINT.to_string(),
            scraping_api_key: None,
            browser_wait_secs: 20,
            chrome_executable: None,
            pdfium_library_dir: None,
            empty_content: EmptyContentPolicy::default(),
            render_layout_blocks: false,
        }
    }
}

fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bind_addr", &self.bind_addr)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("storage_backend", &self.storage_backend)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("aws_access_key_id", &redact(&self.aws_access_key_id))
            .field("aws_secret_access_key", &redact(&self.aws_secret_access_key))
            .field("s3_endpoint_url", &self.s3_endpoint_url)
            .field("fs_root", &self.fs_root)
            .field("analyze_endpoint", &self.analyze_endpoint)
            .field("analyze_key", &redact(&self.analyze_key))
            .field("analyze_model", &self.analyze_model)
            .field("analyze_api_version", &self.analyze_api_version)
            .field("scraping_api_endpoint", &self.scraping_api_endpoint)
            .field("scraping_api_key", &redact(&self.scraping_api_key))
            .field("browser_wait_secs", &self.browser_wait_secs)
            .field("empty_content", &self.empty_content)
            .field("render_layout_blocks", &self.render_layout_blocks)
            .finish()
    }
}

impl GatewayConfig {
    /// Create a new builder for `GatewayConfig`.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

/// Treat empty strings from the environment as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl GatewayConfigBuilder {
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn storage_backend(mut self, backend: StorageBackend) -> Self {
        self.config.storage_backend = backend;
        self
    }

    pub fn s3_bucket(mut self, bucket: Option<String>) -> Self {
        self.config.s3_bucket = non_empty(bucket);
        self
    }

    pub fn s3_region(mut self, region: Option<String>) -> Self {
        self.config.s3_region = non_empty(region);
        self
    }

    pub fn aws_credentials(mut self, access_key_id: Option<String>, secret: Option<String>) -> Self {
        self.config.aws_access_key_id = non_empty(access_key_id);
        self.config.aws_secret_access_key = non_empty(secret);
        self
    }

    pub fn s3_endpoint_url(mut self, url: Option<String>) -> Self {
        self.config.s3_endpoint_url = non_empty(url);
        self
    }

    pub fn fs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.fs_root = root.into();
        self
    }

    pub fn analyze_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.config.analyze_endpoint = non_empty(endpoint);
        self
    }

    pub fn analyze_key(mut self, key: Option<String>) -> Self {
        self.config.analyze_key = non_empty(key);
        self
    }

    pub fn analyze_model(mut self, model: impl Into<String>) -> Self {
        self.config.analyze_model = model.into();
        self
    }

    pub fn analyze_api_version(mut self, version: impl Into<String>) -> Self {
        self.config.analyze_api_version = version.into();
        self
    }

    pub fn analyze_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.analyze_poll_interval_ms = ms;
        self
    }

    pub fn analyze_max_polls(mut self, n: u32) -> Self {
        self.config.analyze_max_polls = n.max(1);
        self
    }

    pub fn scraping_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.scraping_api_endpoint = endpoint.into();
        self
    }

    pub fn scraping_api_key(mut self, key: Option<String>) -> Self {
        self.config.scraping_api_key = non_empty(key);
        self
    }

    pub fn browser_wait_secs(mut self, secs: u64) -> Self {
        self.config.browser_wait_secs = secs;
        self
    }

    pub fn chrome_executable(mut self, path: Option<PathBuf>) -> Self {
        self.config.chrome_executable = path;
        self
    }

    pub fn pdfium_library_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.pdfium_library_dir = dir;
        self
    }

    pub fn empty_content(mut self, policy: EmptyContentPolicy) -> Self {
        self.config.empty_content = policy;
        self
    }

    pub fn render_layout_blocks(mut self, v: bool) -> Self {
        self.config.render_layout_blocks = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GatewayConfig, GatewayError> {
        let c = &self.config;
        if c.storage_backend == StorageBackend::S3 && c.s3_bucket.is_none() {
            return Err(GatewayError::InvalidConfig(
                "the S3 storage backend needs a bucket (S3_BUCKET_NAME)".into(),
            ));
        }
        if c.browser_wait_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "browser wait must be at least 1 second".into(),
            ));
        }
        if c.analyze_poll_interval_ms == 0 {
            return Err(GatewayError::InvalidConfig(
                "analysis poll interval must be at least 1 ms".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(GatewayError::InvalidConfig(
                "upload limit must be greater than zero".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Object-store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Amazon S3 or an S3-compatible endpoint (default).
    #[default]
    S3,
    /// Local directory tree mirroring the S3 key layout.
    Filesystem,
    /// Process memory; contents are lost on exit.
    Memory,
}

/// What the PDF routes do when extraction succeeds but yields no content.
///
/// The two PDF backends historically disagreed here, so the choice is
/// explicit rather than baked into either adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyContentPolicy {
    /// Return the (nearly empty) Markdown as a success. (default)
    #[default]
    Accept,
    /// Fail with "No Data Extracted From the PDF".
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GatewayConfig::default();
        assert_eq!(c.browser_wait_secs, 20);
        assert_eq!(c.analyze_model, "prebuilt-layout");
        assert_eq!(c.empty_content, EmptyContentPolicy::Accept);
        assert!(!c.render_layout_blocks);
    }

    #[test]
    fn s3_backend_requires_bucket() {
        let err = GatewayConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("bucket"), "got: {err}");

        let ok = GatewayConfig::builder()
            .s3_bucket(Some("artifacts".into()))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn blank_env_values_are_unset() {
        let c = GatewayConfig::builder()
            .storage_backend(StorageBackend::Memory)
            .scraping_api_key(Some("   ".into()))
            .build()
            .unwrap();
        assert!(c.scraping_api_key.is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = GatewayConfig::builder()
            .storage_backend(StorageBackend::Memory)
            .analyze_key(Some("super-secret".into()))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
