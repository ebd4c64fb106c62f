//! Object storage: every artifact the gateway produces lands here.
//!
//! Keys are `{folder_path}/{filename}` and writes are single-shot puts that
//! overwrite whatever was there. There is no listing, reading back, or
//! deleting through the gateway.
//!
//! | Backend | Location returned by `put` |
//! |---------|----------------------------|
//! | [`S3Store`] | `https://{bucket}.s3.{region}.amazonaws.com/{key}` (or `{endpoint}/{bucket}/{key}`) |
//! | [`FsStore`] | path of the written file |
//! | [`MemoryStore`] | `memory://{key}` |

use crate::config::{GatewayConfig, StorageBackend};
use crate::error::GatewayError;
use crate::model::StorageObject;
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A write-only object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write one object, returning where it now lives.
    async fn put(&self, object: StorageObject) -> Result<String, GatewayError>;
}

/// Build the store selected by `config.storage_backend`.
pub async fn build_store(config: &GatewayConfig) -> Result<Arc<dyn ObjectStore>, GatewayError> {
    let store: Arc<dyn ObjectStore> = match config.storage_backend {
        StorageBackend::S3 => Arc::new(S3Store::from_config(config).await?),
        StorageBackend::Filesystem => Arc::new(FsStore::new(config.fs_root.clone())),
        StorageBackend::Memory => Arc::new(MemoryStore::default()),
    };
    info!("Object store: {:?}", config.storage_backend);
    Ok(store)
}

// ── S3 ───────────────────────────────────────────────────────────────────

/// Amazon S3 or any S3-compatible endpoint.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: Option<String>,
    endpoint_url: Option<String>,
}

impl S3Store {
    pub async fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let bucket = config.s3_bucket.clone().ok_or_else(|| {
            GatewayError::NotConfigured("S3 bucket not configured (S3_BUCKET_NAME)".into())
        })?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.s3_region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.s3_endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(id), Some(secret)) = (&config.aws_access_key_id, &config.aws_secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                id.clone(),
                secret.clone(),
                None,
                None,
                "scrape-gateway",
            ));
        }
        let shared = loader.load().await;

        // S3-compatible servers generally lack virtual-hosted buckets
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.s3_endpoint_url.is_some())
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket,
            region: config.s3_region.clone(),
            endpoint_url: config.s3_endpoint_url.clone(),
        })
    }

    fn location(&self, key: &str) -> String {
        match (&self.endpoint_url, &self.region) {
            (Some(endpoint), _) => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
            }
            (None, Some(region)) => {
                format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, region, key)
            }
            (None, None) => format!("s3://{}/{}", self.bucket, key),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, object: StorageObject) -> Result<String, GatewayError> {
        let key = object.key();
        let size = object.bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&object.content_type)
            .body(ByteStream::from(object.bytes))
            .send()
            .await
            .map_err(|e| GatewayError::StorageWrite {
                key: key.clone(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        debug!("Stored s3://{}/{} ({} bytes)", self.bucket, key, size);
        Ok(self.location(&key))
    }
}

// ── Filesystem ───────────────────────────────────────────────────────────

/// Local directory tree laid out exactly like the bucket.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn put(&self, object: StorageObject) -> Result<String, GatewayError> {
        let key = object.key();
        let path = self.root.join(&key);
        let fail = |e: std::io::Error| GatewayError::StorageWrite {
            key: key.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(fail)?;
        }
        tokio::fs::write(&path, &object.bytes).await.map_err(fail)?;

        debug!("Stored {} ({} bytes)", path.display(), object.bytes.len());
        Ok(path.display().to_string())
    }
}

// ── Memory ───────────────────────────────────────────────────────────────

/// In-process store for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<StorageObject>>,
}

impl MemoryStore {
    /// Every object written so far, in write order.
    pub fn objects(&self) -> Vec<StorageObject> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Latest object written under `key`.
    pub fn get(&self, key: &str) -> Option<StorageObject> {
        self.objects()
            .into_iter()
            .rev()
            .find(|o| o.key() == key)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, object: StorageObject) -> Result<String, GatewayError> {
        let location = format!("memory://{}", object.key());
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(object);
        Ok(location)
    }
}
