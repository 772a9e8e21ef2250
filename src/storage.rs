use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::StorageConfig;

/// Object storage used for uploaded images.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn presign_get(&self, key: &str, expires_in: Duration) -> anyhow::Result<String>;
}

/// S3-compatible bucket (AWS, MinIO).
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(!cfg.bucket.is_empty(), "storage bucket name is empty");
        Ok(Self {
            client: build_client(cfg).await,
            bucket: cfg.bucket.clone(),
        })
    }

    fn object(&self, key: &str) -> String {
        format!("{}/{key}", self.bucket)
    }
}

/// Path-style addressing so MinIO endpoints without wildcard DNS work.
async fn build_client(cfg: &StorageConfig) -> Client {
    let creds = Credentials::new(&cfg.access_key, &cfg.secret_key, None, None, "env");
    let shared = defaults(BehaviorVersion::latest())
        .region(Region::new(cfg.region.clone()))
        .credentials_provider(creds)
        .load()
        .await;

    let conf = S3ConfigBuilder::from(&shared)
        .endpoint_url(&cfg.endpoint)
        .force_path_style(true)
        .build();
    Client::from_conf(conf)
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("uploading {}", self.object(key)))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await
            .with_context(|| format!("presigning {}", self.object(key)))?;
        Ok(presigned.uri().to_string())
    }
}
