use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::storage::StorageClient;

const PRESIGN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub key: String,
    pub url: String,
}

pub async fn upload_image(
    storage: &dyn StorageClient,
    body: Bytes,
    content_type: &str,
) -> anyhow::Result<UploadedImage> {
    anyhow::ensure!(!body.is_empty(), "empty upload");

    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let key = format!("uploads/{}.{}", Uuid::new_v4(), ext);
    storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {key}"))?;
    let url = storage
        .presign_get(&key, PRESIGN_TTL)
        .await
        .with_context(|| format!("presign url for {key}"))?;
    Ok(UploadedImage { key, url })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}
