use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const NO_FILE_MESSAGE: &str = "No file provided";
pub const TOO_LARGE_MESSAGE: &str = "File too large. Maximum size is 10MB.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub name: String,
    pub size: usize,
    #[serde(rename = "type")]
    pub content_type: String,
    pub sha256: String,
}

/// `uploads/<year>/<month>/<uuid><ext>`, month without padding.
fn relative_path(original_name: &str, today: NaiveDate) -> PathBuf {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    PathBuf::from("uploads")
        .join(today.year().to_string())
        .join(today.month().to_string())
        .join(format!("{}{}", Uuid::new_v4(), ext))
}

fn join_url(media_url: &str, relative: &Path) -> String {
    let rel = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if media_url.ends_with('/') {
        format!("{}{}", media_url, rel)
    } else {
        format!("{}/{}", media_url, rel)
    }
}

/// Writes an uploaded file under `media_root` and describes where it went.
pub async fn store_upload(
    media_root: &Path,
    media_url: &str,
    original_name: &str,
    content_type: &str,
    bytes: &[u8],
    max_bytes: usize,
    today: NaiveDate,
) -> Result<UploadedFile> {
    if bytes.len() > max_bytes {
        return Err(Error::bad_request(TOO_LARGE_MESSAGE));
    }

    let relative = relative_path(original_name, today);
    let full = media_root.join(&relative);
    if let Some(dir) = full.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&full, bytes).await?;

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let sha256 = hex::encode(hasher.finalize());

    tracing::info!(
        path = %full.to_string_lossy(),
        size = bytes.len(),
        "stored upload"
    );

    Ok(UploadedFile {
        url: join_url(media_url, &relative),
        name: original_name.to_string(),
        size: bytes.len(),
        content_type: content_type.to_string(),
        sha256,
    })
}
