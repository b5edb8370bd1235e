use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

pub const ISSUE_IMAGES_BUCKET: &str = "issue-images";

#[derive(Debug, Clone)]
pub struct PhotoStorage {
    root: PathBuf,
    bucket: &'static str,
    public_base_url: String,
}

impl PhotoStorage {
    pub fn new(storage_dir: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: storage_dir.into(),
            bucket: ISSUE_IMAGES_BUCKET,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(self.bucket)
    }

    pub fn bucket(&self) -> &str {
        self.bucket
    }

    /// Stores `bytes` under `object_path` inside the bucket. Existing objects
    /// are never overwritten.
    pub async fn upload(&self, object_path: &str, bytes: &[u8]) -> std::io::Result<()> {
        let target = self.bucket_dir().join(object_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        info!("🖼️ Stored {} bytes at {}", bytes.len(), target.display());
        Ok(())
    }

    pub fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}/storage/{}/{}",
            self.public_base_url, self.bucket, object_path
        )
    }
}

pub fn object_path_for(reporter_id: &str, file_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    object_path_at(reporter_id, file_name, millis)
}

fn object_path_at(reporter_id: &str, file_name: &str, millis: u128) -> String {
    format!(
        "{}/{}_{}",
        sanitize_segment(reporter_id),
        millis,
        sanitize_file_name(file_name)
    )
}

// Keep only the final path component, and only characters safe in a URL path.
fn sanitize_file_name(raw: &str) -> String {
    let base = Path::new(raw.trim())
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let cleaned = sanitize_segment(base);
    if cleaned.trim_matches('_').is_empty() {
        "photo".to_string()
    } else {
        cleaned
    }
}

fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}
