//! Archive downloader (§6.2): fetches a product archive and extracts it
//! into `output_dir/<product_name>/`, idempotently.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::{DownloadError, DownloadResult};

/// Per-product metadata the selection layer writes alongside a downloaded
/// archive (§6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub product_name: String,
    pub odata_id: String,
    pub cloud_cover_percentage: f64,
    pub retrieved_at: DateTime<Utc>,
    pub quality_score: f64,
    pub aoi_coverage_percentage: f64,
}

impl ProductMetadata {
    pub fn write_to(&self, dir: impl AsRef<Path>) -> DownloadResult<()> {
        let path = dir.as_ref().join("metadata.json");
        let text = serde_json::to_string_pretty(self).map_err(|e| DownloadError::Extract(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn read_from(dir: impl AsRef<Path>) -> Option<Self> {
        let path = dir.as_ref().join("metadata.json");
        let text = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }
}

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, product_id: &str, product_name: &str, output_dir: &Path) -> DownloadResult<()>;
}

/// A downloader backed by plain HTTP download + local zip extraction.
pub struct FsDownloader {
    http: reqwest::Client,
    archive_base_url: String,
}

impl FsDownloader {
    pub fn new(archive_base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            archive_base_url: archive_base_url.into(),
        }
    }

    fn product_dir(output_dir: &Path, product_name: &str) -> PathBuf {
        output_dir.join(product_name)
    }

    async fn stream_archive(&self, product_id: &str, zip_path: &Path) -> DownloadResult<()> {
        let url = format!("{}({product_id})/$value", self.archive_base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DownloadError::Request(e.to_string()))?;
        let mut stream = response.bytes_stream();

        let mut file = tokio::fs::File::create(zip_path).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Request(e.to_string()))?;
            file.write_all(&chunk).await?;
        }
        Ok(())
    }

    fn extract_and_remove_zip(zip_path: &Path, dest_dir: &Path) -> DownloadResult<()> {
        let file = std::fs::File::open(zip_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| DownloadError::Extract(e.to_string()))?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| DownloadError::Extract(e.to_string()))?;
            let Some(enclosed) = entry.enclosed_name() else {
                continue;
            };
            let out_path = dest_dir.join(enclosed);
            if entry.is_dir() {
                std::fs::create_dir_all(&out_path)?;
                continue;
            }
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out_file = std::fs::File::create(&out_path)?;
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf).map_err(|e| DownloadError::Extract(e.to_string()))?;
            std::io::Write::write_all(&mut out_file, &buf)?;
        }
        std::fs::remove_file(zip_path)?;
        Ok(())
    }
}

#[async_trait]
impl Downloader for FsDownloader {
    async fn download(&self, product_id: &str, product_name: &str, output_dir: &Path) -> DownloadResult<()> {
        let dest_dir = Self::product_dir(output_dir, product_name);

        if dest_dir.exists() {
            if let Some(existing) = ProductMetadata::read_from(&dest_dir) {
                if existing.product_name == product_name {
                    info!(product = product_name, "download is a no-op, metadata already present");
                    return Ok(());
                }
            }
        }
        std::fs::create_dir_all(&dest_dir)?;

        let zip_path = dest_dir.join(format!("{product_name}.zip"));
        if !zip_path.exists() {
            info!(product = product_name, "streaming archive");
            self.stream_archive(product_id, &zip_path).await?;
        } else {
            warn!(product = product_name, "found leftover .zip, extracting without re-downloading");
        }

        Self::extract_and_remove_zip(&zip_path, &dest_dir)?;
        Ok(())
    }
}
