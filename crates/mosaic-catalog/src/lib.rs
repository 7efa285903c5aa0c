//! External collaborators the coverage core consumes but never implements
//! itself (§6): a catalog search client and an archive downloader.

use chrono::{DateTime, Utc};
use mosaic_coverage::ProductLevel;
use thiserror::Error;

pub mod catalog;
pub mod cdse;
pub mod downloader;

pub use catalog::{CatalogClient, CatalogQuery, StaticCatalogClient};
pub use downloader::{Downloader, FsDownloader, ProductMetadata};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(String),
    #[error("catalog response could not be parsed: {0}")]
    Parse(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("download request failed: {0}")]
    Request(String),
    #[error("archive extraction failed: {0}")]
    Extract(String),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// The AOI and date window a catalog search is scoped to (§6.1 query
/// parameters).
#[derive(Debug, Clone)]
pub struct SearchWindow {
    pub aoi_wkt_4326: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_cloud_cover: f64,
    pub product_type: String,
    pub collection: String,
}

impl SearchWindow {
    pub fn new(
        aoi_wkt_4326: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_cloud_cover: f64,
        product_level: ProductLevel,
    ) -> Self {
        Self {
            aoi_wkt_4326: aoi_wkt_4326.into(),
            start,
            end,
            max_cloud_cover,
            product_type: product_level.product_type_code().to_string(),
            collection: "SENTINEL-2".to_string(),
        }
    }
}
