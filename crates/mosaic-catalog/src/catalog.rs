//! Catalog client trait (§6.1) and a static in-memory implementation used
//! in tests and for offline job configs.

use async_trait::async_trait;
use mosaic_coverage::RawProduct;

use crate::{CatalogResult, SearchWindow};

/// Query parameters handed out to a catalog implementation, mirroring the
/// ones enumerated in §6.1.
pub type CatalogQuery = SearchWindow;

/// Returns products matching a search window, ordered by acquisition start
/// descending, transparently following pagination.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search(&self, query: &CatalogQuery) -> CatalogResult<Vec<RawProduct>>;
}

/// A catalog client backed by a fixed, in-memory product list — useful for
/// tests and for jobs whose AOI never changes.
pub struct StaticCatalogClient {
    products: Vec<RawProduct>,
}

impl StaticCatalogClient {
    pub fn new(products: Vec<RawProduct>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CatalogClient for StaticCatalogClient {
    async fn search(&self, query: &CatalogQuery) -> CatalogResult<Vec<RawProduct>> {
        let mut matched: Vec<RawProduct> = self
            .products
            .iter()
            .filter(|p| p.sensing_date >= query.start && p.sensing_date <= query.end)
            .filter(|p| p.cloud_cover.unwrap_or(0.0) <= query.max_cloud_cover)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.sensing_date.cmp(&a.sensing_date));
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn product(name: &str, cloud: f64, date: chrono::DateTime<Utc>) -> RawProduct {
        RawProduct {
            id: name.into(),
            name: name.into(),
            content_length: 700 * 1024 * 1024,
            sensing_date: date,
            footprint_proj: None,
            cloud_cover: Some(cloud),
            product_type: "S2MSI2A".into(),
        }
    }

    #[tokio::test]
    async fn filters_by_date_and_cloud_cover() {
        let in_range = product("in", 10.0, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
        let too_cloudy = product("cloudy", 90.0, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
        let out_of_range = product("old", 10.0, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let client = StaticCatalogClient::new(vec![in_range, too_cloudy, out_of_range]);

        let query = SearchWindow::new(
            "SRID=4326;POLYGON((0 0,1 0,1 1,0 1,0 0))",
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap(),
            50.0,
            mosaic_coverage::ProductLevel::L2A,
        );

        let results = client.search(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "in");
    }
}
