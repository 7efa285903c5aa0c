//! Candidate filter (§4.1): turns raw catalog records into
//! [`ProcessedProduct`]s, dropping anything that fails a hard predicate.

use chrono::{DateTime, Utc};
use mosaic_geometry as geom;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ProcessedProduct, RawProduct};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductLevel {
    #[serde(rename = "L1C")]
    L1C,
    #[serde(rename = "L2A")]
    L2A,
}

impl ProductLevel {
    /// The CDSE `productType` attribute value for this level, used both to
    /// filter a batch of raw products and to build a catalog query filter.
    pub fn product_type_code(&self) -> &'static str {
        match self {
            ProductLevel::L1C => "S2MSI1C",
            ProductLevel::L2A => "S2MSI2A",
        }
    }
}

/// Pre-filter predicates (§4.1).
#[derive(Debug, Clone)]
pub struct FilterParams {
    pub max_cloud: f64,
    pub min_aoi_coverage_pct: f64,
    pub min_content_length_bytes: u64,
    pub product_level: ProductLevel,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            max_cloud: 100.0,
            min_aoi_coverage_pct: 0.0,
            // 600 MiB default, per spec.
            min_content_length_bytes: 600 * 1024 * 1024,
            product_level: ProductLevel::L2A,
        }
    }
}

/// Apply the candidate filter to a batch of raw products.
///
/// Errors in any single record (missing/unvalidatable footprint, failed
/// intersection) are logged and the record is skipped — the batch never
/// fails as a whole (§7 propagation policy).
pub fn filter_candidates(
    raw: Vec<RawProduct>,
    aoi: &geom::Footprint,
    aoi_area_m2: f64,
    requested_range_center: DateTime<Utc>,
    params: &FilterParams,
) -> Vec<ProcessedProduct> {
    let mut out = Vec::with_capacity(raw.len());

    for (index, product) in raw.into_iter().enumerate() {
        if product.content_length < params.min_content_length_bytes {
            warn!(
                product = %product.name,
                content_length = product.content_length,
                "dropping product below min_content_length_bytes"
            );
            continue;
        }

        if product.product_type != params.product_level.product_type_code() {
            warn!(
                product = %product.name,
                product_type = %product.product_type,
                expected = params.product_level.product_type_code(),
                "dropping product: wrong product level"
            );
            continue;
        }

        let cloud_cover = product.cloud_cover.unwrap_or(0.0).clamp(0.0, 100.0);
        if cloud_cover > params.max_cloud {
            warn!(product = %product.name, cloud_cover, "dropping product over max_cloud");
            continue;
        }

        let Some(footprint) = product.footprint_proj else {
            warn!(product = %product.name, "dropping product with missing footprint geometry");
            continue;
        };

        let footprint = match geom::canonicalize(&footprint) {
            Ok(f) => f,
            Err(e) => {
                warn!(product = %product.name, error = %e, "dropping product with invalid footprint");
                continue;
            }
        };

        if aoi_area_m2 <= 0.0 {
            warn!(product = %product.name, "dropping product: AOI has zero area");
            continue;
        }

        let aoi_coverage_pct = 100.0 * geom::intersection_area_m2(aoi, &footprint) / aoi_area_m2;
        if aoi_coverage_pct < params.min_aoi_coverage_pct {
            continue;
        }

        let date_diff_days = (product.sensing_date - requested_range_center)
            .num_days()
            .abs();

        out.push(ProcessedProduct {
            index,
            id: product.id,
            name: product.name,
            cloud_cover_pct: cloud_cover,
            aoi_coverage_pct,
            date_diff_days,
            sensing_date: product.sensing_date,
            content_length: product.content_length,
            footprint_proj: footprint,
            quality_score: 0.0,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use geo::polygon;

    fn square(minx: f64, miny: f64, side: f64) -> geom::Footprint {
        geom::from_polygon(polygon![
            (x: minx, y: miny),
            (x: minx + side, y: miny),
            (x: minx + side, y: miny + side),
            (x: minx, y: miny + side),
            (x: minx, y: miny),
        ])
    }

    fn product(name: &str, footprint: Option<geom::Footprint>, cloud: f64, len: u64) -> RawProduct {
        RawProduct {
            id: name.to_string(),
            name: name.to_string(),
            content_length: len,
            sensing_date: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            footprint_proj: footprint,
            cloud_cover: Some(cloud),
            product_type: "S2MSI2A".to_string(),
        }
    }

    #[test]
    fn drops_missing_footprint() {
        let aoi = square(0.0, 0.0, 1000.0);
        let raw = vec![product("p1", None, 5.0, 700 * 1024 * 1024)];
        let out = filter_candidates(
            raw,
            &aoi,
            geom::area_m2(&aoi),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            &FilterParams::default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn drops_cloudy_product() {
        let aoi = square(0.0, 0.0, 1000.0);
        let fp = Some(square(0.0, 0.0, 1000.0));
        let raw = vec![product("p1", fp, 90.0, 700 * 1024 * 1024)];
        let mut params = FilterParams::default();
        params.max_cloud = 50.0;
        let out = filter_candidates(
            raw,
            &aoi,
            geom::area_m2(&aoi),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            &params,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn keeps_valid_full_cover_product() {
        let aoi = square(0.0, 0.0, 1000.0);
        let fp = Some(square(0.0, 0.0, 1000.0));
        let raw = vec![product("p1", fp, 5.0, 700 * 1024 * 1024)];
        let out = filter_candidates(
            raw,
            &aoi,
            geom::area_m2(&aoi),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            &FilterParams::default(),
        );
        assert_eq!(out.len(), 1);
        assert!((out[0].aoi_coverage_pct - 100.0).abs() < 1e-6);
    }

    #[test]
    fn drops_mismatched_product_level() {
        let aoi = square(0.0, 0.0, 1000.0);
        let mut raw = product("p1", Some(square(0.0, 0.0, 1000.0)), 5.0, 700 * 1024 * 1024);
        raw.product_type = "S2MSI1C".to_string();
        let out = filter_candidates(
            vec![raw],
            &aoi,
            geom::area_m2(&aoi),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            &FilterParams::default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn drops_below_min_content_length() {
        let aoi = square(0.0, 0.0, 1000.0);
        let fp = Some(square(0.0, 0.0, 1000.0));
        let raw = vec![product("p1", fp, 5.0, 1024)];
        let out = filter_candidates(
            raw,
            &aoi,
            geom::area_m2(&aoi),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            &FilterParams::default(),
        );
        assert!(out.is_empty());
    }
}
