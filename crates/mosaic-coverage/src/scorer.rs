//! Quality scorer (§4.2): a convex combination of AOI coverage, cloud cover,
//! and recency, each normalized to [0, 1].

use serde::{Deserialize, Serialize};

use crate::ProcessedProduct;

/// Weights for the three scoring terms. Must sum to 1.0 (callers validate
/// this at config-load time; the scorer itself just computes).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub w_aoi: f64,
    pub w_cloud: f64,
    pub w_recency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            w_aoi: 0.4,
            w_cloud: 0.4,
            w_recency: 0.2,
        }
    }
}

/// Score a single product in place, given the maximum date-diff observed
/// across the candidate batch (`max_dd`). `max_dd == 0` means every
/// candidate is equidistant from the requested date, so the recency term
/// is defined to be 1.0 for all of them rather than dividing by zero.
pub fn score_product(product: &mut ProcessedProduct, weights: &ScoreWeights, max_dd: i64) {
    let aoi_term = (product.aoi_coverage_pct / 100.0).clamp(0.0, 1.0);
    let cloud_term = (1.0 - product.cloud_cover_pct / 100.0).clamp(0.0, 1.0);
    let recency_term = if max_dd == 0 {
        1.0
    } else {
        (1.0 - product.date_diff_days as f64 / max_dd as f64).clamp(0.0, 1.0)
    };

    let score = weights.w_aoi * aoi_term + weights.w_cloud * cloud_term + weights.w_recency * recency_term;
    product.quality_score = score.clamp(0.0, 1.0);
}

/// Score every product in a batch, deriving `max_dd` from the batch itself.
pub fn score_all(products: &mut [ProcessedProduct], weights: &ScoreWeights) {
    let max_dd = products.iter().map(|p| p.date_diff_days).max().unwrap_or(0);
    for product in products.iter_mut() {
        score_product(product, weights, max_dd);
    }
}
