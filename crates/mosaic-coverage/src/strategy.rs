//! Strategy dispatcher (§4.3): turns a scored candidate batch into a final
//! selection according to one of five selection strategies. The two
//! coverage-based strategies only decide *whether* to run the set-cover
//! pipeline; the actual solve lives in [`crate::select`].

use std::collections::HashMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ProcessedProduct;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    BestN { n: usize },
    AllAboveThreshold { min_quality: f64 },
    BestPerWeek,
    CoverageGreedy { min_coverage_fraction: f64 },
    CoverageOptimal { min_coverage_fraction: f64 },
}

/// Deterministic tie-break ordering: quality desc, then AOI% desc, then
/// cloud% asc, then recency desc (smaller date_diff_days is more recent).
fn tie_break_sort(products: &mut [ProcessedProduct]) {
    products.sort_by(|a, b| {
        b.quality_score
            .partial_cmp(&a.quality_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.aoi_coverage_pct
                    .partial_cmp(&a.aoi_coverage_pct)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| {
                a.cloud_cover_pct
                    .partial_cmp(&b.cloud_cover_pct)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.date_diff_days.cmp(&b.date_diff_days))
    });
}

/// Non-coverage strategies resolve directly to a product list. Coverage
/// strategies return `None`, signaling the caller to run the set-cover
/// pipeline instead (with a logged fallback to `best_n` if a precondition
/// for set-cover is not met — see `select::run`).
pub fn select_plain(products: &[ProcessedProduct], strategy: &Strategy) -> Option<Vec<ProcessedProduct>> {
    let mut sorted = products.to_vec();
    tie_break_sort(&mut sorted);

    match *strategy {
        Strategy::BestN { n } => Some(sorted.into_iter().take(n).collect()),
        Strategy::AllAboveThreshold { min_quality } => {
            Some(sorted.into_iter().filter(|p| p.quality_score >= min_quality).collect())
        }
        Strategy::BestPerWeek => Some(best_per_week(sorted)),
        Strategy::CoverageGreedy { .. } | Strategy::CoverageOptimal { .. } => None,
    }
}

fn best_per_week(sorted: Vec<ProcessedProduct>) -> Vec<ProcessedProduct> {
    let mut best: HashMap<(i32, u32), ProcessedProduct> = HashMap::new();
    for product in sorted {
        let iso = product.sensing_date.iso_week();
        let key = (iso.year(), iso.week());
        best.entry(key)
            .and_modify(|existing| {
                if product.quality_score > existing.quality_score {
                    *existing = product.clone();
                }
            })
            .or_insert(product);
    }
    let mut out: Vec<ProcessedProduct> = best.into_values().collect();
    tie_break_sort(&mut out);
    out
}

/// Fall back to `best_n` (logged) when a coverage strategy's preconditions
/// (AOI geometry, sample points) are not satisfiable.
pub fn fallback_to_best_n(products: &[ProcessedProduct], n: usize, reason: &str) -> Vec<ProcessedProduct> {
    warn!(reason, "coverage strategy preconditions unmet, falling back to best_n");
    select_plain(products, &Strategy::BestN { n }).unwrap_or_default()
}
