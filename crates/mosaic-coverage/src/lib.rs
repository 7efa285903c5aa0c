//! Coverage optimization engine for the satellite image mosaic selection
//! problem (SIMSP): candidate filtering, quality scoring, strategy
//! dispatch, grid sampling, coverage-matrix construction, and the greedy
//! and MILP set-cover solvers.
//!
//! Single-threaded and synchronous by design (§5 of the spec this crate
//! implements) — callers that need concurrency (a job scheduler running
//! several AOIs) own that responsibility; this crate never spawns threads
//! or performs I/O beyond logging.

use chrono::{DateTime, Utc};
use mosaic_geometry::Footprint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod filter;
pub mod greedy;
pub mod matrix;
pub mod milp;
pub mod sampler;
pub mod scorer;
pub mod select;
pub mod state;
pub mod strategy;

pub use filter::{FilterParams, ProductLevel};
pub use scorer::ScoreWeights;
pub use strategy::Strategy;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("no candidates available for selection")]
    NoCandidates,
    #[error("AOI sampling produced no interior grid points")]
    NoSamplePoints,
    #[error("AOI geometry or area is unavailable for a coverage strategy")]
    MissingAoi,
    #[error("MILP solver unavailable or failed, and greedy fallback also failed")]
    SolverUnavailable,
}

pub type Result<T> = std::result::Result<T, CoverageError>;

/// A raw product record as handed off by the catalog client (§6.1). The
/// catalog always reports footprints in EPSG:4326 degrees; reprojecting
/// both the AOI and every candidate footprint into one local metric plane
/// happens once, by the caller, immediately before candidates reach this
/// crate — `filter_candidates` and everything downstream assume `footprint_proj`
/// is already in that shared planar CRS.
#[derive(Debug, Clone)]
pub struct RawProduct {
    pub id: String,
    pub name: String,
    pub content_length: u64,
    pub sensing_date: DateTime<Utc>,
    pub footprint_proj: Option<Footprint>,
    pub cloud_cover: Option<f64>,
    pub product_type: String,
}

/// A product that has survived the candidate filter, enriched with
/// geometric and quality metadata (§4.1–4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedProduct {
    /// Stable index into the original raw product list.
    pub index: usize,
    pub id: String,
    pub name: String,
    pub cloud_cover_pct: f64,
    pub aoi_coverage_pct: f64,
    pub date_diff_days: i64,
    pub sensing_date: DateTime<Utc>,
    pub content_length: u64,
    #[serde(skip)]
    pub footprint_proj: Footprint,
    /// Populated by the quality scorer; 0 until then.
    pub quality_score: f64,
}

/// Relative weighting of cloud cover vs. quality score in the greedy/MILP
/// cost function (§4.5 step 2), distinct from the quality-score weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostWeights {
    pub cloud_weight: f64,
    pub quality_weight: f64,
}

impl CostWeights {
    pub fn cost_of(&self, cloud_cover_pct: f64, quality_score: f64) -> f64 {
        let raw = self.cloud_weight * (cloud_cover_pct / 100.0) + self.quality_weight * (1.0 - quality_score);
        raw.max(0.01)
    }
}

/// Immutable bundle handed to a solver (§3 CoverageInstance).
pub struct CoverageInstance {
    pub sample_points: Vec<geo::Point<f64>>,
    pub coverage_sets: Vec<std::collections::HashSet<usize>>,
    /// Per-candidate cost, precomputed by the caller via
    /// [`CostWeights::cost_of`] from each candidate's cloud cover and
    /// quality score. Indexed the same as `coverage_sets`.
    pub candidate_costs: Vec<f64>,
    pub aoi_area_m2: f64,
    pub min_coverage_fraction: f64,
    pub cost_weights: CostWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverType {
    Greedy,
    Milp,
}

/// Result of a coverage run (§3 CoverageResult).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Original catalog indices (`ProcessedProduct::index`) of the chosen
    /// candidates, not positions into the filtered/scored batch a solver
    /// ran over — `select::select_covering_products` remaps before this
    /// result leaves the crate.
    pub selected_indices: Vec<usize>,
    pub coverage_fraction: f64,
    pub uncovered_area_m2: f64,
    pub num_candidates: usize,
    pub num_selected: usize,
    pub solver_type: SolverType,
    pub solver_time_seconds: Option<f64>,
    pub optimal: Option<bool>,
}

impl CoverageResult {
    pub fn new(
        selected_indices: Vec<usize>,
        coverage_fraction: f64,
        aoi_area_m2: f64,
        num_candidates: usize,
        solver_type: SolverType,
        solver_time_seconds: Option<f64>,
        optimal: Option<bool>,
    ) -> Self {
        let num_selected = selected_indices.len();
        Self {
            selected_indices,
            coverage_fraction,
            uncovered_area_m2: (1.0 - coverage_fraction) * aoi_area_m2,
            num_candidates,
            num_selected,
            solver_type,
            solver_time_seconds,
            optimal,
        }
    }
}
