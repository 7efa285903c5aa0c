//! Top-level orchestration (§4): filter → score → strategy dispatch →
//! (for coverage strategies) sample → build matrix → solve, with the
//! fallback and error-sink behavior described in §4.7 and §7.

use chrono::{DateTime, Utc};
use mosaic_geometry::Footprint;
use tracing::{info, warn};

use crate::{
    filter::{self, FilterParams},
    greedy, matrix, milp, sampler,
    scorer::{self, ScoreWeights},
    strategy::{self, Strategy},
    state::RunState,
    CostWeights, CoverageError, CoverageInstance, CoverageResult, ProcessedProduct, RawProduct, Result,
};

/// Outcome of a selection run: either a plain ranked list (best_n,
/// all_above_threshold, best_per_week) or a coverage-optimized result.
#[derive(Debug)]
pub enum Selection {
    Plain(Vec<ProcessedProduct>),
    Coverage {
        result: CoverageResult,
        /// The scored batch the solver ran over, so callers can resolve
        /// `result.selected_indices` back to concrete products.
        products: Vec<ProcessedProduct>,
    },
}

pub struct SelectParams {
    pub filter: FilterParams,
    pub score_weights: ScoreWeights,
    pub strategy: Strategy,
    pub cost_weights: CostWeights,
    pub milp_time_limit_seconds: Option<f64>,
    /// Fallback `n` used if a coverage strategy's preconditions fail.
    pub fallback_n: usize,
}

pub fn select_covering_products(
    raw: Vec<RawProduct>,
    aoi: &Footprint,
    requested_range_center: DateTime<Utc>,
    params: &SelectParams,
) -> Result<Selection> {
    let mut state = RunState::Init;

    let aoi_area_m2 = mosaic_geometry::area_m2(aoi);
    let mut processed = filter::filter_candidates(raw, aoi, aoi_area_m2, requested_range_center, &params.filter);
    state = RunState::Filtered;

    if processed.is_empty() {
        warn!("no candidates survived the filter");
        return Err(CoverageError::NoCandidates);
    }

    scorer::score_all(&mut processed, &params.score_weights);
    state = RunState::Scored;
    info!(state = ?state, candidates = processed.len(), "scored candidate batch");

    if let Some(plain) = strategy::select_plain(&processed, &params.strategy) {
        state = RunState::TerminalPlain;
        info!(state = ?state, "resolved via plain strategy");
        return Ok(Selection::Plain(plain));
    }

    let Strategy::CoverageGreedy { min_coverage_fraction } | Strategy::CoverageOptimal { min_coverage_fraction } =
        params.strategy
    else {
        unreachable!("select_plain only returns None for coverage strategies")
    };

    if aoi_area_m2 <= 0.0 {
        warn!("AOI has zero area, cannot run coverage strategy");
        return Err(CoverageError::MissingAoi);
    }

    state = RunState::Sampling;
    let spacing = sampler::default_spacing(aoi_area_m2);
    let sample_points = sampler::sample_grid(aoi, spacing);

    if sample_points.is_empty() {
        let fallback = strategy::fallback_to_best_n(&processed, params.fallback_n, "no sample points in AOI");
        state = RunState::NoSamplePoints;
        warn!(state = ?state, "falling back to best_n after empty sampling");
        return Ok(Selection::Plain(fallback));
    }

    let footprints: Vec<Footprint> = processed.iter().map(|p| p.footprint_proj.clone()).collect();
    let coverage_sets = matrix::build_coverage_matrix(&sample_points, &footprints);
    state = RunState::MatrixBuilt;

    let candidate_costs: Vec<f64> = processed
        .iter()
        .map(|p| params.cost_weights.cost_of(p.cloud_cover_pct, p.quality_score))
        .collect();

    let instance = CoverageInstance {
        sample_points,
        coverage_sets,
        candidate_costs,
        aoi_area_m2,
        min_coverage_fraction,
        cost_weights: params.cost_weights,
    };

    state = RunState::Solving;
    let mut result = match params.strategy {
        Strategy::CoverageGreedy { .. } => greedy::solve(&instance),
        Strategy::CoverageOptimal { .. } => match milp::solve(&instance, params.milp_time_limit_seconds) {
            Some(result) => result,
            None => {
                warn!("MILP solver unavailable or failed, falling back to greedy");
                greedy::solve(&instance)
            }
        },
        _ => unreachable!(),
    };

    // Solvers work over positions into `processed`/`coverage_sets`; remap to
    // the original catalog indices the spec requires before this leaves the
    // crate (§3 CoverageResult.selected_indices).
    result.selected_indices = result.selected_indices.iter().map(|&j| processed[j].index).collect();

    state = RunState::Done;
    info!(state = ?state, selected = result.num_selected, coverage = result.coverage_fraction, "selection complete");

    Ok(Selection::Coverage { result, products: processed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use geo::polygon;
    use mosaic_geometry::from_polygon;

    fn square(minx: f64, miny: f64, side: f64) -> Footprint {
        from_polygon(polygon![
            (x: minx, y: miny),
            (x: minx + side, y: miny),
            (x: minx + side, y: miny + side),
            (x: minx, y: miny + side),
            (x: minx, y: miny),
        ])
    }

    fn raw(name: &str, footprint: Footprint, cloud: f64) -> RawProduct {
        RawProduct {
            id: name.into(),
            name: name.into(),
            content_length: 700 * 1024 * 1024,
            sensing_date: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            footprint_proj: Some(footprint),
            cloud_cover: Some(cloud),
            product_type: "S2MSI2A".into(),
        }
    }

    fn default_params(strategy: Strategy) -> SelectParams {
        SelectParams {
            filter: FilterParams::default(),
            score_weights: ScoreWeights::default(),
            strategy,
            cost_weights: CostWeights {
                cloud_weight: 0.5,
                quality_weight: 0.5,
            },
            milp_time_limit_seconds: Some(2.0),
            fallback_n: 3,
        }
    }

    #[test]
    fn no_candidates_is_an_error() {
        let aoi = square(0.0, 0.0, 1000.0);
        let result = select_covering_products(
            vec![],
            &aoi,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            &default_params(Strategy::BestN { n: 1 }),
        );
        assert!(matches!(result, Err(CoverageError::NoCandidates)));
    }

    #[test]
    fn best_n_strategy_returns_plain_selection() {
        let aoi = square(0.0, 0.0, 1000.0);
        let raw_products = vec![raw("p1", square(0.0, 0.0, 1000.0), 5.0)];
        let result = select_covering_products(
            raw_products,
            &aoi,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            &default_params(Strategy::BestN { n: 1 }),
        )
        .unwrap();
        assert!(matches!(result, Selection::Plain(_)));
    }

    #[test]
    fn coverage_result_indices_are_remapped_to_original_catalog_index() {
        let aoi = square(0.0, 0.0, 1000.0);
        // The first raw product is dropped by the cloud filter, so the
        // surviving candidate's position (0) must not leak into the result —
        // it should be remapped back to its original catalog index (1).
        let raw_products = vec![
            raw("too-cloudy", square(0.0, 0.0, 1000.0), 99.0),
            raw("p1", square(0.0, 0.0, 1000.0), 5.0),
        ];
        let mut params = default_params(Strategy::CoverageGreedy { min_coverage_fraction: 0.9 });
        params.filter.max_cloud = 50.0;
        let result = select_covering_products(
            raw_products,
            &aoi,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            &params,
        )
        .unwrap();
        match result {
            Selection::Coverage { result, .. } => assert_eq!(result.selected_indices, vec![1]),
            Selection::Plain(_) => panic!("expected coverage result"),
        }
    }

    #[test]
    fn coverage_greedy_runs_solver() {
        let aoi = square(0.0, 0.0, 1000.0);
        let raw_products = vec![raw("p1", square(0.0, 0.0, 1000.0), 5.0)];
        let result = select_covering_products(
            raw_products,
            &aoi,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            &default_params(Strategy::CoverageGreedy { min_coverage_fraction: 0.9 }),
        )
        .unwrap();
        match result {
            Selection::Coverage { result, .. } => assert!(result.coverage_fraction > 0.0),
            Selection::Plain(_) => panic!("expected coverage result"),
        }
    }
}
