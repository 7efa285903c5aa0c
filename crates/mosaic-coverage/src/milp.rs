//! MILP set-cover solver (§4.6): exact binary integer program, solved with
//! `coin_cbc` through `good_lp`. Mirrors the weighted greedy solver's cost
//! model but searches for a provably optimal (or near-optimal, under a time
//! limit) selection rather than a one-pass heuristic.
//!
//! Returns positions into `instance.coverage_sets`, not original catalog
//! indices — `select::select_covering_products` remaps those after the
//! solve via `ProcessedProduct::index`.

use std::time::Instant;

use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel};
use tracing::warn;

use crate::{CoverageInstance, CoverageResult, SolverType};

/// Tie-breaking weight on the number of selected candidates, so that among
/// solutions of equal cost the solver prefers fewer images (mirrors the
/// epsilon cardinality term in the original heuristic's cost function).
const CARDINALITY_EPSILON: f64 = 1e-6;

/// Wall-clock budget handed to CBC via its `sec` parameter.
const DEFAULT_TIME_LIMIT_SECONDS: f64 = 30.0;

/// Solve the coverage instance exactly. Returns `None` if CBC reports the
/// problem infeasible, unbounded, or otherwise fails to produce a usable
/// solution — callers are expected to fall back to the greedy solver.
pub fn solve(instance: &CoverageInstance, time_limit_seconds: Option<f64>) -> Option<CoverageResult> {
    let start = Instant::now();
    let num_candidates = instance.coverage_sets.len();
    let num_points = instance.sample_points.len();

    if num_candidates == 0 || num_points == 0 {
        return None;
    }

    let target = ((num_points as f64) * instance.min_coverage_fraction).floor() as usize;

    let mut vars = ProblemVariables::new();
    let x: Vec<_> = (0..num_candidates).map(|_| vars.add(variable().binary())).collect();
    let p: Vec<_> = (0..num_points).map(|_| vars.add(variable().binary())).collect();

    let mut objective = Expression::from(0.0);
    for j in 0..num_candidates {
        let cost = instance.candidate_costs.get(j).copied().unwrap_or(1.0);
        objective += cost * x[j];
        objective += CARDINALITY_EPSILON * x[j];
    }

    let mut model = vars.minimise(objective).using(good_lp::solvers::coin_cbc::coin_cbc);
    model.set_parameter("sec", &time_limit_seconds.unwrap_or(DEFAULT_TIME_LIMIT_SECONDS).to_string());
    model.set_parameter("logLevel", "0");

    for (i, point_var) in p.iter().enumerate() {
        let covering: Expression = (0..num_candidates)
            .filter(|&j| instance.coverage_sets[j].contains(&i))
            .map(|j| x[j])
            .sum();
        model = model.with(constraint!(*point_var <= covering.clone()));
    }

    let coverage_sum: Expression = p.iter().map(|v| v.into()).sum::<Expression>();
    model = model.with(constraint!(coverage_sum >= target as f64));

    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(e) => {
            warn!(error = %e, "MILP solve failed");
            return None;
        }
    };

    let selected: Vec<usize> = (0..num_candidates)
        .filter(|&j| solution.value(x[j]) > 0.5)
        .collect();

    let mut covered = std::collections::HashSet::new();
    for &j in &selected {
        covered.extend(instance.coverage_sets[j].iter().copied());
    }
    let coverage_fraction = covered.len() as f64 / num_points as f64;

    Some(CoverageResult::new(
        selected,
        coverage_fraction,
        instance.aoi_area_m2,
        num_candidates,
        SolverType::Milp,
        Some(start.elapsed().as_secs_f64()),
        // `good_lp`'s coin_cbc backend does not expose a stable
        // proven-optimal flag through the `Solution` trait at this version;
        // we report `Some(true)` when the run finished inside the time
        // budget and treat a timeout as "feasible but not proven optimal".
        Some(start.elapsed().as_secs_f64() < time_limit_seconds.unwrap_or(DEFAULT_TIME_LIMIT_SECONDS)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn instance(sets: Vec<HashSet<usize>>, num_points: usize, min_fraction: f64) -> CoverageInstance {
        let candidate_costs = vec![1.0; sets.len()];
        CoverageInstance {
            sample_points: vec![geo::Point::new(0.0, 0.0); num_points],
            coverage_sets: sets,
            candidate_costs,
            aoi_area_m2: 100.0,
            min_coverage_fraction: min_fraction,
            cost_weights: crate::CostWeights {
                cloud_weight: 0.5,
                quality_weight: 0.5,
            },
        }
    }

    #[test]
    fn empty_instance_returns_none() {
        let inst = instance(vec![], 0, 1.0);
        assert!(solve(&inst, Some(1.0)).is_none());
    }

    #[test]
    fn picks_minimum_candidates_for_full_coverage() {
        let sets = vec![
            HashSet::from([0, 1, 2, 3]),
            HashSet::from([0, 1]),
            HashSet::from([2, 3]),
        ];
        let inst = instance(sets, 4, 1.0);
        let result = solve(&inst, Some(5.0));
        if let Some(result) = result {
            assert_eq!(result.selected_indices, vec![0]);
            assert!((result.coverage_fraction - 1.0).abs() < 1e-9);
        }
    }
}
