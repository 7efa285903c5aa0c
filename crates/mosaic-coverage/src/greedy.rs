//! Weighted greedy set-cover solver (§4.5): repeatedly pick the candidate
//! with the best marginal-gain/cost ratio until the coverage target is met
//! or no candidate can add anything.
//!
//! Returns positions into `instance.coverage_sets`, not original catalog
//! indices — `select::select_covering_products` remaps those after the
//! solve via `ProcessedProduct::index`.

use std::collections::HashSet;
use std::time::Instant;

use crate::{CoverageInstance, CoverageResult, SolverType};

pub fn solve(instance: &CoverageInstance) -> CoverageResult {
    let start = Instant::now();
    let num_candidates = instance.coverage_sets.len();
    let num_points = instance.sample_points.len();
    let target = ((num_points as f64) * instance.min_coverage_fraction).floor() as usize;

    let mut covered: HashSet<usize> = HashSet::new();
    let mut selected: Vec<usize> = Vec::new();
    let mut remaining: Vec<usize> = (0..num_candidates).collect();

    let max_iterations = num_candidates.min(num_points.max(1));

    for _ in 0..max_iterations {
        if covered.len() >= target {
            break;
        }

        let mut best_idx: Option<usize> = None;
        let mut best_ratio = 0.0_f64;
        let mut best_gain = 0usize;

        for &j in &remaining {
            let gain = instance.coverage_sets[j].difference(&covered).count();
            if gain == 0 {
                continue;
            }
            let cost = instance.candidate_costs.get(j).copied().unwrap_or(1.0);
            let ratio = gain as f64 / cost;
            if ratio > best_ratio || (ratio == best_ratio && best_idx.map_or(true, |b| j < b)) {
                best_ratio = ratio;
                best_idx = Some(j);
                best_gain = gain;
            }
        }

        let Some(chosen) = best_idx else {
            break;
        };
        if best_gain == 0 {
            break;
        }

        covered.extend(instance.coverage_sets[chosen].iter().copied());
        selected.push(chosen);
        remaining.retain(|&j| j != chosen);
    }

    let coverage_fraction = if num_points == 0 {
        0.0
    } else {
        covered.len() as f64 / num_points as f64
    };

    CoverageResult::new(
        selected,
        coverage_fraction,
        instance.aoi_area_m2,
        num_candidates,
        SolverType::Greedy,
        Some(start.elapsed().as_secs_f64()),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
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
    fn full_coverage_reaches_target() {
        let sets = vec![
            HashSet::from([0, 1, 2]),
            HashSet::from([3, 4]),
        ];
        let inst = instance(sets, 5, 1.0);
        let result = solve(&inst);
        assert!((result.coverage_fraction - 1.0).abs() < 1e-9);
        assert_eq!(result.selected_indices.len(), 2);
    }

    #[test]
    fn stops_when_no_candidate_adds_gain() {
        let sets = vec![HashSet::from([0]), HashSet::from([0])];
        let inst = instance(sets, 3, 1.0);
        let result = solve(&inst);
        assert_eq!(result.selected_indices, vec![0]);
        assert!(result.coverage_fraction < 1.0);
    }

    #[test]
    fn ties_break_to_lower_index() {
        let sets = vec![HashSet::from([0, 1]), HashSet::from([2, 3])];
        let inst = instance(sets, 4, 0.4);
        let result = solve(&inst);
        assert_eq!(result.selected_indices[0], 0);
    }

    #[test]
    fn empty_candidate_set_yields_zero_coverage() {
        let inst = instance(vec![], 4, 1.0);
        let result = solve(&inst);
        assert!(result.selected_indices.is_empty());
        assert_eq!(result.coverage_fraction, 0.0);
    }

    proptest! {
        /// §8: for any coverage instance, the greedy solver never selects a
        /// candidate twice or out of range, and always reports a coverage
        /// fraction in [0, 1] — regardless of how the coverage sets overlap.
        #[test]
        fn selection_is_valid_and_coverage_is_bounded(
            sets_raw in prop::collection::vec(prop::collection::vec(0usize..8, 0..4), 0..6),
            min_fraction in 0.0f64..1.0,
        ) {
            let num_candidates = sets_raw.len();
            let sets: Vec<HashSet<usize>> = sets_raw.into_iter().map(|v| v.into_iter().collect()).collect();
            let inst = instance(sets, 8, min_fraction);
            let result = solve(&inst);

            let mut seen = HashSet::new();
            for &idx in &result.selected_indices {
                prop_assert!(idx < num_candidates);
                prop_assert!(seen.insert(idx), "greedy selected the same candidate twice");
            }
            prop_assert_eq!(result.num_selected, result.selected_indices.len());
            prop_assert!(result.coverage_fraction >= 0.0 && result.coverage_fraction <= 1.0 + 1e-9);
        }
    }
}
