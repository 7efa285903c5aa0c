//! Coverage matrix builder (§4.5 step 1): for every candidate footprint,
//! determine which sample points it covers.

use std::collections::HashSet;

use geo::Point;
use mosaic_geometry::{Footprint, PreparedFootprint};
use tracing::debug;

/// Build the coverage matrix: `result[j]` is the set of sample-point
/// indices covered by candidate `j`. Bbox rejection happens inside
/// `PreparedFootprint::covers`, so the inner loop only pays for the exact
/// DE-9IM test when the point is already bbox-plausible.
pub fn build_coverage_matrix(
    sample_points: &[Point<f64>],
    footprints: &[Footprint],
) -> Vec<HashSet<usize>> {
    let mut matrix = Vec::with_capacity(footprints.len());

    for (j, footprint) in footprints.iter().enumerate() {
        let prepared = PreparedFootprint::new(footprint.clone());
        let mut covered = HashSet::new();
        for (i, point) in sample_points.iter().enumerate() {
            if prepared.covers(*point) {
                covered.insert(i);
            }
        }
        if j % 10 == 0 {
            debug!(candidate = j, covered = covered.len(), "built coverage row");
        }
        matrix.push(covered);
    }

    matrix
}
