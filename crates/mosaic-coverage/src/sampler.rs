//! Grid sampler (§4.4): lays a regular grid of points over the AOI's
//! bounding box and keeps the ones that fall inside the polygon.

use geo::Point;
use mosaic_geometry::{Footprint, PreparedFootprint};

/// Default grid spacing in meters, derived from AOI area so small AOIs get
/// fine sampling and large ones stay tractable: `clamp(sqrt(area)/100, 50,
/// 200)`.
pub fn default_spacing(aoi_area_m2: f64) -> f64 {
    (aoi_area_m2.max(0.0).sqrt() / 100.0).clamp(50.0, 200.0)
}

/// Sample a regular grid of `spacing`-meter points over `aoi`, keeping only
/// points covered by the polygon. Returns an empty vector if the AOI has no
/// area or the grid is degenerate (spacing larger than the bounding box).
pub fn sample_grid(aoi: &Footprint, spacing: f64) -> Vec<Point<f64>> {
    if spacing <= 0.0 {
        return Vec::new();
    }
    let prepared = PreparedFootprint::new(aoi.clone());
    let Some(bbox) = prepared.bbox() else {
        return Vec::new();
    };

    let mut points = Vec::new();
    let mut y = bbox.min().y;
    while y <= bbox.max().y {
        let mut x = bbox.min().x;
        while x <= bbox.max().x {
            let candidate = Point::new(x, y);
            if prepared.covers(candidate) {
                points.push(candidate);
            }
            x += spacing;
        }
        y += spacing;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use mosaic_geometry::from_polygon;

    fn square(side: f64) -> Footprint {
        from_polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: side, y: 0.0),
            (x: side, y: side),
            (x: 0.0, y: side),
            (x: 0.0, y: 0.0),
        ])
    }

    #[test]
    fn default_spacing_is_clamped() {
        assert_eq!(default_spacing(0.0), 50.0);
        assert_eq!(default_spacing(1_000_000.0 * 1_000_000.0), 200.0);
    }

    #[test]
    fn sample_grid_produces_interior_points() {
        let aoi = square(1_000.0);
        let points = sample_grid(&aoi, 100.0);
        assert!(!points.is_empty());
        assert!(points.len() <= 121);
    }

    #[test]
    fn sample_grid_degenerate_aoi_is_empty() {
        let aoi = Footprint::new(Vec::new());
        let points = sample_grid(&aoi, 100.0);
        assert!(points.is_empty());
    }

    #[test]
    fn sample_grid_spacing_larger_than_aoi_may_yield_no_points() {
        let aoi = square(10.0);
        let points = sample_grid(&aoi, 1_000.0);
        assert!(points.len() <= 1);
    }
}
