//! Planar 2D geometry adapter.
//!
//! Thin façade over `geo` giving the coverage engine exactly the operations
//! it needs: validity canonicalization, area, bounding box, intersection,
//! multipolygon union, a local-meters reprojection for the catalog's raw
//! EPSG:4326 footprints, and a prepared form for repeated point-in-polygon
//! tests. Everything except [`project_to_local_meters`] operates on an
//! already-planar, meters-unit geometry.

use geo::{
    Area, BooleanOps, BoundingRect, Contains, Coord, MapCoordsInPlace, MultiPolygon, Point, Polygon, Rect, Relate,
};
use thiserror::Error;
use wkt::TryFromWkt;

/// Meters per degree of longitude/latitude at the equator (WGS84 mean
/// radius), used by [`project_to_local_meters`].
const DEGREES_TO_METERS: f64 = 111_320.0;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("invalid WKT: {0}")]
    InvalidWkt(String),
    #[error("geometry is empty")]
    EmptyGeometry,
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),
}

pub type Result<T> = std::result::Result<T, GeometryError>;

/// A footprint (AOI or candidate image) in a projected CRS. Always
/// represented as a `MultiPolygon` since the spec treats a simple polygon as
/// a one-element union; orientation is irrelevant and areas are absolute.
pub type Footprint = MultiPolygon<f64>;

/// Build a footprint from a single polygon.
pub fn from_polygon(polygon: Polygon<f64>) -> Footprint {
    MultiPolygon::new(vec![polygon])
}

/// Parse a footprint from WKT text (`POLYGON(...)` or `MULTIPOLYGON(...)`).
pub fn from_wkt(wkt_str: &str) -> Result<Footprint> {
    let geom = geo::Geometry::<f64>::try_from_wkt_str(wkt_str)
        .map_err(|e| GeometryError::InvalidWkt(e.to_string()))?;
    match geom {
        geo::Geometry::Polygon(p) => Ok(from_polygon(p)),
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        other => Err(GeometryError::UnsupportedGeometryType(format!(
            "{other:?}"
        ))),
    }
}

/// Canonicalize a footprint so it is free of self-intersections.
///
/// Equivalent to a zero-width buffer: unioning a geometry with itself runs
/// it through the boolean-ops overlay, which normalizes ring structure.
/// Idempotent — canonicalizing an already-canonical geometry is a no-op.
pub fn canonicalize(geom: &Footprint) -> Result<Footprint> {
    if geom.0.is_empty() {
        return Err(GeometryError::EmptyGeometry);
    }
    Ok(geom.union(geom))
}

/// Absolute area in square meters (orientation-independent).
pub fn area_m2(geom: &Footprint) -> f64 {
    geom.unsigned_area()
}

/// Axis-aligned bounding box, or `None` for an empty geometry.
pub fn bounding_rect(geom: &Footprint) -> Option<Rect<f64>> {
    geom.bounding_rect()
}

/// Area of `a ∩ b` in square meters.
pub fn intersection_area_m2(a: &Footprint, b: &Footprint) -> f64 {
    a.intersection(b).unsigned_area()
}

/// Union of all footprints in `polys` (empty input yields an empty
/// MultiPolygon).
pub fn union_all<'a>(polys: impl Iterator<Item = &'a Footprint>) -> Footprint {
    polys.fold(MultiPolygon::new(Vec::new()), |acc, p| acc.union(p))
}

/// Reproject a footprint from EPSG:4326 (lon/lat degrees) into an
/// equirectangular local plane centered on `origin`, in meters.
///
/// This is a simplification of the source system's per-AOI UTM-zone
/// detection and `pyproj` transform: a single tangent-plane approximation
/// around the AOI's own centroid, good enough for the AOI sizes this system
/// targets (a single UTM zone's width) without pulling in a full projection
/// library. Callers reproject the AOI and every candidate footprint through
/// the same `origin` so areas and intersections stay comparable.
pub fn project_to_local_meters(geom: &Footprint, origin: Point<f64>) -> Footprint {
    let lat_scale = origin.y().to_radians().cos();
    let mut projected = geom.clone();
    projected.map_coords_in_place(|c| Coord {
        x: (c.x - origin.x()) * DEGREES_TO_METERS * lat_scale,
        y: (c.y - origin.y()) * DEGREES_TO_METERS,
    });
    projected
}

fn rect_contains(rect: Rect<f64>, coord: Coord<f64>) -> bool {
    coord.x >= rect.min().x && coord.x <= rect.max().x && coord.y >= rect.min().y && coord.y <= rect.max().y
}

/// A footprint with its bounding box precomputed once, so repeated `covers`
/// queries pay only the O(1) bbox rejection before falling back to the exact
/// DE-9IM test (§4.4/§4.5 of the spec: "bbox pre-filter is essential for
/// performance").
pub struct PreparedFootprint {
    geom: Footprint,
    bbox: Option<Rect<f64>>,
}

impl PreparedFootprint {
    pub fn new(geom: Footprint) -> Self {
        let bbox = geom.bounding_rect();
        Self { geom, bbox }
    }

    pub fn bbox(&self) -> Option<Rect<f64>> {
        self.bbox
    }

    pub fn geom(&self) -> &Footprint {
        &self.geom
    }

    /// Closed containment ("covers"): true if `point` is inside or on the
    /// boundary of the footprint.
    pub fn covers(&self, point: Point<f64>) -> bool {
        let Some(bbox) = self.bbox else {
            return false;
        };
        if !rect_contains(bbox, point.0) {
            return false;
        }
        self.geom.relate(&point).is_covers() || self.geom.contains(&point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(minx: f64, miny: f64, side: f64) -> Footprint {
        from_polygon(polygon![
            (x: minx, y: miny),
            (x: minx + side, y: miny),
            (x: minx + side, y: miny + side),
            (x: minx, y: miny + side),
            (x: minx, y: miny),
        ])
    }

    #[test]
    fn area_of_unit_square() {
        let sq = square(0.0, 0.0, 10_000.0);
        assert!((area_m2(&sq) - 100_000_000.0).abs() < 1.0);
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let sq = square(0.0, 0.0, 1_000.0);
        let once = canonicalize(&sq).unwrap();
        let twice = canonicalize(&once).unwrap();
        assert!((area_m2(&once) - area_m2(&twice)).abs() < 1e-6);
    }

    #[test]
    fn intersection_of_disjoint_squares_is_zero() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(100.0, 100.0, 10.0);
        assert_eq!(intersection_area_m2(&a, &b), 0.0);
    }

    #[test]
    fn prepared_covers_interior_and_rejects_outside() {
        let sq = square(0.0, 0.0, 10.0);
        let prepared = PreparedFootprint::new(sq);
        assert!(prepared.covers(Point::new(5.0, 5.0)));
        assert!(!prepared.covers(Point::new(50.0, 50.0)));
    }

    #[test]
    fn prepared_covers_boundary_point() {
        let sq = square(0.0, 0.0, 10.0);
        let prepared = PreparedFootprint::new(sq);
        assert!(prepared.covers(Point::new(0.0, 5.0)));
    }

    #[test]
    fn union_all_empty_input_is_empty() {
        let empty = union_all(std::iter::empty());
        assert_eq!(area_m2(&empty), 0.0);
    }

    #[test]
    fn project_to_local_meters_centers_origin_at_zero() {
        let sq = square(-0.01, 50.0, 0.02);
        let origin = Point::new(0.0, 50.01);
        let projected = project_to_local_meters(&sq, origin);
        let rect = bounding_rect(&projected).unwrap();
        assert!(rect.min().x < 0.0 && rect.max().x > 0.0);
        let lat_scale = origin.y().to_radians().cos();
        let expected = area_m2(&sq) * DEGREES_TO_METERS.powi(2) * lat_scale;
        assert!((area_m2(&projected) - expected).abs() / expected < 0.05);
    }

    #[test]
    fn from_wkt_parses_polygon() {
        let wkt_str = "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))";
        let fp = from_wkt(wkt_str).unwrap();
        assert!((area_m2(&fp) - 100.0).abs() < 1e-9);
    }
}
