//! AOI loading: a job's `aoi_path` points at a GeoJSON file holding a
//! single polygon or multipolygon. GeoJSON is always EPSG:4326 (lon/lat
//! degrees) per RFC 7946 — the caller reprojects into a local metric plane
//! via [`mosaic_geometry::project_to_local_meters`] before running the
//! coverage pipeline.

use anyhow::{anyhow, Context, Result};
use mosaic_geometry::Footprint;

pub fn load_aoi(path: &str) -> Result<Footprint> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading AOI file {path}"))?;
    let geojson: geojson::GeoJson = text.parse().with_context(|| format!("parsing GeoJSON in {path}"))?;

    let geometry = match geojson {
        geojson::GeoJson::Geometry(g) => g,
        geojson::GeoJson::Feature(f) => f
            .geometry
            .ok_or_else(|| anyhow!("feature in {path} has no geometry"))?,
        geojson::GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .find_map(|f| f.geometry)
            .ok_or_else(|| anyhow!("feature collection in {path} has no geometries"))?,
    };

    let geo_geometry: geo::Geometry<f64> = geometry
        .try_into()
        .map_err(|e| anyhow!("{path} geometry is not a usable polygon/multipolygon: {e}"))?;

    match geo_geometry {
        geo::Geometry::Polygon(p) => Ok(mosaic_geometry::from_polygon(p)),
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        other => Err(anyhow!("{path} geometry type {other:?} is not a polygon")),
    }
}
