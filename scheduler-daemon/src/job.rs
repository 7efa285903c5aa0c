//! Single-job execution: AOI load → catalog search → coverage selection →
//! download, with the propagation policy of §7 (per-product failures
//! collected, job never aborts mid-selection).

use std::sync::Arc;

use chrono::Utc;
use geo::Centroid;
use mosaic_catalog::{CatalogClient, Downloader, ProductMetadata, SearchWindow};
use mosaic_config::job::SelectionStrategy;
use mosaic_config::JobConfig;
use mosaic_coverage::select::{self, Selection};
use mosaic_coverage::{filter::FilterParams, scorer::ScoreWeights, strategy::Strategy, CostWeights, ProductLevel};
use tracing::{error, info, warn};

use crate::aoi;

#[derive(Debug)]
pub struct JobResult {
    pub job_name: String,
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
}

pub struct JobRunner {
    pub catalog: Arc<dyn CatalogClient>,
    pub downloader: Arc<dyn Downloader>,
}

impl JobRunner {
    pub fn new(catalog: Arc<dyn CatalogClient>, downloader: Arc<dyn Downloader>) -> Self {
        Self { catalog, downloader }
    }

    pub async fn run(&self, job: &JobConfig) -> JobResult {
        match self.run_inner(job).await {
            Ok(result) => result,
            Err(e) => {
                error!(job = job.name, error = %e, "job failed before selection could run");
                JobResult {
                    job_name: job.name.clone(),
                    success: false,
                    message: e.to_string(),
                    errors: vec![e.to_string()],
                }
            }
        }
    }

    async fn run_inner(&self, job: &JobConfig) -> anyhow::Result<JobResult> {
        // The AOI file and the catalog both speak EPSG:4326 degrees; the
        // search window is built straight from that, then both the AOI and
        // every returned footprint are reprojected together into one local
        // metric plane before any area/coverage math runs on them.
        let aoi_deg = aoi::load_aoi(&job.aoi_path)?;
        let product_level = to_coverage_product_level(job.filters.product_level);

        let (start, end) = job.date_range.resolve_dates(Utc::now())?;
        let aoi_wkt = aoi_wkt_text(&aoi_deg);
        let window = SearchWindow::new(aoi_wkt, start, end, job.filters.max_cloud_cover, product_level);

        let mut raw_products = self.catalog.search(&window).await?;
        if raw_products.is_empty() {
            info!(job = job.name, "catalog search returned zero products");
            return Ok(JobResult {
                job_name: job.name.clone(),
                success: true,
                message: "no products matched the search window".to_string(),
                errors: Vec::new(),
            });
        }

        let origin = aoi_deg
            .centroid()
            .ok_or_else(|| anyhow::anyhow!("AOI {} has no centroid, cannot establish a projection origin", job.aoi_path))?;
        let aoi_footprint = mosaic_geometry::project_to_local_meters(&aoi_deg, origin);
        for product in &mut raw_products {
            product.footprint_proj = product
                .footprint_proj
                .take()
                .map(|fp| mosaic_geometry::project_to_local_meters(&fp, origin));
        }

        let range_center = start + (end - start) / 2;
        let params = build_select_params(job);

        let selection = select::select_covering_products(raw_products, &aoi_footprint, range_center, &params);

        let (selected_names, coverage_message) = match selection {
            Ok(Selection::Plain(products)) => {
                let names: Vec<(String, String, f64, f64, f64)> = products
                    .into_iter()
                    .map(|p| (p.id, p.name, p.cloud_cover_pct, p.quality_score, p.aoi_coverage_pct))
                    .collect();
                (names, "resolved via plain selection strategy".to_string())
            }
            Ok(Selection::Coverage { result, products }) => {
                let message = format!(
                    "coverage solver selected {} products, coverage_fraction={:.3}",
                    result.num_selected, result.coverage_fraction
                );
                let names: Vec<(String, String, f64, f64, f64)> = result
                    .selected_indices
                    .iter()
                    .filter_map(|&i| products.get(i))
                    .map(|p| (p.id.clone(), p.name.clone(), p.cloud_cover_pct, p.quality_score, p.aoi_coverage_pct))
                    .collect();
                (names, message)
            }
            Err(e) => {
                warn!(job = job.name, error = %e, "selection failed");
                return Ok(JobResult {
                    job_name: job.name.clone(),
                    success: false,
                    message: e.to_string(),
                    errors: vec![e.to_string()],
                });
            }
        };

        let mut errors = Vec::new();
        let mut downloaded = 0usize;
        for (odata_id, name, cloud_cover, quality_score, aoi_coverage) in &selected_names {
            let output_dir = std::path::Path::new(&job.output_dir);
            match self.downloader.download(odata_id, name, output_dir).await {
                Ok(()) => {
                    let metadata = ProductMetadata {
                        product_name: name.clone(),
                        odata_id: odata_id.clone(),
                        cloud_cover_percentage: *cloud_cover,
                        retrieved_at: Utc::now(),
                        quality_score: *quality_score,
                        aoi_coverage_percentage: *aoi_coverage,
                    };
                    if let Err(e) = metadata.write_to(output_dir.join(name)) {
                        errors.push(format!("{name}: failed to write metadata.json: {e}"));
                    }
                    downloaded += 1;
                }
                Err(e) => {
                    errors.push(format!("{name}: {e}"));
                }
            }
        }

        let success = selected_names.is_empty() || downloaded > 0;
        let message = if selected_names.is_empty() {
            coverage_message
        } else {
            format!("downloaded {downloaded}/{} selected products", selected_names.len())
        };

        Ok(JobResult {
            job_name: job.name.clone(),
            success,
            message,
            errors,
        })
    }
}

/// Builds the `SRID=4326` WKT the catalog query expects. `aoi` must still be
/// in EPSG:4326 degrees here — call this before reprojecting to local
/// meters, or the coordinates will be meter-scale under a degrees label.
fn aoi_wkt_text(aoi: &mosaic_geometry::Footprint) -> String {
    let rect = mosaic_geometry::bounding_rect(aoi);
    match rect {
        Some(r) => format!(
            "SRID=4326;POLYGON(({} {},{} {},{} {},{} {},{} {}))",
            r.min().x,
            r.min().y,
            r.max().x,
            r.min().y,
            r.max().x,
            r.max().y,
            r.min().x,
            r.max().y,
            r.min().x,
            r.min().y,
        ),
        None => "SRID=4326;POLYGON EMPTY".to_string(),
    }
}

fn build_select_params(job: &JobConfig) -> select::SelectParams {
    let auto = &job.auto_select;
    let strategy = match auto.strategy {
        SelectionStrategy::BestN => Strategy::BestN {
            n: auto.max_products as usize,
        },
        SelectionStrategy::AllAboveThreshold => Strategy::AllAboveThreshold {
            min_quality: auto.quality_threshold,
        },
        SelectionStrategy::BestPerWeek => Strategy::BestPerWeek,
        SelectionStrategy::CoverageGreedy => Strategy::CoverageGreedy {
            min_coverage_fraction: auto.min_coverage_fraction,
        },
        SelectionStrategy::CoverageOptimal => Strategy::CoverageOptimal {
            min_coverage_fraction: auto.min_coverage_fraction,
        },
    };

    select::SelectParams {
        filter: FilterParams {
            max_cloud: job.filters.max_cloud_cover,
            min_aoi_coverage_pct: job.filters.min_aoi_coverage,
            min_content_length_bytes: FilterParams::default().min_content_length_bytes,
            product_level: to_coverage_product_level(job.filters.product_level),
        },
        score_weights: ScoreWeights {
            w_aoi: auto.aoi_coverage_weight,
            w_cloud: auto.cloud_cover_weight,
            w_recency: auto.recency_weight,
        },
        strategy,
        cost_weights: CostWeights {
            cloud_weight: auto.coverage_cloud_weight,
            quality_weight: auto.coverage_quality_weight,
        },
        milp_time_limit_seconds: Some(auto.solver_timeout_seconds),
        fallback_n: auto.max_products as usize,
    }
}

fn to_coverage_product_level(level: mosaic_config::job::ProductLevel) -> ProductLevel {
    match level {
        mosaic_config::job::ProductLevel::L1C => ProductLevel::L1C,
        mosaic_config::job::ProductLevel::L2A => ProductLevel::L2A,
    }
}
