//! Cron-like job scheduler (§5, §6.4): an explicit work queue bounded by
//! `max_concurrent_jobs`, with per-job instance caps and missed-fire
//! coalescing instead of a hidden event loop.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mosaic_catalog::{CatalogClient, Downloader};
use mosaic_config::SchedulerConfig;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::job::JobRunner;

const TICK_INTERVAL: Duration = Duration::from_secs(5);

struct JobState {
    schedule: cron::Schedule,
    next_fire: chrono::DateTime<Utc>,
    /// Caps concurrent instances of this specific job at `job_max_instances`.
    instance_permits: Arc<Semaphore>,
    /// Set when the job's trigger fires again while at its instance cap;
    /// consumed as a single coalesced re-fire once a slot frees up.
    pending_refire: Arc<AtomicBool>,
}

pub struct Scheduler {
    config: SchedulerConfig,
    runner: Arc<JobRunner>,
    global_permits: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, catalog: Arc<dyn CatalogClient>, downloader: Arc<dyn Downloader>) -> Self {
        let global_permits = Arc::new(Semaphore::new(config.max_concurrent_jobs as usize));
        let runner = Arc::new(JobRunner::new(catalog, downloader));
        Self {
            config,
            runner,
            global_permits,
        }
    }

    /// Run until `shutdown` resolves. Currently-running jobs are allowed to
    /// finish; no new fires are dispatched after shutdown begins.
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()>) {
        let now = Utc::now();
        let mut states: HashMap<String, JobState> = HashMap::new();

        for job in &self.config.jobs {
            if !job.enabled {
                continue;
            }
            let cron_expr = match job.schedule.to_cron() {
                Ok(expr) => expr,
                Err(e) => {
                    error!(job = job.name, error = %e, "skipping job with invalid schedule");
                    continue;
                }
            };
            let six_field = format!("0 {cron_expr}");
            let schedule = match cron::Schedule::from_str(&six_field) {
                Ok(s) => s,
                Err(e) => {
                    error!(job = job.name, error = %e, "skipping job with unparseable cron expression");
                    continue;
                }
            };
            let next_fire = schedule.after(&now).next().unwrap_or(now);
            states.insert(
                job.name.clone(),
                JobState {
                    schedule,
                    next_fire,
                    instance_permits: Arc::new(Semaphore::new(self.config.job_max_instances as usize)),
                    pending_refire: Arc::new(AtomicBool::new(false)),
                },
            );
        }

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no further jobs will be dispatched");
                    break;
                }
                _ = ticker.tick() => {
                    let now = Utc::now();
                    for job in &self.config.jobs {
                        if !job.enabled {
                            continue;
                        }
                        let Some(state) = states.get_mut(&job.name) else { continue };
                        if now < state.next_fire {
                            continue;
                        }
                        state.next_fire = state.schedule.after(&now).next().unwrap_or(now + chrono::Duration::hours(1));
                        self.dispatch(job.clone(), state);
                    }
                }
            }
        }
    }

    fn dispatch(&self, job: mosaic_config::JobConfig, state: &JobState) {
        let instance_permits = state.instance_permits.clone();
        let pending_refire = state.pending_refire.clone();
        let global_permits = self.global_permits.clone();
        let runner = self.runner.clone();
        let job_coalesce = self.config.job_coalesce;

        let Ok(instance_permit) = instance_permits.clone().try_acquire_owned() else {
            if job_coalesce {
                pending_refire.store(true, Ordering::SeqCst);
                warn!(job = job.name, "job already at instance cap, coalescing this fire");
            } else {
                warn!(job = job.name, "job already at instance cap, dropping this fire");
            }
            return;
        };

        tokio::spawn(async move {
            loop {
                let global_permit = match global_permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let result = runner.run(&job).await;
                if result.success {
                    info!(job = result.job_name, message = result.message, "job completed");
                } else {
                    error!(job = result.job_name, message = result.message, errors = ?result.errors, "job failed");
                }
                drop(global_permit);

                if !pending_refire.swap(false, Ordering::SeqCst) {
                    break;
                }
            }
            drop(instance_permit);
        });
    }
}
