//! Wiring of the engine services.

use std::path::PathBuf;
use std::sync::Arc;

use ppm_core::config::EngineConfig;
use ppm_core::error::CoreError;
use ppm_core::logs::{self, ColumnRoles};
use ppm_core::model_params::ModelParamProvider;
use ppm_core::naming::NamingResolver;
use ppm_core::training::{FsTrainingStore, TrainingStore};
use ppm_events::EventBus;
use tokio::task::JoinHandle;

use crate::charts::{Chart, ChartCache, ChartGenerator};
use crate::dataset::DataSetGenerationJob;
use crate::disposal::DisposalTask;
use crate::job_cache::JobCache;
use crate::live::LiveJobs;
use crate::queue::JobManager;
use crate::runner::{JobRunner, TrainingScriptRunner};

/// Every engine service, shared via `Arc`.
pub struct Engine {
    pub config: EngineConfig,
    pub naming: Arc<NamingResolver>,
    pub store: Arc<dyn TrainingStore>,
    pub params: Arc<dyn ModelParamProvider>,
    pub bus: Arc<EventBus>,
    pub job_cache: Arc<JobCache>,
    pub chart_cache: Arc<ChartCache>,
    pub jobs: Arc<JobManager>,
    pub disposal: Arc<DisposalTask>,
}

impl Engine {
    /// Build the engine with the training-script runner.
    pub fn new(
        config: EngineConfig,
        params: Arc<dyn ModelParamProvider>,
        bus: Arc<EventBus>,
    ) -> Result<Self, CoreError> {
        Self::build(config, params, bus, None)
    }

    /// Build the engine with a custom job runner.
    pub fn with_runner(
        config: EngineConfig,
        params: Arc<dyn ModelParamProvider>,
        bus: Arc<EventBus>,
        runner: Arc<dyn JobRunner>,
    ) -> Result<Self, CoreError> {
        Self::build(config, params, bus, Some(runner))
    }

    fn build(
        config: EngineConfig,
        params: Arc<dyn ModelParamProvider>,
        bus: Arc<EventBus>,
        runner: Option<Arc<dyn JobRunner>>,
    ) -> Result<Self, CoreError> {
        config.dirs.create_all()?;

        let naming = Arc::new(NamingResolver::new(&config.dirs));
        let store: Arc<dyn TrainingStore> = Arc::new(FsTrainingStore::new(&config.dirs.training));
        let live = Arc::new(LiveJobs::new());

        let job_cache = Arc::new(JobCache::new(store.clone(), live.clone()));
        let chart_cache = Arc::new(ChartCache::new(ChartGenerator::new(naming.clone())));

        let runner = runner.unwrap_or_else(|| {
            Arc::new(TrainingScriptRunner::new(
                config.python.clone(),
                config.dirs.scripts.clone(),
                store.clone(),
                naming.clone(),
            ))
        });
        let jobs = Arc::new(JobManager::new(
            config.thread_pool_size,
            runner,
            bus.clone(),
            live.clone(),
            job_cache.clone(),
        ));

        let disposal = Arc::new(DisposalTask::new(
            store.clone(),
            naming.clone(),
            job_cache.clone(),
            chart_cache.clone(),
            live,
            config.disposal_age,
        ));

        tracing::info!(
            pool_size = config.thread_pool_size,
            training_dir = %config.dirs.training.display(),
            "Engine initialised",
        );

        Ok(Self {
            config,
            naming,
            store,
            params,
            bus,
            job_cache,
            chart_cache,
            jobs,
            disposal,
        })
    }

    /// Logs available for training.
    pub fn available_logs(&self) -> Result<Vec<PathBuf>, CoreError> {
        logs::available_logs(&self.config.dirs.user_logs, &self.config.log_extensions)
    }

    /// Resolve a log by file name among the available logs.
    pub fn find_log(&self, file_name: &str) -> Result<PathBuf, CoreError> {
        self.available_logs()?
            .into_iter()
            .find(|path| path.file_name().is_some_and(|name| name == file_name))
            .ok_or_else(|| CoreError::MissingEntity {
                entity: "Log",
                id: file_name.to_string(),
            })
    }

    /// Charts of one of the owner's completed jobs.
    pub fn charts_for(&self, owner: &str, job_id: &str) -> Result<Vec<Arc<Chart>>, CoreError> {
        let job = self
            .job_cache
            .get_job(owner, job_id)?
            .ok_or_else(|| CoreError::MissingEntity {
                entity: "Job",
                id: job_id.to_string(),
            })?;
        Ok(self.chart_cache.get_charts(&job))
    }

    /// Queue dataset generation for a log on the worker pool.
    pub fn generate_dataset(
        &self,
        log_file: &std::path::Path,
        roles: ColumnRoles,
    ) -> Result<JoinHandle<Result<(), CoreError>>, CoreError> {
        let job = DataSetGenerationJob::new(roles, log_file, &self.config.dirs.datasets)?;
        Ok(self.jobs.run_service_job(Arc::new(job)))
    }

    /// Prediction target columns of a log with a generated dataset.
    pub fn log_columns(&self, log_name: &str) -> Result<Vec<String>, CoreError> {
        logs::read_log_columns(&self.config.dirs.datasets, log_name)
    }

    /// Evict owners idle for longer than the configured TTL from both caches.
    pub fn evict_idle(&self) -> (usize, usize) {
        let ttl = self.config.cache_ttl;
        (self.job_cache.evict_expired(ttl), self.chart_cache.evict_expired(ttl))
    }
}
