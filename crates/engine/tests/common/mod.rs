//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ppm_core::config::{Directories, EngineConfig};
use ppm_core::error::CoreError;
use ppm_core::job::{Job, JobStatus};
use ppm_core::model_params::{
    ModelConfiguration, ModelParameter, ParameterSelection, TYPE_BUCKETING, TYPE_ENCODING,
    TYPE_LEARNER, TYPE_PREDICTION,
};
use ppm_core::training::{FsTrainingStore, StoredJob, TrainingStore};
use ppm_engine::runner::JobRunner;
use ppm_engine::Engine;
use ppm_events::{EventBus, JobEvent};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

pub const OWNER: &str = "alice";
pub const LOG_NAME: &str = "bpi";

// ---------------------------------------------------------------------------
// Parameters and jobs
// ---------------------------------------------------------------------------

pub fn param(id: &str, kind: &str) -> ModelParameter {
    ModelParameter::new(id, kind)
}

pub fn selection(encodings: &[&str], bucketings: &[&str], learners: &[&str]) -> ParameterSelection {
    ParameterSelection {
        encoding: encodings.iter().map(|id| param(id, TYPE_ENCODING)).collect(),
        bucketing: bucketings.iter().map(|id| param(id, TYPE_BUCKETING)).collect(),
        learner: learners.iter().map(|id| param(id, TYPE_LEARNER)).collect(),
        prediction_type: vec![param("remtime", TYPE_PREDICTION)],
    }
}

pub fn job_for(owner: &str, log_file: &Path) -> Job {
    Job::new(
        owner,
        param("agg", TYPE_ENCODING),
        param("zero", TYPE_BUCKETING),
        param("xgboost", TYPE_LEARNER),
        param("remtime", TYPE_PREDICTION),
        log_file,
    )
}

/// Persist a completed job started `age` ago.
pub fn persist_job(store: &dyn TrainingStore, owner: &str, log_file: &Path, age: Duration) -> Job {
    let mut job = job_for(owner, log_file);
    job.start_time = Some(chrono::Utc::now() - chrono::Duration::from_std(age).unwrap());
    job.status = JobStatus::Completed;
    store.write(&job).unwrap();
    job
}

// ---------------------------------------------------------------------------
// Result files
// ---------------------------------------------------------------------------

pub fn write_classification_results(dirs: &Directories, job_id: &str) {
    std::fs::write(
        dirs.detailed.join(format!("detailed_{LOG_NAME}_{job_id}_class.csv")),
        "actual,predicted\ntrue,true\nfalse,true\ntrue,true\n",
    )
    .unwrap();
    std::fs::write(
        dirs.validation.join(format!("validation_{LOG_NAME}_{job_id}_class.csv")),
        "metric,nr_events,score\nauc,1,0.6\nauc,2,0.7\nf1,1,0.5\n",
    )
    .unwrap();
    std::fs::write(
        dirs.feature_importance.join(format!("feat_importance_{LOG_NAME}_{job_id}_1.csv")),
        "feature,importance\nage,0.7\ncost,0.3\n",
    )
    .unwrap();
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Where a [`MockRunner`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreProcess,
    Execute,
    PostExecute,
}

/// Runner that writes classification results instead of training.
pub struct MockRunner {
    dirs: Directories,
    store: FsTrainingStore,
    fail_in: Option<Phase>,
    block_until_cancelled: bool,
    executed: AtomicUsize,
}

impl MockRunner {
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn new(dirs: &Directories) -> Self {
        Self {
            dirs: dirs.clone(),
            store: FsTrainingStore::new(&dirs.training),
            fail_in: None,
            block_until_cancelled: false,
            executed: AtomicUsize::new(0),
        }
    }

    pub fn failing_in(mut self, phase: Phase) -> Self {
        self.fail_in = Some(phase);
        self
    }

    pub fn blocking(mut self) -> Self {
        self.block_until_cancelled = true;
        self
    }

    fn check(&self, phase: Phase) -> Result<(), CoreError> {
        if self.fail_in == Some(phase) {
            return Err(CoreError::Execution(format!("{phase:?} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl JobRunner for MockRunner {
    async fn pre_process(&self, job: &Job) -> Result<(), CoreError> {
        self.check(Phase::PreProcess)?;
        self.store.write(job)
    }

    async fn execute(&self, job: &Job, cancel: CancellationToken) -> Result<(), CoreError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        if self.block_until_cancelled {
            cancel.cancelled().await;
            return Err(CoreError::Execution("Process cancelled".into()));
        }
        self.check(Phase::Execute)?;
        write_classification_results(&self.dirs, &job.id);
        Ok(())
    }

    async fn post_execute(&self, _job: &Job) -> Result<(), CoreError> {
        self.check(Phase::PostExecute)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct TestEngine {
    pub tmp: TempDir,
    pub engine: Engine,
    pub log_file: std::path::PathBuf,
    pub events: broadcast::Receiver<JobEvent>,
    pub runner: Arc<MockRunner>,
}

impl TestEngine {
    pub fn dirs(&self) -> &Directories {
        &self.engine.config.dirs
    }
}

/// Engine over a temp directory with a staged-able `bpi.csv` log.
pub fn build_engine(pool_size: usize, runner: impl FnOnce(&Directories) -> MockRunner) -> TestEngine {
    let tmp = TempDir::new().unwrap();
    let mut config = EngineConfig::rooted_at(tmp.path());
    config.thread_pool_size = pool_size;
    config.dirs.create_all().unwrap();

    let log_file = config.dirs.user_logs.join(format!("{LOG_NAME}.csv"));
    std::fs::write(&log_file, "case,activity,time\n").unwrap();

    let bus = Arc::new(EventBus::default());
    let events = bus.subscribe();
    let runner = Arc::new(runner(&config.dirs));
    let params = Arc::new(ModelConfiguration::default());
    let engine = Engine::with_runner(config, params, bus, runner.clone()).unwrap();

    TestEngine {
        tmp,
        engine,
        log_file,
        events,
        runner,
    }
}

/// Receive events until `count` status events for terminal states arrived.
pub async fn collect_until_terminal(rx: &mut broadcast::Receiver<JobEvent>, count: usize) -> Vec<JobEvent> {
    let mut events = Vec::new();
    let mut terminal = 0;
    while terminal < count {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for job events")
            .expect("event bus closed");
        if event.job_status().is_some_and(JobStatus::is_terminal) {
            terminal += 1;
        }
        events.push(event);
    }
    events
}

/// Statuses published for one job, in order.
pub fn statuses_of(events: &[JobEvent], job_id: &str) -> Vec<JobStatus> {
    events
        .iter()
        .filter(|e| e.event_type == ppm_events::bus::EVENT_JOB_STATUS)
        .flat_map(|e| e.jobs.iter())
        .filter(|job| job.id == job_id)
        .map(|job| job.status)
        .collect()
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Training store that counts full listings.
pub struct CountingStore {
    inner: FsTrainingStore,
    pub listings: AtomicUsize,
}

impl CountingStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            inner: FsTrainingStore::new(dir),
            listings: AtomicUsize::new(0),
        }
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

impl TrainingStore for CountingStore {
    fn list_all(&self) -> Result<Vec<StoredJob>, CoreError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        self.inner.list_all()
    }

    fn read(&self, id: &str) -> Result<StoredJob, CoreError> {
        self.inner.read(id)
    }

    fn write(&self, job: &Job) -> Result<(), CoreError> {
        self.inner.write(job)
    }

    fn delete(&self, id: &str) -> Result<bool, CoreError> {
        self.inner.delete(id)
    }

    fn path_for(&self, id: &str) -> std::path::PathBuf {
        self.inner.path_for(id)
    }
}
