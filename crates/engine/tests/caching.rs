mod common;

use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use common::*;
use ppm_core::config::Directories;
use ppm_core::error::CoreError;
use ppm_core::job::Job;
use ppm_core::naming::NamingResolver;
use ppm_core::training::{StoredJob, TrainingStore};
use ppm_engine::charts::{Chart, ChartCache, ChartGenerator, EMPTY_PAYLOAD, TRUE_VS_PREDICTED};
use ppm_engine::job_cache::JobCache;
use ppm_engine::live::LiveJobs;
use tempfile::TempDir;

fn dirs() -> (TempDir, Directories) {
    let tmp = TempDir::new().unwrap();
    let dirs = Directories::under(tmp.path());
    dirs.create_all().unwrap();
    (tmp, dirs)
}

fn chart_cache(dirs: &Directories) -> ChartCache {
    ChartCache::new(ChartGenerator::new(Arc::new(NamingResolver::new(dirs))))
}

// ---------------------------------------------------------------------------
// Job cache
// ---------------------------------------------------------------------------

#[test]
fn cold_lookup_reads_disk_once() {
    let (_tmp, dirs) = dirs();
    let store = Arc::new(CountingStore::new(&dirs.training));
    let log = dirs.user_logs.join("bpi.csv");

    let older = persist_job(store.as_ref(), OWNER, &log, Duration::from_secs(120));
    let newer = persist_job(store.as_ref(), OWNER, &log, Duration::from_secs(60));
    persist_job(store.as_ref(), "bob", &log, Duration::from_secs(60));

    let cache = JobCache::new(store.clone(), Arc::new(LiveJobs::new()));

    let first = cache.get_jobs(OWNER).unwrap();
    let ids: Vec<_> = first.iter().map(|job| job.id.clone()).collect();
    assert_eq!(ids, vec![older.id.clone(), newer.id.clone()]);
    assert_eq!(store.listings(), 1);

    let second = cache.get_jobs(OWNER).unwrap();
    assert_eq!(store.listings(), 1);
    assert_eq!(first.len(), second.len());
    assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
}

#[test]
fn live_jobs_are_not_loaded_from_disk() {
    let (_tmp, dirs) = dirs();
    let store = Arc::new(CountingStore::new(&dirs.training));
    let log = dirs.user_logs.join("bpi.csv");
    let live_job = persist_job(store.as_ref(), OWNER, &log, Duration::from_secs(10));
    let done = persist_job(store.as_ref(), OWNER, &log, Duration::from_secs(20));

    let live = Arc::new(LiveJobs::new());
    live.register(&live_job);
    let cache = JobCache::new(store, live);

    let jobs = cache.get_jobs(OWNER).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, done.id);
}

#[test]
fn put_only_reaches_warm_owners() {
    let (_tmp, dirs) = dirs();
    let store = Arc::new(CountingStore::new(&dirs.training));
    let log = dirs.user_logs.join("bpi.csv");
    persist_job(store.as_ref(), OWNER, &log, Duration::from_secs(10));
    let cache = JobCache::new(store, Arc::new(LiveJobs::new()));

    assert!(!cache.put(Arc::new(job_for("carol", &log))));

    cache.get_jobs(OWNER).unwrap();
    let fresh = Arc::new(job_for(OWNER, &log));
    assert!(cache.put(fresh.clone()));
    assert!(!cache.put(fresh.clone()));
    assert_eq!(cache.get_jobs(OWNER).unwrap().len(), 2);
    assert!(cache.get_job(OWNER, &fresh.id).unwrap().is_some());
}

#[test]
fn flush_forces_a_new_disk_read() {
    let (_tmp, dirs) = dirs();
    let store = Arc::new(CountingStore::new(&dirs.training));
    let log = dirs.user_logs.join("bpi.csv");
    persist_job(store.as_ref(), OWNER, &log, Duration::from_secs(10));
    let cache = JobCache::new(store.clone(), Arc::new(LiveJobs::new()));

    cache.get_jobs(OWNER).unwrap();
    cache.flush();
    assert!(cache.cached_owners().is_empty());
    cache.get_jobs(OWNER).unwrap();
    assert_eq!(store.listings(), 2);
}

/// Store that completes a job through `put` while the cache is listing.
struct CompletingStore {
    inner: CountingStore,
    cache: OnceLock<Weak<JobCache>>,
    finishing: Mutex<Option<Arc<Job>>>,
    put_result: Mutex<Option<JoinHandle<bool>>>,
}

impl TrainingStore for CompletingStore {
    fn list_all(&self) -> Result<Vec<StoredJob>, CoreError> {
        let finishing = self.finishing.lock().unwrap().take();
        if let (Some(job), Some(cache)) = (finishing, self.cache.get().and_then(Weak::upgrade)) {
            let handle = std::thread::spawn(move || cache.put(job));
            *self.put_result.lock().unwrap() = Some(handle);
            // Give the completion a chance to run before the listing returns.
            std::thread::sleep(Duration::from_millis(50));
        }
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

#[test]
fn job_completed_during_cold_load_is_kept() {
    let (_tmp, dirs) = dirs();
    let log = dirs.user_logs.join("bpi.csv");
    let store = Arc::new(CompletingStore {
        inner: CountingStore::new(&dirs.training),
        cache: OnceLock::new(),
        finishing: Mutex::new(None),
        put_result: Mutex::new(None),
    });
    let done = persist_job(store.as_ref(), OWNER, &log, Duration::from_secs(60));
    let finishing = persist_job(store.as_ref(), OWNER, &log, Duration::from_secs(30));

    // Still live when the records are filtered, so only `put` can deliver it.
    let live = Arc::new(LiveJobs::new());
    live.register(&finishing);
    let cache = Arc::new(JobCache::new(store.clone(), live));
    store.cache.set(Arc::downgrade(&cache)).unwrap();
    *store.finishing.lock().unwrap() = Some(Arc::new(finishing.clone()));

    cache.get_jobs(OWNER).unwrap();
    let handle = store.put_result.lock().unwrap().take().unwrap();
    assert!(handle.join().unwrap());

    let ids: Vec<_> = cache.get_jobs(OWNER).unwrap().iter().map(|job| job.id.clone()).collect();
    assert_eq!(ids, vec![done.id, finishing.id]);
}

// ---------------------------------------------------------------------------
// Chart cache
// ---------------------------------------------------------------------------

#[test]
fn repeated_chart_requests_return_identical_charts() {
    let (_tmp, dirs) = dirs();
    let job = job_for(OWNER, &dirs.user_logs.join("bpi.csv"));
    write_classification_results(&dirs, &job.id);
    let cache = chart_cache(&dirs);

    let first = cache.get_charts(&job);
    let second = cache.get_charts(&job);

    assert_eq!(first.len(), second.len());
    assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
}

#[test]
fn classification_job_gets_heat_map_lines_and_bars() {
    let (_tmp, dirs) = dirs();
    let job = job_for(OWNER, &dirs.user_logs.join("bpi.csv"));
    write_classification_results(&dirs, &job.id);

    let charts = chart_cache(&dirs).get_charts(&job);
    assert_eq!(charts.len(), 4);

    match charts[0].as_ref() {
        Chart::HeatMap(heat) => {
            assert_eq!(heat.name, TRUE_VS_PREDICTED);
            assert_eq!(heat.x_labels, r#"["false","true"]"#);
            assert_eq!(heat.payload, "[[0,1,1],[1,1,2]]");
        }
        other => panic!("expected heat map, got {other:?}"),
    }
    let line_names: Vec<_> = charts[1..3].iter().map(|c| c.name().to_string()).collect();
    assert_eq!(line_names, vec!["auc", "f1"]);
    match charts[1].as_ref() {
        Chart::Line(line) => assert_eq!(line.final_step, 2),
        other => panic!("expected line chart, got {other:?}"),
    }
    match charts[3].as_ref() {
        Chart::Bar(bar) => {
            assert_eq!(bar.name, "1");
            assert_eq!(bar.labels, r#"["age","cost"]"#);
        }
        other => panic!("expected bar chart, got {other:?}"),
    }
}

#[test]
fn missing_detailed_file_degrades_heat_map() {
    let (_tmp, dirs) = dirs();
    let job = job_for(OWNER, &dirs.user_logs.join("bpi.csv"));

    let charts = chart_cache(&dirs).get_charts(&job);

    match charts[0].as_ref() {
        Chart::HeatMap(heat) => {
            assert!(heat.name.contains("could not be found"));
            assert_eq!(heat.payload, EMPTY_PAYLOAD);
            assert_eq!(heat.x_labels, EMPTY_PAYLOAD);
            assert_eq!(heat.y_labels, EMPTY_PAYLOAD);
        }
        other => panic!("expected heat map, got {other:?}"),
    }
}

#[test]
fn unreadable_regression_file_degrades_scatter_plot() {
    let (_tmp, dirs) = dirs();
    let job = job_for(OWNER, &dirs.user_logs.join("bpi.csv"));
    std::fs::write(
        dirs.detailed.join(format!("detailed_bpi_{}_regr.csv", job.id)),
        "actual,predicted\nsoon,later\n",
    )
    .unwrap();

    let charts = chart_cache(&dirs).get_charts(&job);

    match charts[0].as_ref() {
        Chart::Scatter(scatter) => {
            assert_ne!(scatter.name, TRUE_VS_PREDICTED);
            assert_eq!(scatter.payload, EMPTY_PAYLOAD);
        }
        other => panic!("expected scatter plot, got {other:?}"),
    }
}

#[test]
fn missing_validation_and_feature_files_yield_no_multi_charts() {
    let (_tmp, dirs) = dirs();
    let job = job_for(OWNER, &dirs.user_logs.join("bpi.csv"));
    std::fs::write(
        dirs.detailed.join(format!("detailed_bpi_{}_regr.csv", job.id)),
        "actual,predicted\n3.5,4.0\n",
    )
    .unwrap();

    let charts = chart_cache(&dirs).get_charts(&job);

    assert_eq!(charts.len(), 1);
    assert!(matches!(charts[0].as_ref(), Chart::Scatter(s) if s.payload == r#"[{"x":3.5,"y":4.0}]"#));
}

#[test]
fn clear_regenerates_charts() {
    let (_tmp, dirs) = dirs();
    let job = job_for(OWNER, &dirs.user_logs.join("bpi.csv"));
    write_classification_results(&dirs, &job.id);
    let cache = chart_cache(&dirs);

    let before = cache.get_charts(&job);
    cache.clear();
    assert!(cache.cached_owners().is_empty());
    let after = cache.get_charts(&job);

    assert_eq!(before, after);
    assert!(!Arc::ptr_eq(&before[0], &after[0]));
}
