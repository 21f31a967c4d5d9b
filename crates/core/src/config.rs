//! Engine configuration loaded from environment variables.
//!
//! All fields have defaults suitable for local development; every directory
//! defaults to a subdirectory of `PPM_DATA_ROOT`. Malformed values are a
//! [`CoreError::Configuration`], the one error class allowed to abort startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CoreError;

/// Default number of concurrently executing training jobs.
pub const DEFAULT_THREAD_POOL_SIZE: usize = 4;

/// Default age after which a job's artifacts are disposed (7 days).
pub const DEFAULT_DISPOSAL_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Default interval between disposal sweeps (1 hour).
pub const DEFAULT_DISPOSAL_INTERVAL_SECS: u64 = 3600;

/// Default idle time after which a cached owner is evicted (1 hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Directories the engine reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    /// Uploaded event logs.
    pub user_logs: PathBuf,
    /// Per-job training records (`{job-id}.json`).
    pub training: PathBuf,
    /// Detailed (true vs predicted) result files.
    pub detailed: PathBuf,
    /// Validation result files.
    pub validation: PathBuf,
    /// Feature-importance result files.
    pub feature_importance: PathBuf,
    /// Dataset descriptors produced by dataset generation.
    pub datasets: PathBuf,
    /// Previously optimized hyperparameters, one JSON file per log.
    pub optimized_params: PathBuf,
    /// Training scripts invoked by the default job runner.
    pub scripts: PathBuf,
}

impl Directories {
    /// Lay every directory out under a single root.
    ///
    /// ```
    /// use ppm_core::config::Directories;
    ///
    /// let dirs = Directories::under("/srv/ppm");
    /// assert_eq!(dirs.detailed, std::path::Path::new("/srv/ppm/detailed"));
    /// ```
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            user_logs: root.join("logs"),
            training: root.join("training"),
            detailed: root.join("detailed"),
            validation: root.join("validation"),
            feature_importance: root.join("feature_importance"),
            datasets: root.join("datasets"),
            optimized_params: root.join("optimized_params"),
            scripts: root.join("scripts"),
        }
    }

    /// Create every directory that does not exist yet.
    pub fn create_all(&self) -> Result<(), CoreError> {
        for dir in [
            &self.user_logs,
            &self.training,
            &self.detailed,
            &self.validation,
            &self.feature_importance,
            &self.datasets,
            &self.optimized_params,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub dirs: Directories,
    /// Python interpreter used by the training script runner.
    pub python: String,
    /// JSON file holding the model parameter definitions.
    pub model_config_path: PathBuf,
    /// File extensions accepted in the user log directory.
    pub log_extensions: Vec<String>,
    /// Size of the bounded worker pool.
    pub thread_pool_size: usize,
    /// Jobs older than this are disposed.
    pub disposal_age: Duration,
    /// Interval between disposal sweeps.
    pub disposal_interval: Duration,
    /// Idle time after which cached owners are evicted.
    pub cache_ttl: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                          |
    /// |------------------------------|----------------------------------|
    /// | `PPM_DATA_ROOT`              | `./data`                         |
    /// | `PPM_USER_LOGS_DIR`          | `{root}/logs`                    |
    /// | `PPM_TRAIN_DIR`              | `{root}/training`                |
    /// | `PPM_DETAIL_DIR`             | `{root}/detailed`                |
    /// | `PPM_VALIDATION_DIR`         | `{root}/validation`              |
    /// | `PPM_FEATURE_DIR`            | `{root}/feature_importance`      |
    /// | `PPM_DATA_DIR`               | `{root}/datasets`                |
    /// | `PPM_OHP_DIR`                | `{root}/optimized_params`        |
    /// | `PPM_SCRIPT_DIR`             | `./scripts`                      |
    /// | `PPM_PYTHON`                 | `python3`                        |
    /// | `PPM_MODEL_CONFIG`           | `./config/models.json`           |
    /// | `PPM_LOG_EXTENSIONS`         | `csv,xes`                        |
    /// | `PPM_THREAD_POOL_SIZE`       | `4`                              |
    /// | `PPM_DISPOSAL_AGE_SECS`      | `604800`                         |
    /// | `PPM_DISPOSAL_INTERVAL_SECS` | `3600`                           |
    /// | `PPM_CACHE_TTL_SECS`         | `3600`                           |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = PathBuf::from(lookup("PPM_DATA_ROOT").unwrap_or_else(|| "./data".into()));
        let defaults = Directories::under(&root);
        let dir = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        let dirs = Directories {
            user_logs: dir("PPM_USER_LOGS_DIR", defaults.user_logs),
            training: dir("PPM_TRAIN_DIR", defaults.training),
            detailed: dir("PPM_DETAIL_DIR", defaults.detailed),
            validation: dir("PPM_VALIDATION_DIR", defaults.validation),
            feature_importance: dir("PPM_FEATURE_DIR", defaults.feature_importance),
            datasets: dir("PPM_DATA_DIR", defaults.datasets),
            optimized_params: dir("PPM_OHP_DIR", defaults.optimized_params),
            scripts: dir("PPM_SCRIPT_DIR", PathBuf::from("./scripts")),
        };

        let log_extensions: Vec<String> = lookup("PPM_LOG_EXTENSIONS")
            .unwrap_or_else(|| "csv,xes".into())
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let thread_pool_size = parse_number(
            &lookup,
            "PPM_THREAD_POOL_SIZE",
            DEFAULT_THREAD_POOL_SIZE as u64,
        )? as usize;
        if thread_pool_size == 0 {
            return Err(CoreError::Configuration(
                "PPM_THREAD_POOL_SIZE must be at least 1".into(),
            ));
        }

        let disposal_interval = parse_number(
            &lookup,
            "PPM_DISPOSAL_INTERVAL_SECS",
            DEFAULT_DISPOSAL_INTERVAL_SECS,
        )?;
        let cache_ttl = parse_number(&lookup, "PPM_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        if disposal_interval == 0 || cache_ttl == 0 {
            return Err(CoreError::Configuration(
                "PPM_DISPOSAL_INTERVAL_SECS and PPM_CACHE_TTL_SECS must be at least 1".into(),
            ));
        }

        Ok(Self {
            dirs,
            python: lookup("PPM_PYTHON").unwrap_or_else(|| "python3".into()),
            model_config_path: lookup("PPM_MODEL_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./config/models.json")),
            log_extensions,
            thread_pool_size,
            disposal_age: Duration::from_secs(parse_number(
                &lookup,
                "PPM_DISPOSAL_AGE_SECS",
                DEFAULT_DISPOSAL_AGE_SECS,
            )?),
            disposal_interval: Duration::from_secs(disposal_interval),
            cache_ttl: Duration::from_secs(cache_ttl),
        })
    }

    /// Configuration rooted at `root` with every other value defaulted.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let dirs = Directories::under(root);
        Self {
            model_config_path: root.join("models.json"),
            dirs,
            python: "python3".into(),
            log_extensions: vec!["csv".into(), "xes".into()],
            thread_pool_size: DEFAULT_THREAD_POOL_SIZE,
            disposal_age: Duration::from_secs(DEFAULT_DISPOSAL_AGE_SECS),
            disposal_interval: Duration::from_secs(DEFAULT_DISPOSAL_INTERVAL_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

fn parse_number<F>(lookup: &F, key: &str, default: u64) -> Result<u64, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            CoreError::Configuration(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
    }
}
