use std::path::PathBuf;

/// Error taxonomy shared by every crate in the workspace.
///
/// Only [`CoreError::Configuration`] is allowed to abort startup. Job-level
/// failures are captured as status transitions and never leave the worker.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Result file with name {} could not be found", path.display())]
    NotFound { path: PathBuf },

    #[error("Entity not found: {entity} with id {id}")]
    MissingEntity { entity: &'static str, id: String },

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Shorthand for a missing result file.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }
}
