use aql_core::AqlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] AqlError),

    #[error("Query execution error: {0}")]
    Execution(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Compile errors are reported before any SQL runs.
    pub fn is_compile_error(&self) -> bool {
        matches!(self, EngineError::Compile(_))
    }
}
