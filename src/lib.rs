//! Artifact AQL runtime
//!
//! Executes queries compiled by [`aql_core`] through host supplied
//! capabilities, applies row actions and streams results as JSON.

pub mod action;
pub mod capability;
pub mod config;
pub mod error;
pub mod result;
pub mod row;
pub mod schema;
pub mod service;
pub mod sqlite;
pub mod streamer;

pub use aql_core;

pub use action::{ActionFailure, ActionFailureReason, AqlAction};
pub use capability::{
    AllowAll, AuthorizationProvider, MutationStatus, PropertyEditor, ReadOnly, RepositoryMutator,
    SqlCursor, SqlExecutor, SqlValue,
};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use result::{AqlResultSet, EagerResult, LazyResult};
pub use row::{FieldValue, RepoPath, Row};
pub use service::{AqlService, AqlServiceBuilder};
pub use sqlite::SqliteExecutor;
pub use streamer::AqlJsonStreamer;
