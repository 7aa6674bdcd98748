//! Boundary capabilities consumed by the engine.
//!
//! SQL execution, authorization, repository mutation and property editing are
//! provided by the host. The engine only calls through these traits.

use aql_core::{ReadScope, SqlParam};

use crate::error::{EngineError, EngineResult};
use crate::row::RepoPath;

/// A column value read from the database.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// Executes generated SQL.
pub trait SqlExecutor: Send + Sync {
    fn execute_query(&self, sql: &str, params: &[SqlParam]) -> EngineResult<Box<dyn SqlCursor>>;

    fn execute_update(&self, sql: &str, params: &[SqlParam]) -> EngineResult<usize>;
}

/// A server side cursor over query rows. Columns follow the select list order.
pub trait SqlCursor: Send {
    fn next_row(&mut self) -> EngineResult<Option<Vec<SqlValue>>>;

    fn close(&mut self) -> EngineResult<()>;
}

/// Permission checks for the calling principal.
pub trait AuthorizationProvider: Send + Sync {
    fn can_read(&self, path: &RepoPath) -> bool;

    fn can_delete(&self, path: &RepoPath) -> bool;

    fn can_annotate(&self, path: &RepoPath) -> bool;

    /// Repositories whose content queries are restricted to.
    fn read_scope(&self) -> ReadScope;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationStatus {
    Ok,
    Error(String),
}

impl MutationStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, MutationStatus::Error(_))
    }
}

pub trait RepositoryMutator: Send + Sync {
    fn undeploy(&self, path: &RepoPath) -> MutationStatus;
}

pub trait PropertyEditor: Send + Sync {
    /// Set `key` on `path`. Editing a property the item does not carry is a no-op.
    fn edit_property(&self, path: &RepoPath, key: &str, value: Option<&str>) -> EngineResult<()>;
}

/// Grants every permission and does not scope queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AuthorizationProvider for AllowAll {
    fn can_read(&self, _path: &RepoPath) -> bool {
        true
    }

    fn can_delete(&self, _path: &RepoPath) -> bool {
        true
    }

    fn can_annotate(&self, _path: &RepoPath) -> bool {
        true
    }

    fn read_scope(&self) -> ReadScope {
        ReadScope::Unrestricted
    }
}

/// Rejects every mutation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOnly;

impl RepositoryMutator for ReadOnly {
    fn undeploy(&self, path: &RepoPath) -> MutationStatus {
        MutationStatus::Error(format!("cannot delete {}: repository is read only", path))
    }
}

impl PropertyEditor for ReadOnly {
    fn edit_property(&self, path: &RepoPath, key: &str, _value: Option<&str>) -> EngineResult<()> {
        Err(EngineError::Execution(format!(
            "cannot edit property {} on {}: repository is read only",
            key, path
        )))
    }
}

/// A cursor over rows already held in memory.
#[derive(Debug, Default)]
pub struct BufferedCursor {
    rows: std::collections::VecDeque<Vec<SqlValue>>,
    closed: bool,
}

impl BufferedCursor {
    pub fn new(rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            rows: rows.into(),
            closed: false,
        }
    }
}

impl SqlCursor for BufferedCursor {
    fn next_row(&mut self) -> EngineResult<Option<Vec<SqlValue>>> {
        if self.closed {
            return Err(EngineError::Execution("cursor is closed".to_string()));
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> EngineResult<()> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}
