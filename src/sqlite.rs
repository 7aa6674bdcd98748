//! SQLite backed SQL execution.
//!
//! Query results are buffered: every row is read into memory while the
//! connection lock is held, and the returned cursor walks that buffer. A
//! [`LazyResult`](crate::LazyResult) over this executor therefore defers row
//! assembly and actions, not the database read, and never keeps the
//! connection busy. The same handle can also act as the repository mutator
//! and property editor for a standalone database.

use std::path::Path;
use std::sync::Arc;

use aql_core::SqlParam;
use parking_lot::Mutex;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::capability::{
    BufferedCursor, MutationStatus, PropertyEditor, RepositoryMutator, SqlCursor, SqlExecutor,
    SqlValue,
};
use crate::error::{EngineError, EngineResult};
use crate::row::RepoPath;
use crate::schema;

#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn create_schema(&self) -> EngineResult<()> {
        schema::create_schema(&self.conn.lock())?;
        Ok(())
    }

    /// Run statements directly against the connection, e.g. to seed data.
    pub fn with_connection<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        Ok(f(&self.conn.lock())?)
    }

    fn node_id(conn: &Connection, path: &RepoPath) -> rusqlite::Result<Option<i64>> {
        let (parent, name) = path.parent_and_name();
        let mut stmt = conn.prepare(
            "select node_id from nodes where repo = ?1 and node_path = ?2 and node_name = ?3",
        )?;
        let mut rows = stmt.query(rusqlite::params![path.repo, parent, name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn delete_node(&self, path: &RepoPath) -> rusqlite::Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let Some(node_id) = Self::node_id(&tx, path)? else {
            return Ok(false);
        };
        tx.execute("delete from node_props where node_id = ?1", [node_id])?;
        tx.execute("delete from stats where node_id = ?1", [node_id])?;
        tx.execute("delete from nodes where node_id = ?1", [node_id])?;
        tx.commit()?;
        Ok(true)
    }
}

fn to_values(params: &[SqlParam]) -> Vec<Value> {
    params
        .iter()
        .map(|p| match p {
            SqlParam::Text(s) => Value::Text(s.clone()),
            SqlParam::Long(n) => Value::Integer(*n),
        })
        .collect()
}

fn to_sql_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(n) => SqlValue::Integer(n),
        ValueRef::Real(f) => SqlValue::Text(f.to_string()),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Text(String::from_utf8_lossy(b).into_owned()),
    }
}

impl SqlExecutor for SqliteExecutor {
    /// Runs the statement to completion and returns a cursor over the buffered rows.
    fn execute_query(&self, sql: &str, params: &[SqlParam]) -> EngineResult<Box<dyn SqlCursor>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(to_values(params)))?;

        let mut buffered = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(to_sql_value(row.get_ref(i)?));
            }
            buffered.push(values);
        }
        debug!(rows = buffered.len(), "Executed AQL query on SQLite");
        Ok(Box::new(BufferedCursor::new(buffered)))
    }

    fn execute_update(&self, sql: &str, params: &[SqlParam]) -> EngineResult<usize> {
        let conn = self.conn.lock();
        Ok(conn.execute(sql, params_from_iter(to_values(params)))?)
    }
}

impl RepositoryMutator for SqliteExecutor {
    fn undeploy(&self, path: &RepoPath) -> MutationStatus {
        match self.delete_node(path) {
            Ok(true) => MutationStatus::Ok,
            Ok(false) => MutationStatus::Error(format!("{} not found", path)),
            Err(e) => MutationStatus::Error(e.to_string()),
        }
    }
}

impl PropertyEditor for SqliteExecutor {
    fn edit_property(&self, path: &RepoPath, key: &str, value: Option<&str>) -> EngineResult<()> {
        let conn = self.conn.lock();
        let node_id = Self::node_id(&conn, path)?
            .ok_or_else(|| EngineError::Execution(format!("{} not found", path)))?;
        conn.execute(
            "update node_props set prop_value = ?1 where node_id = ?2 and prop_key = ?3",
            rusqlite::params![value, node_id, key],
        )?;
        Ok(())
    }
}
