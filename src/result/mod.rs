//! Result streams.
//!
//! SQL rows are assembled into typed [`Row`]s, consecutive rows of the same
//! entity are merged and the query's action runs on each merged row.
//! [`EagerResult`] materializes everything up front; [`LazyResult`] keeps the
//! cursor open and must be closed.

mod eager;
mod lazy;

pub use eager::EagerResult;
pub use lazy::LazyResult;

use aql_core::{Domain, ResultColumn};
use tracing::debug;

use crate::action::AqlAction;
use crate::capability::SqlValue;
use crate::error::{EngineError, EngineResult};
use crate::row::{FieldValue, Row};

/// Rows produced by an executed query.
pub trait AqlResultSet: Iterator<Item = EngineResult<Row>> {
    fn domain(&self) -> Domain;

    /// Release the underlying cursor. Closing twice is a no-op.
    fn close(&mut self) -> EngineResult<()>;
}

/// Maps select-list columns onto a row tree.
#[derive(Debug, Clone)]
pub struct RowAssembler {
    domain: Domain,
    columns: Vec<ResultColumn>,
}

impl RowAssembler {
    pub fn new(domain: Domain, columns: Vec<ResultColumn>) -> Self {
        Self { domain, columns }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Trailing columns added by dialect pagination are ignored.
    pub fn assemble(&self, values: Vec<SqlValue>) -> EngineResult<Row> {
        if values.len() < self.columns.len() {
            return Err(EngineError::Execution(format!(
                "expected {} columns, got {}",
                self.columns.len(),
                values.len()
            )));
        }

        let mut row = Row::new(self.domain);
        for (column, value) in self.columns.iter().zip(values) {
            let ext = column.field.field.extension()?;
            let mut target = &mut row;
            for domain in column.field.sub_domains.iter().skip(1) {
                target = target.child_mut(*domain);
            }
            target.set(column.field.field, FieldValue::from_sql(ext.field_type, value));
        }
        row.prune_empty_children();
        Ok(row)
    }
}

/// Merges consecutive rows describing the same entity.
#[derive(Debug, Default)]
pub(crate) struct RowMerger {
    pending: Option<Row>,
}

impl RowMerger {
    /// Returns the previous entity once a row of a different one arrives.
    pub(crate) fn push(&mut self, row: Row) -> Option<Row> {
        if let Some(pending) = self.pending.as_mut() {
            if pending.same_entity(&row) {
                pending.merge(row);
                return None;
            }
        }
        self.pending.replace(row)
    }

    pub(crate) fn finish(&mut self) -> Option<Row> {
        self.pending.take()
    }
}

/// Run the action on a row. Failed rows are dropped.
pub(crate) fn apply_action(action: &dyn AqlAction, row: Row) -> Option<Row> {
    match action.apply(row) {
        Ok(row) => Some(row),
        Err(failure) => {
            debug!(
                action = action.name(),
                reason = %failure.reason,
                "Skipping row: {}",
                failure.message
            );
            None
        }
    }
}
