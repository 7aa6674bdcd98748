use std::collections::VecDeque;

use aql_core::Domain;
use serde_json::{json, Value};

use super::{apply_action, AqlResultSet, RowAssembler, RowMerger};
use crate::action::AqlAction;
use crate::capability::SqlCursor;
use crate::error::EngineResult;
use crate::row::Row;

/// Fully materialized results. The cursor is closed before this is returned.
#[derive(Debug, Clone)]
pub struct EagerResult {
    domain: Domain,
    rows: VecDeque<Row>,
}

impl EagerResult {
    pub fn new(domain: Domain, rows: Vec<Row>) -> Self {
        Self {
            domain,
            rows: rows.into(),
        }
    }

    /// Drain a cursor, applying the action to every merged row.
    pub fn fetch(
        mut cursor: Box<dyn SqlCursor>,
        assembler: &RowAssembler,
        action: &dyn AqlAction,
    ) -> EngineResult<Self> {
        let drained = Self::drain(cursor.as_mut(), assembler, action);
        let closed = cursor.close();
        let rows = drained?;
        closed?;
        Ok(Self::new(assembler.domain(), rows))
    }

    fn drain(
        cursor: &mut dyn SqlCursor,
        assembler: &RowAssembler,
        action: &dyn AqlAction,
    ) -> EngineResult<Vec<Row>> {
        let mut merger = RowMerger::default();
        let mut rows = Vec::new();
        while let Some(values) = cursor.next_row()? {
            if let Some(done) = merger.push(assembler.assemble(values)?) {
                rows.extend(apply_action(action, done));
            }
        }
        if let Some(done) = merger.finish() {
            rows.extend(apply_action(action, done));
        }
        Ok(rows)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows.into()
    }

    /// The whole result as a `{ "results": [...], "total": N }` document.
    pub fn to_json(&self) -> Value {
        let results: Vec<Value> = self.rows.iter().map(Row::to_json).collect();
        json!({ "results": results, "total": self.rows.len() })
    }
}

impl Iterator for EagerResult {
    type Item = EngineResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.pop_front().map(Ok)
    }
}

impl AqlResultSet for EagerResult {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn close(&mut self) -> EngineResult<()> {
        self.rows.clear();
        Ok(())
    }
}
