use aql_core::Domain;
use tracing::{error, warn};

use super::{apply_action, AqlResultSet, RowAssembler, RowMerger};
use crate::action::AqlAction;
use crate::capability::SqlCursor;
use crate::error::EngineResult;
use crate::row::Row;

/// Rows read on demand from an open cursor.
///
/// The action runs as rows are pulled. Close the result when done, or use
/// [`LazyResult::scoped`] which closes it on every path. A result dropped
/// while still open closes its cursor and logs a warning.
pub struct LazyResult {
    cursor: Box<dyn SqlCursor>,
    assembler: RowAssembler,
    action: Box<dyn AqlAction>,
    merger: RowMerger,
    exhausted: bool,
    closed: bool,
}

impl LazyResult {
    pub fn new(cursor: Box<dyn SqlCursor>, assembler: RowAssembler, action: Box<dyn AqlAction>) -> Self {
        Self {
            cursor,
            assembler,
            action,
            merger: RowMerger::default(),
            exhausted: false,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run `f` over the result and close it afterwards, whatever `f` returns.
    pub fn scoped<T, F>(mut self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut LazyResult) -> EngineResult<T>,
    {
        let outcome = f(&mut self);
        let closed = self.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }

    /// The next merged row before the action runs.
    fn next_entity(&mut self) -> Option<EngineResult<Row>> {
        loop {
            if self.exhausted {
                return self.merger.finish().map(Ok);
            }
            match self.cursor.next_row() {
                Ok(Some(values)) => {
                    let row = match self.assembler.assemble(values) {
                        Ok(row) => row,
                        Err(e) => return Some(Err(e)),
                    };
                    if let Some(done) = self.merger.push(row) {
                        return Some(Ok(done));
                    }
                }
                Ok(None) => self.exhausted = true,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl Iterator for LazyResult {
    type Item = EngineResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        loop {
            let row = match self.next_entity()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            if let Some(row) = apply_action(self.action.as_ref(), row) {
                return Some(Ok(row));
            }
        }
    }
}

impl AqlResultSet for LazyResult {
    fn domain(&self) -> Domain {
        self.assembler.domain()
    }

    fn close(&mut self) -> EngineResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.merger.finish();
        self.cursor.close()
    }
}

impl Drop for LazyResult {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(domain = %self.assembler.domain(), "Lazy AQL result dropped without close");
        if let Err(e) = self.close() {
            error!("Failed to close AQL result cursor: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::action::test_support::Recorder;
    use crate::action::{DeleteAction, FindAction};
    use crate::capability::{BufferedCursor, SqlValue};
    use crate::error::EngineError;
    use aql_core::{PhysicalField, ResultColumn, ResultField};

    /// Counts close calls on the wrapped cursor.
    struct CountingCursor {
        inner: BufferedCursor,
        closes: Arc<AtomicUsize>,
    }

    impl SqlCursor for CountingCursor {
        fn next_row(&mut self) -> EngineResult<Option<Vec<SqlValue>>> {
            self.inner.next_row()
        }

        fn close(&mut self) -> EngineResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.inner.close()
        }
    }

    fn lazy(names: &[&str], action: Box<dyn AqlAction>) -> (LazyResult, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        let rows = names
            .iter()
            .map(|n| {
                vec![
                    SqlValue::Text("libs".into()),
                    SqlValue::Text(".".into()),
                    SqlValue::Text(n.to_string()),
                ]
            })
            .collect();
        let cursor = CountingCursor {
            inner: BufferedCursor::new(rows),
            closes: closes.clone(),
        };
        let column = |alias: &str, field| ResultColumn {
            alias: alias.to_string(),
            field: ResultField::main(field, Domain::Items),
        };
        let assembler = RowAssembler::new(
            Domain::Items,
            vec![
                column("itemRepo", PhysicalField::ItemRepo),
                column("itemPath", PhysicalField::ItemPath),
                column("itemName", PhysicalField::ItemName),
            ],
        );
        (LazyResult::new(Box::new(cursor), assembler, action), closes)
    }

    #[test]
    fn test_reads_merged_rows_on_demand() {
        let (mut result, closes) = lazy(&["a", "a", "b"], Box::new(FindAction::new()));
        let first = result.next().unwrap().unwrap();
        assert_eq!(first.get_str(PhysicalField::ItemName), Some("a"));
        let second = result.next().unwrap().unwrap();
        assert_eq!(second.get_str(PhysicalField::ItemName), Some("b"));
        assert!(result.next().is_none());
        result.close().unwrap();
        result.close().unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(result.next().is_none());
    }

    #[test]
    fn test_drop_closes_cursor() {
        let (result, closes) = lazy(&["a"], Box::new(FindAction::new()));
        drop(result);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_closes_on_error() {
        let (result, closes) = lazy(&["a", "b"], Box::new(FindAction::new()));
        let outcome: EngineResult<()> = result.scoped(|rows| {
            rows.next();
            Err(EngineError::Execution("stop".into()))
        });
        assert!(outcome.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_rows_are_skipped() {
        let recorder = Recorder::failing();
        let mut delete = DeleteAction::new(recorder.clone(), recorder.clone());
        delete.set_dry_run(false);
        let (result, _) = lazy(&["a", "b"], Box::new(delete));
        let count = result.scoped(|rows| Ok(rows.count())).unwrap();
        assert_eq!(count, 0);
        assert_eq!(recorder.calls().len(), 2);
    }
}
