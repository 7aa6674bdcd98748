use aql_core::Domain;

use super::{ActionFailure, AqlAction};
use crate::row::Row;

/// Returns rows unchanged.
#[derive(Debug, Default)]
pub struct FindAction {
    dry_run: bool,
}

impl FindAction {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AqlAction for FindAction {
    fn name(&self) -> &'static str {
        "find"
    }

    fn supports_domain(&self, _domain: Domain) -> bool {
        true
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    fn apply(&self, row: Row) -> Result<Row, ActionFailure> {
        Ok(row)
    }
}
