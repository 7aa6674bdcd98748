use std::sync::Arc;

use aql_core::Domain;

use super::{ActionFailure, AqlAction};
use crate::capability::{AuthorizationProvider, PropertyEditor};
use crate::row::{RepoPath, Row};

/// Sets the configured property keys on the items a property row belongs to.
pub struct UpdatePropertyAction {
    authorization: Arc<dyn AuthorizationProvider>,
    editor: Arc<dyn PropertyEditor>,
    keys: Vec<String>,
    new_value: Option<String>,
    dry_run: bool,
}

impl UpdatePropertyAction {
    pub fn new(
        authorization: Arc<dyn AuthorizationProvider>,
        editor: Arc<dyn PropertyEditor>,
        keys: Vec<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            authorization,
            editor,
            keys,
            new_value,
            dry_run: true,
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The row's own path, or the paths of its nested items.
    fn target_paths(row: &Row) -> Vec<RepoPath> {
        match row.repo_path() {
            Some(path) => vec![path],
            None => row
                .children_of(Domain::Items)
                .filter_map(Row::repo_path)
                .collect(),
        }
    }
}

impl AqlAction for UpdatePropertyAction {
    fn name(&self) -> &'static str {
        "update"
    }

    fn supports_domain(&self, domain: Domain) -> bool {
        domain == Domain::Properties
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    fn apply(&self, row: Row) -> Result<Row, ActionFailure> {
        if !self.supports_domain(row.domain()) {
            return Err(ActionFailure::unsupported(self.name(), row.domain()));
        }
        if self.keys.is_empty() {
            return Err(ActionFailure::unexpected("update requires at least one property key"));
        }

        let paths = Self::target_paths(&row);
        if paths.is_empty() {
            return Err(ActionFailure::unexpected("property row carries no item path"));
        }

        let value = self.new_value.as_deref();
        for path in &paths {
            if self.dry_run {
                if !self.authorization.can_annotate(path) {
                    return Err(ActionFailure::failed(format!(
                        "no annotate permission on {}",
                        path
                    )));
                }
                continue;
            }
            for key in &self.keys {
                self.editor.edit_property(path, key, value).map_err(|e| {
                    ActionFailure::failed(format!(
                        "failed to set {} to '{}' on {}: {}",
                        key,
                        value.unwrap_or(""),
                        path,
                        e
                    ))
                })?;
            }
        }
        Ok(row)
    }
}
