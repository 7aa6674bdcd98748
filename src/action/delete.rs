use std::sync::Arc;

use aql_core::Domain;

use super::{ActionFailure, AqlAction};
use crate::capability::{AuthorizationProvider, MutationStatus, RepositoryMutator};
use crate::row::Row;

/// Deletes the item a row points at.
///
/// In dry-run mode only the delete permission is checked.
pub struct DeleteAction {
    authorization: Arc<dyn AuthorizationProvider>,
    mutator: Arc<dyn RepositoryMutator>,
    dry_run: bool,
}

impl DeleteAction {
    pub fn new(
        authorization: Arc<dyn AuthorizationProvider>,
        mutator: Arc<dyn RepositoryMutator>,
    ) -> Self {
        Self {
            authorization,
            mutator,
            dry_run: true,
        }
    }
}

impl AqlAction for DeleteAction {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn supports_domain(&self, domain: Domain) -> bool {
        domain == Domain::Items
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
        let path = row
            .repo_path()
            .ok_or_else(|| ActionFailure::unexpected("delete requires item repo, path and name"))?;

        if self.dry_run {
            if !self.authorization.can_delete(&path) {
                return Err(ActionFailure::failed(format!("no delete permission on {}", path)));
            }
        } else if let MutationStatus::Error(message) = self.mutator.undeploy(&path) {
            return Err(ActionFailure::failed(format!("failed to delete {}: {}", path, message)));
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_support::{item, property, Recorder};
    use crate::action::ActionFailureReason;

    fn delete(recorder: &Arc<Recorder>, dry_run: bool) -> DeleteAction {
        let mut action = DeleteAction::new(recorder.clone(), recorder.clone());
        action.set_dry_run(dry_run);
        action
    }

    #[test]
    fn test_dry_run_checks_permission_only() {
        let recorder = Recorder::allowing();
        let row = item("libs", "org", "a.jar");
        assert!(delete(&recorder, true).apply(row).is_ok());
        assert_eq!(recorder.calls(), vec!["can_delete libs:org/a.jar"]);

        let recorder = Recorder::denying();
        let failure = delete(&recorder, true).apply(item("libs", ".", "a.jar")).unwrap_err();
        assert_eq!(failure.reason, ActionFailureReason::ActionFailed);
        assert!(recorder.calls().iter().all(|c| !c.starts_with("undeploy")));
    }

    #[test]
    fn test_live_run_undeploys() {
        let recorder = Recorder::allowing();
        assert!(delete(&recorder, false).apply(item("libs", ".", "a.jar")).is_ok());
        assert_eq!(recorder.calls(), vec!["undeploy libs:a.jar"]);

        let recorder = Recorder::failing();
        let failure = delete(&recorder, false).apply(item("libs", ".", "a.jar")).unwrap_err();
        assert_eq!(failure.reason, ActionFailureReason::ActionFailed);
        assert!(failure.message.contains("locked"));
    }

    #[test]
    fn test_rejects_other_domains_and_partial_rows() {
        let recorder = Recorder::allowing();
        let failure = delete(&recorder, false)
            .apply(property("k", "v", Vec::new()))
            .unwrap_err();
        assert_eq!(failure.reason, ActionFailureReason::UnsupportedForDomain);

        let failure = delete(&recorder, false)
            .apply(Row::new(Domain::Items))
            .unwrap_err();
        assert_eq!(failure.reason, ActionFailureReason::UnexpectedContent);
        assert!(recorder.calls().is_empty());
    }
}
