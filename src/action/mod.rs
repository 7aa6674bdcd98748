//! Row actions applied while results are read.
//!
//! Every query carries one action. Rows are processed one at a time; a failed
//! row is dropped from the results and earlier rows keep their effects.

mod delete;
mod find;
mod update_property;

pub use delete::DeleteAction;
pub use find::FindAction;
pub use update_property::UpdatePropertyAction;

use std::sync::Arc;

use aql_core::{ActionKind, ActionSpec, Domain};
use thiserror::Error;

use crate::capability::{AuthorizationProvider, PropertyEditor, RepositoryMutator};
use crate::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFailureReason {
    /// A downstream capability failed or denied the operation
    ActionFailed,
    UnsupportedForDomain,
    /// The row or the action parameters lack what the action needs
    UnexpectedContent,
}

impl std::fmt::Display for ActionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionFailureReason::ActionFailed => f.write_str("Action failed"),
            ActionFailureReason::UnsupportedForDomain => f.write_str("Unsupported for domain"),
            ActionFailureReason::UnexpectedContent => f.write_str("Unexpected content"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}: {message}")]
pub struct ActionFailure {
    pub reason: ActionFailureReason,
    pub message: String,
}

impl ActionFailure {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            reason: ActionFailureReason::ActionFailed,
            message: message.into(),
        }
    }

    pub fn unsupported(action: &str, domain: Domain) -> Self {
        Self {
            reason: ActionFailureReason::UnsupportedForDomain,
            message: format!("{} is not supported for {}", action, domain),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self {
            reason: ActionFailureReason::UnexpectedContent,
            message: message.into(),
        }
    }
}

pub trait AqlAction: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports_domain(&self, domain: Domain) -> bool;

    fn is_dry_run(&self) -> bool;

    fn set_dry_run(&mut self, dry_run: bool);

    fn apply(&self, row: Row) -> Result<Row, ActionFailure>;
}

/// Capabilities actions call into.
#[derive(Clone)]
pub struct ActionCapabilities {
    pub authorization: Arc<dyn AuthorizationProvider>,
    pub mutator: Arc<dyn RepositoryMutator>,
    pub editor: Arc<dyn PropertyEditor>,
}

/// Instantiate the action a query asks for. Unset dry-run falls back to `dry_run_default`.
pub fn create_action(
    spec: &ActionSpec,
    capabilities: &ActionCapabilities,
    dry_run_default: bool,
) -> Box<dyn AqlAction> {
    let mut action: Box<dyn AqlAction> = match spec.kind {
        ActionKind::Find => Box::new(FindAction::new()),
        ActionKind::Delete => Box::new(DeleteAction::new(
            capabilities.authorization.clone(),
            capabilities.mutator.clone(),
        )),
        ActionKind::UpdateProperty => Box::new(UpdatePropertyAction::new(
            capabilities.authorization.clone(),
            capabilities.editor.clone(),
            spec.keys.clone(),
            spec.new_value.clone(),
        )),
    };
    action.set_dry_run(spec.dry_run.unwrap_or(dry_run_default));
    action
}
