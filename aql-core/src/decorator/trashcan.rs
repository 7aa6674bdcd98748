use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::AqlResult;
use crate::model::{AqlQuery, AqlValue, Comparator, Criterion, CriterionKind, QueryElement};
use crate::registry::{PhysicalField, SqlTable, SqlTableName};

use super::{and_with, DecorationStrategy, DecoratorContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrashcanSettings {
    pub enabled: bool,
    pub repo_key: String,
    pub trash_time_key: String,
}

impl Default for TrashcanSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            repo_key: "auto-trashcan".to_string(),
            trash_time_key: "trash.time".to_string(),
        }
    }
}

impl TrashcanSettings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Hides trashcan content unless the query explicitly asks for the trashcan repository.
pub struct TrashcanDecorator;

impl DecorationStrategy for TrashcanDecorator {
    fn name(&self) -> &'static str {
        "trashcan"
    }

    fn decorate(&self, query: &mut AqlQuery, ctx: &DecoratorContext<'_>) -> AqlResult<()> {
        let settings = &ctx.trashcan;
        if !settings.enabled || query.elements.is_empty() {
            return Ok(());
        }

        let criterion = match query.domain {
            Domain::Items => {
                let targets_repo = query.criteria().any(|c| {
                    c.kind == CriterionKind::Simple
                        && c.field() == Some(PhysicalField::ItemRepo)
                        && c.comparator == Comparator::Equals
                });
                if targets_repo {
                    return Ok(());
                }
                Criterion::simple(
                    vec![Domain::Items],
                    PhysicalField::ItemRepo,
                    SqlTable::main(SqlTableName::Nodes),
                    Comparator::NotEquals,
                    AqlValue::String(settings.repo_key.clone()),
                )
            }
            Domain::Properties => Criterion::simple(
                vec![Domain::Properties],
                PhysicalField::PropertyKey,
                SqlTable::main(SqlTableName::NodeProps),
                Comparator::NotEquals,
                AqlValue::String(settings.trash_time_key.clone()),
            ),
            _ => return Ok(()),
        };

        and_with(query, vec![QueryElement::Criterion(criterion)]);
        Ok(())
    }
}
