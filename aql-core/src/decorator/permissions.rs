use crate::domain::Domain;
use crate::error::AqlResult;
use crate::model::{AqlQuery, AqlValue, Comparator, Criterion, QueryElement};
use crate::registry::{PhysicalField, SqlTable, SqlTableName};

use super::{and_with, join_criteria, next_table_id, DecorationStrategy, DecoratorContext, ReadScope};

/// Restricts item-bearing domains to repositories the principal may read.
///
/// An empty readable set yields a query that matches nothing.
pub struct PermissionsDecorator;

impl DecorationStrategy for PermissionsDecorator {
    fn name(&self) -> &'static str {
        "permissions"
    }

    fn decorate(&self, query: &mut AqlQuery, ctx: &DecoratorContext<'_>) -> AqlResult<()> {
        let repos = match &ctx.read_scope {
            ReadScope::Unrestricted => return Ok(()),
            ReadScope::Repos(repos) => repos,
        };

        let (sub_domains, table) = match query.domain {
            Domain::Items => (vec![Domain::Items], SqlTable::main(SqlTableName::Nodes)),
            Domain::Properties | Domain::Statistics => (
                vec![query.domain, Domain::Items],
                SqlTable::new(SqlTableName::Nodes, next_table_id(query)),
            ),
            _ => return Ok(()),
        };

        let extra = if repos.is_empty() {
            vec![QueryElement::Criterion(Criterion::never(
                vec![query.domain],
                SqlTable::main(query.domain.primary_table()),
            ))]
        } else {
            let criteria = repos
                .iter()
                .map(|repo| {
                    Criterion::simple(
                        sub_domains.clone(),
                        PhysicalField::ItemRepo,
                        table,
                        Comparator::Equals,
                        AqlValue::String(repo.clone()),
                    )
                })
                .collect();
            join_criteria(criteria, QueryElement::Or)
        };

        and_with(query, extra);
        Ok(())
    }
}
