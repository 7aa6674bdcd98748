use tracing::debug;

use crate::api::{AqlApi, Clause};
use crate::context::AdapterContext;
use crate::error::AqlResult;
use crate::model::{AqlQuery, Operator};

use super::{apply_action, apply_includes, apply_paging, apply_sort, build_criterion};

/// Converts a fluent [`AqlApi`] query into an [`AqlQuery`].
#[derive(Debug, Default)]
pub struct ApiToAqlAdapter;

impl ApiToAqlAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn adapt(&self, api: &AqlApi) -> AqlResult<AqlQuery> {
        let mut ctx = AdapterContext::new(api.domain);
        ctx.set_action(api.action.clone());
        apply_paging(&mut ctx, api.offset, api.limit)?;

        for clause in &api.filters {
            self.visit(&mut ctx, clause)?;
        }

        apply_includes(ctx.query_mut(), &api.includes)?;
        apply_action(ctx.query_mut())?;
        if let Some((sort_type, fields)) = &api.sort {
            apply_sort(&mut ctx, *sort_type, fields)?;
        }
        let query = ctx.finish()?;

        debug!(domain = %query.domain, elements = %query.describe(), "Adapted AQL api query");
        Ok(query)
    }

    fn visit(&self, ctx: &mut AdapterContext, clause: &Clause) -> AqlResult<()> {
        let (operator, members) = match clause {
            Clause::Criterion {
                path,
                comparator,
                value,
            } => {
                let criterion = build_criterion(ctx, path, *comparator, value)?;
                ctx.add_criterion(criterion);
                return Ok(());
            }
            Clause::And(members) => (Operator::And, members),
            Clause::Or(members) => (Operator::Or, members),
            Clause::Msp(members) => (Operator::Msp, members),
        };

        ctx.open_clause(operator);
        for member in members {
            self.visit(ctx, member)?;
        }
        ctx.close_clause()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ParserToAqlAdapter;
    use crate::api::{and, field, msp, or, property};
    use crate::error::AqlError;
    use crate::model::{ActionKind, SortType};

    #[test]
    fn test_api_matches_text() {
        let api = AqlApi::items()
            .filter(or([field("repo").equal("a"), field("repo").equal("b")]))
            .include(["name"])
            .sort_by(SortType::Asc, ["name"])
            .limit(3);
        let from_api = ApiToAqlAdapter::new().adapt(&api).unwrap();
        let from_text = ParserToAqlAdapter::new()
            .compile(
                r#"items.find({"$or":[{"repo":"a"},{"repo":"b"}]}).include("name").sort({"$asc":["name"]}).limit(3)"#,
            )
            .unwrap();
        assert_eq!(from_api, from_text);
    }

    #[test]
    fn test_nested_clauses() {
        let api = AqlApi::items().filter(and([
            field("type").equal("file"),
            or([property("license").equal("GPL"), property("license").equal("MIT")]),
        ]));
        let query = ApiToAqlAdapter::new().adapt(&api).unwrap();
        assert_eq!(
            query.describe(),
            "( item.type $eq file $and ( license $eq GPL $or license $eq MIT ) )"
        );
    }

    #[test]
    fn test_empty_clauses_vanish() {
        let api = AqlApi::items().filter(and([])).filter(field("repo").equal("a"));
        let query = ApiToAqlAdapter::new().adapt(&api).unwrap();
        assert_eq!(query.describe(), "item.repo $eq a");
    }

    #[test]
    fn test_msp_and_actions() {
        let api = AqlApi::items()
            .filter(msp([
                property("license").matches("*GPL*"),
                property("license").not_equal("LGPL"),
            ]))
            .delete()
            .dry_run(true);
        let query = ApiToAqlAdapter::new().adapt(&api).unwrap();
        assert_eq!(query.action.kind, ActionKind::Delete);
        let ids: Vec<_> = query.criteria().map(|c| c.table1.id).collect();
        assert_eq!(ids[0], ids[1]);

        let api = AqlApi::builds().update_property(["k"], Some("v"));
        assert!(matches!(
            ApiToAqlAdapter::new().adapt(&api),
            Err(AqlError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_relative_time_overflow() {
        let api = AqlApi::items().filter(field("modified").last("999999999999999999y"));
        assert!(matches!(
            ApiToAqlAdapter::new().adapt(&api),
            Err(AqlError::InvalidValue(_))
        ));
        let api = AqlApi::items().filter(field("modified").last("2d"));
        assert!(ApiToAqlAdapter::new().adapt(&api).is_ok());
    }
}
