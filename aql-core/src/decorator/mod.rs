//! Query rewrites applied after adaptation and before SQL generation.
//!
//! Decorators run in a fixed order: default item type, trashcan exclusion,
//! virtual repository expansion and permission scoping.

mod default_type;
mod permissions;
mod trashcan;
mod virtual_repo;

pub use default_type::DefaultItemTypeDecorator;
pub use permissions::PermissionsDecorator;
pub use trashcan::{TrashcanDecorator, TrashcanSettings};
pub use virtual_repo::VirtualRepoDecorator;

use std::collections::HashMap;

use tracing::debug;

use crate::error::AqlResult;
use crate::model::{AqlQuery, Criterion, QueryElement};
use crate::registry::MINIMAL_DYNAMIC_TABLE_ID;

/// Resolves virtual repositories into the local and cache repositories they aggregate.
pub trait RepoResolver: Send + Sync {
    fn virtual_repo_keys(&self) -> Vec<String>;

    fn resolve_virtual(&self, key: &str) -> Vec<String>;
}

/// A resolver with no virtual repositories.
#[derive(Debug, Default, Clone)]
pub struct NoVirtualRepos;

impl RepoResolver for NoVirtualRepos {
    fn virtual_repo_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn resolve_virtual(&self, _key: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Fixed virtual repository table, keyed by virtual repository.
#[derive(Debug, Default, Clone)]
pub struct StaticRepoResolver {
    repos: Vec<(String, Vec<String>)>,
}

impl StaticRepoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_virtual<I, S>(mut self, key: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repos
            .push((key.to_string(), members.into_iter().map(Into::into).collect()));
        self
    }
}

impl From<HashMap<String, Vec<String>>> for StaticRepoResolver {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        let mut repos: Vec<_> = map.into_iter().collect();
        repos.sort();
        Self { repos }
    }
}

impl RepoResolver for StaticRepoResolver {
    fn virtual_repo_keys(&self) -> Vec<String> {
        self.repos.iter().map(|(k, _)| k.clone()).collect()
    }

    fn resolve_virtual(&self, key: &str) -> Vec<String> {
        self.repos
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, members)| members.clone())
            .unwrap_or_default()
    }
}

/// Repositories the current principal may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadScope {
    Unrestricted,
    Repos(Vec<String>),
}

/// Capabilities and settings available to decorators.
pub struct DecoratorContext<'a> {
    pub repos: &'a dyn RepoResolver,
    pub read_scope: ReadScope,
    pub trashcan: TrashcanSettings,
}

pub trait DecorationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn decorate(&self, query: &mut AqlQuery, ctx: &DecoratorContext<'_>) -> AqlResult<()>;
}

/// Runs decoration strategies in order.
pub struct DecoratorPipeline {
    strategies: Vec<Box<dyn DecorationStrategy>>,
}

impl Default for DecoratorPipeline {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(DefaultItemTypeDecorator),
                Box::new(TrashcanDecorator),
                Box::new(VirtualRepoDecorator),
                Box::new(PermissionsDecorator),
            ],
        }
    }
}

impl DecoratorPipeline {
    pub fn new(strategies: Vec<Box<dyn DecorationStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn decorate(&self, query: &mut AqlQuery, ctx: &DecoratorContext<'_>) -> AqlResult<()> {
        for strategy in &self.strategies {
            let before = query.elements.len();
            strategy.decorate(query, ctx)?;
            if query.elements.len() != before {
                debug!(
                    decorator = strategy.name(),
                    elements = %query.describe(),
                    "Decorated AQL query"
                );
            }
        }
        Ok(())
    }
}

/// `( existing ) AND extra`, or just `extra` when there is nothing to wrap.
pub(crate) fn and_with(query: &mut AqlQuery, extra: Vec<QueryElement>) {
    if extra.is_empty() {
        return;
    }
    if query.elements.is_empty() {
        query.elements = extra;
        return;
    }
    let mut elements = Vec::with_capacity(query.elements.len() + extra.len() + 3);
    elements.push(QueryElement::OpenParenthesis);
    elements.append(&mut query.elements);
    elements.push(QueryElement::CloseParenthesis);
    elements.push(QueryElement::And);
    elements.extend(extra);
    query.elements = elements;
}

/// Join criteria with an operator, parenthesized when there is more than one.
pub(crate) fn join_criteria(criteria: Vec<Criterion>, operator: QueryElement) -> Vec<QueryElement> {
    if criteria.len() == 1 {
        return criteria.into_iter().map(QueryElement::Criterion).collect();
    }
    let mut elements = vec![QueryElement::OpenParenthesis];
    for (i, criterion) in criteria.into_iter().enumerate() {
        if i > 0 {
            elements.push(operator.clone());
        }
        elements.push(QueryElement::Criterion(criterion));
    }
    elements.push(QueryElement::CloseParenthesis);
    elements
}

/// A dynamic table id not used by any criterion of the query.
pub(crate) fn next_table_id(query: &AqlQuery) -> u32 {
    query
        .criteria()
        .map(|c| c.table1.id + 1)
        .max()
        .unwrap_or(MINIMAL_DYNAMIC_TABLE_ID)
        .max(MINIMAL_DYNAMIC_TABLE_ID)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::Domain;
    use crate::model::{AqlValue, Comparator, Criterion, QueryElement};
    use crate::registry::{PhysicalField, SqlTable, SqlTableName};

    pub fn repo(comparator: Comparator, value: &str) -> QueryElement {
        QueryElement::Criterion(Criterion::simple(
            vec![Domain::Items],
            PhysicalField::ItemRepo,
            SqlTable::main(SqlTableName::Nodes),
            comparator,
            AqlValue::String(value.to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::repo;
    use super::*;
    use crate::domain::Domain;
    use crate::model::Comparator;

    #[test]
    fn test_and_with_wraps_existing() {
        let mut query = AqlQuery::new(Domain::Items);
        query.elements = vec![
            repo(Comparator::Equals, "a"),
            QueryElement::Or,
            repo(Comparator::Equals, "b"),
        ];
        and_with(&mut query, vec![repo(Comparator::NotEquals, "c")]);
        assert_eq!(
            query.describe(),
            "( item.repo $eq a $or item.repo $eq b ) $and item.repo $ne c"
        );
    }

    #[test]
    fn test_and_with_on_empty_query() {
        let mut query = AqlQuery::new(Domain::Items);
        and_with(&mut query, vec![repo(Comparator::Equals, "a")]);
        assert_eq!(query.describe(), "item.repo $eq a");
    }

    #[test]
    fn test_static_resolver() {
        let resolver = StaticRepoResolver::new().with_virtual("v", ["r1", "r2"]);
        assert_eq!(resolver.virtual_repo_keys(), vec!["v"]);
        assert_eq!(resolver.resolve_virtual("v"), vec!["r1", "r2"]);
        assert!(resolver.resolve_virtual("x").is_empty());
    }
}
