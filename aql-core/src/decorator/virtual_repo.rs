use crate::error::{AqlError, AqlResult};
use crate::model::{AqlQuery, AqlValue, Comparator, Criterion, CriterionKind, QueryElement};
use crate::registry::PhysicalField;
use crate::util::{dedup_in_order, wildcard_regex};

use super::{join_criteria, DecorationStrategy, DecoratorContext, RepoResolver};

/// Rewrites repository criteria so virtual repositories cover the repositories they aggregate.
pub struct VirtualRepoDecorator;

impl DecorationStrategy for VirtualRepoDecorator {
    fn name(&self) -> &'static str {
        "virtual-repo"
    }

    fn decorate(&self, query: &mut AqlQuery, ctx: &DecoratorContext<'_>) -> AqlResult<()> {
        let virtual_keys = ctx.repos.virtual_repo_keys();
        if virtual_keys.is_empty() {
            return Ok(());
        }

        let mut elements = Vec::with_capacity(query.elements.len());
        for element in std::mem::take(&mut query.elements) {
            match element {
                QueryElement::Criterion(c) if is_repo_criterion(&c) => {
                    elements.extend(expand(c, &virtual_keys, ctx.repos)?);
                }
                other => elements.push(other),
            }
        }
        query.elements = elements;
        Ok(())
    }
}

fn is_repo_criterion(criterion: &Criterion) -> bool {
    criterion.kind == CriterionKind::Simple
        && criterion.field() == Some(PhysicalField::ItemRepo)
        && matches!(criterion.value(), Some(AqlValue::String(_)))
}

fn local_repos<'a>(keys: impl Iterator<Item = &'a String>, repos: &dyn RepoResolver) -> Vec<String> {
    dedup_in_order(keys.flat_map(|k| repos.resolve_virtual(k)))
}

fn selected(keys: &[String], repos: &dyn RepoResolver, pred: impl Fn(&str) -> bool) -> Vec<String> {
    local_repos(keys.iter().filter(|k| pred(k.as_str())), repos)
}

/// `( original $op eq r1 $op eq r2 ... )`
fn widen(
    original: Criterion,
    locals: Vec<String>,
    joiner: QueryElement,
    comparator: Comparator,
) -> Vec<QueryElement> {
    let mut elements = vec![
        QueryElement::OpenParenthesis,
        QueryElement::Criterion(original.clone()),
    ];
    for repo in locals {
        elements.push(joiner.clone());
        elements.push(QueryElement::Criterion(
            original.with(comparator, AqlValue::String(repo)),
        ));
    }
    elements.push(QueryElement::CloseParenthesis);
    elements
}

fn expand(
    criterion: Criterion,
    virtual_keys: &[String],
    repos: &dyn RepoResolver,
) -> AqlResult<Vec<QueryElement>> {
    let key = criterion
        .value()
        .and_then(AqlValue::as_str)
        .unwrap_or_default()
        .to_string();

    let (locals, replace) = match criterion.comparator {
        Comparator::Equals | Comparator::NotEquals => {
            if !virtual_keys.contains(&key) {
                return Ok(vec![QueryElement::Criterion(criterion)]);
            }
            (local_repos(std::iter::once(&key), repos), true)
        }
        Comparator::Matches | Comparator::NotMatches => {
            let re = wildcard_regex(&key)
                .map_err(|e| AqlError::InvalidValue(format!("bad pattern {}: {}", key, e)))?;
            (selected(virtual_keys, repos, |k| re.is_match(k)), false)
        }
        Comparator::Greater => (selected(virtual_keys, repos, |k| k > key.as_str()), false),
        Comparator::GreaterEquals => (selected(virtual_keys, repos, |k| k >= key.as_str()), false),
        Comparator::Less => (selected(virtual_keys, repos, |k| k < key.as_str()), false),
        Comparator::LessEquals => (selected(virtual_keys, repos, |k| k <= key.as_str()), false),
        Comparator::Last | Comparator::Before => {
            return Ok(vec![QueryElement::Criterion(criterion)]);
        }
    };

    if locals.is_empty() {
        return Ok(vec![QueryElement::Criterion(criterion)]);
    }

    let elements = match (criterion.comparator, replace) {
        // The virtual repository itself holds nothing: replace it by its members.
        (Comparator::Equals, true) => join_criteria(
            locals
                .into_iter()
                .map(|r| criterion.with(Comparator::Equals, AqlValue::String(r)))
                .collect(),
            QueryElement::Or,
        ),
        (Comparator::NotEquals, true) => join_criteria(
            locals
                .into_iter()
                .map(|r| criterion.with(Comparator::NotEquals, AqlValue::String(r)))
                .collect(),
            QueryElement::And,
        ),
        (Comparator::NotMatches, _) => {
            widen(criterion, locals, QueryElement::And, Comparator::NotEquals)
        }
        _ => widen(criterion, locals, QueryElement::Or, Comparator::Equals),
    };
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorator::test_support::repo;
    use crate::decorator::{ReadScope, StaticRepoResolver, TrashcanSettings};
    use crate::domain::Domain;

    fn provider() -> StaticRepoResolver {
        StaticRepoResolver::new()
            .with_virtual("u-repo", ["repo3"])
            .with_virtual("v-repo", ["repo1", "repo2"])
            .with_virtual("w-repo", ["repo4"])
    }

    fn decorate(resolver: &StaticRepoResolver, elements: Vec<QueryElement>) -> String {
        let mut query = AqlQuery::new(Domain::Items);
        query.elements = elements;
        let ctx = DecoratorContext {
            repos: resolver,
            read_scope: ReadScope::Unrestricted,
            trashcan: TrashcanSettings::disabled(),
        };
        VirtualRepoDecorator.decorate(&mut query, &ctx).unwrap();
        query.describe()
    }

    #[test]
    fn test_matches_virtual_repos() {
        let resolver = StaticRepoResolver::new()
            .with_virtual("v-repo", ["repo1", "repo2"])
            .with_virtual("other-v-repo", ["repo3"]);
        assert_eq!(
            decorate(&resolver, vec![repo(Comparator::Matches, "v*")]),
            "( item.repo $match v* $or item.repo $eq repo1 $or item.repo $eq repo2 )"
        );
    }

    #[test]
    fn test_greater() {
        assert_eq!(
            decorate(&provider(), vec![repo(Comparator::Greater, "v-repo")]),
            "( item.repo $gt v-repo $or item.repo $eq repo4 )"
        );
    }

    #[test]
    fn test_greater_equals() {
        assert_eq!(
            decorate(&provider(), vec![repo(Comparator::GreaterEquals, "v-repo")]),
            "( item.repo $gte v-repo $or item.repo $eq repo1 $or item.repo $eq repo2 $or item.repo $eq repo4 )"
        );
    }

    #[test]
    fn test_less() {
        assert_eq!(
            decorate(&provider(), vec![repo(Comparator::Less, "v-repo")]),
            "( item.repo $lt v-repo $or item.repo $eq repo3 )"
        );
    }

    #[test]
    fn test_less_equals() {
        assert_eq!(
            decorate(&provider(), vec![repo(Comparator::LessEquals, "v-repo")]),
            "( item.repo $lte v-repo $or item.repo $eq repo3 $or item.repo $eq repo1 $or item.repo $eq repo2 )"
        );
    }

    #[test]
    fn test_not_equals_drops_virtual() {
        assert_eq!(
            decorate(&provider(), vec![repo(Comparator::NotEquals, "v-repo")]),
            "( item.repo $ne repo1 $and item.repo $ne repo2 )"
        );
    }

    #[test]
    fn test_not_matches() {
        assert_eq!(
            decorate(&provider(), vec![repo(Comparator::NotMatches, "v*")]),
            "( item.repo $nmatch v* $and item.repo $ne repo1 $and item.repo $ne repo2 )"
        );
    }

    #[test]
    fn test_equals_single_member_in_place() {
        assert_eq!(
            decorate(&provider(), vec![repo(Comparator::Equals, "u-repo")]),
            "item.repo $eq repo3"
        );
    }

    #[test]
    fn test_equals_keeps_surrounding_operators() {
        let elements = vec![
            repo(Comparator::Equals, "v-repo"),
            QueryElement::And,
            repo(Comparator::NotEquals, "local"),
        ];
        assert_eq!(
            decorate(&provider(), elements),
            "( item.repo $eq repo1 $or item.repo $eq repo2 ) $and item.repo $ne local"
        );
    }

    #[test]
    fn test_non_virtual_untouched() {
        assert_eq!(
            decorate(&provider(), vec![repo(Comparator::Equals, "libs")]),
            "item.repo $eq libs"
        );
        assert_eq!(
            decorate(&provider(), vec![repo(Comparator::Matches, "x*")]),
            "item.repo $match x*"
        );
    }
}
