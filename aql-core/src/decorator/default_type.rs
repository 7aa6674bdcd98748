use crate::domain::Domain;
use crate::error::AqlResult;
use crate::model::{AqlQuery, AqlValue, Comparator, Criterion, ItemType, QueryElement};
use crate::registry::{PhysicalField, SqlTable, SqlTableName};

use super::{and_with, DecorationStrategy, DecoratorContext};

/// Restricts item queries to files unless the query names an item type itself.
///
/// `type: "any"` stays in the query and matches both files and folders.
pub struct DefaultItemTypeDecorator;

impl DecorationStrategy for DefaultItemTypeDecorator {
    fn name(&self) -> &'static str {
        "default-item-type"
    }

    fn decorate(&self, query: &mut AqlQuery, _ctx: &DecoratorContext<'_>) -> AqlResult<()> {
        if query.domain != Domain::Items {
            return Ok(());
        }
        let has_type = query.criteria().any(|c| {
            c.field() == Some(PhysicalField::ItemType) && c.sub_domains == [Domain::Items]
        });
        if has_type {
            return Ok(());
        }

        let criterion = Criterion::simple(
            vec![Domain::Items],
            PhysicalField::ItemType,
            SqlTable::main(SqlTableName::Nodes),
            Comparator::Equals,
            AqlValue::ItemType(ItemType::File),
        );
        and_with(query, vec![QueryElement::Criterion(criterion)]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ParserToAqlAdapter;
    use crate::decorator::{NoVirtualRepos, ReadScope, TrashcanSettings};

    fn decorate(text: &str) -> AqlQuery {
        let mut query = ParserToAqlAdapter::new().compile(text).unwrap();
        let ctx = DecoratorContext {
            repos: &NoVirtualRepos,
            read_scope: ReadScope::Unrestricted,
            trashcan: TrashcanSettings::disabled(),
        };
        DefaultItemTypeDecorator.decorate(&mut query, &ctx).unwrap();
        query
    }

    #[test]
    fn test_adds_file_type() {
        assert_eq!(decorate("items.find()").describe(), "item.type $eq file");
        assert_eq!(
            decorate(r#"items.find({"repo":"a"})"#).describe(),
            "( item.repo $eq a ) $and item.type $eq file"
        );
    }

    #[test]
    fn test_explicit_type_is_kept() {
        assert_eq!(
            decorate(r#"items.find({"type":"any"})"#).describe(),
            "item.type $eq any"
        );
        assert_eq!(
            decorate(r#"items.find({"type":"folder"})"#).describe(),
            "item.type $eq folder"
        );
    }

    #[test]
    fn test_other_domains_untouched() {
        assert_eq!(decorate("builds.find()").describe(), "");
    }
}
