//! Postgres-only rewrite of property value criteria.
//!
//! Postgres indexes `node_props.prop_value` by its first 255 characters, so
//! equality on property values compares that prefix. Values at least 255
//! characters long additionally keep the full comparison.

use tracing::debug;

use crate::model::{AqlQuery, AqlValue, Comparator, CriterionKind, QueryElement, Variable};
use crate::registry::{PhysicalField, SqlTableName};

/// Length of the indexed `prop_value` prefix.
pub const PROPERTY_VALUE_PREFIX: usize = 255;

#[derive(Debug, Default)]
pub struct PostgresPropertySubStringOptimization;

impl PostgresPropertySubStringOptimization {
    pub fn optimize(&self, query: &mut AqlQuery) {
        let mut changed = false;
        let mut elements = Vec::with_capacity(query.elements.len());

        for element in std::mem::take(&mut query.elements) {
            let criterion = match element {
                QueryElement::Criterion(c) => c,
                other => {
                    elements.push(other);
                    continue;
                }
            };

            let eligible_comparator =
                matches!(criterion.comparator, Comparator::Equals | Comparator::NotEquals);
            let kind = match criterion.kind {
                CriterionKind::SimpleProperty
                    if criterion.field() == Some(PhysicalField::PropertyValue) =>
                {
                    Some(CriterionKind::PostgresSimpleProperty)
                }
                CriterionKind::ComplexProperty => Some(CriterionKind::PostgresComplexProperty),
                _ => None,
            };
            let value_len = match criterion.value() {
                Some(AqlValue::String(s)) => Some(s.chars().count()),
                _ => None,
            };

            let (kind, value_len) = match (kind, value_len) {
                (Some(kind), Some(len))
                    if eligible_comparator && criterion.table1.name == SqlTableName::NodeProps =>
                {
                    (kind, len)
                }
                _ => {
                    elements.push(QueryElement::Criterion(criterion));
                    continue;
                }
            };

            changed = true;
            let mut optimized = criterion.clone();
            optimized.kind = kind;

            if criterion.comparator == Comparator::Equals && value_len >= PROPERTY_VALUE_PREFIX {
                let mut exact = criterion.clone();
                if criterion.kind == CriterionKind::ComplexProperty {
                    exact.kind = CriterionKind::SimpleProperty;
                    exact.variable1 = Variable::Field(PhysicalField::PropertyValue);
                }
                elements.push(QueryElement::OpenParenthesis);
                elements.push(QueryElement::Criterion(optimized));
                elements.push(QueryElement::And);
                elements.push(QueryElement::Criterion(exact));
                elements.push(QueryElement::CloseParenthesis);
            } else {
                elements.push(QueryElement::Criterion(optimized));
            }
        }

        query.elements = elements;
        if changed {
            debug!(elements = %query.describe(), "Applied Postgres property prefix optimization");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ParserToAqlAdapter;

    fn optimize(text: &str) -> AqlQuery {
        let mut query = ParserToAqlAdapter::new().compile(text).unwrap();
        PostgresPropertySubStringOptimization.optimize(&mut query);
        query
    }

    #[test]
    fn test_complex_property_equality() {
        let query = optimize(r#"items.find({"@license":"GPL"})"#);
        let kinds: Vec<_> = query.criteria().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CriterionKind::PostgresComplexProperty]);
    }

    #[test]
    fn test_value_only_criterion() {
        let query = optimize(r#"properties.find({"value":"x"})"#);
        let kinds: Vec<_> = query.criteria().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CriterionKind::PostgresSimpleProperty]);
    }

    #[test]
    fn test_key_and_match_untouched() {
        let query = optimize(r#"properties.find({"key":"x"})"#);
        assert_eq!(query.criteria().next().unwrap().kind, CriterionKind::SimpleProperty);

        let query = optimize(r#"items.find({"@license":{"$match":"G*"}})"#);
        assert_eq!(query.criteria().next().unwrap().kind, CriterionKind::ComplexProperty);
    }

    #[test]
    fn test_long_value_keeps_exact_match() {
        let long = "x".repeat(PROPERTY_VALUE_PREFIX);
        let query = optimize(&format!(r#"items.find({{"@license":"{}"}})"#, long));
        let kinds: Vec<_> = query.criteria().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CriterionKind::PostgresComplexProperty,
                CriterionKind::SimpleProperty
            ]
        );
        assert_eq!(query.elements.first(), Some(&QueryElement::OpenParenthesis));
        let tables: Vec<_> = query.criteria().map(|c| c.table1).collect();
        assert_eq!(tables[0], tables[1]);
    }

    #[test]
    fn test_long_not_equals_has_no_exact_match() {
        let long = "x".repeat(300);
        let query = optimize(&format!(r#"items.find({{"@license":{{"$ne":"{}"}}}})"#, long));
        assert_eq!(query.criteria().count(), 1);
    }
}
