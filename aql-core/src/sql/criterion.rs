//! Rendering of single criteria into SQL fragments with positional parameters.

use serde::{Deserialize, Serialize};

use crate::error::{AqlError, AqlResult};
use crate::model::{AqlValue, Comparator, Criterion, CriterionKind, ItemType, Variable};
use crate::optimizer::PROPERTY_VALUE_PREFIX;
use crate::registry::{self, SqlTable, SqlTableName};
use crate::util::wildcard_to_like;

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    Text(String),
    Long(i64),
}

impl std::fmt::Display for SqlParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlParam::Text(s) => write!(f, "'{}'", s),
            SqlParam::Long(n) => write!(f, "{}", n),
        }
    }
}

fn prefix(expr: &str) -> String {
    format!("substr({}::text, 1, {})", expr, PROPERTY_VALUE_PREFIX)
}

struct Renderer<'a> {
    params: &'a mut Vec<SqlParam>,
}

impl Renderer<'_> {
    fn param(&mut self, value: &AqlValue, decorate: bool) -> AqlResult<String> {
        let param = match value {
            AqlValue::String(s) => SqlParam::Text(s.clone()),
            AqlValue::Long(n) | AqlValue::Date(n) => SqlParam::Long(*n),
            AqlValue::ItemType(t) => SqlParam::Long(t.code().ok_or_else(|| {
                AqlError::InvalidValue("item type 'any' has no stored code".to_string())
            })?),
            AqlValue::Null => {
                return Err(AqlError::InvalidValue(
                    "null cannot be bound as a parameter".to_string(),
                ))
            }
        };
        self.params.push(param);
        Ok(if decorate {
            format!("substr(?, 1, {})", PROPERTY_VALUE_PREFIX)
        } else {
            "?".to_string()
        })
    }

    /// `expr <op> ?`. Negative comparisons on nullable columns also accept null.
    fn compare(
        &mut self,
        expr: &str,
        column: &str,
        nullable: bool,
        comparator: Comparator,
        value: &AqlValue,
        decorate: bool,
    ) -> AqlResult<String> {
        match (value, comparator) {
            (AqlValue::Null, Comparator::Equals) => return Ok(format!("{} is null", column)),
            (AqlValue::Null, Comparator::NotEquals) => return Ok(format!("{} is not null", column)),
            (AqlValue::Null, other) => {
                return Err(AqlError::UnsupportedComparator(format!(
                    "{} null",
                    other.signature()
                )))
            }
            (AqlValue::ItemType(ItemType::Any), Comparator::Equals) => return Ok("1 = 1".to_string()),
            (AqlValue::ItemType(ItemType::Any), Comparator::NotEquals) => return Ok("1 = 0".to_string()),
            _ => {}
        }

        let (operator, bound) = match comparator {
            Comparator::Equals => ("=", value.clone()),
            Comparator::NotEquals => ("!=", value.clone()),
            Comparator::Greater => (">", value.clone()),
            Comparator::GreaterEquals => (">=", value.clone()),
            Comparator::Less => ("<", value.clone()),
            Comparator::LessEquals => ("<=", value.clone()),
            Comparator::Matches | Comparator::NotMatches => {
                let pattern = value.as_str().ok_or_else(|| {
                    AqlError::UnsupportedComparator(format!(
                        "{} on non-text value {}",
                        comparator.signature(),
                        value
                    ))
                })?;
                let operator = if comparator == Comparator::Matches { "like" } else { "not like" };
                (operator, AqlValue::String(wildcard_to_like(pattern)))
            }
            Comparator::Last | Comparator::Before => {
                return Err(AqlError::UnsupportedComparator(format!(
                    "unresolved relative comparator {}",
                    comparator.signature()
                )))
            }
        };

        let param = self.param(&bound, decorate)?;
        if comparator.is_negative() && nullable {
            Ok(format!("({} {} {} or {} is null)", expr, operator, param, column))
        } else {
            Ok(format!("{} {} {}", expr, operator, param))
        }
    }
}

/// Render a criterion against its resolved table.
///
/// `owner` is the table holding the property table's foreign key, needed by
/// negative complex property criteria which render as a `not in` sub-select.
pub fn render_criterion(
    criterion: &Criterion,
    table: SqlTable,
    owner: Option<SqlTable>,
    params: &mut Vec<SqlParam>,
) -> AqlResult<String> {
    let mut renderer = Renderer { params };
    let alias = table.alias();

    let value = match &criterion.variable2 {
        Variable::Value(v) => v,
        Variable::Field(f) => {
            return Err(AqlError::MalformedQuery(format!(
                "field {:?} on the right side of a criterion",
                f
            )))
        }
    };

    if criterion.kind.is_complex() {
        let key = match &criterion.variable1 {
            Variable::Value(AqlValue::String(key)) => key,
            other => {
                return Err(AqlError::MalformedQuery(format!(
                    "property criterion without key: {}",
                    other
                )))
            }
        };
        let decorate = criterion.kind == CriterionKind::PostgresComplexProperty;

        if !criterion.comparator.is_negative() {
            let column = format!("{}.prop_value", alias);
            let expr = if decorate { prefix(&column) } else { column.clone() };
            let key_param = renderer.param(&AqlValue::String(key.clone()), false)?;
            let condition =
                renderer.compare(&expr, &column, true, criterion.comparator, value, decorate)?;
            return Ok(format!("({}.prop_key = {} and {})", alias, key_param, condition));
        }

        let owner = owner.unwrap_or(table);
        let (owner_column, property_column) = if owner.name == table.name {
            let (column, _) = registry::link(table.name, property_owner(table.name))?;
            (column, column)
        } else {
            registry::link(owner.name, table.name)?
        };
        let expr = if decorate { prefix("prop_value") } else { "prop_value".to_string() };
        let key_param = renderer.param(&AqlValue::String(key.clone()), false)?;
        let condition = renderer.compare(
            &expr,
            "prop_value",
            false,
            criterion.comparator.positive(),
            value,
            decorate,
        )?;
        return Ok(format!(
            "{}.{} not in (select {} from {} where prop_key = {} and {})",
            owner.alias(),
            owner_column,
            property_column,
            table.name.table_name(),
            key_param,
            condition
        ));
    }

    match &criterion.variable1 {
        Variable::Field(field) => {
            let ext = registry::lookup(*field)?;
            let column = format!("{}.{}", alias, ext.column);
            let decorate = criterion.kind == CriterionKind::PostgresSimpleProperty
                && ext.column == "prop_value";
            let expr = if decorate { prefix(&column) } else { column.clone() };
            renderer.compare(&expr, &column, ext.nullable, criterion.comparator, value, decorate)
        }
        Variable::Value(left) => {
            let operator = match criterion.comparator {
                Comparator::Equals => "=",
                Comparator::NotEquals => "!=",
                other => {
                    return Err(AqlError::UnsupportedComparator(format!(
                        "{} between two values",
                        other.signature()
                    )))
                }
            };
            let left = renderer.param(left, false)?;
            let right = renderer.param(value, false)?;
            Ok(format!("{} {} {}", left, operator, right))
        }
    }
}

/// The table a property table hangs off.
fn property_owner(table: SqlTableName) -> SqlTableName {
    match table {
        SqlTableName::ModuleProps => SqlTableName::BuildModules,
        SqlTableName::BuildProps => SqlTableName::Builds,
        _ => SqlTableName::Nodes,
    }
}
