//! Dialect SQL builders.
//!
//! The base build assembles `select ... from ... where ... order by ... group by`.
//! Dialects differ only in how they paginate.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AqlError, AqlResult};
use crate::util::add_but_limit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Derby,
    Mysql,
    Oracle,
    Postgresql,
    Sqlserver,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Derby => "derby",
            Dialect::Mysql => "mysql",
            Dialect::Oracle => "oracle",
            Dialect::Postgresql => "postgresql",
            Dialect::Sqlserver => "sqlserver",
        }
    }

    pub fn builder(self) -> &'static dyn QueryBuilder {
        match self {
            Dialect::Derby => &DerbyQueryBuilder,
            Dialect::Mysql => &MySqlQueryBuilder,
            Dialect::Oracle => &OracleQueryBuilder,
            Dialect::Postgresql => &PostgresQueryBuilder,
            Dialect::Sqlserver => &SqlServerQueryBuilder,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = AqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "derby" => Ok(Dialect::Derby),
            "mysql" => Ok(Dialect::Mysql),
            "oracle" => Ok(Dialect::Oracle),
            "postgresql" | "postgres" => Ok(Dialect::Postgresql),
            "sqlserver" | "mssql" => Ok(Dialect::Sqlserver),
            other => Err(AqlError::Configuration(format!("unknown dialect: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinType::Inner => "inner join",
            JoinType::Left => "left outer join",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub on: String,
}

/// The pieces of a select statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlParts {
    pub distinct: bool,
    pub fields: Option<String>,
    pub tables: String,
    pub join: Option<JoinClause>,
    pub conditions: Option<String>,
    pub order_by: Option<String>,
    pub group_by: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

pub fn is_pagination(offset: Option<i64>, limit: Option<i64>) -> bool {
    offset.is_some_and(|o| o > 0) || limit.is_some_and(|l| l < i64::MAX)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub trait QueryBuilder: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Wrap a complete base query with this dialect's pagination.
    fn unique_build(&self, base_query: &str, sort_by: Option<&str>, offset: i64, limit: i64) -> String;

    /// Whether the base query carries the `order by` clause.
    fn should_add_order_by(&self, _offset: Option<i64>, _limit: Option<i64>) -> bool {
        true
    }

    fn build(&self, parts: &SqlParts) -> AqlResult<String> {
        if parts.tables.trim().is_empty() {
            return Err(AqlError::MalformedQuery(
                "no tables to select from".to_string(),
            ));
        }

        let mut sql = String::from("select ");
        if parts.distinct {
            sql.push_str("distinct ");
        }
        sql.push_str(non_blank(&parts.fields).unwrap_or("*"));
        sql.push_str(" from ");
        sql.push_str(parts.tables.trim());

        if let Some(join) = &parts.join {
            sql.push_str(&format!(" {} {} on {}", join.join_type.keyword(), join.table, join.on));
        }
        if let Some(conditions) = non_blank(&parts.conditions) {
            sql.push_str(" where ");
            sql.push_str(conditions);
        }
        let order_by = non_blank(&parts.order_by);
        if let Some(order_by) = order_by {
            if self.should_add_order_by(parts.offset, parts.limit) {
                sql.push_str(" order by ");
                sql.push_str(order_by);
            }
        }
        if let Some(group_by) = non_blank(&parts.group_by) {
            sql.push_str(" group by ");
            sql.push_str(group_by);
        }

        if is_pagination(parts.offset, parts.limit) {
            let offset = parts.offset.unwrap_or(0).max(0);
            let limit = match parts.limit {
                Some(l) if l >= 0 => l,
                _ => i64::MAX,
            };
            return Ok(self.unique_build(&sql, order_by, offset, limit));
        }
        Ok(sql)
    }
}

pub struct DerbyQueryBuilder;

impl QueryBuilder for DerbyQueryBuilder {
    fn dialect(&self) -> Dialect {
        Dialect::Derby
    }

    fn unique_build(&self, base_query: &str, _sort_by: Option<&str>, offset: i64, limit: i64) -> String {
        let mut sql = format!("{} offset {} rows", base_query, offset);
        if limit < i64::MAX {
            sql.push_str(&format!(" fetch next {} rows only", limit));
        }
        sql
    }
}

pub struct MySqlQueryBuilder;

impl QueryBuilder for MySqlQueryBuilder {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn unique_build(&self, base_query: &str, _sort_by: Option<&str>, offset: i64, limit: i64) -> String {
        format!("{} limit {}, {}", base_query, offset, limit)
    }
}

/// Paginates with a `ROWNUM` window over the base query.
///
/// Rows are numbered in the order the base query returns them, so the window
/// is only stable when the query is sorted.
pub struct OracleQueryBuilder;

impl QueryBuilder for OracleQueryBuilder {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn unique_build(&self, base_query: &str, _sort_by: Option<&str>, offset: i64, limit: i64) -> String {
        format!(
            "select * from ( select inner_query.*, ROWNUM rnum from ( {} ) inner_query where ROWNUM <= {} ) where rnum > {}",
            base_query,
            add_but_limit(offset, limit, i64::MAX),
            offset
        )
    }
}

pub struct PostgresQueryBuilder;

impl QueryBuilder for PostgresQueryBuilder {
    fn dialect(&self) -> Dialect {
        Dialect::Postgresql
    }

    fn unique_build(&self, base_query: &str, _sort_by: Option<&str>, offset: i64, limit: i64) -> String {
        if limit < i64::MAX {
            format!("{} limit {} offset {}", base_query, limit, offset)
        } else {
            format!("{} offset {}", base_query, offset)
        }
    }
}

/// Paginates with `ROW_NUMBER()` over the requested order.
pub struct SqlServerQueryBuilder;

impl QueryBuilder for SqlServerQueryBuilder {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlserver
    }

    fn unique_build(&self, base_query: &str, sort_by: Option<&str>, offset: i64, limit: i64) -> String {
        let start = add_but_limit(offset, 1, i64::MAX);
        let end = add_but_limit(limit, start, i64::MAX);
        let order = match sort_by {
            Some(sort_by) => sort_by
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| match s.find('.') {
                    Some(dot) => format!("aa.{}", &s[dot + 1..]),
                    None => format!("aa.{}", s),
                })
                .collect::<Vec<_>>()
                .join(", "),
            None => "(select 1)".to_string(),
        };
        format!(
            "select bb.* from ( select aa.*, ROW_NUMBER() OVER ( order by {} ) AS RN from ( {} ) aa ) bb where bb.RN >= {} and bb.RN < {}",
            order, base_query, start, end
        )
    }

    fn should_add_order_by(&self, offset: Option<i64>, limit: Option<i64>) -> bool {
        !is_pagination(offset, limit)
    }
}
