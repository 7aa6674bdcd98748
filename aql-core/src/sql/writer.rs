use crate::error::AqlResult;

use super::builder::{JoinClause, JoinType, QueryBuilder, SqlParts};

/// Fluent holder for the parts of a select statement, built by a dialect builder.
pub struct QueryWriter<'a> {
    builder: &'a dyn QueryBuilder,
    parts: SqlParts,
}

impl<'a> QueryWriter<'a> {
    pub fn new(builder: &'a dyn QueryBuilder) -> Self {
        Self {
            builder,
            parts: SqlParts::default(),
        }
    }

    pub fn distinct(mut self) -> Self {
        self.parts.distinct = true;
        self
    }

    pub fn select(mut self, fields: impl Into<String>) -> Self {
        self.parts.fields = Some(fields.into());
        self
    }

    pub fn from(mut self, tables: impl Into<String>) -> Self {
        self.parts.tables = tables.into();
        self
    }

    pub fn join(mut self, join_type: JoinType, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.parts.join = Some(JoinClause {
            join_type,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    pub fn conditions(mut self, conditions: impl Into<String>) -> Self {
        self.parts.conditions = Some(conditions.into());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.parts.order_by = Some(order_by.into());
        self
    }

    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.parts.group_by = Some(group_by.into());
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.parts.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.parts.limit = Some(limit);
        self
    }

    pub fn parts(&self) -> &SqlParts {
        &self.parts
    }

    pub fn build(&self) -> AqlResult<String> {
        self.builder.build(&self.parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Dialect;

    #[test]
    fn test_writer_delegates_to_dialect() {
        let sql = QueryWriter::new(Dialect::Postgresql.builder())
            .distinct()
            .select("n.repo as itemRepo")
            .from("nodes n")
            .join(JoinType::Left, "stats s", "s.node_id = n.node_id")
            .conditions("s.download_count > ?")
            .offset(10)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "select distinct n.repo as itemRepo from nodes n left outer join stats s on s.node_id = n.node_id where s.download_count > ? offset 10"
        );
    }

    #[test]
    fn test_writer_without_tables_fails() {
        assert!(QueryWriter::new(Dialect::Derby.builder()).select("1").build().is_err());
    }
}
