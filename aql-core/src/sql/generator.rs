use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::domain::Domain;
use crate::error::{AqlError, AqlResult};
use crate::model::{ActionSpec, AqlQuery, Criterion, QueryElement, ResultField, Variable};
use crate::registry::{self, SqlTable, SqlTableName, MINIMAL_DYNAMIC_TABLE_ID};

use super::builder::Dialect;
use super::criterion::{render_criterion, SqlParam};
use super::writer::QueryWriter;

/// A selected column and the result field it carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultColumn {
    pub alias: String,
    pub field: ResultField,
}

/// Executable SQL for one AQL query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub columns: Vec<ResultColumn>,
    pub domain: Domain,
    pub action: ActionSpec,
    pub offset: i64,
    pub limit: i64,
}

/// Plans the outer joins needed by result fields and criteria.
struct JoinPlanner {
    main: SqlTable,
    joins: Vec<String>,
    aliases: HashSet<String>,
    static_paths: HashMap<Vec<SqlTableName>, SqlTable>,
    static_tables: HashSet<SqlTableName>,
    next_secondary: u32,
}

impl JoinPlanner {
    fn new(main: SqlTable) -> Self {
        let mut aliases = HashSet::new();
        aliases.insert(main.alias());
        let mut static_tables = HashSet::new();
        static_tables.insert(main.name);
        Self {
            main,
            joins: Vec::new(),
            aliases,
            static_paths: HashMap::new(),
            static_tables,
            next_secondary: 0,
        }
    }

    fn add_join(&mut self, from: SqlTable, to: SqlTable) -> AqlResult<()> {
        let alias = to.alias();
        if self.aliases.contains(&alias) {
            return Ok(());
        }
        let (from_column, to_column) = registry::link(from.name, to.name)?;
        self.joins.push(format!(
            "left outer join {} {} on {}.{} = {}.{}",
            to.name.table_name(),
            alias,
            alias,
            to_column,
            from.alias(),
            from_column
        ));
        self.aliases.insert(alias);
        Ok(())
    }

    /// Static aliases keyed by the table path. A table reached by a second path gets a numbered alias.
    fn static_path(&mut self, chain: &[SqlTableName]) -> AqlResult<SqlTable> {
        let mut previous = self.main;
        for i in 1..chain.len() {
            let key = chain[..=i].to_vec();
            if let Some(table) = self.static_paths.get(&key) {
                previous = *table;
                continue;
            }
            let table = if self.static_tables.insert(chain[i]) {
                SqlTable::main(chain[i])
            } else {
                self.next_secondary += 1;
                if self.next_secondary >= MINIMAL_DYNAMIC_TABLE_ID {
                    return Err(AqlError::MalformedQuery(
                        "too many result joins".to_string(),
                    ));
                }
                SqlTable::new(chain[i], self.next_secondary)
            };
            self.add_join(previous, table)?;
            self.static_paths.insert(key, table);
            previous = table;
        }
        Ok(previous)
    }

    fn result_table(&mut self, field: &ResultField) -> AqlResult<SqlTable> {
        let ext = registry::lookup(field.field)?;
        let chain = registry::table_chain(&field.sub_domains, ext.table);
        self.static_path(&chain)
    }

    /// The table a criterion compares against and, for negative complex property
    /// criteria, the table owning the property rows.
    fn criterion_tables(&mut self, criterion: &Criterion) -> AqlResult<(SqlTable, Option<SqlTable>)> {
        let field_table = match &criterion.variable1 {
            Variable::Field(field) => registry::lookup(*field)?.table,
            Variable::Value(_) if criterion.kind.is_complex() => criterion.table1.name,
            Variable::Value(_) => return Ok((self.main, None)),
        };

        let chain = registry::table_chain(&criterion.sub_domains, field_table);
        if chain.len() == 1 {
            return Ok((self.main, Some(self.main)));
        }
        if criterion.table1.id == 0 {
            let table = self.static_path(&chain)?;
            return Ok((table, None));
        }

        let subselect = criterion.kind.is_complex() && criterion.comparator.is_negative();
        let joined = if subselect { chain.len() - 1 } else { chain.len() };
        let mut previous = self.main;
        for name in &chain[1..joined] {
            let table = SqlTable::new(*name, criterion.table1.id);
            self.add_join(previous, table)?;
            previous = table;
        }

        if subselect {
            let property_table = SqlTable::new(chain[chain.len() - 1], criterion.table1.id);
            Ok((property_table, Some(previous)))
        } else {
            Ok((previous, None))
        }
    }

    fn tables(&self) -> String {
        let mut tables = format!("{} {}", self.main.name.table_name(), self.main.alias());
        for join in &self.joins {
            tables.push(' ');
            tables.push_str(join);
        }
        tables
    }
}

/// Translates a decorated [`AqlQuery`] into SQL for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlGenerator {
    dialect: Dialect,
}

impl SqlGenerator {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn generate(&self, query: &AqlQuery) -> AqlResult<SqlQuery> {
        let main = SqlTable::main(query.domain.primary_table());
        let mut planner = JoinPlanner::new(main);

        let mut select = Vec::with_capacity(query.result_fields.len());
        let mut columns: Vec<ResultColumn> = Vec::with_capacity(query.result_fields.len());
        for field in &query.result_fields {
            let ext = registry::lookup(field.field)?;
            let table = planner.result_table(field)?;
            let mut alias = ext.alias.to_string();
            let mut n = 1;
            while columns.iter().any(|c| c.alias == alias) {
                n += 1;
                alias = format!("{}{}", ext.alias, n);
            }
            select.push(format!("{}.{} as {}", table.alias(), ext.column, alias));
            columns.push(ResultColumn {
                alias,
                field: field.clone(),
            });
        }
        if columns.is_empty() {
            return Err(AqlError::MalformedQuery(format!(
                "no result fields for {}",
                query.domain
            )));
        }

        let mut params = Vec::new();
        let mut conditions = Vec::with_capacity(query.elements.len());
        for element in &query.elements {
            match element {
                QueryElement::Criterion(criterion) => {
                    let (table, owner) = planner.criterion_tables(criterion)?;
                    conditions.push(render_criterion(criterion, table, owner, &mut params)?);
                }
                QueryElement::And => conditions.push("and".to_string()),
                QueryElement::Or => conditions.push("or".to_string()),
                QueryElement::OpenParenthesis => conditions.push("(".to_string()),
                QueryElement::CloseParenthesis => conditions.push(")".to_string()),
            }
        }

        let mut writer = QueryWriter::new(self.dialect.builder())
            .distinct()
            .select(select.join(", "))
            .from(planner.tables())
            .conditions(conditions.join(" "))
            .offset(query.offset)
            .limit(query.limit);

        if let Some(sort) = &query.sort {
            let mut order = Vec::with_capacity(sort.fields.len());
            for field in &sort.fields {
                let column = columns.iter().find(|c| c.field == *field).ok_or_else(|| {
                    AqlError::InvalidSort(format!("{:?} is not a result field", field.field))
                })?;
                order.push(format!("{} {}", column.alias, sort.sort_type.keyword()));
            }
            writer = writer.order_by(order.join(", "));
        }

        let sql = writer.build()?;
        debug!(dialect = %self.dialect, sql = %sql, params = params.len(), "Generated SQL");

        Ok(SqlQuery {
            sql,
            params,
            columns,
            domain: query.domain,
            action: query.action.clone(),
            offset: query.offset,
            limit: query.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ParserToAqlAdapter;
    use crate::optimizer::PostgresPropertySubStringOptimization;

    fn generate(dialect: Dialect, text: &str) -> SqlQuery {
        let query = ParserToAqlAdapter::new().compile(text).unwrap();
        SqlGenerator::new(dialect).generate(&query).unwrap()
    }

    #[test]
    fn test_simple_items_query() {
        let sql = generate(
            Dialect::Derby,
            r#"items.find({"repo":"repo1"}).include("name","repo")"#,
        );
        assert_eq!(
            sql.sql,
            "select distinct n.node_name as itemName, n.repo as itemRepo from nodes n where n.repo = ?"
        );
        assert_eq!(sql.params, vec![SqlParam::Text("repo1".into())]);
        assert_eq!(sql.columns.len(), 2);
    }

    #[test]
    fn test_property_criterion_joins_dynamic_table() {
        let sql = generate(
            Dialect::Mysql,
            r#"items.find({"@build.number":"67"}).include("name")"#,
        );
        assert_eq!(
            sql.sql,
            "select distinct n.node_name as itemName from nodes n left outer join node_props np100 on np100.node_id = n.node_id where (np100.prop_key = ? and np100.prop_value = ?)"
        );
    }

    #[test]
    fn test_negative_property_uses_subselect() {
        let sql = generate(
            Dialect::Mysql,
            r#"items.find({"@license":{"$ne":"GPL"}}).include("name")"#,
        );
        assert_eq!(
            sql.sql,
            "select distinct n.node_name as itemName from nodes n where n.node_id not in (select node_id from node_props where prop_key = ? and prop_value = ?)"
        );
    }

    #[test]
    fn test_include_sub_domain_uses_static_alias() {
        let sql = generate(
            Dialect::Derby,
            r#"items.find({"property.key":"a"}).include("name","property.value")"#,
        );
        assert_eq!(
            sql.sql,
            "select distinct n.node_name as itemName, np.prop_value as propertyValue from nodes n left outer join node_props np on np.node_id = n.node_id left outer join node_props np100 on np100.node_id = n.node_id where np100.prop_key = ?"
        );
    }

    #[test]
    fn test_sort_uses_select_aliases() {
        let sql = generate(
            Dialect::Derby,
            r#"items.find().include("repo","name").sort({"$desc":["repo","name"]})"#,
        );
        assert!(sql.sql.ends_with("order by itemRepo desc, itemName desc"));
    }

    #[test]
    fn test_deep_sub_domain_chain() {
        let sql = generate(
            Dialect::Derby,
            r#"builds.find({"module.artifact.item.repo":"libs"}).include("name")"#,
        );
        assert!(sql.sql.contains("left outer join build_modules bm100 on bm100.build_id = b.build_id"));
        assert!(sql.sql.contains("left outer join build_artifacts ba100 on ba100.module_id = bm100.module_id"));
        assert!(sql.sql.contains("left outer join nodes n100 on n100.sha1_actual = ba100.sha1"));
        assert!(sql.sql.ends_with("where n100.repo = ?"));
    }

    #[test]
    fn test_entries_join_names_and_paths() {
        let sql = generate(Dialect::Derby, r#"archive.entries.find({"name":"A.class"})"#);
        assert!(sql.sql.starts_with(
            "select distinct an.entry_name as archiveEntryName, ap.entry_path as archiveEntryPath from indexed_archives_entries iae"
        ));
        assert!(sql.sql.contains("left outer join archive_names an100 on an100.name_id = iae.entry_name_id"));
    }

    #[test]
    fn test_postgres_optimized_sql() {
        let mut query = ParserToAqlAdapter::new()
            .compile(r#"items.find({"@license":"GPL"}).include("name").limit(5)"#)
            .unwrap();
        PostgresPropertySubStringOptimization.optimize(&mut query);
        let sql = SqlGenerator::new(Dialect::Postgresql).generate(&query).unwrap();
        assert!(sql
            .sql
            .contains("substr(np100.prop_value::text, 1, 255) = substr(?, 1, 255)"));
        assert!(sql.sql.ends_with("limit 5 offset 0"));
    }

    #[test]
    fn test_duplicate_column_aliases_are_numbered() {
        let mut query = ParserToAqlAdapter::new().compile("items.find().include(\"name\")").unwrap();
        query.add_result_field(ResultField::new(
            crate::registry::PhysicalField::ItemName,
            vec![Domain::Items, Domain::Properties, Domain::Items],
        ));
        let sql = SqlGenerator::new(Dialect::Derby).generate(&query).unwrap();
        let aliases: Vec<_> = sql.columns.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(aliases, vec!["itemName", "itemName2"]);
        assert!(sql.sql.contains("n1.node_name as itemName2"));
    }
}
