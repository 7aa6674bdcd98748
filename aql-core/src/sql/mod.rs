//! SQL generation: criterion rendering, join planning and dialect builders.

mod builder;
mod criterion;
mod generator;
mod writer;

pub use builder::{
    is_pagination, Dialect, JoinClause, JoinType, QueryBuilder, SqlParts, DerbyQueryBuilder,
    MySqlQueryBuilder, OracleQueryBuilder, PostgresQueryBuilder, SqlServerQueryBuilder,
};
pub use criterion::{render_criterion, SqlParam};
pub use generator::{ResultColumn, SqlGenerator, SqlQuery};
pub use writer::QueryWriter;
