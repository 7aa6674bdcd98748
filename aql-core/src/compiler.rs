use tracing::debug;

use crate::adapter::{ApiToAqlAdapter, ParserToAqlAdapter};
use crate::api::AqlApi;
use crate::decorator::{DecoratorContext, DecoratorPipeline};
use crate::error::AqlResult;
use crate::model::AqlQuery;
use crate::optimizer::PostgresPropertySubStringOptimization;
use crate::sql::{Dialect, SqlGenerator, SqlQuery};

/// Runs the full compile pipeline: adapt, decorate, optimize and generate.
pub struct AqlCompiler {
    generator: SqlGenerator,
    decorators: DecoratorPipeline,
}

impl AqlCompiler {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            generator: SqlGenerator::new(dialect),
            decorators: DecoratorPipeline::default(),
        }
    }

    pub fn with_decorators(dialect: Dialect, decorators: DecoratorPipeline) -> Self {
        Self {
            generator: SqlGenerator::new(dialect),
            decorators,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.generator.dialect()
    }

    pub fn compile_text(&self, text: &str, ctx: &DecoratorContext<'_>) -> AqlResult<SqlQuery> {
        let query = ParserToAqlAdapter::new().compile(text)?;
        self.compile(query, ctx)
    }

    pub fn compile_api(&self, api: &AqlApi, ctx: &DecoratorContext<'_>) -> AqlResult<SqlQuery> {
        let query = ApiToAqlAdapter::new().adapt(api)?;
        self.compile(query, ctx)
    }

    pub fn compile(&self, mut query: AqlQuery, ctx: &DecoratorContext<'_>) -> AqlResult<SqlQuery> {
        self.decorators.decorate(&mut query, ctx)?;
        if self.generator.dialect() == Dialect::Postgresql {
            PostgresPropertySubStringOptimization.optimize(&mut query);
        }
        let sql = self.generator.generate(&query)?;
        debug!(domain = %sql.domain, action = sql.action.kind.name(), "Compiled AQL query");
        Ok(sql)
    }
}
