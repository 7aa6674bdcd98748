//! Query entry point: compile, execute and wrap results.

use std::io::Write;
use std::sync::Arc;

use aql_core::{
    ApiToAqlAdapter, AqlApi, AqlCompiler, AqlQuery, DecoratorContext, NoVirtualRepos,
    ParserToAqlAdapter, RepoResolver, SqlQuery,
};
use tracing::{debug, info};

use crate::action::{create_action, ActionCapabilities, AqlAction};
use crate::capability::{
    AllowAll, AuthorizationProvider, PropertyEditor, ReadOnly, RepositoryMutator, SqlExecutor,
};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::result::{EagerResult, LazyResult, RowAssembler};
use crate::streamer::AqlJsonStreamer;

/// Compiles AQL for the configured dialect and runs it through the host capabilities.
pub struct AqlService {
    config: EngineConfig,
    compiler: AqlCompiler,
    executor: Arc<dyn SqlExecutor>,
    capabilities: ActionCapabilities,
    repos: Arc<dyn RepoResolver>,
}

impl AqlService {
    pub fn builder(executor: Arc<dyn SqlExecutor>) -> AqlServiceBuilder {
        AqlServiceBuilder {
            executor,
            config: EngineConfig::default(),
            authorization: Arc::new(AllowAll),
            mutator: Arc::new(ReadOnly),
            editor: Arc::new(ReadOnly),
            repos: Arc::new(NoVirtualRepos),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile without executing. Decoration uses the current principal's read scope.
    pub fn compile(&self, text: &str) -> EngineResult<SqlQuery> {
        let query = ParserToAqlAdapter::new().compile(text)?;
        self.generate(query)
    }

    pub fn execute_eager(&self, text: &str) -> EngineResult<EagerResult> {
        let query = ParserToAqlAdapter::new().compile(text)?;
        self.run_eager(query)
    }

    pub fn execute_lazy(&self, text: &str) -> EngineResult<LazyResult> {
        let query = ParserToAqlAdapter::new().compile(text)?;
        self.run_lazy(query)
    }

    pub fn execute_api_eager(&self, api: &AqlApi) -> EngineResult<EagerResult> {
        let query = ApiToAqlAdapter::new().adapt(api)?;
        self.run_eager(query)
    }

    pub fn execute_api_lazy(&self, api: &AqlApi) -> EngineResult<LazyResult> {
        let query = ApiToAqlAdapter::new().adapt(api)?;
        self.run_lazy(query)
    }

    /// Run a query lazily and stream the JSON document into `writer`.
    ///
    /// Item rows the principal cannot read are left out. Returns the row count.
    pub fn stream_json<W: Write>(&self, text: &str, writer: &mut W) -> EngineResult<usize> {
        let result = self.execute_lazy(text)?;
        AqlJsonStreamer::new(result)
            .with_read_filter(self.capabilities.authorization.clone())
            .write_to(writer)
    }

    /// The JSON document of a query as a string.
    pub fn query_json(&self, text: &str) -> EngineResult<String> {
        let mut buffer = Vec::new();
        self.stream_json(text, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn generate(&self, query: AqlQuery) -> EngineResult<SqlQuery> {
        let ctx = DecoratorContext {
            repos: self.repos.as_ref(),
            read_scope: self.capabilities.authorization.read_scope(),
            trashcan: self.config.trashcan.clone(),
        };
        Ok(self.compiler.compile(query, &ctx)?)
    }

    fn prepare(&self, sql: &SqlQuery) -> (RowAssembler, Box<dyn AqlAction>) {
        let assembler = RowAssembler::new(sql.domain, sql.columns.clone());
        let action = create_action(&sql.action, &self.capabilities, self.config.dry_run_default);
        (assembler, action)
    }

    fn run_eager(&self, mut query: AqlQuery) -> EngineResult<EagerResult> {
        query.limit = query.limit.min(self.config.eager_limit);
        let sql = self.generate(query)?;
        let (assembler, action) = self.prepare(&sql);
        info!(
            domain = %sql.domain,
            action = action.name(),
            dry_run = action.is_dry_run(),
            "Executing eager AQL query"
        );
        let cursor = self.executor.execute_query(&sql.sql, &sql.params)?;
        let result = EagerResult::fetch(cursor, &assembler, action.as_ref())?;
        debug!(rows = result.len(), "Eager AQL query finished");
        Ok(result)
    }

    fn run_lazy(&self, query: AqlQuery) -> EngineResult<LazyResult> {
        let sql = self.generate(query)?;
        let (assembler, action) = self.prepare(&sql);
        info!(
            domain = %sql.domain,
            action = action.name(),
            dry_run = action.is_dry_run(),
            "Executing lazy AQL query"
        );
        let cursor = self.executor.execute_query(&sql.sql, &sql.params)?;
        Ok(LazyResult::new(cursor, assembler, action))
    }
}

pub struct AqlServiceBuilder {
    executor: Arc<dyn SqlExecutor>,
    config: EngineConfig,
    authorization: Arc<dyn AuthorizationProvider>,
    mutator: Arc<dyn RepositoryMutator>,
    editor: Arc<dyn PropertyEditor>,
    repos: Arc<dyn RepoResolver>,
}

impl AqlServiceBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn authorization(mut self, authorization: Arc<dyn AuthorizationProvider>) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn repository_mutator(mut self, mutator: Arc<dyn RepositoryMutator>) -> Self {
        self.mutator = mutator;
        self
    }

    pub fn property_editor(mut self, editor: Arc<dyn PropertyEditor>) -> Self {
        self.editor = editor;
        self
    }

    pub fn repo_resolver(mut self, repos: Arc<dyn RepoResolver>) -> Self {
        self.repos = repos;
        self
    }

    pub fn build(self) -> EngineResult<AqlService> {
        self.config.validate()?;
        Ok(AqlService {
            compiler: AqlCompiler::new(self.config.dialect),
            config: self.config,
            executor: self.executor,
            capabilities: ActionCapabilities {
                authorization: self.authorization,
                mutator: self.mutator,
                editor: self.editor,
            },
            repos: self.repos,
        })
    }
}
