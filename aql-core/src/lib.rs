//! AQL Core - storage-independent compiler for the Artifact Query Language
//!
//! This crate turns AQL text such as
//! `items.find({"repo":"libs-release","@license":{"$match":"*GPL*"}})`
//! or fluent [`api::AqlApi`] calls into parameterized SQL for one of the
//! supported database dialects.
//!
//! # Pipeline
//!
//! 1. [`lexer`] and [`parser`] flatten the text into parsed elements
//! 2. [`adapter`] resolves domains and fields into an [`model::AqlQuery`]
//! 3. [`decorator`] rewrites the query (default type, trashcan, virtual repos, permissions)
//! 4. [`optimizer`] applies Postgres-only property rewrites
//! 5. [`sql`] plans joins and renders dialect SQL
//!
//! Execution, row actions and result streaming live in the `artifact-aql` crate.

pub mod adapter;
pub mod api;
pub mod compiler;
pub mod context;
pub mod decorator;
pub mod domain;
pub mod error;
pub mod lexer;
pub mod model;
pub mod optimizer;
pub mod parser;
pub mod registry;
pub mod sql;
pub mod util;

// Re-exports for convenience
pub use adapter::{ApiToAqlAdapter, ParserToAqlAdapter};
pub use api::AqlApi;
pub use compiler::AqlCompiler;
pub use decorator::{
    DecoratorContext, NoVirtualRepos, ReadScope, RepoResolver, StaticRepoResolver,
    TrashcanSettings,
};
pub use domain::Domain;
pub use error::{AqlError, AqlResult};
pub use model::{ActionKind, ActionSpec, AqlQuery, AqlValue, ItemType, ResultField};
pub use parser::parse;
pub use registry::{FieldType, PhysicalField};
pub use sql::{Dialect, ResultColumn, SqlParam, SqlQuery};
