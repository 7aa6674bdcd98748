use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use artifact_aql::aql_core::Dialect;
use artifact_aql::{AqlJsonStreamer, AqlService, EngineConfig, SqliteExecutor};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "aql-query")]
#[command(about = "Run an AQL query against a SQLite artifact database", long_about = None)]
struct Args {
    /// Directory holding aql-engine.toml and an optional .env
    #[arg(long, default_value = ".")]
    config: PathBuf,

    /// SQLite database file
    #[arg(long)]
    db: PathBuf,

    /// Keep the cursor open and stream rows instead of materializing them
    #[arg(long)]
    lazy: bool,

    /// Read the query from a file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Create missing tables before running the query
    #[arg(long)]
    init_schema: bool,

    /// Print the generated SQL and parameters instead of running the query
    #[arg(long)]
    explain: bool,

    /// AQL query text, e.g. items.find({"repo":"libs-release"})
    query: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = EngineConfig::load(&args.config)?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let query = match (&args.query, &args.file) {
        (Some(query), _) => query.clone(),
        (None, Some(file)) => std::fs::read_to_string(file)?,
        (None, None) => anyhow::bail!("Provide a query argument or --file"),
    };

    let executor = Arc::new(SqliteExecutor::open(&args.db)?);
    if args.init_schema {
        executor.create_schema()?;
        tracing::info!("Schema ready in {}", args.db.display());
    }

    let dialect = sqlite_dialect(config.dialect, args.explain);
    if dialect != config.dialect {
        tracing::warn!("{} pagination does not run on SQLite, using {}", config.dialect, dialect);
        config.dialect = dialect;
    }
    tracing::info!("Using {} dialect", config.dialect);
    let service = AqlService::builder(executor.clone())
        .config(config)
        .repository_mutator(executor.clone())
        .property_editor(executor)
        .build()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.explain {
        let sql = service.compile(query.trim())?;
        serde_json::to_writer_pretty(&mut out, &sql)?;
        writeln!(out)?;
        return Ok(());
    }

    let total = if args.lazy {
        let result = service.execute_lazy(query.trim())?;
        AqlJsonStreamer::new(result).write_to(&mut out)?
    } else {
        let result = service.execute_eager(query.trim())?;
        AqlJsonStreamer::new(result).write_to(&mut out)?
    };
    writeln!(out)?;
    tracing::info!("{} rows", total);

    Ok(())
}

/// Dialect used against SQLite, which only runs the MySQL and SQL Server
/// pagination forms. `--explain` executes nothing and keeps the configured one.
fn sqlite_dialect(configured: Dialect, explain: bool) -> Dialect {
    match configured {
        Dialect::Mysql | Dialect::Sqlserver => configured,
        _ if explain => configured,
        _ => Dialect::Mysql,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_dialect() {
        assert_eq!(sqlite_dialect(Dialect::Oracle, false), Dialect::Mysql);
        assert_eq!(sqlite_dialect(Dialect::Derby, false), Dialect::Mysql);
        assert_eq!(sqlite_dialect(Dialect::Sqlserver, false), Dialect::Sqlserver);
        assert_eq!(sqlite_dialect(Dialect::Mysql, true), Dialect::Mysql);
    }

    #[test]
    fn test_explain_keeps_configured_dialect() {
        for dialect in [Dialect::Oracle, Dialect::Postgresql, Dialect::Derby] {
            assert_eq!(sqlite_dialect(dialect, true), dialect);
        }
    }
}
