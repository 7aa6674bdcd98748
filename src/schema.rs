//! Physical schema queried by generated SQL.
//!
//! Dates are stored as epoch milliseconds, item types as 0 (folder) and 1 (file).

use rusqlite::Connection;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    node_id INTEGER PRIMARY KEY,
    node_type INTEGER NOT NULL,
    repo TEXT NOT NULL,
    node_path TEXT NOT NULL,
    node_name TEXT NOT NULL,
    depth INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL DEFAULT 0,
    created_by TEXT,
    modified INTEGER,
    modified_by TEXT,
    updated INTEGER,
    bin_length INTEGER,
    sha1_actual TEXT,
    sha1_original TEXT,
    md5_actual TEXT,
    md5_original TEXT
);
CREATE INDEX IF NOT EXISTS nodes_repo_path ON nodes (repo, node_path, node_name);
CREATE INDEX IF NOT EXISTS nodes_sha1 ON nodes (sha1_actual);

CREATE TABLE IF NOT EXISTS node_props (
    prop_id INTEGER PRIMARY KEY,
    node_id INTEGER NOT NULL,
    prop_key TEXT NOT NULL,
    prop_value TEXT
);
CREATE INDEX IF NOT EXISTS node_props_node ON node_props (node_id);
CREATE INDEX IF NOT EXISTS node_props_key ON node_props (prop_key);

CREATE TABLE IF NOT EXISTS stats (
    node_id INTEGER PRIMARY KEY,
    download_count INTEGER,
    last_downloaded INTEGER,
    last_downloaded_by TEXT
);

CREATE TABLE IF NOT EXISTS indexed_archives (
    archive_sha1 TEXT PRIMARY KEY,
    indexed_archives_id INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS archive_paths (
    path_id INTEGER PRIMARY KEY,
    entry_path TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS archive_names (
    name_id INTEGER PRIMARY KEY,
    entry_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS indexed_archives_entries (
    indexed_archives_id INTEGER NOT NULL,
    entry_path_id INTEGER NOT NULL,
    entry_name_id INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS builds (
    build_id INTEGER PRIMARY KEY,
    build_name TEXT NOT NULL,
    build_number TEXT NOT NULL,
    ci_url TEXT,
    created INTEGER NOT NULL DEFAULT 0,
    created_by TEXT,
    modified INTEGER,
    modified_by TEXT
);

CREATE TABLE IF NOT EXISTS build_props (
    prop_id INTEGER PRIMARY KEY,
    build_id INTEGER NOT NULL,
    prop_key TEXT NOT NULL,
    prop_value TEXT
);

CREATE TABLE IF NOT EXISTS build_promotions (
    build_id INTEGER NOT NULL,
    created INTEGER NOT NULL DEFAULT 0,
    created_by TEXT,
    status TEXT NOT NULL,
    repo TEXT,
    promotion_comment TEXT,
    ci_user TEXT
);

CREATE TABLE IF NOT EXISTS build_modules (
    module_id INTEGER PRIMARY KEY,
    build_id INTEGER NOT NULL,
    module_name_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS module_props (
    prop_id INTEGER PRIMARY KEY,
    module_id INTEGER NOT NULL,
    prop_key TEXT NOT NULL,
    prop_value TEXT
);

CREATE TABLE IF NOT EXISTS build_artifacts (
    artifact_id INTEGER PRIMARY KEY,
    module_id INTEGER NOT NULL,
    artifact_name TEXT NOT NULL,
    artifact_type TEXT,
    sha1 TEXT,
    md5 TEXT
);

CREATE TABLE IF NOT EXISTS build_dependencies (
    dependency_id INTEGER PRIMARY KEY,
    module_id INTEGER NOT NULL,
    dependency_name_id TEXT NOT NULL,
    dependency_scopes TEXT,
    dependency_type TEXT,
    sha1 TEXT,
    md5 TEXT
);
"#;

/// Create every table the field registry refers to. Existing tables are kept.
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aql_core::registry;
    use aql_core::{Domain, PhysicalField};

    fn schema() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_every_registered_column_exists() {
        let conn = schema();
        for field in PhysicalField::all() {
            let ext = registry::lookup(field).unwrap();
            let sql = format!("select {} from {}", ext.column, ext.table.table_name());
            assert!(conn.prepare(&sql).is_ok(), "{}", sql);
        }
    }

    #[test]
    fn test_every_sub_domain_link_exists() {
        let conn = schema();
        for domain in Domain::ALL {
            for sub in domain.sub_domains() {
                let (from, to) = (domain.primary_table(), sub.primary_table());
                let (from_col, to_col) = registry::link(from, to).unwrap();
                let sql = format!(
                    "select a.{} from {} a join {} b on a.{} = b.{}",
                    from_col,
                    from.table_name(),
                    to.table_name(),
                    from_col,
                    to_col
                );
                assert!(conn.prepare(&sql).is_ok(), "{}", sql);
            }
        }
    }

    #[test]
    fn test_create_is_idempotent() {
        let conn = schema();
        assert!(create_schema(&conn).is_ok());
    }
}
