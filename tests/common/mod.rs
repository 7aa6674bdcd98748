//! Common test utilities for engine integration tests
//!
//! Provides:
//! - An in-memory SQLite database seeded with items, properties, stats and builds
//! - Recording capabilities for authorization, undeploy and property edits
//! - Service construction per dialect

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use artifact_aql::aql_core::{Dialect, ReadScope, RepoResolver, StaticRepoResolver};
use artifact_aql::{
    AqlService, AuthorizationProvider, EngineConfig, EngineError, EngineResult, MutationStatus,
    PropertyEditor, RepoPath, RepositoryMutator, SqliteExecutor,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;

const SEED: &str = r#"
insert into nodes (node_id, node_type, repo, node_path, node_name, depth, created, created_by, bin_length, sha1_actual) values
    (1, 0, 'repo1', '.', 'org', 1, 0, 'admin', null, null),
    (2, 0, 'repo1', 'org', 'acme', 2, 0, 'admin', null, null),
    (3, 1, 'repo1', 'org/acme', 'a.jar', 3, 0, 'alice', 100, 'sha-a'),
    (4, 1, 'repo1', 'org/acme', 'b.jar', 3, 0, 'alice', 200, 'sha-b'),
    (5, 1, 'repo1', 'org/acme', 'c.jar', 3, 0, 'bob', 300, 'sha-c'),
    (6, 1, 'repo1', 'org/acme', 'd.jar', 3, 0, 'bob', 400, 'sha-d'),
    (7, 1, 'repo2', '.', 'x.jar', 1, 0, 'carol', 500, 'sha-x'),
    (8, 1, 'auto-trashcan', 'repo1/org/acme', 'old.jar', 4, 0, 'admin', 50, 'sha-old');

insert into node_props (node_id, prop_key, prop_value) values
    (3, 'build.number', '67'),
    (3, 'build.name', 'acme'),
    (3, 'license', 'GPL'),
    (4, 'license', 'MIT'),
    (4, 'qa', 'passed'),
    (5, 'license', 'Apache-2.0'),
    (5, 'owner', 'alice'),
    (6, 'release', '1.0'),
    (7, 'build.number', '68'),
    (8, 'trash.time', '1700000000000');

insert into stats (node_id, download_count, last_downloaded, last_downloaded_by) values
    (3, 5, 0, 'alice');

insert into builds (build_id, build_name, build_number, ci_url, created, created_by) values
    (1, 'acme', '67', 'http://ci/acme/67', 0, 'ci');
insert into build_props (build_id, prop_key, prop_value) values (1, 'vcs.revision', 'abc123');
insert into build_promotions (build_id, created, created_by, status, repo, promotion_comment, ci_user) values
    (1, 0, 'ci', 'released', 'repo1', 'ok', 'bob');
insert into build_modules (module_id, build_id, module_name_id) values (1, 1, 'org.acme:core:1.0');
insert into build_artifacts (module_id, artifact_name, artifact_type, sha1, md5) values
    (1, 'a.jar', 'jar', 'sha-a', 'md5-a');
insert into build_dependencies (module_id, dependency_name_id, dependency_scopes, dependency_type, sha1) values
    (1, 'org.lib:util:2.0', 'compile', 'jar', 'sha-x');
"#;

/// In-memory database with the fixture data. `a.jar` was created a day ago,
/// every other node at the epoch.
pub fn seeded_executor() -> SqliteExecutor {
    let executor = SqliteExecutor::open_in_memory().expect("Failed to open SQLite");
    executor.create_schema().expect("Failed to create schema");
    let recent = Utc::now().timestamp_millis() - 86_400_000;
    executor
        .with_connection(|conn| {
            conn.execute_batch(SEED)?;
            conn.execute("update nodes set created = ?1 where node_id = 3", [recent])?;
            Ok(())
        })
        .expect("Failed to seed database");
    executor
}

/// Answers permission checks from a script and records every call.
pub struct RecordingAuthorization {
    delete_answers: Mutex<VecDeque<bool>>,
    scope: ReadScope,
    readable: bool,
    pub read_calls: Mutex<Vec<String>>,
    pub delete_calls: Mutex<Vec<String>>,
    pub annotate_calls: Mutex<Vec<String>>,
}

impl RecordingAuthorization {
    pub fn allow_all() -> Arc<Self> {
        Arc::new(Self::build(ReadScope::Unrestricted, true, &[]))
    }

    /// `can_delete` answers in order, then `true` once the script runs out.
    pub fn with_delete_answers(answers: &[bool]) -> Arc<Self> {
        Arc::new(Self::build(ReadScope::Unrestricted, true, answers))
    }

    pub fn scoped_to(repos: &[&str]) -> Arc<Self> {
        let scope = ReadScope::Repos(repos.iter().map(|r| r.to_string()).collect());
        Arc::new(Self::build(scope, true, &[]))
    }

    pub fn deny_reads() -> Arc<Self> {
        Arc::new(Self::build(ReadScope::Unrestricted, false, &[]))
    }

    fn build(scope: ReadScope, readable: bool, answers: &[bool]) -> Self {
        Self {
            delete_answers: Mutex::new(answers.iter().copied().collect()),
            scope,
            readable,
            read_calls: Mutex::new(Vec::new()),
            delete_calls: Mutex::new(Vec::new()),
            annotate_calls: Mutex::new(Vec::new()),
        }
    }
}

impl AuthorizationProvider for RecordingAuthorization {
    fn can_read(&self, path: &RepoPath) -> bool {
        self.read_calls.lock().push(path.to_string());
        self.readable
    }

    fn can_delete(&self, path: &RepoPath) -> bool {
        self.delete_calls.lock().push(path.to_string());
        self.delete_answers.lock().pop_front().unwrap_or(true)
    }

    fn can_annotate(&self, path: &RepoPath) -> bool {
        self.annotate_calls.lock().push(path.to_string());
        true
    }

    fn read_scope(&self) -> ReadScope {
        self.scope.clone()
    }
}

/// Records undeploy calls and reports a fixed outcome.
pub struct RecordingMutator {
    fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingMutator {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }
}

impl RepositoryMutator for RecordingMutator {
    fn undeploy(&self, path: &RepoPath) -> MutationStatus {
        self.calls.lock().push(path.to_string());
        if self.fail {
            MutationStatus::Error(format!("cannot undeploy {}", path))
        } else {
            MutationStatus::Ok
        }
    }
}

#[derive(Default)]
pub struct RecordingEditor {
    pub calls: Mutex<Vec<(String, String, Option<String>)>>,
}

impl PropertyEditor for RecordingEditor {
    fn edit_property(&self, path: &RepoPath, key: &str, value: Option<&str>) -> EngineResult<()> {
        self.calls
            .lock()
            .push((path.to_string(), key.to_string(), value.map(str::to_string)));
        Ok(())
    }
}

/// Seeded database plus recording capabilities.
pub struct Fixture {
    pub executor: Arc<SqliteExecutor>,
    pub auth: Arc<RecordingAuthorization>,
    pub mutator: Arc<RecordingMutator>,
    pub editor: Arc<RecordingEditor>,
    pub repos: Arc<dyn RepoResolver>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            executor: Arc::new(seeded_executor()),
            auth: RecordingAuthorization::allow_all(),
            mutator: RecordingMutator::succeeding(),
            editor: Arc::new(RecordingEditor::default()),
            repos: Arc::new(
                StaticRepoResolver::new().with_virtual("v-repo", ["repo1", "repo2"]),
            ),
        }
    }

    pub fn with_auth(mut self, auth: Arc<RecordingAuthorization>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_mutator(mut self, mutator: Arc<RecordingMutator>) -> Self {
        self.mutator = mutator;
        self
    }

    pub fn service(&self, dialect: Dialect) -> AqlService {
        AqlService::builder(self.executor.clone())
            .config(EngineConfig {
                dialect,
                ..EngineConfig::default()
            })
            .authorization(self.auth.clone())
            .repository_mutator(self.mutator.clone())
            .property_editor(self.editor.clone())
            .repo_resolver(self.repos.clone())
            .build()
            .expect("Failed to build service")
    }

    /// Run a query through the JSON streamer and parse the document.
    pub fn query(&self, dialect: Dialect, text: &str) -> Result<Value, EngineError> {
        let json = self.service(dialect).query_json(text)?;
        Ok(serde_json::from_str(&json).expect("Streamer produced invalid JSON"))
    }
}

/// Values of one field across the result rows, sorted.
pub fn column(doc: &Value, field: &str) -> Vec<String> {
    let mut values: Vec<String> = doc["results"]
        .as_array()
        .expect("results array")
        .iter()
        .filter_map(|row| row.get(field))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    values.sort();
    values
}

pub fn total(doc: &Value) -> u64 {
    doc["total"].as_u64().expect("total")
}
