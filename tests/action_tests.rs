// Delete and property update actions run end to end
mod common;

use std::sync::Arc;

use artifact_aql::aql_core::Dialect;
use artifact_aql::{AqlService, EngineConfig};
use common::{column, seeded_executor, total, Fixture, RecordingAuthorization, RecordingMutator};

const DELETE_FILES: &str = r#"items.delete({"repo":"repo1","type":"file"}).dryRun(false)"#;

#[test]
fn test_delete_undeploys_every_row() {
    let fixture = Fixture::new();
    let doc = fixture.query(Dialect::Mysql, DELETE_FILES).unwrap();

    assert_eq!(total(&doc), 4);
    assert_eq!(column(&doc, "name"), vec!["a.jar", "b.jar", "c.jar", "d.jar"]);
    assert_eq!(column(&doc, "path"), vec!["org/acme"; 4]);

    let mut calls = fixture.mutator.calls.lock().clone();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            "repo1:org/acme/a.jar",
            "repo1:org/acme/b.jar",
            "repo1:org/acme/c.jar",
            "repo1:org/acme/d.jar"
        ]
    );
}

#[test]
fn test_failed_undeploys_are_dropped() {
    let fixture = Fixture::new().with_mutator(RecordingMutator::failing());
    let doc = fixture.query(Dialect::Mysql, DELETE_FILES).unwrap();

    assert_eq!(total(&doc), 0);
    assert_eq!(doc["results"], serde_json::json!([]));
    assert_eq!(fixture.mutator.calls.lock().len(), 4);
}

#[test]
fn test_dry_run_delete_checks_permission_only() {
    let fixture =
        Fixture::new().with_auth(RecordingAuthorization::with_delete_answers(&[false, false, true, true]));
    let doc = fixture
        .query(Dialect::Mysql, r#"items.delete({"repo":"repo1","type":"file"})"#)
        .unwrap();

    assert_eq!(total(&doc), 2);
    assert!(fixture.mutator.calls.lock().is_empty());
    assert_eq!(fixture.auth.delete_calls.lock().len(), 4);
}

#[test]
fn test_delete_rejected_outside_items() {
    let fixture = Fixture::new();
    let err = fixture
        .query(Dialect::Mysql, r#"builds.delete({"name":"acme"})"#)
        .unwrap_err();
    assert!(err.is_compile_error());
    assert!(fixture.mutator.calls.lock().is_empty());
}

#[test]
fn test_update_edits_every_key_on_every_item() {
    let fixture = Fixture::new();
    let doc = fixture
        .query(
            Dialect::Mysql,
            r#"properties.update({"key":"build.number","value":"67"}).keys("build.number","dummy").newValue("69").dryRun(false)"#,
        )
        .unwrap();

    assert_eq!(total(&doc), 1);
    assert_eq!(doc["results"][0]["key"], "build.number");
    assert_eq!(doc["results"][0]["items"][0]["name"], "a.jar");

    let calls = fixture.editor.calls.lock().clone();
    assert_eq!(
        calls,
        vec![
            (
                "repo1:org/acme/a.jar".to_string(),
                "build.number".to_string(),
                Some("69".to_string())
            ),
            (
                "repo1:org/acme/a.jar".to_string(),
                "dummy".to_string(),
                Some("69".to_string())
            ),
        ]
    );
}

#[test]
fn test_dry_run_update_checks_annotate_permission() {
    let fixture = Fixture::new();
    let doc = fixture
        .query(
            Dialect::Mysql,
            r#"properties.update({"key":"license","value":"MIT"}).keys("license").newValue("BSD")"#,
        )
        .unwrap();

    assert_eq!(total(&doc), 1);
    assert!(fixture.editor.calls.lock().is_empty());
    assert_eq!(
        fixture.auth.annotate_calls.lock().clone(),
        vec!["repo1:org/acme/b.jar"]
    );
}

#[test]
fn test_sqlite_backed_delete_and_update() {
    let executor = Arc::new(seeded_executor());
    let service = AqlService::builder(executor.clone())
        .config(EngineConfig {
            dialect: Dialect::Mysql,
            dry_run_default: false,
            ..EngineConfig::default()
        })
        .repository_mutator(executor.clone())
        .property_editor(executor.clone())
        .build()
        .unwrap();

    // dryRun is omitted, so the configured default applies
    let deleted = service.execute_eager(r#"items.delete({"name":"a.jar"})"#).unwrap();
    assert_eq!(deleted.len(), 1);
    let remaining = service.execute_eager(r#"items.find({"name":"a.jar"})"#).unwrap();
    assert!(remaining.is_empty());
    let orphans = service
        .execute_eager(r#"properties.find({"key":"build.name"})"#)
        .unwrap();
    assert!(orphans.is_empty());

    let updated = service
        .execute_eager(
            r#"properties.update({"key":"license","value":"MIT"}).keys("license").newValue("BSD")"#,
        )
        .unwrap();
    assert_eq!(updated.len(), 1);
    let json = service
        .query_json(r#"items.find({"@license":"BSD"}).include("name")"#)
        .unwrap();
    assert_eq!(json, r#"{"results":[{"name":"b.jar"}],"total":1}"#);
}
