// Configuration loading from a directory with aql-engine.toml and .env
use artifact_aql::aql_core::Dialect;
use artifact_aql::config::CONFIG_FILE_NAME;
use artifact_aql::{EngineConfig, EngineError};
use tempfile::TempDir;

#[test]
fn test_load_file_and_env() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "dialect = \"mysql\"\ndry_run_default = false\n",
    )
    .unwrap();
    std::fs::write(dir.path().join(".env"), "AQL_EAGER_LIMIT=42\n").unwrap();

    let config = EngineConfig::load(dir.path()).unwrap();
    assert_eq!(config.dialect, Dialect::Mysql);
    assert!(!config.dry_run_default);
    assert_eq!(config.eager_limit, 42);
}

#[test]
fn test_save_round_trip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = EngineConfig {
        dialect: Dialect::Postgresql,
        log_filter: "artifact_aql=debug".to_string(),
        ..EngineConfig::default()
    };
    config.trashcan.repo_key = "trash".to_string();
    config.save(dir.path()).unwrap();

    let content = std::fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert!(content.contains("dialect = \"postgresql\""));
    assert_eq!(EngineConfig::from_toml(&content).unwrap(), config);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = EngineConfig::load(dir.path()).unwrap();
    assert_eq!(config.dialect, Dialect::Derby);
    assert!(config.trashcan.enabled);
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "dialect = [1, 2").unwrap();
    assert!(matches!(
        EngineConfig::load(dir.path()),
        Err(EngineError::Config(_))
    ));
}
