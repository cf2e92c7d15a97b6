use super::*;
use tempfile::TempDir;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str("name: test_project").unwrap();
    assert_eq!(config.name, "test_project");
    assert_eq!(config.batch_size, 1000);
    assert_eq!(config.source.db_type, DbType::DuckDb);
    assert_eq!(config.source.path, ":memory:");
    assert_eq!(config.csv.delimiter, ',');
    assert_eq!(config.csv.encoding, "utf-8");
    assert_eq!(config.plan, PlanOptions::default());
    assert!(config.tables.is_empty());

    let root = PathBuf::from("/tmp/project");
    assert_eq!(config.backup_dir_absolute(&root), root.join("backups"));
    assert_eq!(config.log_dir_absolute(&root), root.join("logs"));
    assert_eq!(
        config.state_file_absolute(&root),
        root.join("target/run_state.json")
    );
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: hr_migration
source:
  type: duckdb
  path: legacy.duckdb
target:
  type: memory
tables:
  - users
  - products
batch_size: 250
timeout_secs: 0
csv:
  delimiter: ";"
  encoding: windows-1252
  chunk_size: 500
plan:
  pre_validation: false
  post_cleanup: true
  max_table_retries: 2
transforms:
  email:
    kind: lowercase
  status:
    kind: mapping
    values:
      "1": active
      "0": inactive
    unmapped: unknown
  age:
    kind: coerce
    to: integer
load:
  required_columns: [id, email]
  key_columns: [id]
  backup: false
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();

    let tables: Vec<&str> = config.tables.iter().map(|t| t.as_str()).collect();
    assert_eq!(tables, vec!["users", "products"]);
    assert_eq!(config.target.db_type, DbType::Memory);
    assert_eq!(config.batch_size, 250);
    assert!(config.timeout().is_none());
    assert_eq!(config.delimiter_byte(), b';');
    assert_eq!(config.csv.chunk_size, 500);
    assert!(!config.plan.pre_validation);
    assert!(config.plan.post_validation);
    assert!(config.plan.post_cleanup);
    assert_eq!(config.plan.max_table_retries, 2);

    assert_eq!(config.transforms["email"], TransformDef::Lowercase);
    assert_eq!(
        config.transforms["age"],
        TransformDef::Coerce {
            to: CoerceType::Integer
        }
    );
    match &config.transforms["status"] {
        TransformDef::Mapping { values, unmapped } => {
            assert_eq!(values["1"], Value::text("active"));
            assert_eq!(unmapped, &Some(Value::text("unknown")));
        }
        other => panic!("unexpected rule {:?}", other),
    }

    assert_eq!(config.load.key_columns, vec!["id".to_string()]);
    assert!(!config.load.backup);
}

#[test]
fn test_unknown_field_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("name: x\nbatchsize: 10");
    assert!(result.is_err());
}

#[test]
fn test_validate_rejects_zero_batch_size() {
    let config: Config = serde_yaml::from_str("name: x\nbatch_size: 0").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("batch_size"));
}

#[test]
fn test_validate_rejects_duplicate_tables() {
    let config: Config = serde_yaml::from_str("name: x\ntables: [users, users]").unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_validate_rejects_non_ascii_delimiter() {
    let config: Config = serde_yaml::from_str("name: x\ncsv:\n  delimiter: \"§\"").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("fieldmove.yml"), "name: from_dir\n").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "from_dir");
}

#[test]
fn test_load_from_dir_missing() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}
