//! Import/export behaviour across the public fm-csv API

use fm_core::{Dataset, Value};
use fm_csv::{
    export_dataset, filter_data, get_dataset_info, import_dataset, sample_dataset,
    transform_data, CsvOptions, TransformRule, TransformRules,
};
use tempfile::TempDir;

#[test]
fn test_export_then_import_round_trips() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("users.csv");
    std::fs::write(
        &source,
        "id,name,email,age\n1,John Doe,john@example.com,30\n2,Jane Smith,jane@example.com,25\n",
    )
    .unwrap();

    let imported = import_dataset(&source, &CsvOptions::default()).unwrap();
    let copy = dir.path().join("copy").join("users.csv");
    let exported = export_dataset(&imported.data, &copy).unwrap();
    assert_eq!(exported.record_count, 2);

    let again = import_dataset(&copy, &CsvOptions::default()).unwrap();
    assert_eq!(again.record_count, 2);
    assert_eq!(again.data.columns, vec!["id", "name", "email", "age"]);
    assert_eq!(again.data, imported.data);
}

#[test]
fn test_import_transform_filter_export_pipeline() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("raw.csv");
    std::fs::write(
        &source,
        "id,email,status\n1,ANN@X.COM,1\n2,BOB@X.COM,0\n3,CAT@X.COM,1\n",
    )
    .unwrap();

    let data = import_dataset(&source, &CsvOptions::default()).unwrap().data;
    let rules = TransformRules::new()
        .with("email", TransformRule::lowercase())
        .with(
            "status",
            TransformRule::mapping([("1", "active"), ("0", "inactive")]),
        );
    let cleaned = transform_data(&data, &rules);
    let active = filter_data(&cleaned, |r| r.get("status") == Some(&Value::text("active")));

    let out = dir.path().join("active.csv");
    export_dataset(&active, &out).unwrap();
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "id,email,status\n1,ann@x.com,active\n3,cat@x.com,active\n"
    );

    let info = get_dataset_info(&out, &CsvOptions::default()).unwrap();
    assert_eq!(info.row_count, 2);

    let first = sample_dataset(&out, 1, &CsvOptions::default()).unwrap();
    assert_eq!(first.records[0]["id"], Value::text("1"));
}

#[test]
fn test_empty_dataset_round_trip_keeps_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.csv");
    let data = Dataset::with_columns(vec!["id".into(), "name".into()]);
    export_dataset(&data, &path).unwrap();

    let info = get_dataset_info(&path, &CsvOptions::default()).unwrap();
    assert_eq!(info.row_count, 0);
    assert_eq!(info.columns, vec!["id", "name"]);
}
