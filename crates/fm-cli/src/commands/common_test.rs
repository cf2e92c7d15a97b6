use super::*;

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(850), "850ms");
    assert_eq!(format_duration(2_400), "2.4s");
    assert_eq!(format_duration(185_000), "3m 05s");
}

#[test]
fn test_cell_truncates() {
    let long = Value::text("abcdefghij");
    assert_eq!(cell(Some(&long), 5), "abcd…");
    assert_eq!(cell(Some(&Value::Int(42)), 5), "42");
    assert_eq!(cell(None, 5), "");
    assert_eq!(cell(Some(&Value::Null), 5), "");
}

#[test]
fn test_exit_code_displays_nothing() {
    assert_eq!(ExitCode(3).to_string(), "");
}
