use serde_json::json;
use std::io::Write;
use std::process::Command;

fn run_grel(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_grel"))
        .args(args)
        .env_remove("GREL_THREADS")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to start grel");
    let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

fn rows_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"name": "Ada Lovelace", "year": 1815}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"name": "Alan Turing", "year": 1912}}"#).unwrap();
    writeln!(file, r#"{{"name": "Grace Hopper"}}"#).unwrap();
    file
}

#[test]
fn single_value() {
    let (stdout, _, code) = run_grel(&["value.split(',').length()", "--value", "a,b,c"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "3");
}

#[test]
fn no_input_binds_nothing() {
    let (stdout, _, code) = run_grel(&["grel:1 + 2 * 3"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "7");
}

#[test]
fn single_row_with_column() {
    let (stdout, _, code) = run_grel(&[
        "value + ' from ' + cells.city.value",
        "--row",
        r#"{"name": "Ada", "city": "London"}"#,
        "--column",
        "name",
    ]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "Ada from London");
}

#[test]
fn default_column_is_first_key_in_file_order() {
    let (stdout, _, code) = run_grel(&["value", "--row", r#"{"name": "Ada", "city": "London"}"#]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "Ada");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"zone": "b", "alpha": 1}}"#).unwrap();
    writeln!(file, r#"{{"alpha": 2, "mid": "x", "zone": "c"}}"#).unwrap();
    let path = file.path().to_str().unwrap();
    let (stdout, _, code) = run_grel(&["value + '|' + row.columnNames.join(',')", "--rows", path]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "0\tb|zone,alpha,mid\n1\tc|zone,alpha,mid");
}

#[test]
fn json_output_wraps_result() {
    let (stdout, _, code) = run_grel(&["[1, 2]", "--output-json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed, json!({ "result": [1.0, 2.0] }));
}

#[test]
fn error_results_fail_in_plain_mode() {
    let (stdout, stderr, code) = run_grel(&["1 / 0"]);
    assert_ne!(code, 0);
    assert!(stdout.is_empty());
    assert!(stderr.contains("division by zero"), "{}", stderr);
}

#[test]
fn syntax_errors_fail() {
    let (_, stderr, code) = run_grel(&["1 +", "--value", "x"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("syntax error"), "{}", stderr);
}

#[test]
fn batch_rows_in_order() {
    let file = rows_file();
    let path = file.path().to_str().unwrap();
    let (stdout, _, code) = run_grel(&["value.split(' ')[0]", "--rows", path, "--column", "name"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "0\tAda\n1\tAlan\n2\tGrace");
}

#[test]
fn batch_json_output_keeps_errors_per_row() {
    let file = rows_file();
    let path = file.path().to_str().unwrap();
    let (stdout, _, code) = run_grel(&["2000 - cells.year.value", "--rows", path, "--column", "name", "--output-json"]);
    assert_eq!(code, 0);
    let lines: Vec<serde_json::Value> = stdout.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], json!({ "row": 0, "value": 185.0 }));
    assert_eq!(lines[1], json!({ "row": 1, "value": 88.0 }));
    assert!(lines[2]["value"]["error"].is_string());
}

#[test]
fn parallel_batch_matches_sequential() {
    let file = rows_file();
    let path = file.path().to_str().unwrap();
    let expr = "value.toUppercase()";
    let (sequential, _, _) = run_grel(&[expr, "--rows", path, "--column", "name"]);
    let (parallel, _, code) = run_grel(&[expr, "--rows", path, "--column", "name", "--parallel", "--threads", "2"]);
    assert_eq!(code, 0);
    assert_eq!(parallel, sequential);
}

#[test]
fn parallel_requires_rows() {
    let (_, _, code) = run_grel(&["value", "--parallel"]);
    assert_ne!(code, 0);
}
