use grel::{evaluate, evaluate_with, ErrorKind, Value};
use std::collections::HashMap;

fn b(v: Value) -> bool { if let Value::Boolean(b) = v { b } else { panic!("expected boolean, got {:?}", v) } }

#[test]
fn null_literals_and_blankness() {
    assert_eq!(evaluate("null").unwrap(), Value::Null);
    assert!(b(evaluate("isNull(null)").unwrap()));
    assert!(b(evaluate("isBlank('')").unwrap()));
    assert!(b(evaluate("isNonBlank(' ')").unwrap()));
    assert!(b(evaluate("isEmptyString('')").unwrap()));
    assert!(!b(evaluate("isEmptyString(null)").unwrap()));
    assert_eq!(evaluate("coalesce(null, 1 / 0, 'x')").unwrap(), Value::string("x"));
}

#[test]
fn null_concatenates_as_empty() {
    assert_eq!(evaluate("null + 'a'").unwrap(), Value::string("a"));
}

#[test]
fn field_access_on_null_is_an_error() {
    match evaluate("null.value").unwrap() {
        Value::Error(e) => assert_eq!(e.kind, ErrorKind::Field),
        other => panic!("expected field error, got {:?}", other),
    }
}

#[test]
fn introspection_consumes_errors() {
    assert!(b(evaluate("isError(1 / 0)").unwrap()));
    assert!(!b(evaluate("isError(1)").unwrap()));
    assert_eq!(evaluate("errorMessage(1 / 0)").unwrap(), Value::string("division by zero"));
    assert_eq!(evaluate("type(1 / 0)").unwrap(), Value::string("error"));
    assert_eq!(evaluate("isError(1 / 0) ? 'fallback' : 'ok'").unwrap(), Value::string("fallback"));
}

#[test]
fn ordinary_functions_propagate_errors() {
    match evaluate("toUppercase(1 / 0)").unwrap() {
        Value::Error(e) => assert_eq!(e.message, "division by zero"),
        other => panic!("expected error, got {:?}", other),
    }
}

#[test]
fn type_names() {
    let mut vars = HashMap::new();
    vars.insert("obj".to_string(), Value::from_json(serde_json::json!({"a": 1})));
    for (expr, expected) in [
        ("type('s')", "string"),
        ("type(1)", "number"),
        ("type(true)", "boolean"),
        ("type([1])", "array"),
        ("type(null)", "null"),
        ("type(/x/)", "regex"),
        ("type(obj)", "object"),
        ("type(now())", "date"),
    ] {
        assert_eq!(evaluate_with(expr, &vars).unwrap(), Value::string(expected), "{}", expr);
    }
}
