use grel::{evaluate, evaluate_with, ErrorKind, Value};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn s(v: Value) -> String { if let Value::String(s) = v { s } else { panic!("expected string, got {:?}", v) } }
fn n(v: Value) -> f64 { if let Value::Number(n) = v { n } else { panic!("expected number, got {:?}", v) } }
fn strs(v: Value) -> Vec<String> {
    match v {
        Value::Array(items) => items.into_iter().map(s).collect(),
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn split_golden_cases() {
    assert_eq!(strs(evaluate(r#"split("a,,b,c,d", ",")"#).unwrap()), ["a", "b", "c", "d"]);
    assert_eq!(strs(evaluate(r#"split("a,,b,c,d", ",", true)"#).unwrap()), ["a", "", "b", "c", "d"]);
    assert!(strs(evaluate(r#"split("", ",")"#).unwrap()).is_empty());
    assert!(strs(evaluate(r#"split(",,,", ",")"#).unwrap()).is_empty());
    assert_eq!(strs(evaluate(r#"split(" a b  c ", " ")"#).unwrap()), ["a", "b", "c"]);
    assert_eq!(strs(evaluate(r#"split(" a b  c ", " ", true)"#).unwrap()), ["", "a", "b", "", "c", ""]);
}

#[test]
fn split_flag_is_not_coerced() {
    match evaluate(r#"split(" a b  c ", " ", "true")"#).unwrap() {
        Value::Error(e) => assert_eq!(e.kind, ErrorKind::Type),
        other => panic!("expected type error, got {:?}", other),
    }
}

#[test]
fn regex_split_asymmetry() {
    assert_eq!(strs(evaluate(r#"split(" a b  c ", /\s+/, true)"#).unwrap()), ["", "a", "b", "c"]);
    assert_eq!(strs(evaluate(r#"split(" a b  c ", /\s+/)"#).unwrap()), ["a", "b", "c"]);
    assert_eq!(strs(evaluate(r#"split("", /,/, true)"#).unwrap()), [""]);
    assert_eq!(strs(evaluate(r#"split("a1b22c", /\d+/)"#).unwrap()), ["a", "b", "c"]);
}

#[test]
fn split_coerces_subject_to_string() {
    assert_eq!(strs(evaluate(r#"split(1.5, ".")"#).unwrap()), ["1", "5"]);
    assert!(matches!(evaluate(r#"split(null, ",")"#).unwrap(), Value::Error(_)));
}

#[test]
fn case_and_whitespace() {
    assert_eq!(s(evaluate(r#""  john \t".trim().toUppercase()"#).unwrap()), "JOHN");
    assert_eq!(s(evaluate(r#"toTitlecase("the QUICK fox")"#).unwrap()), "The Quick Fox");
    assert_eq!(s(evaluate(r#"toLowercase("AbC")"#).unwrap()), "abc");
    assert_eq!(s(evaluate(r#"chomp("line\n", "\n")"#).unwrap()), "line");
    assert_eq!(n(evaluate(r#"length("hé")"#).unwrap()), 2.0);
}

#[test]
fn substrings_and_search() {
    assert_eq!(s(evaluate(r#""abcdef".substring(1, 3)"#).unwrap()), "bc");
    assert_eq!(s(evaluate(r#""abcdef".substring(-2)"#).unwrap()), "ef");
    assert_eq!(s(evaluate(r#""abcdef"[2]"#).unwrap()), "c");
    assert_eq!(evaluate(r#""abcdef".startsWith("ab")"#).unwrap(), Value::Boolean(true));
    assert_eq!(evaluate(r#""abcdef".contains(/D/i)"#).unwrap(), Value::Boolean(true));
    assert_eq!(n(evaluate(r#""banana".lastIndexOf("an")"#).unwrap()), 3.0);
}

#[test]
fn replacing() {
    assert_eq!(s(evaluate("replace('foo bar foo', 'foo', 'baz')").unwrap()), "baz bar baz");
    assert_eq!(s(evaluate(r#"replace("a1b22", /(\d+)/, "<$1>")"#).unwrap()), "a<1>b<22>");
    assert_eq!(s(evaluate(r#"replaceChars("a-b_c", "-_", " ")"#).unwrap()), "a bc");
    // string patterns are literal, not regex
    assert_eq!(s(evaluate(r#"replace("a.b", ".", "!")"#).unwrap()), "a!b");
}

#[test]
fn match_and_find() {
    assert_eq!(strs(evaluate(r#"match("2024-07", /(\d+)-(\d+)/)"#).unwrap()), ["2024", "07"]);
    assert_eq!(evaluate(r#"match("x2024-07", /(\d+)-(\d+)/)"#).unwrap(), Value::Null);
    assert_eq!(strs(evaluate(r#"find("a1b22c333", /\d+/)"#).unwrap()), ["1", "22", "333"]);
}

#[test]
fn partitions() {
    assert_eq!(strs(evaluate(r#"partition("key=value=x", "=")"#).unwrap()), ["key", "=", "value=x"]);
    assert_eq!(strs(evaluate(r#"rpartition("key=value=x", "=")"#).unwrap()), ["key=value", "=", "x"]);
    assert_eq!(strs(evaluate(r#"partition("abc", "=", true)"#).unwrap()), ["abc", ""]);
}

#[test]
fn split_by_lengths_and_unicode() {
    assert_eq!(strs(evaluate(r#"splitByLengths("20240704", 4, 2, 2, 9)"#).unwrap()), ["2024", "07", "04"]);
    assert_eq!(evaluate(r#"unicode("Ab")"#).unwrap(), Value::Array(vec![Value::Number(65.0), Value::Number(98.0)]));
}

#[test]
fn split_by_lengths_with_huge_length() {
    assert_eq!(strs(evaluate(r#"splitByLengths("abc", 1, 1e300)"#).unwrap()), ["a", "bc"]);
    assert_eq!(strs(evaluate(r#"splitByLengths("abc", 1e300, 1)"#).unwrap()), ["abc"]);
}

#[test]
fn concatenation_with_variables() {
    let mut vars = HashMap::new();
    vars.insert("name".to_string(), Value::string("Jane"));
    assert_eq!(s(evaluate_with(r#""Hello, " + name"#, &vars).unwrap()), "Hello, Jane");
    assert_eq!(s(evaluate_with(r#"name + 42"#, &vars).unwrap()), "Jane42");
}

#[test]
fn fingerprint_keys() {
    assert_eq!(s(evaluate(r#"fingerprint("Acme, Inc.")"#).unwrap()), s(evaluate(r#"fingerprint("inc acme")"#).unwrap()));
}
