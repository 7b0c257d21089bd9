use grel::{evaluate, evaluate_with, ErrorKind, Value};
use std::collections::HashMap;

fn n(v: Value) -> f64 { if let Value::Number(n) = v { n } else { panic!("expected number, got {:?}", v) } }
fn b(v: Value) -> bool { if let Value::Boolean(b) = v { b } else { panic!("expected boolean, got {:?}", v) } }
fn err(v: Value) -> grel::EvalError { if let Value::Error(e) = v { e } else { panic!("expected error, got {:?}", v) } }

#[test]
fn precedence_and_grouping() {
    assert_eq!(n(evaluate("2 + 3 * 4").unwrap()), 14.0);
    assert_eq!(n(evaluate("(2 + 3) * 4").unwrap()), 20.0);
    assert_eq!(n(evaluate("10 - 4 - 3").unwrap()), 3.0);
    assert_eq!(n(evaluate("-2 * 3").unwrap()), -6.0);
    assert_eq!(n(evaluate("7 % 4 + 1.5e1").unwrap()), 18.0);
    assert_eq!(n(evaluate("grel:1 + 1").unwrap()), 2.0);
}

#[test]
fn numeric_strings_coerce() {
    let mut vars = HashMap::new();
    vars.insert("value".to_string(), Value::string("12"));
    assert_eq!(n(evaluate_with("value * 2", &vars).unwrap()), 24.0);
    assert!(b(evaluate_with("value > 9", &vars).unwrap()));
    assert!(b(evaluate_with("value == 12", &vars).unwrap()));
    assert_eq!(err(evaluate("'abc' * 2").unwrap()).message, "type error: expected number");
}

#[test]
fn plus_between_strings_concatenates() {
    let mut vars = HashMap::new();
    vars.insert("value".to_string(), Value::string("12"));
    assert_eq!(evaluate(r#""1" + "2""#).unwrap(), Value::string("12"));
    assert_eq!(evaluate_with("value + '3'", &vars).unwrap(), Value::string("123"));
    assert_eq!(n(evaluate(r#""1" + 2"#).unwrap()), 3.0);
    assert_eq!(n(evaluate_with("value + 1", &vars).unwrap()), 13.0);
    assert_eq!(evaluate(r#""n=" + 2"#).unwrap(), Value::string("n=2"));
}

#[test]
fn division_by_zero_is_semantic_error() {
    assert_eq!(err(evaluate("1 / 0").unwrap()).kind, ErrorKind::Semantic);
    assert_eq!(err(evaluate("1 % 0").unwrap()).kind, ErrorKind::Semantic);
}

#[test]
fn comparisons_and_logic() {
    assert!(b(evaluate("1 < 2 && 2 <= 2 && 3 >= 1 && 3 != 4").unwrap()));
    assert!(b(evaluate("'apple' < 'banana'").unwrap()));
    assert!(b(evaluate("!(1 > 2) || false").unwrap()));
    assert!(!b(evaluate("null == ''").unwrap()));
    assert!(b(evaluate("null == null").unwrap()));
    assert_eq!(err(evaluate("1 && true").unwrap()).message, "type error: expected boolean");
    assert_eq!(err(evaluate("true && 'yes'").unwrap()).message, "type error: expected boolean");
    assert!(!b(evaluate("true && false").unwrap()));
    assert!(b(evaluate("false || true").unwrap()));
}

#[test]
fn ternary_is_right_associative() {
    assert_eq!(n(evaluate("false ? 1 : true ? 2 : 3").unwrap()), 2.0);
    assert_eq!(err(evaluate("1 ? 2 : 3").unwrap()).kind, ErrorKind::Type);
}

#[test]
fn math_functions() {
    assert_eq!(n(evaluate("round(2.5) + floor(1.9) + ceil(0.1)").unwrap()), 5.0);
    assert_eq!(n(evaluate("abs(-3) * pow(2, 3)").unwrap()), 24.0);
    assert_eq!(n(evaluate("max(3, 9, 4) - min(3, 9, 4)").unwrap()), 6.0);
    assert_eq!(n(evaluate("sum([1, 2, 3.5])").unwrap()), 6.5);
    assert_eq!(n(evaluate("mod(7, 3)").unwrap()), 1.0);
    assert!((n(evaluate("log(1000)").unwrap()) - 3.0).abs() < 1e-12);
    assert_eq!(n(evaluate("'42'.toNumber() + 1").unwrap()), 43.0);
    assert_eq!(err(evaluate("round('2.5')").unwrap()).kind, ErrorKind::Type);
}

#[test]
fn operator_errors_propagate_left_first() {
    let e = err(evaluate("unknownA + unknownB").unwrap());
    assert_eq!(e.kind, ErrorKind::UnknownVariable);
    assert_eq!(e.message, "unknown variable 'unknownA'");
    assert_eq!(err(evaluate("1 + nope()").unwrap()).kind, ErrorKind::UnknownFunction);
    assert_eq!(err(evaluate("-(1 / 0)").unwrap()).kind, ErrorKind::Semantic);
}

#[test]
fn syntax_errors_carry_positions() {
    let e = evaluate("1 + * 2").unwrap_err();
    assert_eq!(e.position, 4);
    let e = evaluate("grel:1 +").unwrap_err();
    assert_eq!(e.position, 8);
    assert!(evaluate("1 = 2").is_err());
}
