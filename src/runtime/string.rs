use super::utils::{count_arg, flag_arg, slice_bounds, string_arg};
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::registry::{FunctionDescriptor, FunctionRegistry, FunctionResult, ANY, BOOLEAN, NUMBER, PATTERN, STRING, TEXT_LIKE};
use crate::types::{RegexValue, Value};
use regex::Regex;

pub fn register(reg: &mut FunctionRegistry) {
    reg.define(
        FunctionDescriptor::new("split", split)
            .params([TEXT_LIKE, PATTERN])
            .optional([BOOLEAN])
            .describe("split(s, sep, [includeEmptyTokens]) splits on a literal or regex separator"),
    );
    reg.define(
        FunctionDescriptor::new("splitByLengths", split_by_lengths)
            .arity(2, None)
            .params([STRING, NUMBER])
            .variadic(NUMBER)
            .describe("splitByLengths(s, n1, n2, ...) cuts consecutive substrings"),
    );
    reg.define(FunctionDescriptor::new("toUppercase", |a: &[Value], _: &dyn EvaluationContext| map_text(a, str::to_uppercase)).params([TEXT_LIKE]));
    reg.define(FunctionDescriptor::new("toLowercase", |a: &[Value], _: &dyn EvaluationContext| map_text(a, str::to_lowercase)).params([TEXT_LIKE]));
    reg.define(FunctionDescriptor::new("toTitlecase", |a: &[Value], _: &dyn EvaluationContext| map_text(a, title_case)).params([TEXT_LIKE]));
    reg.define(FunctionDescriptor::new("trim", |a: &[Value], _: &dyn EvaluationContext| map_text(a, |s| s.trim().to_string())).params([STRING]));
    reg.define(FunctionDescriptor::new("strip", |a: &[Value], _: &dyn EvaluationContext| map_text(a, |s| s.trim().to_string())).params([STRING]));
    reg.define(FunctionDescriptor::new("chomp", chomp).params([STRING, STRING]));
    reg.define(FunctionDescriptor::new("substring", substring).params([STRING, NUMBER]).optional([NUMBER]));
    reg.define(FunctionDescriptor::new("startsWith", |a: &[Value], _: &dyn EvaluationContext| {
        Ok(Value::Boolean(string_arg(&a[0])?.starts_with(string_arg(&a[1])?)))
    }).params([STRING, STRING]));
    reg.define(FunctionDescriptor::new("endsWith", |a: &[Value], _: &dyn EvaluationContext| {
        Ok(Value::Boolean(string_arg(&a[0])?.ends_with(string_arg(&a[1])?)))
    }).params([STRING, STRING]));
    reg.define(FunctionDescriptor::new("contains", contains).params([STRING, PATTERN]));
    reg.define(FunctionDescriptor::new("replace", replace).params([STRING, PATTERN, STRING]));
    reg.define(FunctionDescriptor::new("replaceChars", replace_chars).params([STRING, STRING, STRING]));
    reg.define(
        FunctionDescriptor::new("match", match_groups)
            .params([STRING, PATTERN])
            .describe("match(s, pattern) returns capture groups when the whole string matches, else null"),
    );
    reg.define(FunctionDescriptor::new("find", find).params([STRING, PATTERN]));
    reg.define(FunctionDescriptor::new("partition", |a: &[Value], _: &dyn EvaluationContext| partition(a, false)).params([STRING, PATTERN]).optional([BOOLEAN]));
    reg.define(FunctionDescriptor::new("rpartition", |a: &[Value], _: &dyn EvaluationContext| partition(a, true)).params([STRING, PATTERN]).optional([BOOLEAN]));
    reg.define(FunctionDescriptor::new("unicode", |a: &[Value], _: &dyn EvaluationContext| {
        Ok(Value::Array(string_arg(&a[0])?.chars().map(|c| Value::Number(c as u32 as f64)).collect()))
    }).params([STRING]));
    reg.define(FunctionDescriptor::new("fingerprint", |a: &[Value], _: &dyn EvaluationContext| map_text(a, fingerprint)).params([ANY]));
}

fn map_text<F: Fn(&str) -> String>(args: &[Value], f: F) -> FunctionResult {
    Ok(Value::String(f(&args[0].to_string())))
}

fn split(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let s = args[0].to_string();
    let include_empty = flag_arg(args, 2, false)?;
    let parts = match &args[1] {
        Value::String(sep) => split_literal(&s, sep, include_empty),
        Value::Regex(re) => split_regex(&s, &re.compiled, include_empty),
        _ => return Err(EvalError::expected("string or regex separator")),
    };
    Ok(Value::strings(parts))
}

/// Literal separator split. An empty input has no tokens; an empty separator
/// splits on whitespace.
pub fn split_literal(s: &str, sep: &str, include_empty: bool) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    let parts: Vec<&str> = if sep.is_empty() {
        s.split(char::is_whitespace).collect()
    } else {
        s.split(sep).collect()
    };
    parts
        .into_iter()
        .filter(|p| include_empty || !p.is_empty())
        .map(String::from)
        .collect()
}

/// Regex separator split.
///
/// Without `include_empty` every empty token is dropped. With it, a leading
/// empty token is kept when the first match starts past a zero-width
/// position, trailing empty tokens are removed, and an input with no match
/// (including the empty string) yields itself as the only token.
pub fn split_regex(s: &str, re: &Regex, include_empty: bool) -> Vec<String> {
    if !include_empty {
        return re.split(s).filter(|p| !p.is_empty()).map(String::from).collect();
    }
    let mut parts: Vec<&str> = Vec::new();
    let mut index = 0;
    let mut matched = false;
    for m in re.find_iter(s) {
        if index == 0 && m.start() == 0 && m.end() == 0 {
            continue;
        }
        parts.push(&s[index..m.start()]);
        index = m.end();
        matched = true;
    }
    if !matched {
        return vec![s.to_string()];
    }
    parts.push(&s[index..]);
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts.into_iter().map(String::from).collect()
}

fn split_by_lengths(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let chars: Vec<char> = string_arg(&args[0])?.chars().collect();
    let mut out = Vec::new();
    let mut start = 0;
    for len in &args[1..] {
        if start >= chars.len() {
            break;
        }
        let end = start.saturating_add(count_arg(len)?).min(chars.len());
        out.push(chars[start..end].iter().collect::<String>());
        start = end;
    }
    Ok(Value::strings(out))
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

fn chomp(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let s = string_arg(&args[0])?;
    let sep = string_arg(&args[1])?;
    Ok(Value::string(s.strip_suffix(sep).unwrap_or(s)))
}

fn substring(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let chars: Vec<char> = string_arg(&args[0])?.chars().collect();
    let from = args[1].as_number().unwrap_or(0.0);
    let to = args.get(2).and_then(Value::as_number);
    let (start, end) = slice_bounds(chars.len(), from, to);
    Ok(Value::String(chars[start..end].iter().collect()))
}

/// String patterns are taken literally.
fn compile(pattern: &Value) -> Result<RegexValue, EvalError> {
    match pattern {
        Value::Regex(r) => Ok(r.clone()),
        Value::String(s) => RegexValue::new(&regex::escape(s), false)
            .map_err(|e| EvalError::semantic("invalid regular expression").caused_by(EvalError::semantic(e.to_string()))),
        _ => Err(EvalError::expected("string or regex")),
    }
}

fn contains(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let s = string_arg(&args[0])?;
    Ok(Value::Boolean(match &args[1] {
        Value::Regex(r) => r.compiled.is_match(s),
        other => s.contains(string_arg(other)?),
    }))
}

fn replace(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let s = string_arg(&args[0])?;
    let with = string_arg(&args[2])?;
    Ok(Value::String(match &args[1] {
        Value::Regex(r) => r.compiled.replace_all(s, with).into_owned(),
        other => s.replace(string_arg(other)?, with),
    }))
}

/// Maps each char of `from` to the char at the same position of `to`;
/// chars without a counterpart are deleted.
fn replace_chars(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let s = string_arg(&args[0])?;
    let from: Vec<char> = string_arg(&args[1])?.chars().collect();
    let to: Vec<char> = string_arg(&args[2])?.chars().collect();
    let out = s
        .chars()
        .filter_map(|c| match from.iter().position(|f| *f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect();
    Ok(Value::String(out))
}

fn match_groups(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let s = string_arg(&args[0])?;
    let pattern = match &args[1] {
        Value::Regex(r) => r.clone(),
        other => compile(other)?,
    };
    let anchored = RegexValue::new(&format!("^(?:{})$", pattern.source), pattern.case_insensitive)
        .map_err(|e| EvalError::semantic("invalid regular expression").caused_by(EvalError::semantic(e.to_string())))?;
    Ok(match anchored.compiled.captures(s) {
        Some(caps) => Value::Array(
            caps.iter()
                .skip(1)
                .map(|g| g.map(|m| Value::string(m.as_str())).unwrap_or(Value::Null))
                .collect(),
        ),
        None => Value::Null,
    })
}

fn find(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let s = string_arg(&args[0])?;
    let re = compile(&args[1])?;
    Ok(Value::strings(re.compiled.find_iter(s).map(|m| m.as_str())))
}

fn partition(args: &[Value], from_end: bool) -> FunctionResult {
    let s = string_arg(&args[0])?;
    let omit = flag_arg(args, 2, false)?;
    let re = compile(&args[1])?;
    let hit = if from_end { re.compiled.find_iter(s).last() } else { re.compiled.find(s) };
    let (before, frag, after) = match hit {
        Some(m) => (&s[..m.start()], m.as_str(), &s[m.end()..]),
        None if from_end => ("", "", s),
        None => (s, "", ""),
    };
    Ok(if omit { Value::strings([before, after]) } else { Value::strings([before, frag, after]) })
}

/// Clustering key: trimmed, punctuation and control characters removed,
/// lowercased, then unique whitespace-separated tokens sorted and rejoined.
fn fingerprint(s: &str) -> String {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && !(c.is_control() && *c != '\t'))
        .collect::<String>()
        .to_lowercase();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens.join(" ")
}
