use super::utils::{number_arg, string_arg};
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::registry::{FunctionDescriptor, FunctionRegistry, FunctionResult, Param, DATE, NUMBER, STRING};
use crate::types::{Value, ValueKind};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, Timelike, Utc};

const DATE_OR_STRING: Param = Param::Kinds(&[ValueKind::Date, ValueKind::String]);

pub fn register(reg: &mut FunctionRegistry) {
    reg.define(FunctionDescriptor::new("now", |_: &[Value], _: &dyn EvaluationContext| Ok(Value::Date(Utc::now()))));
    reg.define(FunctionDescriptor::new("datePart", date_part).params([DATE, STRING]));
    reg.define(FunctionDescriptor::new("inc", inc).params([DATE, NUMBER, STRING]));
    reg.define(
        FunctionDescriptor::new("diff", diff)
            .params([DATE_OR_STRING, DATE_OR_STRING])
            .optional([STRING])
            .describe("diff(d1, d2, [unit]) for dates; diff(s1, s2) returns the tail of s2 after the common prefix"),
    );
}

fn date_arg(v: &Value) -> Result<DateTime<Utc>, EvalError> {
    match v {
        Value::Date(d) => Ok(*d),
        _ => Err(EvalError::expected("date")),
    }
}

fn date_part(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let d = date_arg(&args[0])?;
    let n = |x: u32| Value::Number(x as f64);
    Ok(match string_arg(&args[1])? {
        "years" | "year" => Value::Number(d.year() as f64),
        "months" | "month" => n(d.month()),
        "weeks" | "week" => n(d.iso_week().week()),
        "days" | "day" => n(d.day()),
        "weekday" => Value::string(weekday_name(d.weekday())),
        "hours" | "hour" => n(d.hour()),
        "minutes" | "minute" => n(d.minute()),
        "seconds" | "second" => n(d.second()),
        "milliseconds" | "ms" | "S" => n(d.timestamp_subsec_millis()),
        "time" => Value::Number(d.timestamp_millis() as f64),
        other => return Err(EvalError::semantic(format!("unknown date part '{}'", other))),
    })
}

fn weekday_name(w: chrono::Weekday) -> &'static str {
    match w {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

fn inc(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let d = date_arg(&args[0])?;
    let amount = number_arg(&args[1])?.trunc() as i64;
    let unit = string_arg(&args[2])?;
    let shifted = match unit {
        "years" | "year" => shift_months(d, amount.saturating_mul(12)),
        "months" | "month" => shift_months(d, amount),
        "weeks" | "week" => Duration::try_weeks(amount).and_then(|x| d.checked_add_signed(x)),
        "days" | "day" => Duration::try_days(amount).and_then(|x| d.checked_add_signed(x)),
        "hours" | "hour" => Duration::try_hours(amount).and_then(|x| d.checked_add_signed(x)),
        "minutes" | "minute" => Duration::try_minutes(amount).and_then(|x| d.checked_add_signed(x)),
        "seconds" | "second" => Duration::try_seconds(amount).and_then(|x| d.checked_add_signed(x)),
        "milliseconds" | "ms" => Duration::try_milliseconds(amount).and_then(|x| d.checked_add_signed(x)),
        other => return Err(EvalError::semantic(format!("unknown time unit '{}'", other))),
    };
    shifted
        .map(Value::Date)
        .ok_or_else(|| EvalError::semantic("date out of range"))
}

fn shift_months(d: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let m = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        d.checked_add_months(m)
    } else {
        d.checked_sub_months(m)
    }
}

fn diff(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    match (&args[0], &args[1]) {
        (Value::Date(a), Value::Date(b)) => {
            let unit = args.get(2).map(string_arg).transpose()?.unwrap_or("days");
            let span = *a - *b;
            let whole = |n: i64| Value::Number(n as f64);
            Ok(match unit {
                "years" | "year" => whole(months_between(b, a) / 12),
                "months" | "month" => whole(months_between(b, a)),
                "weeks" | "week" => whole(span.num_weeks()),
                "days" | "day" => whole(span.num_days()),
                "hours" | "hour" => whole(span.num_hours()),
                "minutes" | "minute" => whole(span.num_minutes()),
                "seconds" | "second" => whole(span.num_seconds()),
                "milliseconds" | "ms" => whole(span.num_milliseconds()),
                other => return Err(EvalError::semantic(format!("unknown time unit '{}'", other))),
            })
        }
        (Value::String(a), Value::String(b)) => {
            if args.len() == 3 {
                return Err(EvalError::type_error("diff of strings takes no unit"));
            }
            let common = a.chars().zip(b.chars()).take_while(|(x, y)| x == y).map(|(x, _)| x.len_utf8()).sum::<usize>();
            Ok(Value::string(&b[common..]))
        }
        _ => Err(EvalError::type_error("diff expects two dates or two strings")),
    }
}

/// Whole calendar months from `from` to `to`, truncated toward zero.
fn months_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> i64 {
    let mut months = (to.year() - from.year()) as i64 * 12 + to.month() as i64 - from.month() as i64;
    let later_in_month = (to.day(), to.time()) < (from.day(), from.time());
    if months > 0 && later_in_month {
        months -= 1;
    } else if months < 0 && (from.day(), from.time()) < (to.day(), to.time()) {
        months += 1;
    }
    months
}

/// Translates a `yyyy-MM-dd HH:mm:ss` style pattern into chrono's strftime
/// syntax. Quoted text ('T') is copied literally.
pub fn java_pattern_to_chrono(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            i += 1;
            if chars.get(i) == Some(&'\'') {
                out.push('\'');
                i += 1;
                continue;
            }
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }
        let mut run = 1;
        while chars.get(i + run) == Some(&c) {
            run += 1;
        }
        i += run;
        let directive = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('Z', _) => "%z",
            ('X', _) => "%:z",
            _ => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
                continue;
            }
        };
        out.push_str(directive);
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

const DEFAULT_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses a date from text: RFC 3339 first, then each pattern in order
/// (`yyyy-MM-dd` style), then the built-in ISO-like layouts. Naive results
/// are taken as UTC.
pub fn parse_date(text: &str, patterns: &[String]) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(text) {
        return Some(d.with_timezone(&Utc));
    }
    let translated: Vec<String> = patterns.iter().map(|p| java_pattern_to_chrono(p)).collect();
    translated
        .iter()
        .map(String::as_str)
        .chain(DEFAULT_FORMATS.iter().copied())
        .find_map(|fmt| parse_with(text, fmt))
}

fn parse_with(text: &str, fmt: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_str(text, fmt) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(text, fmt)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
