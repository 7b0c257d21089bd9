use crate::error::EvalError;
use crate::types::Value;

/// Resolves a possibly negative index against `len`.
pub fn clamp_index(len: usize, idx: isize) -> Option<usize> {
    if idx >= 0 {
        let i = idx as usize;
        if i < len {
            Some(i)
        } else {
            None
        }
    } else {
        let neg = idx.unsigned_abs();
        if neg <= len {
            Some(len - neg)
        } else {
            None
        }
    }
}

/// Half-open `[from, to)` range for slicing, with negative bounds counted
/// from the end and everything clamped to `0..=len`.
pub fn slice_bounds(len: usize, from: f64, to: Option<f64>) -> (usize, usize) {
    let len_i = len as isize;
    let norm = |n: f64| {
        let i = n.trunc() as isize;
        let i = if i < 0 { len_i + i } else { i };
        i.clamp(0, len_i) as usize
    };
    let start = norm(from);
    let end = to.map(norm).unwrap_or(len);
    if start > end {
        (start, start)
    } else {
        (start, end)
    }
}

/// Structural equality between values of the same kind.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(ax), Value::Array(ay)) => {
            ax.len() == ay.len() && ax.iter().zip(ay.iter()).all(|(u, v)| values_equal(u, v))
        }
        _ => a == b,
    }
}

pub fn number_arg(v: &Value) -> Result<f64, EvalError> {
    v.as_number().ok_or_else(|| EvalError::expected("number"))
}

pub fn string_arg(v: &Value) -> Result<&str, EvalError> {
    v.as_str().ok_or_else(|| EvalError::expected("string"))
}

pub fn bool_arg(v: &Value) -> Result<bool, EvalError> {
    v.as_bool().ok_or_else(|| EvalError::expected("boolean"))
}

/// Optional trailing boolean, `default` when absent.
pub fn flag_arg(args: &[Value], position: usize, default: bool) -> Result<bool, EvalError> {
    args.get(position).map(bool_arg).transpose().map(|b| b.unwrap_or(default))
}

/// Number argument that must be a whole, non-negative count.
pub fn count_arg(v: &Value) -> Result<usize, EvalError> {
    let n = number_arg(v)?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(EvalError::semantic(format!("expected a non-negative integer, got {}", v)));
    }
    Ok(n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_indices_count_from_end() {
        assert_eq!(clamp_index(3, -1), Some(2));
        assert_eq!(clamp_index(3, -3), Some(0));
        assert_eq!(clamp_index(3, -4), None);
        assert_eq!(clamp_index(3, 3), None);
    }

    #[test]
    fn slices_clamp() {
        assert_eq!(slice_bounds(5, 1.0, Some(3.0)), (1, 3));
        assert_eq!(slice_bounds(5, -2.0, None), (3, 5));
        assert_eq!(slice_bounds(5, 4.0, Some(2.0)), (4, 4));
        assert_eq!(slice_bounds(5, 0.0, Some(99.0)), (0, 5));
    }
}
