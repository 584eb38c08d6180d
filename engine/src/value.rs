//! Shared JSON value coercions used by the rule evaluators.

use serde_json::Value;

/// Strict equality: scalars compare by value (numbers numerically),
/// composites never compare equal. Mixed scalar types are unequal.
pub(crate) fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}

/// Loose equality: numbers and numeric strings compare numerically,
/// booleans coerce to numbers, otherwise strict.
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => match (coerce_number(a), coerce_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => strict_eq(a, b),
    }
}

/// Numeric coercion: numbers pass through, numeric strings parse,
/// booleans map to 0/1. Everything else has no numeric value.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Wraps an `f64` back into a JSON value; non-finite results become null.
pub(crate) fn number_value(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// String rendering used for concatenation: numbers drop a trailing
/// fractional zero, null renders as "null".
pub(crate) fn render_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
            _ => number.to_string(),
        },
        Value::Bool(flag) => flag.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_strict_eq_scalars() {
        assert!(strict_eq(&json!(1), &json!(1.0)));
        assert!(strict_eq(&json!("x"), &json!("x")));
        assert!(!strict_eq(&json!(1), &json!("1")));
        assert!(!strict_eq(&json!(true), &json!(1)));
    }

    #[test]
    fn test_strict_eq_never_matches_composites() {
        assert!(!strict_eq(&json!([1]), &json!([1])));
        assert!(!strict_eq(&json!({"a": 1}), &json!({"a": 1})));
    }

    #[test]
    fn test_loose_eq_coerces_numeric_strings_and_bools() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!(true), &json!(1)));
        assert!(loose_eq(&json!(false), &json!("0")));
        assert!(!loose_eq(&json!("a"), &json!(1)));
    }

    #[test]
    fn test_render_string_drops_integer_fraction() {
        assert_eq!(render_string(&json!(3.0)), "3");
        assert_eq!(render_string(&json!(3.5)), "3.5");
        assert_eq!(render_string(&json!(null)), "null");
    }
}
