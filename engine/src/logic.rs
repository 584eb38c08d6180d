//! JSON Logic rule evaluation.
//!
//! Declarative validation rules are JSON-encoded trees in the standard
//! JSON Logic vocabulary: an object with a single operator key applied
//! to its arguments, evaluated against a data context. The operator set
//! here matches the reference implementation for the operators form
//! rules actually use — equality, variable lookup, boolean composition,
//! comparisons, arithmetic, membership, and string/array assembly — so
//! previously authored rules keep their meaning.
//!
//! Failure policy: where the custom-expression sandbox fails open, a
//! JSON Logic failure is **fail-closed** — [`evaluate_rule`] logs a
//! diagnostic and reports the rule as not satisfied. The asymmetry is
//! deliberate.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::value::{coerce_number, loose_eq, number_value, render_string, strict_eq};

/// Maximum rule tree depth.
const MAX_RULE_DEPTH: usize = 64;

/// Stand-in for absent operands.
static NULL: Value = Value::Null;

/// Failures raised while applying a rule tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogicError {
    /// The rule used an operator this evaluator does not implement.
    #[error("unknown operator `{name}`")]
    UnknownOperator {
        /// The unrecognized operator key.
        name: String,
    },
    /// The rule tree nests deeper than the limit.
    #[error("rule nests deeper than {max_depth} levels")]
    RuleTooDeep {
        /// Maximum allowed depth.
        max_depth: usize,
    },
    /// An operand could not be coerced to the type the operator needs.
    #[error("operator `{operator}` applied to a non-numeric operand")]
    NonNumericOperand {
        /// The operator that failed.
        operator: &'static str,
    },
}

/// Applies a JSON Logic rule to a data context.
///
/// Non-rule values (scalars, multi-key objects) evaluate to themselves;
/// arrays evaluate element-wise. `and`, `or`, and `if` evaluate their
/// arguments lazily.
///
/// # Errors
///
/// Returns a [`LogicError`] for unknown operators, non-numeric operands
/// to arithmetic, or a rule nested beyond the depth limit.
///
/// # Examples
///
/// ```
/// use form_schema_engine::apply;
/// use serde_json::json;
///
/// let rule = json!({"and": [
///     {">": [{"var": "age"}, 17]},
///     {"==": [{"var": "country"}, "FI"]},
/// ]});
/// let data = json!({"age": 30, "country": "FI"});
/// assert_eq!(apply(&rule, &data).unwrap(), json!(true));
/// ```
pub fn apply(rule: &Value, data: &Value) -> Result<Value, LogicError> {
    apply_at_depth(rule, data, 0)
}

/// Evaluates a rule to a boolean verdict, fail-closed.
///
/// Truthiness follows the reference implementation: empty arrays, empty
/// strings, zero, and null are falsy. On any evaluation error the rule
/// counts as **not satisfied** and a diagnostic is logged.
///
/// # Examples
///
/// ```
/// use form_schema_engine::evaluate_rule;
/// use serde_json::json;
///
/// let rule = json!({"==": [{"var": "value"}, "x"]});
/// assert!(evaluate_rule(&rule, &json!({"value": "x"})));
/// assert!(!evaluate_rule(&rule, &json!({"value": "y"})));
///
/// // Unknown operator: fail-closed.
/// assert!(!evaluate_rule(&json!({"frobnicate": []}), &json!({})));
/// ```
pub fn evaluate_rule(rule: &Value, data: &Value) -> bool {
    match apply(rule, data) {
        Ok(result) => truthy(&result),
        Err(error) => {
            warn!(error = %error, "JSON Logic rule evaluation failed; treating rule as not satisfied");
            false
        }
    }
}

fn apply_at_depth(rule: &Value, data: &Value, depth: usize) -> Result<Value, LogicError> {
    if depth > MAX_RULE_DEPTH {
        return Err(LogicError::RuleTooDeep {
            max_depth: MAX_RULE_DEPTH,
        });
    }

    match rule {
        Value::Array(items) => items
            .iter()
            .map(|item| apply_at_depth(item, data, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) if map.len() == 1 => {
            let (operator, args) = map
                .iter()
                .next()
                .map(|(key, value)| (key.as_str(), value))
                .unwrap_or(("", &NULL));
            apply_operator(operator, args, data, depth)
        }
        other => Ok(other.clone()),
    }
}

fn apply_operator(
    operator: &str,
    raw_args: &Value,
    data: &Value,
    depth: usize,
) -> Result<Value, LogicError> {
    // Lazy operators work on the raw argument list.
    match operator {
        "if" | "?:" => return apply_if(raw_args, data, depth),
        "and" => {
            let args = raw_argument_list(raw_args);
            let mut last = Value::Bool(true);
            for arg in args {
                last = apply_at_depth(arg, data, depth + 1)?;
                if !truthy(&last) {
                    return Ok(last);
                }
            }
            return Ok(last);
        }
        "or" => {
            let args = raw_argument_list(raw_args);
            let mut last = Value::Bool(false);
            for arg in args {
                last = apply_at_depth(arg, data, depth + 1)?;
                if truthy(&last) {
                    return Ok(last);
                }
            }
            return Ok(last);
        }
        _ => {}
    }

    let args: Vec<Value> = raw_argument_list(raw_args)
        .into_iter()
        .map(|arg| apply_at_depth(arg, data, depth + 1))
        .collect::<Result<_, _>>()?;

    match operator {
        "var" => Ok(lookup_var(&args, data)),
        "missing" => Ok(Value::Array(missing_keys(&args, data))),
        "missing_some" => {
            let minimum = args
                .first()
                .and_then(coerce_number)
                .unwrap_or(0.0) as usize;
            let keys: Vec<Value> = args
                .get(1)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let missing = missing_keys(&keys, data);
            if keys.len() - missing.len() >= minimum {
                Ok(Value::Array(Vec::new()))
            } else {
                Ok(Value::Array(missing))
            }
        }
        "==" => Ok(Value::Bool(loose_eq(arg(&args, 0), arg(&args, 1)))),
        "!=" => Ok(Value::Bool(!loose_eq(arg(&args, 0), arg(&args, 1)))),
        "===" => Ok(Value::Bool(strict_eq(arg(&args, 0), arg(&args, 1)))),
        "!==" => Ok(Value::Bool(!strict_eq(arg(&args, 0), arg(&args, 1)))),
        "!" => Ok(Value::Bool(!truthy(arg(&args, 0)))),
        "!!" => Ok(Value::Bool(truthy(arg(&args, 0)))),
        "<" => compare_chain(&args, "<", |ordering| ordering == std::cmp::Ordering::Less),
        "<=" => compare_chain(&args, "<=", |ordering| ordering != std::cmp::Ordering::Greater),
        ">" => compare_pair(&args, ">", |ordering| ordering == std::cmp::Ordering::Greater),
        ">=" => compare_pair(&args, ">=", |ordering| ordering != std::cmp::Ordering::Less),
        "min" => fold_numbers(&args, "min", f64::INFINITY, f64::min),
        "max" => fold_numbers(&args, "max", f64::NEG_INFINITY, f64::max),
        "+" => fold_numbers(&args, "+", 0.0, |acc, n| acc + n),
        "*" => fold_numbers(&args, "*", 1.0, |acc, n| acc * n),
        "-" => {
            let first = numeric_arg(&args, 0, "-")?;
            match args.len() {
                1 => Ok(number_value(-first)),
                _ => Ok(number_value(first - numeric_arg(&args, 1, "-")?)),
            }
        }
        "/" => Ok(number_value(
            numeric_arg(&args, 0, "/")? / numeric_arg(&args, 1, "/")?,
        )),
        "%" => Ok(number_value(
            numeric_arg(&args, 0, "%")? % numeric_arg(&args, 1, "%")?,
        )),
        "in" => {
            let needle = arg(&args, 0);
            match arg(&args, 1) {
                Value::Array(items) => Ok(Value::Bool(
                    items.iter().any(|item| strict_eq(item, needle)),
                )),
                Value::String(text) => Ok(Value::Bool(text.contains(&render_string(needle)))),
                _ => Ok(Value::Bool(false)),
            }
        }
        "cat" => Ok(Value::String(
            args.iter().map(render_string).collect::<String>(),
        )),
        "merge" => {
            let mut merged = Vec::new();
            for item in &args {
                match item {
                    Value::Array(items) => merged.extend(items.iter().cloned()),
                    other => merged.push(other.clone()),
                }
            }
            Ok(Value::Array(merged))
        }
        other => Err(LogicError::UnknownOperator {
            name: other.to_string(),
        }),
    }
}

/// `if` takes [condition, then, elif-condition, elif-then, ..., else].
fn apply_if(raw_args: &Value, data: &Value, depth: usize) -> Result<Value, LogicError> {
    let args = raw_argument_list(raw_args);
    let mut i = 0;
    while i + 1 < args.len() {
        let condition = apply_at_depth(args[i], data, depth + 1)?;
        if truthy(&condition) {
            return apply_at_depth(args[i + 1], data, depth + 1);
        }
        i += 2;
    }
    match args.get(i) {
        Some(fallback) => apply_at_depth(fallback, data, depth + 1),
        None => Ok(Value::Null),
    }
}

/// A single non-array argument is treated as a one-element list, per the
/// reference implementation.
fn raw_argument_list(raw_args: &Value) -> Vec<&Value> {
    match raw_args {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn arg<'a>(args: &'a [Value], index: usize) -> &'a Value {
    args.get(index).unwrap_or(&NULL)
}

fn numeric_arg(args: &[Value], index: usize, operator: &'static str) -> Result<f64, LogicError> {
    coerce_number(arg(args, index)).ok_or(LogicError::NonNumericOperand { operator })
}

fn fold_numbers(
    args: &[Value],
    operator: &'static str,
    seed: f64,
    fold: impl Fn(f64, f64) -> f64,
) -> Result<Value, LogicError> {
    let mut acc = seed;
    for value in args {
        let number =
            coerce_number(value).ok_or(LogicError::NonNumericOperand { operator })?;
        acc = fold(acc, number);
    }
    Ok(number_value(acc))
}

/// Orders two operands: strings lexicographically, everything else by
/// numeric coercion.
fn ordering(
    a: &Value,
    b: &Value,
    operator: &'static str,
) -> Result<std::cmp::Ordering, LogicError> {
    if let (Value::String(a), Value::String(b)) = (a, b) {
        return Ok(a.cmp(b));
    }
    let a = coerce_number(a).ok_or(LogicError::NonNumericOperand { operator })?;
    let b = coerce_number(b).ok_or(LogicError::NonNumericOperand { operator })?;
    a.partial_cmp(&b)
        .ok_or(LogicError::NonNumericOperand { operator })
}

/// Two- or three-argument comparison: `{"<": [1, x, 10]}` tests an
/// exclusive range, as the reference implementation does for `<`/`<=`.
fn compare_chain(
    args: &[Value],
    operator: &'static str,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, LogicError> {
    let first = accept(ordering(arg(args, 0), arg(args, 1), operator)?);
    if args.len() <= 2 {
        return Ok(Value::Bool(first));
    }
    let second = accept(ordering(arg(args, 1), arg(args, 2), operator)?);
    Ok(Value::Bool(first && second))
}

fn compare_pair(
    args: &[Value],
    operator: &'static str,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, LogicError> {
    let ordering = ordering(arg(args, 0), arg(args, 1), operator)?;
    Ok(Value::Bool(accept(ordering)))
}

fn lookup_var(args: &[Value], data: &Value) -> Value {
    let path = arg(args, 0);
    let default = arg(args, 1);

    let found = match path {
        Value::Null => Some(data.clone()),
        Value::String(path) if path.is_empty() => Some(data.clone()),
        Value::String(path) => lookup_path(data, path),
        Value::Number(index) => index
            .as_u64()
            .and_then(|i| data.as_array().and_then(|items| items.get(i as usize)))
            .cloned(),
        _ => None,
    };

    // The default applies only when the path is absent; an explicit null
    // in the data passes through.
    match found {
        None => default.clone(),
        Some(value) => value,
    }
}

fn lookup_path(data: &Value, path: &str) -> Option<Value> {
    let mut current = data.clone();
    for segment in path.split('.') {
        current = match &current {
            Value::Object(map) => map.get(segment)?.clone(),
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?.clone()
            }
            _ => return None,
        };
    }
    Some(current)
}

fn missing_keys(keys: &[Value], data: &Value) -> Vec<Value> {
    keys.iter()
        .filter(|key| {
            let Some(path) = key.as_str() else {
                return false;
            };
            match lookup_path(data, path) {
                None | Some(Value::Null) => true,
                Some(Value::String(text)) => text.is_empty(),
                Some(_) => false,
            }
        })
        .cloned()
        .collect()
}

/// Truthiness per the reference implementation: like JavaScript, except
/// an empty array is falsy.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;

    #[test]
    fn test_literals_evaluate_to_themselves() {
        assert_eq!(apply(&json!(5), &json!({})).unwrap(), json!(5));
        assert_eq!(apply(&json!("x"), &json!({})).unwrap(), json!("x"));
        // Multi-key objects are data, not rules.
        let data_object = json!({"a": 1, "b": 2});
        assert_eq!(apply(&data_object, &json!({})).unwrap(), data_object);
    }

    #[test]
    fn test_var_dot_paths_and_defaults() {
        let data = json!({"user": {"name": "kai", "tags": ["a", "b"]}});
        assert_eq!(
            apply(&json!({"var": "user.name"}), &data).unwrap(),
            json!("kai")
        );
        assert_eq!(
            apply(&json!({"var": "user.tags.1"}), &data).unwrap(),
            json!("b")
        );
        assert_eq!(
            apply(&json!({"var": ["user.email", "none"]}), &data).unwrap(),
            json!("none")
        );
        assert_eq!(apply(&json!({"var": ""}), &data).unwrap(), data);
    }

    #[test]
    fn test_equality_operators() {
        assert_eq!(
            apply(&json!({"==": [1, "1"]}), &json!({})).unwrap(),
            json!(true)
        );
        assert_eq!(
            apply(&json!({"===": [1, "1"]}), &json!({})).unwrap(),
            json!(false)
        );
        assert_eq!(
            apply(&json!({"!=": [1, 2]}), &json!({})).unwrap(),
            json!(true)
        );
    }

    #[test]
    fn test_and_or_return_operand_values_lazily() {
        assert_eq!(
            apply(&json!({"and": [true, "yes"]}), &json!({})).unwrap(),
            json!("yes")
        );
        assert_eq!(
            apply(&json!({"and": [0, "never"]}), &json!({})).unwrap(),
            json!(0)
        );
        assert_eq!(
            apply(&json!({"or": [0, "fallback"]}), &json!({})).unwrap(),
            json!("fallback")
        );
        // The second operand would error, but laziness skips it.
        assert_eq!(
            apply(&json!({"or": [1, {"bogus": []}]}), &json!({})).unwrap(),
            json!(1)
        );
    }

    #[test]
    fn test_if_chains() {
        let rule = json!({"if": [
            {"<": [{"var": "n"}, 0]}, "negative",
            {"==": [{"var": "n"}, 0]}, "zero",
            "positive",
        ]});
        assert_eq!(apply(&rule, &json!({"n": -1})).unwrap(), json!("negative"));
        assert_eq!(apply(&rule, &json!({"n": 0})).unwrap(), json!("zero"));
        assert_eq!(apply(&rule, &json!({"n": 4})).unwrap(), json!("positive"));
    }

    #[test]
    fn test_between_comparison() {
        assert_eq!(
            apply(&json!({"<": [1, 5, 10]}), &json!({})).unwrap(),
            json!(true)
        );
        assert_eq!(
            apply(&json!({"<": [1, 11, 10]}), &json!({})).unwrap(),
            json!(false)
        );
        assert_eq!(
            apply(&json!({"<=": [1, 1, 10]}), &json!({})).unwrap(),
            json!(true)
        );
    }

    #[test]
    fn test_arithmetic_and_aggregates() {
        assert_eq!(
            apply(&json!({"+": [1, "2", 3]}), &json!({})).unwrap(),
            json!(6.0)
        );
        assert_eq!(apply(&json!({"-": [5]}), &json!({})).unwrap(), json!(-5.0));
        assert_eq!(
            apply(&json!({"min": [3, 1, 2]}), &json!({})).unwrap(),
            json!(1.0)
        );
        assert_eq!(
            apply(&json!({"%": [7, 2]}), &json!({})).unwrap(),
            json!(1.0)
        );
    }

    #[test]
    fn test_in_and_cat_and_merge() {
        assert_eq!(
            apply(&json!({"in": ["b", ["a", "b"]]}), &json!({})).unwrap(),
            json!(true)
        );
        assert_eq!(
            apply(&json!({"in": ["ell", "hello"]}), &json!({})).unwrap(),
            json!(true)
        );
        assert_eq!(
            apply(&json!({"cat": ["a", 1, "b"]}), &json!({})).unwrap(),
            json!("a1b")
        );
        assert_eq!(
            apply(&json!({"merge": [[1], 2, [3, 4]]}), &json!({})).unwrap(),
            json!([1, 2, 3, 4])
        );
    }

    #[test]
    fn test_missing_and_missing_some() {
        let data = json!({"a": 1, "b": ""});
        assert_eq!(
            apply(&json!({"missing": ["a", "b", "c"]}), &data).unwrap(),
            json!(["b", "c"])
        );
        assert_eq!(
            apply(&json!({"missing_some": [1, ["a", "b", "c"]]}), &data).unwrap(),
            json!([])
        );
        assert_eq!(
            apply(&json!({"missing_some": [3, ["a", "b", "c"]]}), &data).unwrap(),
            json!(["b", "c"])
        );
    }

    #[test]
    fn test_single_argument_shorthand() {
        // {"!": true} instead of {"!": [true]}.
        assert_eq!(apply(&json!({"!": true}), &json!({})).unwrap(), json!(false));
        assert_eq!(
            apply(&json!({"var": "a"}), &json!({"a": 9})).unwrap(),
            json!(9)
        );
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        assert_eq!(
            apply(&json!({"frobnicate": [1]}), &json!({})),
            Err(LogicError::UnknownOperator {
                name: "frobnicate".to_string()
            })
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut rule = json!(true);
        for _ in 0..100 {
            rule = json!({"!": [rule]});
        }
        assert_eq!(
            apply(&rule, &json!({})),
            Err(LogicError::RuleTooDeep { max_depth: 64 })
        );
    }

    #[test]
    fn test_evaluate_rule_is_fail_closed() {
        assert!(!evaluate_rule(&json!({"frobnicate": []}), &json!({})));
        assert!(!evaluate_rule(&json!({"+": ["x", 1]}), &json!({})));
        assert!(evaluate_rule(&json!({"==": [1, 1]}), &json!({})));
    }

    #[test]
    fn test_truthiness_of_results() {
        assert!(!evaluate_rule(&json!({"merge": []}), &json!({})));
        assert!(evaluate_rule(&json!({"cat": ["a"]}), &json!({})));
        assert!(!evaluate_rule(&json!({"var": "missing"}), &json!({})));
    }

    #[test]
    fn test_rule_context_with_value_key() {
        let rule = json!({"==": [{"var": "value"}, "x"]});
        let mut context = Map::new();
        context.insert("value".to_string(), json!("x"));
        assert!(evaluate_rule(&rule, &Value::Object(context)));
    }
}
