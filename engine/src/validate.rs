//! Field and submission validation.
//!
//! [`validate_field`] runs a fixed, ordered battery of rule checks for
//! one component and returns structured [`ValidationError`] values —
//! validation failures are data, never thrown errors. The `required`
//! check short-circuits; an empty, non-required value passes untouched;
//! every other applicable rule runs and may append its own error.
//!
//! Message policy: `customMessage` overrides the generated message for
//! `pattern`, `email`, `url`, `custom`, and `json` failures only.
//! Counted rules (`minLength`, `max`, `minWords`, ...) always use their
//! generated message.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use form_schema_core::{FormComponentSchema, FormSchema, FormValidation, ValidationError, flatten};

use crate::expr::{CustomVerdict, evaluate_custom};
use crate::logic::evaluate_rule;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex must compile")
});
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?[\w-]+(?:\.[\w-]+)+(?:[/?#]\S*)?$")
        .expect("static regex must compile")
});

/// True for the values the engine considers empty: null, the empty
/// string, and an empty sequence.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Validates one component's value.
///
/// `form_data` supplies the rest of the submission for cross-field
/// rules (`custom` sees it as `data`, `json` rules as the context).
///
/// # Examples
///
/// ```
/// use form_schema_engine::validate_field;
/// use form_schema_core::normalize_component;
/// use serde_json::json;
///
/// let component = normalize_component(&json!({
///     "type": "number",
///     "key": "age",
///     "validate": {"required": true, "min": 18},
/// }));
///
/// let errors = validate_field(&component, &json!(15), None);
/// assert_eq!(errors.len(), 1);
/// assert_eq!(errors[0].kind, "min");
///
/// assert!(validate_field(&component, &json!(30), None).is_empty());
/// ```
pub fn validate_field(
    component: &FormComponentSchema,
    value: &Value,
    form_data: Option<&Map<String, Value>>,
) -> Vec<ValidationError> {
    let validate = &component.validate;
    let label = component.display_label();
    let mut errors = Vec::new();

    if validate.required && !required_satisfied(component, value) {
        errors.push(ValidationError::new(
            &component.key,
            "required",
            format!("{label} is required"),
        ));
        return errors;
    }

    // Nothing else runs against an empty, non-required value.
    if is_empty_value(value) {
        return errors;
    }

    if validate.email || component.component_type == "email" {
        if let Some(text) = value.as_str() {
            if !EMAIL_PATTERN.is_match(text) {
                errors.push(ValidationError::new(
                    &component.key,
                    "email",
                    custom_or(validate, format!("{label} must be a valid email address")),
                ));
            }
        }
    }

    if validate.url || component.component_type == "url" {
        if let Some(text) = value.as_str() {
            if !URL_PATTERN.is_match(text) {
                errors.push(ValidationError::new(
                    &component.key,
                    "url",
                    custom_or(validate, format!("{label} must be a valid URL")),
                ));
            }
        }
    }

    if validate.integer {
        if let Some(number) = numeric(value) {
            if number.fract() != 0.0 {
                errors.push(ValidationError::new(
                    &component.key,
                    "integer",
                    format!("{label} must be an integer"),
                ));
            }
        }
    }

    if let (Some(min_length), Some(text)) = (validate.min_length, value.as_str()) {
        if (text.chars().count() as u64) < min_length {
            errors.push(ValidationError::new(
                &component.key,
                "minLength",
                format!("{label} must have at least {min_length} characters"),
            ));
        }
    }

    if let (Some(max_length), Some(text)) = (validate.max_length, value.as_str()) {
        if (text.chars().count() as u64) > max_length {
            errors.push(ValidationError::new(
                &component.key,
                "maxLength",
                format!("{label} must have no more than {max_length} characters"),
            ));
        }
    }

    if let (Some(min_words), Some(text)) = (validate.min_words, value.as_str()) {
        if (text.split_whitespace().count() as u64) < min_words {
            errors.push(ValidationError::new(
                &component.key,
                "minWords",
                format!("{label} must have at least {min_words} words"),
            ));
        }
    }

    if let (Some(max_words), Some(text)) = (validate.max_words, value.as_str()) {
        if (text.split_whitespace().count() as u64) > max_words {
            errors.push(ValidationError::new(
                &component.key,
                "maxWords",
                format!("{label} must have no more than {max_words} words"),
            ));
        }
    }

    if let (Some(min), Some(number)) = (validate.min, numeric(value)) {
        if number < min {
            errors.push(ValidationError::new(
                &component.key,
                "min",
                format!("{label} cannot be less than {min}"),
            ));
        }
    }

    if let (Some(max), Some(number)) = (validate.max, numeric(value)) {
        if number > max {
            errors.push(ValidationError::new(
                &component.key,
                "max",
                format!("{label} cannot be greater than {max}"),
            ));
        }
    }

    if let (Some(min_selected), Some(map)) = (validate.min_selected_count, value.as_object()) {
        if selected_count(map) < min_selected {
            errors.push(ValidationError::new(
                &component.key,
                "minSelectedCount",
                format!("{label} must have at least {min_selected} selected"),
            ));
        }
    }

    if let (Some(max_selected), Some(map)) = (validate.max_selected_count, value.as_object()) {
        if selected_count(map) > max_selected {
            errors.push(ValidationError::new(
                &component.key,
                "maxSelectedCount",
                format!("{label} must have no more than {max_selected} selected"),
            ));
        }
    }

    if let Some(pattern) = &validate.pattern {
        // The pattern must cover the whole value, so it is anchored here.
        match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(regex) => {
                if let Some(text) = value.as_str() {
                    if !regex.is_match(text) {
                        errors.push(ValidationError::new(
                            &component.key,
                            "pattern",
                            custom_or(
                                validate,
                                format!("{label} does not match the pattern {pattern}"),
                            ),
                        ));
                    }
                }
            }
            Err(error) => {
                // A broken rule must never block the user; skip it, as
                // with a broken custom expression.
                warn!(key = %component.key, error = %error, "invalid validation pattern; skipping rule");
            }
        }
    }

    if let Some(custom) = &validate.custom {
        let empty = Map::new();
        let data = form_data.unwrap_or(&empty);
        if let CustomVerdict::Invalid { message } = evaluate_custom(custom, value, data, component)
        {
            errors.push(ValidationError::new(
                &component.key,
                "custom",
                validate
                    .custom_message
                    .clone()
                    .or(message)
                    .unwrap_or_else(|| format!("{label} is invalid")),
            ));
        }
    }

    if let Some(rule) = &validate.json {
        let mut context = form_data.cloned().unwrap_or_default();
        context.insert("value".to_string(), value.clone());
        if !evaluate_rule(rule, &Value::Object(context)) {
            errors.push(ValidationError::new(
                &component.key,
                "custom",
                custom_or(validate, format!("{label} is invalid")),
            ));
        }
    }

    errors
}

/// Validates a whole submission against a schema.
///
/// Flattens the schema, skips components whose static `hidden` or
/// `disabled` flag is set, and concatenates per-field errors in
/// flattened order. A component hidden only via a `conditional` rule is
/// still validated.
///
/// # Examples
///
/// ```
/// use form_schema_engine::validate_submission;
/// use form_schema_core::parse_schema;
/// use serde_json::json;
///
/// let schema = parse_schema(&json!({
///     "components": [
///         {"type": "textfield", "key": "name", "validate": {"required": true}},
///         {"type": "number", "key": "age", "validate": {"max": 130}},
///     ],
/// }));
///
/// let data = json!({"name": "", "age": 200});
/// let errors = validate_submission(&schema, data.as_object().unwrap());
/// assert_eq!(errors.len(), 2);
/// assert_eq!(errors[0].kind, "required");
/// assert_eq!(errors[1].kind, "max");
/// ```
pub fn validate_submission(
    schema: &FormSchema,
    data: &Map<String, Value>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for component in flatten(&schema.components) {
        if component.hidden || component.disabled {
            continue;
        }
        let value = data.get(&component.key).cloned().unwrap_or(Value::Null);
        errors.extend(validate_field(component, &value, Some(data)));
    }
    errors
}

/// Type-dependent `required` rule: a checkbox must be strictly `true`, a
/// selectboxes map needs at least one `true` entry, everything else must
/// be non-empty.
fn required_satisfied(component: &FormComponentSchema, value: &Value) -> bool {
    match component.component_type.as_str() {
        "checkbox" => value == &Value::Bool(true),
        "selectboxes" => value
            .as_object()
            .is_some_and(|map| selected_count(map) > 0),
        _ => !is_empty_value(value),
    }
}

fn selected_count(map: &Map<String, Value>) -> u64 {
    map.values()
        .filter(|entry| *entry == &Value::Bool(true))
        .count() as u64
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn custom_or(validate: &FormValidation, fallback: String) -> String {
    validate.custom_message.clone().unwrap_or(fallback)
}
