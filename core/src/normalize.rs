//! Schema normalization from untyped JSON documents.
//!
//! Input documents are author-edited and frequently incomplete: fields go
//! missing, carry the wrong JSON type, or hold values the editor never
//! wrote. Normalization is therefore total — structural problems never
//! raise errors. Every missing or malformed field is silently defaulted,
//! and there is no "invalid schema" error kind. This is also why parsing
//! is hand-rolled over [`serde_json::Value`] instead of deriving
//! `Deserialize`: a derive would reject a document whose `minLength` is
//! the string `"3"`, where the normalizer must coerce it.
//!
//! Normalization is idempotent: feeding a normalized schema back through
//! [`parse_schema`] yields the same shape.

use serde_json::{Map, Value};

use crate::types::{Column, ConditionalRule, FormComponentSchema, FormSchema, FormValidation};

/// Component fields the core model recognizes; everything else is carried
/// in the `extra` side-map.
const RECOGNIZED_COMPONENT_KEYS: &[&str] = &[
    "type",
    "key",
    "label",
    "placeholder",
    "description",
    "tooltip",
    "customClass",
    "input",
    "hidden",
    "disabled",
    "multiple",
    "tableView",
    "defaultValue",
    "validate",
    "conditional",
    "data",
    "components",
    "columns",
];

/// Parses an untyped document into a fully-defaulted form schema.
///
/// Non-object input (null, arrays, scalars) yields the empty schema with
/// `display: "form"` and no components.
///
/// # Examples
///
/// ```
/// use form_schema_core::parse_schema;
/// use serde_json::json;
///
/// let schema = parse_schema(&json!({
///     "title": "Contact",
///     "components": [
///         {"type": "textfield", "key": "name", "label": "Name"},
///     ],
/// }));
/// assert_eq!(schema.title, "Contact");
/// assert_eq!(schema.components.len(), 1);
///
/// let empty = parse_schema(&json!(null));
/// assert_eq!(empty.display, "form");
/// assert!(empty.components.is_empty());
/// ```
pub fn parse_schema(raw: &Value) -> FormSchema {
    let Some(map) = raw.as_object() else {
        return FormSchema::default();
    };

    FormSchema {
        display: string_or(map, "display", "form"),
        title: string_or(map, "title", ""),
        name: string_or(map, "name", ""),
        path: string_or(map, "path", ""),
        components: component_list(map.get("components")),
        settings: object_or_empty(map, "settings"),
        properties: object_or_empty(map, "properties"),
        id: map
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// Normalizes one raw component node.
///
/// Non-object input yields the `unknown` placeholder component, which is
/// excluded from data and validation (`input: false`). Object input gets
/// every recognized field defaulted, recognized containers (`components`,
/// `columns`) normalized recursively, and unrecognized properties copied
/// verbatim into the `extra` side-map.
///
/// # Examples
///
/// ```
/// use form_schema_core::normalize_component;
/// use serde_json::json;
///
/// let component = normalize_component(&json!({"type": "textfield"}));
/// assert_eq!(component.component_type, "textfield");
/// assert!(component.input);
///
/// let placeholder = normalize_component(&json!("garbage"));
/// assert_eq!(placeholder.component_type, "unknown");
/// assert_eq!(placeholder.key, "unknown");
/// assert!(!placeholder.input);
/// ```
pub fn normalize_component(raw: &Value) -> FormComponentSchema {
    let Some(map) = raw.as_object() else {
        return FormComponentSchema {
            component_type: "unknown".to_string(),
            key: "unknown".to_string(),
            input: false,
            ..Default::default()
        };
    };

    let extra = map
        .iter()
        .filter(|(key, _)| !RECOGNIZED_COMPONENT_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    FormComponentSchema {
        component_type: string_or(map, "type", ""),
        key: string_or(map, "key", ""),
        label: string_or(map, "label", ""),
        placeholder: string_or(map, "placeholder", ""),
        description: string_or(map, "description", ""),
        tooltip: string_or(map, "tooltip", ""),
        custom_class: string_or(map, "customClass", ""),
        // A component participates in data unless it opts out, which is
        // why downstream filters are written `input != false`.
        input: bool_or(map, "input", true),
        hidden: bool_or(map, "hidden", false),
        disabled: bool_or(map, "disabled", false),
        multiple: bool_or(map, "multiple", false),
        table_view: bool_or(map, "tableView", false),
        default_value: map.get("defaultValue").cloned(),
        validate: normalize_validation(map.get("validate").unwrap_or(&Value::Null)),
        conditional: map
            .get("conditional")
            .and_then(Value::as_object)
            .map(normalize_conditional),
        data: map.get("data").cloned(),
        components: map
            .get("components")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(normalize_component).collect()),
        columns: map
            .get("columns")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(normalize_column).collect()),
        extra,
    }
}

/// Normalizes one raw column cell, recursing into its components.
pub fn normalize_column(raw: &Value) -> Column {
    let Some(map) = raw.as_object() else {
        return Column::default();
    };

    Column {
        components: component_list(map.get("components")),
        width: count_or(map, "width", 6) as u32,
        offset: count_or(map, "offset", 0) as u32,
        push: count_or(map, "push", 0) as u32,
        pull: count_or(map, "pull", 0) as u32,
        size: string_or(map, "size", "md"),
    }
}

/// Normalizes a raw `validate` block.
///
/// Non-object input yields the all-default record. Numeric bounds accept
/// both JSON numbers and numeric strings.
///
/// # Examples
///
/// ```
/// use form_schema_core::normalize_validation;
/// use serde_json::json;
///
/// let validation = normalize_validation(&json!({
///     "required": true,
///     "minLength": "3",
///     "max": 10,
/// }));
/// assert!(validation.required);
/// assert_eq!(validation.min_length, Some(3));
/// assert_eq!(validation.max, Some(10.0));
///
/// assert!(!normalize_validation(&json!(null)).required);
/// ```
pub fn normalize_validation(raw: &Value) -> FormValidation {
    let Some(map) = raw.as_object() else {
        return FormValidation::default();
    };

    FormValidation {
        required: bool_or(map, "required", false),
        min_length: count_field(map, "minLength"),
        max_length: count_field(map, "maxLength"),
        min: numeric_field(map, "min"),
        max: numeric_field(map, "max"),
        min_words: count_field(map, "minWords"),
        max_words: count_field(map, "maxWords"),
        min_selected_count: count_field(map, "minSelectedCount"),
        max_selected_count: count_field(map, "maxSelectedCount"),
        pattern: string_field(map, "pattern"),
        custom: string_field(map, "custom"),
        custom_message: string_field(map, "customMessage"),
        email: bool_or(map, "email", false),
        url: bool_or(map, "url", false),
        integer: bool_or(map, "integer", false),
        json: map.get("json").cloned().filter(|rule| !rule.is_null()),
    }
}

fn normalize_conditional(map: &Map<String, Value>) -> ConditionalRule {
    ConditionalRule {
        when: map
            .get("when")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        eq: map.get("eq").cloned(),
        show: map.get("show").and_then(Value::as_bool),
    }
}

fn component_list(raw: Option<&Value>) -> Vec<FormComponentSchema> {
    raw.and_then(Value::as_array)
        .map(|items| items.iter().map(normalize_component).collect())
        .unwrap_or_default()
}

fn string_or(map: &Map<String, Value>, key: &str, default: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn bool_or(map: &Map<String, Value>, key: &str, default: bool) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn object_or_empty(map: &Map<String, Value>, key: &str) -> Map<String, Value> {
    map.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Numeric field, coercing numeric strings (`"3"` as well as `3`).
fn numeric_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn count_field(map: &Map<String, Value>, key: &str) -> Option<u64> {
    numeric_field(map, key).filter(|n| *n >= 0.0).map(|n| n as u64)
}

fn count_or(map: &Map<String, Value>, key: &str, default: u64) -> u64 {
    count_field(map, key).unwrap_or(default)
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
