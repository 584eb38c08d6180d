//! Tree traversal: flattening and default-value extraction.
//!
//! Both operations share one recursive pre-order walk. A `columns`
//! container is treated as a list of child-slots just like `components`,
//! so nothing here special-cases layout beyond visiting cells
//! left-to-right. Results are recomputed from the tree on every call:
//! the owning editor may mutate the tree between calls, so nothing is
//! memoized by object identity.

use serde_json::{Map, Value};

use crate::types::FormComponentSchema;

/// Pre-order walk over a component forest: each node is visited before
/// its descendants; nested `components` come before column cells, and
/// cells are visited left-to-right.
fn walk<'a>(
    components: &'a [FormComponentSchema],
    visit: &mut impl FnMut(&'a FormComponentSchema),
) {
    fn descend<'a>(
        component: &'a FormComponentSchema,
        visit: &mut impl FnMut(&'a FormComponentSchema),
    ) {
        visit(component);
        for child in component.children() {
            descend(child, visit);
        }
    }
    for component in components {
        descend(component, visit);
    }
}

/// Collects every data-bearing component in declaration order.
///
/// A container that itself carries data appears before its descendants;
/// nested panel and column contents are inlined at the point where the
/// container appears.
///
/// # Examples
///
/// ```
/// use form_schema_core::{flatten, parse_schema};
/// use serde_json::json;
///
/// let schema = parse_schema(&json!({
///     "components": [
///         {"type": "textfield", "key": "first"},
///         {"type": "panel", "key": "details", "input": false, "components": [
///             {"type": "number", "key": "age"},
///         ]},
///         {"type": "textfield", "key": "last"},
///     ],
/// }));
///
/// let keys: Vec<&str> = flatten(&schema.components)
///     .iter()
///     .map(|component| component.key.as_str())
///     .collect();
/// assert_eq!(keys, vec!["first", "age", "last"]);
/// ```
pub fn flatten(components: &[FormComponentSchema]) -> Vec<&FormComponentSchema> {
    let mut flat = Vec::new();
    walk(components, &mut |component| {
        if component.input {
            flat.push(component);
        }
    });
    flat
}

/// Walks a normalized tree to a flat key-to-initial-value map.
///
/// An explicit `defaultValue` wins; otherwise the default is derived from
/// the component type. Later components sharing a key overwrite earlier
/// ones (last-write-wins).
///
/// # Examples
///
/// ```
/// use form_schema_core::{extract_defaults, parse_schema};
/// use serde_json::json;
///
/// let schema = parse_schema(&json!({
///     "components": [
///         {"type": "checkbox", "key": "subscribe"},
///         {"type": "select", "key": "tags", "multiple": true},
///         {"type": "textfield", "key": "name", "defaultValue": "anon"},
///     ],
/// }));
///
/// let defaults = extract_defaults(&schema.components);
/// assert_eq!(defaults["subscribe"], json!(false));
/// assert_eq!(defaults["tags"], json!([]));
/// assert_eq!(defaults["name"], json!("anon"));
/// ```
pub fn extract_defaults(components: &[FormComponentSchema]) -> Map<String, Value> {
    let mut defaults = Map::new();
    walk(components, &mut |component| {
        if component.input && !component.key.is_empty() {
            let value = component
                .default_value
                .clone()
                .unwrap_or_else(|| default_value_for(component));
            defaults.insert(component.key.clone(), value);
        }
    });
    defaults
}

/// Type-dependent initial value for a component without an explicit
/// `defaultValue`.
pub fn default_value_for(component: &FormComponentSchema) -> Value {
    match component.component_type.as_str() {
        "textfield" | "textarea" | "email" | "password" | "phoneNumber" | "url" | "datetime"
        | "time" | "day" | "radio" => Value::String(String::new()),
        "number" | "currency" => Value::Null,
        "checkbox" => Value::Bool(false),
        "select" => {
            if component.multiple {
                Value::Array(Vec::new())
            } else {
                Value::String(String::new())
            }
        }
        "selectboxes" => Value::Object(Map::new()),
        "file" => {
            if component.multiple {
                Value::Array(Vec::new())
            } else {
                Value::Null
            }
        }
        _ => Value::String(String::new()),
    }
}
