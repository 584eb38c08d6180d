//! Conditional visibility evaluation.

use form_schema_core::FormComponentSchema;
use serde_json::{Map, Value};

use crate::value::strict_eq;

/// Decides whether a component is visible for the given submission data.
///
/// Without a trigger field (`conditional.when` unset), visibility is the
/// static `!hidden` flag. With one, the trigger field's value is compared
/// to `eq` under strict equality: no type coercion, and composite values
/// never match. `show: true` shows the component exactly when the
/// condition holds, `show: false` inverts that; any other `show` falls
/// back to `!hidden`.
///
/// # Examples
///
/// ```
/// use form_schema_engine::is_visible;
/// use form_schema_core::normalize_component;
/// use serde_json::json;
///
/// let component = normalize_component(&json!({
///     "type": "textfield",
///     "key": "other",
///     "conditional": {"when": "choice", "eq": "other", "show": true},
/// }));
///
/// let data = json!({"choice": "other"});
/// assert!(is_visible(&component, data.as_object().unwrap()));
///
/// let data = json!({"choice": "red"});
/// assert!(!is_visible(&component, data.as_object().unwrap()));
/// ```
pub fn is_visible(component: &FormComponentSchema, data: &Map<String, Value>) -> bool {
    let Some(conditional) = &component.conditional else {
        return !component.hidden;
    };
    let Some(when) = conditional.when.as_deref() else {
        return !component.hidden;
    };

    // A missing trigger value and a missing `eq` are each their own
    // "absent" state: absent matches absent, but never matches null.
    let condition_met = match (data.get(when), &conditional.eq) {
        (Some(actual), Some(expected)) => strict_eq(actual, expected),
        (None, None) => true,
        _ => false,
    };

    match conditional.show {
        Some(true) => condition_met,
        Some(false) => !condition_met,
        None => !component.hidden,
    }
}
