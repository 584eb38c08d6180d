//! Schema type definitions for form structure modeling.
//!
//! This module defines the core data model used to represent data-entry
//! forms. The types are designed for serialization with [`serde`] and
//! round-trip through JSON using the same camelCase vocabulary as the
//! input documents (`tableView`, `defaultValue`, `customMessage`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root of a form schema tree.
///
/// Produced by [`parse_schema`](crate::parse_schema) from an untyped JSON
/// document. Every field is concrete after parsing: absent input fields
/// are defaulted, never left to downstream code to guess.
///
/// # Examples
///
/// ```
/// use form_schema_core::FormSchema;
///
/// let schema = FormSchema::default();
/// assert_eq!(schema.display, "form");
/// assert!(schema.components.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormSchema {
    /// Display mode (e.g. "form", "wizard").
    pub display: String,
    /// Human-readable form title.
    pub title: String,
    /// Machine name of the form.
    pub name: String,
    /// URL path segment of the form.
    pub path: String,
    /// Ordered top-level components.
    pub components: Vec<FormComponentSchema>,
    /// Form-wide settings (opaque).
    pub settings: Map<String, Value>,
    /// Form-wide custom properties (opaque).
    pub properties: Map<String, Value>,
    /// Optional stable identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Default for FormSchema {
    fn default() -> Self {
        Self {
            display: "form".to_string(),
            title: String::new(),
            name: String::new(),
            path: String::new(),
            components: Vec::new(),
            settings: Map::new(),
            properties: Map::new(),
            id: None,
        }
    }
}

impl FormSchema {
    /// Finds a component anywhere in the tree by key.
    ///
    /// Searches nested `components` and column cells in declaration order
    /// and returns the first match.
    ///
    /// # Examples
    ///
    /// ```
    /// use form_schema_core::{FormComponentSchema, FormSchema};
    ///
    /// let mut schema = FormSchema::default();
    /// schema
    ///     .components
    ///     .push(FormComponentSchema::new("textfield", "firstName"));
    ///
    /// assert!(schema.find_component("firstName").is_some());
    /// assert!(schema.find_component("lastName").is_none());
    /// ```
    pub fn find_component(&self, key: &str) -> Option<&FormComponentSchema> {
        fn search<'a>(
            component: &'a FormComponentSchema,
            key: &str,
        ) -> Option<&'a FormComponentSchema> {
            if component.key == key {
                return Some(component);
            }
            component.children().find_map(|child| search(child, key))
        }
        self.components
            .iter()
            .find_map(|component| search(component, key))
    }
}

/// One field or container node in a form schema tree.
///
/// The `component_type` tag (`"type"` in JSON) selects semantic behavior:
/// `textfield`, `number`, `select`, `checkbox`, `selectboxes`, `button`,
/// `columns`, `panel`, and so on. Type-specific properties that the core
/// model does not recognize (action, theme, icons, widget, ...) are
/// carried verbatim in the [`extra`](Self::extra) side-map.
///
/// # Examples
///
/// ```
/// use form_schema_core::FormComponentSchema;
///
/// let component = FormComponentSchema::new("textfield", "email");
/// assert_eq!(component.component_type, "textfield");
/// assert!(component.input);
/// assert!(!component.hidden);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormComponentSchema {
    /// Semantic type tag (e.g. "textfield", "number", "columns").
    #[serde(rename = "type")]
    pub component_type: String,
    /// Identifier within the schema. Uniqueness is enforced at creation
    /// time via [`generate_key`](crate::generate_key), not at parse time.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Placeholder text shown in empty widgets.
    pub placeholder: String,
    /// Longer description shown below the widget.
    pub description: String,
    /// Hover tooltip.
    pub tooltip: String,
    /// Extra CSS class hook.
    pub custom_class: String,
    /// Whether this component carries submission data and is validated.
    pub input: bool,
    /// Statically hidden.
    pub hidden: bool,
    /// Read-only.
    pub disabled: bool,
    /// Accepts multiple values.
    pub multiple: bool,
    /// Shown as a column in tabular submission views.
    pub table_view: bool,
    /// Author-supplied initial value (type-erased, kept verbatim).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Validation rules for this component.
    pub validate: FormValidation,
    /// Declarative visibility rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRule>,
    /// Type-specific payload (e.g. select options), opaque to the core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Child components (present for container types).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<FormComponentSchema>>,
    /// Layout cells (present for the `columns` type).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
    /// Unrecognized type-specific properties, passed through verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for FormComponentSchema {
    fn default() -> Self {
        Self {
            component_type: String::new(),
            key: String::new(),
            label: String::new(),
            placeholder: String::new(),
            description: String::new(),
            tooltip: String::new(),
            custom_class: String::new(),
            input: true,
            hidden: false,
            disabled: false,
            multiple: false,
            table_view: false,
            default_value: None,
            validate: FormValidation::default(),
            conditional: None,
            data: None,
            components: None,
            columns: None,
            extra: BTreeMap::new(),
        }
    }
}

impl FormComponentSchema {
    /// Creates a component with the given type tag and key.
    ///
    /// # Examples
    ///
    /// ```
    /// use form_schema_core::FormComponentSchema;
    ///
    /// let component = FormComponentSchema::new("checkbox", "subscribe");
    /// assert_eq!(component.key, "subscribe");
    /// assert!(component.validate.custom.is_none());
    /// ```
    pub fn new(component_type: &str, key: &str) -> Self {
        Self {
            component_type: component_type.to_string(),
            key: key.to_string(),
            ..Default::default()
        }
    }

    /// Iterates over direct children: nested `components` first, then the
    /// contents of each column cell left-to-right.
    pub fn children(&self) -> impl Iterator<Item = &FormComponentSchema> {
        self.components.as_deref().unwrap_or(&[]).iter().chain(
            self.columns
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .flat_map(|column| column.components.iter()),
        )
    }

    /// Returns the label, falling back to the key for unlabeled components.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }
}

/// A layout cell inside a `columns` container.
///
/// Columns hold their own child components plus grid metadata (a 1-12
/// span plus offset/push/pull adjustments at a named breakpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Column {
    /// Child components of this cell.
    pub components: Vec<FormComponentSchema>,
    /// Grid span, 1-12.
    pub width: u32,
    /// Grid offset.
    pub offset: u32,
    /// Grid push.
    pub push: u32,
    /// Grid pull.
    pub pull: u32,
    /// Layout breakpoint tag.
    pub size: String,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            width: 6,
            offset: 0,
            push: 0,
            pull: 0,
            size: "md".to_string(),
        }
    }
}

/// Declarative visibility rule comparing a trigger field's value.
///
/// When `when` names a trigger field, the component is shown (or hidden,
/// for `show: false`) exactly when `data[when]` strictly equals `eq`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionalRule {
    /// Key of the trigger field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// Value the trigger field is compared against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq: Option<Value>,
    /// `true` shows on match, `false` hides on match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show: Option<bool>,
}

/// Validation rules attached to one component.
///
/// Counted bounds (`min_length`, `max_words`, ...) accept both JSON
/// numbers and numeric strings in the input document; the normalizer
/// coerces them. `custom` holds a scripted expression body and `json`
/// a declarative JSON Logic rule tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormValidation {
    /// Value must be present (type-dependent emptiness rules).
    pub required: bool,
    /// Minimum string length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    /// Maximum string length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Minimum numeric value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum numeric value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Minimum whitespace-tokenized word count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_words: Option<u64>,
    /// Maximum whitespace-tokenized word count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_words: Option<u64>,
    /// Minimum number of selected entries (map-of-boolean values).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_selected_count: Option<u64>,
    /// Maximum number of selected entries (map-of-boolean values).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_selected_count: Option<u64>,
    /// Regular-expression text the value must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// User-authored scripted validation expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
    /// Overrides generated messages for pattern/email/url/custom/json.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
    /// Value must look like an email address.
    pub email: bool,
    /// Value must look like a URL.
    pub url: bool,
    /// Numeric value must be a whole number.
    pub integer: bool,
    /// Declarative JSON Logic rule tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
}

/// One field-level validation failure.
///
/// Validation failures are data, never thrown errors: a well-formed
/// component always yields a list of these, possibly empty.
///
/// # Examples
///
/// ```
/// use form_schema_core::ValidationError;
///
/// let error = ValidationError::new("email", "required", "Email is required");
/// assert_eq!(error.kind, "required");
///
/// let json = serde_json::to_value(&error).unwrap();
/// assert_eq!(json["type"], "required");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Key of the failing component.
    pub key: String,
    /// Human-readable failure message.
    pub message: String,
    /// Rule tag: "required", "pattern", "min", "custom", ...
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationError {
    /// Creates a validation error for the given component key and rule tag.
    pub fn new(key: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
            kind: kind.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_component_defaults_are_concrete() {
        let component = FormComponentSchema::new("textfield", "name");
        assert_eq!(component.component_type, "textfield");
        assert_eq!(component.key, "name");
        assert!(component.input);
        assert!(!component.hidden);
        assert!(component.components.is_none());
    }

    #[test]
    fn test_component_children_cover_columns() {
        let mut columns = FormComponentSchema::new("columns", "layout");
        columns.columns = Some(vec![
            Column {
                components: vec![FormComponentSchema::new("textfield", "left")],
                ..Default::default()
            },
            Column {
                components: vec![FormComponentSchema::new("textfield", "right")],
                ..Default::default()
            },
        ]);

        let keys: Vec<&str> = columns.children().map(|child| child.key.as_str()).collect();
        assert_eq!(keys, vec!["left", "right"]);
    }

    #[test]
    fn test_find_component_searches_nested_containers() {
        let mut panel = FormComponentSchema::new("panel", "info");
        panel.components = Some(vec![FormComponentSchema::new("textfield", "inner")]);
        let mut schema = FormSchema::default();
        schema.components.push(panel);

        assert!(schema.find_component("inner").is_some());
        assert!(schema.find_component("missing").is_none());
    }

    #[test]
    fn test_component_serializes_with_camel_case_vocabulary() {
        let mut component = FormComponentSchema::new("textfield", "name");
        component.table_view = true;
        component.default_value = Some(json!("hi"));

        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["type"], "textfield");
        assert_eq!(value["tableView"], true);
        assert_eq!(value["defaultValue"], "hi");
    }

    #[test]
    fn test_extra_properties_round_trip() {
        let raw = json!({
            "type": "button",
            "key": "submit",
            "action": "submit",
            "theme": "primary",
        });

        let component: FormComponentSchema = serde_json::from_value(raw).unwrap();
        assert_eq!(component.extra.get("action"), Some(&json!("submit")));

        let back = serde_json::to_value(&component).unwrap();
        assert_eq!(back["theme"], "primary");
    }

    #[test]
    fn test_validation_error_serializes_kind_as_type() {
        let error = ValidationError::new("age", "min", "Age cannot be less than 18");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["type"], "min");
        assert_eq!(value["key"], "age");
    }
}
