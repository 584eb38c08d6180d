//! Unique component key generation.

/// Produces a unique component key given the keys already in use.
///
/// Starts from the component type itself; if taken, appends an increasing
/// integer suffix starting at 1 until an unused identifier is found.
/// Deterministic, with no side effects.
///
/// # Examples
///
/// ```
/// use form_schema_core::generate_key;
///
/// assert_eq!(generate_key("textfield", &[] as &[&str]), "textfield");
/// assert_eq!(generate_key("textfield", &["textfield"]), "textfield1");
/// assert_eq!(
///     generate_key("textfield", &["textfield", "textfield1"]),
///     "textfield2"
/// );
/// ```
pub fn generate_key<S: AsRef<str>>(component_type: &str, existing_keys: &[S]) -> String {
    let taken = |candidate: &str| {
        existing_keys
            .iter()
            .any(|key| key.as_ref() == candidate)
    };

    if !taken(component_type) {
        return component_type.to_string();
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{component_type}{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
