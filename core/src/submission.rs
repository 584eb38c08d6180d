//! Submission values and environment metadata.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::traverse::extract_defaults;
use crate::types::FormSchema;

/// Host-environment facts recorded on a submission.
///
/// Purely informational: nothing validates these values. Implement this
/// for the host (browser bridge, server request context, test double);
/// [`SystemEnvironment`] covers the plain-process case.
pub trait EnvironmentFacts {
    /// IANA name or UTC offset of the local timezone.
    fn timezone(&self) -> String;
    /// Identifier of the submitting client.
    fn user_agent(&self) -> String;
    /// Path the submission originated from.
    fn path_name(&self) -> String;
    /// Whether the client was online at creation time.
    fn on_line(&self) -> bool;
}

/// [`EnvironmentFacts`] sourced from the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl EnvironmentFacts for SystemEnvironment {
    fn timezone(&self) -> String {
        std::env::var("TZ").unwrap_or_else(|_| Local::now().offset().to_string())
    }

    fn user_agent(&self) -> String {
        concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
    }

    fn path_name(&self) -> String {
        std::env::current_dir()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }

    fn on_line(&self) -> bool {
        true
    }
}

/// Lifecycle state of a submission.
///
/// A freshly created submission is [`Draft`](SubmissionState::Draft);
/// callers mark it [`Submitted`](SubmissionState::Submitted) at submit
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionState {
    /// Created but not yet submitted.
    #[default]
    Draft,
    /// Handed over by the user.
    Submitted,
}

/// Environment facts captured when a submission is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    /// Local timezone of the client.
    pub timezone: String,
    /// Identifier of the submitting client.
    pub user_agent: String,
    /// Path the submission originated from.
    pub path_name: String,
    /// Connectivity flag at creation time.
    pub on_line: bool,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

impl SubmissionMetadata {
    /// Captures metadata from the given environment collaborator.
    pub fn capture(env: &dyn EnvironmentFacts) -> Self {
        Self {
            timezone: env.timezone(),
            user_agent: env.user_agent(),
            path_name: env.path_name(),
            on_line: env.on_line(),
            created_at: Local::now().to_rfc3339(),
        }
    }
}

/// One submission of a form: a flat key-to-value data map plus
/// environment metadata and lifecycle state.
///
/// # Examples
///
/// ```
/// use form_schema_core::{parse_schema, FormSubmission, SubmissionState, SystemEnvironment};
/// use serde_json::json;
///
/// let schema = parse_schema(&json!({
///     "components": [{"type": "checkbox", "key": "subscribe"}],
/// }));
///
/// let submission = FormSubmission::with_defaults(&schema, &SystemEnvironment);
/// assert_eq!(submission.state, SubmissionState::Draft);
/// assert_eq!(submission.data["subscribe"], json!(false));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSubmission {
    /// Flat key-to-value map of field values.
    pub data: Map<String, Value>,
    /// Environment facts captured at creation time.
    pub metadata: SubmissionMetadata,
    /// Lifecycle state.
    pub state: SubmissionState,
}

impl FormSubmission {
    /// Creates a draft submission with no data.
    pub fn empty(env: &dyn EnvironmentFacts) -> Self {
        Self {
            data: Map::new(),
            metadata: SubmissionMetadata::capture(env),
            state: SubmissionState::Draft,
        }
    }

    /// Creates a draft submission seeded with the schema's initial values.
    pub fn with_defaults(schema: &FormSchema, env: &dyn EnvironmentFacts) -> Self {
        Self {
            data: extract_defaults(&schema.components),
            metadata: SubmissionMetadata::capture(env),
            state: SubmissionState::Draft,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::normalize::parse_schema;

    use super::*;

    struct FixedEnvironment;

    impl EnvironmentFacts for FixedEnvironment {
        fn timezone(&self) -> String {
            "Europe/Helsinki".to_string()
        }
        fn user_agent(&self) -> String {
            "test-agent/1.0".to_string()
        }
        fn path_name(&self) -> String {
            "/forms/contact".to_string()
        }
        fn on_line(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_empty_submission_is_draft_with_metadata() {
        let submission = FormSubmission::empty(&FixedEnvironment);
        assert_eq!(submission.state, SubmissionState::Draft);
        assert!(submission.data.is_empty());
        assert_eq!(submission.metadata.timezone, "Europe/Helsinki");
        assert_eq!(submission.metadata.path_name, "/forms/contact");
        assert!(!submission.metadata.on_line);
        assert!(!submission.metadata.created_at.is_empty());
    }

    #[test]
    fn test_with_defaults_seeds_data_from_schema() {
        let schema = parse_schema(&json!({
            "components": [
                {"type": "textfield", "key": "name", "defaultValue": "anon"},
                {"type": "selectboxes", "key": "days"},
            ],
        }));

        let submission = FormSubmission::with_defaults(&schema, &FixedEnvironment);
        assert_eq!(submission.data["name"], json!("anon"));
        assert_eq!(submission.data["days"], json!({}));
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let value = serde_json::to_value(SubmissionState::Draft).unwrap();
        assert_eq!(value, json!("draft"));
        let value = serde_json::to_value(SubmissionState::Submitted).unwrap();
        assert_eq!(value, json!("submitted"));
    }
}
