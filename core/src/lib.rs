//! Core types, normalization, and traversal for declarative form schemas.
//!
//! This crate defines the foundational model for JSON-shaped form
//! descriptions:
//!
//! - [`FormSchema`] — root of a form: display metadata plus an ordered
//!   tree of components.
//! - [`FormComponentSchema`] — one field or container node, with
//!   validation rules ([`FormValidation`]) and an optional visibility
//!   rule ([`ConditionalRule`]).
//! - [`Column`] — a layout cell inside a `columns` container.
//! - [`FormSubmission`] — a flat data map plus environment metadata.
//!
//! Parsing ([`parse_schema`], [`normalize_component`]) turns untyped JSON
//! into a fully-defaulted tree without ever erroring: malformed fields
//! are silently defaulted. Traversal ([`flatten`], [`extract_defaults`])
//! produces the ordered list of data-bearing components and the initial
//! submission values. [`generate_key`] derives unique component keys at
//! creation time.
//!
//! # Example
//!
//! ```
//! use form_schema_core::{extract_defaults, flatten, parse_schema};
//! use serde_json::json;
//!
//! let schema = parse_schema(&json!({
//!     "title": "Contact",
//!     "components": [
//!         {"type": "textfield", "key": "name", "label": "Name"},
//!         {"type": "checkbox", "key": "subscribe"},
//!     ],
//! }));
//!
//! assert_eq!(flatten(&schema.components).len(), 2);
//! assert_eq!(extract_defaults(&schema.components)["subscribe"], json!(false));
//! ```

mod key;
mod normalize;
mod submission;
mod traverse;
mod types;

pub use key::generate_key;
pub use normalize::{normalize_column, normalize_component, normalize_validation, parse_schema};
pub use submission::{
    EnvironmentFacts, FormSubmission, SubmissionMetadata, SubmissionState, SystemEnvironment,
};
pub use traverse::{default_value_for, extract_defaults, flatten};
pub use types::*;
