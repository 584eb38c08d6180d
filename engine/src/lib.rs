//! Validation engine and rule evaluators for declarative form schemas.
//!
//! Built on top of [`form_schema_core`], this crate decides what a
//! submission is worth:
//!
//! - [`validate_field`] / [`validate_submission`] — the ordered rule
//!   battery producing structured
//!   [`ValidationError`](form_schema_core::ValidationError) values.
//! - [`is_visible`] — conditional visibility from a trigger field.
//! - [`evaluate_custom`] — sandboxed execution of user-authored
//!   validation expressions, with hard step/size/depth limits.
//!   Failures are **fail-open**: a broken rule never blocks the user.
//! - [`evaluate_rule`] / [`apply`] — JSON Logic rule trees over a data
//!   context. Failures are **fail-closed** and logged.
//!
//! # Example
//!
//! ```
//! use form_schema_core::parse_schema;
//! use form_schema_engine::validate_submission;
//! use serde_json::json;
//!
//! let schema = parse_schema(&json!({
//!     "components": [
//!         {"type": "email", "key": "email", "validate": {"required": true}},
//!     ],
//! }));
//!
//! let data = json!({"email": "not-an-address"});
//! let errors = validate_submission(&schema, data.as_object().unwrap());
//! assert_eq!(errors[0].kind, "email");
//! ```

mod conditional;
mod expr;
mod logic;
mod validate;
mod value;

pub use conditional::is_visible;
pub use expr::{CustomVerdict, ExprError, evaluate_custom, evaluate_script};
pub use logic::{LogicError, apply, evaluate_rule};
pub use validate::{is_empty_value, validate_field, validate_submission};
