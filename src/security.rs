//! Security layer: content sanitization and SQL validation.
//!
//! Database content is untrusted input to the AI client on the other side
//! of the protocol. The sanitizer flags prompt-injection-shaped values
//! before they are rendered; the validator is the coarse select-only
//! filter applied before SQL reaches the driver.

pub mod sanitize;
pub mod validation;

pub use sanitize::{sanitize_identifier, sanitize_value, truncate};
pub use validation::{validate_select_only, SqlRejection};
