//! Admission checks on scripts and redaction of what comes back.

pub mod filter;
pub mod sanitizer;
pub mod validator;

pub use filter::filter_output;
pub use sanitizer::sanitize_script;
pub use validator::{validate_script, PatternCategory, ValidationError};
