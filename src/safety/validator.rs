//! Known-bad pattern policy for incoming scripts.
//!
//! Pattern matching over free text, not a parser: it catches the listed
//! forms and nothing more. Ordinary numeric scripts never trip it.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Sequences that would let a shell expand a nested command.
pub const COMMAND_SUBSTITUTION: &[&str] = &["$(", "`"];

/// Interpreter built-ins that reach the OS, the network, or arbitrary code.
pub const DANGEROUS_FUNCTIONS: &[&str] = &[
    "system", "exec", "popen", "eval", "evalin", "urlread", "urlwrite", "load", "save", "unix",
    "dos", "waitpid", "fork",
];

/// Shell chaining fragments, matched verbatim.
pub const SHELL_CHAINING: &[&str] = &["; rm ", "; del ", "| sh", "| bash", "`", "&&", "||"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCategory {
    CommandSubstitution,
    DangerousFunction,
    ShellChaining,
}

impl PatternCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandSubstitution => "command substitution",
            Self::DangerousFunction => "dangerous function call",
            Self::ShellChaining => "shell chaining",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("script rejected: command substitution pattern detected: {fragment:?}")]
    CommandSubstitution { fragment: String },

    #[error("script rejected: dangerous function call detected: {function}( (matched {fragment:?})")]
    DangerousFunction { function: &'static str, fragment: String },

    #[error("script rejected: dangerous shell pattern detected: {fragment:?}")]
    ShellChaining { fragment: String },
}

impl ValidationError {
    pub fn category(&self) -> PatternCategory {
        match self {
            Self::CommandSubstitution { .. } => PatternCategory::CommandSubstitution,
            Self::DangerousFunction { .. } => PatternCategory::DangerousFunction,
            Self::ShellChaining { .. } => PatternCategory::ShellChaining,
        }
    }

    pub fn fragment(&self) -> &str {
        match self {
            Self::CommandSubstitution { fragment }
            | Self::DangerousFunction { fragment, .. }
            | Self::ShellChaining { fragment } => fragment,
        }
    }
}

fn function_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DANGEROUS_FUNCTIONS
            .iter()
            .map(|name| {
                let re = Regex::new(&format!(r"(?i){}\s*\(", regex::escape(name)))
                    .expect("deny-list names are literal identifiers");
                (*name, re)
            })
            .collect()
    })
}

/// Checks run in order and stop at the first hit.
pub fn validate_script(script: &str) -> Result<(), ValidationError> {
    if let Some(fragment) = COMMAND_SUBSTITUTION.iter().find(|p| script.contains(**p)) {
        return Err(ValidationError::CommandSubstitution { fragment: fragment.to_string() });
    }

    for (function, re) in function_patterns() {
        if let Some(m) = re.find(script) {
            return Err(ValidationError::DangerousFunction {
                function: *function,
                fragment: m.as_str().to_string(),
            });
        }
    }

    if let Some(fragment) = SHELL_CHAINING.iter().find(|p| script.contains(**p)) {
        return Err(ValidationError::ShellChaining { fragment: fragment.to_string() });
    }

    Ok(())
}
