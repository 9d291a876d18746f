//! Error taxonomy shared by the admission, execution and plot paths.

use std::{io, time::Duration};

use thiserror::Error;

use crate::context::CancelReason;
use crate::safety::ValidationError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("script cannot be empty")]
    EmptyScript,

    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error("unsupported format: {0} (must be png or svg)")]
    UnsupportedFormat(String),

    #[error("script length limit {limit} leaves no room for the plot wrapper ({overhead} chars)")]
    PlotBudgetExhausted { limit: usize, overhead: usize },

    #[error("failed to prepare plot directory: {0}")]
    Environment(#[source] io::Error),

    #[error("failed to start interpreter: {0}")]
    Spawn(#[source] io::Error),

    #[error("script exited with {}", exit_label(.code))]
    Failed { code: Option<i32>, diagnostic: String },

    #[error("script timed out after {}s", .timeout.as_secs_f64())]
    TimedOut { timeout: Duration, diagnostic: String },

    #[error("execution {0}")]
    Cancelled(CancelReason),

    #[error("plot generation failed: {0}")]
    PlotFailed(#[source] Box<ExecError>),

    #[error("failed to read plot file: {0}")]
    MissingArtifact(#[source] io::Error),

    #[error("concurrency gate is closed")]
    GateClosed,
}

impl ExecError {
    /// Filtered interpreter output attached to the failure, empty when nothing ran.
    pub fn diagnostic(&self) -> &str {
        match self {
            Self::Failed { diagnostic, .. } | Self::TimedOut { diagnostic, .. } => diagnostic,
            Self::PlotFailed(inner) => inner.diagnostic(),
            _ => "",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyScript
            | Self::Rejected(_)
            | Self::UnsupportedFormat(_)
            | Self::PlotBudgetExhausted { .. } => ErrorCategory::Admission,
            Self::Environment(_) | Self::Spawn(_) | Self::GateClosed => ErrorCategory::Environment,
            Self::Failed { .. } | Self::TimedOut { .. } => ErrorCategory::Execution,
            Self::MissingArtifact(_) => ErrorCategory::Artifact,
            Self::Cancelled(_) => ErrorCategory::Cancellation,
            Self::PlotFailed(inner) => inner.category(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.category() == ErrorCategory::Cancellation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Admission,
    Environment,
    Execution,
    Artifact,
    Cancellation,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admission => "admission",
            Self::Environment => "environment",
            Self::Execution => "execution",
            Self::Artifact => "artifact",
            Self::Cancellation => "cancellation",
        }
    }
}

/// Failure to verify the interpreter when building a runner.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not run {program}, make sure it's installed and available in the PATH: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} --version did not answer within {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("{program} --version exited with {}", exit_label(.code))]
    Exited { program: String, code: Option<i32> },

    #[error("no version number found in {program} --version output: {output:?}")]
    UnparseableVersion { program: String, output: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match *code {
        Some(c) => format!("exit code {}", c),
        None => "a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_errors_carry_no_diagnostic() {
        let err = ExecError::EmptyScript;
        assert_eq!(err.to_string(), "script cannot be empty");
        assert_eq!(err.diagnostic(), "");
        assert_eq!(err.category(), ErrorCategory::Admission);
    }

    #[test]
    fn plot_failure_exposes_inner_diagnostic() {
        let inner = ExecError::Failed { code: Some(1), diagnostic: "error: boom\n".into() };
        let err = ExecError::PlotFailed(Box::new(inner));
        assert!(err.to_string().starts_with("plot generation failed: script exited with exit code 1"));
        assert_eq!(err.diagnostic(), "error: boom\n");
        assert_eq!(err.category(), ErrorCategory::Execution);
    }

    #[test]
    fn cancellation_is_distinct_from_failure() {
        let err = ExecError::Cancelled(CancelReason::DeadlineExceeded);
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "execution deadline exceeded");

        let err = ExecError::TimedOut { timeout: Duration::from_secs(2), diagnostic: String::new() };
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "script timed out after 2s");
    }

    #[test]
    fn unsupported_format_message() {
        let err = ExecError::UnsupportedFormat("jpg".into());
        assert_eq!(err.to_string(), "unsupported format: jpg (must be png or svg)");
    }
}
