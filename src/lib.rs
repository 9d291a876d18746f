//! Guarded GNU Octave execution for tool-calling agents.
//!
//! [`OctaveRunner`] exposes the two calls a tool layer needs:
//! [`execute_script`](OctaveRunner::execute_script) and
//! [`generate_plot`](OctaveRunner::generate_plot), plus the interpreter
//! version probed at construction.

pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod gate;
pub mod process;
pub mod safety;

pub use config::Config;
pub use context::{CallContext, CancelReason};
pub use error::{ErrorCategory, ExecError, StartupError};
pub use execution::{OctaveRunner, PlotArtifact, PlotFormat, RunnerSettings};
pub use gate::ConcurrencyGate;
pub use process::InterpreterCommand;
