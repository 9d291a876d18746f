//! Startup check that the interpreter is installed and answers `--version`.

use std::{sync::OnceLock, time::Duration};

use regex::Regex;
use tracing::info;

use super::{octave::version_command, run_captured, InterpreterCommand, Outcome};
use crate::context::CallContext;
use crate::error::StartupError;

pub fn parse_version(output: &str) -> Option<&str> {
    static SEMVER: OnceLock<Regex> = OnceLock::new();
    SEMVER
        .get_or_init(|| Regex::new(r"\d+\.\d+\.\d+").expect("constant pattern"))
        .find(output)
        .map(|m| m.as_str())
}

pub async fn probe_version(
    interpreter: &InterpreterCommand,
    timeout: Duration,
) -> Result<String, StartupError> {
    let program = interpreter.program.clone();
    let out = run_captured(version_command(interpreter), timeout, &CallContext::new())
        .await
        .map_err(|source| StartupError::Launch { program: program.clone(), source })?;

    match out.outcome {
        Outcome::Exited(status) if status.success() => {}
        Outcome::Exited(status) => {
            return Err(StartupError::Exited { program, code: status.code() });
        }
        Outcome::TimedOut | Outcome::Cancelled(_) => {
            return Err(StartupError::TimedOut { program, timeout });
        }
    }

    let version = parse_version(&out.stdout)
        .ok_or_else(|| StartupError::UnparseableVersion {
            program: program.clone(),
            output: out.stdout.trim().to_string(),
        })?
        .to_string();
    info!(%program, %version, "interpreter found");
    Ok(version)
}
