//! Execution engine: admission, gated subprocess run, output redaction.

use std::{path::PathBuf, time::Duration};

use tracing::{debug, warn};

use crate::{
    config::Config,
    context::CallContext,
    error::{ExecError, StartupError},
    gate::{ConcurrencyGate, Slot},
    process::{octave::eval_command, run_captured, version::probe_version, InterpreterCommand, Outcome},
    safety::{filter_output, sanitize_script, validate_script},
};

pub mod plot;

pub use plot::{PlotArtifact, PlotFormat};

/// Values fixed at startup. The script length limit is not here: it is read
/// from [`Config`] on every call.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub interpreter: InterpreterCommand,
    pub script_timeout: Duration,
    pub concurrency_limit: usize,
    pub graphics_toolkit: String,
    pub plot_dir: Option<PathBuf>,
}

impl RunnerSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            interpreter: InterpreterCommand::new(cfg.binary()),
            script_timeout: cfg.script_timeout(),
            concurrency_limit: cfg.concurrency_limit(),
            graphics_toolkit: cfg.graphics_toolkit(),
            plot_dir: cfg.plot_dir(),
        }
    }
}

#[derive(Debug)]
pub struct OctaveRunner {
    config: Config,
    settings: RunnerSettings,
    gate: ConcurrencyGate,
    version: String,
}

impl OctaveRunner {
    /// Probes the interpreter first; a runner never exists without one.
    pub async fn new(config: Config) -> Result<Self, StartupError> {
        let settings = RunnerSettings::from_config(&config);
        Self::with_settings(config, settings).await
    }

    pub async fn with_settings(config: Config, settings: RunnerSettings) -> Result<Self, StartupError> {
        let version = probe_version(&settings.interpreter, settings.script_timeout).await?;
        let gate = ConcurrencyGate::new(settings.concurrency_limit);
        Ok(Self { config, settings, gate, version })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Runs `script` and returns its trimmed, redacted stdout.
    ///
    /// On failure the error carries `stderr + "\n" + stdout`, both redacted,
    /// reachable through [`ExecError::diagnostic`].
    pub async fn execute_script(&self, ctx: &CallContext, script: &str) -> Result<String, ExecError> {
        let script = self.admit(script)?;
        let slot = self.gate.acquire(ctx).await?;
        self.run_admitted(ctx, &script, slot).await
    }

    /// Same path as [`execute_script`](Self::execute_script) for a caller that
    /// already holds a slot.
    pub(crate) async fn execute_with_slot(
        &self,
        ctx: &CallContext,
        script: &str,
        slot: Slot,
    ) -> Result<String, ExecError> {
        let script = self.admit(script)?;
        self.run_admitted(ctx, &script, slot).await
    }

    pub(crate) fn script_length_limit(&self) -> usize {
        self.config.script_length_limit()
    }

    fn admit(&self, script: &str) -> Result<String, ExecError> {
        if script.is_empty() {
            return Err(ExecError::EmptyScript);
        }
        if let Err(e) = validate_script(script) {
            warn!(category = e.category().as_str(), fragment = e.fragment(), "script rejected");
            return Err(e.into());
        }
        let limit = self.script_length_limit();
        let sanitized = sanitize_script(script, limit);
        if sanitized.is_empty() {
            return Err(ExecError::EmptyScript);
        }
        // stripping NULs can join a denied name back together
        if let Err(e) = validate_script(&sanitized) {
            warn!(category = e.category().as_str(), fragment = e.fragment(), "sanitized script rejected");
            return Err(e.into());
        }
        debug!(chars = sanitized.chars().count(), limit, "script admitted");
        Ok(sanitized)
    }

    async fn run_admitted(&self, ctx: &CallContext, script: &str, slot: Slot) -> Result<String, ExecError> {
        let timeout = self.settings.script_timeout;
        let cmd = eval_command(&self.settings.interpreter, script);
        let out = run_captured(cmd, timeout, ctx).await.map_err(ExecError::Spawn)?;
        drop(slot);

        let stdout = out.stdout.trim();
        match out.outcome {
            Outcome::Exited(status) if status.success() => Ok(filter_output(stdout)),
            Outcome::Exited(status) => {
                debug!(code = ?status.code(), "script failed");
                Err(ExecError::Failed {
                    code: status.code(),
                    diagnostic: combine_diagnostic(&out.stderr, stdout),
                })
            }
            Outcome::TimedOut => {
                warn!(timeout_secs = timeout.as_secs_f64(), "script timed out");
                Err(ExecError::TimedOut { timeout, diagnostic: combine_diagnostic(&out.stderr, stdout) })
            }
            Outcome::Cancelled(reason) => {
                debug!(%reason, "script cancelled by caller");
                Err(ExecError::Cancelled(reason))
            }
        }
    }
}

fn combine_diagnostic(stderr: &str, stdout: &str) -> String {
    format!("{}\n{}", filter_output(stderr), filter_output(stdout))
}
