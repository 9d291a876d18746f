//! Interpreter process management (launch, capture, deadline).

use std::{io, process::ExitStatus, process::Stdio, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    task::JoinHandle,
};
use tracing::debug;

use crate::context::{CallContext, CancelReason};

pub mod octave;
pub mod version;

/// How long to keep draining pipes after the child is gone.
const PIPE_GRACE: Duration = Duration::from_secs(2);

/// Program plus any arguments that must precede the interpreter flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterCommand {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl InterpreterCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), leading_args: Vec::new() }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Direct exec, no shell in between; stdin closed, child killed if dropped.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled(CancelReason),
}

#[derive(Debug)]
pub struct CapturedOutput {
    pub outcome: Outcome,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `cmd` to completion, the timeout, or the caller giving up, whichever
/// comes first. Output written before a kill is still returned.
pub async fn run_captured(
    mut cmd: Command,
    timeout: Duration,
    ctx: &CallContext,
) -> io::Result<CapturedOutput> {
    if let Err(reason) = ctx.check() {
        return Ok(CapturedOutput {
            outcome: Outcome::Cancelled(reason),
            stdout: String::new(),
            stderr: String::new(),
        });
    }

    let mut child = cmd.spawn()?;
    let stdout_task = tokio::spawn(drain(child.stdout.take()));
    let stderr_task = tokio::spawn(drain(child.stderr.take()));

    let outcome = tokio::select! {
        status = child.wait() => Outcome::Exited(status?),
        _ = tokio::time::sleep(timeout) => Outcome::TimedOut,
        reason = ctx.done() => Outcome::Cancelled(reason),
    };

    if !matches!(outcome, Outcome::Exited(_)) {
        debug!(?outcome, pid = child.id(), "killing interpreter");
        if let Err(e) = child.kill().await {
            debug!(error = %e, "kill failed, child likely already exited");
        }
    }

    let stdout = join_pipe(stdout_task).await;
    let stderr = join_pipe(stderr_task).await;

    Ok(CapturedOutput {
        outcome,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!(error = %e, "pipe read ended early");
        }
    }
    buf
}

async fn join_pipe(mut task: JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(PIPE_GRACE, &mut task).await {
        Ok(Ok(buf)) => buf,
        Ok(Err(_)) => Vec::new(),
        Err(_) => {
            // a grandchild still holds the pipe open
            task.abort();
            Vec::new()
        }
    }
}
