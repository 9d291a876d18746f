//! GNU Octave invocation flags.

use tokio::process::Command;

use super::InterpreterCommand;

/// No GUI, no banner, no user startup files, no history file.
pub const EVAL_FLAGS: &[&str] = &["--no-gui", "--quiet", "--norc", "--no-history"];

/// The script travels as a single argv entry, never through a shell.
pub fn eval_command(interpreter: &InterpreterCommand, script: &str) -> Command {
    let mut cmd = interpreter.command();
    cmd.args(EVAL_FLAGS).arg("--eval").arg(script);
    cmd
}

pub fn version_command(interpreter: &InterpreterCommand) -> Command {
    let mut cmd = interpreter.command();
    cmd.arg("--version");
    cmd
}
