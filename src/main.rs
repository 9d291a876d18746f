mod cli;
mod printer;

use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

use cli::Command;
use octave_runner::{config::LOG_LEVEL_KEY, CallContext, Config, OctaveRunner};
use printer::{JsonReport, TextPrinter};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = cli::Cli::parse();
    let cfg = Config::load();
    init_tracing(args.log_level.as_deref(), cfg.get(LOG_LEVEL_KEY));

    tracing::info!("starting octave-runner");

    let runner = OctaveRunner::new(cfg)
        .await
        .context("interpreter check failed")?;
    let printer = TextPrinter { color: io::stderr().is_terminal() };

    let ctx = CallContext::new();
    cancel_on_interrupt(&ctx);

    match args.command {
        Command::Version => {
            printer.print(runner.version());
            Ok(ExitCode::SUCCESS)
        }
        Command::Exec { script, json } => {
            let script = resolve_script(script)?;
            let result = runner.execute_script(&ctx, &script).await;
            if json {
                println!("{}", serde_json::to_string(&JsonReport::from_result(&result))?);
            } else {
                match &result {
                    Ok(output) => printer.print(output),
                    Err(e) => printer.print_error(e),
                }
            }
            Ok(if result.is_ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Plot { script, format, output } => {
            let script = resolve_script(script)?;
            match runner.generate_plot(&ctx, &script, &format).await {
                Ok(artifact) => {
                    let mime = artifact.format.mime_type();
                    let len = artifact.data.len();
                    tokio::fs::write(&output, artifact.into_bytes())
                        .await
                        .with_context(|| format!("writing plot to {}", output.display()))?;
                    printer.print_note(&format!("wrote {} bytes ({}) to {}", len, mime, output.display()));
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    printer.print_error(&e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn init_tracing(cli_level: Option<&str>, configured: Option<String>) {
    let level = log_level(cli_level, configured);
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// `--log-level` wins over `LOG_LEVEL` from the env or rc file.
fn log_level(cli_level: Option<&str>, configured: Option<String>) -> String {
    cli_level
        .map(str::to_string)
        .or(configured)
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

/// Script from the argument, else from piped stdin.
fn resolve_script(arg: Option<String>) -> Result<String> {
    if let Some(script) = arg {
        return Ok(script);
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("provide a script argument or pipe one via stdin");
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    Ok(buf)
}

fn cancel_on_interrupt(ctx: &CallContext) {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            ctx.cancel();
        }
    });
}
