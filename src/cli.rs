use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "octave-runner", about = "Run GNU Octave scripts and plots with guard rails", version)]
pub struct Cli {
    /// Log level (debug|info|warn|error). Falls back to LOG_LEVEL, then info.
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Execute a script and print its output.
    Exec {
        /// Script text. Read from stdin when omitted.
        #[arg(value_name = "SCRIPT")]
        script: Option<String>,

        /// Print a JSON object instead of plain text.
        #[arg(long)]
        json: bool,
    },

    /// Render the figure drawn by a script to a file.
    Plot {
        /// Script text. Read from stdin when omitted.
        #[arg(value_name = "SCRIPT")]
        script: Option<String>,

        /// Image format (png|svg).
        #[arg(short, long, default_value = "png")]
        format: String,

        /// Destination file.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the detected interpreter version.
    Version,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
