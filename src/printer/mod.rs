//! Terminal printers for results and failures.

use owo_colors::OwoColorize;
use serde::Serialize;

use octave_runner::ExecError;

pub struct TextPrinter {
    pub color: bool,
}

impl TextPrinter {
    pub fn print(&self, text: &str) {
        println!("{}", text);
    }

    pub fn print_error(&self, err: &ExecError) {
        let header = format!("[{}] {}", err.category().as_str(), err);
        if self.color {
            eprintln!("{}", header.red());
        } else {
            eprintln!("{}", header);
        }
        let diagnostic = err.diagnostic().trim();
        if !diagnostic.is_empty() {
            if self.color {
                eprintln!("{}", diagnostic.yellow());
            } else {
                eprintln!("{}", diagnostic);
            }
        }
    }

    pub fn print_note(&self, text: &str) {
        if self.color {
            eprintln!("{}", text.green());
        } else {
            eprintln!("{}", text);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub ok: bool,
    pub output: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'static str>,
}

impl<'a> JsonReport<'a> {
    pub fn from_result(result: &'a Result<String, ExecError>) -> Self {
        match result {
            Ok(output) => Self { ok: true, output, error: None, category: None },
            Err(e) => Self {
                ok: false,
                output: e.diagnostic(),
                error: Some(e.to_string()),
                category: Some(e.category().as_str()),
            },
        }
    }
}
