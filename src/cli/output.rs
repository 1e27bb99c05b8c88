//! Output formatting for CLI commands
//!
//! In JSON mode every command prints the same envelope the REST API returns.

use serde::Serialize;

use crate::api::Envelope;
use crate::engine::EngineError;
use crate::storage;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<storage::OutputFormat> for OutputFormat {
    fn from(format: storage::OutputFormat) -> Self {
        match format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                let envelope = Envelope::ok(serde_json::json!({ "message": message }));
                println!("{}", envelope.to_json());
            }
        }
    }

    /// Prints a failed command.
    ///
    /// Text goes to stderr via `main`; JSON mode also prints the error
    /// envelope to stdout so scripts can parse it.
    pub fn failure(&self, err: &anyhow::Error) {
        if self.format != OutputFormat::Json {
            return;
        }

        let envelope = match err.downcast_ref::<EngineError>() {
            Some(engine) => Envelope::err(engine.to_string(), engine.code()),
            None => Envelope::err(format!("{:#}", err), "ERROR"),
        };
        println!("{}", envelope.to_json());
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match serde_json::to_value(data) {
            Ok(value) => match self.format {
                OutputFormat::Text => {
                    if let Ok(json) = serde_json::to_string_pretty(&value) {
                        println!("{}", json);
                    }
                }
                OutputFormat::Json => println!("{}", Envelope::ok(value).to_json()),
            },
            Err(e) => eprintln!("Error: failed to serialize output: {}", e),
        }
    }

    /// Prints a table row (text only, ignored in JSON mode)
    pub fn row(&self, columns: &[&str]) {
        if self.format == OutputFormat::Text {
            println!("{}", columns.join("\t"));
        }
    }

    /// Prints a blank line (text only)
    pub fn blank(&self) {
        if self.format == OutputFormat::Text {
            println!();
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Returns true if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}
