//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init`, `status`, `seed` |
//! | Blueprint | Contract templates | `blueprint new`, `blueprint show` |
//! | Contract | Contracts and lifecycle | `contract new`, `contract status`, `contract audit` |
//! | Server | REST API | `serve` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - The `{success, data|error}` envelope used by the REST API
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output and debug-level logs:
//! ```bash
//! accord --verbose contract status ct-1a2b3c4d5e APPROVED
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod blueprint;
mod contract;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
