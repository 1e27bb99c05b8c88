//! # Storage Layer
//!
//! Persistence for Accord: one SQLite database per project plus TOML
//! configuration.
//!
//! ## Project Structure
//!
//! ```text
//! .accord/
//! ├── accord.db      # SQLite database (blueprints, contracts, audit log)
//! ├── config.toml    # Project configuration
//! └── .gitignore     # Ignores the database files
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for an Accord project directory
//! - [`Database`] - Transactional SQLite store
//! - [`Config`] - Project and global configuration

mod config;
mod db;
mod project;

pub use config::{
    Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, ServerConfig, PROJECT_DIR,
};
pub use db::{Database, DatabaseError};
pub use project::{Project, ProjectError};
