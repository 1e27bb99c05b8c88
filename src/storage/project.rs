//! Project management
//!
//! Handles project initialization and provides access to the database.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use super::config::PROJECT_DIR;
use super::{Config, Database};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in an accord project. Run 'accord init' first.")]
    NotInProject,
}

/// An Accord project: a directory holding `.accord/`
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path and creates its database
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let accord_dir = root.join(PROJECT_DIR);

        fs::create_dir_all(&accord_dir).with_context(|| {
            format!("Failed to create .accord directory: {}", accord_dir.display())
        })?;

        let config_path = accord_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# Accord configuration

# SQLite database, relative to this directory
database = "accord.db"

[server]
host = "127.0.0.1"
port = 3001

# Origin allowed to call the API from a browser
frontend_url = "http://localhost:3000"
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = accord_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# SQLite database and its WAL files
*.db
*.db-shm
*.db-wal
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let project = Self::open(root)?;
        let db = project.database()?;
        debug!(path = ?db.path(), "Initialized database");

        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .accord directory path
    pub fn accord_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database file path
    pub fn database_path(&self) -> PathBuf {
        self.accord_dir().join(&self.config.project.database)
    }

    /// Opens the project database
    pub fn database(&self) -> Result<Database> {
        Database::open(&self.database_path())
    }
}
