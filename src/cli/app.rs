//! Main CLI application structure

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{blueprint, contract};
use crate::api::ApiServer;
use crate::domain::ContractStatus;
use crate::engine;
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "accord")]
#[command(author, version, about = "Blueprint-driven contract management")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new accord project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage blueprints (contract templates)
    #[command(subcommand)]
    Blueprint(blueprint::BlueprintCommands),

    /// Manage contracts
    #[command(subcommand)]
    Contract(contract::ContractCommands),

    /// Show blueprint and contract counts
    Status,

    /// Load sample blueprints and contracts
    Seed,

    /// Run the REST API
    Serve {
        /// Interface to bind (overrides config)
        #[arg(long, env = "ACCORD_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long, short, env = "ACCORD_PORT")]
        port: Option<u16>,

        /// Origin allowed by CORS (overrides config)
        #[arg(long, env = "ACCORD_FRONTEND_URL")]
        frontend_url: Option<String>,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()
            .map(|global| global.default_format.into())
            .unwrap_or_default(),
    };
    let output = Output::new(format, cli.verbose);

    let result = execute(cli.command, &output);
    if let Err(err) = &result {
        output.failure(err);
    }
    result
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "accord_cli=debug"
    } else if matches!(cli.command, Commands::Serve { .. }) {
        "accord_cli=info"
    } else {
        "accord_cli=warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn execute(command: Commands, output: &Output) -> Result<()> {
    match command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Database at: {}", project.database_path().display()),
            );
            output.success(&format!(
                "Initialized accord project at {}",
                project.root().display()
            ));
        }

        Commands::Blueprint(cmd) => blueprint::run(cmd, output)?,
        Commands::Contract(cmd) => contract::run(cmd, output)?,

        Commands::Status => status(output)?,

        Commands::Seed => {
            let project = Project::open_current()?;
            let mut db = project.database()?;
            let summary = engine::seed(&mut db)?;

            if output.is_json() {
                output.data(&summary);
            } else {
                output.success(&format!(
                    "Seeded {} blueprints and {} contracts",
                    summary.blueprints, summary.contracts
                ));
            }
        }

        Commands::Serve {
            host,
            port,
            frontend_url,
        } => serve(output, host, port, frontend_url)?,
    }

    Ok(())
}

fn status(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let db = project.database()?;

    let blueprints = db.list_blueprints()?.len();
    let counts = db.status_counts()?;
    let count_of = |status: ContractStatus| {
        counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    if output.is_json() {
        let by_status: serde_json::Map<String, serde_json::Value> = ContractStatus::all()
            .iter()
            .map(|s| (s.as_str().to_string(), count_of(*s).into()))
            .collect();
        output.data(&serde_json::json!({
            "blueprints": blueprints,
            "contracts": by_status,
        }));
        return Ok(());
    }

    println!("Blueprints: {}", blueprints);
    println!("Contracts:");
    for status in ContractStatus::all() {
        output.row(&["  ", status.as_str(), &count_of(*status).to_string()]);
    }

    Ok(())
}

fn serve(
    output: &Output,
    host: Option<String>,
    port: Option<u16>,
    frontend_url: Option<String>,
) -> Result<()> {
    let project = Project::open_current()?;
    let defaults = &project.config().project.server;

    let host = host.unwrap_or_else(|| defaults.host.clone());
    let port = port.unwrap_or(defaults.port);
    let frontend_url = frontend_url.unwrap_or_else(|| defaults.frontend_url.clone());

    let addr: SocketAddr = (host.as_str(), port)
        .to_socket_addrs()
        .with_context(|| format!("Invalid address {}:{}", host, port))?
        .next()
        .with_context(|| format!("Address {}:{} did not resolve", host, port))?;

    let db = project.database()?;
    let server = Arc::new(ApiServer::new(db, addr, &frontend_url)?);

    output.success(&format!("Serving API on http://{}/api", addr));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(server.run())
}
