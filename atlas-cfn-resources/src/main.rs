//! CloudFormation resource handlers for MongoDB Atlas
//!
//! Reads one JSON handler request per line on stdin and writes one JSON
//! progress event per line on stdout.

use anyhow::{Context, Result};
use atlas_cfn_common::config::Settings;
use atlas_cfn_common::logging::LoggingConfig;
use atlas_cfn_common::profile::ProfileStore;
use atlas_cfn_resources::client::AtlasConnector;
use atlas_cfn_resources::{HandlerContext, Provider};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// CloudFormation resource handlers for MongoDB Atlas
#[derive(Parser, Debug)]
#[command(name = "atlas-cfn-resources")]
#[command(about = "CloudFormation resource handlers for MongoDB Atlas")]
struct Args {
    /// Settings file (defaults to ~/.config/atlas-cfn/config.toml)
    #[arg(long, env = "ATLAS_CFN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve requests from stdin, one per line (default)
    Serve,
    /// Handle a single request read from a file
    Invoke {
        /// JSON handler request
        file: PathBuf,
    },
    /// Print the resource schema for a type
    Schema {
        /// Resource type name, e.g. MongoDB::Atlas::GlobalClusterConfig
        type_name: String,
    },
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(p) => Settings::load_from(p).with_context(|| format!("loading {}", p.display())),
        None => Settings::load().context("loading settings"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = load_settings(args.config.as_ref())?;
    LoggingConfig::from(&settings)
        .init()
        .context("initializing logging")?;

    let profiles = ProfileStore::load(&settings.profiles_path()?).context("loading profiles")?;
    tracing::debug!(profiles = profiles.len(), "profiles loaded");

    let connector = Arc::new(AtlasConnector::new(settings.clone()));
    let provider = Provider::new(HandlerContext::new(settings, profiles, connector));

    match args.command.unwrap_or(Command::Serve) {
        Command::Schema { type_name } => {
            let schema = provider.schema(&type_name).with_context(|| {
                format!(
                    "unknown resource type {} (known: {})",
                    type_name,
                    provider.type_names().join(", ")
                )
            })?;
            println!("{}", schema.to_json()?);
        }
        Command::Invoke { file } => {
            let input = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let runtime = tokio::runtime::Runtime::new().context("creating Tokio runtime")?;
            println!("{}", runtime.block_on(provider.handle_request(&input)));
        }
        Command::Serve => serve(&provider)?,
    }

    Ok(())
}

fn serve(provider: &Provider) -> Result<()> {
    tracing::info!("Starting Atlas CloudFormation handlers");

    let runtime = tokio::runtime::Runtime::new().context("creating Tokio runtime")?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();

    for line in stdin.lock().lines() {
        let input = line.context("reading request")?;
        if input.trim().is_empty() {
            continue;
        }

        let response = runtime.block_on(provider.handle_request(&input));
        writeln!(stdout_lock, "{}", response).context("writing response")?;
        stdout_lock.flush().context("flushing stdout")?;
    }

    tracing::info!("Atlas CloudFormation handlers shutting down");
    Ok(())
}
