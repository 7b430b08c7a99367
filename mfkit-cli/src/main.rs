//! Developer CLI for mfkit.
//!
//! Every command runs against an in-memory browser (shared store, session
//! storage, location and parent frame), so the runtime's behaviour can be
//! inspected without a shell or a page.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr as _};
use mfkit_core::{Environment, Scope, SyncConfig};

mod commands;

#[derive(Parser)]
#[command(name = "mfkit")]
#[command(about = "Inspect the mfkit child runtime against an in-memory browser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true, env = "MFKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Simulate running inside the shell instead of standalone
    #[arg(short, long, global = true)]
    embedded: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current and legacy store keys of a scope
    Resolve {
        /// Scope to resolve (user, app, permissions, token)
        #[arg(value_parser = Scope::from_str)]
        scope: Scope,
    },

    /// Seed legacy keys and run the migration pass
    Migrate {
        /// Raw entries to seed, as KEY=JSON
        #[arg(short, long = "seed", value_parser = commands::parse_seed)]
        seeds: Vec<(String, serde_json::Value)>,
    },

    /// Run the credential handshake on a URL
    Handshake {
        /// Page URL, e.g. `http://localhost:3003/?token=tok_42_abc`
        url: String,
    },

    /// Run the authorization gate
    Gate {
        /// Token present in the shared store before the first check
        #[arg(short, long)]
        token: Option<String>,

        /// Page URL used for the login return address
        #[arg(long, default_value = "http://localhost:3003/dashboard")]
        url: String,
    },

    /// Print the route table announced to the shell
    Routes {
        /// Deployment environment (development, production)
        #[arg(long, value_parser = Environment::from_str)]
        env: Option<Environment>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<SyncConfig> {
    let Some(path) = path else {
        return Ok(SyncConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    Ok(SyncConfig::from_json(&json)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_ref())?;
    let env = commands::Env {
        config,
        embedded: cli.embedded,
    };

    let output = match cli.command {
        Commands::Resolve { scope } => commands::resolve(&env, scope),
        Commands::Migrate { seeds } => commands::migrate(&env, &seeds),
        Commands::Handshake { url } => commands::handshake(&env, &url).await?,
        Commands::Gate { token, url } => commands::gate(&env, token.as_deref(), &url).await?,
        Commands::Routes { env: environment } => commands::routes(&env, environment),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
