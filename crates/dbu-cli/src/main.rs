use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::Session;

#[derive(Parser)]
#[command(name = "dbu")]
#[command(about = "Reconcile managed database users against their declarations", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> overrides)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// JSON state file holding the last observed state of each user
    #[arg(long, global = true, default_value = "dbu-state.json")]
    state: String,

    /// Deadline for each user's lifecycle operation, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Fail instead of warn when the config carries unused keys
    #[arg(long, global = true, default_value_t = false)]
    strict_config: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Show what apply would do, from the state file alone (no API calls)
    Plan,

    /// Create, update, replace or delete users until they match the config
    Apply,

    /// Re-read every managed user and rewrite the state file
    Refresh,

    /// Adopt an existing remote user under a configured name
    Import {
        /// Name of the user entry in the config
        name: String,
        /// Remote username to adopt
        username: String,
    },

    /// Delete one managed user, or all of them
    Destroy {
        /// Name of the user entry; omit to destroy every managed user
        name: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let timeout = cli.timeout_secs.map(Duration::from_secs);

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = dbu_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Plan => {
            let session = Session::load(&cli.config_paths, &cli.state, cli.strict_config)?;
            commands::plan(&session)?;
        }

        Commands::Apply => {
            let mut session = Session::load(&cli.config_paths, &cli.state, cli.strict_config)?;
            let controller = session.controller()?;
            commands::apply(&mut session, &controller, timeout).await?;
        }

        Commands::Refresh => {
            let mut session = Session::load(&cli.config_paths, &cli.state, cli.strict_config)?;
            let controller = session.controller()?;
            commands::refresh(&mut session, &controller, timeout).await?;
        }

        Commands::Import { name, username } => {
            let mut session = Session::load(&cli.config_paths, &cli.state, cli.strict_config)?;
            let controller = session.controller()?;
            commands::import(&mut session, &controller, timeout, &name, &username).await?;
        }

        Commands::Destroy { name } => {
            let mut session = Session::load(&cli.config_paths, &cli.state, cli.strict_config)?;
            let controller = session.controller()?;
            commands::destroy(&mut session, &controller, timeout, name.as_deref()).await?;
        }
    }

    Ok(())
}
