//! WatchVault Admin CLI
//!
//! Operator tool over a configured store.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use watchvault::{policy, AdminConfig, BackendKind, Config, Engine, StoreError};

/// WatchVault Admin
#[derive(Parser, Debug)]
#[command(name = "watchvault-admin")]
#[command(about = "Administer a WatchVault store")]
#[command(version)]
struct Args {
    /// Storage backend: memory, sqlite or kv (defaults to WATCHVAULT_STORAGE_TYPE)
    #[arg(short, long)]
    storage: Option<String>,

    /// SQLite database file or kv data directory (defaults to WATCHVAULT_DATA_PATH)
    #[arg(short, long)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all users
    Users,

    /// Register a user
    Register {
        username: String,
        password: String,
    },

    /// Delete a user and all of their data
    DeleteUser {
        username: String,
    },

    /// Change a user's password
    Passwd {
        username: String,
        password: String,
    },

    /// Show a user's search history, most recent first
    History {
        username: String,
    },

    /// Delete one keyword, or the whole history when omitted
    ClearHistory {
        username: String,
        keyword: Option<String>,
    },

    /// Print the admin config as JSON, or replace it from a file
    AdminConfig {
        /// JSON file to store as the new admin config
        #[arg(long)]
        set: Option<PathBuf>,
    },

    /// Evaluate the adult-content filter for a user and request parameters
    Filter {
        /// Username to resolve the per-user override for
        #[arg(short, long)]
        user: Option<String>,

        /// Request parameters as key=value
        params: Vec<String>,
    },

    /// Delete every record in the store
    Wipe {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,watchvault=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let engine = Engine::open(config);
    match run(&engine, args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Command-line flags take precedence over the environment
fn build_config(args: &Args) -> Result<Config, StoreError> {
    let mut config = Config::from_env()?;

    if let Some(kind) = &args.storage {
        let path = args.path.clone().or_else(|| match &config.backend {
            BackendKind::Sqlite { path } => Some(path.clone()),
            BackendKind::Kv { data_dir } => Some(data_dir.clone()),
            _ => None,
        });
        config.backend = BackendKind::parse(kind, path)?;
    } else if let Some(path) = &args.path {
        config.backend = match config.backend {
            BackendKind::Kv { .. } => BackendKind::Kv { data_dir: path.clone() },
            _ => BackendKind::Sqlite { path: path.clone() },
        };
    }

    Ok(config)
}

fn run(engine: &Engine, command: Commands) -> Result<(), StoreError> {
    match command {
        Commands::Users => {
            for user in engine.get_all_users() {
                println!("{}", user);
            }
        }
        Commands::Register { username, password } => {
            engine.register_user(&username, &password)?;
            println!("registered {}", username);
        }
        Commands::DeleteUser { username } => {
            engine.delete_user(&username)?;
            println!("deleted {}", username);
        }
        Commands::Passwd { username, password } => {
            if !engine.check_user_exist(&username) {
                return Err(StoreError::ConstraintViolation(format!("no such user: {}", username)));
            }
            engine.change_password(&username, &password)?;
            println!("password changed for {}", username);
        }
        Commands::History { username } => {
            for keyword in engine.get_search_history(&username) {
                println!("{}", keyword);
            }
        }
        Commands::ClearHistory { username, keyword } => {
            engine.delete_search_history(&username, keyword.as_deref())?;
        }
        Commands::AdminConfig { set: Some(file) } => {
            let text = std::fs::read_to_string(&file)?;
            let config: AdminConfig = serde_json::from_str(&text)
                .map_err(|e| StoreError::Codec(format!("{}: {}", file.display(), e)))?;
            engine.set_admin_config(&config)?;
            println!("admin config updated");
        }
        Commands::AdminConfig { set: None } => match engine.get_admin_config() {
            Some(config) => {
                let text = serde_json::to_string_pretty(&config).map_err(|e| StoreError::Codec(e.to_string()))?;
                println!("{}", text);
            }
            None => println!("no admin config stored"),
        },
        Commands::Filter { user, params } => {
            let params = policy::params_from_pairs(&params)?;
            let config = engine.get_admin_config().unwrap_or_default();
            let filtered = policy::resolve_for_user(&params, &config, user.as_deref());
            println!("{}", if filtered { "filter" } else { "show" });
        }
        Commands::Wipe { yes: false } => {
            return Err(StoreError::Config("refusing to wipe without --yes".to_string()));
        }
        Commands::Wipe { yes: true } => {
            engine.clear_all_data()?;
            println!("store wiped");
        }
    }

    Ok(())
}
