//! Storyapp CLI
//!
//! Command-line front-end for Storyapp - share and browse photo stories.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use storyapp_core::{Config, Repository};

mod commands;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "storyapp")]
#[command(about = "Storyapp - share and browse photo stories")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Email address
        #[arg(short, long)]
        email: String,
        /// Password (prompted for without echo if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Log in and remember the session
    Login {
        /// Email address
        #[arg(short, long)]
        email: String,
        /// Password (prompted for without echo if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the session and the cached feed
    Logout,
    /// Show session and cache status
    Status,
    /// List stories from the feed
    #[command(alias = "ls")]
    Stories {
        /// Feed pages to have cached; pages already cached count toward it
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
        /// Reload the feed from the first page
        #[arg(long)]
        refresh: bool,
    },
    /// Show one story
    Show {
        /// Story ID
        id: String,
    },
    /// Upload a new story
    Upload {
        /// Photo to upload
        photo: PathBuf,
        /// Story text
        #[arg(short, long)]
        description: String,
        /// Latitude
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },
    /// List stories that carry a location
    Map,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_url, page_size, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work without a session or cache
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let config = Config::load().context("Failed to load configuration")?;
    logging::init(&config);

    let repository = match Repository::open(&config) {
        Ok(repository) => Arc::new(repository),
        Err(e) => {
            if let Some(hint) = commands::storage_hint(&e) {
                output.warn(hint);
            }
            return Err(e);
        }
    };

    match cli.command {
        Commands::Register {
            name,
            email,
            password,
        } => commands::account::register(repository, name, email, password, &output).await,
        Commands::Login { email, password } => {
            commands::account::login(repository, email, password, &output).await
        }
        Commands::Logout => commands::account::logout(repository, &output).await,
        Commands::Status => commands::account::status(repository, &config, &output).await,
        Commands::Stories { pages, refresh } => {
            commands::stories::list(repository, pages, refresh, &output).await
        }
        Commands::Show { id } => commands::stories::show(repository, id, &output).await,
        Commands::Upload {
            photo,
            description,
            lat,
            lon,
        } => commands::stories::upload(repository, photo, description, lat.zip(lon), &output).await,
        Commands::Map => commands::stories::map(repository, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}
