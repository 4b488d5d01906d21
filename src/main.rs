//! # NZ Harold
//!
//! An authenticated web application that mirrors New Zealand Herald article
//! pages as readable text and images. Stories are rebuilt from the JSON
//! content blob each article page embeds in its markup, with internal links
//! rewritten to stay on-site.
//!
//! ## Features
//!
//! - Web reader behind a username/password login (cookie sessions)
//! - One-shot `fetch` command that prints a story as Markdown
//! - User management commands backed by a SQLite table
//! - Deployment tasks: remote provisioning, Apache + SSL, systemd service,
//!   user database sync
//!
//! ## Usage
//!
//! ```sh
//! nzharold serve
//! nzharold fetch https://www.nzherald.co.nz/nz/some-story/ABC123/
//! nzharold user add test test test@example.com
//! ```

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod deploy;
mod models;
mod outputs;
mod pages;
mod scrapers;
mod server;
mod session;
mod settings;
mod users;
mod utils;

use cli::{Cli, Command};
use deploy::DeployConfig;
use settings::Settings;
use users::UserStore;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    let mut settings = Settings::from_env();
    debug!(
        mode = ?settings.mode,
        database = %settings.database_path.display(),
        "Loaded settings"
    );

    match args.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            server::serve(settings).await?;
        }
        Command::Fetch { url } => match scrapers::nzherald::fetch_story(&url).await {
            Ok(story) => {
                print!("{}", outputs::markdown::story_to_markdown(&story));
            }
            Err(e) => {
                error!(%url, error = %e, "Fetch failed");
                eprintln!("Sorry, can't parse that URL");
                std::process::exit(1);
            }
        },
        Command::User { command } => {
            let store = UserStore::new(&settings.database_path);
            users::run_command(&store, command)?;
        }
        Command::Deploy { options, command } => {
            let config = DeployConfig::from_options(options);
            info!(host = %config.host, domain = %config.domain, "Running deploy task");
            deploy::run_command(&config, command)?;
        }
    }

    Ok(())
}
