//! Command-line interface definitions for NZ Harold.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! One binary carries the whole system: the web application, a one-shot
//! story fetcher, user management, and the deployment tasks.

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the NZ Harold application.
///
/// # Examples
///
/// ```sh
/// # Run the web application
/// nzharold serve
///
/// # Print one story as Markdown
/// nzharold fetch https://www.nzherald.co.nz/nz/some-story/ABC123/
///
/// # Manage the user database
/// nzharold user init
/// nzharold user add test test test@example.com
///
/// # Deploy to the web server
/// nzharold deploy --host deploy@web.example.works --domain nzharold.example.works install
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the web application
    Serve {
        /// Bind address; overrides the HOST environment variable
        #[arg(long)]
        host: Option<String>,

        /// Bind port; overrides the PORT environment variable
        #[arg(long)]
        port: Option<u16>,
    },

    /// Fetch one story and print it as Markdown
    Fetch {
        /// An article URL or site path on nzherald.co.nz
        url: String,
    },

    /// Manage users in the database
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Deploy the app to the web server
    Deploy {
        #[command(flatten)]
        options: DeployOptions,

        #[command(subcommand)]
        command: DeployCommand,
    },
}

/// A basic set of commands for managing users in the database.
#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create the user table
    Init,

    /// Add a user with the given username, password, and email address
    Add {
        username: String,
        password: String,
        email: String,
    },

    /// Remove the user with the given username
    Remove { username: String },

    /// Show the users (username, email address) registered in the database
    List,
}

/// Connection details for the deployment tasks.
#[derive(Args, Debug)]
pub struct DeployOptions {
    /// Administrative connection, as user@host
    #[arg(long, env = "DEPLOY_HOST")]
    pub host: String,

    /// Public domain the app serves
    #[arg(long, env = "DEPLOY_DOMAIN")]
    pub domain: String,

    /// Remote home directory holding webapps/
    #[arg(long, env = "DEPLOY_REMOTE_ROOT", default_value = "/home/mrcagney")]
    pub remote_root: String,

    /// Default account recreated by the user database sync
    #[arg(long, default_value = "mrcagney")]
    pub admin_user: String,

    /// Password for the default account
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

/// Deployment tasks, each a linear sequence of remote commands.
#[derive(Subcommand, Debug)]
pub enum DeployCommand {
    /// List (port, domain, conf file) for all domains in Apache use
    Ports,

    /// Deploy the app to the web server for the first time
    Install,

    /// Push a new release and restart the service
    Update,

    /// Show the status of the app's service
    Status,

    /// Delete the app from the web server
    Remove,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["nzharold", "serve"]);
        match cli.command {
            Command::Serve { host, port } => {
                assert!(host.is_none());
                assert!(port.is_none());
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn test_serve_with_overrides() {
        let cli = Cli::parse_from(["nzharold", "serve", "--host", "0.0.0.0", "--port", "8080"]);
        match cli.command {
            Command::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn test_user_add_parsing() {
        let cli = Cli::parse_from(["nzharold", "user", "add", "test", "pw", "t@example.com"]);
        match cli.command {
            Command::User {
                command:
                    UserCommand::Add {
                        username,
                        password,
                        email,
                    },
            } => {
                assert_eq!(username, "test");
                assert_eq!(password, "pw");
                assert_eq!(email, "t@example.com");
            }
            other => panic!("expected user add, got {other:?}"),
        }
    }

    #[test]
    fn test_deploy_parsing() {
        let cli = Cli::parse_from([
            "nzharold",
            "deploy",
            "--host",
            "deploy@web.example.works",
            "--domain",
            "nzharold.example.works",
            "ports",
        ]);
        match cli.command {
            Command::Deploy { options, command } => {
                assert_eq!(options.host, "deploy@web.example.works");
                assert_eq!(options.domain, "nzharold.example.works");
                assert_eq!(options.remote_root, "/home/mrcagney");
                assert_eq!(options.admin_user, "mrcagney");
                assert!(matches!(command, DeployCommand::Ports));
            }
            other => panic!("expected deploy, got {other:?}"),
        }
    }
}
