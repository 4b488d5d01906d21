//! Application configuration.
//!
//! Everything comes from the environment, the same variables the deployment
//! writes into the server's `.env` file: `MODE`, `SECRET_KEY`,
//! `DATABASE_URL`, `HOST`, and `PORT`. CLI flags may override the bind
//! address at `serve` time.

use std::env;
use std::path::PathBuf;

/// Default bind address when neither env nor CLI say otherwise.
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5020;

/// Default SQLite file next to the working directory.
pub const DEFAULT_DATABASE: &str = "users.sqlite";

/// Which configuration profile the process runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    /// Parse the `MODE` variable; anything other than `development` is
    /// production, matching the original deployment's behavior.
    fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("development") => Self::Development,
            _ => Self::Production,
        }
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    /// Session signing key material; optional so development can fall back
    /// to an ephemeral key with a warning.
    pub secret_key: Option<String>,
    /// Path to the SQLite user database.
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        let mode = Mode::from_env_value(env::var("MODE").ok().as_deref());
        let secret_key = env::var("SECRET_KEY").ok().filter(|k| !k.is_empty());
        let database_path = env::var("DATABASE_URL")
            .ok()
            .filter(|p| !p.is_empty())
            .map(|p| PathBuf::from(strip_sqlite_scheme(&p)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
        let host = env::var("HOST")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            mode,
            secret_key,
            database_path,
            host,
            port,
        }
    }
}

/// Accept `sqlite:///path/to/users.sqlite` as well as a bare path.
///
/// The previous deployment generation wrote SQLAlchemy-style URLs into
/// `.env`; stripping the scheme keeps those files working.
fn strip_sqlite_scheme(value: &str) -> &str {
    value
        .strip_prefix("sqlite:///")
        .or_else(|| value.strip_prefix("sqlite://"))
        .unwrap_or(value)
}
