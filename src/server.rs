//! Server construction and middleware wiring.
//!
//! Builds the Actix application: cookie-session middleware keyed from
//! `SECRET_KEY`, the shared [`AppState`], and the page routes. Sessions are
//! stateless cookies, so there is nothing to store server-side.

use crate::pages;
use crate::settings::{Mode, Settings};
use crate::users::UserStore;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Key, SameSite};
use actix_web::{App, HttpServer, web};
use tracing::{info, warn};

/// Worker count, carried over from the previous app-server configuration.
const WORKERS: usize = 4;

/// Shared application state handed to every handler.
pub struct AppState {
    pub store: UserStore,
}

/// Run the web application until shutdown.
pub async fn serve(settings: Settings) -> std::io::Result<()> {
    let key = session_key(&settings)?;
    let cookie_secure = settings.mode == Mode::Production;
    let state = web::Data::new(AppState {
        store: UserStore::new(&settings.database_path),
    });

    info!(
        host = %settings.host,
        port = settings.port,
        mode = ?settings.mode,
        database = %settings.database_path.display(),
        "Starting NZ Harold"
    );

    let bind_addr = (settings.host.clone(), settings.port);
    HttpServer::new(move || {
        let session = SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
            .cookie_name("session".into())
            .cookie_path("/".into())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .build();
        App::new()
            .app_data(state.clone())
            .wrap(session)
            .configure(pages::routes)
    })
    .workers(WORKERS)
    .bind(bind_addr)?
    .run()
    .await
}

/// Derive the session signing key from `SECRET_KEY`.
///
/// Development falls back to an ephemeral key with a warning; production
/// refuses to start without real key material.
fn session_key(settings: &Settings) -> std::io::Result<Key> {
    match &settings.secret_key {
        Some(secret) if secret.len() >= 32 => Ok(Key::derive_from(secret.as_bytes())),
        _ if settings.mode == Mode::Development => {
            warn!("SECRET_KEY missing or too short; using temporary session key (dev only)");
            Ok(Key::generate())
        }
        _ => Err(std::io::Error::other(
            "SECRET_KEY must be set to at least 32 bytes in production",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings(mode: Mode, secret_key: Option<&str>) -> Settings {
        Settings {
            mode,
            secret_key: secret_key.map(str::to_string),
            database_path: PathBuf::from("users.sqlite"),
            host: "127.0.0.1".to_string(),
            port: 5020,
        }
    }

    #[test]
    fn test_session_key_from_long_secret() {
        let s = settings(Mode::Production, Some("0123456789abcdef0123456789abcdef"));
        assert!(session_key(&s).is_ok());
    }

    #[test]
    fn test_session_key_missing_in_production_fails() {
        let s = settings(Mode::Production, None);
        assert!(session_key(&s).is_err());
    }

    #[test]
    fn test_session_key_short_in_production_fails() {
        let s = settings(Mode::Production, Some("sssssh"));
        assert!(session_key(&s).is_err());
    }

    #[test]
    fn test_session_key_falls_back_in_development() {
        let s = settings(Mode::Development, None);
        assert!(session_key(&s).is_ok());
    }
}
