//! User store and management commands.
//!
//! A single `user` table in a SQLite file backs the login check: integer id,
//! unique username, unique email, and an argon2id password hash. The
//! connection-level functions carry the SQL; [`UserStore`] wraps them with
//! open-per-call convenience for the web handlers and the `user` subcommand.

use crate::models::User;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rusqlite::{Connection, OptionalExtension, params};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Handle on the SQLite user database.
///
/// Holds only the path; each operation opens a fresh connection. The user
/// table is tiny and touched once per login, so connection reuse buys
/// nothing and the handle stays `Send + Sync` for free.
#[derive(Debug, Clone)]
pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(&self) -> rusqlite::Result<Connection> {
        Connection::open(&self.path)
    }

    /// Create the `user` table if it does not exist.
    pub fn init(&self) -> rusqlite::Result<()> {
        create_user_table(&self.open()?)
    }

    /// Hash `password` and insert a new user row.
    pub fn add_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<(), Box<dyn Error>> {
        insert_user(&self.open()?, username, password, email)
    }

    /// Delete the row with the given username. Returns how many rows went.
    pub fn remove_user(&self, username: &str) -> rusqlite::Result<usize> {
        delete_user(&self.open()?, username)
    }

    /// All `(username, email)` pairs.
    pub fn list_users(&self) -> rusqlite::Result<Vec<(String, String)>> {
        select_users(&self.open()?)
    }

    /// Look up one user by username.
    pub fn find_by_username(&self, username: &str) -> rusqlite::Result<Option<User>> {
        find_by_username(&self.open()?, username)
    }

    /// Look up one user by id, as stored in the session cookie.
    pub fn find_by_id(&self, id: i64) -> rusqlite::Result<Option<User>> {
        find_by_id(&self.open()?, id)
    }
}

pub fn create_user_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY,
            username TEXT UNIQUE NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

pub fn insert_user(
    conn: &Connection,
    username: &str,
    password: &str,
    email: &str,
) -> Result<(), Box<dyn Error>> {
    let hashed = hash_password(password)?;
    conn.execute(
        "INSERT INTO user (username, email, password) VALUES (?1, ?2, ?3)",
        params![username, email, hashed],
    )?;
    Ok(())
}

pub fn delete_user(conn: &Connection, username: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM user WHERE username = ?1", params![username])
}

pub fn select_users(conn: &Connection) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT username, email FROM user ORDER BY username")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, email, password FROM user WHERE username = ?1",
        params![username],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, email, password FROM user WHERE id = ?1",
        params![id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
            })
        },
    )
    .optional()
}

/// Hash a password into a PHC-format argon2id string.
pub fn hash_password(password: &str) -> Result<String, Box<dyn Error>> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// Check a candidate password against a stored hash.
///
/// A hash that fails to parse counts as a failed check, not an error; the
/// login flow treats both the same way.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Execute one `user` subcommand against the store, echoing what happened.
#[instrument(level = "info", skip_all)]
pub fn run_command(store: &UserStore, command: crate::cli::UserCommand) -> Result<(), Box<dyn Error>> {
    use crate::cli::UserCommand;
    match command {
        UserCommand::Init => {
            store.init()?;
            info!("User table ready");
            println!("Created User table");
        }
        UserCommand::Add {
            username,
            password,
            email,
        } => {
            store.add_user(&username, &password, &email)?;
            println!("Added user {username}");
        }
        UserCommand::Remove { username } => {
            let removed = store.remove_user(&username)?;
            if removed == 0 {
                println!("No user named {username}");
            } else {
                println!("Removed user {username}");
            }
        }
        UserCommand::List => {
            for (username, email) in store.list_users()? {
                println!("{username}\t{email}");
            }
        }
    }
    Ok(())
}
