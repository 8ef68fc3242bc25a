//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    Config, Error, auth::session::MemorySessionStore, db::initialize, pagination::PaginationConfig,
};

/// How long a session may stay idle before it is treated as expired.
pub const SESSION_TTL: Duration = Duration::minutes(30);

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting the session cookie.
    pub cookie_key: Key,

    /// Server-side sessions keyed by opaque token.
    pub sessions: MemorySessionStore,

    /// The inactivity window after which a session expires.
    pub session_ttl: Duration,

    /// The config that controls how to page lists of records.
    pub pagination_config: PaginationConfig,

    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// Household members that always appear in the owner list and may not
    /// be deleted.
    pub default_owners: Arc<Vec<String>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models and seeding the default category taxonomy and the
    /// default user.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, config: &Config) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            cookie_key: create_cookie_key(&config.cookie_secret),
            sessions: MemorySessionStore::new(),
            session_ttl: SESSION_TTL,
            pagination_config: PaginationConfig {
                default_page: 1,
                default_page_size: config.default_page_size,
            },
            db_connection: Arc::new(Mutex::new(db_connection)),
            default_owners: Arc::new(config.default_owners.clone()),
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret` string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}

/// The state needed for the auth middleware and the login endpoints.
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting the session cookie.
    pub cookie_key: Key,
    /// Server-side sessions keyed by opaque token.
    pub sessions: MemorySessionStore,
    /// The inactivity window after which a session expires.
    pub session_ttl: Duration,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            sessions: state.sessions.clone(),
            session_ttl: state.session_ttl,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

#[cfg(test)]
pub(crate) mod app_state_tests {
    use rusqlite::Connection;

    use super::AppState;
    use crate::Config;

    pub(crate) fn test_config() -> Config {
        Config {
            db_path: "unused.db".into(),
            address: "127.0.0.1:0".parse().unwrap(),
            cookie_secret: "stneaoetse".to_string(),
            default_owners: vec!["郭宁".to_string(), "李佳慧".to_string()],
            default_page_size: 50,
        }
    }

    #[test]
    fn new_initializes_database() {
        let conn = Connection::open_in_memory().unwrap();

        let state = AppState::new(conn, &test_config()).unwrap();

        let connection = state.db_connection.lock().unwrap();
        let table_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(table_count >= 6, "want at least 6 tables, got {table_count}");
    }
}
