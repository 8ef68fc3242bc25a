//! The server-side session store.
//!
//! Sessions are keyed by an opaque random token that travels in a private
//! cookie. The store itself is pluggable behind [SessionStore]; the default
//! backing is an in-process map.

use std::{
    collections::HashMap,
    fmt::Write,
    sync::{Arc, Mutex},
};

use rand::RngCore;
use time::{Duration, OffsetDateTime};

/// The data held server-side for one logged-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The username that logged in.
    pub username: String,
    /// When the user logged in.
    pub logged_in_at: OffsetDateTime,
    /// When the session was last used.
    pub last_activity: OffsetDateTime,
}

/// Whether a session with the given `last_activity` has sat idle longer
/// than `ttl` as of `now`.
pub fn is_expired(now: OffsetDateTime, last_activity: OffsetDateTime, ttl: Duration) -> bool {
    now - last_activity > ttl
}

/// Interface for session storage so the backing can be swapped out (e.g.
/// for an external cache) without touching the middleware.
pub trait SessionStore {
    /// Create a session for `username` and return its opaque token.
    fn create(&self, username: &str) -> String;

    /// Look up the session for `token`.
    fn get(&self, token: &str) -> Option<Session>;

    /// Set the session's last-activity time to `now`.
    fn touch(&self, token: &str, now: OffsetDateTime);

    /// Remove the session for `token`, if any.
    fn remove(&self, token: &str);
}

/// An in-process [SessionStore] backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, username: &str) -> String {
        let token = generate_token();
        let now = OffsetDateTime::now_utc();

        self.sessions.lock().unwrap().insert(
            token.clone(),
            Session {
                username: username.to_string(),
                logged_in_at: now,
                last_activity: now,
            },
        );

        token
    }

    fn get(&self, token: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(token).cloned()
    }

    fn touch(&self, token: &str, now: OffsetDateTime) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(token) {
            session.last_activity = now;
        }
    }

    fn remove(&self, token: &str) {
        self.sessions.lock().unwrap().remove(token);
    }
}

/// 32 random bytes, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);

    bytes.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

#[cfg(test)]
mod session_tests {
    use time::{Duration, OffsetDateTime};

    use super::{MemorySessionStore, SessionStore, is_expired};

    #[test]
    fn fresh_session_is_not_expired() {
        let now = OffsetDateTime::now_utc();

        assert!(!is_expired(now, now, Duration::minutes(30)));
    }

    #[test]
    fn idle_session_expires_after_ttl() {
        let now = OffsetDateTime::now_utc();
        let last_activity = now - Duration::minutes(31);

        assert!(is_expired(now, last_activity, Duration::minutes(30)));
    }

    #[test]
    fn session_at_exactly_ttl_is_still_valid() {
        let now = OffsetDateTime::now_utc();
        let last_activity = now - Duration::minutes(30);

        assert!(!is_expired(now, last_activity, Duration::minutes(30)));
    }

    #[test]
    fn create_and_get_round_trip() {
        let store = MemorySessionStore::new();

        let token = store.create("admin");
        let session = store.get(&token).expect("session should exist");

        assert_eq!(session.username, "admin");
    }

    #[test]
    fn tokens_are_unique() {
        let store = MemorySessionStore::new();

        let first = store.create("admin");
        let second = store.create("admin");

        assert_ne!(first, second);
    }

    #[test]
    fn touch_updates_last_activity() {
        let store = MemorySessionStore::new();
        let token = store.create("admin");
        let later = OffsetDateTime::now_utc() + Duration::minutes(5);

        store.touch(&token, later);

        assert_eq!(store.get(&token).unwrap().last_activity, later);
    }

    #[test]
    fn remove_deletes_session() {
        let store = MemorySessionStore::new();
        let token = store.create("admin");

        store.remove(&token);

        assert!(store.get(&token).is_none());
    }
}
