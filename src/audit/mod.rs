//! The append-only audit log: every mutating operation records an entry,
//! and each write opportunistically sweeps entries older than a week.

pub mod db;
pub mod endpoints;
pub mod models;

/// The address recorded against log entries. The server only listens on
/// the local network, so the loopback address is recorded rather than
/// threading per-request peer addresses through every handler.
pub(crate) const CLIENT_IP: &str = "127.0.0.1";
