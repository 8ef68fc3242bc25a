//! Command line configuration for the server binary.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Configuration for the giftledger server.
///
/// Everything the process needs is collected here at startup and passed to
/// [crate::AppState::new]; nothing is read from process-wide globals.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// Path to the SQLite database file. The file and its tables are
    /// created if they do not exist.
    #[arg(long, default_value = "giftledger.db")]
    pub db_path: PathBuf,

    /// The address to listen on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub address: SocketAddr,

    /// The secret used to sign and encrypt the session cookie.
    #[arg(long, env = "COOKIE_SECRET")]
    pub cookie_secret: String,

    /// Household members that should always appear in the owner list and
    /// may not be deleted. May be given multiple times.
    #[arg(long = "default-owner")]
    pub default_owners: Vec<String>,

    /// The number of records per page when a request does not specify one.
    #[arg(long, default_value_t = 50)]
    pub default_page_size: u64,
}
