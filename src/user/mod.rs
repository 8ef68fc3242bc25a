//! User credentials: salted password hashing, verification, the security
//! question recovery flow, and the login/logout endpoints.

pub mod db;
pub mod endpoints;
pub mod hashing;
