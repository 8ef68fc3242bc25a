//! The daily income/expense ledger: entries, the category taxonomy, and
//! their endpoints.

pub mod category;
pub mod db;
pub mod endpoints;
pub mod models;
