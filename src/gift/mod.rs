//! Reciprocal gift records: money received from or given to others for
//! social occasions, and whether the gift has been reciprocated.

pub mod db;
pub mod endpoints;
pub mod models;
pub mod query;
