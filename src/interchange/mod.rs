//! CSV import and export for gift records and ledger entries, plus the
//! blank import templates.

pub mod export;
pub mod fields;
pub mod import;
