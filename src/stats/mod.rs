//! Read-side aggregation over the ledger and gift records.

pub mod calendar;
pub mod charts;
pub mod endpoints;
pub mod events;
pub mod gifts;
pub mod period;
pub mod summary;

use rusqlite::types::Value;
use time::{Duration, OffsetDateTime, macros::format_description};

/// A date range plus optional owner, shared by the statistics queries.
/// The bounds are inclusive "YYYY-MM-DD" strings; "全部" matches every
/// owner.
#[derive(Debug, Clone, Default)]
pub struct RangeFilter {
    /// The earliest date to include.
    pub start_date: Option<String>,
    /// The latest date to include.
    pub end_date: Option<String>,
    /// An owner to match exactly.
    pub owner: Option<String>,
}

impl RangeFilter {
    /// The SQL conditions and parameters for this filter, to be appended
    /// after `WHERE 1=1`.
    pub(crate) fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clause = String::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(start_date) = self.start_date.as_deref().filter(|date| !date.is_empty()) {
            clause.push_str(" AND account_date >= ?");
            params.push(Value::from(start_date.to_string()));
        }
        if let Some(end_date) = self.end_date.as_deref().filter(|date| !date.is_empty()) {
            clause.push_str(" AND account_date <= ?");
            params.push(Value::from(end_date.to_string()));
        }
        if let Some(owner) = &self.owner
            && !owner.is_empty()
            && owner != "全部"
        {
            clause.push_str(" AND owner = ?");
            params.push(Value::from(owner.clone()));
        }

        (clause, params)
    }

    /// Fill in missing date bounds with the last 365 days.
    pub(crate) fn or_last_year(mut self) -> Self {
        if self.start_date.as_deref().is_none_or(str::is_empty)
            || self.end_date.as_deref().is_none_or(str::is_empty)
        {
            let format = format_description!("[year]-[month]-[day]");
            let today = OffsetDateTime::now_utc().date();
            let year_ago = today - Duration::days(365);

            if let (Ok(start), Ok(end)) = (year_ago.format(&format), today.format(&format)) {
                self.start_date = Some(start);
                self.end_date = Some(end);
            }
        }

        self
    }
}
