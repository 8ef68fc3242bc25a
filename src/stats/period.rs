//! Grouped period statistics over the ledger.

use rusqlite::Connection;
use serde::Serialize;

use crate::{Error, ledger::models::EntryKind, stats::RangeFilter};

/// How to group ledger entries for period statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One row per calendar month.
    Monthly,
    /// One row per calendar quarter.
    Quarterly,
    /// One row per calendar year.
    Yearly,
    /// One row per category.
    Category,
    /// One row per (category, subcategory) pair.
    Subcategory,
    /// One row per owner, split by category.
    OwnerDetail,
}

impl Grouping {
    /// Parse the query-string value, e.g. "monthly".
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(Grouping::Monthly),
            "quarterly" => Some(Grouping::Quarterly),
            "yearly" => Some(Grouping::Yearly),
            "category" => Some(Grouping::Category),
            "subcategory" => Some(Grouping::Subcategory),
            "owner_detail" => Some(Grouping::OwnerDetail),
            _ => None,
        }
    }
}

/// One aggregated row. Which of the optional fields are present depends
/// on the grouping.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodRow {
    /// The group label: a period like 2025年05月, a category, or an owner.
    pub period_name: String,
    /// Whether the row aggregates expenses or income.
    pub record_type: EntryKind,
    /// The owner, for groupings that split by owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// The category, for the subcategory and owner groupings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The subcategory, for the subcategory grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// How many entries fell into the group.
    pub count: u64,
    /// The summed amount.
    pub total_amount: f64,
}

// SQLite expression for the calendar quarter of account_date.
pub(crate) const QUARTER: &str = "((CAST(strftime('%m', account_date) AS INTEGER) + 2) / 3)";

/// Aggregate ledger entries into rows per `grouping`.
///
/// Time groupings come back newest period first; dimension groupings
/// (category, subcategory, owner) come back in ascending label order.
pub fn by_period(
    connection: &Connection,
    grouping: Grouping,
    filter: &RangeFilter,
) -> Result<Vec<PeriodRow>, Error> {
    let (clause, params) = filter.where_clause();

    let query = match grouping {
        Grouping::Monthly => format!(
            "SELECT strftime('%Y', account_date) || '年' || strftime('%m', account_date)
                    || '月' AS period_name,
                record_type, owner, NULL, NULL, COUNT(*), COALESCE(SUM(amount), 0)
                FROM ledger_entry WHERE 1=1{clause}
                GROUP BY strftime('%Y%m', account_date), record_type, owner
                ORDER BY strftime('%Y%m', account_date) DESC, record_type, owner"
        ),
        Grouping::Quarterly => format!(
            "SELECT strftime('%Y', account_date) || '年第' || {QUARTER} || '季度' AS period_name,
                record_type, owner, NULL, NULL, COUNT(*), COALESCE(SUM(amount), 0)
                FROM ledger_entry WHERE 1=1{clause}
                GROUP BY strftime('%Y', account_date), {QUARTER}, record_type, owner
                ORDER BY strftime('%Y', account_date) || printf('%02d', {QUARTER}) DESC,
                    record_type, owner"
        ),
        Grouping::Yearly => format!(
            "SELECT strftime('%Y', account_date) || '年' AS period_name,
                record_type, owner, NULL, NULL, COUNT(*), COALESCE(SUM(amount), 0)
                FROM ledger_entry WHERE 1=1{clause}
                GROUP BY strftime('%Y', account_date), record_type, owner
                ORDER BY strftime('%Y', account_date) DESC, record_type, owner"
        ),
        Grouping::Category => format!(
            "SELECT category AS period_name,
                record_type, owner, NULL, NULL, COUNT(*), COALESCE(SUM(amount), 0)
                FROM ledger_entry WHERE 1=1{clause}
                GROUP BY category, record_type, owner
                ORDER BY category, record_type, owner"
        ),
        Grouping::Subcategory => format!(
            "SELECT category || '-' || subcategory AS period_name,
                record_type, owner, category, subcategory,
                COUNT(*), COALESCE(SUM(amount), 0)
                FROM ledger_entry WHERE 1=1{clause}
                GROUP BY category, subcategory, record_type, owner
                ORDER BY category, subcategory, record_type, owner"
        ),
        Grouping::OwnerDetail => format!(
            "SELECT owner AS period_name,
                record_type, NULL, category, NULL, COUNT(*), COALESCE(SUM(amount), 0)
                FROM ledger_entry WHERE 1=1{clause}
                GROUP BY owner, record_type, category
                ORDER BY owner, record_type, category"
        ),
    };

    let mut statement = connection.prepare(&query)?;
    let rows = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(PeriodRow {
                period_name: row.get(0)?,
                record_type: row.get(1)?,
                owner: row.get(2)?,
                category: row.get(3)?,
                subcategory: row.get(4)?,
                count: row.get(5)?,
                total_amount: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
