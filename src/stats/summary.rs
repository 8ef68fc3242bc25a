//! Summary statistics over the ledger.

use rusqlite::Connection;
use serde::Serialize;

use crate::{Error, ledger::models::EntryKind, stats::RangeFilter};

/// The headline totals. Always zeroes rather than nulls when nothing
/// matched.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
pub struct SummaryTotals {
    /// How many entries matched.
    pub total_count: u64,
    /// The summed expense amount.
    pub total_expense: f64,
    /// The summed income amount.
    pub total_income: f64,
}

/// Per-owner expense/income totals.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OwnerRow {
    /// The owner.
    pub owner: String,
    /// How many entries the owner has.
    pub count: u64,
    /// The owner's summed expenses.
    pub expense: f64,
    /// The owner's summed income.
    pub income: f64,
}

/// Per-category totals.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryRow {
    /// Whether the category is expense or income.
    pub record_type: EntryKind,
    /// The category name.
    pub category: String,
    /// How many entries the category has.
    pub count: u64,
    /// The category's summed amount.
    pub total_amount: f64,
}

/// The summary block: headline totals, per-owner rows, and the ten
/// largest categories by amount.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct Summary {
    /// The headline totals.
    pub total: SummaryTotals,
    /// One row per owner.
    pub by_owner: Vec<OwnerRow>,
    /// The ten largest categories by summed amount.
    pub by_category: Vec<CategoryRow>,
}

/// Compute the summary block over the entries matching `filter`.
pub fn summarize(connection: &Connection, filter: &RangeFilter) -> Result<Summary, Error> {
    let (clause, params) = filter.where_clause();

    let total = connection.query_row(
        &format!(
            "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN record_type = '支出' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN record_type = '收入' THEN amount ELSE 0 END), 0)
                FROM ledger_entry WHERE 1=1{clause}"
        ),
        rusqlite::params_from_iter(params.iter()),
        |row| {
            Ok(SummaryTotals {
                total_count: row.get(0)?,
                total_expense: row.get(1)?,
                total_income: row.get(2)?,
            })
        },
    )?;

    let mut statement = connection.prepare(&format!(
        "SELECT owner, COUNT(*),
            COALESCE(SUM(CASE WHEN record_type = '支出' THEN amount ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN record_type = '收入' THEN amount ELSE 0 END), 0)
            FROM ledger_entry WHERE 1=1{clause}
            GROUP BY owner
            ORDER BY owner"
    ))?;
    let by_owner = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(OwnerRow {
                owner: row.get(0)?,
                count: row.get(1)?,
                expense: row.get(2)?,
                income: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut statement = connection.prepare(&format!(
        "SELECT record_type, category, COUNT(*), COALESCE(SUM(amount), 0) AS total_amount
            FROM ledger_entry WHERE 1=1{clause}
            GROUP BY record_type, category
            ORDER BY total_amount DESC
            LIMIT 10"
    ))?;
    let by_category = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(CategoryRow {
                record_type: row.get(0)?,
                category: row.get(1)?,
                count: row.get(2)?,
                total_amount: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Summary {
        total,
        by_owner,
        by_category,
    })
}
