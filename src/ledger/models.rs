//! Types for ledger entries.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::audit::models::RecordSnapshot;

/// Whether a ledger entry is money going out or coming in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EntryKind {
    /// Money spent.
    #[default]
    #[serde(rename = "支出")]
    Expense,
    /// Money received.
    #[serde(rename = "收入")]
    Income,
}

impl EntryKind {
    /// The label used on the wire and in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Expense => "支出",
            EntryKind::Income => "收入",
        }
    }

    /// Parse a label, e.g. from a CSV cell.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "支出" => Some(EntryKind::Expense),
            "收入" => Some(EntryKind::Income),
            _ => None,
        }
    }
}

impl ToSql for EntryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EntryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;

        EntryKind::parse(label).ok_or_else(|| {
            FromSqlError::Other(format!("unknown ledger entry type \"{label}\"").into())
        })
    }
}

/// A single ledger entry. The date is stored as "YYYY-MM-DD".
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LedgerEntry {
    /// The entry's database ID, `None` until it is saved.
    pub id: Option<i64>,
    /// Whether this is an expense or income.
    pub record_type: EntryKind,
    /// The category, e.g. 食品酒水.
    pub category: String,
    /// The subcategory, e.g. 早餐, possibly empty.
    pub subcategory: String,
    /// The amount in yuan.
    pub amount: f64,
    /// The date of the transaction as "YYYY-MM-DD".
    pub account_date: String,
    /// Free-form notes.
    pub description: String,
    /// How the money moved, e.g. 现金.
    pub payment_method: String,
    /// The household member the entry belongs to.
    pub owner: String,
}

impl LedgerEntry {
    /// The snapshot rendered into audit log entries about this entry.
    pub fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            record_type: Some(self.record_type.as_str().to_string()),
            owner: Some(self.owner.clone()),
            amount: Some(self.amount),
            remark: Some(self.description.clone()),
            ..Default::default()
        }
    }
}

/// Running totals over a set of ledger entries.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct LedgerTotals {
    /// How many entries there are.
    pub total_count: u64,
    /// The sum of all expense amounts.
    pub total_expense: f64,
    /// The sum of all income amounts.
    pub total_income: f64,
    /// Income minus expenses.
    pub net_amount: f64,
}

#[cfg(test)]
mod ledger_model_tests {
    use super::EntryKind;

    #[test]
    fn kind_labels_round_trip() {
        assert_eq!(EntryKind::parse("支出"), Some(EntryKind::Expense));
        assert_eq!(EntryKind::parse("收入"), Some(EntryKind::Income));
        assert_eq!(EntryKind::parse("转账"), None);
        assert_eq!(EntryKind::Income.as_str(), "收入");
    }
}
