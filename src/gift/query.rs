//! In-memory sorting and status filtering for gift record listings.
//!
//! Sorting happens after the database query because two of the orders
//! (record type and name) depend on collation rules that are simpler to
//! express over the loaded records.

use std::cmp::Ordering;

use crate::gift::models::GiftRecord;

/// The orders a record listing can be sorted in, named as they appear in
/// the sort dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// 按记录类型排序: by record type, then date, both descending.
    #[default]
    ByKind,
    /// 按姓名首字母排序: by the counterparty's name, ascending.
    ByName,
    /// 按时间降序: newest first.
    ByDate,
    /// 按金额降序: largest amount first.
    ByAmount,
}

impl SortOrder {
    /// Parse a dropdown label, falling back to the default order.
    pub fn parse(label: &str) -> Self {
        match label {
            "按姓名首字母排序" => SortOrder::ByName,
            "按时间降序" => SortOrder::ByDate,
            "按金额降序" => SortOrder::ByAmount,
            _ => SortOrder::ByKind,
        }
    }
}

/// Sort `records` in place according to `order`.
///
/// Ties are broken by ID so the order is stable across requests.
pub fn sort_records(records: &mut [GiftRecord], order: SortOrder) {
    match order {
        SortOrder::ByKind => records.sort_by(|a, b| {
            (b.record_type.as_str(), &b.date)
                .cmp(&(a.record_type.as_str(), &a.date))
                .then(a.id.cmp(&b.id))
        }),
        SortOrder::ByName => {
            records.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)))
        }
        SortOrder::ByDate => {
            records.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)))
        }
        SortOrder::ByAmount => records.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        }),
    }
}

/// Keep only the records whose completion status matches `status`.
/// "全部" and empty keep everything.
pub fn filter_by_status(records: Vec<GiftRecord>, status: &str) -> Vec<GiftRecord> {
    if status.is_empty() || status == "全部" {
        return records;
    }

    records
        .into_iter()
        .filter(|record| record.completion_status() == status)
        .collect()
}
