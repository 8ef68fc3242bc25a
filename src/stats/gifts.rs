//! The overview statistics for the gift book.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::{Error, gift::models::GiftKind};

/// One member's side of the gift book.
///
/// Money flows both ways through both record types, so the received
/// total combines the amounts of received records with the reciprocal
/// amounts of given records, and the given total the other two fields.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct OwnerGiftStats {
    /// The member name.
    pub owner: String,
    /// How many received records the member has.
    pub gift_count: u64,
    /// How many given records the member has.
    pub return_count: u64,
    /// Everything the member received.
    pub total_gift_amount: f64,
    /// Everything the member gave.
    pub total_return_amount: f64,
}

/// The gift book overview.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct GiftOverview {
    /// How many records the book holds.
    pub total_count: u64,
    /// How many records are fully reciprocated.
    pub completed_count: u64,
    /// Per-member rows: the configured members first, then anyone else
    /// that appears on a record.
    pub by_owner: Vec<OwnerGiftStats>,
}

/// Compute the overview across the whole gift book. Records without an
/// owner count toward the first configured member.
pub fn overview(
    connection: &Connection,
    default_owners: &[String],
) -> Result<GiftOverview, Error> {
    let records = crate::gift::db::all(connection)?;

    let fallback_owner = default_owners.first().cloned().unwrap_or_default();
    let mut by_owner: BTreeMap<String, OwnerGiftStats> = BTreeMap::new();
    let mut completed_count = 0;

    for record in &records {
        if record.completion_status() == "已完成" {
            completed_count += 1;
        }

        let owner = if record.owner.is_empty() {
            fallback_owner.clone()
        } else {
            record.owner.clone()
        };
        let stats = by_owner.entry(owner.clone()).or_insert(OwnerGiftStats {
            owner,
            ..Default::default()
        });

        match record.record_type {
            GiftKind::Received => {
                stats.gift_count += 1;
                stats.total_gift_amount += record.amount;
                stats.total_return_amount += record.return_amount;
            }
            GiftKind::Given => {
                stats.return_count += 1;
                stats.total_gift_amount += record.return_amount;
                stats.total_return_amount += record.amount;
            }
        }
    }

    // Configured members always get a row, in their configured order,
    // followed by anyone else alphabetically.
    let mut rows: Vec<OwnerGiftStats> = default_owners
        .iter()
        .map(|owner| {
            by_owner.remove(owner).unwrap_or(OwnerGiftStats {
                owner: owner.clone(),
                ..Default::default()
            })
        })
        .collect();
    rows.extend(by_owner.into_values());

    Ok(GiftOverview {
        total_count: records.len() as u64,
        completed_count,
        by_owner: rows,
    })
}

#[cfg(test)]
mod gifts_tests {
    use rusqlite::Connection;

    use super::overview;
    use crate::{
        db::initialize,
        gift::{
            db::insert,
            models::{GiftKind, GiftRecord, gift_model_tests::complete_record},
        },
    };

    fn defaults() -> Vec<String> {
        vec!["郭宁".to_string(), "李佳慧".to_string()]
    }

    fn seeded_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        // Fully reciprocated, received by 郭宁: 200 in, 300 back out.
        insert(&conn, &complete_record()).unwrap();
        // Given by 李佳慧, reciprocated: 500 out, 150 back in.
        insert(
            &conn,
            &GiftRecord {
                record_type: GiftKind::Given,
                name: "李四".to_string(),
                amount: 500.0,
                occasion: "满月酒".to_string(),
                date: "2025-06-01".to_string(),
                return_amount: 150.0,
                return_occasion: "回礼".to_string(),
                return_date: "2025-06-20".to_string(),
                owner: "李佳慧".to_string(),
                ..complete_record()
            },
        )
        .unwrap();
        // Received by 王叔叔, not reciprocated.
        insert(
            &conn,
            &GiftRecord {
                name: "王五".to_string(),
                date: "2025-07-01".to_string(),
                return_amount: 0.0,
                return_occasion: String::new(),
                return_date: String::new(),
                owner: "王叔叔".to_string(),
                ..complete_record()
            },
        )
        .unwrap();

        conn
    }

    #[test]
    fn totals_cross_the_record_types() {
        let conn = seeded_db();

        let stats = overview(&conn, &defaults()).unwrap();

        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.completed_count, 2);

        let first = &stats.by_owner[0];
        assert_eq!(first.owner, "郭宁");
        assert_eq!(first.gift_count, 1);
        assert_eq!(first.total_gift_amount, 200.0);
        assert_eq!(first.total_return_amount, 300.0);

        let second = &stats.by_owner[1];
        assert_eq!(second.owner, "李佳慧");
        assert_eq!(second.return_count, 1);
        assert_eq!(second.total_gift_amount, 150.0);
        assert_eq!(second.total_return_amount, 500.0);
    }

    #[test]
    fn extra_owners_follow_the_configured_ones() {
        let conn = seeded_db();

        let stats = overview(&conn, &defaults()).unwrap();

        assert_eq!(stats.by_owner.len(), 3);
        assert_eq!(stats.by_owner[2].owner, "王叔叔");
        assert_eq!(stats.by_owner[2].gift_count, 1);
    }

    #[test]
    fn configured_members_always_get_a_row() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let stats = overview(&conn, &defaults()).unwrap();

        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.by_owner.len(), 2);
        assert_eq!(stats.by_owner[0].owner, "郭宁");
    }
}
