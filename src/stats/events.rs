//! Statistics over gift records tied to a named event, and over
//! reciprocated gifts in a date range.

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error,
    gift::{
        db::{RECORD_COLUMNS, map_record},
        models::{GiftKind, GiftRecord},
    },
};

/// The totals around one event, e.g. a wedding.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventStats {
    /// The summed amount of gifts received for the event.
    pub gift_amount: f64,
    /// The summed amount given back for the event.
    pub return_amount: f64,
    /// The two sums combined.
    pub total_amount: f64,
    /// The records the sums came from: received records whose occasion
    /// mentions the event, then given records whose reciprocal occasion
    /// does.
    pub related_records: Vec<GiftRecord>,
}

/// Collect the records and totals tied to `event_name`.
///
/// Matching is by substring, so "婚礼" also matches "张三婚礼". Returns
/// `Ok(None)` when nothing mentions the event.
pub fn event_stats(
    connection: &Connection,
    event_name: &str,
) -> Result<Option<EventStats>, Error> {
    let records = crate::gift::db::all(connection)?;

    let received: Vec<GiftRecord> = records
        .iter()
        .filter(|record| {
            record.record_type == GiftKind::Received && record.occasion.contains(event_name)
        })
        .cloned()
        .collect();
    let given: Vec<GiftRecord> = records
        .iter()
        .filter(|record| {
            record.record_type == GiftKind::Given
                && record.return_occasion.contains(event_name)
        })
        .cloned()
        .collect();

    if received.is_empty() && given.is_empty() {
        return Ok(None);
    }

    let gift_amount: f64 = received.iter().map(|record| record.amount).sum();
    let return_amount: f64 = given.iter().map(|record| record.return_amount).sum();

    let mut related_records = received;
    related_records.extend(given);

    Ok(Some(EventStats {
        gift_amount,
        return_amount,
        total_amount: gift_amount + return_amount,
        related_records,
    }))
}

/// The reciprocated gifts in a date range.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReturnStats {
    /// The summed outlay: the amount of given records plus the reciprocal
    /// amount of received records.
    pub total_amount: f64,
    /// The matching records, newest first.
    pub records: Vec<GiftRecord>,
}

/// Collect the records with a reciprocal occasion whose date falls in
/// `start_date..=end_date`, optionally narrowed to one owner.
pub fn return_stats(
    connection: &Connection,
    start_date: &str,
    end_date: &str,
    owner: &str,
) -> Result<ReturnStats, Error> {
    let mut query = format!(
        "SELECT {RECORD_COLUMNS} FROM gift_record
            WHERE date BETWEEN ?1 AND ?2 AND return_occasion != ''"
    );
    let mut params: Vec<rusqlite::types::Value> = vec![
        start_date.to_string().into(),
        end_date.to_string().into(),
    ];
    if !owner.is_empty() && owner != "全部" {
        query.push_str(" AND owner = ?3");
        params.push(owner.to_string().into());
    }
    query.push_str(" ORDER BY date DESC");

    let mut statement = connection.prepare(&query)?;
    let records = statement
        .query_map(rusqlite::params_from_iter(params.iter()), map_record)?
        .collect::<Result<Vec<GiftRecord>, _>>()?;

    let total_amount = records
        .iter()
        .map(|record| match record.record_type {
            GiftKind::Given => record.amount,
            GiftKind::Received => record.return_amount,
        })
        .sum();

    Ok(ReturnStats {
        total_amount,
        records,
    })
}

#[cfg(test)]
mod events_tests {
    use rusqlite::Connection;

    use super::{event_stats, return_stats};
    use crate::{
        db::initialize,
        gift::{
            db::insert,
            models::{GiftKind, GiftRecord, gift_model_tests::complete_record},
        },
    };

    fn seeded_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        // A received wedding gift, reciprocated at a housewarming.
        insert(&conn, &complete_record()).unwrap();
        // A given gift whose reciprocal occasion is the wedding.
        insert(
            &conn,
            &GiftRecord {
                record_type: GiftKind::Given,
                name: "李四".to_string(),
                amount: 500.0,
                occasion: "满月酒".to_string(),
                date: "2025-06-01".to_string(),
                return_amount: 150.0,
                return_occasion: "张三婚礼".to_string(),
                return_date: "2025-06-20".to_string(),
                ..complete_record()
            },
        )
        .unwrap();
        // Unrelated and unreciprocated.
        insert(
            &conn,
            &GiftRecord {
                name: "王五".to_string(),
                occasion: "生日".to_string(),
                date: "2025-07-01".to_string(),
                return_amount: 0.0,
                return_occasion: String::new(),
                return_date: String::new(),
                ..complete_record()
            },
        )
        .unwrap();

        conn
    }

    #[test]
    fn event_matches_occasions_by_substring() {
        let conn = seeded_db();

        let stats = event_stats(&conn, "婚礼").unwrap().unwrap();

        assert_eq!(stats.related_records.len(), 2);
        assert_eq!(stats.gift_amount, 200.0);
        assert_eq!(stats.return_amount, 150.0);
        assert_eq!(stats.total_amount, 350.0);
    }

    #[test]
    fn unknown_event_yields_none() {
        let conn = seeded_db();

        assert!(event_stats(&conn, "葬礼").unwrap().is_none());
    }

    #[test]
    fn return_stats_sum_depends_on_record_type() {
        let conn = seeded_db();

        let stats = return_stats(&conn, "2025-01-01", "2025-12-31", "全部").unwrap();

        // The given record counts its amount, the received one its
        // reciprocal amount. The unreciprocated record is excluded.
        assert_eq!(stats.records.len(), 2);
        assert_eq!(stats.total_amount, 500.0 + 300.0);
        assert_eq!(stats.records[0].date, "2025-06-01");
    }

    #[test]
    fn return_stats_respect_range_and_owner() {
        let conn = seeded_db();

        let out_of_range = return_stats(&conn, "2024-01-01", "2024-12-31", "全部").unwrap();
        assert!(out_of_range.records.is_empty());
        assert_eq!(out_of_range.total_amount, 0.0);

        let by_owner = return_stats(&conn, "2025-01-01", "2025-12-31", "郭宁").unwrap();
        assert_eq!(by_owner.records.len(), 2);
    }
}
