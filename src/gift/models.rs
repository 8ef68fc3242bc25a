//! Types for gift records.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::audit::models::RecordSnapshot;

/// Whether a gift was received from someone else or given to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GiftKind {
    /// Money received from someone for one of our occasions.
    #[default]
    #[serde(rename = "受礼记录")]
    Received,
    /// Money given to someone for one of their occasions.
    #[serde(rename = "随礼记录")]
    Given,
}

impl GiftKind {
    /// The label used on the wire and in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            GiftKind::Received => "受礼记录",
            GiftKind::Given => "随礼记录",
        }
    }

    /// Parse a label, e.g. from a CSV cell.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "受礼记录" => Some(GiftKind::Received),
            "随礼记录" => Some(GiftKind::Given),
            _ => None,
        }
    }
}

impl ToSql for GiftKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for GiftKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;

        GiftKind::parse(label).ok_or_else(|| {
            FromSqlError::Other(format!("unknown gift record type \"{label}\"").into())
        })
    }
}

/// A single gift record.
///
/// Dates are stored and compared as "YYYY-MM-DD" strings; the reciprocal
/// (`return_*`) fields are empty/zero until the gift is reciprocated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GiftRecord {
    /// The record's database ID, `None` until it is saved.
    pub id: Option<i64>,
    /// Whether the gift was received or given.
    pub record_type: GiftKind,
    /// The counterparty's name.
    pub name: String,
    /// The gift amount in yuan.
    pub amount: f64,
    /// The occasion, e.g. 婚礼.
    pub occasion: String,
    /// The date of the gift as "YYYY-MM-DD".
    pub date: String,
    /// Whether the reciprocal gift has happened. Derived from the
    /// `return_*` fields on every save.
    pub has_returned: bool,
    /// The reciprocal gift amount in yuan, 0 when not yet reciprocated.
    pub return_amount: f64,
    /// The occasion of the reciprocal gift.
    pub return_occasion: String,
    /// The date of the reciprocal gift as "YYYY-MM-DD".
    pub return_date: String,
    /// Free-form notes.
    pub remark: String,
    /// The household member the record belongs to.
    pub owner: String,
}

impl GiftRecord {
    /// Whether the base gift fields are all filled in.
    pub fn has_basic_info(&self) -> bool {
        !self.name.is_empty() && self.amount > 0.0 && !self.occasion.is_empty()
            && !self.date.is_empty()
    }

    /// Whether the reciprocal gift fields are all filled in.
    pub fn has_return_info(&self) -> bool {
        self.return_amount > 0.0
            && !self.return_occasion.is_empty()
            && !self.return_date.is_empty()
    }

    /// The record's completion status label.
    ///
    /// A record with both sides filled in is 已完成; one with only the
    /// base gift is 仅受礼 or 仅随礼 depending on its type; anything
    /// else is 未完成.
    pub fn completion_status(&self) -> &'static str {
        let one_sided = match self.record_type {
            GiftKind::Received => "仅受礼",
            GiftKind::Given => "仅随礼",
        };

        match (self.has_basic_info(), self.has_return_info()) {
            (true, true) => "已完成",
            (true, false) => one_sided,
            (false, _) => "未完成",
        }
    }

    /// The snapshot rendered into audit log entries about this record.
    pub fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            record_type: Some(self.record_type.as_str().to_string()),
            owner: Some(self.owner.clone()),
            name: Some(self.name.clone()),
            amount: Some(self.amount),
            occasion: Some(self.occasion.clone()),
            date: Some(self.date.clone()),
            return_amount: Some(self.return_amount),
            return_occasion: Some(self.return_occasion.clone()),
            return_date: Some(self.return_date.clone()),
            remark: Some(self.remark.clone()),
        }
    }
}

#[cfg(test)]
pub(crate) mod gift_model_tests {
    use super::{GiftKind, GiftRecord};

    pub(crate) fn complete_record() -> GiftRecord {
        GiftRecord {
            id: None,
            record_type: GiftKind::Received,
            name: "张三".to_string(),
            amount: 200.0,
            occasion: "婚礼".to_string(),
            date: "2025-05-01".to_string(),
            has_returned: true,
            return_amount: 300.0,
            return_occasion: "乔迁".to_string(),
            return_date: "2025-08-10".to_string(),
            remark: String::new(),
            owner: "郭宁".to_string(),
        }
    }

    #[test]
    fn fully_reciprocated_record_is_complete() {
        assert_eq!(complete_record().completion_status(), "已完成");
    }

    #[test]
    fn received_without_return_is_one_sided() {
        let record = GiftRecord {
            return_amount: 0.0,
            return_occasion: String::new(),
            return_date: String::new(),
            ..complete_record()
        };

        assert_eq!(record.completion_status(), "仅受礼");
    }

    #[test]
    fn given_without_return_is_one_sided() {
        let record = GiftRecord {
            record_type: GiftKind::Given,
            return_amount: 0.0,
            return_occasion: String::new(),
            return_date: String::new(),
            ..complete_record()
        };

        assert_eq!(record.completion_status(), "仅随礼");
    }

    #[test]
    fn missing_base_fields_mean_incomplete() {
        let record = GiftRecord {
            amount: 0.0,
            ..complete_record()
        };

        assert_eq!(record.completion_status(), "未完成");
    }

    #[test]
    fn partial_return_info_does_not_count() {
        let record = GiftRecord {
            return_amount: 300.0,
            return_occasion: String::new(),
            return_date: "2025-08-10".to_string(),
            ..complete_record()
        };

        assert_eq!(record.completion_status(), "仅受礼");
    }

    #[test]
    fn kind_labels_round_trip() {
        assert_eq!(GiftKind::parse("受礼记录"), Some(GiftKind::Received));
        assert_eq!(GiftKind::parse("随礼记录"), Some(GiftKind::Given));
        assert_eq!(GiftKind::parse("别的"), None);
        assert_eq!(GiftKind::Given.as_str(), "随礼记录");
    }
}
