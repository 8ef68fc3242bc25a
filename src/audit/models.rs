//! Types for audit log entries.

use serde::Serialize;

/// What kind of operation an audit log entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A record was created.
    Add,
    /// A record was modified.
    Edit,
    /// A record was deleted.
    Delete,
    /// Records were imported from a file.
    Import,
    /// Records were exported to a file.
    Export,
    /// A user logged in.
    Login,
    /// A user changed their password.
    PasswordChange,
    /// A password was reset through the security question flow.
    PasswordReset,
    /// Housekeeping and other system-initiated operations.
    System,
}

impl Operation {
    /// The code stored in the database and returned to clients.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "ADD",
            Operation::Edit => "EDIT",
            Operation::Delete => "DELETE",
            Operation::Import => "IMPORT",
            Operation::Export => "EXPORT",
            Operation::Login => "LOGIN",
            Operation::PasswordChange => "PASSWORD_CHANGE",
            Operation::PasswordReset => "PASSWORD_RESET",
            Operation::System => "SYSTEM",
        }
    }
}

/// A row from the audit log, in the shape clients expect.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogEntry {
    /// The row ID.
    pub id: i64,
    /// The operation code, e.g. "ADD".
    pub operation_type: String,
    /// The human-readable description, possibly with a record snapshot.
    pub operation_details: String,
    /// The user the operation is attributed to.
    pub user_name: String,
    /// The domain record the operation touched, if any.
    pub record_id: Option<i64>,
    /// Where the request came from.
    pub ip_address: String,
    /// When the entry was written, as "YYYY-MM-DD HH:MM:SS".
    pub created_at: String,
}

/// A point-in-time copy of a record's fields, rendered into the details
/// text of add/edit/delete log entries so the log stays meaningful after
/// the record itself changes or disappears.
///
/// All fields are optional; only the ones that are set (and non-empty)
/// appear in the rendering.
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot {
    /// The record type label, e.g. "受礼记录" or "支出".
    pub record_type: Option<String>,
    /// The household member the record belongs to.
    pub owner: Option<String>,
    /// The counterparty's name.
    pub name: Option<String>,
    /// The amount in yuan.
    pub amount: Option<f64>,
    /// The occasion of the gift or entry.
    pub occasion: Option<String>,
    /// The date of the gift or entry.
    pub date: Option<String>,
    /// The reciprocal gift amount, if any.
    pub return_amount: Option<f64>,
    /// The reciprocal gift occasion, if any.
    pub return_occasion: Option<String>,
    /// The reciprocal gift date, if any.
    pub return_date: Option<String>,
    /// Free-form notes.
    pub remark: Option<String>,
}

impl RecordSnapshot {
    /// Render the set fields as a bulleted block, one field per line.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if let Some(record_type) = &self.record_type {
            out.push_str(&format!("• 记录类型：{record_type}\n"));
        }
        if let Some(owner) = &self.owner {
            out.push_str(&format!("• 所属人：{owner}\n"));
        }
        if let Some(name) = &self.name {
            out.push_str(&format!("• 姓名：{name}\n"));
        }
        if let Some(amount) = self.amount {
            out.push_str(&format!("• 金额：{amount}元\n"));
        }
        if let Some(occasion) = &self.occasion {
            out.push_str(&format!("• 事件：{occasion}\n"));
        }
        if let Some(date) = &self.date {
            out.push_str(&format!("• 日期：{date}\n"));
        }
        if let Some(return_amount) = self.return_amount
            && return_amount > 0.0
        {
            out.push_str(&format!("• 回礼金额：{return_amount}元\n"));
        }
        if let Some(return_occasion) = &self.return_occasion
            && !return_occasion.is_empty()
        {
            out.push_str(&format!("• 回礼事件：{return_occasion}\n"));
        }
        if let Some(return_date) = &self.return_date
            && !return_date.is_empty()
        {
            out.push_str(&format!("• 回礼日期：{return_date}\n"));
        }
        if let Some(remark) = &self.remark
            && !remark.is_empty()
        {
            out.push_str(&format!("• 备注：{remark}\n"));
        }

        out
    }
}

#[cfg(test)]
mod snapshot_tests {
    use super::RecordSnapshot;

    #[test]
    fn render_includes_only_set_fields() {
        let snapshot = RecordSnapshot {
            record_type: Some("受礼记录".to_string()),
            owner: Some("郭宁".to_string()),
            name: Some("张三".to_string()),
            amount: Some(200.0),
            occasion: Some("婚礼".to_string()),
            date: Some("2025-05-01".to_string()),
            ..Default::default()
        };

        let rendered = snapshot.render();

        assert!(rendered.contains("• 记录类型：受礼记录\n"));
        assert!(rendered.contains("• 姓名：张三\n"));
        assert!(rendered.contains("• 金额：200元\n"));
        assert!(!rendered.contains("回礼"));
        assert!(!rendered.contains("备注"));
    }

    #[test]
    fn render_skips_zero_return_amount_and_empty_strings() {
        let snapshot = RecordSnapshot {
            return_amount: Some(0.0),
            return_occasion: Some(String::new()),
            remark: Some(String::new()),
            ..Default::default()
        };

        assert_eq!(snapshot.render(), "");
    }
}
