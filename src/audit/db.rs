//! Database operations for the audit log.

use rusqlite::{Connection, types::Value};

use crate::{
    Error,
    audit::models::{LogEntry, Operation, RecordSnapshot},
};

/// How long log entries are kept before the sweep removes them.
const RETENTION_DAYS: i64 = 7;

pub(crate) fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                operation_type TEXT NOT NULL,
                operation_details TEXT NOT NULL,
                user_name TEXT NOT NULL,
                record_id INTEGER,
                ip_address TEXT NOT NULL,
                created_at TEXT NOT NULL
                    DEFAULT (strftime('%Y-%m-%d %H:%M:%S', 'now'))
                )",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_log_operation_type
                ON audit_log(operation_type)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_log_created_at ON audit_log(created_at)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_log_user_name ON audit_log(user_name)",
        (),
    )?;

    Ok(())
}

/// Append an entry to the audit log and sweep out entries older than the
/// retention window.
///
/// When `snapshot` is given, its rendering is appended to `details` so the
/// log entry stays readable after the record it describes is gone. The
/// sweep is best-effort: a failure there is logged and does not fail the
/// write. When the sweep removed anything, a SYSTEM entry records how many.
pub fn record(
    connection: &Connection,
    operation: Operation,
    details: &str,
    record_id: Option<i64>,
    user_name: &str,
    ip_address: &str,
    snapshot: Option<&RecordSnapshot>,
) -> Result<(), Error> {
    let details = match snapshot {
        Some(snapshot) => format!("{details}\n\n记录详情：\n{}", snapshot.render()),
        None => details.to_string(),
    };

    let transaction = connection.unchecked_transaction()?;

    transaction.execute(
        "INSERT INTO audit_log
            (operation_type, operation_details, user_name, record_id, ip_address)
            VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            operation.as_str(),
            &details,
            user_name,
            record_id,
            ip_address,
        ),
    )?;

    match transaction.execute(
        "DELETE FROM audit_log
            WHERE created_at < strftime('%Y-%m-%d %H:%M:%S', 'now', ?1)",
        [format!("-{RETENTION_DAYS} days")],
    ) {
        Ok(0) => {}
        Ok(deleted) => {
            tracing::info!("swept {deleted} audit log entries past retention");
            transaction.execute(
                "INSERT INTO audit_log
                    (operation_type, operation_details, user_name, ip_address)
                    VALUES (?1, ?2, ?3, ?4)",
                (
                    Operation::System.as_str(),
                    format!("自动清理日志 - 删除了{deleted}条一周前的旧日志"),
                    user_name,
                    ip_address,
                ),
            )?;
        }
        Err(error) => {
            tracing::warn!("audit log sweep failed: {error}");
        }
    }

    transaction.commit()?;

    Ok(())
}

/// Filters for searching the audit log. Empty or "全部" values match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// An operation code such as "ADD" to match exactly.
    pub operation_type: Option<String>,
    /// One of the preset labels 今天, 最近7天, 最近30天, 最近3个月.
    pub date_range: Option<String>,
    /// A substring to look for in the details or user name.
    pub keyword: Option<String>,
}

/// Search the audit log, newest first, returning the requested page and
/// the total match count.
pub fn search(
    connection: &Connection,
    filter: &LogFilter,
    page: u64,
    per_page: u64,
) -> Result<(Vec<LogEntry>, u64), Error> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(operation_type) = &filter.operation_type
        && !operation_type.is_empty()
        && operation_type != "全部"
    {
        clauses.push("operation_type = ?".to_string());
        params.push(Value::from(operation_type.clone()));
    }

    if let Some(date_range) = &filter.date_range {
        let since = match date_range.as_str() {
            "今天" => Some("date(created_at) = date('now')".to_string()),
            "最近7天" => {
                Some("created_at >= strftime('%Y-%m-%d %H:%M:%S', 'now', '-7 days')".to_string())
            }
            "最近30天" => {
                Some("created_at >= strftime('%Y-%m-%d %H:%M:%S', 'now', '-30 days')".to_string())
            }
            "最近3个月" => {
                Some("created_at >= strftime('%Y-%m-%d %H:%M:%S', 'now', '-3 months')".to_string())
            }
            _ => None,
        };
        if let Some(clause) = since {
            clauses.push(clause);
        }
    }

    if let Some(keyword) = &filter.keyword
        && !keyword.is_empty()
    {
        clauses.push("(operation_details LIKE ? OR user_name LIKE ?)".to_string());
        let pattern = format!("%{keyword}%");
        params.push(Value::from(pattern.clone()));
        params.push(Value::from(pattern));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let total: u64 = connection.query_row(
        &format!("SELECT COUNT(*) FROM audit_log{where_clause}"),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let mut statement = connection.prepare(&format!(
        "SELECT id, operation_type, operation_details, user_name, record_id,
                ip_address, created_at
            FROM audit_log{where_clause}
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?"
    ))?;
    params.push(Value::from(per_page as i64));
    params.push(Value::from((page.saturating_sub(1) * per_page) as i64));

    let entries = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(LogEntry {
                id: row.get(0)?,
                operation_type: row.get(1)?,
                operation_details: row.get(2)?,
                user_name: row.get(3)?,
                record_id: row.get(4)?,
                ip_address: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((entries, total))
}

#[cfg(test)]
mod audit_db_tests {
    use rusqlite::Connection;

    use super::{LogFilter, record, search};
    use crate::{
        audit::models::{Operation, RecordSnapshot},
        db::initialize,
    };

    fn init_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn record_then_search_round_trip() {
        let conn = init_db();

        record(
            &conn,
            Operation::Add,
            "添加受礼记录 - 张三",
            Some(7),
            "admin",
            "127.0.0.1",
            None,
        )
        .unwrap();

        let (entries, total) = search(&conn, &LogFilter::default(), 1, 20).unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].operation_type, "ADD");
        assert_eq!(entries[0].operation_details, "添加受礼记录 - 张三");
        assert_eq!(entries[0].record_id, Some(7));
        assert_eq!(entries[0].user_name, "admin");
    }

    #[test]
    fn snapshot_is_appended_to_details() {
        let conn = init_db();
        let snapshot = RecordSnapshot {
            record_type: Some("受礼记录".to_string()),
            name: Some("张三".to_string()),
            amount: Some(200.0),
            ..Default::default()
        };

        record(
            &conn,
            Operation::Delete,
            "删除受礼记录",
            Some(3),
            "admin",
            "127.0.0.1",
            Some(&snapshot),
        )
        .unwrap();

        let (entries, _) = search(&conn, &LogFilter::default(), 1, 20).unwrap();
        assert!(entries[0].operation_details.contains("记录详情："));
        assert!(entries[0].operation_details.contains("• 姓名：张三"));
        assert!(entries[0].operation_details.contains("• 金额：200元"));
    }

    #[test]
    fn old_entries_are_swept_and_the_sweep_is_logged() {
        let conn = init_db();
        conn.execute(
            "INSERT INTO audit_log
                (operation_type, operation_details, user_name, ip_address, created_at)
                VALUES ('ADD', '很久以前的记录', 'admin', '127.0.0.1',
                        strftime('%Y-%m-%d %H:%M:%S', 'now', '-10 days'))",
            (),
        )
        .unwrap();

        record(
            &conn,
            Operation::Login,
            "用户登录系统 - 用户名: admin",
            None,
            "admin",
            "127.0.0.1",
            None,
        )
        .unwrap();

        let (entries, total) = search(&conn, &LogFilter::default(), 1, 20).unwrap();
        assert_eq!(total, 2, "want login entry plus cleanup entry");
        assert!(
            entries
                .iter()
                .all(|entry| entry.operation_details != "很久以前的记录")
        );
        assert!(
            entries.iter().any(|entry| {
                entry.operation_type == "SYSTEM"
                    && entry.operation_details.contains("删除了1条一周前的旧日志")
            }),
            "want a cleanup entry, got {entries:?}"
        );
    }

    #[test]
    fn filters_narrow_the_results() {
        let conn = init_db();
        for (operation, details) in [
            (Operation::Add, "添加受礼记录 - 张三"),
            (Operation::Delete, "删除受礼记录 - 李四"),
            (Operation::Login, "用户登录系统 - 用户名: admin"),
        ] {
            record(&conn, operation, details, None, "admin", "127.0.0.1", None).unwrap();
        }

        let by_operation = LogFilter {
            operation_type: Some("DELETE".to_string()),
            ..Default::default()
        };
        let (entries, total) = search(&conn, &by_operation, 1, 20).unwrap();
        assert_eq!(total, 1);
        assert!(entries[0].operation_details.contains("李四"));

        let by_keyword = LogFilter {
            keyword: Some("张三".to_string()),
            ..Default::default()
        };
        let (_, total) = search(&conn, &by_keyword, 1, 20).unwrap();
        assert_eq!(total, 1);

        let catch_all = LogFilter {
            operation_type: Some("全部".to_string()),
            date_range: Some("最近7天".to_string()),
            ..Default::default()
        };
        let (_, total) = search(&conn, &catch_all, 1, 20).unwrap();
        assert_eq!(total, 3);
    }

    #[test]
    fn results_are_paged_newest_first() {
        let conn = init_db();
        for n in 0..5 {
            record(
                &conn,
                Operation::Add,
                &format!("记录 {n}"),
                None,
                "admin",
                "127.0.0.1",
                None,
            )
            .unwrap();
        }

        let (page_1, total) = search(&conn, &LogFilter::default(), 1, 2).unwrap();
        let (page_3, _) = search(&conn, &LogFilter::default(), 3, 2).unwrap();

        assert_eq!(total, 5);
        assert_eq!(page_1.len(), 2);
        assert_eq!(page_1[0].operation_details, "记录 4");
        assert_eq!(page_3.len(), 1);
        assert_eq!(page_3[0].operation_details, "记录 0");
    }
}
