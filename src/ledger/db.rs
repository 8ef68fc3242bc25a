//! Database operations for ledger entries.

use rusqlite::{Connection, OptionalExtension, Row, types::Value};

use crate::{
    Error,
    ledger::models::{LedgerEntry, LedgerTotals},
};

pub(crate) fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS ledger_entry (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_type TEXT NOT NULL,
                category TEXT NOT NULL,
                subcategory TEXT NOT NULL DEFAULT '',
                amount REAL NOT NULL,
                account_date TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                payment_method TEXT NOT NULL DEFAULT '现金',
                owner TEXT NOT NULL
                )",
        (),
    )?;
    // The natural key. Racing double-submits hit this constraint instead
    // of creating two identical rows.
    connection.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_entry_natural_key
                ON ledger_entry(record_type, category, subcategory, amount,
                                account_date, owner)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_ledger_entry_date ON ledger_entry(account_date)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_ledger_entry_category ON ledger_entry(category)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_ledger_entry_owner ON ledger_entry(owner)",
        (),
    )?;

    Ok(())
}

const ENTRY_COLUMNS: &str = "id, record_type, category, subcategory, amount, account_date,
        description, payment_method, owner";

fn map_entry(row: &Row) -> Result<LedgerEntry, rusqlite::Error> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        record_type: row.get(1)?,
        category: row.get(2)?,
        subcategory: row.get(3)?,
        amount: row.get(4)?,
        account_date: row.get(5)?,
        description: row.get(6)?,
        payment_method: row.get(7)?,
        owner: row.get(8)?,
    })
}

/// Insert a new ledger entry and return its ID.
pub fn insert(connection: &Connection, entry: &LedgerEntry) -> Result<i64, Error> {
    connection.execute(
        "INSERT INTO ledger_entry
            (record_type, category, subcategory, amount, account_date,
             description, payment_method, owner)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            entry.record_type,
            &entry.category,
            &entry.subcategory,
            entry.amount,
            &entry.account_date,
            &entry.description,
            &entry.payment_method,
            &entry.owner,
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Overwrite the ledger entry with ID `id`.
///
/// # Errors
/// Returns [Error::NotFound] if no entry has that ID.
pub fn update(connection: &Connection, id: i64, entry: &LedgerEntry) -> Result<(), Error> {
    let updated = connection.execute(
        "UPDATE ledger_entry
            SET record_type = ?1, category = ?2, subcategory = ?3, amount = ?4,
                account_date = ?5, description = ?6, payment_method = ?7, owner = ?8
            WHERE id = ?9",
        (
            entry.record_type,
            &entry.category,
            &entry.subcategory,
            entry.amount,
            &entry.account_date,
            &entry.description,
            &entry.payment_method,
            &entry.owner,
            id,
        ),
    )?;

    if updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the ledger entry with ID `id`, if it exists.
pub fn get(connection: &Connection, id: i64) -> Result<Option<LedgerEntry>, Error> {
    let entry = connection
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM ledger_entry WHERE id = :id"),
            &[(":id", &id)],
            map_entry,
        )
        .optional()?;

    Ok(entry)
}

/// Delete the ledger entry with ID `id`, returning the deleted entry so
/// the caller can log it. Deleting a missing ID is not an error.
pub fn delete(connection: &Connection, id: i64) -> Result<Option<LedgerEntry>, Error> {
    let entry = get(connection, id)?;

    connection.execute("DELETE FROM ledger_entry WHERE id = :id", &[(":id", &id)])?;

    Ok(entry)
}

/// Whether an entry with the same natural key (type, category,
/// subcategory, amount, date, owner) already exists. `exclude_id` lets
/// updates skip the entry being updated.
pub fn is_duplicate(
    connection: &Connection,
    entry: &LedgerEntry,
    exclude_id: Option<i64>,
) -> Result<bool, Error> {
    let mut query = "SELECT id FROM ledger_entry
            WHERE record_type = ? AND category = ? AND subcategory = ?
            AND amount = ? AND account_date = ? AND owner = ?"
        .to_string();
    let mut params: Vec<Value> = vec![
        Value::from(entry.record_type.as_str().to_string()),
        Value::from(entry.category.clone()),
        Value::from(entry.subcategory.clone()),
        Value::from(entry.amount),
        Value::from(entry.account_date.clone()),
        Value::from(entry.owner.clone()),
    ];

    if let Some(id) = exclude_id {
        query.push_str(" AND id != ?");
        params.push(Value::from(id));
    }

    let existing: Option<i64> = connection
        .query_row(&query, rusqlite::params_from_iter(params.iter()), |row| {
            row.get(0)
        })
        .optional()?;

    Ok(existing.is_some())
}

/// Field filters for searching ledger entries. "全部" and absent values
/// match everything; the date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    /// An entry type label to match exactly.
    pub record_type: Option<String>,
    /// A category to match exactly.
    pub category: Option<String>,
    /// A subcategory to match exactly.
    pub subcategory: Option<String>,
    /// The earliest date to include.
    pub start_date: Option<String>,
    /// The latest date to include.
    pub end_date: Option<String>,
    /// An owner to match exactly.
    pub owner: Option<String>,
}

impl LedgerFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clause = String::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(record_type) = &self.record_type
            && !record_type.is_empty()
            && record_type != "全部"
        {
            clause.push_str(" AND record_type = ?");
            params.push(Value::from(record_type.clone()));
        }
        if let Some(category) = &self.category
            && !category.is_empty()
            && category != "全部"
        {
            clause.push_str(" AND category = ?");
            params.push(Value::from(category.clone()));
        }
        if let Some(subcategory) = &self.subcategory
            && !subcategory.is_empty()
            && subcategory != "全部"
        {
            clause.push_str(" AND subcategory = ?");
            params.push(Value::from(subcategory.clone()));
        }
        if let Some(start_date) = self.start_date.as_deref().map(str::trim)
            && !start_date.is_empty()
        {
            clause.push_str(" AND account_date >= ?");
            params.push(Value::from(start_date.to_string()));
        }
        if let Some(end_date) = self.end_date.as_deref().map(str::trim)
            && !end_date.is_empty()
        {
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
}

/// The page of entries matching `filter`, newest first, along with the
/// total match count.
pub fn search(
    connection: &Connection,
    filter: &LedgerFilter,
    page: u64,
    per_page: u64,
) -> Result<(Vec<LedgerEntry>, u64), Error> {
    let (clause, mut params) = filter.where_clause();

    let total: u64 = connection.query_row(
        &format!("SELECT COUNT(*) FROM ledger_entry WHERE 1=1{clause}"),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let mut statement = connection.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM ledger_entry WHERE 1=1{clause}
            ORDER BY account_date DESC, id DESC
            LIMIT ? OFFSET ?"
    ))?;
    params.push(Value::from(per_page as i64));
    params.push(Value::from((page.saturating_sub(1) * per_page) as i64));

    let entries = statement
        .query_map(rusqlite::params_from_iter(params.iter()), map_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((entries, total))
}

/// All entries matching `filter`, newest first.
pub fn all(connection: &Connection, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, Error> {
    let (clause, params) = filter.where_clause();

    let mut statement = connection.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM ledger_entry WHERE 1=1{clause}
            ORDER BY account_date DESC, id DESC"
    ))?;

    let entries = statement
        .query_map(rusqlite::params_from_iter(params.iter()), map_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Entry count and expense/income totals over the entries matching
/// `filter`.
pub fn totals(connection: &Connection, filter: &LedgerFilter) -> Result<LedgerTotals, Error> {
    let (clause, params) = filter.where_clause();

    let (total_count, total_expense, total_income): (u64, f64, f64) = connection.query_row(
        &format!(
            "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN record_type = '支出' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN record_type = '收入' THEN amount ELSE 0 END), 0)
                FROM ledger_entry WHERE 1=1{clause}"
        ),
        rusqlite::params_from_iter(params.iter()),
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    Ok(LedgerTotals {
        total_count,
        total_expense,
        total_income,
        net_amount: total_income - total_expense,
    })
}

#[cfg(test)]
pub(crate) mod ledger_db_tests {
    use rusqlite::Connection;

    use super::{LedgerFilter, all, delete, get, insert, is_duplicate, search, totals, update};
    use crate::{
        Error,
        db::initialize,
        ledger::models::{EntryKind, LedgerEntry},
    };

    pub(crate) fn lunch_entry() -> LedgerEntry {
        LedgerEntry {
            id: None,
            record_type: EntryKind::Expense,
            category: "食品酒水".to_string(),
            subcategory: "午餐".to_string(),
            amount: 35.5,
            account_date: "2025-05-02".to_string(),
            description: String::new(),
            payment_method: "现金".to_string(),
            owner: "郭宁".to_string(),
        }
    }

    pub(crate) fn salary_entry() -> LedgerEntry {
        LedgerEntry {
            id: None,
            record_type: EntryKind::Income,
            category: "工资收入".to_string(),
            subcategory: "工资".to_string(),
            amount: 8000.0,
            account_date: "2025-05-10".to_string(),
            description: "五月工资".to_string(),
            payment_method: "银行转账".to_string(),
            owner: "李佳慧".to_string(),
        }
    }

    fn init_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_then_get_round_trip() {
        let conn = init_db();
        let entry = salary_entry();

        let id = insert(&conn, &entry).unwrap();
        let got = get(&conn, id).unwrap().unwrap();

        assert_eq!(
            got,
            LedgerEntry {
                id: Some(id),
                ..entry
            }
        );
    }

    #[test]
    fn update_overwrites_fields() {
        let conn = init_db();
        let id = insert(&conn, &lunch_entry()).unwrap();

        update(
            &conn,
            id,
            &LedgerEntry {
                amount: 42.0,
                description: "加了饮料".to_string(),
                ..lunch_entry()
            },
        )
        .unwrap();

        let got = get(&conn, id).unwrap().unwrap();
        assert_eq!(got.amount, 42.0);
        assert_eq!(got.description, "加了饮料");
    }

    #[test]
    fn update_missing_entry_is_not_found() {
        let conn = init_db();

        assert_eq!(update(&conn, 99, &lunch_entry()), Err(Error::NotFound));
    }

    #[test]
    fn delete_returns_the_deleted_entry() {
        let conn = init_db();
        let id = insert(&conn, &lunch_entry()).unwrap();

        let deleted = delete(&conn, id).unwrap().unwrap();

        assert_eq!(deleted.category, "食品酒水");
        assert!(get(&conn, id).unwrap().is_none());
        assert!(delete(&conn, id).unwrap().is_none());
    }

    #[test]
    fn identical_natural_key_is_rejected() {
        let conn = init_db();
        insert(&conn, &lunch_entry()).unwrap();

        assert_eq!(
            insert(&conn, &lunch_entry()),
            Err(Error::DuplicateLedgerEntry)
        );
    }

    #[test]
    fn is_duplicate_ignores_the_excluded_id() {
        let conn = init_db();
        let id = insert(&conn, &lunch_entry()).unwrap();

        assert!(is_duplicate(&conn, &lunch_entry(), None).unwrap());
        assert!(!is_duplicate(&conn, &lunch_entry(), Some(id)).unwrap());
    }

    #[test]
    fn search_filters_and_pages_newest_first() {
        let conn = init_db();
        insert(&conn, &lunch_entry()).unwrap();
        insert(&conn, &salary_entry()).unwrap();
        insert(
            &conn,
            &LedgerEntry {
                account_date: "2025-06-01".to_string(),
                ..lunch_entry()
            },
        )
        .unwrap();

        let (entries, total) = search(&conn, &LedgerFilter::default(), 1, 2).unwrap();
        assert_eq!(total, 3);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].account_date, "2025-06-01");

        let by_type = LedgerFilter {
            record_type: Some("收入".to_string()),
            ..Default::default()
        };
        let (entries, total) = search(&conn, &by_type, 1, 20).unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].category, "工资收入");

        let by_range = LedgerFilter {
            start_date: Some("2025-05-01".to_string()),
            end_date: Some("2025-05-31".to_string()),
            ..Default::default()
        };
        let (_, total) = search(&conn, &by_range, 1, 20).unwrap();
        assert_eq!(total, 2);

        assert_eq!(all(&conn, &LedgerFilter::default()).unwrap().len(), 3);
    }

    #[test]
    fn totals_split_expense_and_income() {
        let conn = init_db();
        insert(&conn, &lunch_entry()).unwrap();
        insert(&conn, &salary_entry()).unwrap();

        let totals = totals(&conn, &LedgerFilter::default()).unwrap();

        assert_eq!(totals.total_count, 2);
        assert_eq!(totals.total_expense, 35.5);
        assert_eq!(totals.total_income, 8000.0);
        assert_eq!(totals.net_amount, 8000.0 - 35.5);
    }
}
