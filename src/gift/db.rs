//! Database operations for gift records.

use rusqlite::{Connection, OptionalExtension, Row, types::Value};

use crate::{Error, gift::models::GiftRecord};

pub(crate) fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS gift_record (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_type TEXT NOT NULL,
                name TEXT NOT NULL,
                amount REAL NOT NULL,
                occasion TEXT NOT NULL,
                date TEXT NOT NULL,
                has_returned INTEGER NOT NULL DEFAULT 0,
                return_amount REAL NOT NULL DEFAULT 0,
                return_occasion TEXT NOT NULL DEFAULT '',
                return_date TEXT NOT NULL DEFAULT '',
                remark TEXT NOT NULL DEFAULT '',
                owner TEXT NOT NULL
                )",
        (),
    )?;
    // The natural key. Racing double-submits hit this constraint instead
    // of creating two identical rows.
    connection.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_gift_record_natural_key
                ON gift_record(record_type, name, amount, occasion, date, owner)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_gift_record_date ON gift_record(date)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_gift_record_name ON gift_record(name)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_gift_record_owner ON gift_record(owner)",
        (),
    )?;

    Ok(())
}

pub(crate) fn map_record(row: &Row) -> Result<GiftRecord, rusqlite::Error> {
    Ok(GiftRecord {
        id: row.get(0)?,
        record_type: row.get(1)?,
        name: row.get(2)?,
        amount: row.get(3)?,
        occasion: row.get(4)?,
        date: row.get(5)?,
        has_returned: row.get(6)?,
        return_amount: row.get(7)?,
        return_occasion: row.get(8)?,
        return_date: row.get(9)?,
        remark: row.get(10)?,
        owner: row.get(11)?,
    })
}

pub(crate) const RECORD_COLUMNS: &str = "id, record_type, name, amount, occasion, date, has_returned,
        return_amount, return_occasion, return_date, remark, owner";

/// Insert a new gift record and return its ID.
///
/// `has_returned` is derived from the reciprocal fields rather than taken
/// from the caller.
pub fn insert(connection: &Connection, record: &GiftRecord) -> Result<i64, Error> {
    connection.execute(
        "INSERT INTO gift_record
            (record_type, name, amount, occasion, date, has_returned,
             return_amount, return_occasion, return_date, remark, owner)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        (
            record.record_type,
            &record.name,
            record.amount,
            &record.occasion,
            &record.date,
            record.has_return_info(),
            record.return_amount,
            &record.return_occasion,
            &record.return_date,
            &record.remark,
            &record.owner,
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Overwrite the gift record with ID `id`.
///
/// # Errors
/// Returns [Error::NotFound] if no record has that ID.
pub fn update(connection: &Connection, id: i64, record: &GiftRecord) -> Result<(), Error> {
    let updated = connection.execute(
        "UPDATE gift_record
            SET record_type = ?1, name = ?2, amount = ?3, occasion = ?4, date = ?5,
                has_returned = ?6, return_amount = ?7, return_occasion = ?8,
                return_date = ?9, remark = ?10, owner = ?11
            WHERE id = ?12",
        (
            record.record_type,
            &record.name,
            record.amount,
            &record.occasion,
            &record.date,
            record.has_return_info(),
            record.return_amount,
            &record.return_occasion,
            &record.return_date,
            &record.remark,
            &record.owner,
            id,
        ),
    )?;

    if updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the gift record with ID `id`, if it exists.
pub fn get(connection: &Connection, id: i64) -> Result<Option<GiftRecord>, Error> {
    let record = connection
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM gift_record WHERE id = :id"),
            &[(":id", &id)],
            map_record,
        )
        .optional()?;

    Ok(record)
}

/// Delete the gift record with ID `id`, returning the deleted record so
/// the caller can log it. Deleting a missing ID is not an error.
pub fn delete(connection: &Connection, id: i64) -> Result<Option<GiftRecord>, Error> {
    let record = get(connection, id)?;

    connection.execute("DELETE FROM gift_record WHERE id = :id", &[(":id", &id)])?;

    Ok(record)
}

/// Whether a record with the same natural key (type, name, amount,
/// occasion, date, owner) already exists. `exclude_id` lets updates skip
/// the record being updated.
pub fn is_duplicate(
    connection: &Connection,
    record: &GiftRecord,
    exclude_id: Option<i64>,
) -> Result<bool, Error> {
    let mut query = "SELECT id FROM gift_record
            WHERE record_type = ? AND name = ? AND amount = ?
            AND occasion = ? AND date = ? AND owner = ?"
        .to_string();
    let mut params: Vec<Value> = vec![
        Value::from(record.record_type.as_str().to_string()),
        Value::from(record.name.clone()),
        Value::from(record.amount),
        Value::from(record.occasion.clone()),
        Value::from(record.date.clone()),
        Value::from(record.owner.clone()),
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

/// All gift records, in insertion order.
pub fn all(connection: &Connection) -> Result<Vec<GiftRecord>, Error> {
    let mut statement =
        connection.prepare(&format!("SELECT {RECORD_COLUMNS} FROM gift_record"))?;

    let records = statement
        .query_map([], map_record)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Field filters for searching gift records. "全部" and empty values
/// match everything; names match by substring, dates exactly.
#[derive(Debug, Clone, Default)]
pub struct GiftFilter {
    /// A record type label to match exactly.
    pub record_type: Option<String>,
    /// A substring of the counterparty's name.
    pub name: Option<String>,
    /// A date to match exactly.
    pub date: Option<String>,
    /// An owner to match exactly.
    pub owner: Option<String>,
}

/// The gift records matching `filter`, in insertion order.
pub fn search(connection: &Connection, filter: &GiftFilter) -> Result<Vec<GiftRecord>, Error> {
    let mut query = format!("SELECT {RECORD_COLUMNS} FROM gift_record WHERE 1=1");
    let mut params: Vec<Value> = Vec::new();

    if let Some(record_type) = &filter.record_type
        && !record_type.is_empty()
        && record_type != "全部"
    {
        query.push_str(" AND record_type = ?");
        params.push(Value::from(record_type.clone()));
    }
    if let Some(name) = &filter.name
        && !name.trim().is_empty()
    {
        query.push_str(" AND name LIKE ?");
        params.push(Value::from(format!("%{}%", name.trim())));
    }
    if let Some(date) = &filter.date
        && !date.trim().is_empty()
    {
        query.push_str(" AND date = ?");
        params.push(Value::from(date.trim().to_string()));
    }
    if let Some(owner) = &filter.owner
        && !owner.is_empty()
        && owner != "全部"
    {
        query.push_str(" AND owner = ?");
        params.push(Value::from(owner.clone()));
    }

    let mut statement = connection.prepare(&query)?;
    let records = statement
        .query_map(rusqlite::params_from_iter(params.iter()), map_record)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}
