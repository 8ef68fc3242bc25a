//! The household member ("owner") list.
//!
//! The visible list is the union of the configured defaults, every owner
//! that appears on a gift or ledger record, and an explicitly persisted
//! list. Deleting an owner only touches the persisted list, so members
//! that still appear on records (or are configured defaults) cannot be
//! made to vanish.

use std::collections::BTreeSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    audit::{self, db::record as record_log, models::Operation},
    auth::CurrentUser,
};

pub(crate) fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS owner (name TEXT PRIMARY KEY)",
        (),
    )?;

    Ok(())
}

fn distinct_owners(connection: &Connection, table: &str) -> Result<Vec<String>, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT DISTINCT owner FROM {table} WHERE owner != ''"
    ))?;
    let owners = statement
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(owners)
}

fn persisted_owners(connection: &Connection) -> Result<Vec<String>, Error> {
    let mut statement = connection.prepare("SELECT name FROM owner")?;
    let owners = statement
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(owners)
}

/// The full owner list: defaults, record owners, and the persisted list,
/// deduplicated and sorted.
pub fn all(connection: &Connection, defaults: &[String]) -> Result<Vec<String>, Error> {
    let mut owners: BTreeSet<String> = defaults.iter().cloned().collect();

    owners.extend(distinct_owners(connection, "ledger_entry")?);
    owners.extend(distinct_owners(connection, "gift_record")?);
    owners.extend(persisted_owners(connection)?);

    Ok(owners.into_iter().collect())
}

/// Add `name` to the persisted owner list.
///
/// # Errors
/// Returns [Error::DuplicateOwner] if the name is already on the visible
/// list.
pub fn add(connection: &Connection, defaults: &[String], name: &str) -> Result<(), Error> {
    if all(connection, defaults)?.iter().any(|owner| owner == name) {
        return Err(Error::DuplicateOwner(name.to_string()));
    }

    connection.execute("INSERT INTO owner (name) VALUES (?1)", [name])?;

    Ok(())
}

/// Remove `name` from the persisted owner list.
///
/// # Errors
/// Returns [Error::NotFound] if the name is not on the persisted list.
/// Names that only appear on records cannot be removed this way.
pub fn remove(connection: &Connection, name: &str) -> Result<(), Error> {
    let removed = connection.execute("DELETE FROM owner WHERE name = ?1", [name])?;

    if removed == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// A handler that lists all owners.
pub async fn get_owners(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state.db_connection.lock().unwrap();
    let owners = all(&connection, &state.default_owners)?;

    Ok(Json(json!({ "owners": owners })))
}

/// The body of the add-owner endpoint.
#[derive(Debug, Deserialize)]
pub struct AddOwnerPayload {
    /// The name to add.
    pub owner: Option<String>,
}

/// A handler that adds an owner to the persisted list.
pub async fn add_owner(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Json(payload): Json<AddOwnerPayload>,
) -> Result<Json<serde_json::Value>, Error> {
    let name = payload.owner.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err(Error::InvalidField("所属人名称不能为空".to_string()));
    }

    let connection = state.db_connection.lock().unwrap();
    add(&connection, &state.default_owners, &name)?;
    record_log(
        &connection,
        Operation::System,
        &format!("添加所属人: {name}"),
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok(Json(json!({ "success": true, "message": "所属人添加成功" })))
}

/// A handler that removes an owner from the persisted list. Configured
/// defaults are protected.
pub async fn delete_owner(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, Error> {
    if state.default_owners.contains(&name) {
        return Err(Error::InvalidField("不能删除默认所属人".to_string()));
    }

    let connection = state.db_connection.lock().unwrap();
    if remove(&connection, &name).is_err() {
        return Err(Error::InvalidField("所属人不存在".to_string()));
    }
    record_log(
        &connection,
        Operation::System,
        &format!("删除所属人: {name}"),
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok(Json(json!({ "success": true, "message": "所属人删除成功" })))
}
