//! Endpoints for listing, searching, and editing ledger entries, and for
//! managing the category taxonomy.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    audit::{self, db::record as record_log, models::Operation},
    auth::CurrentUser,
    gift::endpoints::parse_amount,
    ledger::{
        category::{self, Category},
        db::{self, LedgerFilter},
        models::{EntryKind, LedgerEntry},
    },
    pagination::{PageQuery, page_count},
};

/// The query string for the entry list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    /// The 1-indexed page number.
    pub page: Option<u64>,
    /// The number of entries per page.
    pub per_page: Option<u64>,
}

fn listing_response(
    entries: Vec<LedgerEntry>,
    totals: crate::ledger::models::LedgerTotals,
    total: u64,
    page: u64,
    per_page: u64,
) -> serde_json::Value {
    json!({
        "records": entries,
        "pagination": {
            "total": total,
            "page": page,
            "per_page": per_page,
            "total_pages": page_count(total, per_page),
        },
        "stats": totals,
    })
}

/// A handler that lists ledger entries, newest first, with overall totals.
pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let (page, per_page) = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&state.pagination_config);

    let connection = state.db_connection.lock().unwrap();
    let filter = LedgerFilter::default();
    let (entries, total) = db::search(&connection, &filter, page, per_page)?;
    let totals = db::totals(&connection, &filter)?;

    Ok(Json(listing_response(entries, totals, total, page, per_page)))
}

/// The body of the entry search endpoint. Absent filters match
/// everything; the date bounds are inclusive.
#[derive(Debug, Deserialize, Default)]
pub struct SearchPayload {
    /// An entry type label, or "全部".
    pub record_type: Option<String>,
    /// A category, or "全部".
    pub category: Option<String>,
    /// A subcategory, or "全部".
    pub subcategory: Option<String>,
    /// The earliest date to include.
    pub start_date: Option<String>,
    /// The latest date to include.
    pub end_date: Option<String>,
    /// An owner, or "全部".
    pub owner: Option<String>,
    /// The 1-indexed page number.
    pub page: Option<u64>,
    /// The number of entries per page.
    pub per_page: Option<u64>,
}

/// A handler that searches ledger entries; the totals cover everything
/// that matched, not just the returned page.
pub async fn search_entries(
    State(state): State<AppState>,
    Json(payload): Json<SearchPayload>,
) -> Result<Json<serde_json::Value>, Error> {
    let (page, per_page) = PageQuery {
        page: payload.page,
        per_page: payload.per_page,
    }
    .resolve(&state.pagination_config);
    let filter = LedgerFilter {
        record_type: payload.record_type,
        category: payload.category,
        subcategory: payload.subcategory,
        start_date: payload.start_date,
        end_date: payload.end_date,
        owner: payload.owner,
    };

    let connection = state.db_connection.lock().unwrap();
    let (entries, total) = db::search(&connection, &filter, page, per_page)?;
    let totals = db::totals(&connection, &filter)?;

    Ok(Json(listing_response(entries, totals, total, page, per_page)))
}

/// The body of the add/update entry endpoints. Amounts may arrive as
/// JSON numbers or as strings.
#[derive(Debug, Deserialize, Default)]
pub struct EntryPayload {
    /// The entry type label, defaulting to 支出.
    pub record_type: Option<String>,
    /// The owner, defaulting to the first configured household member.
    pub owner: Option<String>,
    /// The category.
    pub category: Option<String>,
    /// The subcategory.
    pub subcategory: Option<String>,
    /// The amount.
    pub amount: Option<serde_json::Value>,
    /// The date as "YYYY-MM-DD".
    pub account_date: Option<String>,
    /// Free-form notes.
    pub description: Option<String>,
    /// How the money moved.
    pub payment_method: Option<String>,
}

impl EntryPayload {
    fn validate(self, default_owner: &str) -> Result<LedgerEntry, Error> {
        let category = self.category.unwrap_or_default().trim().to_string();
        if category.is_empty() {
            return Err(Error::InvalidField("类别不能为空".to_string()));
        }

        let amount = self
            .amount
            .as_ref()
            .and_then(parse_amount)
            .ok_or_else(|| Error::InvalidField("金额格式错误".to_string()))?;
        if amount <= 0.0 {
            return Err(Error::InvalidField("金额必须大于0".to_string()));
        }

        let account_date = self.account_date.unwrap_or_default().trim().to_string();
        if account_date.is_empty() {
            return Err(Error::InvalidField("日期不能为空".to_string()));
        }

        let record_type = self
            .record_type
            .as_deref()
            .and_then(EntryKind::parse)
            .unwrap_or_default();
        let owner = match self.owner.filter(|owner| !owner.trim().is_empty()) {
            Some(owner) => owner.trim().to_string(),
            None => default_owner.to_string(),
        };
        let payment_method = match self
            .payment_method
            .filter(|method| !method.trim().is_empty())
        {
            Some(method) => method.trim().to_string(),
            None => "现金".to_string(),
        };

        Ok(LedgerEntry {
            id: None,
            record_type,
            category,
            subcategory: self.subcategory.unwrap_or_default().trim().to_string(),
            amount,
            account_date,
            description: self.description.unwrap_or_default().trim().to_string(),
            payment_method,
            owner,
        })
    }
}

fn default_owner(state: &AppState) -> String {
    state.default_owners.first().cloned().unwrap_or_default()
}

/// A handler that adds a ledger entry.
pub async fn add_entry(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Json(payload): Json<EntryPayload>,
) -> Result<Json<serde_json::Value>, Error> {
    let entry = payload.validate(&default_owner(&state))?;

    let connection = state.db_connection.lock().unwrap();
    if db::is_duplicate(&connection, &entry, None)? {
        return Err(Error::DuplicateLedgerEntry);
    }

    let id = db::insert(&connection, &entry)?;
    record_log(
        &connection,
        Operation::Add,
        &format!(
            "添加记账记录 - 类别: {}, 金额: {}",
            entry.category, entry.amount
        ),
        Some(id),
        &username,
        audit::CLIENT_IP,
        Some(&entry.snapshot()),
    )?;

    Ok(Json(json!({ "success": true })))
}

/// A handler that updates the ledger entry with the given ID.
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<EntryPayload>,
) -> Result<Json<serde_json::Value>, Error> {
    let entry = payload.validate(&default_owner(&state))?;

    let connection = state.db_connection.lock().unwrap();
    if db::is_duplicate(&connection, &entry, Some(id))? {
        return Err(Error::DuplicateLedgerEntry);
    }

    db::update(&connection, id, &entry)?;
    record_log(
        &connection,
        Operation::Edit,
        &format!(
            "修改记账记录 - 类别: {}, 金额: {}",
            entry.category, entry.amount
        ),
        Some(id),
        &username,
        audit::CLIENT_IP,
        Some(&entry.snapshot()),
    )?;

    Ok(Json(json!({ "success": true })))
}

/// A handler that deletes the ledger entry with the given ID. Deleting an
/// entry that is already gone still reports success.
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state.db_connection.lock().unwrap();

    if let Some(entry) = db::delete(&connection, id)? {
        record_log(
            &connection,
            Operation::Delete,
            &format!(
                "删除记账记录 - 类别: {}, 金额: {}",
                entry.category, entry.amount
            ),
            Some(id),
            &username,
            audit::CLIENT_IP,
            Some(&entry.snapshot()),
        )?;
    }

    Ok(Json(json!({ "success": true })))
}

/// A handler that returns the category taxonomy, expenses first.
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = state.db_connection.lock().unwrap();

    Ok(Json(category::all(&connection)?))
}

/// The body of the category replace endpoint.
#[derive(Debug, Deserialize)]
pub struct ReplaceCategoriesPayload {
    /// The new taxonomy, in display order.
    pub categories: Vec<Category>,
}

/// A handler that replaces the whole category taxonomy.
pub async fn replace_categories(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Json(payload): Json<ReplaceCategoriesPayload>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state.db_connection.lock().unwrap();

    category::replace(&connection, &payload.categories)?;
    record_log(
        &connection,
        Operation::System,
        "更新记账类别",
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok(Json(json!({ "success": true, "message": "类别更新成功" })))
}

/// A handler that restores the default category taxonomy.
pub async fn reset_categories(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state.db_connection.lock().unwrap();

    category::reset(&connection)?;
    record_log(
        &connection,
        Operation::System,
        "重置记账类别为默认值",
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok(Json(json!({ "success": true, "message": "类别重置成功" })))
}
