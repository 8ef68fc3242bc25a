//! Endpoints for listing, searching, and editing gift records.

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
    gift::{
        db::{self, GiftFilter},
        models::{GiftKind, GiftRecord},
        query::{SortOrder, filter_by_status, sort_records},
    },
    pagination::{PageQuery, page_count, paginate},
};

/// The query string for the record list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    /// The 1-indexed page number.
    pub page: Option<u64>,
    /// The number of records per page.
    pub per_page: Option<u64>,
    /// The sort dropdown label, e.g. "按时间降序".
    pub sort_method: Option<String>,
}

/// A handler that lists gift records, sorted and paged.
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let (page, per_page) = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&state.pagination_config);
    let order = SortOrder::parse(query.sort_method.as_deref().unwrap_or_default());

    let connection = state.db_connection.lock().unwrap();
    let mut records = db::all(&connection)?;
    drop(connection);

    sort_records(&mut records, order);
    let total = records.len() as u64;

    Ok(Json(json!({
        "records": paginate(records, page, per_page),
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": page_count(total, per_page),
    })))
}

/// The body of the record search endpoint. Absent filters match
/// everything.
#[derive(Debug, Deserialize, Default)]
pub struct SearchPayload {
    /// A record type label, or "全部".
    pub record_type: Option<String>,
    /// A substring of the counterparty's name.
    pub name: Option<String>,
    /// A date to match exactly.
    pub date: Option<String>,
    /// An owner, or "全部".
    pub owner: Option<String>,
    /// A completion status label, or "全部".
    pub completion_status: Option<String>,
    /// The sort dropdown label.
    pub sort_method: Option<String>,
    /// The 1-indexed page number.
    pub page: Option<u64>,
    /// The number of records per page.
    pub per_page: Option<u64>,
}

/// A handler that searches gift records by field filters and completion
/// status, sorted and paged.
///
/// The field filters run in the database; the completion status is
/// derived, so it is filtered after loading.
pub async fn search_records(
    State(state): State<AppState>,
    Json(payload): Json<SearchPayload>,
) -> Result<Json<serde_json::Value>, Error> {
    let (page, per_page) = PageQuery {
        page: payload.page,
        per_page: payload.per_page,
    }
    .resolve(&state.pagination_config);
    let order = SortOrder::parse(payload.sort_method.as_deref().unwrap_or_default());
    let filter = GiftFilter {
        record_type: payload.record_type,
        name: payload.name,
        date: payload.date,
        owner: payload.owner,
    };

    let connection = state.db_connection.lock().unwrap();
    let records = db::search(&connection, &filter)?;
    drop(connection);

    let mut records = filter_by_status(
        records,
        payload.completion_status.as_deref().unwrap_or("全部"),
    );
    sort_records(&mut records, order);
    let total = records.len() as u64;

    Ok(Json(json!({
        "records": paginate(records, page, per_page),
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": page_count(total, per_page),
    })))
}

/// The body of the add/update record endpoints. Amounts may arrive as
/// JSON numbers or as strings.
#[derive(Debug, Deserialize, Default)]
pub struct RecordPayload {
    /// The record type label, defaulting to 受礼记录.
    pub record_type: Option<String>,
    /// The owner, defaulting to the first configured household member.
    pub owner: Option<String>,
    /// The counterparty's name.
    pub name: Option<String>,
    /// The gift amount.
    pub amount: Option<serde_json::Value>,
    /// The occasion.
    pub occasion: Option<String>,
    /// The date as "YYYY-MM-DD".
    pub date: Option<String>,
    /// The reciprocal gift amount.
    pub return_amount: Option<serde_json::Value>,
    /// The reciprocal gift occasion.
    pub return_occasion: Option<String>,
    /// The reciprocal gift date.
    pub return_date: Option<String>,
    /// Free-form notes.
    pub remark: Option<String>,
}

/// Read an amount that may be a JSON number or a numeric string.
pub(crate) fn parse_amount(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

impl RecordPayload {
    /// Validate the payload into a record, or the message to show the
    /// client.
    fn validate(self, default_owner: &str) -> Result<GiftRecord, Error> {
        let name = self.name.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidField("姓名不能为空".to_string()));
        }

        let amount = self
            .amount
            .as_ref()
            .and_then(parse_amount)
            .ok_or_else(|| Error::InvalidField("金额格式错误".to_string()))?;
        if amount <= 0.0 {
            return Err(Error::InvalidField("金额必须大于0".to_string()));
        }

        let occasion = self.occasion.unwrap_or_default().trim().to_string();
        if occasion.is_empty() {
            return Err(Error::InvalidField("事件不能为空".to_string()));
        }

        let date = self.date.unwrap_or_default().trim().to_string();
        if date.is_empty() {
            return Err(Error::InvalidField("日期不能为空".to_string()));
        }

        // An unparseable reciprocal amount falls back to zero, but an
        // explicitly negative one is rejected.
        let return_amount = self
            .return_amount
            .as_ref()
            .and_then(parse_amount)
            .unwrap_or(0.0);
        if return_amount < 0.0 {
            return Err(Error::InvalidField("回礼金额不能为负数".to_string()));
        }

        let record_type = self
            .record_type
            .as_deref()
            .and_then(GiftKind::parse)
            .unwrap_or_default();
        let owner = match self.owner.filter(|owner| !owner.trim().is_empty()) {
            Some(owner) => owner.trim().to_string(),
            None => default_owner.to_string(),
        };

        let mut record = GiftRecord {
            id: None,
            record_type,
            name,
            amount,
            occasion,
            date,
            has_returned: false,
            return_amount,
            return_occasion: self.return_occasion.unwrap_or_default().trim().to_string(),
            return_date: self.return_date.unwrap_or_default().trim().to_string(),
            remark: self.remark.unwrap_or_default().trim().to_string(),
            owner,
        };
        record.has_returned = record.has_return_info();

        Ok(record)
    }
}

fn default_owner(state: &AppState) -> String {
    state.default_owners.first().cloned().unwrap_or_default()
}

/// A handler that adds a gift record.
pub async fn add_record(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Json(payload): Json<RecordPayload>,
) -> Result<Json<serde_json::Value>, Error> {
    let record = payload.validate(&default_owner(&state))?;

    let connection = state.db_connection.lock().unwrap();
    if db::is_duplicate(&connection, &record, None)? {
        return Err(Error::DuplicateGiftRecord);
    }

    let id = db::insert(&connection, &record)?;
    record_log(
        &connection,
        Operation::Add,
        &format!("添加{}", record.record_type.as_str()),
        Some(id),
        &username,
        audit::CLIENT_IP,
        Some(&record.snapshot()),
    )?;

    Ok(Json(json!({ "success": true })))
}

/// A handler that updates the gift record with the given ID.
pub async fn update_record(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<RecordPayload>,
) -> Result<Json<serde_json::Value>, Error> {
    let record = payload.validate(&default_owner(&state))?;

    let connection = state.db_connection.lock().unwrap();
    if db::is_duplicate(&connection, &record, Some(id))? {
        return Err(Error::DuplicateGiftRecord);
    }

    db::update(&connection, id, &record)?;
    record_log(
        &connection,
        Operation::Edit,
        &format!("修改{}", record.record_type.as_str()),
        Some(id),
        &username,
        audit::CLIENT_IP,
        Some(&record.snapshot()),
    )?;

    Ok(Json(json!({ "success": true })))
}

/// A handler that deletes the gift record with the given ID. Deleting a
/// record that is already gone still reports success.
pub async fn delete_record(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state.db_connection.lock().unwrap();

    if let Some(record) = db::delete(&connection, id)? {
        record_log(
            &connection,
            Operation::Delete,
            &format!("删除{}", record.record_type.as_str()),
            Some(id),
            &username,
            audit::CLIENT_IP,
            Some(&record.snapshot()),
        )?;
    }

    Ok(Json(json!({ "success": true })))
}
