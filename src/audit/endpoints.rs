//! The endpoint for browsing the audit log.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    audit::db::{LogFilter, search},
    pagination::{PageQuery, page_count},
};

/// The query string for the log list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct LogListQuery {
    /// The 1-indexed page number.
    pub page: Option<u64>,
    /// The number of entries per page.
    pub per_page: Option<u64>,
    /// An operation code such as "ADD", or "全部" for all.
    pub operation_type: Option<String>,
    /// A preset label such as "最近7天", or "全部" for all.
    pub date_range: Option<String>,
    /// A substring to look for in the details or user name.
    pub keyword: Option<String>,
}

/// A handler that lists audit log entries, newest first, with optional
/// filters on operation type, date range, and keyword.
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogListQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let (page, per_page) = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&state.pagination_config);
    let filter = LogFilter {
        operation_type: query.operation_type,
        date_range: query.date_range,
        keyword: query.keyword,
    };

    let connection = state.db_connection.lock().unwrap();
    let (logs, total) = search(&connection, &filter, page, per_page)?;

    Ok(Json(json!({
        "logs": logs,
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": page_count(total, per_page),
    })))
}
