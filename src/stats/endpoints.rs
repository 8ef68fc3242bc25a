//! Endpoints for the statistics pages.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    stats::{
        RangeFilter, calendar, charts, events, gifts,
        period::{self, Grouping},
        summary,
    },
};

/// A handler that returns the whole-ledger counts and totals.
pub async fn basic_statistics(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state.db_connection.lock().unwrap();
    let basic = connection.query_row(
        "SELECT COUNT(*),
            COALESCE(SUM(CASE WHEN record_type = '支出' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN record_type = '收入' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN record_type = '支出' THEN amount ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN record_type = '收入' THEN amount ELSE 0 END), 0)
            FROM ledger_entry",
        [],
        |row| {
            let total_expense: f64 = row.get(3)?;
            let total_income: f64 = row.get(4)?;

            Ok(json!({
                "total_count": row.get::<_, u64>(0)?,
                "expense_count": row.get::<_, u64>(1)?,
                "income_count": row.get::<_, u64>(2)?,
                "total_expense": total_expense,
                "total_income": total_income,
                "net_amount": total_income - total_expense,
            }))
        },
    )?;

    Ok(Json(json!({ "basic": basic })))
}

/// The query string shared by the range-based statistics endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct RangeQuery {
    /// The grouping, e.g. "monthly". Only the detailed endpoint reads it.
    #[serde(rename = "type")]
    pub stat_type: Option<String>,
    /// The earliest date to include.
    pub start_date: Option<String>,
    /// The latest date to include.
    pub end_date: Option<String>,
    /// A household member, or "全部".
    pub owner: Option<String>,
    /// "all", "monthly", "quarterly", or "yearly". Only the category
    /// chart endpoint reads it.
    pub time_range: Option<String>,
}

impl RangeQuery {
    fn filter(&self) -> RangeFilter {
        RangeFilter {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            owner: self.owner.clone(),
        }
        .or_last_year()
    }
}

/// A handler that returns grouped rows plus the summary block. The date
/// range defaults to the last year, the grouping to monthly.
pub async fn detailed_statistics(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let stat_type = query.stat_type.clone().unwrap_or_default();
    let grouping = Grouping::parse(&stat_type).unwrap_or(Grouping::Monthly);
    let filter = query.filter();

    let connection = state.db_connection.lock().unwrap();
    let statistics = period::by_period(&connection, grouping, &filter)?;
    let summary = summary::summarize(&connection, &filter)?;

    Ok(Json(json!({
        "statistics": statistics,
        "summary": summary,
        "filters": {
            "type": if stat_type.is_empty() { "monthly".to_string() } else { stat_type },
            "start_date": filter.start_date,
            "end_date": filter.end_date,
            "owner": query.owner.unwrap_or_else(|| "全部".to_string()),
        },
    })))
}

/// A handler that returns every chart series for the statistics page.
pub async fn chart_statistics(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<charts::ChartData>, Error> {
    let filter = query.filter();

    let connection = state.db_connection.lock().unwrap();
    let data = charts::chart_data(&connection, &filter, &state.default_owners)?;

    Ok(Json(data))
}

/// A handler that returns the per-category charts, overall or pivoted by
/// period depending on `time_range`.
pub async fn category_statistics(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<charts::CategoryCharts>, Error> {
    let time_range = query.time_range.clone().unwrap_or_else(|| "all".to_string());
    let filter = query.filter();

    let connection = state.db_connection.lock().unwrap();
    let data = charts::category_charts(&connection, &filter, &time_range)?;

    Ok(Json(data))
}

/// The query string for the subcategory statistics endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct SubcategoryQuery {
    /// A subcategory, or "全部".
    pub subcategory: Option<String>,
    /// A household member, or "全部".
    pub owner: Option<String>,
    /// The earliest date to include. Required.
    pub start_date: Option<String>,
    /// The latest date to include. Required.
    pub end_date: Option<String>,
}

/// A handler that sums one subcategory over a date range, with up to ten
/// of the matched entries for reference.
pub async fn subcategory_statistics(
    State(state): State<AppState>,
    Query(query): Query<SubcategoryQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let start_date = query.start_date.unwrap_or_default();
    let end_date = query.end_date.unwrap_or_default();
    if start_date.is_empty() || end_date.is_empty() {
        return Err(Error::InvalidField("开始日期和结束日期不能为空".to_string()));
    }

    let mut clause = String::new();
    let mut params: Vec<rusqlite::types::Value> = vec![start_date.into(), end_date.into()];
    if let Some(subcategory) = query.subcategory.filter(|value| value != "全部") {
        clause.push_str(" AND subcategory = ?");
        params.push(subcategory.into());
    }
    if let Some(owner) = query.owner.filter(|value| value != "全部") {
        clause.push_str(" AND owner = ?");
        params.push(owner.into());
    }

    let connection = state.db_connection.lock().unwrap();
    let (record_count, total_amount, expense_amount, income_amount) = connection.query_row(
        &format!(
            "SELECT COUNT(*), COALESCE(SUM(amount), 0),
                COALESCE(SUM(CASE WHEN record_type = '支出' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN record_type = '收入' THEN amount ELSE 0 END), 0)
                FROM ledger_entry
                WHERE account_date BETWEEN ?1 AND ?2{clause}"
        ),
        rusqlite::params_from_iter(params.iter()),
        |row| {
            Ok((
                row.get::<_, u64>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        },
    )?;

    let mut statement = connection.prepare(&format!(
        "SELECT record_type, category, subcategory, amount, account_date, owner
            FROM ledger_entry
            WHERE account_date BETWEEN ?1 AND ?2{clause}
            ORDER BY account_date DESC
            LIMIT 10"
    ))?;
    let detail_records = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(json!({
                "record_type": row.get::<_, String>(0)?,
                "category": row.get::<_, String>(1)?,
                "subcategory": row.get::<_, String>(2)?,
                "amount": row.get::<_, f64>(3)?,
                "account_date": row.get::<_, String>(4)?,
                "owner": row.get::<_, String>(5)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(json!({
        "success": true,
        "record_count": record_count,
        "total_amount": total_amount,
        "expense_amount": expense_amount,
        "income_amount": income_amount,
        "net_amount": income_amount - expense_amount,
        "detail_records": detail_records,
    })))
}

/// The query string for the calendar endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct CalendarQuery {
    /// The year, defaulting to the current one.
    pub year: Option<i32>,
    /// The month, defaulting to the current one.
    pub month: Option<u8>,
    /// A household member, or "全部".
    pub owner: Option<String>,
}

/// A handler that returns the month calendar of daily totals.
pub async fn calendar_view(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let today = OffsetDateTime::now_utc().date();
    let (year, month) = match (query.year, query.month) {
        (Some(year), Some(month)) => (year, month),
        _ => (today.year(), today.month() as u8),
    };
    let owner = query.owner.unwrap_or_else(|| "全部".to_string());

    let connection = state.db_connection.lock().unwrap();
    let calendar_data = calendar::month_calendar(&connection, year, month, &owner)?;
    let owners = calendar::ledger_owners(&connection)?;

    Ok(Json(json!({
        "success": true,
        "year": year,
        "month": month,
        "owners": owners,
        "selected_owner": owner,
        "calendar_data": calendar_data,
        "month_name": format!("{year}年{month:02}月"),
    })))
}

/// The query string for the event statistics endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct EventQuery {
    /// The event to look up, matched by substring.
    pub event_name: Option<String>,
}

/// A handler that sums the gifts tied to one event across the whole
/// gift book.
pub async fn event_statistics(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let event_name = query.event_name.unwrap_or_default().trim().to_string();
    if event_name.is_empty() {
        return Err(Error::InvalidField("事件名称不能为空".to_string()));
    }

    let connection = state.db_connection.lock().unwrap();
    let Some(stats) = events::event_stats(&connection, &event_name)? else {
        return Ok(Json(json!({
            "success": false,
            "message": format!("没有找到与\"{event_name}\"相关的记录"),
        })));
    };

    Ok(Json(json!({
        "success": true,
        "gift_amount": stats.gift_amount,
        "return_amount": stats.return_amount,
        "total_amount": stats.total_amount,
        "records_count": stats.related_records.len(),
        "related_records": stats.related_records,
    })))
}

/// The query string for the reciprocation statistics endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct ReturnQuery {
    /// The earliest date to include. Required.
    pub start_date: Option<String>,
    /// The latest date to include. Required.
    pub end_date: Option<String>,
    /// A household member, or "全部".
    pub owner: Option<String>,
}

/// A handler that lists and sums the reciprocated gifts in a date range.
pub async fn return_statistics(
    State(state): State<AppState>,
    Query(query): Query<ReturnQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let start_date = query.start_date.unwrap_or_default();
    let end_date = query.end_date.unwrap_or_default();
    if start_date.is_empty() || end_date.is_empty() {
        return Err(Error::InvalidField("请选择开始日期和结束日期".to_string()));
    }
    let owner = query.owner.unwrap_or_else(|| "全部".to_string());

    let connection = state.db_connection.lock().unwrap();
    let stats = events::return_stats(&connection, &start_date, &end_date, &owner)?;

    Ok(Json(json!({
        "success": true,
        "records_count": stats.records.len(),
        "total_amount": stats.total_amount,
        "records": stats.records,
        "query_params": {
            "start_date": start_date,
            "end_date": end_date,
            "owner": owner,
        },
    })))
}

/// A handler that returns the gift book overview.
pub async fn gift_statistics(
    State(state): State<AppState>,
) -> Result<Json<gifts::GiftOverview>, Error> {
    let connection = state.db_connection.lock().unwrap();
    let overview = gifts::overview(&connection, &state.default_owners)?;

    Ok(Json(overview))
}
