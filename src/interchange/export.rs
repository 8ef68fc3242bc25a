//! Endpoints that export ledger entries as CSV and serve the blank
//! import templates.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    audit::{self, db::record as record_log, models::Operation},
    auth::CurrentUser,
    interchange::fields,
    ledger::db::{self, LedgerFilter},
};

/// The ledger import template: the canonical header plus example rows.
pub(crate) const ACCOUNT_TEMPLATE: &str = "\
记录类型,类别,子类别,金额,日期,描述,支付方式,所属人
支出,食品酒水,午餐,20.00,2024-01-01,午餐费用,支付宝,郭宁
支出,衣服饰品,裤子,200.00,2024-01-02,,微信,李佳慧
收入,工资收入,工资,5000.00,2024-01-03,本月工资,银行卡,郭宁
";

/// The gift record import template. The required columns are marked with
/// an asterisk; the importer strips it before matching.
pub(crate) const GIFT_TEMPLATE: &str = "\
记录类型*,姓名*,金额*,事件*,日期*,回礼金额,回礼事件,回礼日期,备注,所属人
受礼记录,张三,500.00,结婚礼金,2024-01-01,0,,,同事结婚,郭宁
随礼记录,李四,300.00,生日礼物,2024-01-02,200,回礼,2024-02-01,,李佳慧
受礼记录,王五,1000.00,节日红包,2024-01-03,800,回礼红包,2024-02-02,春节红包,郭宁
";

const FILENAME_TIMESTAMP: &[BorrowedFormatItem] =
    format_description!("[year][month][day]_[hour][minute][second]");

/// A CSV file download. The filename stays ASCII so the header needs no
/// encoding gymnastics.
fn csv_attachment(filename: &str, data: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        data,
    )
        .into_response()
}

/// The query string for the ledger export endpoint. Absent filters and
/// "全部" match everything.
#[derive(Debug, Deserialize, Default)]
pub struct ExportQuery {
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
}

/// A handler that exports the matching ledger entries, newest first, as a
/// CSV download. With no matches the response is a failure message
/// instead of an empty file.
pub async fn export_ledger_entries(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, Error> {
    let start_date = query.start_date.clone().unwrap_or_default();
    let end_date = query.end_date.clone().unwrap_or_default();
    let filter = LedgerFilter {
        record_type: query.record_type,
        category: query.category,
        subcategory: query.subcategory,
        start_date: query.start_date,
        end_date: query.end_date,
        owner: query.owner,
    };

    let connection = state.db_connection.lock().unwrap();
    let entries = db::all(&connection, &filter)?;
    if entries.is_empty() {
        return Ok(Json(json!({
            "success": false,
            "message": "没有找到符合条件的记录",
        }))
        .into_response());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(fields::LEDGER_HEADERS)
        .map_err(|error| Error::InvalidCsv(error.to_string()))?;
    for entry in &entries {
        let amount = format!("{:.2}", entry.amount);
        writer
            .write_record([
                entry.record_type.as_str(),
                entry.category.as_str(),
                entry.subcategory.as_str(),
                amount.as_str(),
                entry.account_date.as_str(),
                entry.description.as_str(),
                entry.payment_method.as_str(),
                entry.owner.as_str(),
            ])
            .map_err(|error| Error::InvalidCsv(error.to_string()))?;
    }
    let data = writer
        .into_inner()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?;

    record_log(
        &connection,
        Operation::Export,
        &format!(
            "导出记账数据 - 记录数: {}, 日期范围: {} 至 {}",
            entries.len(),
            start_date,
            end_date
        ),
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    let timestamp = OffsetDateTime::now_utc()
        .format(FILENAME_TIMESTAMP)
        .unwrap_or_default();

    Ok(csv_attachment(&format!("ledger_export_{timestamp}.csv"), data))
}

/// A handler that serves the ledger import template.
pub async fn account_template() -> Response {
    csv_attachment(
        "account_import_template.csv",
        ACCOUNT_TEMPLATE.as_bytes().to_vec(),
    )
}

/// A handler that serves the gift record import template.
pub async fn gift_records_template() -> Response {
    csv_attachment(
        "gift_import_template.csv",
        GIFT_TEMPLATE.as_bytes().to_vec(),
    )
}

#[cfg(test)]
mod export_tests {
    use axum::{Extension, extract::{Query, State}, http::header};
    use rusqlite::Connection;

    use super::{ExportQuery, account_template, export_ledger_entries, gift_records_template};
    use crate::{
        AppState,
        app_state::app_state_tests::test_config,
        auth::CurrentUser,
        ledger::db::{insert, ledger_db_tests::{lunch_entry, salary_entry}},
    };

    fn test_state() -> AppState {
        let conn = Connection::open_in_memory().unwrap();
        AppState::new(conn, &test_config()).unwrap()
    }

    fn current_user() -> Extension<CurrentUser> {
        Extension(CurrentUser("admin".to_string()))
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn export_produces_a_csv_attachment() {
        let state = test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            insert(&connection, &lunch_entry()).unwrap();
            insert(&connection, &salary_entry()).unwrap();
        }

        let response = export_ledger_entries(
            State(state.clone()),
            current_user(),
            Query(ExportQuery::default()),
        )
        .await
        .unwrap();

        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"ledger_export_"));
        assert!(disposition.ends_with(".csv\""));

        let body = body_text(response).await;
        let mut lines = body.lines();
        assert_eq!(
            lines.next(),
            Some("记录类型,类别,子类别,金额,日期,描述,支付方式,所属人")
        );
        // Newest first.
        assert_eq!(
            lines.next(),
            Some("收入,工资收入,工资,8000.00,2025-05-10,五月工资,银行转账,李佳慧")
        );
        assert_eq!(
            lines.next(),
            Some("支出,食品酒水,午餐,35.50,2025-05-02,,现金,郭宁")
        );

        let connection = state.db_connection.lock().unwrap();
        let details: String = connection
            .query_row(
                "SELECT operation_details FROM audit_log
                    WHERE operation_type = 'EXPORT'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(details, "导出记账数据 - 记录数: 2, 日期范围:  至 ");
    }

    #[tokio::test]
    async fn export_respects_the_filters() {
        let state = test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            insert(&connection, &lunch_entry()).unwrap();
            insert(&connection, &salary_entry()).unwrap();
        }

        let response = export_ledger_entries(
            State(state),
            current_user(),
            Query(ExportQuery {
                record_type: Some("支出".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let body = body_text(response).await;
        assert!(body.contains("食品酒水"));
        assert!(!body.contains("工资收入"));
    }

    #[tokio::test]
    async fn export_without_matches_reports_failure() {
        let state = test_state();

        let response = export_ledger_entries(
            State(state),
            current_user(),
            Query(ExportQuery::default()),
        )
        .await
        .unwrap();

        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
        let body: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "没有找到符合条件的记录");
    }

    #[tokio::test]
    async fn templates_carry_the_import_headers() {
        let account = body_text(account_template().await).await;
        let gift = body_text(gift_records_template().await).await;

        assert!(account.starts_with("记录类型,类别,子类别,金额,日期,描述,支付方式,所属人\n"));
        assert!(gift.starts_with("记录类型*,姓名*,金额*,事件*,日期*,回礼金额,回礼事件,回礼日期,备注,所属人\n"));
    }
}
