//! Endpoints that import gift records and ledger entries from uploaded
//! CSV files.
//!
//! A bad row never aborts the batch: every row is counted as imported,
//! duplicate, or failed, and the response carries the counts plus up to
//! ten sample messages of each kind.

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
};
use serde_json::json;

use crate::{
    AppState, Error,
    audit::{self, db::record as record_log, models::Operation},
    auth::CurrentUser,
    gift::{
        self,
        models::{GiftKind, GiftRecord},
    },
    interchange::fields,
    ledger::{
        self,
        models::{EntryKind, LedgerEntry},
    },
};

/// Pull the uploaded CSV document out of the multipart form.
async fn read_csv_upload(multipart: &mut Multipart) -> Result<String, Error> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        if file_name.is_empty() {
            return Err(Error::InvalidField("没有选择文件".to_string()));
        }
        if !file_name.to_lowercase().ends_with(".csv") {
            return Err(Error::InvalidField("只支持CSV文件(.csv)".to_string()));
        }

        return field
            .text()
            .await
            .map_err(|error| Error::MultipartError(error.to_string()));
    }

    Err(Error::InvalidField("没有选择文件".to_string()))
}

/// Per-row accounting for one import run.
#[derive(Debug, Default)]
struct ImportTally {
    imported: u64,
    duplicates: u64,
    errors: u64,
    error_messages: Vec<String>,
    duplicate_messages: Vec<String>,
}

impl ImportTally {
    fn error(&mut self, row_number: usize, message: &str) {
        self.errors += 1;
        self.error_messages.push(format!("第{row_number}行: {message}"));
    }

    fn duplicate(&mut self, row_number: usize) {
        self.duplicates += 1;
        self.duplicate_messages
            .push(format!("第{row_number}行: 记录已存在，跳过导入"));
    }

    fn summary(&self) -> String {
        format!(
            "成功: {}条, 重复: {}条, 失败: {}条",
            self.imported, self.duplicates, self.errors
        )
    }

    fn into_json(self) -> serde_json::Value {
        let mut result = json!({
            "success": true,
            "message": format!(
                "导入完成！成功导入 {} 条记录，跳过 {} 条重复记录，失败 {} 条记录。",
                self.imported, self.duplicates, self.errors
            ),
            "imported_count": self.imported,
            "duplicate_count": self.duplicates,
            "error_count": self.errors,
        });

        // Only the first ten messages of each kind are returned.
        if !self.error_messages.is_empty() {
            result["error_messages"] =
                self.error_messages.into_iter().take(10).collect::<Vec<_>>().into();
        }
        if !self.duplicate_messages.is_empty() {
            result["duplicate_messages"] = self
                .duplicate_messages
                .into_iter()
                .take(10)
                .collect::<Vec<_>>()
                .into();
        }

        result
    }
}

/// A handler that imports gift records from an uploaded CSV file.
///
/// The header must carry 记录类型, 姓名, 金额, 事件, and 日期 (an asterisk
/// suffix is tolerated); the reciprocal columns and 备注/所属人 are
/// optional.
pub async fn import_gift_records(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, Error> {
    let csv_text = read_csv_upload(&mut multipart).await?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?
        .iter()
        .map(fields::clean_gift_header)
        .collect();

    let required = ["记录类型", "姓名", "金额", "事件", "日期"];
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !headers.iter().any(|header| header == name))
        .collect();
    if !missing.is_empty() {
        return Err(Error::InvalidField(fields::missing_columns_message(
            &missing, &required, &headers,
        )));
    }

    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| (header.as_str(), index))
        .collect();
    let fallback_owner = state.default_owners.first().cloned().unwrap_or_default();

    let mut tally = ImportTally::default();
    let connection = state.db_connection.lock().unwrap();

    for (index, row) in reader.records().enumerate() {
        // Data starts on line 2, after the header.
        let row_number = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(error) => {
                tally.error(row_number, &format!("处理错误 - {error}"));
                continue;
            }
        };
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |name: &str| {
            columns
                .get(name)
                .and_then(|&index| row.get(index))
                .unwrap_or("")
                .trim()
        };

        if required.iter().any(|name| cell(name).is_empty()) {
            tally.error(row_number, "缺少必要字段");
            continue;
        }

        let amount = match cell("金额").parse::<f64>() {
            Ok(amount) if amount > 0.0 => amount,
            Ok(_) => {
                tally.error(row_number, "金额必须大于0");
                continue;
            }
            Err(_) => {
                tally.error(row_number, &format!("金额格式错误 - {}", cell("金额")));
                continue;
            }
        };

        // An unparseable reciprocal amount falls back to zero, but an
        // explicitly negative one fails the row.
        let return_amount = match cell("回礼金额") {
            "" => 0.0,
            raw => match raw.parse::<f64>() {
                Ok(value) if value < 0.0 => {
                    tally.error(row_number, "回礼金额不能为负数");
                    continue;
                }
                Ok(value) => value,
                Err(_) => 0.0,
            },
        };

        let Some(date) = fields::parse_flexible_date(cell("日期")) else {
            tally.error(row_number, &format!("日期格式错误 - {}", cell("日期")));
            continue;
        };
        // The reciprocal date is optional and silently dropped when
        // unparseable.
        let return_date = fields::parse_flexible_date(cell("回礼日期")).unwrap_or_default();

        let Some(record_type) = GiftKind::parse(cell("记录类型")) else {
            tally.error(row_number, "记录类型必须是'受礼记录'或'随礼记录'");
            continue;
        };

        let owner = match cell("所属人") {
            "" => fallback_owner.clone(),
            owner => owner.to_string(),
        };

        let record = GiftRecord {
            id: None,
            record_type,
            name: cell("姓名").to_string(),
            amount,
            occasion: cell("事件").to_string(),
            date,
            has_returned: false,
            return_amount,
            return_occasion: cell("回礼事件").to_string(),
            return_date,
            remark: cell("备注").to_string(),
            owner,
        };

        match gift::db::is_duplicate(&connection, &record, None) {
            Ok(true) => {
                tally.duplicate(row_number);
                continue;
            }
            Ok(false) => {}
            Err(_) => {
                tally.error(row_number, "保存到数据库失败");
                continue;
            }
        }
        match gift::db::insert(&connection, &record) {
            Ok(_) => tally.imported += 1,
            Err(Error::DuplicateGiftRecord) => tally.duplicate(row_number),
            Err(_) => tally.error(row_number, "保存到数据库失败"),
        }
    }

    record_log(
        &connection,
        Operation::Import,
        &format!("导入礼尚往来记录 - {}", tally.summary()),
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok(Json(tally.into_json()))
}

/// A handler that imports ledger entries from an uploaded CSV file.
///
/// Column headers are matched through the synonym map, so documents
/// exported by other tools import without renaming. 记录类型, 类别,
/// 金额, and 日期 are required.
pub async fn import_ledger_entries(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, Error> {
    let csv_text = read_csv_upload(&mut multipart).await?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut columns: HashMap<&'static str, usize> = HashMap::new();
    for (index, header) in headers.iter().enumerate() {
        if let Some(standard) = fields::canonical_ledger_header(header) {
            columns.entry(standard).or_insert(index);
        }
    }

    let required = ["记录类型", "类别", "金额", "日期"];
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !columns.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(Error::InvalidField(fields::missing_columns_message(
            &missing, &required, &headers,
        )));
    }

    let fallback_owner = state.default_owners.first().cloned().unwrap_or_default();

    let mut tally = ImportTally::default();
    let connection = state.db_connection.lock().unwrap();

    for (index, row) in reader.records().enumerate() {
        let row_number = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(error) => {
                tally.error(row_number, &format!("处理错误 - {error}"));
                continue;
            }
        };
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |name: &str| {
            columns
                .get(name)
                .and_then(|&index| row.get(index))
                .unwrap_or("")
                .trim()
        };

        if required.iter().any(|name| cell(name).is_empty()) {
            tally.error(row_number, "缺少必要字段");
            continue;
        }

        let amount = match cell("金额").parse::<f64>() {
            Ok(amount) if amount > 0.0 => amount,
            Ok(_) => {
                tally.error(row_number, "金额必须大于0");
                continue;
            }
            Err(_) => {
                tally.error(row_number, &format!("金额格式错误 - {}", cell("金额")));
                continue;
            }
        };

        let Some(account_date) = fields::parse_flexible_date(cell("日期")) else {
            tally.error(row_number, &format!("日期格式错误 - {}", cell("日期")));
            continue;
        };

        let Some(record_type) = EntryKind::parse(cell("记录类型")) else {
            tally.error(row_number, "记录类型必须是'支出'或'收入'");
            continue;
        };

        let owner = match cell("所属人") {
            "" => fallback_owner.clone(),
            owner => owner.to_string(),
        };
        let payment_method = match cell("支付方式") {
            "" => "现金".to_string(),
            method => method.to_string(),
        };

        let entry = LedgerEntry {
            id: None,
            record_type,
            category: cell("类别").to_string(),
            subcategory: cell("子类别").to_string(),
            amount,
            account_date,
            description: cell("描述").to_string(),
            payment_method,
            owner,
        };

        match ledger::db::is_duplicate(&connection, &entry, None) {
            Ok(true) => {
                tally.duplicate(row_number);
                continue;
            }
            Ok(false) => {}
            Err(_) => {
                tally.error(row_number, "保存到数据库失败");
                continue;
            }
        }
        match ledger::db::insert(&connection, &entry) {
            Ok(_) => tally.imported += 1,
            Err(Error::DuplicateLedgerEntry) => tally.duplicate(row_number),
            Err(_) => tally.error(row_number, "保存到数据库失败"),
        }
    }

    record_log(
        &connection,
        Operation::Import,
        &format!("导入记账数据 - {}", tally.summary()),
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok(Json(tally.into_json()))
}

#[cfg(test)]
mod import_tests {
    use axum::{
        Extension, Json,
        extract::{FromRequest, Multipart, State},
        http::Request,
    };
    use rusqlite::Connection;

    use super::{import_gift_records, import_ledger_entries};
    use crate::{
        AppState, Error,
        app_state::app_state_tests::test_config,
        auth::CurrentUser,
        endpoints, gift,
        interchange::export::{ACCOUNT_TEMPLATE, GIFT_TEMPLATE},
        ledger::{self, db::LedgerFilter},
    };

    fn test_state() -> AppState {
        let conn = Connection::open_in_memory().unwrap();
        AppState::new(conn, &test_config()).unwrap()
    }

    fn current_user() -> Extension<CurrentUser> {
        Extension(CurrentUser("admin".to_string()))
    }

    async fn must_make_multipart_csv(uri: &str, file_name: &str, csv_text: &str) -> Multipart {
        let boundary = "MY_BOUNDARY123456789";
        let boundary_start = format!("--{boundary}");
        let boundary_end = format!("--{boundary}--");
        let content_disposition =
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"");

        let lines = [
            boundary_start.as_str(),
            content_disposition.as_str(),
            "Content-Type: text/csv",
            "",
            csv_text,
            boundary_end.as_str(),
        ];
        let data = lines.join("\r\n").into_bytes();

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(data.into())
            .unwrap();

        Multipart::from_request(request, &{}).await.unwrap()
    }

    async fn must_make_gift_upload(csv_text: &str) -> Multipart {
        must_make_multipart_csv(endpoints::GIFT_IMPORT, "records.csv", csv_text).await
    }

    async fn must_make_ledger_upload(csv_text: &str) -> Multipart {
        must_make_multipart_csv(endpoints::LEDGER_IMPORT, "ledger.csv", csv_text).await
    }

    #[tokio::test]
    async fn gift_import_counts_imported_duplicate_and_failed_rows() {
        let state = test_state();
        let csv = "记录类型*,姓名*,金额*,事件*,日期*,回礼金额,回礼事件,回礼日期,备注,所属人\n\
            受礼记录,张三,200,婚礼,2024-01-01,0,,,同事,郭宁\n\
            受礼记录,张三,200,婚礼,2024-01-01,0,,,同事,郭宁\n\
            随礼记录,李四,abc,满月酒,2024-02-01,,,,,\n\
            随礼记录,王五,300,生日,2024年3月5日,100,回礼,2024/4/1,,李佳慧\n";

        let Json(body) = import_gift_records(
            State(state.clone()),
            current_user(),
            must_make_gift_upload(csv).await,
        )
        .await
        .unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["imported_count"], 2);
        assert_eq!(body["duplicate_count"], 1);
        assert_eq!(body["error_count"], 1);
        assert_eq!(
            body["error_messages"][0],
            "第4行: 金额格式错误 - abc"
        );
        assert_eq!(
            body["duplicate_messages"][0],
            "第3行: 记录已存在，跳过导入"
        );

        let connection = state.db_connection.lock().unwrap();
        let records = gift::db::all(&connection).unwrap();
        assert_eq!(records.len(), 2);
        let wang = records.iter().find(|record| record.name == "王五").unwrap();
        assert_eq!(wang.date, "2024-03-05");
        assert_eq!(wang.return_date, "2024-04-01");
        assert!(wang.has_returned);
        let (operation, details): (String, String) = connection
            .query_row(
                "SELECT operation_type, operation_details FROM audit_log
                    ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(operation, "IMPORT");
        assert_eq!(details, "导入礼尚往来记录 - 成功: 2条, 重复: 1条, 失败: 1条");
    }

    #[tokio::test]
    async fn gift_import_requires_the_mandatory_columns() {
        let state = test_state();
        let csv = "记录类型,金额,事件,日期\n受礼记录,200,婚礼,2024-01-01\n";

        let result = import_gift_records(
            State(state),
            current_user(),
            must_make_gift_upload(csv).await,
        )
        .await;

        let Err(Error::InvalidField(message)) = result else {
            panic!("want missing-column error, got {result:?}");
        };
        assert!(message.contains("CSV文件缺少必要列: 姓名"), "got {message}");
    }

    #[tokio::test]
    async fn non_csv_uploads_are_rejected() {
        let state = test_state();
        let upload =
            must_make_multipart_csv(endpoints::GIFT_IMPORT, "records.xlsx", "not,a,csv").await;

        let result = import_gift_records(State(state), current_user(), upload).await;

        assert_eq!(
            result.unwrap_err(),
            Error::InvalidField("只支持CSV文件(.csv)".to_string())
        );
    }

    #[tokio::test]
    async fn ledger_import_accepts_synonym_headers_and_fills_defaults() {
        let state = test_state();
        let csv = "类型,分类,子分类,数额,时间,说明,付款方式,所有人\n\
            支出,食品酒水,午餐,35.5,2024/1/2,工作餐,,\n\
            收入,工资收入,工资,8000,2024-01-10,,银行转账,李佳慧\n\
            转账,其他,,10,2024-01-11,,,\n";

        let Json(body) = import_ledger_entries(
            State(state.clone()),
            current_user(),
            must_make_ledger_upload(csv).await,
        )
        .await
        .unwrap();

        assert_eq!(body["imported_count"], 2);
        assert_eq!(body["error_count"], 1);
        assert_eq!(
            body["error_messages"][0],
            "第4行: 记录类型必须是'支出'或'收入'"
        );

        let connection = state.db_connection.lock().unwrap();
        let entries = ledger::db::all(&connection, &LedgerFilter::default()).unwrap();
        assert_eq!(entries.len(), 2);
        let lunch = entries
            .iter()
            .find(|entry| entry.subcategory == "午餐")
            .unwrap();
        assert_eq!(lunch.account_date, "2024-01-02");
        assert_eq!(lunch.description, "工作餐");
        // Blank owner and payment method fall back to the defaults.
        assert_eq!(lunch.owner, "郭宁");
        assert_eq!(lunch.payment_method, "现金");
    }

    #[tokio::test]
    async fn ledger_import_skips_duplicates_and_empty_rows() {
        let state = test_state();
        let csv = "记录类型,类别,金额,日期\n\
            支出,食品酒水,35.5,2024-01-02\n\
            ,,,\n\
            支出,食品酒水,35.5,2024-01-02\n";

        let Json(body) = import_ledger_entries(
            State(state.clone()),
            current_user(),
            must_make_ledger_upload(csv).await,
        )
        .await
        .unwrap();

        assert_eq!(body["imported_count"], 1);
        assert_eq!(body["duplicate_count"], 1);
        assert_eq!(body["error_count"], 0);
        assert!(body.get("error_messages").is_none());

        let connection = state.db_connection.lock().unwrap();
        let entries = ledger::db::all(&connection, &LedgerFilter::default()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn blank_templates_import_cleanly() {
        let state = test_state();

        let Json(gift_body) = import_gift_records(
            State(state.clone()),
            current_user(),
            must_make_gift_upload(GIFT_TEMPLATE).await,
        )
        .await
        .unwrap();
        let Json(ledger_body) = import_ledger_entries(
            State(state.clone()),
            current_user(),
            must_make_ledger_upload(ACCOUNT_TEMPLATE).await,
        )
        .await
        .unwrap();

        assert_eq!(gift_body["imported_count"], 3, "got {gift_body}");
        assert_eq!(gift_body["error_count"], 0);
        assert_eq!(ledger_body["imported_count"], 3, "got {ledger_body}");
        assert_eq!(ledger_body["error_count"], 0);
    }
}
