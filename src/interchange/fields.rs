//! Header recognition and cell parsing shared by the importers.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

/// The canonical ledger column names, in export/template order.
pub(crate) const LEDGER_HEADERS: [&str; 8] = [
    "记录类型",
    "类别",
    "子类别",
    "金额",
    "日期",
    "描述",
    "支付方式",
    "所属人",
];

/// Map a ledger column header to its canonical name. Spreadsheets exported
/// by other tools use a handful of synonyms, so those are accepted too.
pub(crate) fn canonical_ledger_header(header: &str) -> Option<&'static str> {
    match header {
        "记录类型" | "类型" | "收支类型" | "record_type" => Some("记录类型"),
        "类别" | "分类" | "category" => Some("类别"),
        "子类别" | "子分类" | "subcategory" => Some("子类别"),
        "金额" | "数额" | "money" | "amount" => Some("金额"),
        "日期" | "时间" | "date" | "account_date" => Some("日期"),
        "描述" | "备注" | "说明" | "description" | "remark" => Some("描述"),
        "支付方式" | "付款方式" | "支付方法" | "payment_method" => Some("支付方式"),
        "所属人" | "所有人" | "负责人" | "owner" => Some("所属人"),
        _ => None,
    }
}

/// Normalize a gift column header: templates mark required columns with an
/// asterisk, which must not affect matching.
pub(crate) fn clean_gift_header(header: &str) -> String {
    header.replace('*', "").trim().to_string()
}

/// The message shown when an uploaded document lacks required columns.
pub(crate) fn missing_columns_message(
    missing: &[&str],
    required: &[&str],
    headers: &[String],
) -> String {
    format!(
        "CSV文件缺少必要列: {}。请确保包含以下列: {}。实际表头: {}",
        missing.join(", "),
        required.join(", "),
        headers.join(", ")
    )
}

const DATE_OUTPUT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Parse a date cell in any of the accepted formats and normalize it to
/// "YYYY-MM-DD". Single-digit months and days are accepted.
pub(crate) fn parse_flexible_date(value: &str) -> Option<String> {
    let formats: [&[BorrowedFormatItem]; 4] = [
        format_description!("[year]-[month padding:none]-[day padding:none]"),
        format_description!("[year]/[month padding:none]/[day padding:none]"),
        format_description!("[year].[month padding:none].[day padding:none]"),
        format_description!("[year]年[month padding:none]月[day padding:none]日"),
    ];

    let value = value.trim();
    for format in formats {
        if let Ok(date) = Date::parse(value, format) {
            return date.format(&DATE_OUTPUT).ok();
        }
    }

    None
}

#[cfg(test)]
mod fields_tests {
    use super::{
        canonical_ledger_header, clean_gift_header, missing_columns_message, parse_flexible_date,
    };

    #[test]
    fn ledger_header_synonyms_map_to_canonical_names() {
        assert_eq!(canonical_ledger_header("记录类型"), Some("记录类型"));
        assert_eq!(canonical_ledger_header("收支类型"), Some("记录类型"));
        assert_eq!(canonical_ledger_header("分类"), Some("类别"));
        assert_eq!(canonical_ledger_header("数额"), Some("金额"));
        assert_eq!(canonical_ledger_header("amount"), Some("金额"));
        assert_eq!(canonical_ledger_header("时间"), Some("日期"));
        assert_eq!(canonical_ledger_header("付款方式"), Some("支付方式"));
        assert_eq!(canonical_ledger_header("负责人"), Some("所属人"));
        assert_eq!(canonical_ledger_header("别的列"), None);
    }

    #[test]
    fn gift_headers_lose_asterisks_and_whitespace() {
        assert_eq!(clean_gift_header("姓名*"), "姓名");
        assert_eq!(clean_gift_header(" *金额* "), "金额");
        assert_eq!(clean_gift_header("备注"), "备注");
    }

    #[test]
    fn accepted_date_formats_normalize_to_iso() {
        for value in ["2024-01-05", "2024/01/05", "2024.1.5", "2024年1月5日"] {
            assert_eq!(
                parse_flexible_date(value).as_deref(),
                Some("2024-01-05"),
                "want 2024-01-05 from {value}"
            );
        }
    }

    #[test]
    fn unparseable_dates_are_rejected() {
        assert_eq!(parse_flexible_date("昨天"), None);
        assert_eq!(parse_flexible_date("2024-13-01"), None);
        assert_eq!(parse_flexible_date(""), None);
    }

    #[test]
    fn missing_columns_message_lists_everything() {
        let message = missing_columns_message(
            &["姓名"],
            &["记录类型", "姓名"],
            &["记录类型".to_string(), "金额".to_string()],
        );

        assert_eq!(
            message,
            "CSV文件缺少必要列: 姓名。请确保包含以下列: 记录类型, 姓名。实际表头: 记录类型, 金额"
        );
    }
}
