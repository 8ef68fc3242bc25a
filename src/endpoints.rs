//! The API endpoint URIs.

/// The route for logging in.
pub const LOGIN: &str = "/api/login";
/// The route for ending the current session.
pub const LOGOUT: &str = "/api/logout";
/// The route for the logged-in user's name and login time.
pub const USER_INFO: &str = "/api/user_info";
/// The first step of password recovery: look up the security question.
pub const FORGOT_PASSWORD_VERIFY_USER: &str = "/api/forgot_password/verify_user";
/// The second step of password recovery: check the security answer.
pub const FORGOT_PASSWORD_VERIFY_ANSWER: &str = "/api/forgot_password/verify_answer";
/// The final step of password recovery: set the new password.
pub const FORGOT_PASSWORD_RESET: &str = "/api/forgot_password/reset_password";
/// The route for changing the logged-in user's password.
pub const CHANGE_PASSWORD: &str = "/api/change_password";
/// The route for changing the security question and answer.
pub const CHANGE_SECURITY_QUESTION: &str = "/api/change_security_question";

/// The route for listing and adding gift records.
pub const GIFT_RECORDS: &str = "/api/records";
/// The route for updating or deleting a single gift record.
pub const GIFT_RECORD: &str = "/api/records/{record_id}";
/// The route for searching gift records.
pub const GIFT_RECORDS_SEARCH: &str = "/api/records/search";
/// The route for the gift book overview statistics.
pub const GIFT_STATISTICS: &str = "/api/statistics";
/// The route for the per-event gift statistics.
pub const EVENT_STATISTICS: &str = "/api/event_statistics";
/// The route for the reciprocated-gift statistics.
pub const RETURN_STATISTICS: &str = "/api/return_records/statistics";
/// The route for importing gift records from a CSV file.
pub const GIFT_IMPORT: &str = "/api/gift_records/import";
/// The route for the gift record import template.
pub const GIFT_TEMPLATE: &str = "/api/gift_records/template";

/// The route for listing and adding ledger entries.
pub const LEDGER_RECORDS: &str = "/api/account/records";
/// The route for updating or deleting a single ledger entry.
pub const LEDGER_RECORD: &str = "/api/account/records/{record_id}";
/// The route for searching ledger entries.
pub const LEDGER_RECORDS_SEARCH: &str = "/api/account/records/search";
/// The route for reading and replacing the category taxonomy.
pub const LEDGER_CATEGORIES: &str = "/api/account/categories";
/// The route for restoring the default category taxonomy.
pub const LEDGER_CATEGORIES_RESET: &str = "/api/account/categories/reset";
/// The route for the whole-ledger counts and totals.
pub const LEDGER_STATISTICS: &str = "/api/account/statistics";
/// The route for grouped statistics with a summary block.
pub const LEDGER_STATISTICS_DETAILED: &str = "/api/account/statistics/detailed";
/// The route for the chart series.
pub const LEDGER_STATISTICS_CHARTS: &str = "/api/account/statistics/charts";
/// The route for the per-category charts.
pub const LEDGER_STATISTICS_CATEGORIES: &str = "/api/account/statistics/categories";
/// The route for the single-subcategory statistics.
pub const LEDGER_STATISTICS_SUBCATEGORY: &str = "/api/account/statistics/subcategory";
/// The route for the month calendar of daily totals.
pub const LEDGER_CALENDAR: &str = "/api/account/calendar";
/// The route for importing ledger entries from a CSV file.
pub const LEDGER_IMPORT: &str = "/api/account/import";
/// The route for exporting ledger entries as CSV.
pub const LEDGER_EXPORT: &str = "/api/account/export";
/// The route for the ledger import template.
pub const LEDGER_TEMPLATE: &str = "/api/account/template";

/// The route for listing and adding owners.
pub const OWNERS: &str = "/api/owners";
/// The route for deleting a single owner.
pub const OWNER: &str = "/api/owners/{owner_name}";
/// The route for browsing the audit log.
pub const LOGS: &str = "/api/logs";
