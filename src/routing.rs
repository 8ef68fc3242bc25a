//! Application router configuration with protected and unprotected route
//! definitions.

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState, audit, auth::middleware::auth_guard, endpoints, gift, interchange, ledger,
    logging::logging_middleware, owner, stats, user,
};

/// Return a router with all the app's routes.
///
/// Everything except the login and password recovery endpoints sits
/// behind the session guard.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOGIN, post(user::endpoints::login))
        .route(
            endpoints::FORGOT_PASSWORD_VERIFY_USER,
            post(user::endpoints::forgot_password_verify_user),
        )
        .route(
            endpoints::FORGOT_PASSWORD_VERIFY_ANSWER,
            post(user::endpoints::forgot_password_verify_answer),
        )
        .route(
            endpoints::FORGOT_PASSWORD_RESET,
            post(user::endpoints::forgot_password_reset),
        );

    let protected_routes = Router::new()
        .route(endpoints::LOGOUT, post(user::endpoints::logout))
        .route(endpoints::USER_INFO, get(user::endpoints::user_info))
        .route(
            endpoints::CHANGE_PASSWORD,
            post(user::endpoints::change_password),
        )
        .route(
            endpoints::CHANGE_SECURITY_QUESTION,
            post(user::endpoints::change_security_question),
        )
        .route(
            endpoints::GIFT_RECORDS,
            get(gift::endpoints::list_records).post(gift::endpoints::add_record),
        )
        .route(
            endpoints::GIFT_RECORDS_SEARCH,
            post(gift::endpoints::search_records),
        )
        .route(
            endpoints::GIFT_RECORD,
            put(gift::endpoints::update_record).delete(gift::endpoints::delete_record),
        )
        .route(
            endpoints::GIFT_STATISTICS,
            get(stats::endpoints::gift_statistics),
        )
        .route(
            endpoints::EVENT_STATISTICS,
            get(stats::endpoints::event_statistics),
        )
        .route(
            endpoints::RETURN_STATISTICS,
            get(stats::endpoints::return_statistics),
        )
        .route(
            endpoints::GIFT_IMPORT,
            post(interchange::import::import_gift_records),
        )
        .route(
            endpoints::GIFT_TEMPLATE,
            get(interchange::export::gift_records_template),
        )
        .route(
            endpoints::LEDGER_RECORDS,
            get(ledger::endpoints::list_entries).post(ledger::endpoints::add_entry),
        )
        .route(
            endpoints::LEDGER_RECORDS_SEARCH,
            post(ledger::endpoints::search_entries),
        )
        .route(
            endpoints::LEDGER_RECORD,
            put(ledger::endpoints::update_entry).delete(ledger::endpoints::delete_entry),
        )
        .route(
            endpoints::LEDGER_CATEGORIES,
            get(ledger::endpoints::get_categories).post(ledger::endpoints::replace_categories),
        )
        .route(
            endpoints::LEDGER_CATEGORIES_RESET,
            post(ledger::endpoints::reset_categories),
        )
        .route(
            endpoints::LEDGER_STATISTICS,
            get(stats::endpoints::basic_statistics),
        )
        .route(
            endpoints::LEDGER_STATISTICS_DETAILED,
            get(stats::endpoints::detailed_statistics),
        )
        .route(
            endpoints::LEDGER_STATISTICS_CHARTS,
            get(stats::endpoints::chart_statistics),
        )
        .route(
            endpoints::LEDGER_STATISTICS_CATEGORIES,
            get(stats::endpoints::category_statistics),
        )
        .route(
            endpoints::LEDGER_STATISTICS_SUBCATEGORY,
            get(stats::endpoints::subcategory_statistics),
        )
        .route(endpoints::LEDGER_CALENDAR, get(stats::endpoints::calendar_view))
        .route(
            endpoints::LEDGER_IMPORT,
            post(interchange::import::import_ledger_entries),
        )
        .route(
            endpoints::LEDGER_EXPORT,
            get(interchange::export::export_ledger_entries),
        )
        .route(
            endpoints::LEDGER_TEMPLATE,
            get(interchange::export::account_template),
        )
        .route(endpoints::OWNERS, get(owner::get_owners).post(owner::add_owner))
        .route(endpoints::OWNER, delete(owner::delete_owner))
        .route(endpoints::LOGS, get(audit::endpoints::get_logs))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
