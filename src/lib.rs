//! Giftledger is a web app for keeping track of reciprocal gift exchanges
//! (money given and received for social occasions) and day-to-day household
//! income/expense bookkeeping for multiple household members.
//!
//! This library provides a JSON REST API plus CSV import/export.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod audit;
mod auth;
mod config;
mod db;
mod endpoints;
mod gift;
mod interchange;
mod ledger;
mod logging;
mod owner;
mod pagination;
mod routing;
mod stats;
mod user;

pub use app_state::AppState;
pub use config::Config;
pub use logging::logging_middleware;
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid username/password combination.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The answer to the security question did not match the stored answer.
    #[error("the security answer does not match")]
    InvalidSecurityAnswer,

    /// A new password was shorter than the six character minimum.
    #[error("password must be at least six characters")]
    PasswordTooShort,

    /// The password and its confirmation did not match.
    #[error("the passwords do not match")]
    PasswordMismatch,

    /// A password was written but did not verify on read-back, so the
    /// operation was rolled back.
    #[error("stored credential failed read-back verification")]
    CredentialReadBackFailed,

    /// An unexpected error occurred in the underlying hashing routine.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A request field was missing or failed validation. The message is
    /// intended to be shown to the client.
    #[error("{0}")]
    InvalidField(String),

    /// A gift record with the same natural key (type, name, amount,
    /// occasion, date, owner) already exists.
    #[error("an identical gift record already exists")]
    DuplicateGiftRecord,

    /// A ledger entry with the same natural key (type, category,
    /// subcategory, amount, date, owner) already exists.
    #[error("an identical ledger entry already exists")]
    DuplicateLedgerEntry,

    /// The owner name is already in the persisted owner list.
    #[error("the owner \"{0}\" already exists")]
    DuplicateOwner(String),

    /// The CSV document could not be parsed.
    #[error("could not parse the CSV file: {0}")]
    InvalidCsv(String),

    /// The multipart form could not be read as an uploaded file.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An error occurred while serializing a value as JSON.
    #[error("could not serialize as JSON: {0}")]
    JsonSerializationError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed. The natural
            // key indexes turn a racing double-submit into this error, so it
            // is reported as a duplicate rather than a server fault.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("gift_record") =>
            {
                Error::DuplicateGiftRecord
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("ledger_entry") =>
            {
                Error::DuplicateLedgerEntry
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JsonSerializationError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            // Validation problems come back as a 200 with success:false so
            // the client can show the message, never as a server error.
            Error::InvalidField(message) => failure_message(&message),
            Error::InvalidCredentials => failure_message("用户名或密码错误"),
            Error::InvalidSecurityAnswer => failure_message("安全问题答案错误"),
            Error::PasswordTooShort => failure_message("密码长度不能少于6位"),
            Error::PasswordMismatch => failure_message("两次输入的密码不一致"),
            // Duplicate conflicts carry a distinct flag so the caller can
            // tell "already exists" apart from "bad input".
            Error::DuplicateGiftRecord | Error::DuplicateLedgerEntry => (
                StatusCode::OK,
                Json(json!({
                    "success": false,
                    "duplicate": true,
                    "message": "该记录已存在，请勿重复添加！",
                })),
            )
                .into_response(),
            Error::DuplicateOwner(name) => failure_message(&format!("所属人 \"{name}\" 已存在")),
            Error::NotFound => failure_message("记录不存在"),
            Error::InvalidCsv(message) | Error::MultipartError(message) => {
                failure_message(&format!("导入失败: {message}"))
            }
            // Anything else is an internal fault: log the detail server-side
            // and return a generic message.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "服务暂时不可用，请稍后重试" })),
                )
                    .into_response()
            }
        }
    }
}

/// A 200 response with `success: false` and a message for the client.
fn failure_message(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}
