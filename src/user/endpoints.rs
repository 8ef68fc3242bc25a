//! Endpoints for logging in and out, recovering a forgotten password, and
//! managing the logged-in user's credentials.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    audit::{self, db::record, models::Operation},
    auth::{
        CurrentUser,
        cookie::{COOKIE_SESSION, invalidate_session_cookie, set_session_cookie},
        session::SessionStore,
    },
    user::db,
};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// The form for the login endpoint. A missing username falls back to the
/// stored account, so single-user installs only need a password.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// The username to log in as.
    pub username: Option<String>,
    /// The password to check.
    pub password: String,
}

/// A handler that checks the provided credentials and, when they match,
/// creates a session and sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(form): Json<LoginForm>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let username = match form.username.filter(|name| !name.trim().is_empty()) {
        Some(name) => name.trim().to_string(),
        None => db::any_username(&connection)?,
    };

    if !db::verify_password(&connection, &username, &form.password)? {
        tracing::warn!("failed login attempt for \"{username}\"");
        return Err(Error::InvalidCredentials);
    }

    record(
        &connection,
        Operation::Login,
        &format!("用户登录系统 - 用户名: {username}"),
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;
    drop(connection);

    let token = state.sessions.create(&username);
    let jar = set_session_cookie(jar, &token);

    Ok((jar, Json(json!({ "success": true }))).into_response())
}

/// A handler that ends the current session and clears the session cookie.
pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    if let Some(token_cookie) = jar.get(COOKIE_SESSION) {
        state.sessions.remove(token_cookie.value());
    }
    let jar = invalidate_session_cookie(jar);

    let connection = state.db_connection.lock().unwrap();
    record(
        &connection,
        Operation::System,
        "用户退出系统",
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok((jar, Json(json!({ "success": true }))).into_response())
}

/// A handler that returns the logged-in username and login time.
pub async fn user_info(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    jar: PrivateCookieJar,
) -> Json<serde_json::Value> {
    let login_time = jar
        .get(COOKIE_SESSION)
        .and_then(|cookie| state.sessions.get(cookie.value()))
        .and_then(|session| format_timestamp(session.logged_in_at));

    Json(json!({ "username": username, "login_time": login_time }))
}

fn format_timestamp(timestamp: OffsetDateTime) -> Option<String> {
    timestamp.format(TIMESTAMP_FORMAT).ok()
}

/// The first step of password recovery: look up the security question.
#[derive(Debug, Deserialize)]
pub struct VerifyUserForm {
    /// The username to recover.
    pub username: String,
}

/// A handler that checks the username exists and returns its security
/// question.
pub async fn forgot_password_verify_user(
    State(state): State<AppState>,
    Json(form): Json<VerifyUserForm>,
) -> Result<Json<serde_json::Value>, Error> {
    let username = form.username.trim();
    if username.is_empty() {
        return Err(Error::InvalidField("请输入用户名".to_string()));
    }

    let connection = state.db_connection.lock().unwrap();
    let Some(question) = db::security_question(&connection, username)? else {
        return Err(Error::InvalidField(
            "用户名不存在或未设置安全问题".to_string(),
        ));
    };

    Ok(Json(json!({
        "success": true,
        "security_question": question,
    })))
}

/// The second step of password recovery: check the security answer.
#[derive(Debug, Deserialize)]
pub struct VerifyAnswerForm {
    /// The username being recovered.
    pub username: String,
    /// The answer to the security question.
    pub answer: String,
}

/// A handler that checks the security answer for the given username.
pub async fn forgot_password_verify_answer(
    State(state): State<AppState>,
    Json(form): Json<VerifyAnswerForm>,
) -> Result<Json<serde_json::Value>, Error> {
    let username = form.username.trim();
    let answer = form.answer.trim();
    if username.is_empty() || answer.is_empty() {
        return Err(Error::InvalidField(
            "用户名和安全问题答案不能为空".to_string(),
        ));
    }

    let connection = state.db_connection.lock().unwrap();
    if !db::verify_security_answer(&connection, username, answer)? {
        return Err(Error::InvalidSecurityAnswer);
    }

    Ok(Json(json!({ "success": true })))
}

/// The final step of password recovery: set the new password.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    /// The username being recovered.
    pub username: String,
    /// The new password.
    pub new_password: String,
    /// The new password, again.
    pub confirm_password: String,
}

/// A handler that resets the password after the recovery steps.
pub async fn forgot_password_reset(
    State(state): State<AppState>,
    Json(form): Json<ResetPasswordForm>,
) -> Result<Json<serde_json::Value>, Error> {
    let username = form.username.trim();
    if username.is_empty() || form.new_password.is_empty() || form.confirm_password.is_empty() {
        return Err(Error::InvalidField("所有字段都必须填写".to_string()));
    }
    if form.new_password != form.confirm_password {
        return Err(Error::PasswordMismatch);
    }
    if form.new_password.chars().count() < 6 {
        return Err(Error::PasswordTooShort);
    }

    let connection = state.db_connection.lock().unwrap();
    db::set_password(&connection, username, &form.new_password)?;
    record(
        &connection,
        Operation::PasswordReset,
        &format!("通过安全问题重置密码 - 用户名: {username}"),
        None,
        username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok(Json(json!({ "success": true })))
}

/// The form for changing the password while logged in.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    /// The current password.
    pub old_password: String,
    /// The password to change to.
    pub new_password: String,
}

/// A handler that changes the logged-in user's password after checking the
/// old one.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Json(form): Json<ChangePasswordForm>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state.db_connection.lock().unwrap();

    if !db::verify_password(&connection, &username, &form.old_password)? {
        return Err(Error::InvalidField("原密码错误".to_string()));
    }
    if form.new_password.chars().count() < 6 {
        return Err(Error::InvalidField("新密码长度至少6位".to_string()));
    }

    db::set_password(&connection, &username, &form.new_password)?;
    record(
        &connection,
        Operation::PasswordChange,
        &format!("修改密码 - 用户名: {username}"),
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok(Json(json!({ "success": true })))
}

/// The form for changing the security question while logged in.
#[derive(Debug, Deserialize)]
pub struct ChangeSecurityQuestionForm {
    /// The current password, required to authorize the change.
    pub password: String,
    /// The new security question.
    pub new_question: String,
    /// The answer to the new question.
    pub new_answer: String,
}

/// A handler that replaces the logged-in user's security question and
/// answer after checking their password.
pub async fn change_security_question(
    State(state): State<AppState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Json(form): Json<ChangeSecurityQuestionForm>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state.db_connection.lock().unwrap();

    if !db::verify_password(&connection, &username, &form.password)? {
        return Err(Error::InvalidField("密码错误".to_string()));
    }
    if form.new_question.trim().is_empty() || form.new_answer.trim().is_empty() {
        return Err(Error::InvalidField("安全问题和答案不能为空".to_string()));
    }

    db::set_security_question(
        &connection,
        &username,
        form.new_question.trim(),
        form.new_answer.trim(),
    )?;
    record(
        &connection,
        Operation::System,
        &format!(
            "修改安全问题 - 用户名: {username}, 新问题: {}",
            form.new_question.trim()
        ),
        None,
        &username,
        audit::CLIENT_IP,
        None,
    )?;

    Ok(Json(json!({
        "success": true,
        "message": "安全问题修改成功",
    })))
}
