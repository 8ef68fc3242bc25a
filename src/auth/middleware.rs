//! Middleware that rejects requests without a live session.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    app_state::AuthState,
    auth::{
        CurrentUser,
        cookie::{COOKIE_SESSION, invalidate_session_cookie},
        session::{SessionStore, is_expired},
    },
};

/// Check that the request carries a session token for a live session.
///
/// On success the session's last-activity time is refreshed and the
/// username is made available to handlers through [CurrentUser]. Expired
/// sessions are removed from the store and the cookie is cleared.
pub async fn auth_guard(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token_cookie) = jar.get(COOKIE_SESSION) else {
        return unauthorized("未登录或会话已过期");
    };
    let token = token_cookie.value().to_owned();

    let Some(session) = state.sessions.get(&token) else {
        return unauthorized("未登录或会话已过期");
    };

    let now = OffsetDateTime::now_utc();
    if is_expired(now, session.last_activity, state.session_ttl) {
        state.sessions.remove(&token);
        let jar = invalidate_session_cookie(jar);

        return (jar, unauthorized("会话已过期，请重新登录")).into_response();
    }

    state.sessions.touch(&token, now);
    request.extensions_mut().insert(CurrentUser(session.username));

    next.run(request).await
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}
