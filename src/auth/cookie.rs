//! Helpers for the session cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

pub(crate) const COOKIE_SESSION: &str = "session_token";

/// Add the session token to the cookie jar.
///
/// The cookie itself carries no expiry beyond the browser session; the
/// server-side last-activity check is what actually ends a session.
pub(crate) fn set_session_cookie(jar: PrivateCookieJar, token: &str) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, token.to_owned()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Set the session cookie to an invalid value and set its max age to zero,
/// which should delete the cookie on the client side.
pub(crate) fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}
