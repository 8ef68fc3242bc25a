//! Session-based authentication: the server-side session store, the session
//! cookie helpers, and the middleware that guards the API routes.

pub mod cookie;
pub mod middleware;
pub mod session;

/// The username of the logged-in user, inserted into request extensions by
/// [middleware::auth_guard] so handlers can attribute operations.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);
