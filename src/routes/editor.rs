use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Editor Router Module
///
/// Routes limited to the `editor` role. They share the auth middleware with
/// the authenticated routes; the role check itself runs in the handler, so a
/// missing or bad token is a 401 and a lower role is a 403.
pub fn editor_routes() -> Router<AppState> {
    Router::new()
        // GET /api/users
        // Lists every account (never the password hashes).
        .route("/users", get(handlers::list_users))
}
