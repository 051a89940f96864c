use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the auth middleware, so handlers receive a
/// validated `AuthUser`. Role and ownership checks happen inside the handlers,
/// after the token has been accepted.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/dashboard
        // Caller's identity and all of their own posts, drafts included.
        .route("/dashboard", get(handlers::get_dashboard))
        // POST /api/posts
        // Requires the author role.
        .route("/posts", post(handlers::create_post))
        // PUT/DELETE /api/posts/{id}
        // PUT requires author role and ownership; DELETE requires ownership only.
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
}
