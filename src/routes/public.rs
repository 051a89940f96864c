use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints: account creation, token issuance, and the
/// published-posts listing. Mounted under `/api`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /api/register
        // Creates a reader account.
        .route("/register", post(handlers::register_user))
        // POST /api/login
        // Verifies credentials and returns a bearer token.
        .route("/login", post(handlers::login))
        // POST /api/logout
        // Acknowledges logout. The client discards its token; nothing is revoked server-side.
        .route("/logout", post(handlers::logout))
        // GET /api/posts
        // Published posts only, with author id and username.
        .route("/posts", get(handlers::list_published_posts))
}
