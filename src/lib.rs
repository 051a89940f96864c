use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity core: credentials, tokens, role gate, ownership.
pub mod auth;
pub mod password;

// Application services and components.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod seed;

// Routing segregation (Public, Authenticated, Editor).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, editor, public};

// --- Public Re-exports ---

pub use auth::{TokenIssuer, TokenValidator};
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{RepositoryState, SqliteRepository};

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and
/// `ToSchema` models, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::logout,
        handlers::list_published_posts, handlers::get_dashboard, handlers::create_post,
        handlers::update_post, handlers::delete_post, handlers::list_users,
    ),
    components(
        schemas(
            models::Role, models::Post, models::PublishedPost, models::PostAuthor,
            models::UserSummary, models::RegisterRequest, models::RegisterResponse,
            models::LoginRequest, models::LoginResponse, models::CreatePostRequest,
            models::UpdatePostRequest, models::DashboardResponse, models::MessageResponse,
            models::ErrorBody, auth::IdentityClaims,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "blog", description = "Blog publishing API")
    )
)]
struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the protected handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// Shared, immutable container for everything a request needs. The token
/// issuer and validator are built once from the configured secret and ttl.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: users and posts.
    pub repo: RepositoryState,
    /// Mints tokens at login.
    pub issuer: TokenIssuer,
    /// Verifies bearer tokens on protected routes.
    pub validator: TokenValidator,
    /// The loaded configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Wires the token services from `config` around an existing repository.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            issuer: TokenIssuer::new(&config.jwt_secret, config.token_ttl),
            validator: TokenValidator::new(&config.jwt_secret),
            repo,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenValidator {
    fn from_ref(app_state: &AppState) -> TokenValidator {
        app_state.validator.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated and editor routers. Extracting `AuthUser` rejects
/// the request with 401 before the handler (and its body extractor) runs;
/// on success the identity is stored in the request extensions for the handler.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, applies the auth layer to protected routes and
/// the observability layers to everything.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let protected = authenticated::authenticated_routes()
        .merge(editor::editor_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = public::public_routes().merge(protected);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span with method, URI and the `x-request-id` set by
/// `SetRequestIdLayer`, so every log line of a request shares one id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
