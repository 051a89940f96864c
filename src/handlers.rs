use crate::{
    AppState,
    auth::{AuthUser, IdentityClaims, require_owner, require_role},
    error::ApiError,
    models::{
        CreatePostRequest, DashboardResponse, ErrorBody, LoginRequest, LoginResponse,
        MessageResponse, NewUser, Post, PublishedPost, RegisterRequest, RegisterResponse, Role,
        UpdatePostRequest, UserSummary,
    },
    password,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

// --- Validation Helpers ---

/// Trims a required text field, rejecting it when nothing is left.
fn required_field(value: &str, name: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{name} is required")));
    }
    Ok(trimmed.to_string())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

// --- Identity Handlers ---

/// register_user
///
/// [Public Route] Creates an account. Every new account is a `reader`; the
/// request cannot choose a role.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Invalid input or duplicate account", body = ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let username = required_field(&payload.username, "username")?;
    let email = required_field(&payload.email, "email")?;
    if !looks_like_email(&email) {
        return Err(ApiError::BadRequest("email is not a valid address".to_string()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("password is required".to_string()));
    }

    if state.repo.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::BadRequest(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password_blocking(payload.password).await?;
    let user = state
        .repo
        .create_user(NewUser {
            username,
            email,
            password_hash,
            role: Role::Reader,
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::BadRequest("User with this username or email already exists".to_string())
            } else {
                ApiError::Database(e)
            }
        })?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: UserSummary::from(&user),
        }),
    ))
}

/// login
///
/// [Public Route] Verifies the credentials and issues a bearer token carrying
/// the user's id, username, email and role. An unknown email and a wrong
/// password produce the same 401.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.repo.find_user_by_email(payload.email.trim()).await?;
    // An unknown email still pays for one verification against a dummy hash.
    let stored_hash = user.as_ref().map(|user| user.password_hash.clone());
    let verified = password::verify_password_blocking(payload.password, stored_hash).await?;

    let user = match user {
        Some(user) if verified => user,
        Some(user) => {
            tracing::warn!(user_id = user.id, "login attempt with wrong password");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            tracing::warn!("login attempt for unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let token = state.issuer.issue(&IdentityClaims::from(&user))?;
    tracing::info!(user_id = user.id, role = %user.role, "user logged in");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.issuer.ttl().as_secs(),
        user: UserSummary::from(&user),
    }))
}

/// logout
///
/// [Public Route] Tokens are stateless and there is no server-side session to
/// destroy, so logging out is the client's job: discard the token. The token
/// stays valid until its `exp` regardless of this call.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Acknowledged", body = MessageResponse))
)]
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::new(
        "Logout successful. Discard your token; it remains valid until it expires.",
    ))
}

// --- Post Handlers ---

/// list_published_posts
///
/// [Public Route] Lists published posts with their author.
#[utoipa::path(
    get,
    path = "/api/posts",
    responses((status = 200, description = "Published posts", body = [PublishedPost]))
)]
pub async fn list_published_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublishedPost>>, ApiError> {
    Ok(Json(state.repo.get_published_posts().await?))
}

/// get_dashboard
///
/// [Authenticated Route] The caller's identity plus all of their own posts.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Missing, expired or malformed token", body = ErrorBody)
    )
)]
pub async fn get_dashboard(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let posts = state.repo.get_posts_by_author(claims.id).await?;
    Ok(Json(DashboardResponse {
        total_posts: posts.len(),
        user: claims,
        posts,
    }))
}

/// create_post
///
/// [Authenticated Route, author+] Creates a post owned by the caller.
#[utoipa::path(
    post,
    path = "/api/posts",
    security(("bearer_auth" = [])),
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Missing, expired or malformed token", body = ErrorBody),
        (status = 403, description = "Requires author role", body = ErrorBody)
    )
)]
pub async fn create_post(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    require_role(&claims, Role::Author)?;

    let title = required_field(&payload.title, "title")?;
    let content = required_field(&payload.content, "content")?;

    let post = state
        .repo
        .create_post(claims.id, title, content, payload.published)
        .await?;
    tracing::info!(post_id = post.id, author_id = claims.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route, author+] Partially updates a post. Checks run in
/// order: existence (404), role (403), ownership (403). A missing post is a
/// 404 for every caller, readers included.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 401, description = "Missing, expired or malformed token", body = ErrorBody),
        (status = 403, description = "Requires author role, or not the owner", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody)
    )
)]
pub async fn update_post(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;
    require_role(&claims, Role::Author)?;
    require_owner(&claims, post.author_id)?;

    let changes = UpdatePostRequest {
        title: payload
            .title
            .as_deref()
            .map(|title| required_field(title, "title"))
            .transpose()?,
        content: payload
            .content
            .as_deref()
            .map(|content| required_field(content, "content"))
            .transpose()?,
        published: payload.published,
    };

    // The row can disappear between the ownership check and the update.
    let updated = state
        .repo
        .update_post(id, changes)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;
    tracing::info!(post_id = id, "post updated");
    Ok(Json(updated))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post owned by the caller. Unlike update,
/// no minimum role is required: ownership alone gates deletion.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 401, description = "Missing, expired or malformed token", body = ErrorBody),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody)
    )
)]
pub async fn delete_post(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;
    require_owner(&claims, post.author_id)?;

    if !state.repo.delete_post(id).await? {
        return Err(ApiError::NotFound("Post"));
    }
    tracing::info!(post_id = id, "post deleted");
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

// --- Editor Handlers ---

/// list_users
///
/// [Editor Route] Lists every account without password hashes.
#[utoipa::path(
    get,
    path = "/api/users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = [UserSummary]),
        (status = 401, description = "Missing, expired or malformed token", body = ErrorBody),
        (status = 403, description = "Requires editor role", body = ErrorBody)
    )
)]
pub async fn list_users(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    require_role(&claims, Role::Editor)?;
    Ok(Json(state.repo.list_users().await?))
}
