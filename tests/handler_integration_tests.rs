mod common;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use blog_backend::{
    ApiError,
    auth::AuthUser,
    handlers,
    models::{CreatePostRequest, LoginRequest, RegisterRequest, Role, UpdatePostRequest},
    password,
};
use common::{MockRepo, claims, post, state_with};

fn create_request(title: &str) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        content: "Some content".to_string(),
        published: true,
    }
}

// --- Role Gate ---

#[tokio::test]
async fn test_reader_cannot_create_post() {
    let (state, repo) = state_with(MockRepo::default());

    let err = handlers::create_post(
        AuthUser(claims(1, Role::Reader)),
        State(state),
        Json(create_request("Hello")),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::InsufficientRole(Role::Author)));
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(repo.mutation_count(), 0);
}

#[tokio::test]
async fn test_author_and_editor_can_create_post() {
    for role in [Role::Author, Role::Editor] {
        let (state, repo) = state_with(MockRepo::default());

        let (status, Json(created)) = handlers::create_post(
            AuthUser(claims(5, role)),
            State(state),
            Json(create_request("  Trimmed title  ")),
        )
        .await
        .expect("create should succeed");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.author_id, 5);
        assert_eq!(created.title, "Trimmed title");
        assert_eq!(repo.posts.lock().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_create_post_rejects_blank_title() {
    let (state, repo) = state_with(MockRepo::default());

    let err = handlers::create_post(
        AuthUser(claims(5, Role::Author)),
        State(state),
        Json(create_request("   ")),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(repo.mutation_count(), 0);
}

#[tokio::test]
async fn test_list_users_requires_editor() {
    for role in [Role::Reader, Role::Author] {
        let (state, _) = state_with(MockRepo::default());
        let err = handlers::list_users(AuthUser(claims(1, role)), State(state))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InsufficientRole(Role::Editor)));
    }

    let (state, _) = state_with(MockRepo::default());
    assert!(
        handlers::list_users(AuthUser(claims(1, Role::Editor)), State(state))
            .await
            .is_ok()
    );
}

// --- Ownership ---

#[tokio::test]
async fn test_update_missing_post_is_not_found() {
    let (state, repo) = state_with(MockRepo::default());

    let err = handlers::update_post(
        AuthUser(claims(2, Role::Author)),
        State(state),
        Path(99),
        Json(UpdatePostRequest::default()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(repo.mutation_count(), 0);
}

#[tokio::test]
async fn test_update_foreign_post_is_forbidden_even_for_editor() {
    let (state, repo) = state_with(MockRepo::with_posts(vec![post(1, 2, "Author's post")]));

    let err = handlers::update_post(
        AuthUser(claims(3, Role::Editor)),
        State(state),
        Path(1),
        Json(UpdatePostRequest {
            title: Some("Hijacked".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::NotOwner));
    assert_eq!(repo.mutation_count(), 0);
    assert_eq!(repo.posts.lock().unwrap()[0].title, "Author's post");
}

#[tokio::test]
async fn test_reader_update_of_missing_post_is_not_found() {
    let (state, repo) = state_with(MockRepo::default());

    let err = handlers::update_post(
        AuthUser(claims(4, Role::Reader)),
        State(state),
        Path(999),
        Json(UpdatePostRequest::default()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(repo.mutation_count(), 0);
}

#[tokio::test]
async fn test_reader_update_of_own_post_is_role_rejected() {
    // The reader owns the post, but the role gate runs before ownership.
    let (state, repo) = state_with(MockRepo::with_posts(vec![post(1, 4, "Old")]));

    let err = handlers::update_post(
        AuthUser(claims(4, Role::Reader)),
        State(state),
        Path(1),
        Json(UpdatePostRequest::default()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::InsufficientRole(Role::Author)));
    assert_eq!(repo.mutation_count(), 0);
}

#[tokio::test]
async fn test_owner_updates_only_given_fields() {
    let (state, _) = state_with(MockRepo::with_posts(vec![post(1, 2, "Original")]));

    let Json(updated) = handlers::update_post(
        AuthUser(claims(2, Role::Author)),
        State(state),
        Path(1),
        Json(UpdatePostRequest {
            published: Some(false),
            ..Default::default()
        }),
    )
    .await
    .expect("owner update should succeed");

    assert_eq!(updated.title, "Original");
    assert!(!updated.published);
}

#[tokio::test]
async fn test_delete_missing_post_is_not_found() {
    let (state, repo) = state_with(MockRepo::default());

    let err = handlers::delete_post(AuthUser(claims(2, Role::Author)), State(state), Path(42))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(repo.mutation_count(), 0);
}

#[tokio::test]
async fn test_delete_foreign_post_is_forbidden() {
    let (state, repo) = state_with(MockRepo::with_posts(vec![post(4, 3, "Editor's post")]));

    let err = handlers::delete_post(AuthUser(claims(2, Role::Author)), State(state), Path(4))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotOwner));
    assert_eq!(repo.mutation_count(), 0);
    assert_eq!(repo.posts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_owner_deletes_post() {
    let (state, repo) = state_with(MockRepo::with_posts(vec![post(4, 2, "Mine")]));

    let Json(body) = handlers::delete_post(AuthUser(claims(2, Role::Author)), State(state), Path(4))
        .await
        .expect("owner delete should succeed");

    assert_eq!(body.message, "Post deleted successfully");
    assert!(repo.posts.lock().unwrap().is_empty());
}

// --- Identity ---

#[tokio::test]
async fn test_register_always_creates_reader() {
    let (state, repo) = state_with(MockRepo::default());

    let (status, Json(body)) = handlers::register_user(
        State(state),
        Json(RegisterRequest {
            username: "newbie".to_string(),
            email: "newbie@example.com".to_string(),
            password: "hunter22".to_string(),
        }),
    )
    .await
    .expect("registration should succeed");

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.user.role, Role::Reader);
    let stored = &repo.users.lock().unwrap()[0];
    assert_ne!(stored.password_hash, "hunter22");
    assert!(password::verify_password("hunter22", &stored.password_hash));
}

#[tokio::test]
async fn test_register_duplicate_email_is_bad_request() {
    let (state, _) = state_with(MockRepo::default());
    let request = || RegisterRequest {
        username: "twin".to_string(),
        email: "twin@example.com".to_string(),
        password: "pw".to_string(),
    };

    handlers::register_user(State(state.clone()), Json(request()))
        .await
        .expect("first registration should succeed");
    let err = handlers::register_user(State(state), Json(request()))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), "User with this email already exists");
}

#[tokio::test]
async fn test_login_issues_token_for_valid_credentials() {
    let (state, _) = state_with(MockRepo::default());
    handlers::register_user(
        State(state.clone()),
        Json(RegisterRequest {
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password: "correct horse".to_string(),
        }),
    )
    .await
    .unwrap();

    let Json(body) = handlers::login(
        State(state.clone()),
        Json(LoginRequest {
            email: "carol@example.com".to_string(),
            password: "correct horse".to_string(),
        }),
    )
    .await
    .expect("login should succeed");

    assert_eq!(body.token_type, "Bearer");
    let identity = state.validator.validate(&body.token).unwrap();
    assert_eq!(identity.email, "carol@example.com");
    assert_eq!(identity.role, Role::Reader);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (state, _) = state_with(MockRepo::default());
    handlers::register_user(
        State(state.clone()),
        Json(RegisterRequest {
            username: "dave".to_string(),
            email: "dave@example.com".to_string(),
            password: "right".to_string(),
        }),
    )
    .await
    .unwrap();

    let wrong_password = handlers::login(
        State(state.clone()),
        Json(LoginRequest {
            email: "dave@example.com".to_string(),
            password: "wrong".to_string(),
        }),
    )
    .await
    .unwrap_err();
    let unknown_email = handlers::login(
        State(state),
        Json(LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "right".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(wrong_password, ApiError::InvalidCredentials));
    assert!(matches!(unknown_email, ApiError::InvalidCredentials));

    let a = axum::body::to_bytes(wrong_password.into_response().into_body(), usize::MAX)
        .await
        .unwrap();
    let b = axum::body::to_bytes(unknown_email.into_response().into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_dashboard_lists_only_own_posts() {
    let (state, _) = state_with(MockRepo::with_posts(vec![
        post(1, 2, "Mine"),
        post(2, 3, "Theirs"),
        post(3, 2, "Also mine"),
    ]));

    let Json(dashboard) = handlers::get_dashboard(AuthUser(claims(2, Role::Author)), State(state))
        .await
        .unwrap();

    assert_eq!(dashboard.total_posts, 2);
    assert!(dashboard.posts.iter().all(|p| p.author_id == 2));
    assert_eq!(dashboard.user.id, 2);
}
