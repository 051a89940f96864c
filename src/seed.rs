use crate::{
    models::{NewUser, Role},
    password::{self, PasswordError},
    repository::Repository,
};

/// Password shared by every sample account.
pub const SAMPLE_PASSWORD: &str = "password123";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// seed_sample_data
///
/// Populates an empty database with one account per role
/// (`<role>@example.com` / [`SAMPLE_PASSWORD`]) and a handful of posts in
/// mixed publish states owned by the author and the editor. Does nothing if
/// any user exists. Returns whether data was inserted.
pub async fn seed_sample_data(repo: &dyn Repository) -> Result<bool, SeedError> {
    if repo.count_users().await? > 0 {
        tracing::debug!("users present, skipping sample data");
        return Ok(false);
    }

    let password_hash = password::hash_password_blocking(SAMPLE_PASSWORD.to_string()).await?;

    let mut accounts = Vec::with_capacity(Role::ALL.len());
    for role in Role::ALL {
        let user = repo
            .create_user(NewUser {
                username: role.as_str().to_string(),
                email: format!("{role}@example.com"),
                password_hash: password_hash.clone(),
                role,
            })
            .await?;
        accounts.push(user);
    }
    let author_id = accounts[1].id;
    let editor_id = accounts[2].id;

    let posts = [
        (
            author_id,
            "Getting Started with Rust",
            "Rust is a systems programming language focused on safety, speed and concurrency...",
            true,
        ),
        (
            author_id,
            "Understanding JWT Authentication",
            "JSON Web Tokens (JWT) are a compact, URL-safe means of representing claims to be transferred between two parties...",
            true,
        ),
        (
            author_id,
            "Building REST APIs with Axum",
            "Axum is a web application framework that focuses on ergonomics and modularity...",
            false,
        ),
        (
            editor_id,
            "Database Design Best Practices",
            "Good database design is crucial for building scalable and maintainable applications...",
            true,
        ),
        (
            editor_id,
            "Introduction to Web Security",
            "Web security is a critical aspect of modern web development. This post covers common vulnerabilities...",
            false,
        ),
    ];
    for (owner, title, content, published) in posts {
        repo.create_post(owner, title.to_string(), content.to_string(), published)
            .await?;
    }

    tracing::info!(
        users = accounts.len(),
        posts = posts.len(),
        "sample data created (reader/author/editor @example.com)"
    );
    Ok(true)
}
