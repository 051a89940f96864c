use crate::models::{NewUser, Post, PostAuthor, PublishedPost, UpdatePostRequest, User, UserSummary};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc};

/// Repository Trait
///
/// Persistence contract used by the handlers. The auth core never calls it
/// during token validation; it is consulted at login (credential lookup) and
/// for the resources being read or mutated.
///
/// **Send + Sync + async_trait** let the trait object (`Arc<dyn Repository>`)
/// be shared across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn list_users(&self) -> Result<Vec<UserSummary>, sqlx::Error>;
    async fn count_users(&self) -> Result<i64, sqlx::Error>;

    // --- Posts ---
    async fn create_post(
        &self,
        author_id: i64,
        title: String,
        content: String,
        published: bool,
    ) -> Result<Post, sqlx::Error>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>, sqlx::Error>;
    // Partial update: `None` fields keep their stored value. Ownership is checked by the caller.
    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> Result<Option<Post>, sqlx::Error>;
    // Returns true if a row was removed.
    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error>;
    // All posts of one author, drafts included, newest first.
    async fn get_posts_by_author(&self, author_id: i64) -> Result<Vec<Post>, sqlx::Error>;
    // Published posts only, newest first, with the author's username.
    async fn get_published_posts(&self) -> Result<Vec<PublishedPost>, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";
const POST_COLUMNS: &str = "id, title, content, published, author_id, created_at, updated_at";

/// Join row for the public listing, flattened into [`PublishedPost`] before leaving the repository.
#[derive(FromRow)]
struct PublishedPostRow {
    #[sqlx(flatten)]
    post: Post,
    author_username: String,
}

impl From<PublishedPostRow> for PublishedPost {
    fn from(row: PublishedPostRow) -> Self {
        let author = PostAuthor {
            id: row.post.author_id,
            username: row.author_username,
        };
        PublishedPost {
            post: row.post,
            author,
        }
    }
}

/// SqliteRepository
///
/// The `Repository` implementation backed by SQLite through sqlx.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// connect
    ///
    /// Opens a pool for `url`, creating the database file if needed and
    /// enforcing foreign keys. An in-memory database lives only as long as its
    /// connection, so it gets a single connection that is never recycled.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations from `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    /// create_user
    ///
    /// Inserts the user and returns the stored row. A duplicate username or
    /// email surfaces as a unique-violation database error.
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, email, role, created_at FROM users ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn count_users(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }

    async fn create_post(
        &self,
        author_id: i64,
        title: String,
        content: String,
        published: bool,
    ) -> Result<Post, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (title, content, published, author_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(title)
        .bind(content)
        .bind(published)
        .bind(author_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// update_post
    ///
    /// Uses `COALESCE` so that only the fields present in `req` change.
    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts
             SET title = COALESCE(?, title),
                 content = COALESCE(?, content),
                 published = COALESCE(?, published),
                 updated_at = ?
             WHERE id = ?
             RETURNING {POST_COLUMNS}"
        ))
        .bind(req.title)
        .bind(req.content)
        .bind(req.published)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_posts_by_author(&self, author_id: i64) -> Result<Vec<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
    }

    /// get_published_posts
    ///
    /// Public listing. Drafts never leave this query.
    async fn get_published_posts(&self) -> Result<Vec<PublishedPost>, sqlx::Error> {
        let rows = sqlx::query_as::<_, PublishedPostRow>(
            r#"
            SELECT p.id, p.title, p.content, p.published, p.author_id,
                   p.created_at, p.updated_at, u.username AS author_username
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.published = 1
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PublishedPost::from).collect())
    }
}
