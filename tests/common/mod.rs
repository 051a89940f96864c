#![allow(dead_code)]

use async_trait::async_trait;
use blog_backend::{
    AppState,
    auth::IdentityClaims,
    config::AppConfig,
    models::{NewUser, Post, PostAuthor, PublishedPost, Role, UpdatePostRequest, User, UserSummary},
    repository::Repository,
};
use chrono::Utc;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

/// In-memory stand-in for the database. Counts every write so tests can
/// assert that a rejected request left the store untouched.
#[derive(Default)]
pub struct MockRepo {
    pub users: Mutex<Vec<User>>,
    pub posts: Mutex<Vec<Post>>,
    pub mutations: AtomicUsize,
}

impl MockRepo {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Self::default()
        }
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        let created = User {
            id: users.len() as i64 + 1,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(UserSummary::from)
            .collect())
    }

    async fn count_users(&self) -> Result<i64, sqlx::Error> {
        Ok(self.users.lock().unwrap().len() as i64)
    }

    async fn create_post(
        &self,
        author_id: i64,
        title: String,
        content: String,
        published: bool,
    ) -> Result<Post, sqlx::Error> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.posts.lock().unwrap();
        let id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let post = post(id, author_id, &title);
        let post = Post {
            content,
            published,
            ..post
        };
        posts.push(post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn update_post(
        &self,
        id: i64,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, sqlx::Error> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.posts.lock().unwrap();
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(content) = req.content {
            post.content = content;
        }
        if let Some(published) = req.published {
            post.published = published;
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() < before)
    }

    async fn get_posts_by_author(&self, author_id: i64) -> Result<Vec<Post>, sqlx::Error> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect())
    }

    async fn get_published_posts(&self) -> Result<Vec<PublishedPost>, sqlx::Error> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.published)
            .map(|p| PublishedPost {
                post: p.clone(),
                author: PostAuthor {
                    id: p.author_id,
                    username: format!("user{}", p.author_id),
                },
            })
            .collect())
    }
}

pub fn post(id: i64, author_id: i64, title: &str) -> Post {
    Post {
        id,
        title: title.to_string(),
        content: format!("{title} body"),
        published: true,
        author_id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn claims(id: i64, role: Role) -> IdentityClaims {
    IdentityClaims {
        id,
        username: format!("user{id}"),
        email: format!("user{id}@example.com"),
        role,
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

/// Builds state around `repo`, returning the concrete handle as well so tests
/// can inspect it after the handler ran.
pub fn state_with(repo: MockRepo) -> (AppState, Arc<MockRepo>) {
    let repo = Arc::new(repo);
    let state = AppState::new(repo.clone(), test_config());
    (state, repo)
}
