#[cfg(test)]
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub post_text: String,
    pub address: String,
    pub city: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub name: String,
    pub email: String,
    pub post_text: String,
    pub address: String,
    pub city: String,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: NewPost) -> Result<Post>;
    /// Oldest post whose name matches exactly.
    async fn find_first_by_name(&self, name: &str) -> Result<Option<Post>>;
}

#[derive(Clone)]
pub struct PgPostRepository {
    db: PgPool,
}

impl PgPostRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post> {
        let row = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, name, email, post_text, address, city)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, post_text, address, city
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&post.name)
        .bind(&post.email)
        .bind(&post.post_text)
        .bind(&post.address)
        .bind(&post.city)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_first_by_name(&self, name: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, name, email, post_text, address, city
              FROM posts
             WHERE name = $1
             ORDER BY created_at ASC
             LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryPostRepository {
    posts: Mutex<Vec<Post>>,
}

#[cfg(test)]
#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post> {
        let row = Post {
            id: Uuid::new_v4(),
            name: post.name,
            email: post.email,
            post_text: post.post_text,
            address: post.address,
            city: post.city,
        };
        self.posts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(row.clone());
        Ok(row)
    }

    async fn find_first_by_name(&self, name: &str) -> Result<Option<Post>> {
        Ok(self
            .posts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|p| p.name == name)
            .cloned())
    }
}
