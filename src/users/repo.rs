#[cfg(test)]
use std::sync::Mutex;

use async_trait::async_trait;
#[cfg(test)]
use regex::RegexBuilder;
use sqlx::PgPool;
#[cfg(test)]
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserPatch};
use crate::error::{AppError, Result};

/// Credential store. Uniqueness of `email` is enforced here, not by callers.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Fails with `DuplicateUser` when the email is already taken.
    async fn insert(&self, user: NewUser) -> Result<Uuid>;
    /// Returns how many records actually changed.
    async fn update_fields(&self, email: &str, patch: UserPatch) -> Result<u64>;
    async fn delete_by_email(&self, email: &str) -> Result<u64>;
    async fn count_all(&self) -> Result<i64>;
    async fn list_all(&self) -> Result<Vec<User>>;
    /// Case-insensitive substring match on name; `fragment` is literal.
    async fn search_by_name(&self, fragment: &str) -> Result<Vec<User>>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, address, city, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let res = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, address, city)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.address)
        .bind(&user.city)
        .execute(&self.db)
        .await;

        match res {
            Ok(_) => Ok(id),
            // users_email_key closes the gap left by the pre-insert lookup
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateUser)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_fields(&self, email: &str, patch: UserPatch) -> Result<u64> {
        let Some(name) = patch.name else {
            return Ok(0);
        };
        let res = sqlx::query(
            r#"
            UPDATE users
               SET name = $2
             WHERE email = $1 AND name IS DISTINCT FROM $2
            "#,
        )
        .bind(email)
        .bind(name)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected())
    }

    async fn delete_by_email(&self, email: &str) -> Result<u64> {
        let res = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn count_all(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, address, city, created_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, address, city, created_at
            FROM users
            WHERE name ~* $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(regex::escape(fragment))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

/// In-process store used by tests and `AppState::fake`.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<User>>,
}

#[cfg(test)]
impl MemoryUserRepository {
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<User>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.lock().iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<Uuid> {
        let mut users = self.lock();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateUser);
        }
        let id = Uuid::new_v4();
        users.push(User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            address: user.address,
            city: user.city,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn update_fields(&self, email: &str, patch: UserPatch) -> Result<u64> {
        let mut users = self.lock();
        let Some(user) = users.iter_mut().find(|u| u.email == email) else {
            return Ok(0);
        };
        match patch.name {
            Some(name) if name != user.name => {
                user.name = name;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete_by_email(&self, email: &str) -> Result<u64> {
        let mut users = self.lock();
        let before = users.len();
        users.retain(|u| u.email != email);
        Ok((before - users.len()) as u64)
    }

    async fn count_all(&self) -> Result<i64> {
        Ok(self.lock().len() as i64)
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        Ok(self.lock().clone())
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<User>> {
        let re = RegexBuilder::new(&regex::escape(fragment))
            .case_insensitive(true)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(self
            .lock()
            .iter()
            .filter(|u| re.is_match(&u.name))
            .cloned()
            .collect())
    }
}
