#[cfg(test)]
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub marked_at: OffsetDateTime,
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn insert(&self, email: &str, name: &str, marked_at: OffsetDateTime)
        -> Result<AttendanceRecord>;
    /// Oldest first.
    async fn list_by_email(&self, email: &str) -> Result<Vec<AttendanceRecord>>;
    async fn count_all(&self) -> Result<i64>;
}

#[derive(Clone)]
pub struct PgAttendanceRepository {
    db: PgPool,
}

impl PgAttendanceRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    async fn insert(
        &self,
        email: &str,
        name: &str,
        marked_at: OffsetDateTime,
    ) -> Result<AttendanceRecord> {
        let rec = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance (id, email, name, marked_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, marked_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(marked_at)
        .fetch_one(&self.db)
        .await?;
        Ok(rec)
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, email, name, marked_at
              FROM attendance
             WHERE email = $1
             ORDER BY marked_at ASC
            "#,
        )
        .bind(email)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn count_all(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attendance")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryAttendanceRepository {
    records: Mutex<Vec<AttendanceRecord>>,
}

#[cfg(test)]
impl MemoryAttendanceRepository {
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AttendanceRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
#[async_trait]
impl AttendanceRepository for MemoryAttendanceRepository {
    async fn insert(
        &self,
        email: &str,
        name: &str,
        marked_at: OffsetDateTime,
    ) -> Result<AttendanceRecord> {
        let rec = AttendanceRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            marked_at,
        };
        self.lock().push(rec.clone());
        Ok(rec)
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<AttendanceRecord>> {
        let mut rows: Vec<_> = self
            .lock()
            .iter()
            .filter(|r| r.email == email)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.marked_at);
        Ok(rows)
    }

    async fn count_all(&self) -> Result<i64> {
        Ok(self.lock().len() as i64)
    }
}
