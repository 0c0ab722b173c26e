//! Interview persistence: the document store behind sessions and history.
//!
//! Rows are append-only: a round is inserted once and never updated or deleted.
//! Every read is scoped to a single `user_id`.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::models::interview::{InterviewRow, NewInterview};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not encode feedback: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait InterviewStore: Send + Sync {
    /// Writes one round and returns it with the server-assigned timestamp.
    async fn insert(&self, record: &NewInterview) -> Result<InterviewRow, StoreError>;

    /// Returns every round owned by `user_id`. Order is not guaranteed.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InterviewRow>, StoreError>;
}

/// PostgreSQL-backed store. Feedback is embedded inline as JSONB.
pub struct PgInterviewStore {
    pool: PgPool,
}

impl PgInterviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Unavailable("connection pool is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl InterviewStore for PgInterviewStore {
    async fn insert(&self, record: &NewInterview) -> Result<InterviewRow, StoreError> {
        self.ensure_open()?;
        let feedback = serde_json::to_value(&record.feedback)?;

        let row = sqlx::query_as::<_, InterviewRow>(
            r#"
            INSERT INTO interviews
                (id, user_id, interview_type, session_name, topic, difficulty,
                 resume_text, question, answer, feedback, answer_duration_secs)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(record.interview_type.as_str())
        .bind(&record.session_name)
        .bind(&record.topic)
        .bind(record.difficulty.map(|d| d.as_str()))
        .bind(&record.resume_text)
        .bind(&record.question)
        .bind(&record.answer)
        .bind(&feedback)
        .bind(record.answer_duration_secs)
        .fetch_one(&self.pool)
        .await?;

        info!("Stored interview {} for user {}", row.id, row.user_id);
        Ok(row)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InterviewRow>, StoreError> {
        self.ensure_open()?;
        Ok(sqlx::query_as::<_, InterviewRow>(
            "SELECT * FROM interviews WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
