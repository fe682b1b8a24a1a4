//! Feedback repository

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::feedback::{Feedback, FeedbackStatus},
};

const FEEDBACK_SELECT: &str = r#"
    SELECT f.id, f.user_id, u.username, f.message, f.date_sent, f.admin_reply, f.status
    FROM feedback f
    JOIN users u ON u.id = f.user_id
"#;

#[derive(Clone)]
pub struct FeedbackRepository {
    pool: Pool<Postgres>,
}

impl FeedbackRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: i32, message: &str, now: DateTime<Utc>) -> AppResult<Feedback> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO feedback (user_id, message, date_sent, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(message)
        .bind(now)
        .bind(FeedbackStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Feedback> {
        let query = format!("{} WHERE f.id = $1", FEEDBACK_SELECT);
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Feedback {} not found", id)))
    }

    /// Newest first, optionally restricted to one sender
    pub async fn list(&self, user_id: Option<i32>) -> AppResult<Vec<Feedback>> {
        let feedback = match user_id {
            Some(user_id) => {
                let query = format!("{} WHERE f.user_id = $1 ORDER BY f.date_sent DESC", FEEDBACK_SELECT);
                sqlx::query_as::<_, Feedback>(&query)
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!("{} ORDER BY f.date_sent DESC", FEEDBACK_SELECT);
                sqlx::query_as::<_, Feedback>(&query)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(feedback)
    }

    pub async fn reply(&self, id: i32, reply: &str) -> AppResult<Feedback> {
        let result = sqlx::query("UPDATE feedback SET admin_reply = $1, status = $2 WHERE id = $3")
            .bind(reply)
            .bind(FeedbackStatus::Replied)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Feedback {} not found", id)));
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Feedback {} not found", id)));
        }
        Ok(())
    }
}
