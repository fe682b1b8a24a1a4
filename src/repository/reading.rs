//! Reading progress and bookmarks repository

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::reading::{BookmarkedBook, HistoryItem, ReadingProgress},
};

#[derive(Clone)]
pub struct ReadingRepository {
    pool: Pool<Postgres>,
}

impl ReadingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert or update the last page read
    pub async fn save_progress(
        &self,
        user_id: i32,
        book_id: i32,
        page: i32,
        now: DateTime<Utc>,
    ) -> AppResult<ReadingProgress> {
        let progress = sqlx::query_as::<_, ReadingProgress>(
            r#"
            INSERT INTO reading_progress (user_id, book_id, last_page, date_last_read)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, book_id)
            DO UPDATE SET last_page = EXCLUDED.last_page, date_last_read = EXCLUDED.date_last_read
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(page)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(progress)
    }

    pub async fn last_page(&self, user_id: i32, book_id: i32) -> AppResult<Option<i32>> {
        let page = sqlx::query_scalar(
            "SELECT last_page FROM reading_progress WHERE user_id = $1 AND book_id = $2",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(page)
    }

    /// Most recently read first
    pub async fn history(&self, user_id: i32) -> AppResult<Vec<HistoryItem>> {
        let items = sqlx::query_as::<_, HistoryItem>(
            r#"
            SELECT r.id, r.book_id, b.title, b.author, b.cover_file,
                   r.last_page, r.date_last_read
            FROM reading_progress r
            JOIN books b ON b.id = r.book_id
            WHERE r.user_id = $1
            ORDER BY r.date_last_read DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn delete_history(&self, id: i32, user_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM reading_progress WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("History entry {} not found", id)));
        }
        Ok(())
    }

    /// Adding an existing bookmark is a no-op
    pub async fn add_bookmark(&self, user_id: i32, book_id: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookmarks (user_id, book_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, book_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_bookmark(&self, user_id: i32, book_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} is not bookmarked", book_id)));
        }
        Ok(())
    }

    pub async fn is_bookmarked(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let bookmarked = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bookmarks WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(bookmarked)
    }

    pub async fn bookmarks(&self, user_id: i32) -> AppResult<Vec<BookmarkedBook>> {
        let books = sqlx::query_as::<_, BookmarkedBook>(
            r#"
            SELECT m.book_id, b.title, b.author, b.cover_file, m.created_at
            FROM bookmarks m
            JOIN books b ON b.id = m.book_id
            WHERE m.user_id = $1
            ORDER BY m.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }
}
