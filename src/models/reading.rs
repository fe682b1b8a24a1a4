//! Ebook reading progress and bookmarks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Last page read per user and book
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ReadingProgress {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub last_page: i32,
    #[serde(with = "crate::models::datetime")]
    #[schema(value_type = String, example = "2025-01-08 14:30:00")]
    pub date_last_read: DateTime<Utc>,
}

/// Reading history entry with book details
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct HistoryItem {
    pub id: i32,
    pub book_id: i32,
    pub title: String,
    pub author: Option<String>,
    pub cover_file: Option<String>,
    pub last_page: i32,
    #[serde(with = "crate::models::datetime")]
    #[schema(value_type = String, example = "2025-01-08 14:30:00")]
    pub date_last_read: DateTime<Utc>,
}

/// Save progress request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaveProgress {
    pub book_id: i32,
    #[validate(range(min = 0, message = "Page cannot be negative"))]
    pub page: i32,
}

/// Progress lookup parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ProgressQuery {
    pub book_id: i32,
}

/// Last page read, 0 when the book was never opened
#[derive(Debug, Serialize, ToSchema)]
pub struct LastPage {
    pub book_id: i32,
    pub last_page: i32,
}

/// Bookmark request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddBookmark {
    pub book_id: i32,
}

/// Bookmarked book
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookmarkedBook {
    pub book_id: i32,
    pub title: String,
    pub author: Option<String>,
    pub cover_file: Option<String>,
    #[serde(with = "crate::models::datetime")]
    #[schema(value_type = String, example = "2025-01-08 14:30:00")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookmarkStatus {
    pub book_id: i32,
    pub bookmarked: bool,
}
