//! Ebook reading progress and bookmarks service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::reading::{BookmarkStatus, BookmarkedBook, HistoryItem, LastPage, ReadingProgress, SaveProgress},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReadingService {
    repository: Repository,
}

impl ReadingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    async fn require_book(&self, book_id: i32) -> AppResult<()> {
        if self.repository.books.exists(book_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Book with id {} not found", book_id)))
        }
    }

    pub async fn save_progress(&self, user_id: i32, data: &SaveProgress) -> AppResult<ReadingProgress> {
        self.require_book(data.book_id).await?;
        self.repository
            .reading
            .save_progress(user_id, data.book_id, data.page, Utc::now())
            .await
    }

    pub async fn last_page(&self, user_id: i32, book_id: i32) -> AppResult<LastPage> {
        let last_page = self
            .repository
            .reading
            .last_page(user_id, book_id)
            .await?
            .unwrap_or(0);
        Ok(LastPage { book_id, last_page })
    }

    pub async fn history(&self, user_id: i32) -> AppResult<Vec<HistoryItem>> {
        self.repository.reading.history(user_id).await
    }

    pub async fn delete_history(&self, user_id: i32, id: i32) -> AppResult<()> {
        self.repository.reading.delete_history(id, user_id).await
    }

    pub async fn add_bookmark(&self, user_id: i32, book_id: i32) -> AppResult<BookmarkStatus> {
        self.require_book(book_id).await?;
        self.repository.reading.add_bookmark(user_id, book_id).await?;
        Ok(BookmarkStatus {
            book_id,
            bookmarked: true,
        })
    }

    pub async fn remove_bookmark(&self, user_id: i32, book_id: i32) -> AppResult<()> {
        self.repository.reading.remove_bookmark(user_id, book_id).await
    }

    pub async fn bookmark_status(&self, user_id: i32, book_id: i32) -> AppResult<BookmarkStatus> {
        let bookmarked = self.repository.reading.is_bookmarked(user_id, book_id).await?;
        Ok(BookmarkStatus { book_id, bookmarked })
    }

    pub async fn bookmarks(&self, user_id: i32) -> AppResult<Vec<BookmarkedBook>> {
        self.repository.reading.bookmarks(user_id).await
    }
}
