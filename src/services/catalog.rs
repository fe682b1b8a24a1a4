//! Catalog management service

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, BookShort, CreateBook, UpdateBook},
    repository::Repository,
};

/// Number of titles returned by the random pick
pub const RANDOM_PICK_SIZE: i64 = 5;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list(query).await
    }

    pub async fn random_books(&self) -> AppResult<Vec<BookShort>> {
        self.repository.books.random(RANDOM_PICK_SIZE).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, data: CreateBook) -> AppResult<Book> {
        let book = self.repository.books.create(&data).await?;
        tracing::info!("Book {} created with {} copies", book.id, book.total_stock);
        Ok(book)
    }

    pub async fn update_book(&self, id: i32, data: UpdateBook) -> AppResult<Book> {
        let book = self.repository.books.update(id, &data).await?;
        tracing::info!(
            "Book {} updated, stock {}/{}",
            id,
            book.available_stock,
            book.total_stock
        );
        Ok(book)
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }
}
