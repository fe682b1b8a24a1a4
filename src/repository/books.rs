//! Books (catalog) repository

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use super::contains_pattern;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookShort, BookType, CreateBook, UpdateBook},
        loan::LoanStatus,
    },
};

/// Wire names of the statuses still holding a copy or a reservation
pub(crate) fn open_loan_statuses() -> Vec<String> {
    LoanStatus::ALL
        .iter()
        .filter(|s| !s.is_terminal())
        .map(|s| s.as_str().to_string())
        .collect()
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search books, newest first
    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let types = query.matching_types()?;
        let genres = query.genres();
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| contains_pattern(&s.to_lowercase()));
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut conditions = Vec::new();
        let mut idx = 1;

        if search.is_some() {
            conditions.push(format!(
                "(LOWER(title) LIKE ${0} ESCAPE '\\' OR LOWER(COALESCE(author, '')) LIKE ${0} ESCAPE '\\')",
                idx
            ));
            idx += 1;
        }
        if types.is_some() {
            conditions.push(format!("book_type = ANY(${})", idx));
            idx += 1;
        }
        if category.is_some() {
            conditions.push(format!("category = ${}", idx));
            idx += 1;
        }
        for _ in &genres {
            conditions.push(format!("genre ILIKE ${} ESCAPE '\\'", idx));
            idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_q = format!(
            "SELECT * FROM books {} ORDER BY created_at DESC, id DESC",
            where_clause
        );

        let mut builder = sqlx::query_as::<_, Book>(&select_q);
        if let Some(pattern) = search {
            builder = builder.bind(pattern);
        }
        if let Some(types) = types {
            let names: Vec<String> = types.iter().map(|t| t.as_str().to_string()).collect();
            builder = builder.bind(names);
        }
        if let Some(category) = category {
            builder = builder.bind(category.to_string());
        }
        for genre in genres {
            builder = builder.bind(contains_pattern(&genre));
        }

        Ok(builder.fetch_all(&self.pool).await?)
    }

    pub async fn random(&self, limit: i64) -> AppResult<Vec<BookShort>> {
        let books = sqlx::query_as::<_, BookShort>(
            r#"
            SELECT id, title, author, description AS synopsis, cover_file
            FROM books
            ORDER BY RANDOM()
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Create a book with every copy available
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, author, isbn, publisher, year, genre, category, book_type,
                location, total_stock, available_stock, fine_amount,
                description, cover_file, ebook_file
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.isbn)
        .bind(&data.publisher)
        .bind(data.year)
        .bind(&data.genre)
        .bind(&data.category)
        .bind(data.book_type.unwrap_or(BookType::Physical))
        .bind(&data.location)
        .bind(data.total_stock)
        .bind(data.fine_amount.unwrap_or(Decimal::ZERO))
        .bind(&data.description)
        .bind(&data.cover_file)
        .bind(&data.ebook_file)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    /// Update a book; a new total re-provisions the stock ledger
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let ledger = match data.total_stock {
            Some(total) => current.ledger().reprovision(total)?,
            None => current.ledger(),
        };

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                publisher = COALESCE($5, publisher),
                year = COALESCE($6, year),
                genre = COALESCE($7, genre),
                category = COALESCE($8, category),
                book_type = COALESCE($9, book_type),
                location = COALESCE($10, location),
                total_stock = $11,
                available_stock = $12,
                fine_amount = COALESCE($13, fine_amount),
                description = COALESCE($14, description),
                cover_file = COALESCE($15, cover_file),
                ebook_file = COALESCE($16, ebook_file)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.isbn)
        .bind(&data.publisher)
        .bind(data.year)
        .bind(&data.genre)
        .bind(&data.category)
        .bind(data.book_type)
        .bind(&data.location)
        .bind(ledger.total)
        .bind(ledger.available)
        .bind(data.fine_amount)
        .bind(&data.description)
        .bind(&data.cover_file)
        .bind(&data.ebook_file)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(book)
    }

    /// Delete a book that no open loan refers to
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let open_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loan_transactions WHERE book_id = $1 AND status = ANY($2)",
        )
        .bind(id)
        .bind(open_loan_statuses())
        .fetch_one(&mut *tx)
        .await?;

        if open_loans > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} still has {} open loans",
                id, open_loans
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
