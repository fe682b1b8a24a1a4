//! Book (catalog) model and stock ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Physical/digital availability of a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BookType {
    #[serde(rename = "Buku Fisik")]
    Physical,
    #[serde(rename = "Ebook")]
    Ebook,
    #[serde(rename = "Fisik & Ebook")]
    PhysicalAndEbook,
}

impl BookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookType::Physical => "Buku Fisik",
            BookType::Ebook => "Ebook",
            BookType::PhysicalAndEbook => "Fisik & Ebook",
        }
    }
}

impl std::fmt::Display for BookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buku fisik" | "physical" => Ok(BookType::Physical),
            "ebook" => Ok(BookType::Ebook),
            "fisik & ebook" | "physical_and_ebook" => Ok(BookType::PhysicalAndEbook),
            _ => Err(format!("Invalid book type: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for BookType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for BookType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BookType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Book model from database
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub category: Option<String>,
    pub book_type: BookType,
    pub location: Option<String>,
    /// Copies owned by the library
    pub total_stock: i32,
    /// Copies currently loanable
    pub available_stock: i32,
    /// Flat fine charged when a copy is lost
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub fine_amount: Decimal,
    pub description: Option<String>,
    pub cover_file: Option<String>,
    pub ebook_file: Option<String>,
    #[serde(with = "crate::models::datetime")]
    #[schema(value_type = String, example = "2025-01-08 14:30:00")]
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn ledger(&self) -> StockLedger {
        StockLedger {
            available: self.available_stock,
            total: self.total_stock,
        }
    }
}

/// Short book representation used by random picks
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub synopsis: Option<String>,
    pub cover_file: Option<String>,
}

/// Available/total copies of one title.
///
/// Values only change through `take` (a loan request), `restore` (a copy
/// coming back or a request released) and `reprovision` (catalog edit of
/// the total).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLedger {
    pub available: i32,
    pub total: i32,
}

impl StockLedger {
    pub fn new(total: i32) -> Self {
        Self {
            available: total,
            total,
        }
    }

    /// Reserve one copy, `None` when nothing is left
    pub fn take(self) -> Option<Self> {
        (self.available > 0).then(|| Self {
            available: self.available - 1,
            ..self
        })
    }

    /// Give one copy back; never exceeds the total
    pub fn restore(self) -> Self {
        Self {
            available: (self.available + 1).min(self.total),
            ..self
        }
    }

    pub fn on_loan(&self) -> i32 {
        self.total - self.available
    }

    /// Change the owned total while keeping copies on loan accounted for
    pub fn reprovision(self, new_total: i32) -> AppResult<Self> {
        if new_total < 0 {
            return Err(AppError::Validation("Stock cannot be negative".to_string()));
        }
        let on_loan = self.on_loan();
        if new_total < on_loan {
            return Err(AppError::Conflict(format!(
                "{} copies are currently reserved or on loan, stock cannot go below that",
                on_loan
            )));
        }
        Ok(Self {
            available: new_total - on_loan,
            total: new_total,
        })
    }
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive match on title or author
    pub search: Option<String>,
    /// Book type ("Buku Fisik", "Ebook", "Fisik & Ebook")
    #[serde(rename = "type")]
    pub book_type: Option<String>,
    pub category: Option<String>,
    /// Comma separated genre tags, all must match
    pub genre: Option<String>,
}

impl BookQuery {
    /// Book types a `type` filter should match: physical and ebook
    /// filters also include titles available in both forms.
    pub fn matching_types(&self) -> AppResult<Option<Vec<BookType>>> {
        let Some(raw) = self.book_type.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let book_type: BookType = raw.parse().map_err(AppError::Validation)?;
        Ok(Some(match book_type {
            BookType::PhysicalAndEbook => vec![BookType::PhysicalAndEbook],
            other => vec![other, BookType::PhysicalAndEbook],
        }))
    }

    pub fn genres(&self) -> Vec<String> {
        self.genre
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub category: Option<String>,
    pub book_type: Option<BookType>,
    pub location: Option<String>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub total_stock: i32,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub fine_amount: Option<Decimal>,
    pub description: Option<String>,
    pub cover_file: Option<String>,
    pub ebook_file: Option<String>,
}

/// Update book request, absent fields are left untouched
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub category: Option<String>,
    pub book_type: Option<BookType>,
    pub location: Option<String>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub total_stock: Option<i32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub fine_amount: Option<Decimal>,
    pub description: Option<String>,
    pub cover_file: Option<String>,
    pub ebook_file: Option<String>,
}
