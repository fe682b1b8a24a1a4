//! Loan transactions repository
//!
//! Every multi-step effect (stock reservation plus insert, transition plus
//! stock restore) runs inside one database transaction and rolls back when
//! any step fails.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, Transaction as PgTransaction};

use crate::{
    error::{AppError, AppResult},
    models::loan::{
        LoanFilter, LoanRequestOutcome, LoanRules, LoanStatus, LoanTransaction, LoanView,
        Transition,
    },
};

/// Storage of loan transactions and the stock they reserve
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Reserve one copy of `book_id` and record a pending request
    async fn create_request(
        &self,
        book_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<LoanRequestOutcome>;

    async fn get_loan(&self, id: i32) -> AppResult<LoanView>;

    /// Apply an administrative transition atomically with its stock effect
    async fn transition(
        &self,
        id: i32,
        target: LoanStatus,
        rules: &LoanRules,
        now: DateTime<Utc>,
    ) -> AppResult<LoanTransaction>;

    /// Cancel a member's own pending request
    async fn cancel_request(
        &self,
        id: i32,
        user_id: i32,
        rules: &LoanRules,
        now: DateTime<Utc>,
    ) -> AppResult<LoanTransaction>;

    /// Newest requests first
    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanView>>;

    /// Recompute fines of borrowed and returned loans, returns the number of
    /// rows whose fine changed
    async fn recalculate_fines(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

const LOAN_VIEW_SELECT: &str = r#"
    SELECT l.*, b.title AS book_title, b.cover_file, b.fine_amount AS book_fine_amount,
           u.username
    FROM loan_transactions l
    JOIN books b ON b.id = l.book_id
    JOIN users u ON u.id = l.user_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Lock a loan row until the surrounding transaction ends
    async fn lock_loan(
        tx: &mut PgTransaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<LoanTransaction> {
        sqlx::query_as::<_, LoanTransaction>(
            "SELECT * FROM loan_transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Persist a computed transition and its stock effect
    async fn apply(
        tx: &mut PgTransaction<'_, Postgres>,
        transition: &Transition,
    ) -> AppResult<LoanTransaction> {
        let loan = &transition.loan;
        let updated = sqlx::query_as::<_, LoanTransaction>(
            r#"
            UPDATE loan_transactions SET
                status = $2,
                date_approved = $3,
                date_borrowed = $4,
                date_due = $5,
                date_returned = $6,
                date_rejected = $7,
                date_canceled = $8,
                date_lost = $9,
                fine_total = $10,
                fine_per_day = $11,
                first_fine = $12
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(loan.status)
        .bind(loan.date_approved)
        .bind(loan.date_borrowed)
        .bind(loan.date_due)
        .bind(loan.date_returned)
        .bind(loan.date_rejected)
        .bind(loan.date_canceled)
        .bind(loan.date_lost)
        .bind(loan.fine_total)
        .bind(loan.fine_per_day)
        .bind(loan.first_fine)
        .fetch_one(&mut **tx)
        .await?;

        if transition.restores_stock {
            sqlx::query(
                r#"
                UPDATE books
                SET available_stock = LEAST(available_stock + 1, total_stock)
                WHERE id = $1
                "#,
            )
            .bind(loan.book_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(updated)
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn create_request(
        &self,
        book_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<LoanRequestOutcome> {
        let mut tx = self.pool.begin().await?;

        let book_title: String = sqlx::query_scalar("SELECT title FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let pending: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM loan_transactions
                WHERE book_id = $1 AND user_id = $2 AND status = $3
            )
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(LoanStatus::Requested)
        .fetch_one(&mut *tx)
        .await?;

        if pending {
            return Err(AppError::Conflict(
                "You already have a pending request for this book".to_string(),
            ));
        }

        let available_stock: i32 = sqlx::query_scalar(
            r#"
            UPDATE books SET available_stock = available_stock - 1
            WHERE id = $1 AND available_stock > 0
            RETURNING available_stock
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("\"{}\" is out of stock", book_title)))?;

        let loan = sqlx::query_as::<_, LoanTransaction>(
            r#"
            INSERT INTO loan_transactions (book_id, user_id, status, date_requested)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(LoanStatus::Requested)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("You already have a pending request for this book".to_string())
            }
            other => AppError::Database(other),
        })?;

        tx.commit().await?;

        Ok(LoanRequestOutcome {
            loan,
            book_title,
            available_stock,
        })
    }

    async fn get_loan(&self, id: i32) -> AppResult<LoanView> {
        let query = format!("{} WHERE l.id = $1", LOAN_VIEW_SELECT);
        sqlx::query_as::<_, LoanView>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn transition(
        &self,
        id: i32,
        target: LoanStatus,
        rules: &LoanRules,
        now: DateTime<Utc>,
    ) -> AppResult<LoanTransaction> {
        let mut tx = self.pool.begin().await?;
        let loan = Self::lock_loan(&mut tx, id).await?;

        let book_fine: Decimal = sqlx::query_scalar("SELECT fine_amount FROM books WHERE id = $1")
            .bind(loan.book_id)
            .fetch_optional(&mut *tx)
            .await?
            .unwrap_or(Decimal::ZERO);

        let transition = loan.transition(target, rules, book_fine, now)?;
        let updated = Self::apply(&mut tx, &transition).await?;
        tx.commit().await?;

        Ok(updated)
    }

    async fn cancel_request(
        &self,
        id: i32,
        user_id: i32,
        rules: &LoanRules,
        now: DateTime<Utc>,
    ) -> AppResult<LoanTransaction> {
        let mut tx = self.pool.begin().await?;
        let loan = Self::lock_loan(&mut tx, id).await?;

        let transition = loan.cancel_by_member(user_id, rules, now)?;
        let updated = Self::apply(&mut tx, &transition).await?;
        tx.commit().await?;

        Ok(updated)
    }

    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanView>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if filter.user_id.is_some() {
            conditions.push(format!("l.user_id = ${}", idx));
            idx += 1;
        }
        if filter.status.is_some() {
            conditions.push(format!("l.status = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "{} {} ORDER BY l.date_requested DESC, l.id DESC",
            LOAN_VIEW_SELECT, where_clause
        );

        let mut builder = sqlx::query_as::<_, LoanView>(&query);
        if let Some(user_id) = filter.user_id {
            builder = builder.bind(user_id);
        }
        if let Some(status) = filter.status {
            builder = builder.bind(status);
        }

        Ok(builder.fetch_all(&self.pool).await?)
    }

    async fn recalculate_fines(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;

        // Rows held by an in-flight transition are skipped, the transition
        // computes its own fine.
        let candidates = sqlx::query_as::<_, LoanTransaction>(
            r#"
            SELECT * FROM loan_transactions
            WHERE date_due IS NOT NULL
              AND (status = $1 OR (status = $2 AND date_returned IS NOT NULL))
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(LoanStatus::Borrowed)
        .bind(LoanStatus::Returned)
        .fetch_all(&mut *tx)
        .await?;

        let (ids, fines): (Vec<i32>, Vec<Decimal>) = candidates
            .iter()
            .filter_map(|loan| {
                loan.refreshed_fine(now)
                    .filter(|fine| *fine != loan.fine_total)
                    .map(|fine| (loan.id, fine))
            })
            .unzip();

        if ids.is_empty() {
            tx.commit().await?;
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE loan_transactions AS l
            SET fine_total = v.fine
            FROM UNNEST($1::int4[], $2::numeric[]) AS v(id, fine)
            WHERE l.id = v.id
            "#,
        )
        .bind(ids)
        .bind(fines)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Recalculated fines of {} loans", result.rows_affected());
        Ok(result.rows_affected())
    }
}
