//! Loan workflow service

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{LoanFilter, LoanRequestOutcome, LoanRules, LoanStatus, LoanTransaction, LoanView},
        user::UserClaims,
    },
    repository::LoanStore,
};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn LoanStore>,
    rules: LoanRules,
    clock: Clock,
}

impl LoansService {
    pub fn new(store: Arc<dyn LoanStore>, rules: LoanRules) -> Self {
        Self {
            store,
            rules,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, every timestamp the service records comes from it
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Recompute stored fines; failures are logged and never block a read
    async fn refresh_fines(&self) {
        match self.store.recalculate_fines(self.now()).await {
            Ok(0) => {}
            Ok(changed) => tracing::debug!("Fine sweep updated {} loans", changed),
            Err(e) => tracing::warn!("Fine sweep failed, serving stored fines: {}", e),
        }
    }

    /// Request a copy of a book for the calling member
    pub async fn request_loan(&self, user_id: i32, book_id: i32) -> AppResult<LoanRequestOutcome> {
        let outcome = self.store.create_request(book_id, user_id, self.now()).await?;
        tracing::info!(
            "Loan {} requested by user {} for book {} ({} left)",
            outcome.loan.id,
            user_id,
            book_id,
            outcome.available_stock
        );
        Ok(outcome)
    }

    /// Loan history of one member, newest first
    pub async fn member_loans(&self, user_id: i32) -> AppResult<Vec<LoanView>> {
        self.refresh_fines().await;
        self.store
            .list_loans(&LoanFilter {
                user_id: Some(user_id),
                status: None,
            })
            .await
    }

    pub async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanView>> {
        self.refresh_fines().await;
        self.store.list_loans(filter).await
    }

    /// Single loan, visible to its owner and to administrators
    pub async fn get_loan(&self, claims: &UserClaims, id: i32) -> AppResult<LoanView> {
        self.refresh_fines().await;
        let view = self.store.get_loan(id).await?;
        if !claims.is_admin() && view.loan.user_id != claims.user_id {
            return Err(AppError::NotFound(format!("Loan with id {} not found", id)));
        }
        Ok(view)
    }

    /// Administrative status change
    pub async fn update_status(&self, id: i32, target: LoanStatus) -> AppResult<LoanTransaction> {
        let loan = self.store.transition(id, target, &self.rules, self.now()).await?;
        tracing::info!("Loan {} moved to {}", id, loan.status);
        Ok(loan)
    }

    /// Member cancels their own pending request
    pub async fn cancel_request(&self, user_id: i32, id: i32) -> AppResult<LoanTransaction> {
        let loan = self
            .store
            .cancel_request(id, user_id, &self.rules, self.now())
            .await?;
        tracing::info!("Loan {} canceled by user {}", id, user_id);
        Ok(loan)
    }
}
