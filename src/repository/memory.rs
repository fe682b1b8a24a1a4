//! In-memory loan store used by service tests

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::StockLedger,
        loan::{
            LoanFilter, LoanRequestOutcome, LoanRules, LoanStatus, LoanTransaction, LoanView,
            Transition,
        },
    },
};

use super::loans::LoanStore;

#[derive(Debug, Clone)]
struct StoredBook {
    title: String,
    ledger: StockLedger,
    fine_amount: Decimal,
}

#[derive(Default)]
struct State {
    books: HashMap<i32, StoredBook>,
    loans: BTreeMap<i32, LoanTransaction>,
    next_id: i32,
}

impl State {
    fn apply(&mut self, transition: Transition) -> LoanTransaction {
        let loan = transition.loan;
        if transition.restores_stock {
            if let Some(book) = self.books.get_mut(&loan.book_id) {
                book.ledger = book.ledger.restore();
            }
        }
        self.loans.insert(loan.id, loan.clone());
        loan
    }

    fn view(&self, loan: &LoanTransaction) -> LoanView {
        let book = self.books.get(&loan.book_id);
        LoanView {
            loan: loan.clone(),
            book_title: book.map(|b| b.title.clone()).unwrap_or_default(),
            cover_file: None,
            book_fine_amount: book.map(|b| b.fine_amount).unwrap_or_default(),
            username: format!("member{}", loan.user_id),
        }
    }
}

#[derive(Default)]
pub struct MemoryLoanStore {
    state: Mutex<State>,
}

impl MemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_book(&self, id: i32, title: &str, total_stock: i32, fine_amount: Decimal) {
        self.state.lock().await.books.insert(
            id,
            StoredBook {
                title: title.to_string(),
                ledger: StockLedger::new(total_stock),
                fine_amount,
            },
        );
    }

    pub async fn stock(&self, book_id: i32) -> Option<StockLedger> {
        self.state.lock().await.books.get(&book_id).map(|b| b.ledger)
    }

    /// Store a loan as is, bypassing the lifecycle
    pub async fn put_loan(&self, loan: LoanTransaction) {
        let mut state = self.state.lock().await;
        state.next_id = state.next_id.max(loan.id);
        state.loans.insert(loan.id, loan);
    }

    pub async fn raw_loan(&self, id: i32) -> Option<LoanTransaction> {
        self.state.lock().await.loans.get(&id).cloned()
    }
}

#[async_trait]
impl LoanStore for MemoryLoanStore {
    async fn create_request(
        &self,
        book_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<LoanRequestOutcome> {
        let mut state = self.state.lock().await;

        let book = state
            .books
            .get(&book_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let pending = state.loans.values().any(|l| {
            l.book_id == book_id && l.user_id == user_id && l.status == LoanStatus::Requested
        });
        if pending {
            return Err(AppError::Conflict(
                "You already have a pending request for this book".to_string(),
            ));
        }

        let ledger = book
            .ledger
            .take()
            .ok_or_else(|| AppError::Conflict(format!("\"{}\" is out of stock", book.title)))?;

        state.next_id += 1;
        let loan = LoanTransaction::requested(state.next_id, book_id, user_id, now);
        state.loans.insert(loan.id, loan.clone());
        if let Some(stored) = state.books.get_mut(&book_id) {
            stored.ledger = ledger;
        }

        Ok(LoanRequestOutcome {
            loan,
            book_title: book.title,
            available_stock: ledger.available,
        })
    }

    async fn get_loan(&self, id: i32) -> AppResult<LoanView> {
        let state = self.state.lock().await;
        state
            .loans
            .get(&id)
            .map(|loan| state.view(loan))
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn transition(
        &self,
        id: i32,
        target: LoanStatus,
        rules: &LoanRules,
        now: DateTime<Utc>,
    ) -> AppResult<LoanTransaction> {
        let mut state = self.state.lock().await;
        let loan = state
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        let book_fine = state
            .books
            .get(&loan.book_id)
            .map(|b| b.fine_amount)
            .unwrap_or(Decimal::ZERO);

        let transition = loan.transition(target, rules, book_fine, now)?;
        Ok(state.apply(transition))
    }

    async fn cancel_request(
        &self,
        id: i32,
        user_id: i32,
        rules: &LoanRules,
        now: DateTime<Utc>,
    ) -> AppResult<LoanTransaction> {
        let mut state = self.state.lock().await;
        let loan = state
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        let transition = loan.cancel_by_member(user_id, rules, now)?;
        Ok(state.apply(transition))
    }

    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanView>> {
        let state = self.state.lock().await;
        let mut views: Vec<LoanView> = state
            .loans
            .values()
            .filter(|l| filter.user_id.map_or(true, |u| l.user_id == u))
            .filter(|l| filter.status.map_or(true, |s| l.status == s))
            .map(|l| state.view(l))
            .collect();
        views.sort_by(|a, b| {
            b.loan
                .date_requested
                .cmp(&a.loan.date_requested)
                .then(b.loan.id.cmp(&a.loan.id))
        });
        Ok(views)
    }

    async fn recalculate_fines(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut changed = 0;
        for loan in state.loans.values_mut() {
            if let Some(fine) = loan.refreshed_fine(now) {
                if fine != loan.fine_total {
                    loan.fine_total = fine;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}
