//! Business logic services

pub mod catalog;
pub mod feedback;
pub mod loans;
pub mod reading;
pub mod users;

use std::sync::Arc;

use crate::{config::AppConfig, models::loan::LoanRules, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
    pub reading: reading::ReadingService,
    pub feedback: feedback::FeedbackService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let loan_store = Arc::new(repository.loans.clone());
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            loans: loans::LoansService::new(loan_store, LoanRules::from(&config.loans)),
            reading: reading::ReadingService::new(repository.clone()),
            feedback: feedback::FeedbackService::new(repository),
        }
    }
}
