//! Data models for Pustaka

pub mod book;
pub mod datetime;
pub mod feedback;
pub mod fine;
pub mod loan;
pub mod reading;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookShort, BookType, StockLedger};
pub use feedback::{Feedback, FeedbackStatus};
pub use fine::FinePolicy;
pub use loan::{LoanFilter, LoanRules, LoanStatus, LoanTransaction, LoanView, Transition};
pub use reading::{BookmarkedBook, HistoryItem, ReadingProgress};
pub use user::{Role, User, UserClaims};
