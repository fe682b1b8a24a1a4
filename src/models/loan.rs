//! Loan transaction model and its lifecycle.
//!
//! Every status change goes through [`LoanTransaction::transition`], which
//! checks the transition table and returns the updated record together with
//! the stock effect. Storage backends apply that result atomically; they
//! never decide transitions on their own.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::fine::FinePolicy,
};

/// Loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum LoanStatus {
    #[serde(rename = "DIAJUKAN")]
    Requested,
    #[serde(rename = "DISETUJUI")]
    Approved,
    #[serde(rename = "DIPINJAM")]
    Borrowed,
    #[serde(rename = "DIKEMBALIKAN")]
    Returned,
    #[serde(rename = "DITOLAK")]
    Rejected,
    #[serde(rename = "DIBATALKAN")]
    Canceled,
    #[serde(rename = "HILANG")]
    Lost,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 7] = [
        LoanStatus::Requested,
        LoanStatus::Approved,
        LoanStatus::Borrowed,
        LoanStatus::Returned,
        LoanStatus::Rejected,
        LoanStatus::Canceled,
        LoanStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Requested => "DIAJUKAN",
            LoanStatus::Approved => "DISETUJUI",
            LoanStatus::Borrowed => "DIPINJAM",
            LoanStatus::Returned => "DIKEMBALIKAN",
            LoanStatus::Rejected => "DITOLAK",
            LoanStatus::Canceled => "DIBATALKAN",
            LoanStatus::Lost => "HILANG",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Returned | LoanStatus::Rejected | LoanStatus::Canceled | LoanStatus::Lost
        )
    }

    /// Statuses a loan must be in to move to `self`.
    ///
    /// `None` means `self` is not a valid transition target at all.
    pub fn allowed_sources(&self) -> Option<&'static [LoanStatus]> {
        use LoanStatus::*;
        match self {
            Requested => None,
            Approved => Some(&[Requested]),
            Borrowed => Some(&[Approved]),
            Rejected | Canceled => Some(&[Requested, Approved]),
            Returned | Lost => Some(&[Borrowed]),
        }
    }

    /// Whether reaching `self` gives the reserved copy back to the shelf
    pub fn restores_stock(&self) -> bool {
        matches!(self, LoanStatus::Rejected | LoanStatus::Canceled | LoanStatus::Returned)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DIAJUKAN" | "REQUESTED" => Ok(LoanStatus::Requested),
            "DISETUJUI" | "APPROVED" => Ok(LoanStatus::Approved),
            "DIPINJAM" | "BORROWED" => Ok(LoanStatus::Borrowed),
            "DIKEMBALIKAN" | "RETURNED" => Ok(LoanStatus::Returned),
            "DITOLAK" | "REJECTED" => Ok(LoanStatus::Rejected),
            "DIBATALKAN" | "CANCELED" | "CANCELLED" => Ok(LoanStatus::Canceled),
            "HILANG" | "LOST" => Ok(LoanStatus::Lost),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Rules the lifecycle needs beyond the loan itself
#[derive(Debug, Clone, Copy)]
pub struct LoanRules {
    pub loan_duration: Duration,
    /// Rates snapshotted into a loan when it is handed over
    pub fines: FinePolicy,
}

impl From<&LoansConfig> for LoanRules {
    fn from(config: &LoansConfig) -> Self {
        Self {
            loan_duration: Duration::days(config.loan_duration_days),
            fines: FinePolicy::from(config),
        }
    }
}

impl Default for LoanRules {
    fn default() -> Self {
        Self::from(&LoansConfig::default())
    }
}

/// Loan transaction from database
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct LoanTransaction {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub status: LoanStatus,
    #[serde(with = "crate::models::datetime")]
    #[schema(value_type = String, example = "2025-01-08 14:30:00")]
    pub date_requested: DateTime<Utc>,
    #[serde(with = "crate::models::datetime::option")]
    #[schema(value_type = Option<String>)]
    pub date_approved: Option<DateTime<Utc>>,
    #[serde(with = "crate::models::datetime::option")]
    #[schema(value_type = Option<String>)]
    pub date_borrowed: Option<DateTime<Utc>>,
    #[serde(with = "crate::models::datetime::option")]
    #[schema(value_type = Option<String>)]
    pub date_due: Option<DateTime<Utc>>,
    #[serde(with = "crate::models::datetime::option")]
    #[schema(value_type = Option<String>)]
    pub date_returned: Option<DateTime<Utc>>,
    #[serde(with = "crate::models::datetime::option")]
    #[schema(value_type = Option<String>)]
    pub date_rejected: Option<DateTime<Utc>>,
    #[serde(with = "crate::models::datetime::option")]
    #[schema(value_type = Option<String>)]
    pub date_canceled: Option<DateTime<Utc>>,
    #[serde(with = "crate::models::datetime::option")]
    #[schema(value_type = Option<String>)]
    pub date_lost: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub fine_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub fine_per_day: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub first_fine: Decimal,
}

/// Result of a lifecycle step, ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub loan: LoanTransaction,
    /// One reserved copy goes back to the available stock
    pub restores_stock: bool,
}

impl LoanTransaction {
    /// A fresh request as stored before the database assigns an id
    pub fn requested(id: i32, book_id: i32, user_id: i32, now: DateTime<Utc>) -> Self {
        Self {
            id,
            book_id,
            user_id,
            status: LoanStatus::Requested,
            date_requested: now,
            date_approved: None,
            date_borrowed: None,
            date_due: None,
            date_returned: None,
            date_rejected: None,
            date_canceled: None,
            date_lost: None,
            fine_total: Decimal::ZERO,
            fine_per_day: Decimal::ZERO,
            first_fine: Decimal::ZERO,
        }
    }

    /// Rates this loan was handed over with
    pub fn fine_policy(&self) -> FinePolicy {
        FinePolicy::new(self.first_fine, self.fine_per_day)
    }

    /// Fine the recalculation sweep should store, `None` when the loan is
    /// not subject to recalculation
    pub fn refreshed_fine(&self, now: DateTime<Utc>) -> Option<Decimal> {
        let due = self.date_due?;
        match self.status {
            LoanStatus::Borrowed => Some(self.fine_policy().fine_for(due, now)),
            LoanStatus::Returned => {
                let returned = self.date_returned?;
                Some(self.fine_policy().fine_for(due, returned))
            }
            _ => None,
        }
    }

    /// Apply one step of the lifecycle.
    ///
    /// `lost_book_fine` is the flat fine of the borrowed title, only used
    /// when `target` is [`LoanStatus::Lost`].
    pub fn transition(
        &self,
        target: LoanStatus,
        rules: &LoanRules,
        lost_book_fine: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<Transition> {
        let sources = target.allowed_sources().ok_or_else(|| {
            AppError::Validation(format!("{} is not a valid target status", target))
        })?;

        if !sources.contains(&self.status) {
            return Err(AppError::Conflict(format!(
                "Loan {} cannot move from {} to {}",
                self.id, self.status, target
            )));
        }

        let mut loan = self.clone();
        loan.status = target;

        match target {
            LoanStatus::Approved => loan.date_approved = Some(now),
            LoanStatus::Borrowed => {
                loan.date_borrowed = Some(now);
                loan.date_due = Some(now + rules.loan_duration);
                loan.fine_total = Decimal::ZERO;
                loan.fine_per_day = rules.fines.per_day;
                loan.first_fine = rules.fines.first_incident;
            }
            LoanStatus::Rejected => loan.date_rejected = Some(now),
            LoanStatus::Canceled => loan.date_canceled = Some(now),
            LoanStatus::Returned => {
                loan.date_returned = Some(now);
                loan.fine_total = self.overdue_fine_at(now);
            }
            LoanStatus::Lost => {
                loan.date_lost = Some(now);
                loan.fine_total = self.overdue_fine_at(now) + lost_book_fine;
            }
            LoanStatus::Requested => {
                return Err(AppError::Validation("A loan cannot go back to requested".to_string()))
            }
        }

        Ok(Transition {
            loan,
            restores_stock: target.restores_stock(),
        })
    }

    /// Member-initiated cancellation of their own pending request.
    ///
    /// Someone else's loan is reported as missing.
    pub fn cancel_by_member(
        &self,
        user_id: i32,
        rules: &LoanRules,
        now: DateTime<Utc>,
    ) -> AppResult<Transition> {
        if self.user_id != user_id {
            return Err(AppError::NotFound(format!("Loan with id {} not found", self.id)));
        }
        if self.status != LoanStatus::Requested {
            return Err(AppError::Conflict(format!(
                "Only pending requests can be canceled, loan {} is {}",
                self.id, self.status
            )));
        }
        self.transition(LoanStatus::Canceled, rules, Decimal::ZERO, now)
    }

    fn overdue_fine_at(&self, now: DateTime<Utc>) -> Decimal {
        self.date_due
            .map(|due| self.fine_policy().fine_for(due, now))
            .unwrap_or(self.fine_total)
    }
}

/// Loan with book and borrower details for listings
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LoanView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub loan: LoanTransaction,
    pub book_title: String,
    pub cover_file: Option<String>,
    /// Flat fine of the title, charged if the copy is lost
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub book_fine_amount: Decimal,
    pub username: String,
}

/// Loan listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub user_id: Option<i32>,
    pub status: Option<LoanStatus>,
}

/// Query parameters of the admin loan listing
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    /// Only loans in this status
    pub status: Option<String>,
    /// Only loans of this member
    pub user_id: Option<i32>,
}

impl TryFrom<LoanQuery> for LoanFilter {
    type Error = AppError;

    fn try_from(query: LoanQuery) -> Result<Self, Self::Error> {
        let status = query
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse)
            .transpose()
            .map_err(AppError::Validation)?;
        Ok(LoanFilter {
            user_id: query.user_id,
            status,
        })
    }
}

/// Outcome of a successful loan request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanRequestOutcome {
    pub loan: LoanTransaction,
    pub book_title: String,
    /// Copies left after the reservation
    pub available_stock: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()
    }

    fn loan_in(status: LoanStatus) -> LoanTransaction {
        let mut loan = LoanTransaction::requested(1, 10, 100, t0());
        loan.status = status;
        if status == LoanStatus::Borrowed {
            loan.date_borrowed = Some(t0());
            loan.date_due = Some(t0() + Duration::days(7));
            loan.first_fine = Decimal::from(10_000);
            loan.fine_per_day = Decimal::from(5_000);
        }
        loan
    }

    #[test]
    fn status_wire_names_round_trip() {
        for status in LoanStatus::ALL {
            assert_eq!(status.as_str().parse::<LoanStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
        assert_eq!("diajukan".parse::<LoanStatus>().unwrap(), LoanStatus::Requested);
        assert_eq!("lost".parse::<LoanStatus>().unwrap(), LoanStatus::Lost);
        assert!("PENDING".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn transition_table_is_exhaustive() {
        use LoanStatus::*;
        let allowed = [
            (Requested, Approved),
            (Requested, Rejected),
            (Requested, Canceled),
            (Approved, Borrowed),
            (Approved, Rejected),
            (Approved, Canceled),
            (Borrowed, Returned),
            (Borrowed, Lost),
        ];
        let rules = LoanRules::default();

        for current in LoanStatus::ALL {
            for target in LoanStatus::ALL {
                let loan = loan_in(current);
                let result = loan.transition(target, &rules, Decimal::ZERO, t0());
                if target == Requested {
                    assert!(matches!(result, Err(AppError::Validation(_))), "{current} -> {target}");
                } else if allowed.contains(&(current, target)) {
                    let transition = result.unwrap();
                    assert_eq!(transition.loan.status, target);
                    assert_eq!(transition.restores_stock, target.restores_stock());
                } else {
                    assert!(matches!(result, Err(AppError::Conflict(_))), "{current} -> {target}");
                }
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exit() {
        let rules = LoanRules::default();
        for current in LoanStatus::ALL.into_iter().filter(LoanStatus::is_terminal) {
            for target in LoanStatus::ALL {
                assert!(loan_in(current).transition(target, &rules, Decimal::ZERO, t0()).is_err());
            }
        }
    }

    #[test]
    fn approve_stamps_date() {
        let transition = loan_in(LoanStatus::Requested)
            .transition(LoanStatus::Approved, &LoanRules::default(), Decimal::ZERO, t0())
            .unwrap();
        assert_eq!(transition.loan.date_approved, Some(t0()));
        assert!(!transition.restores_stock);
    }

    #[test]
    fn borrow_sets_due_date_and_snapshots_rates() {
        let rules = LoanRules {
            loan_duration: Duration::days(7),
            fines: FinePolicy::new(Decimal::from(10_000), Decimal::from(5_000)),
        };
        let mut approved = loan_in(LoanStatus::Approved);
        approved.fine_total = Decimal::from(123);

        let loan = approved
            .transition(LoanStatus::Borrowed, &rules, Decimal::ZERO, t0())
            .unwrap()
            .loan;

        assert_eq!(loan.date_borrowed, Some(t0()));
        assert_eq!(loan.date_due, Some(t0() + Duration::days(7)));
        assert_eq!(loan.fine_total, Decimal::ZERO);
        assert_eq!(loan.first_fine, Decimal::from(10_000));
        assert_eq!(loan.fine_per_day, Decimal::from(5_000));
    }

    #[test]
    fn return_computes_fine_from_due_date() {
        let borrowed = loan_in(LoanStatus::Borrowed);
        let due = borrowed.date_due.unwrap();
        let rules = LoanRules::default();

        let on_time = borrowed
            .transition(LoanStatus::Returned, &rules, Decimal::ZERO, due)
            .unwrap();
        assert_eq!(on_time.loan.fine_total, Decimal::ZERO);
        assert!(on_time.restores_stock);

        let late = borrowed
            .transition(LoanStatus::Returned, &rules, Decimal::ZERO, due + Duration::days(1))
            .unwrap();
        assert_eq!(late.loan.fine_total, Decimal::from(15_000));
        assert_eq!(late.loan.date_returned, Some(due + Duration::days(1)));
    }

    #[test]
    fn lost_adds_flat_fine_without_restoring_stock() {
        let borrowed = loan_in(LoanStatus::Borrowed);
        let due = borrowed.date_due.unwrap();

        let lost = borrowed
            .transition(
                LoanStatus::Lost,
                &LoanRules::default(),
                Decimal::from(80_000),
                due + Duration::days(2),
            )
            .unwrap();

        assert_eq!(lost.loan.fine_total, Decimal::from(100_000));
        assert_eq!(lost.loan.date_lost, Some(due + Duration::days(2)));
        assert!(!lost.restores_stock);
        assert_eq!(lost.loan.refreshed_fine(due + Duration::days(30)), None);
    }

    #[test]
    fn at_most_one_terminal_date() {
        let rules = LoanRules::default();
        let borrowed = loan_in(LoanStatus::Borrowed);
        for target in [LoanStatus::Returned, LoanStatus::Lost] {
            let loan = borrowed.transition(target, &rules, Decimal::ZERO, t0()).unwrap().loan;
            let set = [loan.date_returned, loan.date_rejected, loan.date_canceled, loan.date_lost]
                .iter()
                .filter(|d| d.is_some())
                .count();
            assert_eq!(set, 1);
        }
    }

    #[test]
    fn member_cancel_is_owner_only_and_pending_only() {
        let rules = LoanRules::default();
        let requested = loan_in(LoanStatus::Requested);

        assert!(matches!(
            requested.cancel_by_member(999, &rules, t0()),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            loan_in(LoanStatus::Approved).cancel_by_member(100, &rules, t0()),
            Err(AppError::Conflict(_))
        ));

        let canceled = requested.cancel_by_member(100, &rules, t0()).unwrap();
        assert_eq!(canceled.loan.status, LoanStatus::Canceled);
        assert_eq!(canceled.loan.date_canceled, Some(t0()));
        assert!(canceled.restores_stock);
    }

    #[test]
    fn refreshed_fine_only_for_borrowed_and_returned() {
        let borrowed = loan_in(LoanStatus::Borrowed);
        let due = borrowed.date_due.unwrap();
        assert_eq!(
            borrowed.refreshed_fine(due + Duration::days(2) + Duration::hours(1)),
            Some(Decimal::from(20_000))
        );

        let mut returned = borrowed.clone();
        returned.status = LoanStatus::Returned;
        returned.date_returned = Some(due + Duration::days(1));
        assert_eq!(
            returned.refreshed_fine(due + Duration::days(40)),
            Some(Decimal::from(15_000))
        );

        assert_eq!(loan_in(LoanStatus::Approved).refreshed_fine(due), None);
    }

    #[test]
    fn loan_query_parses_status() {
        let filter = LoanFilter::try_from(LoanQuery {
            status: Some("dipinjam".to_string()),
            user_id: None,
        })
        .unwrap();
        assert_eq!(filter.status, Some(LoanStatus::Borrowed));

        assert!(LoanFilter::try_from(LoanQuery {
            status: Some("whatever".to_string()),
            user_id: None,
        })
        .is_err());
    }

    #[test]
    fn optional_dates_are_omitted() {
        let json = serde_json::to_value(loan_in(LoanStatus::Requested)).unwrap();
        assert_eq!(json["status"], "DIAJUKAN");
        assert_eq!(json["date_requested"], "2025-02-01 09:00:00");
        assert!(json.get("date_due").is_none());
        assert_eq!(json["fine_total"], 0.0);
    }
}
