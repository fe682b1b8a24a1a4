//! Overdue fine calculation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::LoansConfig;

/// Fine rates applied to one loan.
///
/// A loan snapshots the configured rates when it is handed over, so later
/// configuration changes never alter fines of loans already out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinePolicy {
    pub first_incident: Decimal,
    pub per_day: Decimal,
}

impl FinePolicy {
    pub fn new(first_incident: Decimal, per_day: Decimal) -> Self {
        Self {
            first_incident,
            per_day,
        }
    }

    /// Fine owed for a loan due at `due`, evaluated at `reference`.
    ///
    /// Zero up to and including the due instant. Past it, the first incident
    /// fine plus the per-day rate for every full day elapsed (truncated).
    pub fn fine_for(&self, due: DateTime<Utc>, reference: DateTime<Utc>) -> Decimal {
        if reference <= due {
            return Decimal::ZERO;
        }
        let days_overdue = (reference - due).num_days();
        self.first_incident + Decimal::from(days_overdue) * self.per_day
    }
}

impl From<&LoansConfig> for FinePolicy {
    fn from(config: &LoansConfig) -> Self {
        Self::new(config.first_incident_fine, config.fine_per_day)
    }
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self::from(&LoansConfig::default())
    }
}
