use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{BankInfo, Money, UserId, WithdrawalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

/// A tutor's request to pay out part of their available balance. Creation
/// reserves the amount; the reservation is the request itself in a
/// fund-reserving state, so rejection and cancellation restore the
/// available balance without any compensating ledger entry.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub tutor_id: UserId,
    pub amount: Money,
    pub status: WithdrawalStatus,
    pub bank_snapshot: BankInfo,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub admin_note: Option<String>,
}

impl WithdrawalRequest {
    /// Whether the request currently reserves funds out of the available
    /// balance (counted into the in-transit bucket).
    pub fn reserves_funds(&self) -> bool {
        matches!(
            self.status,
            WithdrawalStatus::Pending | WithdrawalStatus::Approved
        )
    }
}
