use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EntryId, Money, UserId};

/// Kind of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Platform credit adjustment (e.g. seeding a balance).
    Deposit,
    /// Funds entering or leaving a booking's escrow pot.
    Escrow,
    /// Payout of escrowed funds to the tutor side.
    Release,
    /// Return of escrowed funds to the payer side.
    Refund,
    /// Settled external payout of a completed withdrawal.
    Withdrawal,
    /// Platform fee. Accepted by the ledger; no engine operation emits one.
    Fee,
}

/// Resource a ledger entry was written on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Booking,
    Dispute,
    /// Dispute refund granted as non-withdrawable free credit.
    DisputeCredit,
    WithdrawalRequest,
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub id: u64,
}

impl Reference {
    pub fn booking(id: u64) -> Self {
        Self { kind: ReferenceKind::Booking, id }
    }

    pub fn dispute(id: u64) -> Self {
        Self { kind: ReferenceKind::Dispute, id }
    }

    pub fn dispute_credit(id: u64) -> Self {
        Self { kind: ReferenceKind::DisputeCredit, id }
    }

    pub fn withdrawal(id: u64) -> Self {
        Self { kind: ReferenceKind::WithdrawalRequest, id }
    }

    pub fn adjustment(id: u64) -> Self {
        Self { kind: ReferenceKind::Adjustment, id }
    }
}

/// One immutable movement on a user's ledger. Append-only; the fold over a
/// user's entries is that user's total balance.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub kind: EntryKind,
    pub amount: Money,
    pub reference: Reference,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: String,
}

/// An entry awaiting append. The store assigns id and timestamp when the
/// batch commits; a batch commits atomically or not at all.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub user_id: UserId,
    pub kind: EntryKind,
    pub amount: Money,
    pub reference: Reference,
    pub idempotency_key: String,
}

impl NewEntry {
    pub fn new(
        user_id: UserId,
        kind: EntryKind,
        amount: Money,
        reference: Reference,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            amount,
            reference,
            idempotency_key: idempotency_key.into(),
        }
    }
}
