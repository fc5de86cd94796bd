use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AdminId, BookingId, DisputeId, Money, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeKind {
    Quality,
    NoShow,
    Technical,
    Payment,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputePriority {
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisputeStatus {
    Pending,
    Investigating,
    Resolved,
}

/// Admin decision on a dispute. Each verdict maps deterministically to a
/// fixed set of ledger movements against the booking's escrow hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    RefundFull,
    RefundHalf,
    ReleaseToTutor,
    FreeCredit,
    Makeup,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub booking_id: BookingId,
    pub plaintiff_id: UserId,
    pub defendant_id: UserId,
    pub kind: DisputeKind,
    pub priority: DisputePriority,
    pub status: DisputeStatus,
    pub verdict: Option<Verdict>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
    /// Admin assigned when the dispute moved to `Investigating`.
    pub investigated_by: Option<AdminId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<AdminId>,
    /// Idempotency key of the resolution that consumed this dispute.
    pub resolution_key: Option<String>,
}

impl Dispute {
    pub fn is_open(&self) -> bool {
        self.status != DisputeStatus::Resolved
    }

    /// Past its deadline and still unresolved. Surfaced in listings only;
    /// resolution is always an explicit admin act.
    pub fn is_urgent(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && now > self.deadline_at
    }
}

/// A dispute together with its computed urgency, as returned by listings.
#[derive(Debug, Clone, Serialize)]
pub struct DisputeListing {
    pub dispute: Dispute,
    pub urgent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HoldStatus {
    Held,
    Released,
    Refunded,
    Split,
}

/// Escrowed funds for one booking. Exactly one hold is created when the
/// booking's payment is captured, and it is consumed by exactly one
/// resolution.
#[derive(Debug, Clone, Serialize)]
pub struct EscrowHold {
    pub booking_id: BookingId,
    pub payer_id: UserId,
    pub payee_id: UserId,
    pub dispute_id: Option<DisputeId>,
    pub amount: Money,
    pub status: HoldStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl EscrowHold {
    pub fn is_held(&self) -> bool {
        self.status == HoldStatus::Held
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.payer_id == user || self.payee_id == user
    }
}

/// Payout owed to the tutor under a Makeup verdict, released only once the
/// makeup session's completion is externally confirmed.
#[derive(Debug, Clone, Serialize)]
pub struct DeferredRelease {
    pub dispute_id: DisputeId,
    pub payee_id: UserId,
    pub amount: Money,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}
