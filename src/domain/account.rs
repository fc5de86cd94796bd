use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AdminId, BookingId, Money, SuspensionId, UserId, WarningId};

/// Derived balance view for one user. Computed by folding the user's ledger
/// entries on every read, never cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// Sum of all ledger entries for the user.
    pub total: Money,
    /// total minus held, in-transit, and free-credit funds.
    pub available: Money,
    /// Escrowed funds on the user's active bookings (user as payer).
    pub held: Money,
    /// Reserved by pending or approved withdrawal requests.
    pub in_transit: Money,
    /// Non-withdrawable free credit granted by dispute verdicts.
    pub credit: Money,
    /// Sum of all releases paid out to the user.
    pub lifetime_earned: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// An admin warning on a user's record. Append-only, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub id: WarningId,
    pub user_id: UserId,
    pub reason: String,
    pub severity: Severity,
    pub issued_by: AdminId,
    pub related_booking_id: Option<BookingId>,
    pub created_at: DateTime<Utc>,
}

/// A timed suspension. Whether it is active is computed from the current
/// time on every read; nothing mutates it when the end date passes.
#[derive(Debug, Clone, Serialize)]
pub struct Suspension {
    pub id: SuspensionId,
    pub user_id: UserId,
    pub reason: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub duration_days: u32,
    pub issued_by: AdminId,
    pub lifted_at: Option<DateTime<Utc>>,
    pub lifted_by: Option<AdminId>,
    pub created_at: DateTime<Utc>,
}

impl Suspension {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.lifted_at.is_none() && now < self.ends_at
    }
}

/// An administrator-set account block. Terminal for the normal flow;
/// unblocking is a separate explicit admin action recorded on the same
/// record, never an edit of history.
#[derive(Debug, Clone, Serialize)]
pub struct BlockRecord {
    pub user_id: UserId,
    pub reason: String,
    pub blocked_by: AdminId,
    pub blocked_at: DateTime<Utc>,
    pub unblocked_at: Option<DateTime<Utc>>,
    pub unblocked_by: Option<AdminId>,
    pub unblock_reason: Option<String>,
}

impl BlockRecord {
    pub fn is_active(&self) -> bool {
        self.unblocked_at.is_none()
    }
}

/// Projection over block records and suspensions. The block flag wins over
/// any suspension; suspension expiry is derived from `ends_at` vs now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountStatus {
    Active,
    Suspended,
    Blocked,
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Suspended => write!(f, "suspended"),
            AccountStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// Bank details snapshot captured into withdrawal requests. Verification is
/// performed by the external identity subsystem; the engine only consumes
/// the flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankInfo {
    pub holder: String,
    pub masked_account: String,
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn suspension(ends_in_days: i64) -> Suspension {
        let now = Utc::now();
        Suspension {
            id: 1,
            user_id: 7,
            reason: "repeated no-shows".to_string(),
            starts_at: now,
            ends_at: now + Duration::days(ends_in_days),
            duration_days: ends_in_days.unsigned_abs() as u32,
            issued_by: 1,
            lifted_at: None,
            lifted_by: None,
            created_at: now,
        }
    }

    #[test]
    fn suspension_activity_is_computed_from_end_date() {
        let now = Utc::now();
        assert!(suspension(3).is_active(now));
        assert!(!suspension(-1).is_active(now));
    }

    #[test]
    fn lifted_suspension_is_inactive() {
        let now = Utc::now();
        let mut s = suspension(3);
        s.lifted_at = Some(now);
        s.lifted_by = Some(1);
        assert!(!s.is_active(now));
    }
}
