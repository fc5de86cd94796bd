use tracing::{info, warn};

use crate::domain::{
    AccountStatus, AdminId, BlockRecord, BookingId, DisputeStatus, EngineStore, EntryKind, Error,
    HoldStatus, Money, NewEntry, Reference, Severity, Suspension, UserId, Verdict, Warning,
};
use crate::engine::Engine;

/// Literal an admin must retype before a block is accepted.
pub const BLOCK_CONFIRMATION_PHRASE: &str = "BLOCK ACCOUNT";

const MIN_WARNING_REASON_CHARS: usize = 10;
const MIN_SUSPENSION_REASON_CHARS: usize = 15;
const MIN_BLOCK_REASON_CHARS: usize = 30;
const MIN_UNBLOCK_REASON_CHARS: usize = 10;
const MAX_SUSPENSION_DAYS: u32 = 365;

impl<S: EngineStore> Engine<S> {
    /// Projection over block records and suspension history. The block flag
    /// wins; suspension expiry is computed against the clock, never polled.
    pub fn account_status(&self, user: UserId) -> AccountStatus {
        if self.store.active_block(user).is_some() {
            return AccountStatus::Blocked;
        }
        let now = self.now();
        if self
            .store
            .suspensions_for(user)
            .iter()
            .any(|s| s.is_active(now))
        {
            return AccountStatus::Suspended;
        }
        AccountStatus::Active
    }

    pub fn issue_warning(
        &mut self,
        user: UserId,
        reason: &str,
        severity: Severity,
        related_booking: Option<BookingId>,
        admin: AdminId,
    ) -> Result<Warning, Error> {
        if reason.trim().chars().count() < MIN_WARNING_REASON_CHARS {
            return Err(Error::Validation(format!(
                "warning reason must be at least {MIN_WARNING_REASON_CHARS} characters"
            )));
        }

        let warning = Warning {
            id: self.store.next_warning_id(),
            user_id: user,
            reason: reason.trim().to_string(),
            severity,
            issued_by: admin,
            related_booking_id: related_booking,
            created_at: self.now(),
        };
        self.store.push_warning(warning.clone());

        info!(user, admin, ?severity, "warning issued");
        Ok(warning)
    }

    /// Suspend a user for a bounded number of days. Suspensions do not
    /// stack: an active one must be lifted or left to expire first.
    pub fn suspend(
        &mut self,
        user: UserId,
        reason: &str,
        duration_days: u32,
        admin: AdminId,
    ) -> Result<Suspension, Error> {
        if reason.trim().chars().count() < MIN_SUSPENSION_REASON_CHARS {
            return Err(Error::Validation(format!(
                "suspension reason must be at least {MIN_SUSPENSION_REASON_CHARS} characters"
            )));
        }
        if duration_days == 0 || duration_days > MAX_SUSPENSION_DAYS {
            return Err(Error::InvalidDuration {
                days: duration_days,
            });
        }
        let now = self.now();
        if self
            .store
            .suspensions_for(user)
            .iter()
            .any(|s| s.is_active(now))
        {
            return Err(Error::InvalidStateTransition(format!(
                "user {user} already has an active suspension"
            )));
        }

        let suspension = Suspension {
            id: self.store.next_suspension_id(),
            user_id: user,
            reason: reason.trim().to_string(),
            starts_at: now,
            ends_at: now + chrono::Duration::days(i64::from(duration_days)),
            duration_days,
            issued_by: admin,
            lifted_at: None,
            lifted_by: None,
            created_at: now,
        };
        self.store.push_suspension(suspension.clone());

        info!(user, admin, duration_days, "user suspended");
        Ok(suspension)
    }

    /// End the active suspension early. History stays untouched; the
    /// record is marked lifted, never removed.
    pub fn lift_suspension(&mut self, user: UserId, admin: AdminId) -> Result<(), Error> {
        let now = self.now();
        let active = self
            .store
            .suspensions_for(user)
            .iter()
            .find(|s| s.is_active(now))
            .map(|s| s.id);
        let Some(id) = active else {
            return Err(Error::InvalidStateTransition(format!(
                "user {user} has no active suspension"
            )));
        };

        if let Some(suspension) = self.store.suspension_mut(id) {
            suspension.lifted_at = Some(now);
            suspension.lifted_by = Some(admin);
        }

        info!(user, admin, suspension = id, "suspension lifted");
        Ok(())
    }

    /// Block a user. Requires the admin to retype the confirmation phrase
    /// exactly. Cascades over every held escrow the user is party to:
    /// funds return to the payer in full and any open dispute on those
    /// bookings is closed with a full-refund verdict.
    pub fn block(
        &mut self,
        user: UserId,
        reason: &str,
        confirmation_phrase: &str,
        admin: AdminId,
    ) -> Result<(), Error> {
        if confirmation_phrase != BLOCK_CONFIRMATION_PHRASE {
            return Err(Error::ConfirmationMismatch);
        }
        if reason.trim().chars().count() < MIN_BLOCK_REASON_CHARS {
            return Err(Error::Validation(format!(
                "block reason must be at least {MIN_BLOCK_REASON_CHARS} characters"
            )));
        }
        if self.store.active_block(user).is_some() {
            return Err(Error::InvalidStateTransition(format!(
                "user {user} is already blocked"
            )));
        }

        let affected: Vec<(BookingId, UserId, Money)> = self
            .store
            .active_holds()
            .into_iter()
            .filter(|h| h.involves(user))
            .map(|h| (h.booking_id, h.payer_id, h.amount))
            .collect();

        let mut movements = Vec::with_capacity(affected.len() * 2);
        for (booking, payer, amount) in &affected {
            movements.push(NewEntry::new(
                *payer,
                EntryKind::Escrow,
                amount.negated(),
                Reference::booking(*booking),
                format!("booking:{booking}:block-escrow"),
            ));
            movements.push(NewEntry::new(
                *payer,
                EntryKind::Refund,
                *amount,
                Reference::booking(*booking),
                format!("booking:{booking}:block-refund"),
            ));
        }

        let now = self.now();
        if !movements.is_empty() {
            self.store.append_entries(now, movements)?;
        }
        for (booking, ..) in &affected {
            if let Some(hold) = self.store.hold_for_booking_mut(*booking) {
                hold.status = HoldStatus::Refunded;
                hold.resolved_at = Some(now);
            }
            if let Some(open) = self.store.open_dispute_for_booking(*booking) {
                if let Some(dispute) = self.store.dispute_mut(open) {
                    dispute.status = DisputeStatus::Resolved;
                    dispute.verdict = Some(Verdict::RefundFull);
                    dispute.admin_notes =
                        Some("Account blocked by moderation; escrow refunded to payer".to_string());
                    dispute.resolved_at = Some(now);
                    dispute.resolved_by = Some(admin);
                    dispute.resolution_key = Some(format!("dispute:{open}:resolve:block"));
                    warn!(dispute = open, booking, "open dispute closed by block cascade");
                }
            }
        }

        self.store.push_block(BlockRecord {
            user_id: user,
            reason: reason.trim().to_string(),
            blocked_by: admin,
            blocked_at: now,
            unblocked_at: None,
            unblocked_by: None,
            unblock_reason: None,
        });

        warn!(user, admin, refunded_holds = affected.len(), "user blocked");
        Ok(())
    }

    /// Explicit admin reversal of a block. Warning and suspension history
    /// is preserved; the account status falls back to the suspension
    /// projection.
    pub fn unblock(&mut self, user: UserId, reason: &str, admin: AdminId) -> Result<(), Error> {
        if reason.trim().chars().count() < MIN_UNBLOCK_REASON_CHARS {
            return Err(Error::Validation(format!(
                "unblock reason must be at least {MIN_UNBLOCK_REASON_CHARS} characters"
            )));
        }
        let now = self.now();
        let Some(block) = self.store.active_block_mut(user) else {
            return Err(Error::InvalidStateTransition(format!(
                "user {user} is not blocked"
            )));
        };
        block.unblocked_at = Some(now);
        block.unblocked_by = Some(admin);
        block.unblock_reason = Some(reason.trim().to_string());

        info!(user, admin, "user unblocked");
        Ok(())
    }

    pub fn warnings_for(&self, user: UserId) -> Vec<Warning> {
        self.store
            .warnings_for(user)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn suspensions_for(&self, user: UserId) -> Vec<Suspension> {
        self.store
            .suspensions_for(user)
            .into_iter()
            .cloned()
            .collect()
    }
}
