use chrono::{DateTime, Utc};
use futures::Stream;

use crate::domain::{
    BankInfo, BlockRecord, BookingId, DeferredRelease, Dispute, DisputeId, EntryId, Error,
    EscrowHold, LedgerEntry, NewEntry, Operation, Suspension, SuspensionId, UserId, Warning,
    WarningId, WithdrawalId, WithdrawalRequest,
};

pub trait OperationStream {
    type OpStream: Stream<Item = Result<Operation, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::OpStream;
}

pub trait DeadLetterQueue {
    fn report(&self, error: &Error);
}

/// Source of the current time. Suspension expiry and dispute urgency are
/// computed against this on every read, so tests can drive time without
/// sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Injected persistence boundary. The engine performs every guard check
/// before its first write against the store, so a store whose individual
/// methods cannot fail mid-way gives each operation all-or-nothing
/// semantics.
pub trait EngineStore {
    // Ledger. Append is the only mutation; the batch commits atomically or
    // not at all, and every idempotency key is applied at most once.
    fn append_entries(
        &mut self,
        now: DateTime<Utc>,
        entries: Vec<NewEntry>,
    ) -> Result<Vec<EntryId>, Error>;
    fn entries_for(&self, user: UserId) -> Vec<&LedgerEntry>;

    // Escrow holds.
    fn insert_hold(&mut self, hold: EscrowHold);
    fn hold_for_booking(&self, booking: BookingId) -> Option<&EscrowHold>;
    fn hold_for_booking_mut(&mut self, booking: BookingId) -> Option<&mut EscrowHold>;
    fn active_holds(&self) -> Vec<&EscrowHold>;

    // Disputes.
    fn next_dispute_id(&mut self) -> DisputeId;
    fn insert_dispute(&mut self, dispute: Dispute);
    fn dispute(&self, id: DisputeId) -> Option<&Dispute>;
    fn dispute_mut(&mut self, id: DisputeId) -> Option<&mut Dispute>;
    fn open_dispute_for_booking(&self, booking: BookingId) -> Option<DisputeId>;
    fn disputes(&self) -> Vec<&Dispute>;

    // Deferred makeup releases.
    fn push_deferred_release(&mut self, release: DeferredRelease);
    fn deferred_release_mut(&mut self, dispute: DisputeId) -> Option<&mut DeferredRelease>;

    // Moderation history.
    fn next_warning_id(&mut self) -> WarningId;
    fn push_warning(&mut self, warning: Warning);
    fn warnings_for(&self, user: UserId) -> Vec<&Warning>;
    fn next_suspension_id(&mut self) -> SuspensionId;
    fn push_suspension(&mut self, suspension: Suspension);
    fn suspensions_for(&self, user: UserId) -> Vec<&Suspension>;
    fn suspension_mut(&mut self, id: SuspensionId) -> Option<&mut Suspension>;
    fn push_block(&mut self, block: BlockRecord);
    fn active_block(&self, user: UserId) -> Option<&BlockRecord>;
    fn active_block_mut(&mut self, user: UserId) -> Option<&mut BlockRecord>;

    // Bank snapshots.
    fn bank_info(&self, user: UserId) -> Option<&BankInfo>;
    fn set_bank_info(&mut self, user: UserId, info: BankInfo);

    // Withdrawal requests.
    fn next_withdrawal_id(&mut self) -> WithdrawalId;
    fn insert_withdrawal(&mut self, request: WithdrawalRequest);
    fn withdrawal(&self, id: WithdrawalId) -> Option<&WithdrawalRequest>;
    fn withdrawal_mut(&mut self, id: WithdrawalId) -> Option<&mut WithdrawalRequest>;
    fn withdrawals(&self) -> Vec<&WithdrawalRequest>;
    fn withdrawals_for(&self, user: UserId) -> Vec<&WithdrawalRequest>;

    // Balance-adjustment sequence (deposit reference ids).
    fn next_adjustment_id(&mut self) -> u64;

    // Users seen by any component, for the balances report.
    fn user_ids(&self) -> Vec<UserId>;
}
