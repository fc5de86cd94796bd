use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::domain::{
    AccountStatus, AdminId, Balance, BookingId, Dispute, DisputeId, DisputeKind, DisputeListing,
    DisputePriority, EngineStore, EntryId, Error, Money, Severity, Suspension, UserId, Verdict,
    Warning, WithdrawalId, WithdrawalRequest,
};
use crate::engine::Engine;

/// Concurrent facade over the engine, exposing the operation surface the
/// admin and tutor UIs consume.
///
/// Every mutation first acquires the per-user lock of each affected user in
/// ascending id order, so two operations touching the same user never
/// interleave; the engine itself then runs the operation's guard checks and
/// writes as one atomic unit. Calls resolve to a definitive success or
/// failure with nothing partially persisted.
pub struct EscrowService<S: EngineStore> {
    engine: Arc<StdMutex<Engine<S>>>,
    user_locks: Arc<StdMutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>,
}

impl<S: EngineStore> Clone for EscrowService<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            user_locks: Arc::clone(&self.user_locks),
        }
    }
}

impl<S: EngineStore> EscrowService<S> {
    pub fn new(engine: Engine<S>) -> Self {
        Self {
            engine: Arc::new(StdMutex::new(engine)),
            user_locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    fn lock_handle(&self, user: UserId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.user_locks.lock().unwrap();
        locks
            .entry(user)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn read<T>(&self, f: impl FnOnce(&Engine<S>) -> T) -> T {
        let engine = self.engine.lock().unwrap();
        f(&engine)
    }

    /// Serialize on the affected users, in ascending order, then run the
    /// mutation. The engine lock is only taken once every user lock is
    /// held, and is never held across an await point.
    async fn with_users<T>(
        &self,
        users: &[UserId],
        f: impl FnOnce(&mut Engine<S>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut ids = users.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let handles: Vec<_> = ids.iter().map(|u| self.lock_handle(*u)).collect();
        let mut guards = Vec::with_capacity(handles.len());
        for handle in &handles {
            guards.push(handle.lock().await);
        }

        let mut engine = self.engine.lock().unwrap();
        f(&mut engine)
    }

    fn booking_parties(&self, booking: BookingId) -> Vec<UserId> {
        self.read(|e| {
            e.escrow_hold(booking)
                .map(|h| vec![h.payer_id, h.payee_id])
                .unwrap_or_default()
        })
    }

    fn dispute_parties(&self, dispute: DisputeId) -> Vec<UserId> {
        self.read(|e| {
            e.dispute(dispute)
                .map(|d| vec![d.plaintiff_id, d.defendant_id])
                .unwrap_or_default()
        })
    }

    fn withdrawal_owner(&self, id: WithdrawalId) -> Vec<UserId> {
        self.read(|e| e.withdrawal(id).map(|w| vec![w.tutor_id]).unwrap_or_default())
    }

    // Booking facts and balance adjustments.

    pub async fn deposit(&self, user: UserId, amount: Money) -> Result<EntryId, Error> {
        self.with_users(&[user], |e| e.deposit(user, amount)).await
    }

    pub async fn register_bank(
        &self,
        user: UserId,
        holder: String,
        masked_account: String,
    ) -> Result<(), Error> {
        self.with_users(&[user], |e| e.register_bank(user, holder, masked_account))
            .await
    }

    pub async fn capture_booking_payment(
        &self,
        booking: BookingId,
        payer: UserId,
        payee: UserId,
        amount: Money,
    ) -> Result<(), Error> {
        self.with_users(&[payer, payee], |e| {
            e.capture_payment(booking, payer, payee, amount)
        })
        .await
    }

    // Disputes.

    pub async fn file_dispute(
        &self,
        booking: BookingId,
        plaintiff: UserId,
        kind: DisputeKind,
        priority: DisputePriority,
        deadline_days: u32,
    ) -> Result<Dispute, Error> {
        let parties = self.booking_parties(booking);
        self.with_users(&parties, |e| {
            e.file_dispute(booking, plaintiff, kind, priority, deadline_days)
        })
        .await
    }

    pub async fn start_investigation(
        &self,
        dispute: DisputeId,
        admin: AdminId,
    ) -> Result<(), Error> {
        self.with_users(&[], |e| e.start_investigation(dispute, admin))
            .await
    }

    pub async fn resolve_dispute(
        &self,
        dispute: DisputeId,
        verdict: Verdict,
        notes: &str,
        admin: AdminId,
        idempotency_key: Option<String>,
    ) -> Result<Dispute, Error> {
        let parties = self.dispute_parties(dispute);
        self.with_users(&parties, |e| {
            e.resolve_dispute(dispute, verdict, notes, admin, idempotency_key)
        })
        .await
    }

    pub async fn confirm_makeup(&self, dispute: DisputeId) -> Result<(), Error> {
        let parties = self.dispute_parties(dispute);
        self.with_users(&parties, |e| e.confirm_makeup(dispute))
            .await
    }

    pub fn disputes(&self) -> Vec<DisputeListing> {
        self.read(|e| e.disputes())
    }

    pub fn dispute(&self, id: DisputeId) -> Option<Dispute> {
        self.read(|e| e.dispute(id))
    }

    // Moderation.

    pub async fn issue_warning(
        &self,
        user: UserId,
        reason: &str,
        severity: Severity,
        related_booking: Option<BookingId>,
        admin: AdminId,
    ) -> Result<Warning, Error> {
        self.with_users(&[user], |e| {
            e.issue_warning(user, reason, severity, related_booking, admin)
        })
        .await
    }

    pub async fn suspend(
        &self,
        user: UserId,
        reason: &str,
        duration_days: u32,
        admin: AdminId,
    ) -> Result<Suspension, Error> {
        self.with_users(&[user], |e| e.suspend(user, reason, duration_days, admin))
            .await
    }

    pub async fn lift_suspension(&self, user: UserId, admin: AdminId) -> Result<(), Error> {
        self.with_users(&[user], |e| e.lift_suspension(user, admin))
            .await
    }

    pub async fn block(
        &self,
        user: UserId,
        reason: &str,
        confirmation_phrase: &str,
        admin: AdminId,
    ) -> Result<(), Error> {
        // The cascade refunds every held escrow the user is party to, so
        // those counterparties are affected users too.
        let affected = self.read(|e| {
            let mut users = vec![user];
            for hold in e.store.active_holds() {
                if hold.involves(user) {
                    users.push(hold.payer_id);
                    users.push(hold.payee_id);
                }
            }
            users
        });
        self.with_users(&affected, |e| e.block(user, reason, confirmation_phrase, admin))
            .await
    }

    pub async fn unblock(&self, user: UserId, reason: &str, admin: AdminId) -> Result<(), Error> {
        self.with_users(&[user], |e| e.unblock(user, reason, admin))
            .await
    }

    pub fn account_status(&self, user: UserId) -> AccountStatus {
        self.read(|e| e.account_status(user))
    }

    pub fn warnings_for(&self, user: UserId) -> Vec<Warning> {
        self.read(|e| e.warnings_for(user))
    }

    pub fn suspensions_for(&self, user: UserId) -> Vec<Suspension> {
        self.read(|e| e.suspensions_for(user))
    }

    // Withdrawals.

    pub async fn create_withdrawal(
        &self,
        tutor: UserId,
        amount: Money,
    ) -> Result<WithdrawalRequest, Error> {
        self.with_users(&[tutor], |e| e.create_withdrawal(tutor, amount))
            .await
    }

    pub async fn approve_withdrawal(&self, id: WithdrawalId, admin: AdminId) -> Result<(), Error> {
        let owner = self.withdrawal_owner(id);
        self.with_users(&owner, |e| e.approve_withdrawal(id, admin))
            .await
    }

    pub async fn reject_withdrawal(
        &self,
        id: WithdrawalId,
        reason: &str,
        admin: AdminId,
    ) -> Result<(), Error> {
        let owner = self.withdrawal_owner(id);
        self.with_users(&owner, |e| e.reject_withdrawal(id, reason, admin))
            .await
    }

    pub async fn cancel_withdrawal(&self, id: WithdrawalId, tutor: UserId) -> Result<(), Error> {
        self.with_users(&[tutor], |e| e.cancel_withdrawal(id, tutor))
            .await
    }

    pub async fn complete_withdrawal(&self, id: WithdrawalId) -> Result<EntryId, Error> {
        let owner = self.withdrawal_owner(id);
        self.with_users(&owner, |e| e.complete_withdrawal(id)).await
    }

    pub fn withdrawals(&self) -> Vec<WithdrawalRequest> {
        self.read(|e| e.withdrawals())
    }

    pub fn withdrawal(&self, id: WithdrawalId) -> Option<WithdrawalRequest> {
        self.read(|e| e.withdrawal(id))
    }

    // Balances.

    pub fn balance_of(&self, user: UserId) -> Result<Balance, Error> {
        self.read(|e| e.balance_of(user))
    }
}
