use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::{
    BankInfo, BlockRecord, BookingId, DeferredRelease, Dispute, DisputeId, EngineStore, EntryId,
    Error, EscrowHold, LedgerEntry, NewEntry, Suspension, SuspensionId, UserId, Warning, WarningId,
    WithdrawalId, WithdrawalRequest,
};

/// In-memory implementation of the persistence boundary. Everything the
/// engine needs behind the `EngineStore` trait, so the engine is testable
/// without a real database.
#[derive(Default, Debug)]
pub struct InMemoryStore {
    entries: Vec<LedgerEntry>,
    idempotency_keys: HashSet<String>,
    holds: HashMap<BookingId, EscrowHold>,
    disputes: BTreeMap<DisputeId, Dispute>,
    deferred: Vec<DeferredRelease>,
    warnings: Vec<Warning>,
    suspensions: Vec<Suspension>,
    blocks: Vec<BlockRecord>,
    banks: HashMap<UserId, BankInfo>,
    withdrawals: BTreeMap<WithdrawalId, WithdrawalRequest>,
    users: BTreeSet<UserId>,
    next_entry_id: EntryId,
    next_dispute_id: DisputeId,
    next_withdrawal_id: WithdrawalId,
    next_warning_id: WarningId,
    next_suspension_id: SuspensionId,
    next_adjustment_id: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EngineStore for InMemoryStore {
    fn append_entries(
        &mut self,
        now: DateTime<Utc>,
        entries: Vec<NewEntry>,
    ) -> Result<Vec<EntryId>, Error> {
        // Reject the whole batch before touching anything, including keys
        // duplicated within the batch itself.
        let mut batch_keys = HashSet::new();
        for entry in &entries {
            if self.idempotency_keys.contains(&entry.idempotency_key)
                || !batch_keys.insert(entry.idempotency_key.as_str())
            {
                return Err(Error::DuplicateIdempotencyKey(
                    entry.idempotency_key.clone(),
                ));
            }
        }

        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            self.next_entry_id += 1;
            let id = self.next_entry_id;
            self.idempotency_keys.insert(entry.idempotency_key.clone());
            self.users.insert(entry.user_id);
            self.entries.push(LedgerEntry {
                id,
                user_id: entry.user_id,
                kind: entry.kind,
                amount: entry.amount,
                reference: entry.reference,
                created_at: now,
                idempotency_key: entry.idempotency_key,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    fn entries_for(&self, user: UserId) -> Vec<&LedgerEntry> {
        self.entries.iter().filter(|e| e.user_id == user).collect()
    }

    fn insert_hold(&mut self, hold: EscrowHold) {
        self.users.insert(hold.payer_id);
        self.users.insert(hold.payee_id);
        self.holds.insert(hold.booking_id, hold);
    }

    fn hold_for_booking(&self, booking: BookingId) -> Option<&EscrowHold> {
        self.holds.get(&booking)
    }

    fn hold_for_booking_mut(&mut self, booking: BookingId) -> Option<&mut EscrowHold> {
        self.holds.get_mut(&booking)
    }

    fn active_holds(&self) -> Vec<&EscrowHold> {
        self.holds.values().filter(|h| h.is_held()).collect()
    }

    fn next_dispute_id(&mut self) -> DisputeId {
        self.next_dispute_id += 1;
        self.next_dispute_id
    }

    fn insert_dispute(&mut self, dispute: Dispute) {
        self.disputes.insert(dispute.id, dispute);
    }

    fn dispute(&self, id: DisputeId) -> Option<&Dispute> {
        self.disputes.get(&id)
    }

    fn dispute_mut(&mut self, id: DisputeId) -> Option<&mut Dispute> {
        self.disputes.get_mut(&id)
    }

    fn open_dispute_for_booking(&self, booking: BookingId) -> Option<DisputeId> {
        self.disputes
            .values()
            .find(|d| d.booking_id == booking && d.is_open())
            .map(|d| d.id)
    }

    fn disputes(&self) -> Vec<&Dispute> {
        self.disputes.values().collect()
    }

    fn push_deferred_release(&mut self, release: DeferredRelease) {
        self.deferred.push(release);
    }

    fn deferred_release_mut(&mut self, dispute: DisputeId) -> Option<&mut DeferredRelease> {
        self.deferred.iter_mut().find(|d| d.dispute_id == dispute)
    }

    fn next_warning_id(&mut self) -> WarningId {
        self.next_warning_id += 1;
        self.next_warning_id
    }

    fn push_warning(&mut self, warning: Warning) {
        self.users.insert(warning.user_id);
        self.warnings.push(warning);
    }

    fn warnings_for(&self, user: UserId) -> Vec<&Warning> {
        self.warnings.iter().filter(|w| w.user_id == user).collect()
    }

    fn next_suspension_id(&mut self) -> SuspensionId {
        self.next_suspension_id += 1;
        self.next_suspension_id
    }

    fn push_suspension(&mut self, suspension: Suspension) {
        self.users.insert(suspension.user_id);
        self.suspensions.push(suspension);
    }

    fn suspensions_for(&self, user: UserId) -> Vec<&Suspension> {
        self.suspensions
            .iter()
            .filter(|s| s.user_id == user)
            .collect()
    }

    fn suspension_mut(&mut self, id: SuspensionId) -> Option<&mut Suspension> {
        self.suspensions.iter_mut().find(|s| s.id == id)
    }

    fn push_block(&mut self, block: BlockRecord) {
        self.users.insert(block.user_id);
        self.blocks.push(block);
    }

    fn active_block(&self, user: UserId) -> Option<&BlockRecord> {
        self.blocks
            .iter()
            .find(|b| b.user_id == user && b.is_active())
    }

    fn active_block_mut(&mut self, user: UserId) -> Option<&mut BlockRecord> {
        self.blocks
            .iter_mut()
            .find(|b| b.user_id == user && b.is_active())
    }

    fn bank_info(&self, user: UserId) -> Option<&BankInfo> {
        self.banks.get(&user)
    }

    fn set_bank_info(&mut self, user: UserId, info: BankInfo) {
        self.users.insert(user);
        self.banks.insert(user, info);
    }

    fn next_withdrawal_id(&mut self) -> WithdrawalId {
        self.next_withdrawal_id += 1;
        self.next_withdrawal_id
    }

    fn insert_withdrawal(&mut self, request: WithdrawalRequest) {
        self.users.insert(request.tutor_id);
        self.withdrawals.insert(request.id, request);
    }

    fn withdrawal(&self, id: WithdrawalId) -> Option<&WithdrawalRequest> {
        self.withdrawals.get(&id)
    }

    fn withdrawal_mut(&mut self, id: WithdrawalId) -> Option<&mut WithdrawalRequest> {
        self.withdrawals.get_mut(&id)
    }

    fn withdrawals(&self) -> Vec<&WithdrawalRequest> {
        self.withdrawals.values().collect()
    }

    fn withdrawals_for(&self, user: UserId) -> Vec<&WithdrawalRequest> {
        self.withdrawals
            .values()
            .filter(|w| w.tutor_id == user)
            .collect()
    }

    fn next_adjustment_id(&mut self) -> u64 {
        self.next_adjustment_id += 1;
        self.next_adjustment_id
    }

    fn user_ids(&self) -> Vec<UserId> {
        self.users.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntryKind, Money, NewEntry, Reference};

    fn entry(key: &str) -> NewEntry {
        NewEntry::new(
            1,
            EntryKind::Deposit,
            Money(100),
            Reference::adjustment(1),
            key,
        )
    }

    #[test]
    fn duplicate_key_rejects_the_whole_batch() {
        let mut store = InMemoryStore::new();
        let now = Utc::now();

        store.append_entries(now, vec![entry("a")]).unwrap();
        let err = store
            .append_entries(now, vec![entry("b"), entry("a")])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateIdempotencyKey(_)));

        // Nothing from the failed batch was persisted: "b" is still free.
        assert_eq!(store.entries_for(1).len(), 1);
        store.append_entries(now, vec![entry("b")]).unwrap();
        assert_eq!(store.entries_for(1).len(), 2);
    }

    #[test]
    fn keys_duplicated_within_a_batch_are_rejected() {
        let mut store = InMemoryStore::new();
        let err = store
            .append_entries(Utc::now(), vec![entry("a"), entry("a")])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateIdempotencyKey(_)));
        assert!(store.entries_for(1).is_empty());
    }
}
