use tracing::info;

use crate::domain::{
    AccountStatus, AdminId, BankInfo, EngineStore, EntryId, EntryKind, Error, Money, NewEntry,
    Reference, UserId, WithdrawalId, WithdrawalRequest, WithdrawalStatus,
};
use crate::engine::Engine;

const MIN_REJECT_REASON_CHARS: usize = 10;

impl<S: EngineStore> Engine<S> {
    /// Record the user's verified bank details, as reported by the external
    /// identity subsystem. Snapshotted into each withdrawal request.
    pub fn register_bank(
        &mut self,
        user: UserId,
        holder: String,
        masked_account: String,
    ) -> Result<(), Error> {
        if holder.trim().is_empty() || masked_account.trim().is_empty() {
            return Err(Error::Validation(
                "bank holder and account must not be empty".to_string(),
            ));
        }
        self.store.set_bank_info(
            user,
            BankInfo {
                holder: holder.trim().to_string(),
                masked_account: masked_account.trim().to_string(),
                verified: true,
            },
        );
        info!(user, "bank details registered");
        Ok(())
    }

    /// Reserve part of the tutor's available balance into a pending
    /// withdrawal. The availability check and the reservation are one
    /// atomic step, so concurrent requests cannot both pass the guard.
    pub fn create_withdrawal(
        &mut self,
        tutor: UserId,
        amount: Money,
    ) -> Result<WithdrawalRequest, Error> {
        if !amount.is_positive() {
            return Err(Error::Validation(
                "withdrawal amount must be positive".to_string(),
            ));
        }
        match self.account_status(tutor) {
            AccountStatus::Active => {}
            AccountStatus::Suspended => {
                return Err(Error::AccountIneligible(format!(
                    "user {tutor} is suspended and cannot withdraw"
                )));
            }
            AccountStatus::Blocked => {
                return Err(Error::AccountIneligible(format!(
                    "user {tutor} is blocked and cannot withdraw"
                )));
            }
        }
        let bank = match self.store.bank_info(tutor) {
            Some(bank) if bank.verified => bank.clone(),
            _ => {
                return Err(Error::AccountIneligible(format!(
                    "user {tutor} has no verified bank details"
                )));
            }
        };
        let available = self.balance_of(tutor)?.available;
        if amount > available {
            return Err(Error::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let request = WithdrawalRequest {
            id: self.store.next_withdrawal_id(),
            tutor_id: tutor,
            amount,
            status: WithdrawalStatus::Pending,
            bank_snapshot: bank,
            requested_at: self.now(),
            processed_at: None,
            admin_note: None,
        };
        self.store.insert_withdrawal(request.clone());

        info!(withdrawal = request.id, tutor, %amount, "withdrawal requested");
        Ok(request)
    }

    /// Admin approval. Only a still-pending request can be approved, which
    /// shields against double-processing from concurrent admin clicks.
    pub fn approve_withdrawal(&mut self, id: WithdrawalId, admin: AdminId) -> Result<(), Error> {
        let now = self.now();
        let request = self
            .store
            .withdrawal_mut(id)
            .ok_or_else(|| Error::NotFound(format!("withdrawal {id}")))?;
        if request.status != WithdrawalStatus::Pending {
            return Err(Error::InvalidStateTransition(format!(
                "withdrawal {id} is not pending"
            )));
        }
        request.status = WithdrawalStatus::Approved;
        request.processed_at = Some(now);

        info!(withdrawal = id, admin, "withdrawal approved");
        Ok(())
    }

    /// External confirmation that the transfer settled: the reservation
    /// becomes a ledger movement and the request completes.
    pub fn complete_withdrawal(&mut self, id: WithdrawalId) -> Result<EntryId, Error> {
        let (tutor, amount) = {
            let request = self
                .store
                .withdrawal(id)
                .ok_or_else(|| Error::NotFound(format!("withdrawal {id}")))?;
            if request.status != WithdrawalStatus::Approved {
                return Err(Error::InvalidStateTransition(format!(
                    "withdrawal {id} is not approved"
                )));
            }
            (request.tutor_id, request.amount)
        };

        let now = self.now();
        let ids = self.store.append_entries(
            now,
            vec![NewEntry::new(
                tutor,
                EntryKind::Withdrawal,
                amount.negated(),
                Reference::withdrawal(id),
                format!("withdrawal:{id}:complete"),
            )],
        )?;
        if let Some(request) = self.store.withdrawal_mut(id) {
            request.status = WithdrawalStatus::Completed;
            request.processed_at = Some(now);
        }

        info!(withdrawal = id, tutor, %amount, "withdrawal completed");
        Ok(ids[0])
    }

    /// Reject a pending request. No ledger entry was ever written for the
    /// reservation, so the available balance is restored exactly.
    pub fn reject_withdrawal(
        &mut self,
        id: WithdrawalId,
        reason: &str,
        admin: AdminId,
    ) -> Result<(), Error> {
        if reason.trim().chars().count() < MIN_REJECT_REASON_CHARS {
            return Err(Error::Validation(format!(
                "rejection reason must be at least {MIN_REJECT_REASON_CHARS} characters"
            )));
        }
        let now = self.now();
        let request = self
            .store
            .withdrawal_mut(id)
            .ok_or_else(|| Error::NotFound(format!("withdrawal {id}")))?;
        if request.status != WithdrawalStatus::Pending {
            return Err(Error::InvalidStateTransition(format!(
                "withdrawal {id} is not pending"
            )));
        }
        request.status = WithdrawalStatus::Rejected;
        request.processed_at = Some(now);
        request.admin_note = Some(reason.trim().to_string());

        info!(withdrawal = id, admin, "withdrawal rejected");
        Ok(())
    }

    /// Requester-initiated cancellation, legal only while pending.
    pub fn cancel_withdrawal(&mut self, id: WithdrawalId, tutor: UserId) -> Result<(), Error> {
        let now = self.now();
        let request = self
            .store
            .withdrawal_mut(id)
            .ok_or_else(|| Error::NotFound(format!("withdrawal {id}")))?;
        if request.tutor_id != tutor {
            return Err(Error::Validation(format!(
                "withdrawal {id} does not belong to user {tutor}"
            )));
        }
        if request.status != WithdrawalStatus::Pending {
            return Err(Error::InvalidStateTransition(format!(
                "withdrawal {id} is not pending"
            )));
        }
        request.status = WithdrawalStatus::Cancelled;
        request.processed_at = Some(now);

        info!(withdrawal = id, tutor, "withdrawal cancelled");
        Ok(())
    }

    pub fn withdrawal(&self, id: WithdrawalId) -> Option<WithdrawalRequest> {
        self.store.withdrawal(id).cloned()
    }

    pub fn withdrawals(&self) -> Vec<WithdrawalRequest> {
        self.store.withdrawals().into_iter().cloned().collect()
    }
}
