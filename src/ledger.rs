use tracing::info;

use crate::domain::{
    Balance, BookingId, EngineStore, EntryId, EntryKind, Error, EscrowHold, HoldStatus,
    LedgerEntry, Money, NewEntry, Reference, ReferenceKind, UserId,
};
use crate::engine::Engine;

impl<S: EngineStore> Engine<S> {
    pub fn entries_for(&self, user: UserId) -> Vec<LedgerEntry> {
        self.store.entries_for(user).into_iter().cloned().collect()
    }

    pub fn escrow_hold(&self, booking: BookingId) -> Option<EscrowHold> {
        self.store.hold_for_booking(booking).cloned()
    }

    /// Balances are always derived by folding the user's ledger entries,
    /// combined with the holds and withdrawal reservations currently
    /// attributable to the user. A fold that would overflow halts the
    /// operation instead of committing a wrapped balance.
    pub fn balance_of(&self, user: UserId) -> Result<Balance, Error> {
        let overflow =
            || Error::LedgerCorruption(format!("balance fold for user {user} overflowed"));

        let mut total = Money::ZERO;
        let mut credit = Money::ZERO;
        let mut lifetime_earned = Money::ZERO;

        for entry in self.store.entries_for(user) {
            total = total.checked_add(entry.amount).ok_or_else(overflow)?;
            if entry.kind == EntryKind::Refund
                && entry.reference.kind == ReferenceKind::DisputeCredit
            {
                credit = credit.checked_add(entry.amount).ok_or_else(overflow)?;
            }
            if entry.kind == EntryKind::Release && entry.amount.is_positive() {
                lifetime_earned = lifetime_earned
                    .checked_add(entry.amount)
                    .ok_or_else(overflow)?;
            }
        }

        let mut held = Money::ZERO;
        for hold in self.store.active_holds() {
            if hold.payer_id == user {
                held = held.checked_add(hold.amount).ok_or_else(overflow)?;
            }
        }

        let mut in_transit = Money::ZERO;
        for request in self.store.withdrawals_for(user) {
            if request.reserves_funds() {
                in_transit = in_transit
                    .checked_add(request.amount)
                    .ok_or_else(overflow)?;
            }
        }

        let available = total
            .checked_sub(held)
            .and_then(|m| m.checked_sub(in_transit))
            .and_then(|m| m.checked_sub(credit))
            .ok_or_else(overflow)?;

        Ok(Balance {
            total,
            available,
            held,
            in_transit,
            credit,
            lifetime_earned,
        })
    }

    /// Credit a platform balance adjustment to a user.
    pub fn deposit(&mut self, user: UserId, amount: Money) -> Result<EntryId, Error> {
        if !amount.is_positive() {
            return Err(Error::Validation(
                "deposit amount must be positive".to_string(),
            ));
        }

        let adjustment = self.store.next_adjustment_id();
        let now = self.now();
        let ids = self.store.append_entries(
            now,
            vec![NewEntry::new(
                user,
                EntryKind::Deposit,
                amount,
                Reference::adjustment(adjustment),
                format!("adjustment:{adjustment}:deposit"),
            )],
        )?;

        info!(user, %amount, "deposit credited");
        Ok(ids[0])
    }

    /// Consume the booking fact "payment captured": escrow the amount from
    /// the payer and open the booking's hold. A booking is captured at most
    /// once.
    pub fn capture_payment(
        &mut self,
        booking: BookingId,
        payer: UserId,
        payee: UserId,
        amount: Money,
    ) -> Result<(), Error> {
        if !amount.is_positive() {
            return Err(Error::Validation(
                "captured amount must be positive".to_string(),
            ));
        }
        if payer == payee {
            return Err(Error::Validation(
                "payer and payee must be distinct users".to_string(),
            ));
        }
        if self.store.hold_for_booking(booking).is_some() {
            return Err(Error::InvalidStateTransition(format!(
                "booking {booking} already has an escrow hold"
            )));
        }
        for user in [payer, payee] {
            if self.store.active_block(user).is_some() {
                return Err(Error::AccountIneligible(format!(
                    "user {user} is blocked and cannot receive new bookings"
                )));
            }
        }

        let now = self.now();
        self.store.append_entries(
            now,
            vec![NewEntry::new(
                payer,
                EntryKind::Escrow,
                amount,
                Reference::booking(booking),
                format!("booking:{booking}:capture"),
            )],
        )?;
        self.store.insert_hold(EscrowHold {
            booking_id: booking,
            payer_id: payer,
            payee_id: payee,
            dispute_id: None,
            amount,
            status: HoldStatus::Held,
            created_at: now,
            resolved_at: None,
        });

        info!(booking, payer, payee, %amount, "escrow hold opened");
        Ok(())
    }
}
