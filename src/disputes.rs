use tracing::{info, warn};

use crate::domain::{
    AdminId, BookingId, DeferredRelease, Dispute, DisputeId, DisputeKind, DisputeListing,
    DisputePriority, DisputeStatus, EngineStore, EntryKind, Error, HoldStatus, NewEntry, Reference,
    UserId, Verdict,
};
use crate::engine::Engine;

const MIN_ADMIN_NOTES_CHARS: usize = 20;

impl<S: EngineStore> Engine<S> {
    /// File a dispute against a booking whose escrow is still held. The
    /// defendant is the other party of the hold; a booking carries at most
    /// one open dispute at a time.
    pub fn file_dispute(
        &mut self,
        booking: BookingId,
        plaintiff: UserId,
        kind: DisputeKind,
        priority: DisputePriority,
        deadline_days: u32,
    ) -> Result<Dispute, Error> {
        if deadline_days == 0 {
            return Err(Error::Validation(
                "dispute deadline must be at least 1 day out".to_string(),
            ));
        }

        let hold = self
            .store
            .hold_for_booking(booking)
            .ok_or_else(|| Error::NotFound(format!("no escrow hold for booking {booking}")))?;
        if !hold.is_held() {
            return Err(Error::InvalidStateTransition(format!(
                "escrow for booking {booking} is already resolved"
            )));
        }
        if !hold.involves(plaintiff) {
            return Err(Error::Validation(format!(
                "user {plaintiff} is not a party to booking {booking}"
            )));
        }
        let defendant = if hold.payer_id == plaintiff {
            hold.payee_id
        } else {
            hold.payer_id
        };
        if let Some(open) = self.store.open_dispute_for_booking(booking) {
            return Err(Error::InvalidStateTransition(format!(
                "booking {booking} already has open dispute {open}"
            )));
        }

        let now = self.now();
        let id = self.store.next_dispute_id();
        let dispute = Dispute {
            id,
            booking_id: booking,
            plaintiff_id: plaintiff,
            defendant_id: defendant,
            kind,
            priority,
            status: DisputeStatus::Pending,
            verdict: None,
            admin_notes: None,
            created_at: now,
            deadline_at: now + chrono::Duration::days(i64::from(deadline_days)),
            investigated_by: None,
            resolved_at: None,
            resolved_by: None,
            resolution_key: None,
        };
        self.store.insert_dispute(dispute.clone());
        if let Some(hold) = self.store.hold_for_booking_mut(booking) {
            hold.dispute_id = Some(id);
        }

        info!(dispute = id, booking, plaintiff, defendant, "dispute filed");
        Ok(dispute)
    }

    /// Assign admin attention. Informational only: no funds move, and
    /// resolution does not require it.
    pub fn start_investigation(&mut self, id: DisputeId, admin: AdminId) -> Result<(), Error> {
        let dispute = self
            .store
            .dispute_mut(id)
            .ok_or_else(|| Error::NotFound(format!("dispute {id}")))?;
        match dispute.status {
            DisputeStatus::Pending => {
                dispute.status = DisputeStatus::Investigating;
                dispute.investigated_by = Some(admin);
                info!(dispute = id, admin, "dispute under investigation");
                Ok(())
            }
            DisputeStatus::Investigating => Err(Error::InvalidStateTransition(format!(
                "dispute {id} is already under investigation"
            ))),
            DisputeStatus::Resolved => Err(Error::InvalidStateTransition(format!(
                "dispute {id} is already resolved"
            ))),
        }
    }

    /// Resolve a dispute with a verdict, applying the verdict's ledger
    /// movements atomically with the transition to `Resolved`.
    ///
    /// The resolution is idempotent under its key: a second call carrying
    /// the key that already resolved the dispute returns the recorded
    /// outcome without writing anything. A resolution attempt with a fresh
    /// key against a resolved dispute is rejected.
    pub fn resolve_dispute(
        &mut self,
        id: DisputeId,
        verdict: Verdict,
        notes: &str,
        admin: AdminId,
        idempotency_key: Option<String>,
    ) -> Result<Dispute, Error> {
        let key = idempotency_key.unwrap_or_else(|| format!("dispute:{id}:resolve"));

        let dispute = self
            .store
            .dispute(id)
            .ok_or_else(|| Error::NotFound(format!("dispute {id}")))?;
        if dispute.status == DisputeStatus::Resolved {
            if dispute.resolution_key.as_deref() == Some(key.as_str()) {
                warn!(dispute = id, %key, "duplicate resolution replayed as no-op");
                return Ok(dispute.clone());
            }
            return Err(Error::InvalidStateTransition(format!(
                "dispute {id} is already resolved"
            )));
        }
        if notes.trim().chars().count() < MIN_ADMIN_NOTES_CHARS {
            return Err(Error::Validation(format!(
                "admin notes must be at least {MIN_ADMIN_NOTES_CHARS} characters"
            )));
        }

        let booking = dispute.booking_id;
        let hold = self
            .store
            .hold_for_booking(booking)
            .ok_or_else(|| Error::NotFound(format!("no escrow hold for booking {booking}")))?;
        if !hold.is_held() {
            return Err(Error::InvalidStateTransition(format!(
                "escrow for booking {booking} is already consumed"
            )));
        }
        let amount = hold.amount;
        let payer = hold.payer_id;
        let payee = hold.payee_id;

        // Escrow consumption plus the verdict's credited movements; the
        // credited side always sums back to the hold amount.
        let mut movements = vec![NewEntry::new(
            payer,
            EntryKind::Escrow,
            amount.negated(),
            Reference::dispute(id),
            format!("{key}:escrow"),
        )];
        let hold_outcome = match verdict {
            Verdict::RefundFull => {
                movements.push(NewEntry::new(
                    payer,
                    EntryKind::Refund,
                    amount,
                    Reference::dispute(id),
                    format!("{key}:refund"),
                ));
                HoldStatus::Refunded
            }
            Verdict::RefundHalf => {
                let (refund, release) = amount.split_half();
                movements.push(NewEntry::new(
                    payer,
                    EntryKind::Refund,
                    refund,
                    Reference::dispute(id),
                    format!("{key}:refund"),
                ));
                movements.push(NewEntry::new(
                    payee,
                    EntryKind::Release,
                    release,
                    Reference::dispute(id),
                    format!("{key}:release"),
                ));
                HoldStatus::Split
            }
            Verdict::ReleaseToTutor => {
                movements.push(NewEntry::new(
                    payee,
                    EntryKind::Release,
                    amount,
                    Reference::dispute(id),
                    format!("{key}:release"),
                ));
                HoldStatus::Released
            }
            Verdict::FreeCredit => {
                movements.push(NewEntry::new(
                    payer,
                    EntryKind::Refund,
                    amount,
                    Reference::dispute_credit(id),
                    format!("{key}:credit"),
                ));
                HoldStatus::Refunded
            }
            // The payout waits for external confirmation of the makeup
            // session; the hold itself is consumed now.
            Verdict::Makeup => HoldStatus::Released,
        };

        let now = self.now();
        self.store.append_entries(now, movements)?;

        if let Some(hold) = self.store.hold_for_booking_mut(booking) {
            hold.status = hold_outcome;
            hold.resolved_at = Some(now);
        }
        if verdict == Verdict::Makeup {
            self.store.push_deferred_release(DeferredRelease {
                dispute_id: id,
                payee_id: payee,
                amount,
                confirmed: false,
                created_at: now,
                confirmed_at: None,
            });
        }

        let dispute = self
            .store
            .dispute_mut(id)
            .ok_or_else(|| Error::NotFound(format!("dispute {id}")))?;
        dispute.status = DisputeStatus::Resolved;
        dispute.verdict = Some(verdict);
        dispute.admin_notes = Some(notes.trim().to_string());
        dispute.resolved_at = Some(now);
        dispute.resolved_by = Some(admin);
        dispute.resolution_key = Some(key);
        let resolved = dispute.clone();

        info!(dispute = id, ?verdict, admin, "dispute resolved");
        Ok(resolved)
    }

    /// External confirmation that a makeup session took place: releases the
    /// deferred payout of a Makeup verdict exactly once.
    pub fn confirm_makeup(&mut self, id: DisputeId) -> Result<(), Error> {
        let (payee, amount, confirmed) = match self.store.deferred_release_mut(id) {
            Some(release) => (release.payee_id, release.amount, release.confirmed),
            None => {
                return Err(Error::NotFound(format!(
                    "no deferred release for dispute {id}"
                )));
            }
        };
        if confirmed {
            warn!(dispute = id, "makeup already confirmed, no-op");
            return Ok(());
        }

        let now = self.now();
        self.store.append_entries(
            now,
            vec![NewEntry::new(
                payee,
                EntryKind::Release,
                amount,
                Reference::dispute(id),
                format!("dispute:{id}:makeup-release"),
            )],
        )?;
        if let Some(release) = self.store.deferred_release_mut(id) {
            release.confirmed = true;
            release.confirmed_at = Some(now);
        }

        info!(dispute = id, payee, %amount, "deferred makeup release paid");
        Ok(())
    }

    pub fn dispute(&self, id: DisputeId) -> Option<Dispute> {
        self.store.dispute(id).cloned()
    }

    /// All disputes with their computed urgency. A dispute past its deadline
    /// is surfaced as urgent but never auto-resolved.
    pub fn disputes(&self) -> Vec<DisputeListing> {
        let now = self.now();
        self.store
            .disputes()
            .into_iter()
            .map(|d| DisputeListing {
                urgent: d.is_urgent(now),
                dispute: d.clone(),
            })
            .collect()
    }
}
