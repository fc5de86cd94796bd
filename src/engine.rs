use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;

use crate::domain::{
    Clock, DeadLetterQueue, EngineStore, Error, Operation, OperationStream, SystemClock,
};

/// The escrow dispute-resolution and moderation-enforcement engine.
///
/// Owns the persistence boundary and applies one operation at a time: every
/// guard is checked before the first write, and the ledger movements of an
/// operation commit together with its state transition. Callers that need
/// concurrent access wrap the engine in [`crate::service::EscrowService`],
/// which serializes operations per affected user.
pub struct Engine<S: EngineStore> {
    pub(crate) store: S,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<S: EngineStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Apply a single operation against the store.
    pub fn apply(&mut self, op: Operation) -> Result<(), Error> {
        match op {
            Operation::Deposit { user, amount } => self.deposit(user, amount).map(|_| ()),
            Operation::RegisterBank {
                user,
                holder,
                masked_account,
            } => self.register_bank(user, holder, masked_account),
            Operation::CapturePayment {
                booking,
                payer,
                payee,
                amount,
            } => self.capture_payment(booking, payer, payee, amount),
            Operation::FileDispute {
                booking,
                plaintiff,
                kind,
                priority,
                deadline_days,
            } => self
                .file_dispute(booking, plaintiff, kind, priority, deadline_days)
                .map(|_| ()),
            Operation::StartInvestigation { dispute, admin } => {
                self.start_investigation(dispute, admin)
            }
            Operation::ResolveDispute {
                dispute,
                verdict,
                notes,
                admin,
            } => self
                .resolve_dispute(dispute, verdict, &notes, admin, None)
                .map(|_| ()),
            Operation::ConfirmMakeup { dispute } => self.confirm_makeup(dispute),
            Operation::IssueWarning {
                user,
                severity,
                reason,
                admin,
                booking,
            } => self
                .issue_warning(user, &reason, severity, booking, admin)
                .map(|_| ()),
            Operation::Suspend {
                user,
                days,
                reason,
                admin,
            } => self.suspend(user, &reason, days, admin).map(|_| ()),
            Operation::LiftSuspension { user, admin } => self.lift_suspension(user, admin),
            Operation::Block {
                user,
                reason,
                confirmation,
                admin,
            } => self.block(user, &reason, &confirmation, admin),
            Operation::Unblock {
                user,
                reason,
                admin,
            } => self.unblock(user, &reason, admin),
            Operation::CreateWithdrawal { tutor, amount } => {
                self.create_withdrawal(tutor, amount).map(|_| ())
            }
            Operation::ApproveWithdrawal { id, admin } => self.approve_withdrawal(id, admin),
            Operation::RejectWithdrawal { id, reason, admin } => {
                self.reject_withdrawal(id, &reason, admin)
            }
            Operation::CancelWithdrawal { id, tutor } => self.cancel_withdrawal(id, tutor),
            Operation::CompleteWithdrawal { id } => self.complete_withdrawal(id).map(|_| ()),
        }
    }

    /// Drain an operation stream, reporting per-operation failures to the
    /// dead-letter queue and continuing with the rest of the stream.
    pub async fn replay<I, D>(&mut self, mut ingestion: I, dlq: &D) -> Result<(), Error>
    where
        I: OperationStream,
        D: DeadLetterQueue,
    {
        let mut ops = ingestion.stream();

        while let Some(op) = ops.next().await {
            match op {
                Ok(op) => {
                    if let Err(e) = self.apply(op) {
                        dlq.report(&e);
                    }
                }
                Err(e) => dlq.report(&e),
            }
        }

        Ok(())
    }
}
