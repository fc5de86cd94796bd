use crate::domain::{
    AdminId, BookingId, DisputeId, DisputeKind, DisputePriority, Money, Severity, UserId, Verdict,
    WithdrawalId,
};

/// One engine operation, as replayed from an operations journal or issued
/// by a caller. Booking facts (payment capture) and external confirmations
/// (transfer settled, makeup session held) arrive through the same stream
/// as admin and tutor actions.
#[derive(Debug, Clone)]
pub enum Operation {
    Deposit {
        user: UserId,
        amount: Money,
    },
    RegisterBank {
        user: UserId,
        holder: String,
        masked_account: String,
    },
    CapturePayment {
        booking: BookingId,
        payer: UserId,
        payee: UserId,
        amount: Money,
    },
    FileDispute {
        booking: BookingId,
        plaintiff: UserId,
        kind: DisputeKind,
        priority: DisputePriority,
        deadline_days: u32,
    },
    StartInvestigation {
        dispute: DisputeId,
        admin: AdminId,
    },
    ResolveDispute {
        dispute: DisputeId,
        verdict: Verdict,
        notes: String,
        admin: AdminId,
    },
    ConfirmMakeup {
        dispute: DisputeId,
    },
    IssueWarning {
        user: UserId,
        severity: Severity,
        reason: String,
        admin: AdminId,
        booking: Option<BookingId>,
    },
    Suspend {
        user: UserId,
        days: u32,
        reason: String,
        admin: AdminId,
    },
    LiftSuspension {
        user: UserId,
        admin: AdminId,
    },
    Block {
        user: UserId,
        reason: String,
        confirmation: String,
        admin: AdminId,
    },
    Unblock {
        user: UserId,
        reason: String,
        admin: AdminId,
    },
    CreateWithdrawal {
        tutor: UserId,
        amount: Money,
    },
    ApproveWithdrawal {
        id: WithdrawalId,
        admin: AdminId,
    },
    RejectWithdrawal {
        id: WithdrawalId,
        reason: String,
        admin: AdminId,
    },
    CancelWithdrawal {
        id: WithdrawalId,
        tutor: UserId,
    },
    CompleteWithdrawal {
        id: WithdrawalId,
    },
}
