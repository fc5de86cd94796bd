use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use escrow_engine::BLOCK_CONFIRMATION_PHRASE;
use escrow_engine::domain::{
    AccountStatus, DisputeId, DisputeKind, DisputePriority, DisputeStatus, EntryKind, Error,
    HoldStatus, ManualClock, Money, Severity, Verdict, WithdrawalStatus,
};
use escrow_engine::engine::Engine;
use escrow_engine::store::InMemoryStore;

const STUDENT: u64 = 1;
const TUTOR: u64 = 2;
const ADMIN: u64 = 9;
const BOOKING: u64 = 10;
const NOTES: &str = "Reviewed chat transcripts and the session recording";

fn engine() -> (Engine<InMemoryStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));
    (
        Engine::with_clock(InMemoryStore::new(), clock.clone()),
        clock,
    )
}

fn capture(engine: &mut Engine<InMemoryStore>, amount: i64) {
    engine
        .capture_payment(BOOKING, STUDENT, TUTOR, Money(amount))
        .unwrap();
}

fn file(engine: &mut Engine<InMemoryStore>) -> DisputeId {
    engine
        .file_dispute(
            BOOKING,
            STUDENT,
            DisputeKind::Quality,
            DisputePriority::Normal,
            7,
        )
        .unwrap()
        .id
}

fn funded_tutor(engine: &mut Engine<InMemoryStore>, amount: i64) {
    engine.deposit(TUTOR, Money(amount)).unwrap();
    engine
        .register_bank(TUTOR, "Alice Tran".to_string(), "VCB ****1234".to_string())
        .unwrap();
}

#[test]
fn release_to_tutor_moves_the_full_hold() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    let dispute = file(&mut engine);

    engine
        .resolve_dispute(dispute, Verdict::ReleaseToTutor, NOTES, ADMIN, None)
        .unwrap();

    let releases: Vec<_> = engine
        .entries_for(TUTOR)
        .into_iter()
        .filter(|e| e.kind == EntryKind::Release)
        .collect();
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].amount, Money(1_000_000));

    assert_eq!(
        engine.escrow_hold(BOOKING).unwrap().status,
        HoldStatus::Released
    );
    assert_eq!(
        engine.dispute(dispute).unwrap().status,
        DisputeStatus::Resolved
    );

    let tutor = engine.balance_of(TUTOR).unwrap();
    assert_eq!(tutor.available, Money(1_000_000));
    assert_eq!(tutor.lifetime_earned, Money(1_000_000));
    let student = engine.balance_of(STUDENT).unwrap();
    assert_eq!(student.total, Money::ZERO);
    assert_eq!(student.held, Money::ZERO);
}

#[test]
fn refund_half_conserves_odd_amounts() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_001);
    let dispute = file(&mut engine);

    engine
        .resolve_dispute(dispute, Verdict::RefundHalf, NOTES, ADMIN, None)
        .unwrap();

    let refund: i64 = engine
        .entries_for(STUDENT)
        .into_iter()
        .filter(|e| e.kind == EntryKind::Refund)
        .map(|e| e.amount.as_minor())
        .sum();
    let release: i64 = engine
        .entries_for(TUTOR)
        .into_iter()
        .filter(|e| e.kind == EntryKind::Release)
        .map(|e| e.amount.as_minor())
        .sum();

    assert_eq!(refund, 500_001);
    assert_eq!(release, 500_000);
    assert_eq!(refund + release, 1_000_001);
    assert_eq!(
        engine.escrow_hold(BOOKING).unwrap().status,
        HoldStatus::Split
    );
}

#[test]
fn refund_full_returns_funds_to_the_student() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    let dispute = file(&mut engine);

    engine
        .resolve_dispute(dispute, Verdict::RefundFull, NOTES, ADMIN, None)
        .unwrap();

    let student = engine.balance_of(STUDENT).unwrap();
    assert_eq!(student.available, Money(1_000_000));
    assert_eq!(student.held, Money::ZERO);
    assert_eq!(engine.balance_of(TUTOR).unwrap().total, Money::ZERO);
}

#[test]
fn free_credit_is_excluded_from_available() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    let dispute = file(&mut engine);

    engine
        .resolve_dispute(dispute, Verdict::FreeCredit, NOTES, ADMIN, None)
        .unwrap();

    let student = engine.balance_of(STUDENT).unwrap();
    assert_eq!(student.total, Money(1_000_000));
    assert_eq!(student.credit, Money(1_000_000));
    assert_eq!(student.available, Money::ZERO);
}

#[test]
fn resolve_is_idempotent_under_duplicate_key() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    let dispute = file(&mut engine);
    let key = Some("resolution-7f3a".to_string());

    let first = engine
        .resolve_dispute(dispute, Verdict::RefundFull, NOTES, ADMIN, key.clone())
        .unwrap();
    let entries_after_first = engine.entries_for(STUDENT).len();

    let second = engine
        .resolve_dispute(dispute, Verdict::RefundFull, NOTES, ADMIN, key)
        .unwrap();

    assert_eq!(first.verdict, second.verdict);
    assert_eq!(engine.entries_for(STUDENT).len(), entries_after_first);
}

#[test]
fn resolving_a_resolved_dispute_with_a_fresh_key_is_rejected() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    let dispute = file(&mut engine);

    engine
        .resolve_dispute(dispute, Verdict::RefundFull, NOTES, ADMIN, None)
        .unwrap();
    let err = engine
        .resolve_dispute(
            dispute,
            Verdict::ReleaseToTutor,
            NOTES,
            ADMIN,
            Some("another-attempt".to_string()),
        )
        .unwrap_err();

    assert!(matches!(err, Error::InvalidStateTransition(_)));
}

#[test]
fn resolution_requires_substantive_admin_notes() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    let dispute = file(&mut engine);

    let err = engine
        .resolve_dispute(dispute, Verdict::RefundFull, "too short", ADMIN, None)
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Nothing moved and the dispute is still open.
    assert_eq!(
        engine.dispute(dispute).unwrap().status,
        DisputeStatus::Pending
    );
    assert!(engine.escrow_hold(BOOKING).unwrap().is_held());
}

#[test]
fn makeup_defers_the_release_until_confirmation() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    let dispute = file(&mut engine);

    engine
        .resolve_dispute(dispute, Verdict::Makeup, NOTES, ADMIN, None)
        .unwrap();
    assert_eq!(
        engine.escrow_hold(BOOKING).unwrap().status,
        HoldStatus::Released
    );
    assert_eq!(engine.balance_of(TUTOR).unwrap().total, Money::ZERO);

    engine.confirm_makeup(dispute).unwrap();
    assert_eq!(engine.balance_of(TUTOR).unwrap().available, Money(1_000_000));

    // A second confirmation is a no-op, not a second payout.
    engine.confirm_makeup(dispute).unwrap();
    assert_eq!(engine.balance_of(TUTOR).unwrap().available, Money(1_000_000));
}

#[test]
fn dispute_past_deadline_is_urgent_but_not_auto_resolved() {
    let (mut engine, clock) = engine();
    capture(&mut engine, 1_000_000);
    engine
        .file_dispute(
            BOOKING,
            STUDENT,
            DisputeKind::NoShow,
            DisputePriority::Normal,
            1,
        )
        .unwrap();

    clock.advance(Duration::days(2));

    let listings = engine.disputes();
    assert_eq!(listings.len(), 1);
    assert!(listings[0].urgent);
    assert_eq!(listings[0].dispute.status, DisputeStatus::Pending);
}

#[test]
fn investigation_is_informational_and_gated() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    let dispute = file(&mut engine);

    engine.start_investigation(dispute, ADMIN).unwrap();
    assert_eq!(
        engine.dispute(dispute).unwrap().status,
        DisputeStatus::Investigating
    );
    assert_eq!(engine.balance_of(STUDENT).unwrap().held, Money(1_000_000));

    let err = engine.start_investigation(dispute, ADMIN).unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
}

#[test]
fn second_suspension_rejected_while_active_accepted_after_expiry() {
    let (mut engine, clock) = engine();
    let reason = "Repeated late cancellations";

    engine.suspend(TUTOR, reason, 30, ADMIN).unwrap();
    let err = engine.suspend(TUTOR, reason, 10, ADMIN).unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
    assert_eq!(engine.account_status(TUTOR), AccountStatus::Suspended);

    clock.advance(Duration::days(31));
    assert_eq!(engine.account_status(TUTOR), AccountStatus::Active);
    engine.suspend(TUTOR, reason, 10, ADMIN).unwrap();
}

#[test]
fn lifted_suspension_allows_a_new_one() {
    let (mut engine, _) = engine();
    let reason = "Repeated late cancellations";

    engine.suspend(TUTOR, reason, 30, ADMIN).unwrap();
    engine.lift_suspension(TUTOR, ADMIN).unwrap();
    assert_eq!(engine.account_status(TUTOR), AccountStatus::Active);
    engine.suspend(TUTOR, reason, 5, ADMIN).unwrap();

    let err = engine.lift_suspension(STUDENT, ADMIN).unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
}

#[test]
fn suspension_duration_is_bounded() {
    let (mut engine, _) = engine();
    let reason = "Repeated late cancellations";

    for days in [0, 366] {
        let err = engine.suspend(TUTOR, reason, days, ADMIN).unwrap_err();
        assert!(matches!(err, Error::InvalidDuration { .. }));
    }
}

#[test]
fn block_requires_the_exact_confirmation_phrase() {
    let (mut engine, _) = engine();
    let reason = "Fraudulent payment details used across multiple bookings";

    let err = engine.block(TUTOR, reason, "block account", ADMIN).unwrap_err();
    assert!(matches!(err, Error::ConfirmationMismatch));

    // A wrong phrase is a mismatch even when the reason is also too short.
    let err = engine.block(TUTOR, "fraud", "block account", ADMIN).unwrap_err();
    assert!(matches!(err, Error::ConfirmationMismatch));
    assert_eq!(engine.account_status(TUTOR), AccountStatus::Active);

    engine
        .block(TUTOR, reason, BLOCK_CONFIRMATION_PHRASE, ADMIN)
        .unwrap();
    assert_eq!(engine.account_status(TUTOR), AccountStatus::Blocked);
}

#[test]
fn block_cascade_refunds_held_escrow_and_closes_the_dispute() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    let dispute = file(&mut engine);

    engine
        .block(
            TUTOR,
            "Fraudulent payment details used across multiple bookings",
            BLOCK_CONFIRMATION_PHRASE,
            ADMIN,
        )
        .unwrap();

    let student = engine.balance_of(STUDENT).unwrap();
    assert_eq!(student.available, Money(1_000_000));
    assert_eq!(student.held, Money::ZERO);
    assert_eq!(
        engine.escrow_hold(BOOKING).unwrap().status,
        HoldStatus::Refunded
    );

    let closed = engine.dispute(dispute).unwrap();
    assert_eq!(closed.status, DisputeStatus::Resolved);
    assert_eq!(closed.verdict, Some(Verdict::RefundFull));
}

#[test]
fn blocked_tutor_cannot_withdraw_but_admin_can_reject_pending() {
    let (mut engine, _) = engine();
    funded_tutor(&mut engine, 5_000_000);
    let pending = engine.create_withdrawal(TUTOR, Money(1_000_000)).unwrap();

    engine
        .block(
            TUTOR,
            "Fraudulent payment details used across multiple bookings",
            BLOCK_CONFIRMATION_PHRASE,
            ADMIN,
        )
        .unwrap();

    let err = engine.create_withdrawal(TUTOR, Money(500_000)).unwrap_err();
    assert!(matches!(err, Error::AccountIneligible(_)));

    // The existing request is resolved administratively, not dropped.
    engine
        .reject_withdrawal(pending.id, "Account blocked pending review", ADMIN)
        .unwrap();
    assert_eq!(
        engine.withdrawal(pending.id).unwrap().status,
        WithdrawalStatus::Rejected
    );
    assert_eq!(engine.balance_of(TUTOR).unwrap().in_transit, Money::ZERO);
}

#[test]
fn unblock_falls_back_to_the_suspension_projection() {
    let (mut engine, _) = engine();
    engine
        .suspend(TUTOR, "Repeated late cancellations", 30, ADMIN)
        .unwrap();
    engine
        .issue_warning(TUTOR, "Late to session twice", Severity::Medium, None, ADMIN)
        .unwrap();
    engine
        .block(
            TUTOR,
            "Fraudulent payment details used across multiple bookings",
            BLOCK_CONFIRMATION_PHRASE,
            ADMIN,
        )
        .unwrap();
    assert_eq!(engine.account_status(TUTOR), AccountStatus::Blocked);

    engine
        .unblock(TUTOR, "Identity re-verified", ADMIN)
        .unwrap();
    assert_eq!(engine.account_status(TUTOR), AccountStatus::Suspended);

    // History survives the block/unblock round trip.
    assert_eq!(engine.warnings_for(TUTOR).len(), 1);
    assert_eq!(engine.suspensions_for(TUTOR).len(), 1);
}

#[test]
fn withdrawal_rejected_on_insufficient_balance() {
    let (mut engine, _) = engine();
    funded_tutor(&mut engine, 1_500_000);

    let err = engine.create_withdrawal(TUTOR, Money(2_000_000)).unwrap_err();
    assert!(matches!(err, Error::InsufficientBalance { .. }));

    engine.deposit(TUTOR, Money(500_000)).unwrap();
    engine.create_withdrawal(TUTOR, Money(2_000_000)).unwrap();
    assert_eq!(engine.balance_of(TUTOR).unwrap().available, Money::ZERO);
}

#[test]
fn rejection_restores_available_exactly() {
    let (mut engine, _) = engine();
    funded_tutor(&mut engine, 5_000_000);

    let request = engine.create_withdrawal(TUTOR, Money(3_000_000)).unwrap();
    assert_eq!(engine.balance_of(TUTOR).unwrap().available, Money(2_000_000));

    engine
        .reject_withdrawal(request.id, "Bank details mismatch", ADMIN)
        .unwrap();
    let balance = engine.balance_of(TUTOR).unwrap();
    assert_eq!(balance.available, Money(5_000_000));
    assert_eq!(balance.in_transit, Money::ZERO);
}

#[test]
fn withdrawal_full_lifecycle() {
    let (mut engine, _) = engine();
    funded_tutor(&mut engine, 5_000_000);

    let request = engine.create_withdrawal(TUTOR, Money(3_000_000)).unwrap();
    assert_eq!(request.status, WithdrawalStatus::Pending);
    assert_eq!(engine.balance_of(TUTOR).unwrap().in_transit, Money(3_000_000));

    engine.approve_withdrawal(request.id, ADMIN).unwrap();
    assert_eq!(
        engine.withdrawal(request.id).unwrap().status,
        WithdrawalStatus::Approved
    );

    engine.complete_withdrawal(request.id).unwrap();
    let balance = engine.balance_of(TUTOR).unwrap();
    assert_eq!(
        engine.withdrawal(request.id).unwrap().status,
        WithdrawalStatus::Completed
    );
    assert_eq!(balance.available, Money(2_000_000));
    assert_eq!(balance.in_transit, Money::ZERO);
    assert_eq!(balance.total, Money(2_000_000));
}

#[test]
fn approval_requires_a_pending_request() {
    let (mut engine, _) = engine();
    funded_tutor(&mut engine, 5_000_000);
    let request = engine.create_withdrawal(TUTOR, Money(1_000_000)).unwrap();

    engine.approve_withdrawal(request.id, ADMIN).unwrap();
    let err = engine.approve_withdrawal(request.id, ADMIN).unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
}

#[test]
fn cancellation_is_owner_only_and_pending_only() {
    let (mut engine, _) = engine();
    funded_tutor(&mut engine, 5_000_000);
    let request = engine.create_withdrawal(TUTOR, Money(1_000_000)).unwrap();

    let err = engine.cancel_withdrawal(request.id, STUDENT).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    engine.cancel_withdrawal(request.id, TUTOR).unwrap();
    assert_eq!(engine.balance_of(TUTOR).unwrap().available, Money(5_000_000));

    let request = engine.create_withdrawal(TUTOR, Money(1_000_000)).unwrap();
    engine.approve_withdrawal(request.id, ADMIN).unwrap();
    let err = engine.cancel_withdrawal(request.id, TUTOR).unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
}

#[test]
fn withdrawal_requires_verified_bank_details() {
    let (mut engine, _) = engine();
    engine.deposit(TUTOR, Money(5_000_000)).unwrap();

    let err = engine.create_withdrawal(TUTOR, Money(1_000_000)).unwrap_err();
    assert!(matches!(err, Error::AccountIneligible(_)));
}

#[test]
fn suspended_tutor_cannot_withdraw() {
    let (mut engine, _) = engine();
    funded_tutor(&mut engine, 5_000_000);
    engine
        .suspend(TUTOR, "Repeated late cancellations", 14, ADMIN)
        .unwrap();

    let err = engine.create_withdrawal(TUTOR, Money(1_000_000)).unwrap_err();
    assert!(matches!(err, Error::AccountIneligible(_)));
}

#[test]
fn one_open_dispute_per_booking() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);
    file(&mut engine);

    let err = engine
        .file_dispute(
            BOOKING,
            TUTOR,
            DisputeKind::Payment,
            DisputePriority::High,
            7,
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
}

#[test]
fn a_booking_is_captured_at_most_once() {
    let (mut engine, _) = engine();
    capture(&mut engine, 1_000_000);

    let err = engine
        .capture_payment(BOOKING, STUDENT, TUTOR, Money(1_000_000))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
}
