use std::sync::Arc;

use super::common::*;
use crate::categories::CategoryId;
use crate::ledger::{HistoryFilter, TransactionKind};
use crate::money::Amount;
use crate::repository::FundRepository;
use crate::review::domain::ApplicationStatus::*;
use crate::review::{Actor, ActorRole, Decision, ReviewError, ReviewService};

#[test]
fn outpatient_claim_goes_straight_to_the_admin() {
    let h = harness();
    h.fund("500.00");

    let application = h.service.submit(outpatient("30.00")).expect("submit");
    assert_eq!(application.status, AdminPending);
    assert_eq!(application.id.as_str(), "app-000001");
    assert_eq!(
        h.trail(&application.id),
        vec![
            (None, Submitted),
            (Some(Submitted), UnderReview),
            (Some(UnderReview), AdminPending),
        ]
    );

    let approved = h
        .service
        .decide(
            &application.id,
            &Actor::admin("bendahari"),
            Decision::Approve,
            Some(ringgit("30.00")),
            None,
        )
        .expect("approve");
    assert_eq!(approved.status, Approved);
    assert_eq!(approved.approved_amount, Some(ringgit("30.00")));

    let outflows: Vec<_> = h
        .ledger()
        .history(HistoryFilter {
            kind: Some(TransactionKind::Outflow),
            ..HistoryFilter::default()
        })
        .iter()
        .collect::<Result<_, _>>()
        .expect("history");
    assert_eq!(outflows.len(), 1);
    assert_eq!(outflows[0].amount, ringgit("30.00"));
    assert_eq!(outflows[0].balance_after, ringgit("470.00"));
    assert_eq!(
        outflows[0].linked_application_id.as_ref(),
        Some(&application.id)
    );
    assert_eq!(h.ledger().current_balance().expect("balance"), ringgit("470.00"));
    assert_eq!(h.trail(&application.id).last(), Some(&(Some(AdminPending), Approved)));
}

#[test]
fn ceiling_boundary_is_inclusive() {
    let h = harness();

    let accepted = h.service.submit(outpatient("30.00")).expect("exact cap accepted");
    assert_eq!(accepted.ceiling.max_amount, ringgit("30.00"));

    match h.service.submit(outpatient("30.01")) {
        Err(ReviewError::AmountExceedsLimit { amount, limit }) => {
            assert_eq!(amount, ringgit("30.01"));
            assert_eq!(limit, ringgit("30.00"));
        }
        other => panic!("expected amount exceeds limit, got {other:?}"),
    }
    assert_eq!(h.service.applications(None).expect("list").len(), 1);
}

#[test]
fn submit_validates_category_and_payload() {
    let h = harness();

    match h.service.submit(outpatient("0.00")) {
        Err(ReviewError::InvalidAmount(_)) => {}
        other => panic!("expected invalid amount, got {other:?}"),
    }

    let mut unknown = outpatient("10.00");
    unknown.category_id = CategoryId::new("CAT-TUITION");
    match h.service.submit(unknown) {
        Err(ReviewError::UnknownCategory(id)) => assert_eq!(id.as_str(), "CAT-TUITION"),
        other => panic!("expected unknown category, got {other:?}"),
    }

    let mut mismatched = disaster("100.00");
    mismatched.category_id = CategoryId::new("CAT-ILLNESS-OUTPATIENT");
    match h.service.submit(mismatched) {
        Err(err @ ReviewError::PayloadMismatch { .. }) => {
            assert_eq!(err.kind(), "payload_mismatch");
        }
        other => panic!("expected payload mismatch, got {other:?}"),
    }

    let id = CategoryId::new("CAT-DISASTER");
    let mut category = h
        .catalog
        .list()
        .expect("list")
        .into_iter()
        .find(|category| category.id == id)
        .expect("disaster category");
    category.active = false;
    h.catalog.upsert(category).expect("upsert");
    match h.service.submit(disaster("100.00")) {
        Err(ReviewError::CategoryInactive(rejected)) => assert_eq!(rejected, id),
        other => panic!("expected inactive category, got {other:?}"),
    }

    assert!(h.service.applications(None).expect("list").is_empty());
    assert!(h.notifier.events().is_empty());
}

#[test]
fn committee_suggestion_caps_the_admin() {
    let h = harness();
    h.fund("1000.00");

    let application = h.service.submit(emergency("150.00")).expect("submit");
    assert_eq!(application.status, CommitteePending);

    let after_committee = h
        .service
        .decide(
            &application.id,
            &Actor::committee("jkk-01"),
            Decision::Approve,
            Some(ringgit("100.00")),
            Some("supported up to RM100".to_string()),
        )
        .expect("committee approval");
    assert_eq!(after_committee.status, AdminPending);
    assert_eq!(after_committee.admin_cap(), ringgit("100.00"));

    let trail = h.service.audit_trail(&application.id).expect("trail");
    let tail: Vec<_> = trail
        .iter()
        .rev()
        .take(2)
        .map(|entry| (entry.from_status, entry.to_status, entry.actor_role))
        .collect();
    assert_eq!(
        tail,
        vec![
            (Some(CommitteeApproved), AdminPending, ActorRole::System),
            (Some(CommitteePending), CommitteeApproved, ActorRole::Committee),
        ]
    );

    match h.service.decide(
        &application.id,
        &Actor::admin("bendahari"),
        Decision::Approve,
        Some(ringgit("150.00")),
        None,
    ) {
        Err(ReviewError::AmountExceedsLimit { amount, limit }) => {
            assert_eq!(amount, ringgit("150.00"));
            assert_eq!(limit, ringgit("100.00"));
        }
        other => panic!("expected amount exceeds limit, got {other:?}"),
    }
    assert_eq!(h.status(&application.id), AdminPending);
    assert_eq!(h.transaction_count(), 1);

    let approved = h
        .service
        .decide(
            &application.id,
            &Actor::admin("bendahari"),
            Decision::Approve,
            None,
            None,
        )
        .expect_err("defaulting to the requested amount still exceeds the committee cap");
    assert!(matches!(approved, ReviewError::AmountExceedsLimit { .. }));

    let approved = h
        .service
        .decide(
            &application.id,
            &Actor::admin("bendahari"),
            Decision::Approve,
            Some(ringgit("100.00")),
            None,
        )
        .expect("approve within the committee cap");
    assert_eq!(approved.status, Approved);
    assert_eq!(h.ledger().current_balance().expect("balance"), ringgit("900.00"));
}

#[test]
fn insufficient_funds_rolls_the_approval_back() {
    let h = harness();
    h.fund("50.00");

    let application = h.service.submit(disaster("80.00")).expect("submit");
    h.service
        .decide(
            &application.id,
            &Actor::committee("jkk-01"),
            Decision::Approve,
            None,
            None,
        )
        .expect("committee approval");
    let audit_before = h.service.audit_trail(&application.id).expect("trail").len();
    let events_before = h.notifier.events().len();

    match h.service.decide(
        &application.id,
        &Actor::admin("bendahari"),
        Decision::Approve,
        Some(ringgit("80.00")),
        None,
    ) {
        Err(err @ ReviewError::InsufficientFunds { .. }) => {
            assert_eq!(err.kind(), "insufficient_funds");
        }
        other => panic!("expected insufficient funds, got {other:?}"),
    }

    let stored = h.service.application(&application.id).expect("stored");
    assert_eq!(stored.status, AdminPending);
    assert_eq!(stored.approved_amount, None);
    assert!(stored.admin.is_none());
    assert_eq!(
        h.service.audit_trail(&application.id).expect("trail").len(),
        audit_before
    );
    assert_eq!(h.notifier.events().len(), events_before);
    assert_eq!(h.transaction_count(), 1);
    assert_eq!(h.ledger().current_balance().expect("balance"), ringgit("50.00"));
}

#[test]
fn rejections_are_terminal_and_do_not_touch_the_ledger() {
    let h = harness();
    h.fund("500.00");

    let by_committee = h.service.submit(disaster("120.00")).expect("submit");
    let rejected = h
        .service
        .decide(
            &by_committee.id,
            &Actor::committee("jkk-01"),
            Decision::Reject,
            None,
            Some("insufficient evidence of loss".to_string()),
        )
        .expect("committee rejection");
    assert_eq!(rejected.status, CommitteeRejected);
    assert!(rejected.status.is_terminal());

    let by_admin = h.service.submit(outpatient("25.00")).expect("submit");
    let rejected = h
        .service
        .decide(
            &by_admin.id,
            &Actor::admin("bendahari"),
            Decision::Reject,
            None,
            None,
        )
        .expect("admin rejection");
    assert_eq!(rejected.status, AdminRejected);

    assert_eq!(h.transaction_count(), 1);
    match h.service.decide(
        &by_admin.id,
        &Actor::admin("bendahari"),
        Decision::Approve,
        None,
        None,
    ) {
        Err(ReviewError::InvalidTransition { status, .. }) => assert_eq!(status, AdminRejected),
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn only_the_current_stage_owner_may_decide() {
    let h = harness();
    h.fund("500.00");
    let application = h.service.submit(emergency("200.00")).expect("submit");

    for actor in [
        Actor::admin("bendahari"),
        Actor::student(STUDENT),
        Actor {
            role: ActorRole::System,
            id: "cron".to_string(),
        },
    ] {
        match h.service.decide(&application.id, &actor, Decision::Approve, None, None) {
            Err(ReviewError::InvalidTransition { role, status, .. }) => {
                assert_eq!(role, actor.role);
                assert_eq!(status, CommitteePending);
            }
            other => panic!("expected invalid transition for {actor:?}, got {other:?}"),
        }
    }

    assert_eq!(h.service.audit_trail(&application.id).expect("trail").len(), 3);
}

#[test]
fn approved_amount_must_be_positive_and_within_the_request() {
    let h = harness();
    h.fund("500.00");
    let application = h.service.submit(outpatient("20.00")).expect("submit");
    let admin = Actor::admin("bendahari");

    match h
        .service
        .decide(&application.id, &admin, Decision::Approve, Some(Amount::ZERO), None)
    {
        Err(ReviewError::InvalidAmount(_)) => {}
        other => panic!("expected invalid amount, got {other:?}"),
    }
    match h.service.decide(
        &application.id,
        &admin,
        Decision::Approve,
        Some(ringgit("25.00")),
        None,
    ) {
        Err(ReviewError::AmountExceedsLimit { limit, .. }) => {
            assert_eq!(limit, ringgit("20.00"))
        }
        other => panic!("expected amount exceeds limit, got {other:?}"),
    }

    let partial = h
        .service
        .decide(
            &application.id,
            &admin,
            Decision::Approve,
            Some(ringgit("12.50")),
            None,
        )
        .expect("partial approval");
    assert_eq!(partial.approved_amount, Some(ringgit("12.50")));
    assert_eq!(h.ledger().current_balance().expect("balance"), ringgit("487.50"));
}

#[test]
fn second_cancel_is_rejected_without_a_new_entry() {
    let h = harness();
    let application = h.service.submit(outpatient("15.00")).expect("submit");
    let student = Actor::student(STUDENT);

    let cancelled = h.service.cancel(&application.id, &student).expect("cancel");
    assert_eq!(cancelled.status, Cancelled);
    let entries = h.service.audit_trail(&application.id).expect("trail").len();
    assert_eq!(entries, 4);

    match h.service.cancel(&application.id, &student) {
        Err(ReviewError::InvalidTransition { status, action, .. }) => {
            assert_eq!(status, Cancelled);
            assert_eq!(action, "cancel");
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    assert_eq!(
        h.service.audit_trail(&application.id).expect("trail").len(),
        entries
    );
}

#[test]
fn cancel_requires_the_owner_and_no_reviewer_decision() {
    let h = harness();
    let application = h.service.submit(emergency("300.00")).expect("submit");

    match h.service.cancel(&application.id, &Actor::student("A21EC9999")) {
        Err(ReviewError::InvalidTransition { .. }) => {}
        other => panic!("expected invalid transition for another student, got {other:?}"),
    }
    match h.service.cancel(&application.id, &Actor::admin("bendahari")) {
        Err(ReviewError::InvalidTransition { .. }) => {}
        other => panic!("expected invalid transition for admin, got {other:?}"),
    }

    h.service
        .decide(
            &application.id,
            &Actor::committee("jkk-01"),
            Decision::Approve,
            None,
            None,
        )
        .expect("committee approval");
    assert_eq!(h.status(&application.id), AdminPending);
    match h.service.cancel(&application.id, &Actor::student(STUDENT)) {
        Err(ReviewError::InvalidTransition { status, .. }) => assert_eq!(status, AdminPending),
        other => panic!("expected invalid transition after committee decision, got {other:?}"),
    }
}

#[test]
fn in_flight_applications_keep_their_ceiling_snapshot() {
    let h = harness();
    h.fund("500.00");
    let application = h.service.submit(outpatient("30.00")).expect("submit");

    let id = CategoryId::new("CAT-ILLNESS-OUTPATIENT");
    let mut category = h
        .catalog
        .list()
        .expect("list")
        .into_iter()
        .find(|category| category.id == id)
        .expect("outpatient category");
    category.max_amount = ringgit("20.00");
    h.catalog.upsert(category).expect("upsert");

    match h.service.submit(outpatient("30.00")) {
        Err(ReviewError::AmountExceedsLimit { limit, .. }) => {
            assert_eq!(limit, ringgit("20.00"))
        }
        other => panic!("expected new cap to apply to new submissions, got {other:?}"),
    }

    let approved = h
        .service
        .decide(
            &application.id,
            &Actor::admin("bendahari"),
            Decision::Approve,
            None,
            None,
        )
        .expect("snapshot ceiling still applies");
    assert_eq!(approved.approved_amount, Some(ringgit("30.00")));
    assert_eq!(approved.ceiling.max_amount, ringgit("30.00"));
}

#[test]
fn chronic_claims_sum_inpatient_charges_and_need_the_committee() {
    let h = harness();
    let application = h.service.submit(chronic("320.00", "79.90")).expect("submit");
    assert_eq!(application.requested_amount, ringgit("399.90"));
    assert_eq!(application.status, CommitteePending);
}

#[test]
fn every_transition_is_announced_in_order() {
    let h = harness();
    h.fund("500.00");
    let application = h.service.submit(outpatient("10.00")).expect("submit");
    h.service
        .decide(
            &application.id,
            &Actor::admin("bendahari"),
            Decision::Approve,
            None,
            None,
        )
        .expect("approve");

    let events = h.notifier.events();
    let trail = h.service.audit_trail(&application.id).expect("trail");
    assert_eq!(events.len(), trail.len());
    for (event, entry) in events.iter().zip(&trail) {
        assert_eq!(event.application_id, entry.application_id);
        assert_eq!(event.from_status, entry.from_status);
        assert_eq!(event.to_status, entry.to_status);
        assert_eq!(event.actor_role, entry.actor_role);
    }
}

#[test]
fn notifier_failure_does_not_undo_the_transition() {
    let h = harness();
    let service = ReviewService::new(
        Arc::new(crate::ledger::Ledger::new(
            h.repository.clone(),
            Arc::new(crate::clock::SystemClock::default()),
        )),
        h.catalog.clone(),
        Arc::new(FailingNotifier),
        h.receipts.clone(),
    );

    let application = service.submit(outpatient("10.00")).expect("submit despite notifier");
    let stored = h
        .repository
        .fetch_application(&application.id)
        .expect("fetch")
        .expect("stored");
    assert_eq!(stored.status, AdminPending);
}

#[test]
fn queries_report_missing_applications() {
    let h = harness();
    let missing = crate::review::ApplicationId::new("app-999999");

    match h.service.application(&missing) {
        Err(err @ ReviewError::NotFound(_)) => assert_eq!(err.kind(), "not_found"),
        other => panic!("expected not found, got {other:?}"),
    }
    match h.service.audit_trail(&missing) {
        Err(ReviewError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    match h
        .service
        .decide(&missing, &Actor::admin("bendahari"), Decision::Reject, None, None)
    {
        Err(ReviewError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn applications_can_be_listed_by_status() {
    let h = harness();
    let first = h.service.submit(outpatient("10.00")).expect("submit");
    let second = h.service.submit(emergency("90.00")).expect("submit");
    h.service
        .cancel(&first.id, &Actor::student(STUDENT))
        .expect("cancel");

    let all = h.service.applications(None).expect("list");
    assert_eq!(
        all.iter().map(|app| app.id.clone()).collect::<Vec<_>>(),
        vec![first.id.clone(), second.id.clone()]
    );

    let pending = h.service.applications(Some(CommitteePending)).expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);
}
