//! Issuance, verification and the application lifecycle, driven through the
//! core services wired over the in-memory store.

mod support;

use std::collections::HashSet;

use chrono::{Datelike, Utc};
use veridant_core::domain::{DocumentKind, VerificationResult, UNKNOWN_DOCUMENT_ID};
use veridant_core::identifiers::TOKEN_LENGTH;
use veridant_core::issuance::{
    certificate_for_application, offer_for_application, CertificateDetails, OfferDetails,
};
use veridant_core::ports::{DatabaseService, RenderableDocument};
use veridant_core::verification::PublicDocument;
use veridant_core::{
    ApplicationStatus, EmailKind, Requester, ServiceError, TransitionRequest, VerificationOutcome,
};

use support::{application, count_logs, date, harness, mou, select, BASE_URL};

fn titled() -> CertificateDetails {
    CertificateDetails {
        program_title: Some("Rust Backend Internship".to_string()),
        ..Default::default()
    }
}

fn requester() -> Requester {
    Requester {
        ip: Some("203.0.113.7".to_string()),
        user_agent: Some("verifier/1.0".to_string()),
    }
}

#[tokio::test]
async fn issued_certificate_verifies_with_its_public_fields() {
    let h = harness();
    let app = h.state.applications.submit(application("Asha Rao")).await.expect("submit");
    select(&h.state, app.id).await;
    let app = h.db_application(app.id).await;

    let details = CertificateDetails {
        program_title: Some("Rust Backend Internship".to_string()),
        grade: Some("A".to_string()),
        ..Default::default()
    };
    let issued = h
        .state
        .issuance
        .issue_certificate(certificate_for_application(&app, None, details, None))
        .await
        .expect("issue");
    let certificate = issued.record;

    assert_eq!(
        certificate.certificate_number,
        format!("CERT-{}-00001", Utc::now().year())
    );
    let pdf = issued.artifact.expect("rendered at issuance");
    let pdf = String::from_utf8(pdf).expect("fake pdf is text");
    assert!(pdf.contains(&certificate.certificate_number));
    assert!(pdf.contains(&format!("{BASE_URL}/verify/{}", certificate.verification_token)));

    let outcome = h
        .state
        .verification
        .verify(DocumentKind::Certificate, &certificate.verification_token, requester())
        .await
        .expect("verify");
    match outcome {
        VerificationOutcome::Valid(PublicDocument::Certificate(public)) => {
            assert_eq!(public.recipient_name, "Asha Rao");
            assert_eq!(public.program_title, "Rust Backend Internship");
            assert_eq!(public.grade.as_deref(), Some("A"));
        }
        other => panic!("expected a valid certificate, got {other:?}"),
    }

    assert!(h.email.kinds().contains(&EmailKind::CertificateIssued));
}

#[tokio::test]
async fn verifying_twice_answers_the_same_and_logs_twice() {
    let h = harness();
    let issued = h.state.issuance.issue_mou(mou("City College")).await.expect("issue");
    let token = issued.record.verification_token;

    let first = h
        .state
        .verification
        .verify(DocumentKind::Mou, &token, requester())
        .await
        .expect("first");
    let second = h
        .state
        .verification
        .verify(DocumentKind::Mou, &token.to_lowercase(), Requester::default())
        .await
        .expect("second");

    assert_eq!(first, second);
    assert!(first.is_valid());

    let logs = h.db.list_verification_logs(10).await.expect("logs");
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.result == VerificationResult::Valid));
    assert!(logs.iter().all(|l| l.document_id == issued.record.id.to_string()));
    assert_eq!(logs[1].requester_ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(logs[0].requester_ip, None);
}

#[tokio::test]
async fn revoked_documents_expose_only_the_reason() {
    let h = harness();
    let issued = h.state.issuance.issue_mou(mou("City College")).await.expect("issue");

    h.state
        .issuance
        .revoke_mou(issued.record.id, "  Agreement terminated early ")
        .await
        .expect("revoke");
    let again = h.state.issuance.revoke_mou(issued.record.id, "twice").await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));

    let outcome = h
        .state
        .verification
        .verify(DocumentKind::Mou, &issued.record.verification_token, requester())
        .await
        .expect("verify");
    assert_eq!(
        outcome,
        VerificationOutcome::Revoked {
            reason: Some("Agreement terminated early".to_string())
        }
    );
    let logs = h.db.list_verification_logs(1).await.expect("logs");
    assert_eq!(logs[0].result, VerificationResult::Revoked);
}

#[tokio::test]
async fn unknown_and_malformed_tokens_are_logged_as_invalid() {
    let h = harness();

    for token in ["0123456789ABCDEF", "not-a-token", ""] {
        let outcome = h
            .state
            .verification
            .verify(DocumentKind::Certificate, token, requester())
            .await
            .expect("verify never fails on bad input");
        assert_eq!(outcome, VerificationOutcome::Invalid);
    }

    let logs = h.db.list_verification_logs(10).await.expect("logs");
    assert_eq!(logs.len(), 3);
    assert!(logs
        .iter()
        .all(|l| l.result == VerificationResult::Invalid && l.document_id == UNKNOWN_DOCUMENT_ID));
}

#[tokio::test]
async fn a_token_only_verifies_for_its_own_kind() {
    let h = harness();
    let issued = h.state.issuance.issue_mou(mou("City College")).await.expect("issue");

    let outcome = h
        .state
        .verification
        .verify(DocumentKind::Certificate, &issued.record.verification_token, requester())
        .await
        .expect("verify");
    assert_eq!(outcome, VerificationOutcome::Invalid);
}

#[tokio::test]
async fn tokens_are_unique_across_document_kinds() {
    let h = harness();
    let app = h.state.applications.submit(application("Asha Rao")).await.expect("submit");
    select(&h.state, app.id).await;
    let app = h.db_application(app.id).await;

    let mut tokens = HashSet::new();
    for i in 0..10 {
        let agreement = h
            .state
            .issuance
            .issue_mou(mou(&format!("College {i}")))
            .await
            .expect("mou");
        tokens.insert(agreement.record.verification_token);
    }
    let certificate = h
        .state
        .issuance
        .issue_certificate(certificate_for_application(
            &app,
            None,
            titled(),
            None,
        ))
        .await
        .expect("certificate");
    tokens.insert(certificate.record.verification_token);
    let offer = h
        .state
        .issuance
        .issue_offer_letter(offer_for_application(
            &app,
            None,
            OfferDetails {
                position: "Backend Intern".to_string(),
                department: Some("Platform".to_string()),
                stipend: None,
                start_date: date(2026, 6, 1),
                end_date: Some(date(2026, 12, 1)),
            },
            None,
        ))
        .await
        .expect("offer");
    tokens.insert(offer.record.verification_token);

    assert_eq!(tokens.len(), 12);
    assert_eq!(count_logs(h.db.as_ref()).await, 0);
}

#[tokio::test]
async fn each_transition_adds_exactly_one_history_entry() {
    let h = harness();
    let app = h.state.applications.submit(application("Asha Rao")).await.expect("submit");
    select(&h.state, app.id).await;

    let history = h.state.applications.history(app.id).await.expect("history");
    let statuses: Vec<_> = history.iter().map(|e| e.new_status).collect();
    assert_eq!(
        statuses,
        vec![
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ApplicationStatus::Shortlisted,
            ApplicationStatus::InterviewScheduled,
            ApplicationStatus::Selected,
        ]
    );
    for pair in history.windows(2) {
        assert_eq!(pair[1].previous_status, Some(pair[0].new_status));
    }
}

#[tokio::test]
async fn strict_policy_rejects_skips_without_touching_history() {
    let h = harness();
    let app = h.state.applications.submit(application("Asha Rao")).await.expect("submit");

    let skip = h
        .state
        .applications
        .transition(app.id, TransitionRequest::to(ApplicationStatus::Completed))
        .await;
    assert!(matches!(skip, Err(ServiceError::Lifecycle(_))));

    h.state
        .applications
        .transition(app.id, TransitionRequest::to(ApplicationStatus::Withdrawn))
        .await
        .expect("withdraw from anywhere");
    let revive = h
        .state
        .applications
        .transition(app.id, TransitionRequest::to(ApplicationStatus::UnderReview))
        .await;
    assert!(matches!(revive, Err(ServiceError::Lifecycle(_))));

    let history = h.state.applications.history(app.id).await.expect("history");
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn invalid_certificate_input_consumes_no_number() {
    let h = harness();
    let app = h.state.applications.submit(application("Asha Rao")).await.expect("submit");
    select(&h.state, app.id).await;
    let app = h.db_application(app.id).await;

    let bad = CertificateDetails {
        issue_date: Some(date(2026, 5, 1)),
        valid_until: Some(date(2026, 4, 1)),
        ..titled()
    };
    let rejected = h
        .state
        .issuance
        .issue_certificate(certificate_for_application(&app, None, bad, None))
        .await;
    assert!(matches!(rejected, Err(ServiceError::Validation(_))));

    let issued = h
        .state
        .issuance
        .issue_certificate(certificate_for_application(
            &app,
            None,
            titled(),
            None,
        ))
        .await
        .expect("issue");
    assert!(issued.record.certificate_number.ends_with("-00001"));
}

fn backend_offer() -> OfferDetails {
    OfferDetails {
        position: "Backend Intern".to_string(),
        department: Some("Platform".to_string()),
        stipend: Some(15000),
        start_date: date(2026, 6, 1),
        end_date: Some(date(2026, 12, 1)),
    }
}

#[tokio::test]
async fn an_application_is_issued_one_certificate_and_one_offer() {
    let h = harness();
    let app = h.state.applications.submit(application("Asha Rao")).await.expect("submit");
    select(&h.state, app.id).await;
    let app = h.db_application(app.id).await;

    let first = h
        .state
        .issuance
        .issue_certificate(certificate_for_application(&app, None, titled(), None))
        .await
        .expect("first certificate");
    let second = h
        .state
        .issuance
        .issue_certificate(certificate_for_application(&app, None, titled(), None))
        .await;
    assert!(matches!(second, Err(ServiceError::Conflict(_))));

    h.state
        .issuance
        .issue_offer_letter(offer_for_application(&app, None, backend_offer(), None))
        .await
        .expect("first offer");
    let again = h
        .state
        .issuance
        .issue_offer_letter(offer_for_application(&app, None, backend_offer(), None))
        .await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));

    let certificates = h.db.list_certificates().await.expect("certificates");
    assert_eq!(certificates.len(), 1);
    assert_eq!(certificates[0].id, first.record.id);
    assert_eq!(h.db.list_offer_letters().await.expect("offers").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issuance_hands_out_distinct_numbers_and_tokens() {
    let h = harness();
    let mut selected = Vec::new();
    for i in 0..50 {
        let app = h
            .state
            .applications
            .submit(application(&format!("Intern {i}")))
            .await
            .expect("submit");
        select(&h.state, app.id).await;
        selected.push(h.db_application(app.id).await);
    }

    let issues = selected.iter().map(|app| {
        let issuance = h.state.issuance.clone();
        let draft = certificate_for_application(app, None, titled(), None);
        tokio::spawn(async move { issuance.issue_certificate(draft).await })
    });
    let issued: Vec<_> = futures::future::join_all(issues)
        .await
        .into_iter()
        .map(|joined| joined.expect("task").expect("issue").record)
        .collect();

    let numbers: HashSet<_> = issued.iter().map(|c| c.certificate_number.clone()).collect();
    let tokens: HashSet<_> = issued.iter().map(|c| c.verification_token.clone()).collect();
    assert_eq!(numbers.len(), 50);
    assert_eq!(tokens.len(), 50);
    assert!(numbers.contains(&format!("CERT-{}-00050", Utc::now().year())));
}

#[tokio::test]
async fn render_failure_keeps_the_record_and_a_later_render_succeeds() {
    let h = harness();
    let app = h.state.applications.submit(application("Asha Rao")).await.expect("submit");
    select(&h.state, app.id).await;
    let app = h.db_application(app.id).await;

    h.renderer.fail(true);
    let issued = h
        .state
        .issuance
        .issue_certificate(certificate_for_application(&app, None, titled(), None))
        .await
        .expect("issuance survives a broken renderer");
    assert!(issued.artifact.is_none());
    assert!(h.email.kinds().contains(&EmailKind::CertificateIssued));

    let stored = h
        .db
        .get_certificate(issued.record.id)
        .await
        .expect("get")
        .expect("record persisted");
    assert!(h
        .state
        .issuance
        .render(RenderableDocument::Certificate(&stored))
        .is_err());

    h.renderer.fail(false);
    let pdf = h
        .state
        .issuance
        .render(RenderableDocument::Certificate(&stored))
        .expect("render once fixed");
    assert!(pdf.starts_with(b"%PDF"));

    let outcome = h
        .state
        .verification
        .verify(DocumentKind::Certificate, &stored.verification_token, requester())
        .await
        .expect("verify");
    assert!(outcome.is_valid());
}

#[tokio::test]
async fn issuing_a_mou_emails_the_college() {
    let h = harness();
    let issued = h.state.issuance.issue_mou(mou("City College")).await.expect("issue");

    let sent = h.email.sent.lock().expect("email log").clone();
    assert_eq!(
        sent,
        vec![(EmailKind::MouIssued, "registrar@city-college.test".to_string())]
    );

    let mut silent = mou("Hill College");
    silent.college_email = None;
    h.state.issuance.issue_mou(silent).await.expect("issue without email");
    assert_eq!(h.email.kinds().len(), 1);
    assert!(issued.artifact.is_some());
}

#[tokio::test]
async fn undelivered_email_does_not_undo_issuance() {
    let h = harness();
    h.email
        .undeliverable
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let issued = h.state.issuance.issue_mou(mou("City College")).await.expect("issue");
    assert!(h.email.kinds().is_empty());
    assert!(h
        .db
        .get_mou(issued.record.id)
        .await
        .expect("get")
        .is_some());
}

#[tokio::test]
async fn oversized_tokens_are_logged_truncated() {
    let h = harness();
    let huge = "A".repeat(5000);

    let outcome = h
        .state
        .verification
        .verify(DocumentKind::Certificate, &huge, requester())
        .await
        .expect("verify");
    assert!(!outcome.is_valid());

    let logs = h.db.list_verification_logs(10).await.expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].result, VerificationResult::Invalid);
    assert!(logs[0].token.len() <= TOKEN_LENGTH);
}
