//! Behaviour every `DatabaseService` implementation must share, exercised
//! against the in-memory adapter.

mod support;

use std::collections::HashSet;
use std::sync::Arc;

use api_lib::adapters::MemoryAdapter;
use chrono::{Datelike, Duration, Utc};
use veridant_core::domain::{
    ApplicationFilter, InternshipApplication, NewMessage, OfferDecision, OfferStatus, Role,
    StatusChange,
};
use veridant_core::issuance::{
    certificate_for_application, certificate_for_employee, offer_for_application,
    CertificateDetails, OfferDetails,
};
use veridant_core::ports::{DatabaseService, PortError};
use veridant_core::ApplicationStatus;

use support::{application, employee, mou};

#[tokio::test]
async fn application_numbers_follow_the_yearly_sequence() {
    let db = MemoryAdapter::new();
    let year = Utc::now().year();

    let first = db.create_application(application("Asha Rao")).await.expect("first");
    let second = db.create_application(application("Ravi Kumar")).await.expect("second");

    assert_eq!(first.application_number, format!("VAI-{year}-0001"));
    assert_eq!(second.application_number, format!("VAI-{year}-0002"));
    assert_eq!(first.status, ApplicationStatus::Submitted);

    let history = db.list_status_history(first.id).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_status, None);
    assert_eq!(history[0].new_status, ApplicationStatus::Submitted);
}

#[tokio::test]
async fn employee_and_mou_numbers_use_their_own_shapes() {
    let db = MemoryAdapter::new();
    let year = Utc::now().year();

    let emp = db.create_employee(employee("Meera Iyer")).await.expect("employee");
    let agreement = db.create_mou(mou("City College")).await.expect("mou");

    assert_eq!(emp.employee_id, "VAI-EMP-001");
    assert_eq!(agreement.mou_number, format!("MOU-RH-{year}-0001"));
    assert_eq!(agreement.verification_token.len(), 16);
}

#[tokio::test]
async fn concurrent_creates_never_share_a_number() {
    let db = Arc::new(MemoryAdapter::new());
    let emp = db.create_employee(employee("Meera Iyer")).await.expect("employee");

    let creates = (0..50).map(|_| {
        let db = db.clone();
        let draft = certificate_for_employee(&emp, CertificateDetails::default(), None);
        tokio::spawn(async move { db.create_certificate(draft).await })
    });
    let certificates: Vec<_> = futures::future::join_all(creates)
        .await
        .into_iter()
        .map(|joined| joined.expect("task").expect("create"))
        .collect();

    let numbers: HashSet<_> = certificates.iter().map(|c| c.certificate_number.clone()).collect();
    let tokens: HashSet<_> = certificates.iter().map(|c| c.verification_token.clone()).collect();
    assert_eq!(numbers.len(), 50);
    assert_eq!(tokens.len(), 50);
}

#[tokio::test]
async fn an_application_holds_one_certificate_and_one_offer() {
    let db = MemoryAdapter::new();
    let app = db.create_application(application("Asha Rao")).await.expect("application");
    let offer = || OfferDetails {
        position: "Backend Intern".to_string(),
        department: None,
        stipend: None,
        start_date: support::date(2026, 6, 1),
        end_date: None,
    };

    let certificate = |app: &InternshipApplication| {
        certificate_for_application(app, None, CertificateDetails::default(), None)
    };

    db.create_certificate(certificate(&app)).await.expect("first certificate");
    let second = db.create_certificate(certificate(&app)).await;
    assert!(matches!(second, Err(PortError::Conflict(_))));

    db.create_offer_letter(offer_for_application(&app, None, offer(), None))
        .await
        .expect("first offer");
    let again = db
        .create_offer_letter(offer_for_application(&app, None, offer(), None))
        .await;
    assert!(matches!(again, Err(PortError::Conflict(_))));

    assert_eq!(db.list_certificates().await.expect("certificates").len(), 1);
    assert_eq!(db.list_offer_letters().await.expect("offers").len(), 1);

    // The refused attempt consumed no number
    let other = db.create_application(application("Ravi Kumar")).await.expect("application");
    let next = db.create_certificate(certificate(&other)).await.expect("other certificate");
    assert!(next.certificate_number.ends_with("-00002"));
}

#[tokio::test]
async fn stale_status_change_is_a_conflict_and_writes_no_history() {
    let db = MemoryAdapter::new();
    let app = db.create_application(application("Asha Rao")).await.expect("create");

    let change = |expected, status| StatusChange {
        expected,
        status,
        changed_by: None,
        notes: None,
        interview_at: None,
        interview_mode: None,
        interview_link: None,
    };

    db.update_application_status(
        app.id,
        change(ApplicationStatus::Submitted, ApplicationStatus::UnderReview),
    )
    .await
    .expect("first change")
    .expect("application exists");

    let stale = db
        .update_application_status(
            app.id,
            change(ApplicationStatus::Submitted, ApplicationStatus::Rejected),
        )
        .await;
    assert!(matches!(stale, Err(PortError::Conflict(_))));

    let history = db.list_status_history(app.id).await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].previous_status, Some(ApplicationStatus::Submitted));
    assert_eq!(history[1].new_status, ApplicationStatus::UnderReview);
}

#[tokio::test]
async fn revocation_and_offer_responses_are_one_way() {
    let db = MemoryAdapter::new();
    let agreement = db.create_mou(mou("City College")).await.expect("mou");

    let revoked = db
        .revoke_mou(agreement.id, "Agreement terminated")
        .await
        .expect("revoke")
        .expect("exists");
    assert_eq!(revoked.revoked_reason.as_deref(), Some("Agreement terminated"));
    assert!(matches!(
        db.revoke_mou(agreement.id, "again").await,
        Err(PortError::Conflict(_))
    ));

    let app = db.create_application(application("Asha Rao")).await.expect("application");
    let offer = db
        .create_offer_letter(veridant_core::issuance::offer_for_application(
            &app,
            None,
            veridant_core::issuance::OfferDetails {
                position: "Backend Intern".to_string(),
                department: Some("Platform".to_string()),
                stipend: Some(15000),
                start_date: support::date(2026, 6, 1),
                end_date: None,
            },
            None,
        ))
        .await
        .expect("offer");
    assert_eq!(offer.status, OfferStatus::Pending);

    let accepted = db
        .respond_to_offer_letter(offer.id, OfferDecision::Accept)
        .await
        .expect("respond")
        .expect("exists");
    assert_eq!(accepted.status, OfferStatus::Accepted);
    assert!(accepted.accepted_at.is_some());
    assert!(matches!(
        db.respond_to_offer_letter(offer.id, OfferDecision::Reject).await,
        Err(PortError::Conflict(_))
    ));
}

#[tokio::test]
async fn unknown_ids_are_none_not_errors() {
    let db = MemoryAdapter::new();
    let missing = uuid::Uuid::new_v4();

    assert!(db.get_application(missing).await.expect("get").is_none());
    assert!(db.revoke_certificate(missing, "x").await.expect("revoke").is_none());
    assert!(db
        .respond_to_offer_letter(missing, OfferDecision::Accept)
        .await
        .expect("respond")
        .is_none());
    assert!(db.get_certificate_by_token("0000000000000000").await.expect("token").is_none());
}

#[tokio::test]
async fn duplicate_emails_are_rejected_case_insensitively() {
    let db = MemoryAdapter::new();
    db.create_user("asha@example.com", "Asha", "hash", Role::Candidate)
        .await
        .expect("first user");

    let again = db
        .create_user("ASHA@example.com", "Asha again", "hash", Role::Candidate)
        .await;
    assert!(matches!(again, Err(PortError::Conflict(_))));
}

#[tokio::test]
async fn expired_sessions_do_not_authenticate() {
    let db = MemoryAdapter::new();
    let user = db
        .create_user("asha@example.com", "Asha", "hash", Role::Candidate)
        .await
        .expect("user");

    db.create_auth_session("live", user.id, Utc::now() + Duration::days(1))
        .await
        .expect("live session");
    db.create_auth_session("stale", user.id, Utc::now() - Duration::minutes(1))
        .await
        .expect("stale session");

    assert_eq!(db.validate_auth_session("live").await.expect("live"), Some(user.id));
    assert_eq!(db.validate_auth_session("stale").await.expect("stale"), None);

    db.delete_auth_session("live").await.expect("logout");
    assert_eq!(db.validate_auth_session("live").await.expect("gone"), None);
}

#[tokio::test]
async fn only_the_recipient_can_mark_a_message_read() {
    let db = MemoryAdapter::new();
    let alice = uuid::Uuid::new_v4();
    let bob = uuid::Uuid::new_v4();
    let message = db
        .create_message(NewMessage {
            sender_id: alice,
            recipient_id: bob,
            subject: "Interview".to_string(),
            body: "Tomorrow at 10".to_string(),
        })
        .await
        .expect("message");

    assert!(db.mark_message_read(message.id, alice).await.expect("sender").is_none());
    let read = db
        .mark_message_read(message.id, bob)
        .await
        .expect("recipient")
        .expect("exists");
    assert!(read.is_read);

    assert_eq!(db.list_messages_for_user(alice).await.expect("alice").len(), 1);
    assert_eq!(db.list_messages_for_user(bob).await.expect("bob").len(), 1);
}

#[tokio::test]
async fn application_filters_combine() {
    let db = MemoryAdapter::new();
    let owner = uuid::Uuid::new_v4();
    let mut mine = application("Asha Rao");
    mine.user_id = Some(owner);
    db.create_application(mine).await.expect("mine");
    db.create_application(application("Ravi Kumar")).await.expect("other");

    let by_user = db
        .list_applications(ApplicationFilter {
            user_id: Some(owner),
            ..Default::default()
        })
        .await
        .expect("by user");
    assert_eq!(by_user.len(), 1);

    let by_status = db
        .list_applications(ApplicationFilter {
            status: Some(ApplicationStatus::Submitted),
            ..Default::default()
        })
        .await
        .expect("by status");
    assert_eq!(by_status.len(), 2);

    let counts = db.count_applications_by_status().await.expect("counts");
    assert_eq!(counts, vec![(ApplicationStatus::Submitted, 2)]);
}
