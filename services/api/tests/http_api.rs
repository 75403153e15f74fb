//! End-to-end checks over real HTTP against the full router.

mod support;

use std::net::SocketAddr;

use api_lib::web::auth::ensure_admin;
use chrono::{Datelike, Utc};
use serde_json::{json, Value};
use veridant_core::ports::DatabaseService;

use support::{harness, send_raw, spawn_server};

const ADMIN_EMAIL: &str = "admin@veridant.test";
const ADMIN_PASSWORD: &str = "correct horse battery";

async fn login(addr: SocketAddr, email: &str, password: &str) -> String {
    let body = json!({ "email": email, "password": password }).to_string();
    let res = send_raw(addr, "POST", "/api/auth/login", &[], Some(&body)).await;
    assert_eq!(res.status, 200, "login failed: {}", String::from_utf8_lossy(&res.body));
    assert!(res
        .header("set-cookie")
        .is_some_and(|c| c.starts_with("session=") && c.contains("HttpOnly")));
    res.json()["session_token"]
        .as_str()
        .expect("session token")
        .to_string()
}

async fn signup(addr: SocketAddr, email: &str, name: &str) -> String {
    let body = json!({ "email": email, "password": "a-long-password", "full_name": name })
        .to_string();
    let res = send_raw(addr, "POST", "/api/auth/signup", &[], Some(&body)).await;
    assert_eq!(res.status, 201, "signup failed: {}", String::from_utf8_lossy(&res.body));
    res.json()["session_token"]
        .as_str()
        .expect("session token")
        .to_string()
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn application_body(name: &str, email: &str) -> String {
    json!({
        "full_name": name,
        "email": email,
        "phone": "+91 98765 43210",
        "college_name": "Govt. Engineering College",
        "degree": "B.Tech",
        "graduation_year": 2026
    })
    .to_string()
}

async fn move_to(addr: SocketAddr, auth: &str, application_id: &str, statuses: &[&str]) {
    for status in statuses {
        let body = json!({ "status": status, "notes": format!("moved to {status}") }).to_string();
        let res = send_raw(
            addr,
            "PATCH",
            &format!("/api/applications/{application_id}/status"),
            &[("Authorization", auth)],
            Some(&body),
        )
        .await;
        assert_eq!(
            res.status,
            200,
            "transition to {status}: {}",
            String::from_utf8_lossy(&res.body)
        );
    }
}

const TO_SELECTED: [&str; 4] = ["under_review", "shortlisted", "interview_scheduled", "selected"];

#[tokio::test]
async fn application_to_verified_certificate() {
    let h = harness();
    ensure_admin(h.db.as_ref(), ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("bootstrap admin");
    let addr = spawn_server(h.state.clone()).await;

    // Public submission and tracking
    let submitted = send_raw(
        addr,
        "POST",
        "/api/applications",
        &[],
        Some(&application_body("Asha Rao", "asha@example.com")),
    )
    .await;
    assert_eq!(submitted.status, 201);
    let submitted = submitted.json();
    let number = submitted["application_number"].as_str().expect("number");
    assert_eq!(number, format!("VAI-{}-0001", Utc::now().year()));
    let application_id = submitted["id"].as_str().expect("id").to_string();

    let tracked = send_raw(addr, "GET", &format!("/api/track/{number}"), &[], None).await;
    assert_eq!(tracked.status, 200);
    assert_eq!(tracked.json()["status"], "submitted");

    // Admin review
    let admin = bearer(&login(addr, ADMIN_EMAIL, ADMIN_PASSWORD).await);
    move_to(addr, &admin, &application_id, &TO_SELECTED).await;

    let history = send_raw(
        addr,
        "GET",
        &format!("/api/applications/{application_id}/history"),
        &[("Authorization", &admin)],
        None,
    )
    .await;
    assert_eq!(history.json().as_array().map(Vec::len), Some(5));

    // Issue, download, verify
    let body = json!({
        "application_id": application_id,
        "program_title": "Rust Backend Internship"
    })
    .to_string();
    let issued = send_raw(
        addr,
        "POST",
        "/api/certificates",
        &[("Authorization", &admin)],
        Some(&body),
    )
    .await;
    assert_eq!(issued.status, 201, "{}", String::from_utf8_lossy(&issued.body));
    let issued = issued.json();
    assert_eq!(issued["pdf_rendered"], true);
    assert_eq!(
        issued["certificate_number"],
        format!("CERT-{}-00001", Utc::now().year())
    );
    let token = issued["verification_token"].as_str().expect("token").to_string();
    let certificate_id = issued["id"].as_str().expect("id").to_string();
    assert_eq!(
        issued["verification_url"],
        format!("{}/verify/{token}", support::BASE_URL)
    );

    let download = send_raw(
        addr,
        "GET",
        &format!("/api/certificates/{certificate_id}/download"),
        &[("Authorization", &admin)],
        None,
    )
    .await;
    assert_eq!(download.status, 200);
    assert_eq!(download.header("content-type").as_deref(), Some("application/pdf"));
    assert!(download.body.starts_with(b"%PDF"));

    let verified = send_raw(
        addr,
        "GET",
        &format!("/api/verify/certificate/{token}"),
        &[("User-Agent", "qr-scanner")],
        None,
    )
    .await;
    assert_eq!(verified.status, 200);
    let verified = verified.json();
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["status"], "valid");
    assert_eq!(verified["document"]["recipient_name"], "Asha Rao");
    assert_eq!(verified["document"]["program_title"], "Rust Backend Internship");
    assert!(verified["document"].get("recipient_email").is_none());

    // A second certificate for the same application is refused
    let duplicate = send_raw(
        addr,
        "POST",
        "/api/certificates",
        &[("Authorization", &admin)],
        Some(&body),
    )
    .await;
    assert_eq!(duplicate.status, 409);

    // The audit trail saw the scan
    let logs = send_raw(
        addr,
        "GET",
        "/api/verification-logs?limit=10",
        &[("Authorization", &admin)],
        None,
    )
    .await;
    let logs = logs.json();
    let logs = logs.as_array().expect("log array");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["result"], "valid");
    assert_eq!(logs[0]["requester_ip"], "127.0.0.1");
    assert_eq!(logs[0]["user_agent"], "qr-scanner");
}

#[tokio::test]
async fn verification_always_answers_200() {
    let h = harness();
    let addr = spawn_server(h.state.clone()).await;

    for path in [
        "/api/verify/certificate/0123456789ABCDEF",
        "/api/verify/offer/garbage",
        "/api/verify/mou/0123456789ABCDEF",
    ] {
        let forwarded = [("X-Forwarded-For", "198.51.100.4, 10.0.0.1")];
        let res = send_raw(addr, "GET", path, &forwarded, None).await;
        assert_eq!(res.status, 200);
        let body: Value = res.json();
        assert_eq!(body["valid"], false);
        assert_eq!(body["status"], "invalid");
        assert_eq!(body["message"], veridant_core::verification::NOT_FOUND_MESSAGE);
        assert!(body.get("document").is_none());
    }

    let logs = h.db.list_verification_logs(10).await.expect("logs");
    assert_eq!(logs.len(), 3);
    assert!(logs
        .iter()
        .all(|l| l.requester_ip.as_deref() == Some("198.51.100.4")));
}

#[tokio::test]
async fn access_rules_are_enforced() {
    let h = harness();
    ensure_admin(h.db.as_ref(), ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("bootstrap admin");
    let addr = spawn_server(h.state.clone()).await;

    let anonymous = send_raw(addr, "GET", "/api/applications", &[], None).await;
    assert_eq!(anonymous.status, 401);

    let candidate = bearer(&signup(addr, "ravi@example.com", "Ravi Kumar").await);
    let forbidden = send_raw(
        addr,
        "GET",
        "/api/applications",
        &[("Authorization", &candidate)],
        None,
    )
    .await;
    assert_eq!(forbidden.status, 403);

    let as_candidate = [("Authorization", candidate.as_str())];
    let stats = send_raw(addr, "GET", "/api/admin/stats", &as_candidate, None).await;
    assert_eq!(stats.status, 403);

    let me = send_raw(addr, "GET", "/api/auth/me", &as_candidate, None).await;
    assert_eq!(me.status, 200);
    assert_eq!(me.json()["role"], "candidate");

    let logout = send_raw(addr, "POST", "/api/auth/logout", &as_candidate, None).await;
    assert_eq!(logout.status, 200);
    let after = send_raw(addr, "GET", "/api/auth/me", &as_candidate, None).await;
    assert_eq!(after.status, 401);
}

#[tokio::test]
async fn candidates_download_only_their_own_certificates() {
    let h = harness();
    ensure_admin(h.db.as_ref(), ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("bootstrap admin");
    let addr = spawn_server(h.state.clone()).await;
    let admin = bearer(&login(addr, ADMIN_EMAIL, ADMIN_PASSWORD).await);

    let owner = bearer(&signup(addr, "asha@example.com", "Asha Rao").await);
    let stranger = bearer(&signup(addr, "ravi@example.com", "Ravi Kumar").await);

    let submitted = send_raw(
        addr,
        "POST",
        "/api/applications",
        &[("Authorization", &owner)],
        Some(&application_body("Asha Rao", "asha@example.com")),
    )
    .await;
    let application_id = submitted.json()["id"].as_str().expect("id").to_string();

    let as_owner = [("Authorization", owner.as_str())];
    let as_stranger = [("Authorization", stranger.as_str())];
    let as_admin = [("Authorization", admin.as_str())];
    let mine = send_raw(addr, "GET", "/api/applications/mine", &as_owner, None).await;
    assert_eq!(mine.json().as_array().map(Vec::len), Some(1));

    // Not yet eligible
    let body = json!({ "application_id": application_id, "program_title": "Data Internship" })
        .to_string();
    let early = send_raw(addr, "POST", "/api/certificates", &as_admin, Some(&body)).await;
    assert_eq!(early.status, 409);

    move_to(addr, &admin, &application_id, &TO_SELECTED).await;
    let issued = send_raw(addr, "POST", "/api/certificates", &as_admin, Some(&body)).await;
    assert_eq!(issued.status, 201);
    let certificate_id = issued.json()["id"].as_str().expect("id").to_string();
    let path = format!("/api/certificates/{certificate_id}/download");

    let by_owner = send_raw(addr, "GET", &path, &as_owner, None).await;
    assert_eq!(by_owner.status, 200);
    let by_stranger = send_raw(addr, "GET", &path, &as_stranger, None).await;
    assert_eq!(by_stranger.status, 403);

    // Weekly reports belong to the applicant
    let report = json!({
        "application_id": application_id,
        "week_number": 1,
        "summary": "Set up the repo"
    })
    .to_string();
    let by_stranger = send_raw(addr, "POST", "/api/reports", &as_stranger, Some(&report)).await;
    assert_eq!(by_stranger.status, 403);
    let by_owner = send_raw(addr, "POST", "/api/reports", &as_owner, Some(&report)).await;
    assert_eq!(by_owner.status, 201);
}

#[tokio::test]
async fn invalid_input_reports_each_field() {
    let h = harness();
    let addr = spawn_server(h.state.clone()).await;

    let body = json!({
        "full_name": "",
        "email": "not-an-email",
        "phone": "12",
        "college_name": "X",
        "degree": "B.Sc"
    })
    .to_string();
    let res = send_raw(addr, "POST", "/api/applications", &[], Some(&body)).await;
    assert_eq!(res.status, 400);
    let fields: Vec<String> = res.json()["fields"]
        .as_array()
        .expect("field errors")
        .iter()
        .map(|f| f["field"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(fields, vec!["full_name", "email", "phone"]);

    // Nothing was numbered
    let ok = send_raw(
        addr,
        "POST",
        "/api/applications",
        &[],
        Some(&application_body("Asha Rao", "asha@example.com")),
    )
    .await;
    assert!(ok.json()["application_number"]
        .as_str()
        .is_some_and(|n| n.ends_with("-0001")));
}

#[tokio::test]
async fn contact_form_is_acknowledged() {
    let h = harness();
    let addr = spawn_server(h.state.clone()).await;

    let body = json!({
        "name": "Priya",
        "email": "priya@example.com",
        "subject": "Campus drive",
        "message": "Can we schedule a session?"
    })
    .to_string();
    let res = send_raw(addr, "POST", "/api/contacts", &[], Some(&body)).await;
    assert_eq!(res.status, 201);
    assert_eq!(res.json()["status"], "new");
    assert_eq!(
        h.email.kinds(),
        vec![veridant_core::EmailKind::ContactAcknowledgement]
    );

    let health = send_raw(addr, "GET", "/health", &[], None).await;
    assert_eq!(health.status, 200);
}

#[tokio::test]
async fn certificate_issued_while_rendering_fails_downloads_later() {
    let h = harness();
    ensure_admin(h.db.as_ref(), ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("bootstrap admin");
    let addr = spawn_server(h.state.clone()).await;
    let admin = bearer(&login(addr, ADMIN_EMAIL, ADMIN_PASSWORD).await);
    let as_admin = [("Authorization", admin.as_str())];

    let submitted = send_raw(
        addr,
        "POST",
        "/api/applications",
        &[],
        Some(&application_body("Asha Rao", "asha@example.com")),
    )
    .await;
    let application_id = submitted.json()["id"].as_str().expect("id").to_string();
    move_to(addr, &admin, &application_id, &TO_SELECTED).await;

    h.renderer.fail(true);
    let body = json!({ "application_id": application_id, "program_title": "Data Internship" })
        .to_string();
    let issued = send_raw(addr, "POST", "/api/certificates", &as_admin, Some(&body)).await;
    assert_eq!(issued.status, 201);
    let issued = issued.json();
    assert_eq!(issued["pdf_rendered"], false);
    let path = format!(
        "/api/certificates/{}/download",
        issued["id"].as_str().expect("id")
    );

    let broken = send_raw(addr, "GET", &path, &as_admin, None).await;
    assert_eq!(broken.status, 500);

    h.renderer.fail(false);
    let download = send_raw(addr, "GET", &path, &as_admin, None).await;
    assert_eq!(download.status, 200);
    assert!(download.body.starts_with(b"%PDF"));
}
