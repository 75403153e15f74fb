#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use api_lib::adapters::MemoryAdapter;
use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use veridant_core::domain::{InternshipApplication, NewApplication, NewEmployee, NewMou};
use veridant_core::ports::{
    DatabaseService, DocumentRenderer, EmailKind, EmailService, PortError, PortResult,
    RenderableDocument,
};

pub const BASE_URL: &str = "https://verify.test";

/// Produces a tiny stand-in PDF carrying the reference number and the
/// verification URL, so tests can assert on what would be printed.
/// Flip `failing` to simulate a broken font set or template.
#[derive(Default)]
pub struct FakeRenderer {
    pub failing: AtomicBool,
}

impl FakeRenderer {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DocumentRenderer for FakeRenderer {
    fn render(&self, document: RenderableDocument<'_>, base_url: &str) -> PortResult<Vec<u8>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("font family not loaded".to_string()));
        }
        Ok(format!(
            "%PDF-1.4\n{}\n{}\n",
            document.reference_number(),
            document.verification_url(base_url)
        )
        .into_bytes())
    }
}

/// Records every email instead of sending it. While `undeliverable` is set
/// nothing is recorded and every send reports failure.
#[derive(Default)]
pub struct RecordingEmail {
    pub sent: Mutex<Vec<(EmailKind, String)>>,
    pub undeliverable: AtomicBool,
}

impl RecordingEmail {
    pub fn kinds(&self) -> Vec<EmailKind> {
        self.sent
            .lock()
            .expect("email log lock")
            .iter()
            .map(|(kind, _)| *kind)
            .collect()
    }
}

#[async_trait]
impl EmailService for RecordingEmail {
    async fn send_templated_email(
        &self,
        kind: EmailKind,
        recipient: &str,
        _variables: &[(&str, String)],
    ) -> bool {
        if self.undeliverable.load(Ordering::SeqCst) {
            return false;
        }
        self.sent
            .lock()
            .expect("email log lock")
            .push((kind, recipient.to_string()));
        true
    }
}

pub struct Harness {
    pub db: Arc<MemoryAdapter>,
    pub email: Arc<RecordingEmail>,
    pub renderer: Arc<FakeRenderer>,
    pub state: Arc<AppState>,
}

impl Harness {
    pub async fn db_application(&self, id: uuid::Uuid) -> InternshipApplication {
        self.db
            .get_application(id)
            .await
            .expect("get application")
            .expect("application exists")
    }
}

pub fn harness() -> Harness {
    harness_with(Config {
        public_base_url: BASE_URL.to_string(),
        ..Config::default()
    })
}

pub fn harness_with(config: Config) -> Harness {
    let db = Arc::new(MemoryAdapter::new());
    let email = Arc::new(RecordingEmail::default());
    let renderer = Arc::new(FakeRenderer::default());
    let state = Arc::new(AppState::new(
        db.clone(),
        renderer.clone(),
        email.clone(),
        Arc::new(config),
    ));
    Harness {
        db,
        email,
        renderer,
        state,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn application(name: &str) -> NewApplication {
    NewApplication {
        full_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: "+91 98765 43210".to_string(),
        college_name: "Govt. Engineering College".to_string(),
        degree: "B.Tech".to_string(),
        graduation_year: Some(2026),
        ..Default::default()
    }
}

pub fn employee(name: &str) -> NewEmployee {
    NewEmployee {
        user_id: None,
        full_name: name.to_string(),
        email: format!("{}@veridant.test", name.to_lowercase().replace(' ', ".")),
        designation: "Engineer".to_string(),
        department: "Platform".to_string(),
        joining_date: date(2025, 7, 1),
    }
}

pub fn mou(college: &str) -> NewMou {
    NewMou {
        college_name: college.to_string(),
        college_address: "1 College Road".to_string(),
        college_signatory: "Dr. Principal".to_string(),
        college_email: Some(format!(
            "registrar@{}.test",
            college.to_lowercase().replace(' ', "-")
        )),
        company_signatory: "Director, VeridantAI".to_string(),
        purpose: "Student internships".to_string(),
        start_date: date(2026, 1, 1),
        end_date: date(2027, 1, 1),
        issued_by: None,
    }
}

/// Serves the full router on an ephemeral port.
pub async fn spawn_server(state: Arc<AppState>) -> SocketAddr {
    let app = build_router(state).expect("router");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("server");
    });
    addr
}

pub struct RawResponse {
    pub status: u16,
    pub head: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

pub async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> RawResponse {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(payload) = body {
        req.push_str("Content-Type: application/json\r\n");
        req.push_str(&format!("Content-Length: {}\r\n", payload.len()));
    }
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");
    if let Some(payload) = body {
        req.push_str(payload);
    }
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("read response");
    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("http response must have separator");
    let head = String::from_utf8_lossy(&response[..split]).to_string();
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    RawResponse {
        status,
        head,
        body: response[split + 4..].to_vec(),
    }
}

/// Moves an application along the happy path until it reaches `selected`.
pub async fn select(state: &AppState, application_id: uuid::Uuid) {
    use veridant_core::{ApplicationStatus, TransitionRequest};
    for status in [
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Selected,
    ] {
        state
            .applications
            .transition(application_id, TransitionRequest::to(status))
            .await
            .expect("happy-path transition");
    }
}

pub async fn count_logs(db: &dyn DatabaseService) -> usize {
    db.list_verification_logs(1000).await.expect("logs").len()
}
