use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use lead_relay::app::{DeliveryOrchestrator, LeadCapture, MessageTemplate, SubmissionGate};
use lead_relay::domain::Attachment;
use lead_relay::infra::{InMemoryLedger, ManualClock, RecordingMailer};
use lead_relay::server::{create_server, spawn_sweeper, AppState};

const COOLDOWN: Duration = Duration::from_secs(300);

struct Harness {
    app: Router,
    mailer: Arc<RecordingMailer>,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<ManualClock>,
    gate: Arc<SubmissionGate>,
}

fn harness_with(mailer: RecordingMailer, ledger: InMemoryLedger) -> Harness {
    let mailer = Arc::new(mailer);
    let ledger = Arc::new(ledger);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap(),
    ));
    let gate = Arc::new(SubmissionGate::new(COOLDOWN, clock.clone()));
    let orchestrator = DeliveryOrchestrator::new(
        mailer.clone(),
        ledger.clone(),
        clock.clone(),
        MessageTemplate {
            from: "\"Muy Bien Español\" <guide@example.com>".into(),
            subject: "Your guide".into(),
            attachment: Attachment {
                filename: "spanish-guide.pdf".into(),
                path: PathBuf::from("pdf/spanish-guide.pdf"),
            },
        },
        Duration::from_secs(5),
    );
    let capture = Arc::new(LeadCapture::new(gate.clone(), orchestrator));
    Harness {
        app: create_server(AppState::new(capture)),
        mailer,
        ledger,
        clock,
        gate,
    }
}

fn harness() -> Harness {
    harness_with(RecordingMailer::new(), InMemoryLedger::new())
}

async fn post(app: &Router, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/send-pdf")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn ana_submits_then_is_rate_limited_then_another_email_succeeds() {
    let h = harness();

    let (status, body) = post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert_eq!(h.mailer.sent().len(), 1);
    let rows = h.ledger.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values(), vec!["Ana", "a@x.com", "2024-06-15"]);

    let (status, body) = post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, "Please wait before submitting again.");
    assert_eq!(h.mailer.attempts(), 1);
    assert_eq!(h.ledger.attempts(), 1);

    let (status, _) = post(&h.app, r#"{"name":"Ana","email":"b@x.com"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.mailer.sent().len(), 2);
    assert_eq!(h.ledger.rows().len(), 2);
}

#[tokio::test]
async fn admitted_again_after_cooldown_elapses() {
    let h = harness();

    assert_eq!(post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await.0, StatusCode::OK);
    h.clock.advance(COOLDOWN - Duration::from_secs(1));
    assert_eq!(
        post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
    h.clock.advance(Duration::from_secs(1));
    assert_eq!(post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await.0, StatusCode::OK);
    assert_eq!(h.mailer.sent().len(), 2);
}

#[tokio::test]
async fn email_failure_returns_500_and_skips_ledger() {
    let h = harness_with(RecordingMailer::failing("smtp down"), InMemoryLedger::new());

    let (status, body) = post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Email error");
    assert_eq!(h.mailer.attempts(), 1);
    assert_eq!(h.ledger.attempts(), 0);
}

#[tokio::test]
async fn ledger_failure_returns_500_after_email_was_sent() {
    let h = harness_with(RecordingMailer::new(), InMemoryLedger::failing("403"));

    let (status, body) = post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Sheet error");
    assert_eq!(h.mailer.sent().len(), 1);
    assert_eq!(h.ledger.attempts(), 1);
}

#[tokio::test]
async fn failed_delivery_still_consumes_the_cooldown() {
    let h = harness_with(RecordingMailer::failing("smtp down"), InMemoryLedger::new());

    post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await;
    let (status, _) = post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(h.mailer.attempts(), 1);
}

#[tokio::test]
async fn missing_fields_return_400_without_side_effects() {
    let h = harness();

    for body in [
        r#"{"email":"a@x.com"}"#,
        r#"{"name":"Ana"}"#,
        r#"{"name":"","email":"a@x.com"}"#,
        r#"{}"#,
        "not json",
    ] {
        let (status, text) = post(&h.app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(text, "Missing name or email");
    }
    assert_eq!(h.mailer.attempts(), 0);
    assert_eq!(h.ledger.attempts(), 0);
    assert!(h.gate.is_empty());
}

#[tokio::test]
async fn health_reports_service() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn metrics_route_is_absent_without_recorder() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn background_sweeper_clears_expired_entries() {
    let h = harness();
    post(&h.app, r#"{"name":"Ana","email":"a@x.com"}"#).await;
    assert_eq!(h.gate.len(), 1);

    h.clock.advance(COOLDOWN + Duration::from_secs(1));
    let sweeper = spawn_sweeper(h.gate.clone(), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;
    sweeper.abort();

    assert!(h.gate.is_empty());
}
