//! End-to-end submission workflow tests against a mock webhook.
//!
//! These use wiremock for deterministic HTTP behavior: request counting backs
//! the at-most-one-in-flight guarantee, body matchers pin the wire format.

use chasse_tresor_cli::gate;
use chasse_tresor_cli::model::{
    Field, InfoEvent, Variant, WorkflowConfig, WorkflowEvent, WorkflowStatus,
};
use chasse_tresor_cli::orchestrator::{run_controller, UiCommand};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(variant: Variant, endpoint: String, token: &str) -> WorkflowConfig {
    WorkflowConfig {
        variant,
        endpoint,
        source: variant.source().to_string(),
        reveal_delay: Duration::ZERO,
        token: token.to_string(),
        user_agent: "chasse-tresor-cli/test".to_string(),
        device_info: "chasse-tresor-cli/test (linux x86_64)".to_string(),
    }
}

struct Harness {
    cmd_tx: mpsc::UnboundedSender<UiCommand>,
    event_rx: mpsc::UnboundedReceiver<WorkflowEvent>,
    controller: tokio::task::JoinHandle<anyhow::Result<WorkflowStatus>>,
}

impl Harness {
    fn spawn(cfg: WorkflowConfig, fields: &[(Field, &str)]) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let controller = tokio::spawn(run_controller(cfg, event_tx, cmd_rx));
        for (field, value) in fields {
            cmd_tx
                .send(UiCommand::SetField {
                    field: *field,
                    value: (*value).to_string(),
                })
                .unwrap();
        }
        Self {
            cmd_tx,
            event_rx,
            controller,
        }
    }

    async fn final_status(self) -> WorkflowStatus {
        drop(self.cmd_tx);
        let mut event_rx = self.event_rx;
        while event_rx.recv().await.is_some() {}
        self.controller.await.unwrap().unwrap()
    }
}

/// Submit once as soon as the form reveals, then quit on the first terminal
/// outcome. Returns the observed status sequence.
async fn drive_single_submission(harness: &mut Harness) -> Vec<WorkflowStatus> {
    let mut statuses = Vec::new();
    while let Some(ev) = harness.event_rx.recv().await {
        match ev {
            WorkflowEvent::StatusChanged { status } => {
                statuses.push(status);
                match status {
                    WorkflowStatus::Idle => {
                        harness.cmd_tx.send(UiCommand::Submit).unwrap();
                    }
                    WorkflowStatus::Success | WorkflowStatus::Error => {
                        harness.cmd_tx.send(UiCommand::Quit).unwrap();
                    }
                    _ => {}
                }
            }
            WorkflowEvent::Info(InfoEvent::GateDenied) => {
                harness.cmd_tx.send(UiCommand::Quit).unwrap();
            }
            _ => {}
        }
    }
    statuses
}

#[tokio::test]
async fn signup_submission_reaches_success_with_expected_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/chasse-tresor-inscription"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "email": "agent@example.com",
            "source": "Landing Page Chasse 2026",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(
        Variant::Signup,
        format!("{}/webhook/chasse-tresor-inscription", server.uri()),
        "",
    );
    let mut harness = Harness::spawn(cfg, &[(Field::Email, "agent@example.com")]);
    let statuses = drive_single_submission(&mut harness).await;

    assert_eq!(
        statuses,
        vec![
            WorkflowStatus::Validating,
            WorkflowStatus::Idle,
            WorkflowStatus::Sending,
            WorkflowStatus::Success,
        ]
    );
    assert_eq!(harness.final_status().await, WorkflowStatus::Success);

    // The timestamp must be well-formed RFC 3339.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let ts = body["timestamp"].as_str().unwrap();
    assert!(time::OffsetDateTime::parse(
        ts,
        &time::format_description::well_known::Rfc3339
    )
    .is_ok());
    // The signup body carries no identity or device fields.
    assert!(body.get("nom").is_none());
    assert!(body.get("deviceInfo").is_none());
}

#[tokio::test]
async fn server_rejection_is_recoverable_by_resubmitting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let cfg = config(Variant::Claim, server.uri(), "");
    let mut harness = Harness::spawn(cfg, &[(Field::Prenom, "Jean"), (Field::Nom, "Dupont")]);

    let mut statuses = Vec::new();
    let mut attempts = 0;
    while let Some(ev) = harness.event_rx.recv().await {
        if let WorkflowEvent::StatusChanged { status } = ev {
            statuses.push(status);
            match status {
                WorkflowStatus::Idle => {
                    attempts += 1;
                    harness.cmd_tx.send(UiCommand::Submit).unwrap();
                }
                // Retry once from the error state, fields untouched.
                WorkflowStatus::Error => {
                    attempts += 1;
                    harness.cmd_tx.send(UiCommand::Submit).unwrap();
                }
                WorkflowStatus::Success => {
                    harness.cmd_tx.send(UiCommand::Quit).unwrap();
                }
                _ => {}
            }
        }
    }
    assert_eq!(attempts, 2);
    assert_eq!(
        statuses,
        vec![
            WorkflowStatus::Validating,
            WorkflowStatus::Idle,
            WorkflowStatus::Sending,
            WorkflowStatus::Error,
            WorkflowStatus::Sending,
            WorkflowStatus::Success,
        ]
    );
    assert_eq!(harness.final_status().await, WorkflowStatus::Success);
}

#[tokio::test]
async fn transport_failure_lands_in_error_status() {
    // Grab a port with no listener behind it so the connection is refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let cfg = config(
        Variant::Claim,
        format!("http://127.0.0.1:{port}/webhook"),
        "",
    );
    let mut harness = Harness::spawn(cfg, &[(Field::Prenom, "Jean"), (Field::Nom, "Dupont")]);
    let statuses = drive_single_submission(&mut harness).await;

    assert_eq!(*statuses.last().unwrap(), WorkflowStatus::Error);
    assert_eq!(harness.final_status().await, WorkflowStatus::Error);
}

#[tokio::test]
async fn second_submit_while_sending_issues_no_second_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(250)))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(Variant::Signup, server.uri(), "");
    let mut harness = Harness::spawn(cfg, &[(Field::Email, "agent@example.com")]);

    let mut saw_in_flight_rejection = false;
    while let Some(ev) = harness.event_rx.recv().await {
        match ev {
            WorkflowEvent::StatusChanged { status } => match status {
                WorkflowStatus::Idle => {
                    harness.cmd_tx.send(UiCommand::Submit).unwrap();
                }
                // Fire a duplicate as soon as the first one is in flight.
                WorkflowStatus::Sending => {
                    harness.cmd_tx.send(UiCommand::Submit).unwrap();
                }
                WorkflowStatus::Success | WorkflowStatus::Error => {
                    harness.cmd_tx.send(UiCommand::Quit).unwrap();
                }
                _ => {}
            },
            WorkflowEvent::Info(InfoEvent::AlreadySending) => {
                saw_in_flight_rejection = true;
            }
            _ => {}
        }
    }

    assert!(saw_in_flight_rejection);
    assert_eq!(harness.final_status().await, WorkflowStatus::Success);
    // MockServer verifies expect(1) on drop.
}

#[tokio::test]
async fn gated_claim_with_wrong_token_never_calls_the_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cfg = config(Variant::GatedClaim, server.uri(), "WRONG");
    let mut harness = Harness::spawn(
        cfg,
        &[
            (Field::Prenom, "Jean"),
            (Field::Nom, "Dupont"),
            (Field::Email, "agent@example.com"),
        ],
    );
    let statuses = drive_single_submission(&mut harness).await;

    // Status is unchanged from its pre-submit value; never Sending.
    assert_eq!(*statuses.last().unwrap(), WorkflowStatus::Idle);
    assert!(!statuses.contains(&WorkflowStatus::Sending));
    assert_eq!(harness.final_status().await, WorkflowStatus::Idle);
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn gated_claim_with_correct_token_sends_it_and_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "nom": "Kaeser",
            "prenom": "Michaël",
            "email": "agent@neocard.ch",
            "token": gate::EXPECTED_TOKEN,
            "source": "QR CODE TICKET OR",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(Variant::GatedClaim, server.uri(), gate::EXPECTED_TOKEN);
    let mut harness = Harness::spawn(
        cfg,
        &[
            (Field::Prenom, "Michaël"),
            (Field::Nom, "Kaeser"),
            (Field::Email, "agent@neocard.ch"),
        ],
    );
    let statuses = drive_single_submission(&mut harness).await;

    assert_eq!(*statuses.last().unwrap(), WorkflowStatus::Success);
    assert_eq!(harness.final_status().await, WorkflowStatus::Success);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("deviceInfo").is_some());
}

#[tokio::test]
async fn gated_startup_reports_advisory_token_scan_without_blocking() {
    let server = MockServer::start().await;
    let cfg = config(Variant::GatedClaim, server.uri(), "WRONG");
    let mut harness = Harness::spawn(cfg, &[]);

    let mut scanned_invalid = false;
    let mut revealed = false;
    while let Some(ev) = harness.event_rx.recv().await {
        match ev {
            WorkflowEvent::Info(InfoEvent::TokenScanned { valid }) => {
                scanned_invalid = !valid;
            }
            WorkflowEvent::StatusChanged {
                status: WorkflowStatus::Idle,
            } => {
                // The form still reveals with a bad token; enforcement waits
                // for the submit.
                revealed = true;
                harness.cmd_tx.send(UiCommand::Quit).unwrap();
            }
            _ => {}
        }
    }

    assert!(scanned_invalid);
    assert!(revealed);
    assert_eq!(harness.final_status().await, WorkflowStatus::Idle);
}
