//! Run lifecycle controller.
//!
//! Drives the submission state machine from UI commands and emits events for
//! presentation layers. Single logical task: the reveal timer, the command
//! stream, and the in-flight submission are select branches on one loop.

use crate::model::{Field, InfoEvent, WorkflowConfig, WorkflowEvent, WorkflowStatus};
use crate::orchestrator::workflow::{SubmitDenial, Workflow};
use crate::webhook::{SubmissionClient, SubmissionError};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to drive the workflow.
#[derive(Debug, Clone)]
pub enum UiCommand {
    SetField { field: Field, value: String },
    Submit,
    Quit,
}

/// Orchestrate one workflow run. Returns the final status so one-shot modes
/// can derive their exit code.
pub async fn run_controller(
    cfg: WorkflowConfig,
    event_tx: UnboundedSender<WorkflowEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<WorkflowStatus> {
    let client = SubmissionClient::new(&cfg)?;
    let mut workflow = Workflow::new(cfg);

    for ev in workflow.startup_events() {
        let _ = event_tx.send(ev);
    }

    // One-shot reveal timer: Validating -> Idle after the fixed delay,
    // unconditionally. The `revealed` guard retires the branch afterwards.
    let reveal_delay = workflow.config().reveal_delay;
    let reveal = tokio::time::sleep(reveal_delay);
    tokio::pin!(reveal);
    let mut revealed = false;

    // At most one submission in flight; its JoinHandle is the only handle to
    // it, which also keeps the seam where a cancel signal could be threaded.
    let mut inflight: Option<tokio::task::JoinHandle<Result<(), SubmissionError>>> = None;
    let mut quit_pending = false;
    // Once the command channel is closed, recv() completes immediately every
    // poll; retire the branch so waiting on an in-flight response stays quiet.
    let mut cmd_closed = false;

    let final_status = loop {
        tokio::select! {
            () = &mut reveal, if !revealed => {
                revealed = true;
                for ev in workflow.reveal() {
                    let _ = event_tx.send(ev);
                }
            }
            cmd = cmd_rx.recv(), if !cmd_closed => {
                cmd_closed = cmd.is_none();
                match cmd {
                    Some(UiCommand::SetField { field, value }) => {
                        workflow.set_field(field, value);
                    }
                    Some(UiCommand::Submit) => {
                        match workflow.try_begin_submit() {
                            Ok(payload) => {
                                let _ = event_tx.send(WorkflowEvent::StatusChanged {
                                    status: WorkflowStatus::Sending,
                                });
                                let client = client.clone();
                                inflight = Some(tokio::spawn(async move {
                                    client.submit(&payload).await
                                }));
                            }
                            Err(SubmitDenial::GateDenied) => {
                                let _ = event_tx.send(WorkflowEvent::Info(InfoEvent::GateDenied));
                            }
                            Err(SubmitDenial::InFlight) => {
                                let _ = event_tx.send(WorkflowEvent::Info(InfoEvent::AlreadySending));
                            }
                            // Not revealed yet, or already succeeded; nothing to surface.
                            Err(SubmitDenial::NotReady | SubmitDenial::Terminal) => {}
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        // No cancellation semantics: an in-flight request is
                        // awaited to completion before the loop exits.
                        if inflight.is_none() {
                            break workflow.status();
                        }
                        quit_pending = true;
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it
            // can be dropped when another branch is chosen and completion is
            // never observed.
            maybe_done = async {
                match inflight.as_mut() {
                    Some(h) => Some(h.await),
                    None => futures::future::pending().await,
                }
            } => {
                if let Some(join_res) = maybe_done {
                    inflight = None;
                    let result = match join_res {
                        Ok(r) => r,
                        Err(e) => {
                            let _ = event_tx.send(WorkflowEvent::Info(InfoEvent::Message(
                                format!("Submission task failed: {e}"),
                            )));
                            Err(SubmissionError::Interrupted)
                        }
                    };
                    for ev in workflow.finish_submit(result) {
                        let _ = event_tx.send(ev);
                    }
                    if quit_pending {
                        break workflow.status();
                    }
                }
            }
        }
    };

    Ok(final_status)
}
