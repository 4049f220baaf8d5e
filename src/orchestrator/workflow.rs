//! The submission state machine.
//!
//! Owns the form fields and the five-state status. Mutated only through its
//! methods, so the whole lifecycle is testable without a UI or a network.

use crate::gate;
use crate::model::{
    Celebration, EntryForm, Field, InfoEvent, SubmissionPayload, WorkflowConfig, WorkflowEvent,
    WorkflowStatus,
};
use crate::webhook::SubmissionError;

/// Why a submit attempt produced no payload. The machine's status is
/// unchanged in every one of these cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDenial {
    /// The form has not been revealed yet.
    NotReady,
    /// A request is already in flight; at most one at a time.
    InFlight,
    /// `Success` is terminal; the form is gone.
    Terminal,
    /// The QR token does not match; nothing may be sent.
    GateDenied,
}

pub struct Workflow {
    cfg: WorkflowConfig,
    status: WorkflowStatus,
    form: EntryForm,
}

impl Workflow {
    pub fn new(cfg: WorkflowConfig) -> Self {
        Self {
            cfg,
            status: WorkflowStatus::Validating,
            form: EntryForm::default(),
        }
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.cfg
    }

    pub fn form(&self) -> &EntryForm {
        &self.form
    }

    pub fn set_field(&mut self, field: Field, value: String) {
        self.form.set(field, value);
    }

    /// Events to emit before the loop starts. The gated flow reports the
    /// token check as advisory info only; enforcement waits until submit so
    /// an invalid scan is not tipped off early.
    pub fn startup_events(&self) -> Vec<WorkflowEvent> {
        let mut events = vec![WorkflowEvent::StatusChanged {
            status: self.status,
        }];
        if self.cfg.variant.gated() {
            events.push(WorkflowEvent::Info(InfoEvent::TokenScanned {
                valid: gate::check(&self.cfg.token),
            }));
        }
        events
    }

    /// End the validating phase. Fires at most once; the machine never
    /// returns to `Validating`.
    pub fn reveal(&mut self) -> Vec<WorkflowEvent> {
        if self.status != WorkflowStatus::Validating {
            return Vec::new();
        }
        self.status = WorkflowStatus::Idle;
        vec![
            WorkflowEvent::StatusChanged {
                status: WorkflowStatus::Idle,
            },
            WorkflowEvent::Celebrate(Celebration::Reveal),
        ]
    }

    /// Attempt to start a submission. A payload is returned iff the machine
    /// transitioned into `Sending`; the caller must follow up with
    /// [`finish_submit`](Self::finish_submit) once the request resolves.
    pub fn try_begin_submit(&mut self) -> Result<SubmissionPayload, SubmitDenial> {
        match self.status {
            WorkflowStatus::Validating => Err(SubmitDenial::NotReady),
            WorkflowStatus::Sending => Err(SubmitDenial::InFlight),
            WorkflowStatus::Success => Err(SubmitDenial::Terminal),
            WorkflowStatus::Idle | WorkflowStatus::Error => {
                if self.cfg.variant.gated() && !gate::check(&self.cfg.token) {
                    return Err(SubmitDenial::GateDenied);
                }
                self.status = WorkflowStatus::Sending;
                Ok(SubmissionPayload::assemble(
                    &self.cfg,
                    &self.form,
                    now_rfc3339(),
                ))
            }
        }
    }

    /// Record the outcome of the in-flight submission. Transport failures and
    /// server rejections land in the same `Error` status; the user only sees
    /// the generic retry hint. Fields keep their values for the retry.
    pub fn finish_submit(&mut self, result: Result<(), SubmissionError>) -> Vec<WorkflowEvent> {
        if self.status != WorkflowStatus::Sending {
            return Vec::new();
        }
        match result {
            Ok(()) => {
                self.status = WorkflowStatus::Success;
                vec![
                    WorkflowEvent::StatusChanged {
                        status: WorkflowStatus::Success,
                    },
                    WorkflowEvent::Celebrate(Celebration::Jackpot),
                ]
            }
            Err(_) => {
                self.status = WorkflowStatus::Error;
                vec![
                    WorkflowEvent::StatusChanged {
                        status: WorkflowStatus::Error,
                    },
                    WorkflowEvent::Info(InfoEvent::SubmissionFailed),
                ]
            }
        }
    }
}

/// Current UTC instant in RFC 3339, the `timestamp` the webhook expects.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}
