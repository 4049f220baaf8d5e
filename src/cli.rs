use crate::model::{
    Field, SubmissionRecord, Variant, WorkflowConfig, WorkflowEvent, WorkflowStatus,
};
use crate::orchestrator::{now_rfc3339, run_controller, UiCommand};
use crate::webhook;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
pub(crate) enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
pub(crate) fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "chasse-tresor",
    version,
    about = "NeoCard treasure-hunt contest client with optional TUI"
)]
pub struct Cli {
    /// Which contest flow to run
    #[arg(long, value_enum, default_value = "signup")]
    pub mode: Variant,

    /// Gate credential from the QR deep link (gated-claim mode)
    #[arg(long)]
    pub token: Option<String>,

    /// Email address (required by signup and gated-claim in non-TUI modes)
    #[arg(long)]
    pub email: Option<String>,

    /// First name (required by claim modes in non-TUI modes)
    #[arg(long)]
    pub prenom: Option<String>,

    /// Last name (required by claim modes in non-TUI modes)
    #[arg(long)]
    pub nom: Option<String>,

    /// Override the webhook endpoint for this flow
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override the scan-validation delay before the form is revealed
    #[arg(long)]
    pub reveal_delay: Option<humantime::Duration>,

    /// Print the outcome record as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(args).await;
        }
    }

    run_once(args).await
}

/// Build a `WorkflowConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> WorkflowConfig {
    let variant = args.mode;
    WorkflowConfig {
        variant,
        endpoint: args
            .endpoint
            .clone()
            .unwrap_or_else(|| variant.endpoint().to_string()),
        source: variant.source().to_string(),
        reveal_delay: args
            .reveal_delay
            .map(Duration::from)
            .unwrap_or_else(|| variant.default_reveal_delay()),
        // Absent token reads as empty, which the gate denies by default.
        token: args.token.clone().unwrap_or_default(),
        user_agent: webhook::user_agent(),
        device_info: webhook::device_info(),
    }
}

fn field_arg<'a>(args: &'a Cli, field: Field) -> Option<&'a str> {
    match field {
        Field::Prenom => args.prenom.as_deref(),
        Field::Nom => args.nom.as_deref(),
        Field::Email => args.email.as_deref(),
    }
}

/// Collect the field values a non-interactive run needs, erroring on any
/// required field that was not supplied. This is the rendering-layer check;
/// the workflow core itself never validates fields.
fn collect_fields(args: &Cli) -> Result<Vec<(Field, String)>> {
    let mut values = Vec::new();
    for field in args.mode.required_fields() {
        match field_arg(args, *field) {
            Some(v) if !v.trim().is_empty() => values.push((*field, v.to_string())),
            _ => {
                let flag = match field {
                    Field::Prenom => "--prenom",
                    Field::Nom => "--nom",
                    Field::Email => "--email",
                };
                return Err(anyhow::anyhow!(
                    "{flag} is required for {:?} mode",
                    args.mode
                ));
            }
        }
    }
    Ok(values)
}

/// Drive one scripted submission through the controller: fill the fields,
/// submit once the form is revealed, and quit on the terminal outcome.
async fn run_once(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let fields = collect_fields(&args)?;

    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller = tokio::spawn(run_controller(cfg.clone(), event_tx, cmd_rx));

    for (field, value) in fields {
        let _ = cmd_tx.send(UiCommand::SetField { field, value });
    }

    let mut gate_denied = false;
    while let Some(ev) = event_rx.recv().await {
        match ev {
            WorkflowEvent::StatusChanged { status } => {
                if args.text {
                    let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", status.as_str())));
                }
                match status {
                    // The form is up; fire the one submission of this run.
                    WorkflowStatus::Idle => {
                        let _ = cmd_tx.send(UiCommand::Submit);
                    }
                    WorkflowStatus::Success | WorkflowStatus::Error => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                    }
                    _ => {}
                }
            }
            WorkflowEvent::Info(info) => {
                if matches!(info, crate::model::InfoEvent::GateDenied) {
                    gate_denied = true;
                    let _ = cmd_tx.send(UiCommand::Quit);
                }
                if args.text {
                    let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
                }
            }
            WorkflowEvent::Celebrate(_) => {}
        }
    }

    let final_status = controller
        .await
        .context("controller task failed")??;

    let record = SubmissionRecord {
        timestamp_utc: now_rfc3339(),
        variant: cfg.variant,
        endpoint: cfg.endpoint.clone(),
        source: cfg.source.clone(),
        status: final_status,
        detail: if gate_denied {
            Some("submission refused: invalid token".to_string())
        } else if final_status == WorkflowStatus::Error {
            Some("connection error".to_string())
        } else {
            None
        },
    };

    if args.json {
        let out = serde_json::to_string_pretty(&record)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(&record);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;

    if gate_denied {
        return Err(anyhow::anyhow!(
            "submission refused: invalid token (scan the official QR code)"
        ));
    }
    if final_status != WorkflowStatus::Success {
        return Err(anyhow::anyhow!("submission did not succeed"));
    }
    Ok(())
}
