//! Text summary builder for CLI output.
//!
//! Formats human-readable lines for text mode from a completed run's record.

use crate::model::{SubmissionRecord, Variant, WorkflowStatus};

pub struct TextSummary {
    pub lines: Vec<String>,
}

/// Build the final text-mode summary for a submission run.
pub fn build_text_summary(record: &SubmissionRecord) -> TextSummary {
    let mut lines = Vec::new();

    let flow = match record.variant {
        Variant::Signup => "Clue-list signup",
        Variant::Claim => "Winner claim",
        Variant::GatedClaim => "Winner claim (QR gated)",
    };

    lines.push(format!("Flow:      {}", flow));
    lines.push(format!("Endpoint:  {}", record.endpoint));
    lines.push(format!("Source:    {}", record.source));
    lines.push(format!("Finished:  {}", record.timestamp_utc));

    match record.status {
        WorkflowStatus::Success => {
            lines.push("Result:    transmitted — keep the physical ticket safe".to_string());
        }
        status => {
            lines.push(format!("Result:    {}", status.as_str()));
            if let Some(detail) = record.detail.as_deref() {
                lines.push(format!("Detail:    {}", detail));
            }
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: WorkflowStatus, detail: Option<&str>) -> SubmissionRecord {
        SubmissionRecord {
            timestamp_utc: "2026-02-28T05:00:00Z".to_string(),
            variant: Variant::Signup,
            endpoint: crate::model::SIGNUP_ENDPOINT.to_string(),
            source: crate::model::SIGNUP_SOURCE.to_string(),
            status,
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn success_summary_has_no_detail_line() {
        let summary = build_text_summary(&record(WorkflowStatus::Success, None));
        assert_eq!(summary.lines.len(), 5);
        assert!(summary.lines[4].contains("transmitted"));
    }

    #[test]
    fn failed_summary_includes_detail() {
        let summary = build_text_summary(&record(
            WorkflowStatus::Error,
            Some("connection error"),
        ));
        assert!(summary.lines.iter().any(|l| l.contains("error")));
        assert!(summary.lines.iter().any(|l| l.contains("connection error")));
    }
}
