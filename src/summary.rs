//! Text summary builder for CLI output.
//!
//! Formats a finished run as human-readable lines for text mode.

use crate::model::{DesiredAction, RunSummary, StatusState};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a terminal run. Partial failure is reported in
/// the counts but never escalated; an all-error run still summarizes as a
/// completed run.
pub(crate) fn build_text_summary(summary: &RunSummary) -> TextSummary {
    let mut lines = Vec::new();

    let verb = match summary.action {
        DesiredAction::Start => "Started",
        DesiredAction::Stop => "Stopped",
    };

    if summary.entries.is_empty() {
        lines.push("Nothing to do: all pipelines already in the desired state.".to_string());
        return TextSummary { lines };
    }

    for entry in &summary.entries {
        let mark = match entry.status {
            StatusState::Success => "ok",
            StatusState::Error => "FAILED",
            StatusState::Waiting => "pending",
        };
        lines.push(format!("  [{:>2}] {} ... {}", entry.index, entry.name, mark));
    }

    lines.push(format!(
        "{} {} of {} pipeline(s), {} failed ({})",
        verb,
        summary.succeeded,
        summary.entries.len(),
        summary.failed,
        summary.timestamp_utc
    ));

    if let Some(refreshed) = summary.refreshed.as_ref() {
        let running = refreshed.iter().filter(|p| p.running).count();
        lines.push(format!(
            "Registry now reports {} of {} pipeline(s) running",
            running,
            refreshed.len()
        ));
    }

    TextSummary { lines }
}
