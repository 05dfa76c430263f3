//! CLI presentation: text and JSON rendering of engine results.

use crate::engine::{ResetSummary, StartReport, SweepStatus};
use crate::error::SweepError;
use crate::scheduler::RunOutcome;
use crate::trigger::Trigger;
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

pub fn to_json<T: Serialize>(value: &T) -> Result<String, SweepError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| SweepError::ConfigError(format!("Failed to render JSON: {}", e)))
}

fn format_ms(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

pub fn format_start_report_text(report: &StartReport) -> String {
    let headline = match report.outcome {
        RunOutcome::Complete => "Sweep complete".to_string(),
        RunOutcome::Suspended {
            work_remaining: true,
        } => "Sweep suspended, work remaining".to_string(),
        RunOutcome::Suspended {
            work_remaining: false,
        } => "Sweep complete (budget reached on the last step)".to_string(),
    };

    let mut out = format!(
        "{} for root {}{}\n\n",
        headline,
        report.root_id,
        if report.resumed { " (resumed)" } else { "" }
    );

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Steps".to_string(), report.stats.steps.to_string()]);
    table.add_row(vec![
        "Files reset".to_string(),
        report.stats.files_reset.to_string(),
    ]);
    table.add_row(vec![
        "Folders expanded".to_string(),
        report.stats.folders_expanded.to_string(),
    ]);
    table.add_row(vec!["Skipped".to_string(), report.stats.skipped.to_string()]);
    table.add_row(vec![
        "Unavailable nodes".to_string(),
        report.stats.failed.to_string(),
    ]);
    table.add_row(vec![
        "Permission step failures".to_string(),
        report.stats.permission_failures.to_string(),
    ]);
    table.add_row(vec![
        "Elapsed (ms)".to_string(),
        report.stats.elapsed_ms.to_string(),
    ]);
    out.push_str(&format!("{}\n", table));

    if let Some(ref trigger) = report.trigger {
        out.push_str(&format!(
            "\nNext invocation of '{}' due at {} ({} folders, {} files queued)\n",
            trigger.entry_point,
            format_ms(trigger.due_at_ms),
            report.queues.folder_queue,
            report.queues.file_queue
        ));
    }
    out
}

pub fn format_status_text(status: &SweepStatus) -> String {
    match status {
        SweepStatus::Idle => "No process running\n".to_string(),
        SweepStatus::Running {
            root_id,
            queues,
            next_resume,
        } => {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["", "Count"]);
            table.add_row(vec![
                "Folder queue".to_string(),
                queues.folder_queue.to_string(),
            ]);
            table.add_row(vec![
                "File queue".to_string(),
                queues.file_queue.to_string(),
            ]);
            table.add_row(vec![
                "Processed folders".to_string(),
                queues.processed_folders.to_string(),
            ]);
            table.add_row(vec![
                "Processed files".to_string(),
                queues.processed_files.to_string(),
            ]);

            let resume = next_resume
                .as_ref()
                .map(|t| format_ms(t.due_at_ms))
                .unwrap_or_else(|| "none scheduled".to_string());
            format!(
                "Sweep in progress for root {}\n\n{}\n\nNext resume: {}\n",
                root_id, table, resume
            )
        }
    }
}

pub fn format_triggers_text(triggers: &[Trigger]) -> String {
    if triggers.is_empty() {
        return "No pending triggers\n".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Handle", "Entry point", "Created", "Due"]);
    for trigger in triggers {
        table.add_row(vec![
            trigger.handle.to_string(),
            trigger.entry_point.clone(),
            format_ms(trigger.created_at_ms),
            format_ms(trigger.due_at_ms),
        ]);
    }
    format!("{}\n", table)
}

pub fn format_reset_summary(summary: &ResetSummary) -> String {
    format!(
        "Sweep state reset: {} checkpoint keys and {} triggers removed",
        summary.checkpoint_keys_removed, summary.triggers_removed
    )
}
