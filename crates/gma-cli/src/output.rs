//! Output renderers and formatting helpers for CLI commands.

use std::collections::HashMap;

use anyhow::anyhow;
use gma_api_models::{ClassificationOutcome, DoctorProfile, RiskSummary, TestRecord, VideoRecord};
use gma_client::{DownloadedFile, IdentitySession};
use gma_dashboard::{
    AcceptReport, DashboardTotals, DeletionReport, StatusCounts, TestSummary, UploadManager,
    UploadStatus, UploadTask,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

fn print_json(value: &Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_identity(
    identity: &IdentitySession,
    profile: Option<&DoctorProfile>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "uid": identity.uid,
            "email": identity.email,
            "display_name": identity.display_name,
            "refresh_token": identity.refresh_token(),
            "profile": profile,
        }))?,
        OutputFormat::Table => {
            println!("uid: {}", identity.uid);
            if let Some(email) = &identity.email {
                println!("email: {email}");
            }
            if let Some(name) = profile
                .and_then(|profile| profile.name.as_deref())
                .or(identity.display_name.as_deref())
            {
                println!("name: {name}");
            }
            println!("refresh token: {}", identity.refresh_token());
            println!("export GMA_REFRESH_TOKEN to reuse this session");
        }
    }
    Ok(())
}

pub(crate) fn render_video_list(
    videos: &[&VideoRecord],
    counts: Option<&StatusCounts>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "videos": videos,
            "status_counts": counts.map(status_counts_json),
        }))?,
        OutputFormat::Table => {
            println!("{:>8} {:>12} {:<12} {:<10} NAME", "ID", "SIZE", "STATUS", "RISK");
            for video in videos {
                println!(
                    "{:>8} {:>12} {:<12} {:<10} {}",
                    video.id,
                    format_bytes(video.file_size),
                    video.status.as_str(),
                    video.classification.map_or("-", |bucket| bucket.as_str()),
                    video.display_name()
                );
            }
            if let Some(counts) = counts {
                println!(
                    "{} video(s): {} uploaded, {} processing, {} completed, {} error",
                    counts.total(),
                    counts.uploaded,
                    counts.processing,
                    counts.completed,
                    counts.error
                );
            }
        }
    }
    Ok(())
}

fn status_counts_json(counts: &StatusCounts) -> Value {
    json!({
        "uploaded": counts.uploaded,
        "processing": counts.processing,
        "completed": counts.completed,
        "error": counts.error,
        "other": counts.other,
        "total": counts.total(),
    })
}

pub(crate) fn render_upload_report(
    report: &AcceptReport,
    tasks: &[UploadTask],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "uploads": tasks.iter().map(task_json).collect::<Vec<_>>(),
            "rejected": report
                .rejected
                .iter()
                .map(|rejection| json!({
                    "file": rejection.file,
                    "reason": rejection.reason.message(),
                }))
                .collect::<Vec<_>>(),
        }))?,
        OutputFormat::Table => {
            if !tasks.is_empty() {
                println!("{:>8} {:>12} {:<10} NAME", "ID", "SIZE", "STATUS");
            }
            for task in tasks {
                println!(
                    "{:>8} {:>12} {:<10} {}",
                    task.backend_id()
                        .map_or_else(|| "-".to_string(), |id| id.to_string()),
                    format_bytes(task.source.size),
                    status_label(&task.status),
                    task.source.file_name
                );
                if let Some(message) = task.error_message() {
                    println!("{:>8} {message}", "");
                }
            }
            for rejection in &report.rejected {
                println!("rejected {}: {}", rejection.file, rejection.reason.message());
            }
        }
    }
    Ok(())
}

fn task_json(task: &UploadTask) -> Value {
    json!({
        "file": task.source.file_name,
        "size": task.source.size,
        "status": status_label(&task.status),
        "progress": task.progress,
        "backend_id": task.backend_id(),
        "error": task.error_message(),
    })
}

const fn status_label(status: &UploadStatus) -> &'static str {
    match status {
        UploadStatus::Uploading => "uploading",
        UploadStatus::Success { .. } => "success",
        UploadStatus::Error { .. } => "error",
    }
}

/// Prints upload progress to stderr as quarter steps and final states.
pub(crate) struct UploadProgress {
    enabled: bool,
    reported: HashMap<Uuid, (u8, &'static str)>,
}

impl UploadProgress {
    pub(crate) fn new(format: OutputFormat) -> Self {
        Self {
            enabled: format == OutputFormat::Table,
            reported: HashMap::new(),
        }
    }

    pub(crate) fn observe(&mut self, manager: &UploadManager) {
        if !self.enabled {
            return;
        }
        for task in manager.tasks() {
            let state = (task.progress / 25 * 25, status_label(&task.status));
            if self.reported.get(&task.local_id) == Some(&state) {
                continue;
            }
            self.reported.insert(task.local_id, state);
            eprintln!("{}: {} {}%", task.source.file_name, state.1, task.progress);
        }
    }
}

pub(crate) fn render_deletion(report: &DeletionReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "deleted": report.succeeded,
            "failed": report
                .failed
                .iter()
                .map(|failure| json!({"id": failure.id, "message": failure.message}))
                .collect::<Vec<_>>(),
        }))?,
        OutputFormat::Table => {
            println!("{}", report.notice());
            for failure in &report.failed {
                println!("  {}: {}", failure.id, failure.message);
            }
        }
    }
    Ok(())
}

pub(crate) fn render_download(file: &DownloadedFile, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "path": file.path.display().to_string(),
            "bytes": file.bytes,
        }))?,
        OutputFormat::Table => {
            println!("saved {} ({})", file.path.display(), format_bytes(file.bytes));
        }
    }
    Ok(())
}

pub(crate) fn render_results(
    test: &TestRecord,
    outcomes: &[ClassificationOutcome],
    summary: &RiskSummary,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "test": test,
            "outcomes": outcomes,
            "summary": summary,
        }))?,
        OutputFormat::Table => {
            println!(
                "test {} ({}, {}) submitted {}",
                test.id,
                test.test_type.as_str(),
                test.status.as_str(),
                test.submitted_at.format("%Y-%m-%d %H:%M")
            );
            print_summary_line(summary);
            if !outcomes.is_empty() {
                println!(
                    "{:>8} {:>6} {:>6} {:>6} {:<10} FILE",
                    "VIDEO", "MATH", "DL", "FINAL", "RISK"
                );
            }
            for outcome in outcomes {
                println!(
                    "{:>8} {:>6.1} {:>6.1} {:>6.1} {:<10} {}",
                    outcome.video_id,
                    outcome.math_classifier,
                    outcome.dl_classifier,
                    outcome.final_result,
                    outcome.status().label(),
                    outcome.video_filename
                );
            }
        }
    }
    Ok(())
}

fn print_summary_line(summary: &RiskSummary) {
    println!(
        "{} processed: {} high risk, {} uncertain, {} low risk",
        summary.videos_processed, summary.high_risk, summary.uncertain, summary.low_risk
    );
}

pub(crate) fn render_history(tests: &[TestSummary], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!(
            tests
                .iter()
                .map(|entry| json!({"test": entry.test, "summary": entry.summary}))
                .collect::<Vec<_>>()
        ))?,
        OutputFormat::Table => {
            println!(
                "{:>6} {:<8} {:<10} {:<17} {:>6} {:>5} {:>5} {:>5}",
                "ID", "TYPE", "STATUS", "SUBMITTED", "VIDEOS", "HIGH", "UNC", "LOW"
            );
            for entry in tests {
                println!(
                    "{:>6} {:<8} {:<10} {:<17} {:>6} {:>5} {:>5} {:>5}",
                    entry.test.id,
                    entry.test.test_type.as_str(),
                    entry.test.status.as_str(),
                    entry.test.submitted_at.format("%Y-%m-%d %H:%M"),
                    entry.summary.videos_processed,
                    entry.summary.high_risk,
                    entry.summary.uncertain,
                    entry.summary.low_risk
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_summary(
    totals: &DashboardTotals,
    counts: &StatusCounts,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "tests_run": totals.tests_run,
            "outcomes": totals.outcomes,
            "latest_test": totals.latest,
            "videos": status_counts_json(counts),
        }))?,
        OutputFormat::Table => {
            println!("tests run: {}", totals.tests_run);
            match totals.latest {
                Some(latest) => println!("latest test: {}", latest.format("%Y-%m-%d %H:%M")),
                None => println!("latest test: none"),
            }
            print_summary_line(&totals.outcomes);
            println!(
                "videos: {} ({} uploaded, {} processing, {} completed, {} error)",
                counts.total(),
                counts.uploaded,
                counts.processing,
                counts.completed,
                counts.error
            );
        }
    }
    Ok(())
}

pub(crate) fn render_profile(
    profile: Option<&DoctorProfile>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!(profile))?,
        OutputFormat::Table => match profile {
            Some(profile) => {
                println!("email: {}", profile.email);
                println!("name: {}", profile.name.as_deref().unwrap_or("-"));
                println!("role: {}", profile.role);
                if let Some(created) = profile.created_at {
                    println!("member since: {}", created.format("%Y-%m-%d"));
                }
            }
            None => println!("no profile yet"),
        },
    }
    Ok(())
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_use_binary_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KiB");
        assert_eq!(format_bytes(1_610_612_736), "1.50 GiB");
    }

    #[test]
    fn upload_labels_follow_status() {
        assert_eq!(status_label(&UploadStatus::Uploading), "uploading");
        assert_eq!(
            status_label(&UploadStatus::Success { backend_id: 3 }),
            "success"
        );
        assert_eq!(
            status_label(&UploadStatus::Error {
                message: "boom".into()
            }),
            "error"
        );
    }

    #[test]
    fn status_counts_serialise_with_total() {
        let counts = StatusCounts {
            uploaded: 2,
            processing: 1,
            ..StatusCounts::default()
        };
        let value = status_counts_json(&counts);
        assert_eq!(value["total"], 3);
        assert_eq!(value["processing"], 1);
    }
}
