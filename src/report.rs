// Line-oriented benchmark report and JSON export

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::engine::{
    BitrateRun, BitrateSummary, CodecId, JobError, JobResult, RunEvent, job::display_name,
};

/// Shortest round-trip form that always keeps a fraction: `85.0`, `93.456789`
fn decimal(value: f64) -> String {
    format!("{:?}", value)
}

/// Bits per second as kb/s, e.g. `812.345` or `400.0`
pub fn format_kbps(bps: f64) -> String {
    decimal(bps / 1000.0)
}

pub fn bitrate_header(codec: CodecId, bitrate_kbps: u32) -> String {
    format!("computing VMAF for {} at {}", codec, bitrate_kbps)
}

/// `  clip.mp4: 93.4 \tfps: 41\t bitrate: 812.3kb/s`
pub fn result_line(result: &JobResult) -> String {
    format!(
        "  {}: {} \tfps: {}\t bitrate: {}kb/s",
        result.display_name(),
        decimal(result.score),
        result.throughput_fps.floor() as u64,
        format_kbps(result.achieved_bitrate_bps as f64)
    )
}

pub fn failure_line(err: &JobError) -> String {
    format!(
        "  {}: failed while {}: {}",
        display_name(&err.input),
        err.stage,
        err.source
    )
}

/// Closing line for a bitrate; `None` when no job succeeded
pub fn summary_line(summary: &BitrateSummary) -> Option<String> {
    match summary {
        BitrateSummary::Empty => None,
        BitrateSummary::Single { result } => Some(format!(
            "VMAF: {} \tfps: {}\t bitrate: {}kb/s",
            decimal(result.score),
            result.throughput_fps.floor() as u64,
            format_kbps(result.achieved_bitrate_bps as f64)
        )),
        BitrateSummary::Averaged { aggregate } => Some(format!(
            "average VMAF: {} \tfps: {}\t bitrate: {}kb/s",
            decimal(aggregate.mean_score),
            aggregate.floored_throughput(),
            format_kbps(aggregate.mean_achieved_bitrate_bps)
        )),
    }
}

/// The report line for an event, if it has one
pub fn event_line(event: &RunEvent<'_>) -> Option<String> {
    match event {
        RunEvent::BitrateStarted {
            codec,
            bitrate_kbps,
        } => Some(bitrate_header(*codec, *bitrate_kbps)),
        RunEvent::JobFinished(result) => Some(result_line(result)),
        RunEvent::JobFailed(err) => Some(failure_line(err)),
        RunEvent::BitrateFinished(run) => summary_line(&run.summary),
    }
}

pub fn print_event(event: &RunEvent<'_>) {
    if let Some(line) = event_line(event) {
        println!("{}", line);
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    tool: &'static str,
    version: &'static str,
    runs: &'a [BitrateRun],
}

/// Write all runs as pretty JSON
pub fn write_json_report(path: &Path, runs: &[BitrateRun]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory: {}", parent.display()))?;
    }

    let report = JsonReport {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        runs,
    };
    let contents = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;

    fs::write(path, contents)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;

    Ok(())
}
