use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::job::JobStage;

/// Failures of a single external step.
///
/// Each variant keeps the tool's exit status and captured output verbatim: the people reading
/// these are tuning encoder flags and need the raw ffmpeg text.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed on {} ({status}): {output}", .path.display())]
    Probe {
        path: PathBuf,
        tool: String,
        status: String,
        output: String,
    },

    #[error("could not read {tool} output for {}: {reason}", .path.display())]
    ProbeJson {
        path: PathBuf,
        tool: String,
        reason: String,
    },

    #[error("unsupported codec '{requested}'. Please use one of these: {}", .valid.join(", "))]
    UnsupportedCodec {
        requested: String,
        valid: Vec<&'static str>,
    },

    #[error("ffmpeg failed to encode {} ({status}): {output}", .path.display())]
    Encode {
        path: PathBuf,
        status: String,
        output: String,
    },

    #[error("ffmpeg failed to create snapshot {} ({status}): {output}", .path.display())]
    Snapshot {
        path: PathBuf,
        status: String,
        output: String,
    },

    #[error("no VMAF score found in ffmpeg output{}: {output}", status_suffix(.status))]
    ScoreParse {
        status: Option<String>,
        output: String,
    },
}

fn status_suffix(status: &Option<String>) -> String {
    status
        .as_ref()
        .map(|s| format!(" ({})", s))
        .unwrap_or_default()
}

/// A job that stopped at `stage` because of `source`
#[derive(Debug, Error)]
#[error("{} [{codec} @ {bitrate_kbps} kb/s] failed while {stage}: {source}", .input.display())]
pub struct JobError {
    pub input: PathBuf,
    pub codec: String,
    pub bitrate_kbps: u32,
    pub stage: JobStage,
    #[source]
    pub source: BenchError,
}
