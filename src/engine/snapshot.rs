// Single-frame snapshot of an encoded artifact, for eyeballing artifacts

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::debug;

use super::BenchContext;
use super::error::BenchError;
use super::tools::format_command;

/// Image format of snapshots
pub const SNAPSHOT_EXT: &str = "jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSettings {
    /// Position of the captured frame, in seconds from the start
    pub offset_secs: f64,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self { offset_secs: 5.0 }
    }
}

/// Format seconds as an ffmpeg timestamp (`HH:MM:SS.mmm`)
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

pub fn build_snapshot_cmd(
    ffmpeg: &str,
    encoded: &Path,
    image: &Path,
    settings: &SnapshotSettings,
) -> Command {
    let mut cmd = Command::new(ffmpeg);
    cmd.arg("-ss")
        .arg(format_timestamp(settings.offset_secs))
        .arg("-i")
        .arg(encoded)
        .args(["-vframes", "1", "-y", "-loglevel", "error"])
        .arg(image);
    cmd
}

/// Write one frame of `encoded` to `image`
pub fn capture_snapshot(
    ctx: &BenchContext<'_>,
    encoded: &Path,
    image: &Path,
    settings: &SnapshotSettings,
) -> Result<(), BenchError> {
    let mut cmd = build_snapshot_cmd(&ctx.tools.ffmpeg, encoded, image, settings);
    debug!(command = %format_command(&cmd), "capturing snapshot");

    let output = ctx.runner.run(&mut cmd).map_err(|source| BenchError::Spawn {
        tool: ctx.tools.ffmpeg.clone(),
        source,
    })?;

    if !output.success() {
        return Err(BenchError::Snapshot {
            path: image.to_path_buf(),
            status: output.status_label(),
            output: output.diagnostics().to_string(),
        });
    }

    Ok(())
}
