// Input probing using ffprobe

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::debug;

use super::BenchContext;
use super::error::BenchError;
use super::tools::format_command;

/// Caller-supplied resolution, applied verbatim in place of the probed one.
/// A zero dimension counts as no override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// What the benchmark needs to know about a media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Stream duration, else container duration, else 0
    pub duration_s: f64,
    /// Container bitrate, 0 when ffprobe doesn't report one
    pub bitrate_bps: u64,
    /// Informational only; the benchmark always uses the requested frame rate
    pub frame_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: FfprobeFormat,
}

/// Build the ffprobe command for the first video stream plus container info
pub fn build_probe_cmd(ffprobe: &str, path: &Path) -> Command {
    let mut cmd = Command::new(ffprobe);
    cmd.args([
        "-v",
        "error",
        "-show_format",
        "-show_streams",
        "-select_streams",
        "v:0", // First video stream only
        "-of",
        "json",
    ])
    .arg(path);
    cmd
}

/// Probe `path` and resolve its effective resolution against `overrides`
pub fn probe_media(
    ctx: &BenchContext<'_>,
    path: &Path,
    overrides: Overrides,
) -> Result<MediaInfo, BenchError> {
    let mut cmd = build_probe_cmd(&ctx.tools.ffprobe, path);
    debug!(command = %format_command(&cmd), "probing");

    let output = ctx.runner.run(&mut cmd).map_err(|source| BenchError::Spawn {
        tool: ctx.tools.ffprobe.clone(),
        source,
    })?;

    if !output.success() {
        return Err(BenchError::Probe {
            path: path.to_path_buf(),
            tool: ctx.tools.ffprobe.clone(),
            status: output.status_label(),
            output: output.diagnostics().to_string(),
        });
    }

    parse_probe_json(&output.stdout, overrides).map_err(|reason| BenchError::ProbeJson {
        path: path.to_path_buf(),
        tool: ctx.tools.ffprobe.clone(),
        reason,
    })
}

/// Parse ffprobe's JSON document into a [`MediaInfo`]
pub fn parse_probe_json(json: &str, overrides: Overrides) -> Result<MediaInfo, String> {
    let probe: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON: {}", e))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| "no video stream found".to_string())?;

    let width = match overrides.width.filter(|&w| w > 0) {
        Some(w) => w,
        None => stream
            .width
            .filter(|&w| w > 0)
            .ok_or("video stream has no width")?,
    };
    let height = match overrides.height.filter(|&h| h > 0) {
        Some(h) => h,
        None => stream
            .height
            .filter(|&h| h > 0)
            .ok_or("video stream has no height")?,
    };

    let duration_s = match stream.duration.as_deref().or(probe.format.duration.as_deref()) {
        Some(d) => d
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid duration '{}'", d))?,
        None => 0.0,
    };

    let bitrate_bps = match probe.format.bit_rate.as_deref() {
        Some(b) => b
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("invalid bit_rate '{}'", b))?,
        None => 0,
    };

    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .or(stream.avg_frame_rate.as_deref())
        .and_then(parse_fraction);

    Ok(MediaInfo {
        width,
        height,
        duration_s,
        bitrate_bps,
        frame_rate,
    })
}

/// Parse a fraction string like "30000/1001" to f64
fn parse_fraction(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let numerator: f64 = num.parse().ok()?;
    let denominator: f64 = den.parse().ok()?;

    if denominator == 0.0 {
        return None;
    }

    Some(numerator / denominator)
}
