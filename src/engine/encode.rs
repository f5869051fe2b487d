// Encode step: shared pre-processing + codec profile

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::BenchContext;
use super::error::BenchError;
use super::profile::{CodecId, profile_for, thread_hint};
use super::tools::format_command;

/// Pixel format every encode is forced to
pub const PIXEL_FORMAT: &str = "yuv420p";

/// Container used for encoded artifacts
pub const ARTIFACT_EXT: &str = "mkv";

/// One encode of `source` at the requested output settings
#[derive(Debug, Clone)]
pub struct EncodeRequest<'a> {
    pub source: &'a Path,
    pub codec: CodecId,
    pub bitrate_kbps: u32,
    pub framerate: u32,
    pub width: u32,
    pub height: u32,
    pub output: &'a Path,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutcome {
    pub output: PathBuf,
    /// Wall-clock time of the encoder process alone
    pub elapsed: Duration,
}

/// Pre-processing applied to the source before it reaches the encoder
pub fn encode_filter(framerate: u32, width: u32, height: u32) -> String {
    format!(
        "fps={},scale={}x{}:flags=bicubic,format={}",
        framerate, width, height, PIXEL_FORMAT
    )
}

/// Deterministic artifact name: `<stem>_<codec>_<W>x<H>_<kbps>`.
///
/// `input_index` is appended as `_i<N>` when jobs run concurrently, since two inputs may share a
/// file stem while living in different directories.
pub fn artifact_stem(
    source: &Path,
    codec: CodecId,
    width: u32,
    height: u32,
    bitrate_kbps: u32,
    input_index: Option<usize>,
) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let mut name = format!("{}_{}_{}x{}_{}", stem, codec, width, height, bitrate_kbps);
    if let Some(index) = input_index {
        name.push_str(&format!("_i{}", index));
    }
    name
}

/// Build the full ffmpeg encode command
pub fn build_encode_cmd(ffmpeg: &str, req: &EncodeRequest<'_>) -> Command {
    let threads = thread_hint(req.width, req.height);
    let encoder = profile_for(req.codec, req.width, req.height, req.bitrate_kbps);

    let mut cmd = Command::new(ffmpeg);
    cmd.arg("-i")
        .arg(req.source)
        .arg("-filter:v")
        .arg(encode_filter(req.framerate, req.width, req.height))
        .arg("-threads")
        .arg(threads.to_string())
        .arg("-an") // discard audio
        .arg("-y")
        .args(["-loglevel", "error"])
        .args(encoder.to_args())
        .arg(req.output);
    cmd
}

/// Run the encode and time it
pub fn encode(ctx: &BenchContext<'_>, req: &EncodeRequest<'_>) -> Result<EncodeOutcome, BenchError> {
    let mut cmd = build_encode_cmd(&ctx.tools.ffmpeg, req);
    debug!(command = %format_command(&cmd), "encoding");

    let started = Instant::now();
    let result = ctx.runner.run(&mut cmd);
    let elapsed = started.elapsed();

    let output = result.map_err(|source| BenchError::Spawn {
        tool: ctx.tools.ffmpeg.clone(),
        source,
    })?;

    // x265 and friends log to stderr on success; only the exit status counts
    if !output.success() {
        return Err(BenchError::Encode {
            path: req.output.to_path_buf(),
            status: output.status_label(),
            output: output.combined(),
        });
    }

    info!(
        output = %req.output.display(),
        elapsed_s = elapsed.as_secs_f64(),
        "encode finished"
    );

    Ok(EncodeOutcome {
        output: req.output.to_path_buf(),
        elapsed,
    })
}
