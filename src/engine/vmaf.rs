//! VMAF scoring of an encoded asset against its source.
//!
//! Both legs of the comparison go through the same normalization chain before they reach
//! libvmaf: frame rate, bicubic scale to the output size, and a timestamp reset onto the
//! default timebase. libvmaf pairs frames by position, so skipping any of these on one side
//! silently compares the wrong frames.

use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use super::BenchContext;
use super::error::BenchError;
use super::tools::format_command;

/// Worker threads libvmaf uses internally
pub const DEFAULT_VMAF_THREADS: u32 = 8;

/// Literal that precedes the pooled score in ffmpeg's log output
pub const SCORE_PREFIX: &str = "VMAF score: ";

/// Normalization applied to both the reference and the distorted stream
pub fn normalize_filter(width: u32, height: u32, framerate: u32) -> String {
    format!(
        "fps={},scale={}x{}:flags=bicubic,settb=AVTB,setpts=PTS-STARTPTS",
        framerate, width, height
    )
}

/// Filter graph comparing input 1 (distorted) against input 0 (reference)
pub fn vmaf_filter_graph(width: u32, height: u32, framerate: u32, n_threads: u32) -> String {
    let norm = normalize_filter(width, height, framerate);
    format!(
        "[0:v]{norm}[ref];[1:v]{norm}[distorted];[distorted][ref]libvmaf=n_threads={threads}",
        norm = norm,
        threads = n_threads,
    )
}

/// Build the ffmpeg command computing VMAF; media output goes to the null muxer
pub fn build_vmaf_cmd(
    ffmpeg: &str,
    source: &Path,
    encoded: &Path,
    width: u32,
    height: u32,
    framerate: u32,
    n_threads: u32,
) -> Command {
    let mut cmd = Command::new(ffmpeg);
    cmd.arg("-i")
        .arg(source)
        .arg("-i")
        .arg(encoded)
        .arg("-filter_complex")
        .arg(vmaf_filter_graph(width, height, framerate, n_threads))
        .args(["-f", "null", "-"]);
    cmd
}

/// Extract the pooled VMAF score from ffmpeg's diagnostic output.
///
/// Grammar: the literal `VMAF score: ` followed by `DIGITS "." DIGITS`. The first
/// occurrence of the prefix that is followed by such a number wins.
pub fn find_vmaf_score(text: &str) -> Option<f64> {
    let mut rest = text;
    while let Some(pos) = rest.find(SCORE_PREFIX) {
        rest = &rest[pos + SCORE_PREFIX.len()..];
        if let Some(score) = leading_decimal(rest) {
            return Some(score);
        }
    }
    None
}

/// Like [`find_vmaf_score`], failing with the raw text when no score is present
pub fn parse_vmaf_score(text: &str) -> Result<f64, BenchError> {
    find_vmaf_score(text).ok_or_else(|| BenchError::ScoreParse {
        status: None,
        output: text.to_string(),
    })
}

/// Parse `DIGITS "." DIGITS` at the start of `s`
fn leading_decimal(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let int_len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if int_len == 0 || bytes.get(int_len) != Some(&b'.') {
        return None;
    }

    let frac_len = bytes[int_len + 1..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if frac_len == 0 {
        return None;
    }

    s[..int_len + 1 + frac_len].parse().ok()
}

/// Run the comparison and return the score
pub fn score(
    ctx: &BenchContext<'_>,
    source: &Path,
    encoded: &Path,
    width: u32,
    height: u32,
    framerate: u32,
) -> Result<f64, BenchError> {
    let mut cmd = build_vmaf_cmd(
        &ctx.tools.ffmpeg,
        source,
        encoded,
        width,
        height,
        framerate,
        ctx.vmaf_threads,
    );
    debug!(command = %format_command(&cmd), "computing VMAF");

    let output = ctx.runner.run(&mut cmd).map_err(|source| BenchError::Spawn {
        tool: ctx.tools.ffmpeg.clone(),
        source,
    })?;

    // The score line is the only signal; a failed run simply has none
    let score = find_vmaf_score(&output.stderr).ok_or_else(|| BenchError::ScoreParse {
        status: (!output.success()).then(|| output.status_label()),
        output: output.stderr.clone(),
    })?;

    info!(encoded = %encoded.display(), score, "VMAF computed");
    Ok(score)
}
