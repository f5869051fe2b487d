//! One benchmark job: a single (input, codec, bitrate) measurement.
//!
//! A job walks `Probing → Encoding → [Snapshotting] → Scoring → ReProbingEncoded` and ends
//! either with a [`JobResult`] or a [`JobError`] naming the stage that failed. There are no
//! retries and no partial results. A failed snapshot is the one exception: it is recorded on
//! the result and the job carries on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use super::encode::{self, ARTIFACT_EXT, EncodeRequest, artifact_stem, build_encode_cmd};
use super::error::{BenchError, JobError};
use super::probe::{Overrides, build_probe_cmd, probe_media};
use super::profile::CodecId;
use super::snapshot::{SNAPSHOT_EXT, build_snapshot_cmd, capture_snapshot};
use super::vmaf::{self, build_vmaf_cmd};
use super::{ArtifactNaming, BenchContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStage {
    Probing,
    Encoding,
    Snapshotting,
    Scoring,
    ReProbingEncoded,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStage::Probing => "probing source",
            JobStage::Encoding => "encoding",
            JobStage::Snapshotting => "capturing snapshot",
            JobStage::Scoring => "computing VMAF",
            JobStage::ReProbingEncoded => "probing encoded output",
        };
        f.write_str(label)
    }
}

/// Parameters of a single job
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub id: Uuid,
    pub input: PathBuf,
    /// Position of `input` in the run's input list
    pub input_index: usize,
    pub codec: CodecId,
    pub bitrate_kbps: u32,
    pub framerate: u32,
    pub overrides: Overrides,
}

impl JobSpec {
    pub fn new(
        input: PathBuf,
        input_index: usize,
        codec: CodecId,
        bitrate_kbps: u32,
        framerate: u32,
        overrides: Overrides,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            input,
            input_index,
            codec,
            bitrate_kbps,
            framerate,
            overrides,
        }
    }

    /// File name of the input, for report lines
    pub fn display_name(&self) -> String {
        display_name(&self.input)
    }

    fn fail(&self, stage: JobStage, source: BenchError) -> JobError {
        JobError {
            input: self.input.clone(),
            codec: self.codec.to_string(),
            bitrate_kbps: self.bitrate_kbps,
            stage,
            source,
        }
    }

    /// Artifact stem for this job at the effective resolution
    fn artifact_stem(&self, naming: ArtifactNaming, width: u32, height: u32) -> String {
        let index = match naming {
            ArtifactNaming::Deterministic => None,
            ArtifactNaming::PerInput => Some(self.input_index),
        };
        artifact_stem(
            &self.input,
            self.codec,
            width,
            height,
            self.bitrate_kbps,
            index,
        )
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SnapshotOutcome {
    Disabled,
    Captured(PathBuf),
    Failed(String),
}

/// Measurements of one finished job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub input: PathBuf,
    pub codec: CodecId,
    pub bitrate_kbps: u32,
    pub width: u32,
    pub height: u32,
    pub score: f64,
    /// Source frames encoded per wall-clock second
    pub throughput_fps: f64,
    /// Re-measured from the encoded file; the target is only a ceiling
    pub achieved_bitrate_bps: u64,
    pub encode_secs: f64,
    pub encoded: PathBuf,
    pub snapshot: SnapshotOutcome,
}

impl JobResult {
    pub fn display_name(&self) -> String {
        display_name(&self.input)
    }
}

/// `(duration × framerate) / elapsed`; 0 when the encode took no measurable time
pub fn throughput_fps(duration_s: f64, framerate: u32, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        duration_s * framerate as f64 / secs
    } else {
        0.0
    }
}

/// Run every stage of `spec` in order
pub fn run_job(ctx: &BenchContext<'_>, spec: &JobSpec) -> Result<JobResult, JobError> {
    let span = info_span!(
        "job",
        id = %spec.id,
        input = %spec.display_name(),
        codec = %spec.codec,
        kbps = spec.bitrate_kbps
    );
    let _enter = span.enter();

    info!(stage = %JobStage::Probing, "job started");
    let source = probe_media(ctx, &spec.input, spec.overrides)
        .map_err(|e| spec.fail(JobStage::Probing, e))?;
    let (width, height) = (source.width, source.height);

    let stem = spec.artifact_stem(ctx.naming, width, height);
    let encoded_path = ctx.artifact_path(&stem, ARTIFACT_EXT);

    info!(stage = %JobStage::Encoding, width, height, "encoding");
    let outcome = encode::encode(
        ctx,
        &EncodeRequest {
            source: &spec.input,
            codec: spec.codec,
            bitrate_kbps: spec.bitrate_kbps,
            framerate: spec.framerate,
            width,
            height,
            output: &encoded_path,
        },
    )
    .map_err(|e| spec.fail(JobStage::Encoding, e))?;
    let throughput = throughput_fps(source.duration_s, spec.framerate, outcome.elapsed);

    let snapshot = match &ctx.snapshot {
        None => SnapshotOutcome::Disabled,
        Some(settings) => {
            info!(stage = %JobStage::Snapshotting, "capturing snapshot");
            let image = ctx.artifact_path(&stem, SNAPSHOT_EXT);
            match capture_snapshot(ctx, &outcome.output, &image, settings) {
                Ok(()) => SnapshotOutcome::Captured(image),
                Err(e) => {
                    warn!(error = %e, "snapshot failed; continuing");
                    SnapshotOutcome::Failed(e.to_string())
                }
            }
        }
    };

    info!(stage = %JobStage::Scoring, "scoring");
    let score = vmaf::score(
        ctx,
        &spec.input,
        &outcome.output,
        width,
        height,
        spec.framerate,
    )
    .map_err(|e| spec.fail(JobStage::Scoring, e))?;

    info!(stage = %JobStage::ReProbingEncoded, "measuring achieved bitrate");
    let encoded = probe_media(ctx, &outcome.output, spec.overrides)
        .map_err(|e| spec.fail(JobStage::ReProbingEncoded, e))?;

    info!(
        score,
        throughput_fps = throughput,
        achieved_bps = encoded.bitrate_bps,
        "job done"
    );

    Ok(JobResult {
        input: spec.input.clone(),
        codec: spec.codec,
        bitrate_kbps: spec.bitrate_kbps,
        width,
        height,
        score,
        throughput_fps: throughput,
        achieved_bitrate_bps: encoded.bitrate_bps,
        encode_secs: outcome.elapsed.as_secs_f64(),
        encoded: outcome.output,
        snapshot,
    })
}

/// Commands `run_job` would issue after probing the source, in execution order.
///
/// Only the source probe is actually run; it decides the output resolution.
pub fn planned_commands(ctx: &BenchContext<'_>, spec: &JobSpec) -> Result<Vec<Command>, JobError> {
    let source = probe_media(ctx, &spec.input, spec.overrides)
        .map_err(|e| spec.fail(JobStage::Probing, e))?;
    let (width, height) = (source.width, source.height);

    let stem = spec.artifact_stem(ctx.naming, width, height);
    let encoded_path = ctx.artifact_path(&stem, ARTIFACT_EXT);

    let mut cmds = vec![build_probe_cmd(&ctx.tools.ffprobe, &spec.input)];
    cmds.push(build_encode_cmd(
        &ctx.tools.ffmpeg,
        &EncodeRequest {
            source: &spec.input,
            codec: spec.codec,
            bitrate_kbps: spec.bitrate_kbps,
            framerate: spec.framerate,
            width,
            height,
            output: &encoded_path,
        },
    ));
    if let Some(settings) = &ctx.snapshot {
        let image = ctx.artifact_path(&stem, SNAPSHOT_EXT);
        cmds.push(build_snapshot_cmd(
            &ctx.tools.ffmpeg,
            &encoded_path,
            &image,
            settings,
        ));
    }
    cmds.push(build_vmaf_cmd(
        &ctx.tools.ffmpeg,
        &spec.input,
        &encoded_path,
        width,
        height,
        spec.framerate,
        ctx.vmaf_threads,
    ));
    cmds.push(build_probe_cmd(&ctx.tools.ffprobe, &encoded_path));
    Ok(cmds)
}
