// Benchmark engine - independent of the command line

pub mod aggregate;
pub mod bench;
pub mod encode;
pub mod error;
pub mod inputs;
pub mod job;
pub mod probe;
pub mod profile;
pub mod snapshot;
pub mod tools;
pub mod vmaf;
pub mod worker;

use std::path::{Path, PathBuf};

pub use aggregate::{BitrateAggregate, BitrateSummary, ScoreAccumulator, aggregate, summarize};
pub use bench::{BenchPlan, BitrateRun, FailurePolicy, JobFailure, RunEvent, run_benchmark};
pub use error::{BenchError, JobError};
pub use inputs::{expand_inputs, is_video_file};
pub use job::{JobResult, JobSpec, JobStage, SnapshotOutcome, planned_commands, run_job};
pub use probe::{MediaInfo, Overrides, probe_media};
pub use profile::{CodecId, CodecProfile, EncoderArgs, PROFILES, profile_for, thread_hint};
pub use snapshot::SnapshotSettings;
pub use tools::{CommandRunner, SystemRunner, ToolOutput, ToolPaths};

/// Default directory for encoded artifacts and snapshots
pub const DEFAULT_WORK_DIR: &str = "tmp_vmaf";

/// How encoded artifacts are named inside the work directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactNaming {
    /// `<stem>_<codec>_<W>x<H>_<kbps>`; re-running a job overwrites its artifact.
    /// Inputs that share a file stem collide, which is harmless only while jobs run one at a time.
    Deterministic,
    /// Appends the input's position to the deterministic name
    PerInput,
}

/// Everything a job needs besides its own parameters
pub struct BenchContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub tools: ToolPaths,
    pub work_dir: PathBuf,
    pub vmaf_threads: u32,
    /// `None` disables snapshots
    pub snapshot: Option<SnapshotSettings>,
    pub naming: ArtifactNaming,
}

impl<'a> BenchContext<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            tools: ToolPaths::default(),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            vmaf_threads: vmaf::DEFAULT_VMAF_THREADS,
            snapshot: Some(SnapshotSettings::default()),
            naming: ArtifactNaming::Deterministic,
        }
    }

    /// Path of an artifact `<stem>.<ext>` in the work directory
    pub fn artifact_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.work_dir.join(format!("{}.{}", stem, ext))
    }

    /// Create the work directory if it doesn't exist
    pub fn ensure_work_dir(&self) -> std::io::Result<&Path> {
        std::fs::create_dir_all(&self.work_dir)?;
        Ok(&self.work_dir)
    }
}
