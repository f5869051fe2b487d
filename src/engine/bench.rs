//! Run driver: every input at every target bitrate.
//!
//! Bitrates run in the order given, and for each bitrate the inputs run in the order given.
//! With more than one worker the inputs of a bitrate run concurrently, but their results are
//! still reported in input order once the whole bitrate is done.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use super::aggregate::{BitrateSummary, summarize};
use super::error::{BenchError, JobError};
use super::job::{JobResult, JobSpec, JobStage, run_job};
use super::probe::Overrides;
use super::profile::CodecId;
use super::worker::WorkerPool;
use super::{ArtifactNaming, BenchContext};

/// What happens to the rest of the run when a job fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole run on the first failed job
    #[default]
    FailFast,
    /// Record the failure, leave it out of the bitrate's summary and keep going
    Isolate,
}

/// Inputs × bitrates to benchmark with one codec
#[derive(Debug, Clone)]
pub struct BenchPlan {
    pub inputs: Vec<PathBuf>,
    pub codec: CodecId,
    pub framerate: u32,
    pub overrides: Overrides,
    pub bitrates_kbps: Vec<u32>,
    pub failure_policy: FailurePolicy,
    pub max_workers: usize,
}

impl BenchPlan {
    /// Plan with default policy; fails on an unknown codec before anything runs
    pub fn new(
        inputs: Vec<PathBuf>,
        codec: &str,
        framerate: u32,
        bitrates_kbps: Vec<u32>,
    ) -> Result<Self, BenchError> {
        Ok(Self {
            inputs,
            codec: codec.parse()?,
            framerate,
            overrides: Overrides::default(),
            bitrates_kbps,
            failure_policy: FailurePolicy::default(),
            max_workers: 1,
        })
    }

    /// Artifact naming that stays collision-free under this plan's concurrency
    pub fn naming(&self) -> ArtifactNaming {
        if self.max_workers > 1 {
            ArtifactNaming::PerInput
        } else {
            ArtifactNaming::Deterministic
        }
    }

    /// Jobs for one bitrate, in input order
    pub fn jobs_for(&self, bitrate_kbps: u32) -> Vec<JobSpec> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                JobSpec::new(
                    input.clone(),
                    index,
                    self.codec,
                    bitrate_kbps,
                    self.framerate,
                    self.overrides,
                )
            })
            .collect()
    }
}

/// A job that failed under [`FailurePolicy::Isolate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub input: PathBuf,
    pub stage: JobStage,
    pub message: String,
}

impl From<&JobError> for JobFailure {
    fn from(err: &JobError) -> Self {
        Self {
            input: err.input.clone(),
            stage: err.stage,
            message: err.source.to_string(),
        }
    }
}

/// Everything measured at one target bitrate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitrateRun {
    pub codec: CodecId,
    pub bitrate_kbps: u32,
    /// Successful jobs, in input order
    pub results: Vec<JobResult>,
    pub failures: Vec<JobFailure>,
    pub summary: BitrateSummary,
}

/// Progress notifications, in report order
#[derive(Debug)]
pub enum RunEvent<'a> {
    BitrateStarted { codec: CodecId, bitrate_kbps: u32 },
    JobFinished(&'a JobResult),
    JobFailed(&'a JobError),
    BitrateFinished(&'a BitrateRun),
}

/// Run the whole plan.
///
/// Under [`FailurePolicy::FailFast`] the first failed job (in input order) is returned as the
/// error and nothing after it is reported.
pub fn run_benchmark<F>(
    ctx: &BenchContext<'_>,
    plan: &BenchPlan,
    mut on_event: F,
) -> Result<Vec<BitrateRun>, JobError>
where
    F: FnMut(&RunEvent<'_>),
{
    let pool = WorkerPool::new(plan.max_workers);
    let fail_fast = plan.failure_policy == FailurePolicy::FailFast;
    let mut runs = Vec::with_capacity(plan.bitrates_kbps.len());

    for &bitrate_kbps in &plan.bitrates_kbps {
        info!(codec = %plan.codec, bitrate_kbps, inputs = plan.inputs.len(), "bitrate started");
        on_event(&RunEvent::BitrateStarted {
            codec: plan.codec,
            bitrate_kbps,
        });

        let jobs = plan.jobs_for(bitrate_kbps);
        let mut results = Vec::with_capacity(jobs.len());
        let mut failures = Vec::new();

        let mut record = |outcome: Result<JobResult, JobError>,
                          on_event: &mut F|
         -> Result<(), JobError> {
            match outcome {
                Ok(result) => {
                    on_event(&RunEvent::JobFinished(&result));
                    results.push(result);
                    Ok(())
                }
                Err(err) if fail_fast => Err(err),
                Err(err) => {
                    warn!(error = %err, "job failed; continuing");
                    on_event(&RunEvent::JobFailed(&err));
                    failures.push(JobFailure::from(&err));
                    Ok(())
                }
            }
        };

        if pool.max_workers() <= 1 {
            for job in &jobs {
                record(run_job(ctx, job), &mut on_event)?;
            }
        } else {
            let outcomes = pool.run_ordered(
                &jobs,
                |job| run_job(ctx, job),
                |outcome| fail_fast && outcome.is_err(),
            );
            // Slots after a fail-fast error may be empty; the error is reached first
            for outcome in outcomes.into_iter().flatten() {
                record(outcome, &mut on_event)?;
            }
        }

        let run = BitrateRun {
            codec: plan.codec,
            bitrate_kbps,
            summary: summarize(&results),
            results,
            failures,
        };
        on_event(&RunEvent::BitrateFinished(&run));
        runs.push(run);
    }

    Ok(runs)
}
