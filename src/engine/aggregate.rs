// Per-bitrate aggregation of job results

use serde::{Deserialize, Serialize};

use super::job::JobResult;

/// Means across every input benchmarked at one bitrate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitrateAggregate {
    pub inputs: usize,
    pub mean_score: f64,
    pub mean_throughput_fps: f64,
    pub mean_achieved_bitrate_bps: f64,
}

impl BitrateAggregate {
    /// Mean throughput rounded down, as reported
    pub fn floored_throughput(&self) -> u64 {
        self.mean_throughput_fps.floor() as u64
    }
}

/// Running sums; nothing is visible until [`ScoreAccumulator::finish`]
#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    count: usize,
    score_sum: f64,
    throughput_sum: f64,
    bitrate_sum: f64,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: &JobResult) {
        self.count += 1;
        self.score_sum += result.score;
        self.throughput_sum += result.throughput_fps;
        self.bitrate_sum += result.achieved_bitrate_bps as f64;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Arithmetic means, or `None` if nothing was pushed
    pub fn finish(self) -> Option<BitrateAggregate> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(BitrateAggregate {
            inputs: self.count,
            mean_score: self.score_sum / n,
            mean_throughput_fps: self.throughput_sum / n,
            mean_achieved_bitrate_bps: self.bitrate_sum / n,
        })
    }
}

impl<'a> Extend<&'a JobResult> for ScoreAccumulator {
    fn extend<I: IntoIterator<Item = &'a JobResult>>(&mut self, iter: I) {
        for result in iter {
            self.push(result);
        }
    }
}

/// Means of score, throughput and achieved bitrate; `None` for an empty slice
pub fn aggregate(results: &[JobResult]) -> Option<BitrateAggregate> {
    let mut acc = ScoreAccumulator::new();
    acc.extend(results);
    acc.finish()
}

/// What gets reported for one bitrate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BitrateSummary {
    /// No job succeeded; nothing to report
    Empty,
    /// Exactly one input: its own numbers, not a mean of one
    Single { result: Box<JobResult> },
    Averaged { aggregate: BitrateAggregate },
}

pub fn summarize(results: &[JobResult]) -> BitrateSummary {
    match results {
        [] => BitrateSummary::Empty,
        [only] => BitrateSummary::Single {
            result: Box::new(only.clone()),
        },
        _ => match aggregate(results) {
            Some(aggregate) => BitrateSummary::Averaged { aggregate },
            None => BitrateSummary::Empty,
        },
    }
}
