// Whole runs: ordering, failure policy and aggregation

use crate::common::{ScriptedRunner, Step, context, file_name};
use std::path::PathBuf;
use std::time::Duration;
use webrtc_vmaf::engine::{
    ArtifactNaming, BenchError, BenchPlan, BitrateSummary, FailurePolicy, JobStage, RunEvent,
    run_benchmark,
};

fn plan(inputs: &[&str], codec: &str, bitrates: &[u32]) -> BenchPlan {
    BenchPlan::new(
        inputs.iter().map(PathBuf::from).collect(),
        codec,
        30,
        bitrates.to_vec(),
    )
    .unwrap()
}

/// Report lines in the order the driver emitted them, in a compact form
fn event_log(event: &RunEvent<'_>) -> String {
    match event {
        RunEvent::BitrateStarted { bitrate_kbps, .. } => format!("start {}", bitrate_kbps),
        RunEvent::JobFinished(r) => format!("ok {}", r.display_name()),
        RunEvent::JobFailed(e) => format!("fail {}", file_name(&e.input.to_string_lossy())),
        RunEvent::BitrateFinished(run) => format!("end {}", run.bitrate_kbps),
    }
}

#[test]
fn test_two_inputs_are_averaged() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new()
        .with_score("a.mp4", 90.0)
        .with_score("b.mp4", 80.0);
    let ctx = context(&runner, dir.path());

    let runs = run_benchmark(&ctx, &plan(&["a.mp4", "b.mp4"], "vp9", &[800]), |_| {}).unwrap();

    assert_eq!(runs.len(), 1);
    match &runs[0].summary {
        BitrateSummary::Averaged { aggregate } => {
            assert_eq!(aggregate.inputs, 2);
            assert_eq!(aggregate.mean_score, 85.0);
            assert_eq!(aggregate.mean_achieved_bitrate_bps, 812_345.0);
        }
        other => panic!("expected averaged summary, got {:?}", other),
    }
}

#[test]
fn test_single_input_reported_directly() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new().with_score("solo.mp4", 77.125);
    let ctx = context(&runner, dir.path());

    let runs = run_benchmark(&ctx, &plan(&["solo.mp4"], "h264", &[500]), |_| {}).unwrap();

    match &runs[0].summary {
        BitrateSummary::Single { result } => assert_eq!(result.score, 77.125),
        other => panic!("expected single summary, got {:?}", other),
    }
}

#[test]
fn test_bitrates_then_inputs_in_caller_order() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, dir.path());
    let mut log = Vec::new();

    run_benchmark(
        &ctx,
        &plan(&["b.mp4", "a.mp4"], "vp8", &[900, 300]),
        |e| log.push(event_log(e)),
    )
    .unwrap();

    assert_eq!(
        log,
        [
            "start 900", "ok b.mp4", "ok a.mp4", "end 900", "start 300", "ok b.mp4", "ok a.mp4",
            "end 300"
        ]
    );
}

#[test]
fn test_unsupported_codec_runs_nothing() {
    let runner = ScriptedRunner::new();
    let err = BenchPlan::new(vec![PathBuf::from("a.mp4")], "mpeg2", 30, vec![500]).unwrap_err();

    match err {
        BenchError::UnsupportedCodec { requested, valid } => {
            assert_eq!(requested, "mpeg2");
            assert_eq!(
                valid,
                ["h264", "h264_zerolatency", "h265", "vp8", "vp9", "av1"]
            );
        }
        other => panic!("expected unsupported codec, got {:?}", other),
    }
    assert!(runner.calls().is_empty());
}

#[test]
fn test_fail_fast_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new().failing_encode("b.mp4");
    let ctx = context(&runner, dir.path());
    let mut log = Vec::new();

    let err = run_benchmark(
        &ctx,
        &plan(&["a.mp4", "b.mp4", "c.mp4"], "h264", &[500, 1000]),
        |e| log.push(event_log(e)),
    )
    .unwrap_err();

    assert_eq!(err.stage, JobStage::Encoding);
    assert_eq!(err.bitrate_kbps, 500);
    assert_eq!(log, ["start 500", "ok a.mp4"]);
    // c.mp4 never started
    assert!(
        !runner
            .calls()
            .iter()
            .any(|c| c.iter().any(|a| a.ends_with("c.mp4")))
    );
}

#[test]
fn test_isolate_keeps_going_and_excludes_failures() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new()
        .failing_encode("b.mp4")
        .with_score("a.mp4", 90.0)
        .with_score("c.mp4", 70.0);
    let ctx = context(&runner, dir.path());
    let mut plan = plan(&["a.mp4", "b.mp4", "c.mp4"], "h264", &[500]);
    plan.failure_policy = FailurePolicy::Isolate;
    let mut log = Vec::new();

    let runs = run_benchmark(&ctx, &plan, |e| log.push(event_log(e))).unwrap();

    assert_eq!(
        log,
        ["start 500", "ok a.mp4", "fail b.mp4", "ok c.mp4", "end 500"]
    );
    let run = &runs[0];
    assert_eq!(run.results.len(), 2);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].stage, JobStage::Encoding);
    match &run.summary {
        BitrateSummary::Averaged { aggregate } => assert_eq!(aggregate.mean_score, 80.0),
        other => panic!("expected averaged summary, got {:?}", other),
    }
}

#[test]
fn test_isolate_with_every_job_failing_reports_no_summary() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new().failing_encode("a.mp4");
    let ctx = context(&runner, dir.path());
    let mut plan = plan(&["a.mp4"], "vp9", &[500]);
    plan.failure_policy = FailurePolicy::Isolate;

    let runs = run_benchmark(&ctx, &plan, |_| {}).unwrap();
    assert_eq!(runs[0].summary, BitrateSummary::Empty);
}

#[test]
fn test_parallel_results_reported_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScriptedRunner::new();
    // The first input is the slowest, so completion order is reversed
    runner
        .encode_delays
        .insert("a.mp4".to_string(), Duration::from_millis(120));
    runner
        .encode_delays
        .insert("b.mp4".to_string(), Duration::from_millis(60));
    let mut plan = plan(&["a.mp4", "b.mp4", "c.mp4"], "vp9", &[800]);
    plan.max_workers = 3;
    let mut ctx = context(&runner, dir.path());
    ctx.naming = plan.naming();
    let mut log = Vec::new();

    let runs = run_benchmark(&ctx, &plan, |e| log.push(event_log(e))).unwrap();

    assert_eq!(
        log,
        ["start 800", "ok a.mp4", "ok b.mp4", "ok c.mp4", "end 800"]
    );
    let names: Vec<_> = runs[0].results.iter().map(|r| r.display_name()).collect();
    assert_eq!(names, ["a.mp4", "b.mp4", "c.mp4"]);
}

#[test]
fn test_parallel_artifacts_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let mut plan = plan(&["/x/clip.mp4", "/y/clip.mp4"], "h264", &[500]);
    plan.max_workers = 2;
    let mut ctx = context(&runner, dir.path());
    ctx.naming = plan.naming();
    assert_eq!(ctx.naming, ArtifactNaming::PerInput);

    let runs = run_benchmark(&ctx, &plan, |_| {}).unwrap();

    let outputs: Vec<_> = runs[0].results.iter().map(|r| r.encoded.clone()).collect();
    assert_eq!(
        outputs,
        [
            dir.path().join("clip_h264_1280x720_500_i0.mkv"),
            dir.path().join("clip_h264_1280x720_500_i1.mkv")
        ]
    );
}

#[test]
fn test_parallel_fail_fast_returns_first_failure_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new()
        .failing_encode("b.mp4")
        .failing_encode("c.mp4");
    let mut plan = plan(&["a.mp4", "b.mp4", "c.mp4"], "vp9", &[800]);
    plan.max_workers = 3;
    let ctx = context(&runner, dir.path());

    let err = run_benchmark(&ctx, &plan, |_| {}).unwrap_err();
    assert_eq!(err.input, PathBuf::from("b.mp4"));
}

#[test]
fn test_rerun_reuses_artifact_names() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, dir.path());
    let plan = plan(&["talk.mp4"], "av1", &[400]);

    let first = run_benchmark(&ctx, &plan, |_| {}).unwrap();
    let second = run_benchmark(&ctx, &plan, |_| {}).unwrap();

    assert_eq!(first[0].results[0].encoded, second[0].results[0].encoded);
    let encodes = runner
        .steps()
        .iter()
        .filter(|s| **s == Step::Encode)
        .count();
    assert_eq!(encodes, 2);
}
