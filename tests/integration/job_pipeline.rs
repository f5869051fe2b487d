// Single job: stage order, resolution handling and failure reporting

use crate::common::{ScriptedRunner, Step, context};
use std::path::PathBuf;
use std::time::Duration;
use webrtc_vmaf::engine::{
    BenchError, CodecId, JobSpec, JobStage, Overrides, SnapshotOutcome, ToolOutput, run_job,
};

fn spec(input: &str, codec: CodecId, kbps: u32, overrides: Overrides) -> JobSpec {
    JobSpec::new(PathBuf::from(input), 0, codec, kbps, 30, overrides)
}

#[test]
fn test_stages_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, dir.path());

    run_job(&ctx, &spec("/clips/talk.mp4", CodecId::Vp9, 800, Overrides::default())).unwrap();

    assert_eq!(
        runner.steps(),
        [
            Step::Probe,
            Step::Encode,
            Step::Snapshot,
            Step::Vmaf,
            Step::Probe
        ]
    );
}

#[test]
fn test_result_uses_reprobed_bitrate_not_target() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new().with_score("talk.mp4", 91.25);
    let ctx = context(&runner, dir.path());

    let result =
        run_job(&ctx, &spec("/clips/talk.mp4", CodecId::H264, 800, Overrides::default())).unwrap();

    assert_eq!(result.score, 91.25);
    assert_eq!(result.achieved_bitrate_bps, 812_345);
    assert_eq!((result.width, result.height), (1280, 720));
    assert_eq!(
        result.encoded,
        dir.path().join("talk_h264_1280x720_800.mkv")
    );
    assert_eq!(
        result.snapshot,
        SnapshotOutcome::Captured(dir.path().join("talk_h264_1280x720_800.jpeg"))
    );
}

#[test]
fn test_overrides_reach_encode_and_vmaf() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, dir.path());
    let overrides = Overrides {
        width: Some(640),
        height: Some(360),
    };

    let result = run_job(&ctx, &spec("/clips/talk.mp4", CodecId::Av1, 500, overrides)).unwrap();
    assert_eq!((result.width, result.height), (640, 360));

    let calls = runner.calls();
    let encode = &calls[1];
    assert!(encode.contains(&"fps=30,scale=640x360:flags=bicubic,format=yuv420p".to_string()));
    // 640x360 is below one thread unit
    let threads = encode.iter().position(|a| a == "-threads").unwrap();
    assert_eq!(encode[threads + 1], "1");
    // av1 tiles switch on at 360 lines
    assert!(encode.windows(2).any(|w| w[0] == "-tile-columns" && w[1] == "3"));

    let vmaf = calls.iter().find(|c| c.contains(&"-filter_complex".to_string())).unwrap();
    let graph = vmaf.iter().find(|a| a.contains("libvmaf")).unwrap();
    assert_eq!(graph.matches("scale=640x360").count(), 2);
}

#[test]
fn test_only_overridden_dimension_changes() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, dir.path());
    let overrides = Overrides {
        width: Some(960),
        height: None,
    };

    let result = run_job(&ctx, &spec("/clips/talk.mp4", CodecId::Vp8, 500, overrides)).unwrap();
    assert_eq!((result.width, result.height), (960, 720));
}

#[test]
fn test_snapshot_failure_is_recorded_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScriptedRunner::new().with_score("talk.mp4", 88.0);
    runner.snapshot_fails = true;
    let ctx = context(&runner, dir.path());

    let result =
        run_job(&ctx, &spec("/clips/talk.mp4", CodecId::Vp8, 300, Overrides::default())).unwrap();

    assert_eq!(result.score, 88.0);
    assert_eq!(result.achieved_bitrate_bps, 812_345);
    match &result.snapshot {
        SnapshotOutcome::Failed(msg) => assert!(msg.contains("does not contain any stream")),
        other => panic!("expected failed snapshot, got {:?}", other),
    }
    assert_eq!(runner.steps().last(), Some(&Step::Probe));
}

#[test]
fn test_disabled_snapshot_skips_the_step() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let mut ctx = context(&runner, dir.path());
    ctx.snapshot = None;

    let result =
        run_job(&ctx, &spec("/clips/talk.mp4", CodecId::H265, 300, Overrides::default())).unwrap();

    assert_eq!(result.snapshot, SnapshotOutcome::Disabled);
    assert!(!runner.steps().contains(&Step::Snapshot));
}

#[test]
fn test_encode_failure_stops_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new().failing_encode("broken.mp4");
    let ctx = context(&runner, dir.path());

    let err = run_job(&ctx, &spec("/clips/broken.mp4", CodecId::H264, 300, Overrides::default()))
        .unwrap_err();

    assert_eq!(err.stage, JobStage::Encoding);
    match &err.source {
        BenchError::Encode { status, output, .. } => {
            assert_eq!(status, "exit 1");
            assert!(output.contains("Unknown encoder"));
        }
        other => panic!("expected encode error, got {:?}", other),
    }
    assert_eq!(runner.steps(), [Step::Probe, Step::Encode]);
}

#[test]
fn test_probe_failure_stops_before_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new().failing_probe("corrupt.mp4");
    let ctx = context(&runner, dir.path());

    let err = run_job(&ctx, &spec("/clips/corrupt.mp4", CodecId::Vp8, 300, Overrides::default()))
        .unwrap_err();

    assert_eq!(err.stage, JobStage::Probing);
    match &err.source {
        BenchError::Probe {
            path,
            status,
            output,
            ..
        } => {
            assert_eq!(path, &PathBuf::from("/clips/corrupt.mp4"));
            assert_eq!(status, "exit 1");
            assert!(output.contains("Invalid data found when processing input"));
        }
        other => panic!("expected probe error, got {:?}", other),
    }
    assert_eq!(runner.steps(), [Step::Probe]);
}

#[test]
fn test_missing_score_fails_scoring_without_reprobe() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new().with_vmaf_output(ToolOutput {
        code: Some(0),
        stdout: String::new(),
        stderr: "[libvmaf @ 0x55d0] model loaded\nframe=  300 fps= 52\n".to_string(),
    });
    let mut ctx = context(&runner, dir.path());
    ctx.snapshot = None;

    let err = run_job(&ctx, &spec("/clips/talk.mp4", CodecId::Vp9, 800, Overrides::default()))
        .unwrap_err();

    assert_eq!(err.stage, JobStage::Scoring);
    match &err.source {
        BenchError::ScoreParse { status, output } => {
            assert_eq!(status, &None);
            assert!(output.contains("model loaded"));
        }
        other => panic!("expected score parse error, got {:?}", other),
    }
    assert_eq!(runner.steps(), [Step::Probe, Step::Encode, Step::Vmaf]);
}

#[test]
fn test_failed_vmaf_run_reports_its_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new().with_vmaf_output(ToolOutput {
        code: Some(234),
        stdout: String::new(),
        stderr: "No such filter: 'libvmaf'".to_string(),
    });
    let ctx = context(&runner, dir.path());

    let err = run_job(&ctx, &spec("/clips/talk.mp4", CodecId::H264, 500, Overrides::default()))
        .unwrap_err();

    assert_eq!(err.stage, JobStage::Scoring);
    match &err.source {
        BenchError::ScoreParse { status, output } => {
            assert_eq!(status.as_deref(), Some("exit 234"));
            assert_eq!(output, "No such filter: 'libvmaf'");
        }
        other => panic!("expected score parse error, got {:?}", other),
    }
    assert_eq!(
        runner.steps(),
        [Step::Probe, Step::Encode, Step::Snapshot, Step::Vmaf]
    );
}

#[test]
fn test_throughput_from_timed_encode() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScriptedRunner::new();
    runner
        .encode_delays
        .insert("talk.mp4".to_string(), Duration::from_millis(50));
    let ctx = context(&runner, dir.path());

    let result =
        run_job(&ctx, &spec("/clips/talk.mp4", CodecId::Vp9, 800, Overrides::default())).unwrap();

    // 10 s of 30 fps source in at least 50 ms
    assert!(result.encode_secs >= 0.05);
    assert!(result.throughput_fps > 0.0);
    assert!(result.throughput_fps <= 300.0 / 0.05);
}
