// Config file handling and the command plan shown by dry runs

use crate::common::{ScriptedRunner, Step};
use std::fs;
use std::path::PathBuf;
use webrtc_vmaf::config::{Config, RunOptions};
use webrtc_vmaf::engine::{FailurePolicy, JobSpec, planned_commands, tools::command_args};

#[test]
fn test_config_file_drives_the_plan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[defaults]
codec = "h265"
framerate = 24
snapshot = false
max_workers = 2
failure_policy = "isolate"
work_dir = "/scratch/vmaf"

[tools]
ffprobe = "/opt/ff/ffprobe"
"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    let opts = RunOptions::default();
    let plan = config
        .plan(vec![PathBuf::from("a.mp4")], vec![1000], &opts)
        .unwrap();

    assert_eq!(plan.codec.as_str(), "h265");
    assert_eq!(plan.framerate, 24);
    assert_eq!(plan.max_workers, 2);
    assert_eq!(plan.failure_policy, FailurePolicy::Isolate);

    let runner = ScriptedRunner::new();
    let ctx = config.context(&runner, &plan, &opts);
    assert!(ctx.snapshot.is_none());
    assert_eq!(ctx.work_dir, PathBuf::from("/scratch/vmaf"));
    assert_eq!(ctx.tools.ffprobe, "/opt/ff/ffprobe");
    assert_eq!(ctx.tools.ffmpeg, "ffmpeg");
}

#[test]
fn test_command_line_beats_config_file() {
    let mut config = Config::default();
    config.defaults.framerate = 24;
    config.defaults.max_workers = 4;

    let opts = RunOptions {
        framerate: Some(60),
        max_workers: Some(0),
        ..Default::default()
    };
    let plan = config.plan(vec![], vec![300], &opts).unwrap();

    assert_eq!(plan.framerate, 60);
    // Zero workers still means one
    assert_eq!(plan.max_workers, 1);
}

#[test]
fn test_dry_run_probes_once_and_lists_every_step() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let mut ctx = webrtc_vmaf::engine::BenchContext::new(&runner);
    ctx.work_dir = dir.path().to_path_buf();
    let spec = JobSpec::new(
        PathBuf::from("/clips/talk.mp4"),
        0,
        "vp9".parse().unwrap(),
        800,
        30,
        Default::default(),
    );

    let cmds = planned_commands(&ctx, &spec).unwrap();

    assert_eq!(runner.steps(), [Step::Probe]);
    let steps: Vec<Step> = cmds
        .iter()
        .map(|c| crate::common::classify(&command_args(c)))
        .collect();
    assert_eq!(
        steps,
        [
            Step::Probe,
            Step::Encode,
            Step::Snapshot,
            Step::Vmaf,
            Step::Probe
        ]
    );
    let reprobe = command_args(&cmds[4]);
    assert_eq!(
        reprobe.last().map(String::as_str),
        Some(dir.path().join("talk_vp9_1280x720_800.mkv").to_str().unwrap())
    );
}
