use crate::cli::{BenchArgs, Cli, Commands};
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use tracing::info;
use webrtc_vmaf::config::Config;
use webrtc_vmaf::engine::{
    self, BenchPlan, CommandRunner, Overrides, PROFILES, SystemRunner, tools,
};
use webrtc_vmaf::report;

pub fn run(cli: Cli, config: Config) -> Result<()> {
    let runner = SystemRunner;

    match cli.command {
        Some(Commands::CheckFfmpeg) => handle_check_ffmpeg(&runner, &config),
        Some(Commands::Probe {
            file,
            width,
            height,
        }) => handle_probe(&runner, &config, file, Overrides { width, height }),
        Some(Commands::ListCodecs) => {
            handle_list_codecs();
            Ok(())
        }
        Some(Commands::DryRun { bench }) => handle_dry_run(&runner, &config, &bench),
        Some(Commands::InitConfig) => handle_init_config(),
        None => handle_benchmark(&runner, &config, &cli.bench),
    }
}

fn build_plan(config: &Config, args: &BenchArgs) -> Result<BenchPlan> {
    let inputs = engine::expand_inputs(&args.inputs)?;
    if inputs.is_empty() {
        bail!("no input videos found");
    }
    Ok(config.plan(inputs, args.bitrates.clone(), &args.run_options())?)
}

fn handle_benchmark(runner: &dyn CommandRunner, config: &Config, args: &BenchArgs) -> Result<()> {
    let plan = build_plan(config, args)?;
    let opts = args.run_options();
    let ctx = config.context(runner, &plan, &opts);

    ctx.ensure_work_dir().with_context(|| {
        format!("Failed to create work directory: {}", ctx.work_dir.display())
    })?;
    info!(
        inputs = plan.inputs.len(),
        bitrates = plan.bitrates_kbps.len(),
        workers = plan.max_workers,
        "starting benchmark"
    );

    let runs = engine::run_benchmark(&ctx, &plan, report::print_event)?;

    if let Some(path) = &args.json {
        report::write_json_report(path, &runs)?;
        info!(path = %path.display(), "wrote JSON report");
    }

    let failed: usize = runs.iter().map(|r| r.failures.len()).sum();
    if failed > 0 {
        bail!("{} job(s) failed", failed);
    }
    Ok(())
}

fn handle_dry_run(runner: &dyn CommandRunner, config: &Config, args: &BenchArgs) -> Result<()> {
    let plan = build_plan(config, args)?;
    let opts = args.run_options();
    let ctx = config.context(runner, &plan, &opts);

    println!(
        "Dry run: {} input(s) x {} bitrate(s) with {}",
        plan.inputs.len(),
        plan.bitrates_kbps.len(),
        plan.codec
    );
    for &kbps in &plan.bitrates_kbps {
        for job in plan.jobs_for(kbps) {
            println!("# {} @ {} kb/s", job.display_name(), kbps);
            for cmd in engine::planned_commands(&ctx, &job)? {
                println!("{}", tools::format_command(&cmd));
            }
        }
    }
    Ok(())
}

fn handle_check_ffmpeg(runner: &dyn CommandRunner, config: &Config) -> Result<()> {
    let version = tools::ffmpeg_version(runner, &config.tools)?;
    println!("ffmpeg found: {}", version);

    let probe_version = tools::ffprobe_version(runner, &config.tools)?;
    println!("ffprobe found: {}", probe_version);

    if !tools::vmaf_filter_available(runner, &config.tools) {
        bail!(
            "{} was built without the libvmaf filter; VMAF scores cannot be computed",
            config.tools.ffmpeg
        );
    }
    println!("libvmaf filter: available");
    Ok(())
}

fn handle_probe(
    runner: &dyn CommandRunner,
    config: &Config,
    file: PathBuf,
    overrides: Overrides,
) -> Result<()> {
    let mut ctx = engine::BenchContext::new(runner);
    ctx.tools = config.tools.clone();

    let info = engine::probe_media(&ctx, &file, overrides)?;
    println!("File: {}", file.display());
    println!("Resolution: {}x{}", info.width, info.height);
    println!("Duration: {:.2} seconds", info.duration_s);
    println!("Bitrate: {}kb/s", report::format_kbps(info.bitrate_bps as f64));
    match info.frame_rate {
        Some(fps) => println!("Frame rate: {:.3}", fps),
        None => println!("Frame rate: unknown"),
    }
    println!(
        "Encoder threads: {}",
        engine::thread_hint(info.width, info.height)
    );
    Ok(())
}

fn handle_list_codecs() {
    for profile in PROFILES.iter() {
        println!("{:<18} {:<12} {}", profile.name, profile.encoder, profile.description);
        let params: Vec<String> = profile
            .params
            .iter()
            .map(|p| format!("{} {}", p.flag, p.value))
            .collect();
        println!("    {}", params.join(" "));
        if let Some(gated) = &profile.gated {
            let extra: Vec<String> = gated
                .params
                .iter()
                .map(|p| format!("{} {}", p.flag, p.value))
                .collect();
            println!("    when {}: {}", gated.condition, extra.join(" "));
        }
    }
}

fn handle_init_config() -> Result<()> {
    let path = Config::config_path()?;
    if Config::exists() {
        let cfg = Config::load_from(&path)?;
        println!("Config loaded successfully from {}", path.display());
        println!("{:#?}", cfg);
    } else {
        Config::ensure_default()?;
        println!("Default config saved to {}", path.display());
    }
    Ok(())
}
