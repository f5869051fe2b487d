use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use webrtc_vmaf::config::RunOptions;

#[derive(Parser)]
#[command(name = "webrtc-vmaf", version)]
#[command(
    about = "Encode videos with libwebrtc-like settings and score them with VMAF",
    long_about = None
)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(flatten)]
    pub bench: BenchArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// What to benchmark
#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Source videos, or directories to search for them
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Codec profile (see `list-codecs`)
    #[arg(long)]
    pub codec: Option<String>,

    /// Output frame rate
    #[arg(long)]
    pub framerate: Option<u32>,

    /// Override the probed width
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Override the probed height
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// Target bitrate in kb/s; repeat for several
    #[arg(long = "bitrate", value_name = "KBPS", required = true)]
    pub bitrates: Vec<u32>,

    /// Directory for encoded files and snapshots
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Inputs to encode concurrently at each bitrate
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Report failed jobs and carry on instead of stopping
    #[arg(long)]
    pub keep_going: bool,

    /// Don't capture a snapshot frame of each encode
    #[arg(long)]
    pub no_snapshot: bool,

    /// Also write results as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

impl BenchArgs {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            codec: self.codec.clone(),
            framerate: self.framerate,
            width: self.width,
            height: self.height,
            work_dir: self.work_dir.clone(),
            max_workers: self.jobs,
            keep_going: self.keep_going,
            no_snapshot: self.no_snapshot,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that ffmpeg, ffprobe and the libvmaf filter are available
    CheckFfmpeg,

    /// Probe a video file and print what the benchmark would use
    Probe {
        /// Path to the video file
        file: PathBuf,

        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        width: Option<u32>,

        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        height: Option<u32>,
    },

    /// List the codec profiles and their encoder flags
    ListCodecs,

    /// Show the ffmpeg/ffprobe commands of a benchmark without encoding anything
    DryRun {
        #[command(flatten)]
        bench: BenchArgs,
    },

    /// Show config status and location, or create default config if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
