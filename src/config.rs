// Persisted defaults for benchmark runs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{
    BenchContext, BenchError, BenchPlan, CommandRunner, DEFAULT_WORK_DIR, FailurePolicy, Overrides,
    SnapshotSettings, ToolPaths,
};

const APP_DIR: &str = "webrtc-vmaf";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Codec used when `--codec` is not given
    #[serde(default = "default_codec")]
    pub codec: String,

    #[serde(default = "default_framerate")]
    pub framerate: u32,

    /// Directory for encoded artifacts and snapshots
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    #[serde(default = "default_true_config")]
    pub snapshot: bool,

    /// Position of the snapshot frame in the encoded file
    #[serde(default = "default_snapshot_offset")]
    pub snapshot_offset_secs: f64,

    #[serde(default = "default_vmaf_threads")]
    pub vmaf_threads: u32,

    /// Concurrent jobs per bitrate
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// tracing level when no `-v` is given (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_codec() -> String {
    "h264".to_string()
}

fn default_framerate() -> u32 {
    30
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORK_DIR)
}

fn default_true_config() -> bool {
    true
}

fn default_snapshot_offset() -> f64 {
    5.0
}

fn default_vmaf_threads() -> u32 {
    8
}

fn default_max_workers() -> usize {
    1
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            framerate: default_framerate(),
            work_dir: default_work_dir(),
            snapshot: true,
            snapshot_offset_secs: default_snapshot_offset(),
            vmaf_threads: default_vmaf_threads(),
            max_workers: default_max_workers(),
            failure_policy: FailurePolicy::FailFast,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join(APP_DIR)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join(APP_DIR)
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk, or the built-in defaults when there is no file yet
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Check if config file exists
    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Create a default config file if it doesn't exist
    pub fn ensure_default() -> Result<()> {
        if !Self::exists() {
            Config::default().save()?;
        }
        Ok(())
    }
}

/// Values given on the command line; `None` falls back to the config file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub codec: Option<String>,
    pub framerate: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub work_dir: Option<PathBuf>,
    pub max_workers: Option<usize>,
    pub keep_going: bool,
    pub no_snapshot: bool,
}

impl Config {
    /// Benchmark plan with command line values taking precedence over the file
    pub fn plan(
        &self,
        inputs: Vec<PathBuf>,
        bitrates_kbps: Vec<u32>,
        opts: &RunOptions,
    ) -> Result<BenchPlan, BenchError> {
        let codec = opts.codec.as_deref().unwrap_or(&self.defaults.codec);
        let framerate = opts.framerate.unwrap_or(self.defaults.framerate);

        let mut plan = BenchPlan::new(inputs, codec, framerate, bitrates_kbps)?;
        plan.overrides = Overrides {
            width: opts.width,
            height: opts.height,
        };
        plan.max_workers = opts.max_workers.unwrap_or(self.defaults.max_workers).max(1);
        plan.failure_policy = if opts.keep_going {
            FailurePolicy::Isolate
        } else {
            self.defaults.failure_policy
        };
        Ok(plan)
    }

    /// Execution context for `plan`
    pub fn context<'a>(
        &self,
        runner: &'a dyn CommandRunner,
        plan: &BenchPlan,
        opts: &RunOptions,
    ) -> BenchContext<'a> {
        let mut ctx = BenchContext::new(runner);
        ctx.tools = self.tools.clone();
        ctx.work_dir = opts
            .work_dir
            .clone()
            .unwrap_or_else(|| self.defaults.work_dir.clone());
        ctx.vmaf_threads = self.defaults.vmaf_threads.max(1);
        ctx.snapshot = (self.defaults.snapshot && !opts.no_snapshot).then_some(SnapshotSettings {
            offset_secs: self.defaults.snapshot_offset_secs,
        });
        ctx.naming = plan.naming();
        ctx
    }
}
