// External tool invocation (ffmpeg / ffprobe)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::process::Command;

/// Binary names (or absolute paths) for the external tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Captured result of one finished tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human-readable exit status ("exit 1", "signal")
    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit {}", code),
            None => "terminated by signal".to_string(),
        }
    }

    /// Diagnostic text for error reports: stderr, or stdout when stderr is empty
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// stderr and stdout together, skipping whichever is empty
    pub fn combined(&self) -> String {
        [self.stderr.trim_end(), self.stdout.trim_end()]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs an external command to completion and captures its output.
///
/// The benchmark only ever talks to ffmpeg/ffprobe through this seam, so tests can swap in a
/// scripted implementation. Implementations block until the process exits; no timeout is applied.
pub trait CommandRunner: Sync {
    fn run(&self, cmd: &mut Command) -> io::Result<ToolOutput>;
}

/// Spawns real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &mut Command) -> io::Result<ToolOutput> {
        let output = cmd.output()?;
        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Program and arguments of a command as plain strings
pub fn command_args(cmd: &Command) -> Vec<String> {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect()
}

/// Render a command as a shell-quoted line (for logs and dry runs)
pub fn format_command(cmd: &Command) -> String {
    let parts = command_args(cmd);
    shlex::try_join(parts.iter().map(String::as_str)).unwrap_or_else(|_| parts.join(" "))
}

fn first_line_of_version(runner: &dyn CommandRunner, program: &str) -> Result<String> {
    let output = runner
        .run(Command::new(program).arg("-version"))
        .with_context(|| format!("Failed to execute {}. Is it installed and in PATH?", program))?;

    if !output.success() {
        anyhow::bail!("{} -version failed ({})", program, output.status_label());
    }

    Ok(output
        .stdout
        .lines()
        .next()
        .unwrap_or("Unknown version")
        .to_string())
}

/// Check that ffmpeg is available and return its version line
pub fn ffmpeg_version(runner: &dyn CommandRunner, tools: &ToolPaths) -> Result<String> {
    first_line_of_version(runner, &tools.ffmpeg)
}

/// Check that ffprobe is available and return its version line
pub fn ffprobe_version(runner: &dyn CommandRunner, tools: &ToolPaths) -> Result<String> {
    first_line_of_version(runner, &tools.ffprobe)
}

/// Check whether ffmpeg was built with the libvmaf filter
pub fn vmaf_filter_available(runner: &dyn CommandRunner, tools: &ToolPaths) -> bool {
    let mut cmd = Command::new(&tools.ffmpeg);
    cmd.args(["-hide_banner", "-filters"]);

    match runner.run(&mut cmd) {
        Ok(out) if out.success() => out.stdout.contains("libvmaf") || out.stderr.contains("libvmaf"),
        _ => false,
    }
}
