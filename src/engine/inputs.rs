// Input list expansion: files pass through, directories become the videos beneath them

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions picked up when walking a directory
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "webm", "mov", "avi", "flv", "m4v", "wmv", "y4m", "ivf", "ts",
];

/// Check if a path has a video file extension
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Video files under `root`, sorted by path
pub fn scan_dir(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    // Symlinks are not followed
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && is_video_file(path) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Expand `inputs` in order. Explicit files are kept as given, whatever their extension.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.is_dir() {
            let found = scan_dir(input)?;
            if found.is_empty() {
                warn!(dir = %input.display(), "no video files found");
            }
            debug!(dir = %input.display(), count = found.len(), "expanded directory");
            expanded.extend(found);
        } else {
            expanded.push(input.clone());
        }
    }
    Ok(expanded)
}
