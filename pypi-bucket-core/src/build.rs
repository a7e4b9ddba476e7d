//! Runs the package build and works out which files in the output directory it produced.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::{ArtifactSelection, BuildConfig};
use crate::contract::Builder;
use crate::error::PublishError;

/// Number of artifacts a `bdist_wheel sdist` build leaves behind.
const LATEST_ARTIFACT_COUNT: usize = 2;

/// A regular file in the output directory, as seen at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistFile {
    pub path: PathBuf,
    /// Creation time, or modification time where the filesystem does not record one.
    pub created: SystemTime,
    pub modified: SystemTime,
    /// Size in bytes.
    pub len: u64,
}

/// Builds distributions by running an external command in the package directory.
pub struct CommandBuilder {
    config: BuildConfig,
    package_dir: PathBuf,
}

impl CommandBuilder {
    pub fn new(config: BuildConfig, package_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            package_dir: package_dir.into(),
        }
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.package_dir.join(&self.config.dist_dir)
    }

    fn command_line(&self) -> String {
        self.config.command.join(" ")
    }

    async fn run_command(&self) -> Result<(), PublishError> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| PublishError::BuildFailure {
                command: String::new(),
                reason: "no build command configured".to_string(),
            })?;

        info!(
            command = %self.command_line(),
            dir = %self.package_dir.display(),
            "Running build command"
        );
        let status = Command::new(program)
            .args(args)
            .current_dir(&self.package_dir)
            .status()
            .await;

        match status {
            Ok(s) if s.success() => {
                info!(command = %self.command_line(), status = ?s, "Build command succeeded");
                Ok(())
            }
            Ok(s) => {
                error!(command = %self.command_line(), status = ?s, "Build command exited with non-zero code");
                Err(PublishError::BuildFailure {
                    command: self.command_line(),
                    reason: format!("exited with {s}"),
                })
            }
            Err(e) => {
                error!(command = %self.command_line(), error = ?e, "Failed to launch build command");
                Err(PublishError::BuildFailure {
                    command: self.command_line(),
                    reason: format!("could not be launched: {e}"),
                })
            }
        }
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn build_distributions(&self) -> Result<Vec<PathBuf>, PublishError> {
        let dist_dir = self.dist_dir();
        let before = snapshot(&dist_dir)?;
        debug!(dist_dir = %dist_dir.display(), files = before.len(), "Output directory before build");

        self.run_command().await?;

        let after = snapshot(&dist_dir)?;
        let artifacts = match self.config.selection {
            ArtifactSelection::New => {
                let fresh = new_since(&before, after);
                if fresh.is_empty() {
                    error!(dist_dir = %dist_dir.display(), "Build produced no artifacts");
                    return Err(PublishError::NoArtifacts { dist_dir });
                }
                fresh
            }
            ArtifactSelection::Latest => {
                let latest = latest_by_creation(after, LATEST_ARTIFACT_COUNT);
                if latest.is_empty() {
                    warn!(dist_dir = %dist_dir.display(), "No artifacts found in output directory");
                }
                latest
            }
        };

        for artifact in &artifacts {
            info!(artifact = %artifact.display(), "Found build artifact");
        }
        Ok(artifacts)
    }
}

/// Lists the regular files directly inside `dir`. A missing directory is empty.
pub fn snapshot(dir: &Path) -> Result<Vec<DistFile>, PublishError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PublishError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PublishError::io(dir, e))?;
        let path = entry.path();
        let metadata = entry.metadata().map_err(|e| PublishError::io(&path, e))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().map_err(|e| PublishError::io(&path, e))?;
        let created = metadata.created().unwrap_or(modified);
        files.push(DistFile {
            path,
            created,
            modified,
            len: metadata.len(),
        });
    }
    Ok(files)
}

/// Files in `after` that were absent from `before` or have been rewritten since, oldest first.
///
/// A rewrite is a change of modification time or of size; either alone is enough.
pub fn new_since(before: &[DistFile], after: Vec<DistFile>) -> Vec<PathBuf> {
    let mut fresh: Vec<DistFile> = after
        .into_iter()
        .filter(|file| {
            !before
                .iter()
                .any(|old| old.path == file.path && old.modified == file.modified && old.len == file.len)
        })
        .collect();
    sort_by_creation(&mut fresh);
    fresh.into_iter().map(|f| f.path).collect()
}

/// The `count` most recently created files, oldest first. Fewer files than `count` returns them all.
pub fn latest_by_creation(mut files: Vec<DistFile>, count: usize) -> Vec<PathBuf> {
    sort_by_creation(&mut files);
    let skip = files.len().saturating_sub(count);
    files.into_iter().skip(skip).map(|f| f.path).collect()
}

fn sort_by_creation(files: &mut [DistFile]) {
    files.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)));
}
