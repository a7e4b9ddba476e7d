use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the package being published; also the key prefix in the bucket.
///
/// Derived once from the package directory and passed to every step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The package name is the base name of its directory.
    pub fn from_dir(dir: &Path) -> Option<Self> {
        dir.file_name()
            .and_then(|n| n.to_str())
            .map(|n| Self(n.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<name>/`
    pub fn prefix(&self) -> String {
        format!("{}/", self.0)
    }

    /// `<name>/<file_name>`
    pub fn key(&self, file_name: &str) -> String {
        format!("{}/{}", self.0, file_name)
    }

    /// `<name>/index.html`
    pub fn index_key(&self) -> String {
        self.key(INDEX_FILE_NAME)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const INDEX_FILE_NAME: &str = "index.html";

/// How the artifacts of the current build are picked out of the output directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSelection {
    /// Files created or rewritten by the build.
    #[default]
    New,
    /// The two most recently created files, regardless of what the build did.
    Latest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Program and arguments; the first element is looked up on `PATH`.
    pub command: Vec<String>,
    /// Output directory, relative to the package directory.
    pub dist_dir: PathBuf,
    pub selection: ArtifactSelection,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: ["python", "setup.py", "bdist_wheel", "sdist"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dist_dir: PathBuf::from("dist"),
            selection: ArtifactSelection::New,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Overwrite artifacts already present in the bucket.
    #[serde(rename = "override")]
    pub override_existing: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            override_existing: true,
        }
    }
}

/// Everything a single publish run needs.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub bucket: String,
    pub package: PackageName,
    /// Directory the build runs in.
    pub package_dir: PathBuf,
    pub build: BuildConfig,
    pub upload: UploadConfig,
}

impl PublishConfig {
    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.bucket,
            package = %self.package,
            package_dir = %self.package_dir.display(),
            override_existing = self.upload.override_existing,
            "Loaded publish config"
        );
        debug!(?self, "Publish config loaded (full debug)");
    }
}
