//! Error types shared across the publishing pipeline.

use std::path::PathBuf;

/// Boxed error from a storage client, kept as the source of a [`StorageError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed object-storage call.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed for {bucket}/{key}")]
pub struct StorageError {
    /// Storage operation name, e.g. `PutObject`.
    pub operation: &'static str,
    pub bucket: String,
    /// Object key, or the listing prefix for list calls.
    pub key: String,
    #[source]
    pub source: BoxError,
}

impl StorageError {
    pub fn new(
        operation: &'static str,
        bucket: impl Into<String>,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            operation,
            bucket: bucket.into(),
            key: key.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("build command `{command}` failed: {reason}")]
    BuildFailure { command: String, reason: String },

    #[error("build finished but produced no new artifacts in {}", .dist_dir.display())]
    NoArtifacts { dist_dir: PathBuf },

    #[error("artifact path {} has no usable file name", .path.display())]
    InvalidArtifact { path: PathBuf },

    #[error("package already exists at {key}")]
    PackageExists { key: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            path: path.into(),
            source,
        }
    }
}
