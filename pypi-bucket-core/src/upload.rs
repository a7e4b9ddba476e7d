//! Uploads distribution artifacts into the package prefix of a bucket.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::checksum;
use crate::config::PackageName;
use crate::contract::{ObjectMetadata, ObjectStore, PutObjectRequest};
use crate::error::PublishError;

/// Metadata entry holding the base64 MD5 of an uploaded artifact.
pub const MD5_METADATA_KEY: &str = "md5";

/// An artifact that landed in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedArtifact {
    pub path: PathBuf,
    pub key: String,
    /// Base64 MD5 sent as `Content-MD5` and stored as `md5` metadata.
    pub md5: String,
    pub size: usize,
}

/// Base file name of an artifact, used as the last segment of its key.
pub fn artifact_file_name(path: &Path) -> Result<&str, PublishError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PublishError::InvalidArtifact {
            path: path.to_path_buf(),
        })
}

/// Uploads `artifacts` in order to `<package>/<file name>`.
///
/// With `override_existing` off, each key is checked first and the call stops
/// with [`PublishError::PackageExists`] at the first key already present.
/// Artifacts uploaded before that point stay in the bucket.
#[instrument(skip_all, fields(%bucket, %package, count = artifacts.len()))]
pub async fn upload_distributions<S>(
    store: &S,
    bucket: &str,
    package: &PackageName,
    artifacts: &[PathBuf],
    override_existing: bool,
) -> Result<Vec<UploadedArtifact>, PublishError>
where
    S: ObjectStore + ?Sized,
{
    let mut uploaded = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let key = package.key(artifact_file_name(artifact)?);

        if !override_existing {
            if store.head_object(bucket, &key).await?.is_some() {
                error!(%key, "[UPLOAD] Artifact already exists and override is disabled");
                return Err(PublishError::PackageExists { key });
            }
            info!(%key, "[UPLOAD] Key is free");
        }

        let body = tokio::fs::read(artifact)
            .await
            .map_err(|e| PublishError::io(artifact, e))?;
        let md5 = checksum::digest_bytes(&body);
        let size = body.len();

        let mut metadata = ObjectMetadata::new();
        metadata.insert(MD5_METADATA_KEY.to_string(), md5.clone());

        store
            .put_object(PutObjectRequest {
                bucket: bucket.to_string(),
                key: key.clone(),
                body,
                content_md5: Some(md5.clone()),
                content_type: None,
                metadata,
            })
            .await?;
        info!(%key, size, %md5, "[UPLOAD] Uploaded artifact");

        uploaded.push(UploadedArtifact {
            path: artifact.clone(),
            key,
            md5,
            size,
        });
    }

    Ok(uploaded)
}
