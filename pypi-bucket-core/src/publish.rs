//! High-level pipeline: build → upload → index.
//!
//! [`publish`] runs the three steps in order for one package and stops at the
//! first failure. Nothing is rolled back: artifacts uploaded before a failure stay
//! in the bucket, and the index is only regenerated when every upload succeeded.
//!
//! # Callable From
//! - The CLI crate, with a `CommandBuilder` and an S3-backed [`ObjectStore`].
//! - Tests, with mocks or an in-memory store.

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{PackageName, PublishConfig};
use crate::contract::{Builder, ObjectStore};
use crate::error::PublishError;
use crate::index::{self, IndexReport};
use crate::upload::{self, UploadedArtifact};

/// What a successful run did.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub bucket: String,
    pub package: PackageName,
    pub uploaded: Vec<UploadedArtifact>,
    pub index: IndexReport,
}

pub async fn publish<B, S>(
    config: &PublishConfig,
    builder: &B,
    store: &S,
) -> Result<PublishReport, PublishError>
where
    B: Builder + ?Sized,
    S: ObjectStore + ?Sized,
{
    info!(bucket = %config.bucket, package = %config.package, "[PUBLISH] Starting publish pipeline");

    // Step 1: Build
    let artifacts = match builder.build_distributions().await {
        Ok(artifacts) => {
            info!(count = artifacts.len(), "[PUBLISH] Build succeeded");
            artifacts
        }
        Err(e) => {
            error!(error = %e, "[PUBLISH][ERROR] Build step failed");
            return Err(e);
        }
    };

    // Step 2: Upload
    let uploaded = match upload::upload_distributions(
        store,
        &config.bucket,
        &config.package,
        &artifacts,
        config.upload.override_existing,
    )
    .await
    {
        Ok(uploaded) => {
            info!(count = uploaded.len(), "[PUBLISH] Upload succeeded");
            uploaded
        }
        Err(e) => {
            error!(error = %e, "[PUBLISH][ERROR] Upload step failed");
            return Err(e);
        }
    };

    // Step 3: Index
    let index = match index::publish_index(store, &config.bucket, &config.package).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "[PUBLISH][ERROR] Index step failed");
            return Err(e);
        }
    };

    let report = PublishReport {
        bucket: config.bucket.clone(),
        package: config.package.clone(),
        uploaded,
        index,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(json = %json, "[PUBLISH][DEBUG] Publish report as JSON"),
        Err(e) => error!(error = ?e, "[PUBLISH][DEBUG] Failed to serialize publish report as JSON"),
    }
    Ok(report)
}
