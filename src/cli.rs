//! # pypi-bucket CLI Interface (Module)
//!
//! CLI glue only: argument parsing, wiring the real build command and S3 client
//! into the core pipeline, and logging the outcome. All publishing logic lives in
//! `pypi-bucket-core`.
//!
//! - For command-line users: run `pypi-bucket <BUCKET>` from the package directory.
//! - For programmatic/integration use: call [`run_in`] with a constructed [`Cli`].

use crate::load_config::load_config;
use crate::storage::S3Store;
use anyhow::{Context, Result};
use clap::Parser;
use pypi_bucket_core::build::CommandBuilder;
use pypi_bucket_core::config::{PackageName, PublishConfig};
use pypi_bucket_core::publish::publish;
use std::path::Path;

/// CLI for pypi-bucket: build a Python package and publish it to an S3-hosted package index.
#[derive(Parser, Debug)]
#[clap(
    name = "pypi-bucket",
    version,
    about = "Build the Python package in the current directory, upload its distributions to a bucket and refresh the package index"
)]
pub struct Cli {
    /// Name of the bucket serving the package index
    pub bucket: String,
}

/// Runs the CLI against the current working directory.
pub async fn run(cli: Cli) -> Result<()> {
    let package_dir =
        std::env::current_dir().context("Failed to determine the current working directory")?;
    run_in(cli, &package_dir).await
}

/// Runs the CLI against `package_dir`, whose base name is the package name.
pub async fn run_in(cli: Cli, package_dir: &Path) -> Result<()> {
    let package_dir = package_dir
        .canonicalize()
        .with_context(|| format!("Package directory {} is not accessible", package_dir.display()))?;
    let package = PackageName::from_dir(&package_dir).with_context(|| {
        format!(
            "Cannot derive a package name from {}",
            package_dir.display()
        )
    })?;

    let config = load_config(&package_dir)?;
    let publish_config = PublishConfig {
        bucket: cli.bucket,
        package,
        package_dir: package_dir.clone(),
        build: config.build.clone(),
        upload: config.upload.clone(),
    };
    publish_config.trace_loaded();

    let builder = CommandBuilder::new(config.build, &package_dir);
    let store = S3Store::from_settings(&config.storage).await;

    match publish(&publish_config, &builder, &store).await {
        Ok(report) => {
            tracing::info!(
                command = "publish",
                bucket = %report.bucket,
                package = %report.package,
                uploaded = report.uploaded.len(),
                index_entries = report.index.entries.len(),
                "Publish complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "publish", error = %e, "Publish failed");
            Err(anyhow::Error::new(e))
        }
    }
}
