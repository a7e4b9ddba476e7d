//! `load_config` module: reads the optional per-package settings file and applies environment overrides.
//!
//! The CLI takes nothing but a bucket name, so anything else that varies between
//! packages (build command, output directory, override policy, S3 endpoint) lives in
//! `pypi-bucket.yaml` next to `setup.py`. Every key is optional:
//!
//! ```yaml
//! build:
//!   command: ["python", "setup.py", "bdist_wheel", "sdist"]
//!   dist_dir: dist
//!   selection: new
//! upload:
//!   override: true
//! storage:
//!   region: eu-west-1
//!   endpoint_url: http://localhost:9000
//!   force_path_style: true
//! ```
//!
//! Environment variables win over the file: `PYPI_BUCKET_OVERRIDE`,
//! `PYPI_BUCKET_REGION`, `PYPI_BUCKET_ENDPOINT_URL`.
//!
//! # Errors
//! All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use pypi_bucket_core::config::{BuildConfig, UploadConfig};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{error, info};

use crate::storage::StorageSettings;

pub const CONFIG_FILE_NAME: &str = "pypi-bucket.yaml";

pub const ENV_OVERRIDE: &str = "PYPI_BUCKET_OVERRIDE";
pub const ENV_REGION: &str = "PYPI_BUCKET_REGION";
pub const ENV_ENDPOINT_URL: &str = "PYPI_BUCKET_ENDPOINT_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub build: BuildConfig,
    pub upload: UploadConfig,
    pub storage: StorageSettings,
}

/// Loads `pypi-bucket.yaml` from `package_dir` (defaults when absent) and applies env overrides.
pub fn load_config<P: AsRef<Path>>(package_dir: P) -> Result<CliConfig> {
    let path = package_dir.as_ref().join(CONFIG_FILE_NAME);

    let mut config = match fs::read_to_string(&path) {
        Ok(content) => {
            info!(config_path = ?path, "Config file read successfully");
            let parsed: CliConfig = match serde_yaml::from_str(&content) {
                Ok(conf) => conf,
                Err(e) => {
                    error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
                    return Err(anyhow::anyhow!(
                        "Failed to parse config YAML {}: {e}",
                        path.display()
                    ));
                }
            };
            parsed
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(config_path = ?path, "No config file, using defaults");
            CliConfig::default()
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(e).with_context(|| format!("Failed to read config file {}", path.display()));
        }
    };

    apply_env_overrides(&mut config)?;

    info!(
        command = %config.build.command.join(" "),
        dist_dir = %config.build.dist_dir.display(),
        override_existing = config.upload.override_existing,
        "Config loaded and merged successfully"
    );
    Ok(config)
}

fn apply_env_overrides(config: &mut CliConfig) -> Result<()> {
    if let Some(raw) = env_var(ENV_OVERRIDE) {
        config.upload.override_existing = parse_bool(&raw)
            .with_context(|| format!("{ENV_OVERRIDE} must be true or false, got {raw:?}"))?;
        info!(override_existing = config.upload.override_existing, "{ENV_OVERRIDE} found in env");
    }
    if let Some(region) = env_var(ENV_REGION) {
        config.storage.region = Some(region);
    }
    if let Some(endpoint) = env_var(ENV_ENDPOINT_URL) {
        config.storage.endpoint_url = Some(endpoint);
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
