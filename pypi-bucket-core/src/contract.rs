//! # contract: seams between the publishing pipeline and the outside world
//!
//! This module defines the two traits the pipeline talks to:
//!
//! - [`Builder`] produces distribution artifacts on local disk.
//! - [`ObjectStore`] is the bucket: a key/value blob store with put, head and list.
//!
//! Everything else in the crate is written against these traits, so the CLI crate
//! plugs in a real S3 client and tests plug in mocks or an in-memory store.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; with the `test-export-mocks` feature
//!   (on by default) `MockBuilder` and `MockObjectStore` are available to
//!   integration tests and downstream crates.
//!
//! ## Types
//! - Request and response types are plain owned data so they can cross the mock
//!   boundary without lifetimes.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{PublishError, StorageError};

/// User-defined metadata stored alongside an object (`x-amz-meta-*` on S3).
pub type ObjectMetadata = HashMap<String, String>;

/// Everything needed to write one object.
#[derive(Debug, Clone, Default)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    /// Base64 MD5 of `body`, sent as the `Content-MD5` integrity header.
    pub content_md5: Option<String>,
    pub content_type: Option<String>,
    pub metadata: ObjectMetadata,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    pub keys: Vec<String>,
    /// Present when more keys remain; pass it back to fetch the next page.
    pub next_continuation_token: Option<String>,
}

/// Trait for the object-storage bucket the package index lives in.
///
/// Implementations must report a missing object from [`ObjectStore::head_object`]
/// as `Ok(None)`; every other failure is a [`StorageError`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload (create or overwrite) an object.
    async fn put_object(&self, req: PutObjectRequest) -> Result<(), StorageError>;

    /// Fetch an object's user metadata without its body.
    async fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ObjectMetadata>, StorageError>;

    /// List one page of keys under `prefix`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectListing, StorageError>;
}

/// Trait for producing distribution artifacts.
/// Implemented by [`crate::build::CommandBuilder`] and by mocks in testing.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Builder: Send + Sync {
    /// Run the build and return the artifacts it produced, oldest first.
    async fn build_distributions(&self) -> Result<Vec<PathBuf>, PublishError>;
}
