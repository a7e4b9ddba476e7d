//! # S3 storage (CLI <-> Core)
//!
//! Implements [`ObjectStore`] from `pypi-bucket-core` on top of `aws-sdk-s3`.
//! Credentials and region come from the AWS default provider chain; the
//! optional [`StorageSettings`] only override region and endpoint (for MinIO and
//! other S3-compatible stores).

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use pypi_bucket_core::contract::{ObjectListing, ObjectMetadata, ObjectStore, PutObjectRequest};
use pypi_bucket_core::error::StorageError;
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Overrides for the S3 client; everything else comes from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the AWS environment plus `settings`.
    pub async fn from_settings(settings: &StorageSettings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let aws_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(settings.force_path_style);
        if let Some(endpoint) = &settings.endpoint_url {
            s3_config = s3_config.endpoint_url(endpoint);
        }

        info!(
            region = ?aws_config.region(),
            endpoint = ?settings.endpoint_url,
            force_path_style = settings.force_path_style,
            "S3 client initialised"
        );
        Self::new(Client::from_conf(s3_config.build()))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip_all, fields(bucket = %req.bucket, key = %req.key, size = req.body.len()))]
    async fn put_object(&self, req: PutObjectRequest) -> Result<(), StorageError> {
        let PutObjectRequest {
            bucket,
            key,
            body,
            content_md5,
            content_type,
            metadata,
        } = req;

        self.client
            .put_object()
            .bucket(&bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .set_content_md5(content_md5)
            .set_content_type(content_type)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| StorageError::new("PutObject", &bucket, &key, e))?;

        debug!("object uploaded");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ObjectMetadata>, StorageError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(out) => {
                debug!("object exists");
                Ok(Some(out.metadata().cloned().unwrap_or_default()))
            }
            Err(err) => {
                // HeadObject has no body, so a missing key surfaces as a bare 404 NotFound.
                if err
                    .as_service_error()
                    .map_or(false, |e| e.is_not_found())
                {
                    debug!("object does not exist");
                    Ok(None)
                } else {
                    Err(StorageError::new("HeadObject", bucket, key, err))
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectListing, StorageError> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| StorageError::new("ListObjectsV2", bucket, prefix, e))?;

        let keys: Vec<String> = resp
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();
        debug!(count = keys.len(), "listed objects");

        Ok(ObjectListing {
            keys,
            next_continuation_token: resp.next_continuation_token().map(str::to_string),
        })
    }
}
