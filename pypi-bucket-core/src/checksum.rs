//! Content digests for uploaded artifacts.
//!
//! The digest is MD5 over the raw file bytes, carried as standard base64 so it
//! can go straight into a `Content-MD5` header and into object metadata. The
//! index page wants the same digest as lowercase hex.

use std::path::Path;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use md5::{Digest, Md5};

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("digest is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Base64 MD5 of a file's full contents.
pub async fn digest(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(digest_bytes(&bytes))
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(Md5::digest(bytes))
}

/// Re-encode a base64 digest as lowercase hex.
pub fn base64_to_hex(encoded: &str) -> Result<String, ChecksumError> {
    let raw = BASE64_STANDARD.decode(encoded.trim())?;
    Ok(hex::encode(raw))
}
