//! # index: the package's "simple" index page
//!
//! Lists every object under the package prefix, reads back the `md5` metadata
//! written at upload time and publishes `<package>/index.html` with one link per
//! artifact. Links carry a `#md5=<hex>` fragment so installers can verify what
//! they download.
//!
//! The page itself is never listed, and it is rewritten on every run.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::checksum;
use crate::config::{PackageName, INDEX_FILE_NAME};
use crate::contract::{ObjectMetadata, ObjectStore, PutObjectRequest};
use crate::error::{PublishError, StorageError};
use crate::upload::MD5_METADATA_KEY;

const INDEX_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/index.html"));

/// One link on the index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub name: String,
    pub url: String,
    /// Lowercase hex MD5, when the object carries one.
    pub md5: Option<String>,
}

impl IndexEntry {
    pub fn new(name: impl Into<String>, md5: Option<String>) -> Self {
        let name = name.into();
        let url = match &md5 {
            Some(hex) => format!("{name}#md5={hex}"),
            None => name.clone(),
        };
        Self { name, url, md5 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub key: String,
    pub entries: Vec<IndexEntry>,
}

/// Every key under `prefix`, following continuation tokens until the listing is exhausted.
pub async fn list_all_keys<S>(store: &S, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>
where
    S: ObjectStore + ?Sized,
{
    let mut keys = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let page = store
            .list_objects(bucket, prefix, continuation_token.take())
            .await?;
        keys.extend(page.keys);

        match page.next_continuation_token {
            Some(token) => continuation_token = Some(token),
            None => break,
        }
    }

    debug!(count = keys.len(), %prefix, "Listed package objects");
    Ok(keys)
}

/// Hex digest from an object's `md5` metadata. Malformed values are logged and dropped.
pub fn md5_hex_from_metadata(key: &str, metadata: &ObjectMetadata) -> Option<String> {
    let encoded = metadata.get(MD5_METADATA_KEY).filter(|v| !v.is_empty())?;
    match checksum::base64_to_hex(encoded) {
        Ok(hex) => Some(hex),
        Err(e) => {
            warn!(%key, error = %e, "Ignoring malformed md5 metadata");
            None
        }
    }
}

/// Reads back the artifacts stored for `package`, in listing order.
pub async fn collect_entries<S>(
    store: &S,
    bucket: &str,
    package: &PackageName,
) -> Result<Vec<IndexEntry>, PublishError>
where
    S: ObjectStore + ?Sized,
{
    let keys = list_all_keys(store, bucket, &package.prefix()).await?;

    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        if key.ends_with(INDEX_FILE_NAME) {
            continue;
        }
        let name = match key.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let Some(metadata) = store.head_object(bucket, &key).await? else {
            warn!(%key, "Object disappeared between listing and head; leaving it out");
            continue;
        };
        let md5 = md5_hex_from_metadata(&key, &metadata);
        entries.push(IndexEntry::new(name, md5));
    }
    Ok(entries)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the index page for `package`.
pub fn render_index(package: &PackageName, entries: &[IndexEntry]) -> String {
    let links = entries
        .iter()
        .map(|entry| {
            format!(
                "    <a href=\"{}\">{}</a><br/>",
                escape_html(&entry.url),
                escape_html(&entry.name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let name = escape_html(package.as_str());
    fill_template(INDEX_TEMPLATE, |placeholder| match placeholder {
        "name" => Some(name.as_str()),
        "links" => Some(links.as_str()),
        _ => None,
    })
}

/// Substitutes `{placeholder}`s in one pass over `template`. Substituted text is
/// never scanned again, and unknown placeholders are kept as written.
fn fill_template<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((head, tail)) = rest.split_once('{') {
        out.push_str(head);
        match tail.split_once('}') {
            Some((placeholder, after)) => match lookup(placeholder) {
                Some(value) => {
                    out.push_str(value);
                    rest = after;
                }
                None => {
                    out.push('{');
                    rest = tail;
                }
            },
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Regenerates and uploads `<package>/index.html`, overwriting any previous page.
#[instrument(skip_all, fields(%bucket, %package))]
pub async fn publish_index<S>(
    store: &S,
    bucket: &str,
    package: &PackageName,
) -> Result<IndexReport, PublishError>
where
    S: ObjectStore + ?Sized,
{
    let entries = collect_entries(store, bucket, package).await?;
    if entries.is_empty() {
        warn!("No artifacts stored for package; publishing an empty index");
    }

    let page = render_index(package, &entries);
    let key = package.index_key();
    store
        .put_object(PutObjectRequest {
            bucket: bucket.to_string(),
            key: key.clone(),
            body: page.into_bytes(),
            content_md5: None,
            content_type: Some("text/html".to_string()),
            metadata: ObjectMetadata::new(),
        })
        .await?;
    info!(%key, entries = entries.len(), "[INDEX] Published index page");

    Ok(IndexReport { key, entries })
}
