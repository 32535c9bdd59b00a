use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use url::Url;

use crate::error::{Result, UploadError};

/// Object-storage seam: store a named blob, derive its public URL.
///
/// Transfers are opaque one-shot calls with no incremental progress report;
/// retrying is the caller's business.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Derive the storage key for a payload. The id prefix keeps keys unique even
/// when two users upload a file of the same name in the same instant; path
/// separators in the user-supplied name are neutralized.
pub fn object_key(id: impl Display, file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    format!("{id}-{safe}")
}

/// Blob storage spoken over plain HTTP: PUT the body, GET serves it back from
/// `{endpoint}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base = Url::parse(endpoint)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base,
            token,
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        let base = self.base.as_str().trim_end_matches('/');
        format!("{base}/{bucket}/{key}")
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        let mut request = self.client.put(self.object_url(bucket, key)).body(data);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::store_error(status.as_u16(), message));
        }

        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.object_url(bucket, key)
    }
}
