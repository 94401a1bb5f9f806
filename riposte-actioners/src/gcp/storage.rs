use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use url::Url;

use super::{GcpError, TokenProvider};

const STORAGE_BASE_URL: &str = "https://storage.googleapis.com/storage/v1";
const UPLOAD_BASE_URL: &str = "https://storage.googleapis.com/upload/storage/v1";

// The JSON API encodes object sizes as decimal strings.
fn size_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectAttrs {
    pub name: String,

    #[serde(deserialize_with = "size_from_string")]
    pub size: u64,
}

/// Minimal object-store surface: write an object, read its attributes back.
#[async_trait]
pub trait ObjectStoreApi: Send + Sync {
    async fn put_object(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), GcpError>;
    async fn get_attrs(&self, bucket: &str, name: &str) -> Result<ObjectAttrs, GcpError>;
}

pub struct GcsClient {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
}

impl GcsClient {
    pub fn new(auth: Arc<TokenProvider>, http: reqwest::Client) -> Self {
        Self { http, auth }
    }

    fn object_url(&self, bucket: &str, name: &str) -> Result<Url, GcpError> {
        let mut url = Url::parse(STORAGE_BASE_URL)
            .map_err(|e| GcpError::Storage(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GcpError::Storage("invalid base URL".to_owned()))?
            .extend(["b", bucket, "o", name]);
        Ok(url)
    }
}

#[async_trait]
impl ObjectStoreApi for GcsClient {
    async fn put_object(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), GcpError> {
        let token = self.auth.access_token().await?;
        self.http
            .post(format!("{UPLOAD_BASE_URL}/b/{bucket}/o"))
            .query(&[("uploadType", "media"), ("name", name)])
            .bearer_auth(&token)
            .body(data)
            .send()
            .await
            .map_err(|e| GcpError::Storage(format!("object upload failed: {e}")))?
            .error_for_status()
            .map_err(|e| GcpError::Storage(format!("object upload failed: {e}")))?;
        Ok(())
    }

    async fn get_attrs(&self, bucket: &str, name: &str) -> Result<ObjectAttrs, GcpError> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(self.object_url(bucket, name)?)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| GcpError::Storage(format!("object attrs failed: {e}")))?
            .error_for_status()
            .map_err(|e| GcpError::Storage(format!("object attrs failed: {e}")))?;

        response
            .json()
            .await
            .map_err(|e| GcpError::Storage(format!("object attrs parse failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_attrs_parse_string_size() {
        let attrs: ObjectAttrs =
            serde_json::from_str(r#"{"name": "logs/1.2.3.4_1", "size": "42"}"#).unwrap();
        assert_eq!(attrs.size, 42);
    }

    #[test]
    fn object_url_escapes_slashes_in_names() {
        let auth = Arc::new(TokenProvider::new(reqwest::Client::new(), None).unwrap());
        let client = GcsClient::new(auth, reqwest::Client::new());
        let url = client.object_url("bucket", "rules/1.2.3.4_1.yaml").unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/bucket/o/rules%2F1.2.3.4_1.yaml"
        );
    }
}
