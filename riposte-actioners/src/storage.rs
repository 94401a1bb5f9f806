use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::*;
use riposte_common::{ActionerConfig, Event};

use crate::gcp::{GcsClient, ObjectStoreApi, TokenProvider};
use crate::{params, Actioner, ActionerError};

/// Persists the raw event log to an object bucket for forensics. Every
/// invocation writes a fresh object; retries append rather than overwrite.
pub struct StorageActioner {
    api: Arc<dyn ObjectStoreApi>,
    bucket: String,
    /// Reserved configuration slot; validated but not consumed yet.
    #[allow(dead_code)]
    log_count: i64,
}

impl StorageActioner {
    pub fn new(api: Arc<dyn ObjectStoreApi>, bucket: String, log_count: i64) -> Self {
        Self {
            api,
            bucket,
            log_count,
        }
    }

    pub fn from_config(config: &ActionerConfig) -> Result<Self, ActionerError> {
        let bucket = params::require_str(&config.params, "bucket_name")?.to_owned();
        let log_count = params::require_int(&config.params, "log_count")?;
        let credentials_file = params::opt_str(&config.params, "credentials_file")?;

        let http = reqwest::Client::new();
        let auth = Arc::new(TokenProvider::new(
            http.clone(),
            credentials_file.map(Path::new),
        )?);
        let api = GcsClient::new(auth, http);

        Ok(Self::new(Arc::new(api), bucket, log_count))
    }
}

#[async_trait]
impl Actioner for StorageActioner {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn execute(
        &self,
        event: &Event,
        params: &HashMap<String, JsonValue>,
    ) -> Result<(), ActionerError> {
        let prefix = params::require_str(params, "prefix")?;
        let object_name = format!(
            "{prefix}{}_{}",
            event.ip,
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );

        let body = if event.raw_log.is_empty() {
            warn!(ip = %event.ip, rule = %event.rule_name, "No log provided for event, storing synthesized record");
            format!(
                "IP: {}, Rule: {}, Time: {}",
                event.ip,
                event.rule_name,
                Utc::now().to_rfc3339()
            )
        } else {
            event.raw_log.clone()
        };

        self.api
            .put_object(&self.bucket, &object_name, body.into_bytes())
            .await?;

        let attrs = self.api.get_attrs(&self.bucket, &object_name).await?;
        if attrs.size == 0 {
            return Err(ActionerError::EmptyObject(object_name));
        }

        info!(object = %object_name, size = attrs.size, "Stored event log");
        Ok(())
    }
}
