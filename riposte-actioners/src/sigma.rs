use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::*;
use riposte_common::{ActionerConfig, Event};

use crate::gcp::{GcsClient, ObjectStoreApi, TokenProvider};
use crate::{params, Actioner, ActionerError};

#[derive(Debug, Serialize, Deserialize)]
pub struct SigmaRule {
    pub title: String,
    pub description: String,
    pub logsource: SigmaLogSource,
    pub detection: SigmaDetection,
    pub fields: Vec<String>,
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SigmaLogSource {
    pub category: String,
    pub product: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SigmaDetection {
    pub selection: SigmaSelection,
    pub condition: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SigmaSelection {
    pub src_ip: String,
    pub event: String,
}

fn render_rule(event: &Event) -> SigmaRule {
    SigmaRule {
        title: format!("Suspicious Activity Detected for IP {}", event.ip),
        description: format!("Detected {}: {}", event.rule_name, event.raw_log),
        logsource: SigmaLogSource {
            category: "network".to_owned(),
            product: "falco".to_owned(),
        },
        detection: SigmaDetection {
            selection: SigmaSelection {
                src_ip: event.ip.clone(),
                event: event.rule_name.clone(),
            },
            condition: "selection".to_owned(),
        },
        fields: vec!["src_ip".to_owned(), "event".to_owned()],
        level: "high".to_owned(),
    }
}

/// Renders each event as a SigmaHQ detection rule and persists the YAML
/// document for downstream SIEM ingestion.
pub struct SigmaActioner {
    api: Arc<dyn ObjectStoreApi>,
    bucket: String,
}

impl SigmaActioner {
    pub fn new(api: Arc<dyn ObjectStoreApi>, bucket: String) -> Self {
        Self { api, bucket }
    }

    pub fn from_config(config: &ActionerConfig) -> Result<Self, ActionerError> {
        let bucket = params::require_str(&config.params, "bucket_name")?.to_owned();
        let credentials_file = params::opt_str(&config.params, "credentials_file")?;

        let http = reqwest::Client::new();
        let auth = Arc::new(TokenProvider::new(
            http.clone(),
            credentials_file.map(Path::new),
        )?);
        let api = GcsClient::new(auth, http);

        Ok(Self::new(Arc::new(api), bucket))
    }
}

#[async_trait]
impl Actioner for SigmaActioner {
    fn name(&self) -> &'static str {
        "sigma"
    }

    async fn execute(
        &self,
        event: &Event,
        params: &HashMap<String, JsonValue>,
    ) -> Result<(), ActionerError> {
        let prefix = params::require_str(params, "prefix")?;
        let object_name = format!(
            "{prefix}{}_{}.yaml",
            event.ip,
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );

        let rule = render_rule(event);
        let yaml = serde_yaml::to_string(&rule)?;

        self.api
            .put_object(&self.bucket, &object_name, yaml.into_bytes())
            .await?;

        let attrs = self.api.get_attrs(&self.bucket, &object_name).await?;
        if attrs.size == 0 {
            return Err(ActionerError::EmptyObject(object_name));
        }

        info!(object = %object_name, size = attrs.size, "Stored Sigma rule");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::FakeObjectStore;

    fn sample_event() -> Event {
        Event {
            ip: "3.3.3.3".to_owned(),
            rule_name: "SuspiciousExec".to_owned(),
            raw_log: "pid=42".to_owned(),
        }
    }

    #[test]
    fn renders_expected_fields() {
        let rule = render_rule(&sample_event());
        assert_eq!(rule.title, "Suspicious Activity Detected for IP 3.3.3.3");
        assert_eq!(rule.description, "Detected SuspiciousExec: pid=42");
        assert_eq!(rule.logsource.category, "network");
        assert_eq!(rule.logsource.product, "falco");
        assert_eq!(rule.detection.selection.src_ip, "3.3.3.3");
        assert_eq!(rule.detection.selection.event, "SuspiciousExec");
        assert_eq!(rule.detection.condition, "selection");
        assert_eq!(rule.fields, vec!["src_ip", "event"]);
        assert_eq!(rule.level, "high");
    }

    #[tokio::test]
    async fn stores_yaml_document_that_parses_back() {
        let api = Arc::new(FakeObjectStore::default());
        let actioner = SigmaActioner::new(api.clone(), "rules-bucket".to_owned());

        let params = HashMap::from([("prefix".to_owned(), serde_json::json!("rules/"))]);
        actioner.execute(&sample_event(), &params).await.unwrap();

        let objects = api.objects.lock().await;
        assert_eq!(objects.len(), 1);
        let (bucket, name, data) = &objects[0];
        assert_eq!(bucket, "rules-bucket");
        assert!(name.starts_with("rules/3.3.3.3_"));
        assert!(name.ends_with(".yaml"));

        let parsed: SigmaRule = serde_yaml::from_slice(data).unwrap();
        assert!(parsed.title.contains("3.3.3.3"));
        assert_eq!(parsed.detection.selection.src_ip, "3.3.3.3");
        assert_eq!(parsed.detection.selection.event, "SuspiciousExec");
        assert_eq!(parsed.level, "high");
    }
}
