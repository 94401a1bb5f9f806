use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GcpError, TokenProvider};

const COMPUTE_BASE_URL: &str = "https://compute.googleapis.com/compute/v1/projects";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRule {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub direction: String,

    pub priority: i32,

    #[serde(default)]
    pub source_ranges: Vec<String>,

    #[serde(default)]
    pub denied: Vec<FirewallDenied>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallDenied {
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirewallListResponse {
    #[serde(default)]
    items: Vec<FirewallRule>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    status: String,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    errors: Vec<OperationErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OperationErrorDetail {
    #[serde(default)]
    message: String,
}

/// Project-wide firewall rule management. Mutations resolve only after the
/// underlying cloud operation completes.
#[async_trait]
pub trait FirewallApi: Send + Sync {
    async fn list_rules(&self) -> Result<Vec<FirewallRule>, GcpError>;
    async fn insert_rule(&self, rule: &FirewallRule) -> Result<(), GcpError>;
    async fn delete_rule(&self, name: &str) -> Result<(), GcpError>;
}

pub struct GcpFirewallClient {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    project_id: String,
}

impl GcpFirewallClient {
    pub fn new(project_id: String, auth: Arc<TokenProvider>, http: reqwest::Client) -> Self {
        Self {
            http,
            auth,
            project_id,
        }
    }

    async fn wait_for_operation(&self, operation: Operation) -> Result<(), GcpError> {
        let mut operation = operation;
        loop {
            if operation.status == "DONE" {
                if let Some(error) = operation.error {
                    let message = error
                        .errors
                        .into_iter()
                        .map(|e| e.message)
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(GcpError::OperationFailed {
                        name: operation.name,
                        message,
                    });
                }
                return Ok(());
            }

            debug!(operation = %operation.name, status = %operation.status, "Waiting for operation");
            tokio::time::sleep(Duration::from_millis(500)).await;

            let token = self.auth.access_token().await?;
            let response = self
                .http
                .get(format!(
                    "{COMPUTE_BASE_URL}/{}/global/operations/{}",
                    self.project_id, operation.name
                ))
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| GcpError::Compute(format!("operation poll failed: {e}")))?
                .error_for_status()
                .map_err(|e| GcpError::Compute(format!("operation poll failed: {e}")))?;

            operation = response
                .json()
                .await
                .map_err(|e| GcpError::Compute(format!("operation parse failed: {e}")))?;
        }
    }
}

#[async_trait]
impl FirewallApi for GcpFirewallClient {
    async fn list_rules(&self) -> Result<Vec<FirewallRule>, GcpError> {
        let token = self.auth.access_token().await?;
        let mut all_rules = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(format!(
                    "{COMPUTE_BASE_URL}/{}/global/firewalls",
                    self.project_id
                ))
                .bearer_auth(&token);

            if let Some(ref page) = page_token {
                req = req.query(&[("pageToken", page.as_str())]);
            }

            let response = req
                .send()
                .await
                .map_err(|e| GcpError::Compute(format!("firewall list failed: {e}")))?
                .error_for_status()
                .map_err(|e| GcpError::Compute(format!("firewall list failed: {e}")))?;

            let resp: FirewallListResponse = response
                .json()
                .await
                .map_err(|e| GcpError::Compute(format!("firewall list parse failed: {e}")))?;

            all_rules.extend(resp.items);

            match resp.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(all_rules)
    }

    async fn insert_rule(&self, rule: &FirewallRule) -> Result<(), GcpError> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .post(format!(
                "{COMPUTE_BASE_URL}/{}/global/firewalls",
                self.project_id
            ))
            .bearer_auth(&token)
            .json(rule)
            .send()
            .await
            .map_err(|e| GcpError::Compute(format!("firewall insert failed: {e}")))?
            .error_for_status()
            .map_err(|e| GcpError::Compute(format!("firewall insert failed: {e}")))?;

        let operation: Operation = response
            .json()
            .await
            .map_err(|e| GcpError::Compute(format!("operation parse failed: {e}")))?;
        self.wait_for_operation(operation).await
    }

    async fn delete_rule(&self, name: &str) -> Result<(), GcpError> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .delete(format!(
                "{COMPUTE_BASE_URL}/{}/global/firewalls/{name}",
                self.project_id
            ))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| GcpError::Compute(format!("firewall delete failed: {e}")))?
            .error_for_status()
            .map_err(|e| GcpError::Compute(format!("firewall delete failed: {e}")))?;

        let operation: Operation = response
            .json()
            .await
            .map_err(|e| GcpError::Compute(format!("operation parse failed: {e}")))?;
        self.wait_for_operation(operation).await
    }
}
