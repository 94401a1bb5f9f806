use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::*;
use riposte_common::{ActionStatus, ActionerConfig, Event};
use riposte_core::ActionStore;

use crate::gcp::{FirewallApi, FirewallDenied, FirewallRule, GcpFirewallClient, TokenProvider};
use crate::{params, Actioner, ActionerError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Cloud firewall rule names are limited to 63 characters.
const MAX_RULE_NAME_LEN: usize = 63;

/// Blocks the offending IP with an ingress deny rule and schedules its
/// removal. At most one rule is kept per IP: an existing deny rule for the
/// same source range, whoever created it, suppresses insertion.
pub struct FirewallActioner {
    api: Arc<dyn FirewallApi>,
    store: ActionStore,
    timeout: Duration,
    multiply_timeout: bool,
}

impl FirewallActioner {
    pub fn new(
        api: Arc<dyn FirewallApi>,
        store: ActionStore,
        timeout: Duration,
        multiply_timeout: bool,
    ) -> Self {
        Self {
            api,
            store,
            timeout,
            multiply_timeout,
        }
    }

    pub fn from_config(config: &ActionerConfig, store: ActionStore) -> Result<Self, ActionerError> {
        let project_id = params::require_str(&config.params, "project_id")?.to_owned();
        let timeout = match params::opt_int(&config.params, "timeout")? {
            Some(minutes) => Duration::from_secs(minutes.max(0) as u64 * 60),
            None => DEFAULT_TIMEOUT,
        };
        let multiply_timeout = params::opt_bool(&config.params, "multiply_timeout")?.unwrap_or(false);
        let credentials_file = params::opt_str(&config.params, "credentials_file")?;

        let http = reqwest::Client::new();
        let auth = Arc::new(TokenProvider::new(
            http.clone(),
            credentials_file.map(Path::new),
        )?);
        let api = GcpFirewallClient::new(project_id, auth, http);

        Ok(Self::new(Arc::new(api), store, timeout, multiply_timeout))
    }

    async fn is_ip_blocked(&self, ip: &str) -> bool {
        let needle = format!("{ip}/32");
        match self.api.list_rules().await {
            Ok(rules) => rules
                .iter()
                .any(|rule| rule.source_ranges.iter().any(|range| range == &needle)),
            Err(error) => {
                warn!(ip, ?error, "Failed to list firewall rules");
                false
            }
        }
    }

    async fn block_ip(
        &self,
        ip: &str,
        priority: i32,
        description: &str,
    ) -> Result<(), ActionerError> {
        let rule = FirewallRule {
            name: deny_rule_name(ip, Utc::now().timestamp_nanos_opt().unwrap_or_default()),
            description: Some(description.to_owned()),
            direction: "INGRESS".to_owned(),
            priority,
            source_ranges: vec![format!("{ip}/32")],
            denied: vec![FirewallDenied {
                ip_protocol: "all".to_owned(),
            }],
        };

        self.api.insert_rule(&rule).await?;
        info!(ip, rule = %rule.name, priority, "Inserted deny rule");
        Ok(())
    }
}

#[async_trait]
impl Actioner for FirewallActioner {
    fn name(&self) -> &'static str {
        "firewall"
    }

    async fn execute(
        &self,
        event: &Event,
        params: &HashMap<String, JsonValue>,
    ) -> Result<(), ActionerError> {
        if self.is_ip_blocked(&event.ip).await {
            debug!(ip = %event.ip, "IP already covered by a deny rule, skipping");
            return Ok(());
        }

        let priority = params::require_int(params, "priority")? as i32;
        let description = params::require_str(params, "description")?;
        let base = params::opt_duration(params, "timeout")?.unwrap_or(self.timeout);

        let effective = if self.multiply_timeout {
            let block_count = match self.store.get_block_count(&event.ip).await {
                Ok(count) => count,
                Err(error) => {
                    warn!(ip = %event.ip, ?error, "Failed to read block count, using base duration");
                    0
                }
            };
            effective_duration(base, block_count)
        } else {
            base
        };

        self.block_ip(&event.ip, priority, description).await?;

        let api = self.api.clone();
        let store = self.store.clone();
        let ip = event.ip.clone();
        tokio::spawn(async move {
            tokio::time::sleep(effective).await;
            unblock_and_record(&*api, &store, &ip, effective).await;
        });

        Ok(())
    }
}

/// Historical blocks stretch the next one: a repeat offender with N prior
/// blocks stays blocked for `base * (N + 1)`.
fn effective_duration(base: Duration, block_count: u32) -> Duration {
    base * (block_count + 1)
}

async fn unblock_and_record(
    api: &dyn FirewallApi,
    store: &ActionStore,
    ip: &str,
    after: Duration,
) {
    match unblock_ip(api, ip).await {
        Ok(()) => {
            info!(ip, ?after, "Removed deny rule");
            if let Err(error) = store
                .log_action(ip, "block", ActionStatus::Unblocked, Utc::now())
                .await
            {
                warn!(ip, ?error, "Failed to record unblock");
            }
        }
        Err(error) => {
            // Left for an operator to clean up.
            error!(ip, ?error, "Failed to remove deny rule");
        }
    }
}

fn deny_rule_name(ip: &str, nanos: i64) -> String {
    let safe_ip = ip.replace('.', "-");
    let mut name = format!("block-{safe_ip}-{nanos}");
    name.truncate(MAX_RULE_NAME_LEN);
    name.trim_end_matches('-').to_owned()
}

/// Deletes the deny rule this system owns for `ip`, identified by the
/// dash-escaped IP embedded in the rule name.
async fn unblock_ip(api: &dyn FirewallApi, ip: &str) -> Result<(), crate::gcp::GcpError> {
    let safe_ip = ip.replace('.', "-");
    let rules = api.list_rules().await?;
    for rule in rules {
        if rule.name.contains(&safe_ip) {
            return api.delete_rule(&rule.name).await;
        }
    }
    Ok(())
}
