use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

fn _default_port() -> String {
    ":8080".to_owned()
}

fn _default_database_url() -> String {
    "sqlite:./actions.db".to_owned()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Listen address; a bare `":8080"` binds all interfaces.
    #[serde(default = "_default_port")]
    pub port: String,

    /// Request path -> sensor name. Only paths present here accept events.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: _default_port(),
            aliases: HashMap::new(),
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        if self.port.starts_with(':') {
            format!("0.0.0.0{}", self.port)
        } else {
            self.port.clone()
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct ScenarioConditions {
    pub trigger_count: u32,

    #[serde(with = "humantime_serde")]
    pub time_window: Duration,
}

/// A single actioner invocation inside a scenario, resolved by registry key.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActionerRef {
    pub name: String,

    #[serde(default)]
    pub params: HashMap<String, JsonValue>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Scenario {
    pub name: String,

    /// The detection rule name this scenario reacts to.
    pub falco_rule: String,

    #[serde(default)]
    pub conditions: Option<ScenarioConditions>,

    #[serde(default)]
    pub actioners: Vec<ActionerRef>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ActionerKind {
    #[serde(rename = "gcp_firewall")]
    GcpFirewall,
    #[serde(rename = "gcp_storage")]
    GcpStorage,
    #[serde(rename = "sigma_storage")]
    SigmaStorage,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActionerConfig {
    #[serde(rename = "type")]
    pub kind: ActionerKind,

    #[serde(default)]
    pub params: HashMap<String, JsonValue>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RiposteConfigStore {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default = "_default_database_url")]
    pub database_url: String,

    #[serde(default)]
    pub scenarios: Vec<Scenario>,

    #[serde(default)]
    pub actioners: HashMap<String, ActionerConfig>,
}

impl Default for RiposteConfigStore {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database_url: _default_database_url(),
            scenarios: vec![],
            actioners: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiposteConfig {
    pub store: RiposteConfigStore,
    pub paths_relative_to: PathBuf,
}

impl RiposteConfig {
    pub fn validate(&self) {
        if self.store.server.aliases.is_empty() {
            warn!("No server aliases configured - all event posts will be rejected with 404.");
        }
        for scenario in &self.store.scenarios {
            for actioner in &scenario.actioners {
                if !self.store.actioners.contains_key(&actioner.name) {
                    warn!(
                        scenario = %scenario.name,
                        actioner = %actioner.name,
                        "Scenario references an actioner that is not defined."
                    );
                }
            }
            if let Some(conditions) = &scenario.conditions {
                if conditions.time_window.is_zero() {
                    warn!(
                        scenario = %scenario.name,
                        "time_window is zero - the scenario will never trigger."
                    );
                }
            }
        }
    }
}
