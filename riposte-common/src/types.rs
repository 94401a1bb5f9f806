use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A single detection event as posted by the sensor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Event {
    pub ip: String,

    #[serde(rename = "rule")]
    pub rule_name: String,

    #[serde(rename = "log", default)]
    pub raw_log: String,
}

/// Lifecycle states recorded per IP. `Received` and `Stored` never change
/// the row's `status` column; `Blocked` and `Unblocked` do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Received,
    Blocked,
    Unblocked,
    Stored,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Received => "received",
            ActionStatus::Blocked => "blocked",
            ActionStatus::Unblocked => "unblocked",
            ActionStatus::Stored => "stored",
        }
    }
}

impl Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
