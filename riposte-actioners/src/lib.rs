use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use riposte_common::Event;

mod error;
mod firewall;
pub mod gcp;
mod params;
mod registry;
mod sigma;
mod storage;

pub use error::ActionerError;
pub use firewall::FirewallActioner;
pub use registry::{build_registry, ActionerRegistry};
pub use sigma::SigmaActioner;
pub use storage::StorageActioner;

/// One kind of automated response. Implementations must be safe to call
/// concurrently from multiple request handlers.
#[async_trait]
pub trait Actioner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        event: &Event,
        params: &HashMap<String, JsonValue>,
    ) -> Result<(), ActionerError>;
}
