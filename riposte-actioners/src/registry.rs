use std::collections::HashMap;
use std::sync::Arc;

use tracing::*;
use riposte_common::{ActionerKind, RiposteConfig};
use riposte_core::ActionStore;

use crate::{Actioner, ActionerError, FirewallActioner, SigmaActioner, StorageActioner};

pub type ActionerRegistry = HashMap<String, Arc<dyn Actioner>>;

/// Instantiate every configured actioner. A broken definition is logged
/// and skipped; the rest of the registry still comes up. Read-only after
/// construction.
pub fn build_registry(config: &RiposteConfig, store: &ActionStore) -> ActionerRegistry {
    let mut registry = ActionerRegistry::new();

    for (name, actioner_config) in &config.store.actioners {
        let built: Result<Arc<dyn Actioner>, ActionerError> = match actioner_config.kind {
            ActionerKind::GcpFirewall => {
                FirewallActioner::from_config(actioner_config, store.clone())
                    .map(|a| Arc::new(a) as Arc<dyn Actioner>)
            }
            ActionerKind::GcpStorage => StorageActioner::from_config(actioner_config)
                .map(|a| Arc::new(a) as Arc<dyn Actioner>),
            ActionerKind::SigmaStorage => SigmaActioner::from_config(actioner_config)
                .map(|a| Arc::new(a) as Arc<dyn Actioner>),
        };

        match built {
            Ok(actioner) => {
                info!(name = %name, kind = actioner.name(), "Initialized actioner");
                registry.insert(name.clone(), actioner);
            }
            Err(error) => {
                warn!(name = %name, %error, "Failed to initialize actioner, skipping");
            }
        }
    }

    registry
}
