use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use poem::listener::TcpListener;
use poem::{get, post, Endpoint, EndpointExt, Route, Server};
use tracing::*;
use riposte_actioners::{build_registry, ActionerRegistry};
use riposte_core::Services;

mod dashboard;
mod dispatch;

/// HTTP front door: receives detection events on the configured alias
/// paths and serves the dashboard.
pub struct EventServer {
    services: Services,
    registry: Arc<ActionerRegistry>,
}

impl EventServer {
    pub fn new(services: &Services) -> Self {
        let registry = Arc::new(build_registry(&services.config, &services.store));
        Self {
            services: services.clone(),
            registry,
        }
    }

    pub async fn run(self, address: SocketAddr) -> Result<()> {
        let app = event_app(&self.services, self.registry);
        info!(?address, "Listening");
        Server::new(TcpListener::bind(address))
            .run(app)
            .await
            .context("Failed to start event server")
    }
}

fn event_app(services: &Services, registry: Arc<ActionerRegistry>) -> impl Endpoint {
    Route::new()
        .at("/dashboard", get(dashboard::dashboard_endpoint))
        .nest_no_strip("/", post(dispatch::event_endpoint))
        .data(services.clone())
        .data(registry)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::Arc;

    use sea_orm::Database;
    use tokio::sync::Mutex;
    use riposte_common::{RiposteConfig, RiposteConfigStore};
    use riposte_core::{ActionStore, Services};

    pub(crate) async fn services_from_yaml(yaml: &str) -> Services {
        let store: RiposteConfigStore = serde_yaml::from_str(yaml).unwrap();
        let config = RiposteConfig {
            store,
            paths_relative_to: PathBuf::from("."),
        };

        let db = Database::connect("sqlite::memory:").await.unwrap();
        riposte_db_migrations::migrate_database(&db).await.unwrap();
        let db = Arc::new(Mutex::new(db));

        Services {
            db: db.clone(),
            config: Arc::new(config),
            store: ActionStore::new(db),
        }
    }
}
