use std::sync::Arc;

use anyhow::Result;
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use riposte_common::RiposteConfig;

use crate::db::connect_to_db;
use crate::store::ActionStore;

/// Shared handles passed to every server and actioner.
#[derive(Clone)]
pub struct Services {
    pub db: Arc<Mutex<DatabaseConnection>>,
    pub config: Arc<RiposteConfig>,
    pub store: ActionStore,
}

impl Services {
    pub async fn new(config: RiposteConfig) -> Result<Self> {
        let db = connect_to_db(&config).await?;
        let db = Arc::new(Mutex::new(db));

        let store = ActionStore::new(db.clone());

        Ok(Self {
            db,
            config: Arc::new(config),
            store,
        })
    }
}
