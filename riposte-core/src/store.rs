use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use tokio::sync::Mutex;
use riposte_common::{ActionStatus, RiposteError};
use riposte_db_entities::IpAction;

/// Durable per-IP action log. One row per IP ever seen, upsert semantics.
#[derive(Clone)]
pub struct ActionStore {
    db: Arc<Mutex<DatabaseConnection>>,
}

impl ActionStore {
    pub fn new(db: Arc<Mutex<DatabaseConnection>>) -> Self {
        Self { db }
    }

    /// Record an observation for `ip`. First observation inserts the row
    /// with `attempt_count = 1`; later calls update it depending on the
    /// status being recorded.
    pub async fn log_action(
        &self,
        ip: &str,
        event: &str,
        status: ActionStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<(), RiposteError> {
        let db = self.db.lock().await;

        let existing = IpAction::Entity::find_by_id(ip.to_owned()).one(&*db).await?;

        let Some(row) = existing else {
            let record = IpAction::ActiveModel {
                ip: Set(ip.to_owned()),
                last_event: Set(event.to_owned()),
                attempt_count: Set(1),
                last_attempt_time: Set(timestamp),
                block_time: Set(None),
                unblock_time: Set(None),
                status: Set(status.as_str().to_owned()),
                block_count: Set(0),
            };
            record.insert(&*db).await?;
            return Ok(());
        };

        match status {
            ActionStatus::Received => {
                let mut record = row.clone().into_active_model();
                record.last_event = Set(event.to_owned());
                record.attempt_count = Set(row.attempt_count + 1);
                record.last_attempt_time = Set(timestamp);
                record.update(&*db).await?;
            }
            ActionStatus::Blocked => {
                let mut record = row.clone().into_active_model();
                record.block_time = Set(Some(timestamp));
                record.status = Set(status.as_str().to_owned());
                record.block_count = Set(row.block_count + 1);
                record.update(&*db).await?;
            }
            ActionStatus::Unblocked => {
                let mut record = row.into_active_model();
                record.unblock_time = Set(Some(timestamp));
                record.status = Set(status.as_str().to_owned());
                record.attempt_count = Set(0);
                record.update(&*db).await?;
            }
            // Secondary bookkeeping statuses leave the existing row alone.
            ActionStatus::Stored => {}
        }

        Ok(())
    }

    /// Attempt count for `ip`, provided the most recent attempt falls
    /// within `window` of now; 0 otherwise. This is the running counter
    /// gated by freshness, not a windowed histogram.
    pub async fn count_events(&self, ip: &str, window: Duration) -> Result<u32, RiposteError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(window)
                .map_err(|e| RiposteError::Config(format!("time window out of range: {e}")))?;

        let db = self.db.lock().await;
        let row = IpAction::Entity::find()
            .filter(IpAction::Column::Ip.eq(ip))
            .filter(IpAction::Column::LastAttemptTime.gte(cutoff))
            .one(&*db)
            .await?;

        Ok(row.map(|r| r.attempt_count.max(0) as u32).unwrap_or(0))
    }

    /// Lifetime number of blocks for `ip`; 0 if the IP was never seen.
    pub async fn get_block_count(&self, ip: &str) -> Result<u32, RiposteError> {
        let db = self.db.lock().await;
        let row = IpAction::Entity::find_by_id(ip.to_owned()).one(&*db).await?;
        Ok(row.map(|r| r.block_count.max(0) as u32).unwrap_or(0))
    }

    /// All rows, newest attempt first.
    pub async fn get_actions(&self) -> Result<Vec<IpAction::Model>, RiposteError> {
        let db = self.db.lock().await;
        Ok(IpAction::Entity::find()
            .order_by_desc(IpAction::Column::LastAttemptTime)
            .all(&*db)
            .await?)
    }
}
