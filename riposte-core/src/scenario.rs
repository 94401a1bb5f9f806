use riposte_common::{Event, ScenarioConditions};
use tracing::*;

use crate::ActionStore;

/// Decide whether a scenario's threshold condition is met for this event.
/// Storage errors evaluate to `false` so a broken store never triggers
/// a response.
pub async fn should_trigger(
    conditions: &ScenarioConditions,
    event: &Event,
    store: &ActionStore,
) -> bool {
    if conditions.time_window.is_zero() {
        warn!("time_window is zero, conditions will always fail");
    }

    let count = match store.count_events(&event.ip, conditions.time_window).await {
        Ok(count) => count,
        Err(error) => {
            warn!(ip = %event.ip, ?error, "Failed to count events");
            return false;
        }
    };

    debug!(
        ip = %event.ip,
        count,
        required = conditions.trigger_count,
        window = ?conditions.time_window,
        "Evaluated scenario conditions"
    );
    count >= conditions.trigger_count
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use riposte_common::ActionStatus;
    use sea_orm::Database;
    use tokio::sync::Mutex;

    use super::*;

    async fn test_store() -> ActionStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        riposte_db_migrations::migrate_database(&db).await.unwrap();
        ActionStore::new(Arc::new(Mutex::new(db)))
    }

    fn event(ip: &str) -> Event {
        Event {
            ip: ip.to_owned(),
            rule_name: "R".to_owned(),
            raw_log: String::new(),
        }
    }

    #[tokio::test]
    async fn triggers_at_threshold() {
        let store = test_store().await;
        let conditions = ScenarioConditions {
            trigger_count: 3,
            time_window: Duration::from_secs(300),
        };

        for _ in 0..2 {
            store
                .log_action("5.5.5.5", "R", ActionStatus::Received, Utc::now())
                .await
                .unwrap();
        }
        assert!(!should_trigger(&conditions, &event("5.5.5.5"), &store).await);

        store
            .log_action("5.5.5.5", "R", ActionStatus::Received, Utc::now())
            .await
            .unwrap();
        assert!(should_trigger(&conditions, &event("5.5.5.5"), &store).await);
    }

    #[tokio::test]
    async fn zero_window_never_triggers() {
        let store = test_store().await;
        let conditions = ScenarioConditions {
            trigger_count: 1,
            time_window: Duration::ZERO,
        };

        store
            .log_action("5.5.5.5", "R", ActionStatus::Received, Utc::now())
            .await
            .unwrap();

        // The cutoff equals "now", which the just-written attempt cannot
        // strictly exceed by the time the query runs.
        assert!(!should_trigger(&conditions, &event("5.5.5.5"), &store).await);
    }

    #[tokio::test]
    async fn unknown_ip_never_triggers() {
        let store = test_store().await;
        let conditions = ScenarioConditions {
            trigger_count: 1,
            time_window: Duration::from_secs(300),
        };
        assert!(!should_trigger(&conditions, &event("6.6.6.6"), &store).await);
    }
}
