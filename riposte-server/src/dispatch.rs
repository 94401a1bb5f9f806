use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use poem::http::StatusCode;
use poem::web::Data;
use poem::{handler, Body, Request, Response};
use tracing::*;
use riposte_actioners::ActionerRegistry;
use riposte_common::{ActionStatus, Event};
use riposte_core::{should_trigger, Services};

#[handler]
pub async fn event_endpoint(
    req: &Request,
    body: Body,
    services: Data<&Services>,
    registry: Data<&Arc<ActionerRegistry>>,
) -> Response {
    let started = Instant::now();
    let path = req.uri().path().to_owned();

    let event: Event = match body.into_json().await {
        Ok(event) => event,
        Err(error) => {
            warn!(%path, %error, "Failed to decode event");
            return Response::builder().status(StatusCode::BAD_REQUEST).finish();
        }
    };

    if !services.0.config.store.server.aliases.contains_key(&path) {
        warn!(%path, "Rejected event for unregistered endpoint");
        return Response::builder().status(StatusCode::NOT_FOUND).finish();
    }

    process_event(&event, services.0, registry.0).await;

    info!(
        %path,
        ip = %event.ip,
        rule = %event.rule_name,
        duration = ?started.elapsed(),
        "Processed event"
    );
    Response::builder().status(StatusCode::OK).finish()
}

/// Record the event and walk every matching scenario. Actioner failures
/// are logged and never bubble into the HTTP response: the endpoint
/// acknowledges receipt, not effect.
pub(crate) async fn process_event(
    event: &Event,
    services: &Services,
    registry: &ActionerRegistry,
) {
    let store = &services.store;

    if event.ip.is_empty() {
        warn!(rule = %event.rule_name, "Event carries no source IP, nothing to do");
        return;
    }

    if let Err(error) = store
        .log_action(&event.ip, &event.rule_name, ActionStatus::Received, Utc::now())
        .await
    {
        warn!(ip = %event.ip, ?error, "Failed to record event");
    }

    for scenario in &services.config.store.scenarios {
        if scenario.falco_rule != event.rule_name {
            continue;
        }

        if let Some(conditions) = &scenario.conditions {
            if !should_trigger(conditions, event, store).await {
                continue;
            }
        }

        info!(scenario = %scenario.name, ip = %event.ip, "Scenario triggered");

        for entry in &scenario.actioners {
            let Some(actioner) = registry.get(&entry.name) else {
                continue;
            };

            if let Err(error) = actioner.execute(event, &entry.params).await {
                warn!(
                    scenario = %scenario.name,
                    actioner = %entry.name,
                    %error,
                    "Actioner failed"
                );
                continue;
            }

            let (action, status) = if actioner.name() == "firewall" {
                ("block", ActionStatus::Blocked)
            } else {
                ("store", ActionStatus::Stored)
            };
            if let Err(error) = store.log_action(&event.ip, action, status, Utc::now()).await {
                warn!(ip = %event.ip, ?error, "Failed to record actioner result");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use poem::test::TestClient;
    use serde_json::{json, Value as JsonValue};
    use tokio::sync::Mutex;
    use riposte_actioners::{Actioner, ActionerError};
    use riposte_common::Event;

    use super::*;
    use crate::test_support::services_from_yaml;

    struct RecordingActioner {
        name: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Actioner for RecordingActioner {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(
            &self,
            event: &Event,
            _params: &HashMap<String, JsonValue>,
        ) -> Result<(), ActionerError> {
            self.calls
                .lock()
                .await
                .push(format!("{}:{}", self.name, event.ip));
            if self.fail {
                return Err(ActionerError::MissingParam("boom".to_owned()));
            }
            Ok(())
        }
    }

    const BASE_CONFIG: &str = r#"
server:
  aliases:
    "/falco-events": "primary"
scenarios:
  - name: respond
    falco_rule: R
    actioners:
      - name: fw
      - name: st
"#;

    fn recording_registry(
        calls: &Arc<Mutex<Vec<String>>>,
        entries: &[(&str, &'static str, bool)],
    ) -> Arc<ActionerRegistry> {
        let mut registry = ActionerRegistry::new();
        for (key, kind, fail) in entries {
            registry.insert(
                (*key).to_owned(),
                Arc::new(RecordingActioner {
                    name: kind,
                    calls: calls.clone(),
                    fail: *fail,
                }) as Arc<dyn Actioner>,
            );
        }
        Arc::new(registry)
    }

    #[tokio::test]
    async fn event_dispatches_all_actioners_in_order() {
        let services = services_from_yaml(BASE_CONFIG).await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry =
            recording_registry(&calls, &[("fw", "firewall", false), ("st", "storage", false)]);

        let app = crate::event_app(&services, registry);
        let client = TestClient::new(app);

        let resp = client
            .post("/falco-events")
            .body_json(&json!({"ip": "1.2.3.4", "rule": "R", "log": "X"}))
            .send()
            .await;
        resp.assert_status_is_ok();

        assert_eq!(
            *calls.lock().await,
            vec!["firewall:1.2.3.4", "storage:1.2.3.4"]
        );

        let actions = services.store.get_actions().await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].ip, "1.2.3.4");
        assert_eq!(actions[0].last_event, "R");
        assert_eq!(actions[0].attempt_count, 1);
        // The firewall entry also records the block transition.
        assert_eq!(actions[0].status, "blocked");
        assert_eq!(actions[0].block_count, 1);
    }

    #[tokio::test]
    async fn unknown_path_is_rejected_without_state_changes() {
        let services = services_from_yaml(BASE_CONFIG).await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry = recording_registry(&calls, &[("fw", "firewall", false)]);

        let app = crate::event_app(&services, registry);
        let client = TestClient::new(app);

        let resp = client
            .post("/other-events")
            .body_json(&json!({"ip": "1.2.3.4", "rule": "R"}))
            .send()
            .await;
        resp.assert_status(StatusCode::NOT_FOUND);

        assert!(calls.lock().await.is_empty());
        assert!(services.store.get_actions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let services = services_from_yaml(BASE_CONFIG).await;
        let registry = recording_registry(&Arc::new(Mutex::new(Vec::new())), &[]);

        let app = crate::event_app(&services, registry);
        let client = TestClient::new(app);

        let resp = client
            .post("/falco-events")
            .content_type("application/json")
            .body("{not json")
            .send()
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn threshold_gates_dispatch_until_reached() {
        let services = services_from_yaml(
            r#"
server:
  aliases:
    "/falco-events": "primary"
scenarios:
  - name: brute force
    falco_rule: R
    conditions:
      trigger_count: 3
      time_window: 5m
    actioners:
      - name: fw
"#,
        )
        .await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry = recording_registry(&calls, &[("fw", "firewall", false)]);

        let app = crate::event_app(&services, registry);
        let client = TestClient::new(app);

        for _ in 0..2 {
            client
                .post("/falco-events")
                .body_json(&json!({"ip": "5.5.5.5", "rule": "R"}))
                .send()
                .await
                .assert_status_is_ok();
        }
        assert!(calls.lock().await.is_empty());
        let actions = services.store.get_actions().await.unwrap();
        assert_eq!(actions[0].status, "received");
        assert_eq!(actions[0].block_count, 0);

        client
            .post("/falco-events")
            .body_json(&json!({"ip": "5.5.5.5", "rule": "R"}))
            .send()
            .await
            .assert_status_is_ok();

        assert_eq!(*calls.lock().await, vec!["firewall:5.5.5.5"]);
        let actions = services.store.get_actions().await.unwrap();
        assert_eq!(actions[0].status, "blocked");
        assert_eq!(actions[0].block_count, 1);
    }

    #[tokio::test]
    async fn failing_actioner_does_not_stop_the_rest() {
        let services = services_from_yaml(BASE_CONFIG).await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry =
            recording_registry(&calls, &[("fw", "firewall", true), ("st", "storage", false)]);

        let app = crate::event_app(&services, registry);
        let client = TestClient::new(app);

        let resp = client
            .post("/falco-events")
            .body_json(&json!({"ip": "1.2.3.4", "rule": "R"}))
            .send()
            .await;
        resp.assert_status_is_ok();

        assert_eq!(
            *calls.lock().await,
            vec!["firewall:1.2.3.4", "storage:1.2.3.4"]
        );

        // Only the successful storage actioner left a secondary record,
        // so no block was logged.
        let actions = services.store.get_actions().await.unwrap();
        assert_eq!(actions[0].status, "received");
        assert_eq!(actions[0].block_count, 0);
    }

    #[tokio::test]
    async fn unknown_actioner_names_are_skipped() {
        let services = services_from_yaml(
            r#"
server:
  aliases:
    "/falco-events": "primary"
scenarios:
  - name: respond
    falco_rule: R
    actioners:
      - name: missing
      - name: st
"#,
        )
        .await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry = recording_registry(&calls, &[("st", "storage", false)]);

        let app = crate::event_app(&services, registry);
        let client = TestClient::new(app);

        client
            .post("/falco-events")
            .body_json(&json!({"ip": "1.2.3.4", "rule": "R"}))
            .send()
            .await
            .assert_status_is_ok();

        assert_eq!(*calls.lock().await, vec!["storage:1.2.3.4"]);
    }

    #[tokio::test]
    async fn events_without_ip_are_acknowledged_but_ignored() {
        let services = services_from_yaml(BASE_CONFIG).await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry = recording_registry(&calls, &[("fw", "firewall", false)]);

        let app = crate::event_app(&services, registry);
        let client = TestClient::new(app);

        client
            .post("/falco-events")
            .body_json(&json!({"ip": "", "rule": "R"}))
            .send()
            .await
            .assert_status_is_ok();

        assert!(calls.lock().await.is_empty());
        assert!(services.store.get_actions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_matching_rule_runs_no_scenario() {
        let services = services_from_yaml(BASE_CONFIG).await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry = recording_registry(&calls, &[("fw", "firewall", false)]);

        let app = crate::event_app(&services, registry);
        let client = TestClient::new(app);

        client
            .post("/falco-events")
            .body_json(&json!({"ip": "1.2.3.4", "rule": "Other"}))
            .send()
            .await
            .assert_status_is_ok();

        assert!(calls.lock().await.is_empty());
        // The observation itself is still recorded.
        let actions = services.store.get_actions().await.unwrap();
        assert_eq!(actions[0].attempt_count, 1);
        assert_eq!(actions[0].status, "received");
    }
}
