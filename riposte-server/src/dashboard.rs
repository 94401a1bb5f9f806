use chrono::{DateTime, Utc};
use poem::error::InternalServerError;
use poem::web::{Data, Html};
use poem::handler;
use riposte_core::Services;
use riposte_db_entities::IpAction;

#[handler]
pub async fn dashboard_endpoint(services: Data<&Services>) -> poem::Result<Html<String>> {
    let actions = services
        .store
        .get_actions()
        .await
        .map_err(InternalServerError)?;
    Ok(Html(render_dashboard(&actions)))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn render_dashboard(actions: &[IpAction::Model]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>Riposte</title></head>\n<body>\n\
         <h1>IP actions</h1>\n<table border=\"1\">\n\
         <tr><th>IP</th><th>Last event</th><th>Attempts</th><th>Last attempt</th>\
         <th>Blocked at</th><th>Unblocked at</th><th>Status</th><th>Blocks</th></tr>\n",
    );

    for action in actions {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&action.ip),
            escape(&action.last_event),
            action.attempt_count,
            format_time(Some(action.last_attempt_time)),
            format_time(action.block_time),
            format_time(action.unblock_time),
            escape(&action.status),
            action.block_count,
        ));
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}
