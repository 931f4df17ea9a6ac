use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::core::bridge::MentionBridge;
use crate::core::config::BridgeConfig;
use crate::slack::SlackClient;
use crate::slack::server::{AppState, router};

pub async fn run(config: BridgeConfig, port: Option<u16>) -> Result<()> {
    let Some(slack) = config.slack.as_ref() else {
        bail!(
            "Slack is not configured.\n  \
             Hint: export SLACK_BOT_TOKEN=xoxb-... SLACK_SIGNING_SECRET=..."
        );
    };

    let bridge = MentionBridge::from_config(&config);
    let state = AppState {
        bridge: Arc::new(bridge),
        sink: Arc::new(SlackClient::new(slack)),
        signing_secret: Arc::from(slack.signing_secret.as_str()),
    };

    let port = port.unwrap_or(config.port);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    info!(
        provider = %config.provider.kind(),
        model = config.provider.model(),
        tools = config.tools.len(),
        port,
        "listening for Slack events on /slack/events"
    );

    axum::serve(listener, router(state))
        .await
        .context("Slack events server failed")?;
    Ok(())
}
