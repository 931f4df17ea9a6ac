use anyhow::{Context, Result};

use crate::core::bridge::MentionBridge;
use crate::core::config::BridgeConfig;
use crate::core::style;

pub async fn run(config: BridgeConfig, text: String) -> Result<()> {
    let bridge = MentionBridge::from_config(&config);

    eprintln!(
        "{}",
        style::provider_header(bridge.provider_name(), config.provider.model())
    );

    let reply = bridge
        .generate(&text)
        .await
        .with_context(|| format!("{} backend call failed", bridge.provider_name()))?;

    if reply.is_empty() {
        eprintln!("{}", style::warning("Backend returned no text."));
        return Ok(());
    }

    println!("{}", reply);
    Ok(())
}
