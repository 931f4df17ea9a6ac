use crate::core::config::{BridgeConfig, ProviderConfig, redact};
use crate::core::style;

pub fn run(config: &BridgeConfig) {
    println!("{}", style::header("CONFIG"));
    println!();
    println!("{}", style::summary_line("provider", config.provider.kind().as_str()));
    match &config.provider {
        ProviderConfig::OpenAi(cfg) => {
            println!("{}", style::summary_line("model", &cfg.model));
            println!("{}", style::summary_line("base url", &cfg.base_url));
            println!("{}", style::summary_line("api key", &redact(&cfg.api_key)));
        }
        ProviderConfig::Vertex(cfg) => {
            println!("{}", style::summary_line("model", &cfg.model));
            println!("{}", style::summary_line("project", &cfg.project_id));
            println!("{}", style::summary_line("location", &cfg.location));
            println!("{}", style::summary_line("base url", &cfg.base_url));
            println!("{}", style::summary_line("access token", &redact(&cfg.access_token)));
        }
    }

    let instructions = if config.instructions.is_empty() {
        style::hint("(none)")
    } else {
        format!("{} chars", config.instructions.chars().count())
    };
    println!("{}", style::summary_line("instructions", &instructions));

    let tools = serde_json::to_string(&config.tools).unwrap_or_else(|_| "?".to_string());
    println!("{}", style::summary_line("tools", &tools));

    match &config.slack {
        Some(slack) => {
            println!("{}", style::summary_line("slack api", &slack.api_url));
            println!("{}", style::summary_line("slack bot token", &redact(&slack.bot_token)));
            println!(
                "{}",
                style::summary_line("slack signing", &redact(&slack.signing_secret))
            );
        }
        None => println!("{}", style::summary_line("slack", &style::hint("(not configured)"))),
    }
    println!("{}", style::summary_line("port", &config.port.to_string()));
}
