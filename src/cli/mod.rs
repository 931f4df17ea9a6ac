pub mod ask;
pub mod config;
pub mod serve;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::core::config::BridgeConfig;

#[derive(Parser)]
#[command(name = "mentionbot")]
#[command(about = "Answer Slack mentions with an OpenAI or Vertex AI backend")]
#[command(version)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the Slack Events API endpoint (POST /slack/events)
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message to the configured backend and print the reply
    Ask {
        /// Message text, as it would arrive in a mention
        text: String,
    },

    /// Show the resolved configuration (secrets redacted)
    Config,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = BridgeConfig::from_env().context("Invalid configuration")?;

        match self.command {
            Commands::Serve { port } => serve::run(config, port).await,
            Commands::Ask { text } => ask::run(config, text).await,
            Commands::Config => {
                config::run(&config);
                Ok(())
            }
        }
    }
}
