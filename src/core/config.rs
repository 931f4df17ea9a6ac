use serde_json::Value;
use thiserror::Error;

use crate::providers::{ProviderKind, ToolSpec};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_VERTEX_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_VERTEX_LOCATION: &str = "us-central1";
const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
const DEFAULT_PORT: u16 = 3000;

/// Tools sent with every generation unless `BRIDGE_TOOLS` says otherwise
const DEFAULT_TOOLS: &str = r#"[{"type": "web_search_preview"}]"#;

/// Startup-time configuration failure. The process must not start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported AI provider: '{0}'. Must be one of: openai, vertex")]
    UnsupportedProvider(String),

    #[error("{var} is not set (required for {context})\n  Hint: export {var}=...")]
    MissingVar {
        var: &'static str,
        context: &'static str,
    },

    #[error("BRIDGE_TOOLS must be a JSON array of objects: {0}")]
    InvalidTools(String),

    #[error("Invalid PORT '{0}': must be a number between 1 and 65535")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    /// Pre-obtained OAuth access token, sent as a bearer token
    pub access_token: String,
    pub model: String,
    pub base_url: String,
}

/// Backend selection plus that backend's credentials
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiConfig),
    Vertex(VertexConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::OpenAi(_) => ProviderKind::OpenAi,
            ProviderConfig::Vertex(_) => ProviderKind::Vertex,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAi(cfg) => &cfg.model,
            ProviderConfig::Vertex(cfg) => &cfg.model,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub signing_secret: String,
    pub api_url: String,
}

/// Process-wide configuration, assembled once at startup
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub provider: ProviderConfig,
    /// Passed unchanged to every generation call
    pub instructions: String,
    pub tools: Vec<ToolSpec>,
    /// Only needed by `serve`; absent when neither Slack variable is set
    pub slack: Option<SlackConfig>,
    pub port: u16,
}

impl BridgeConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset, except for `INSTRUCTIONS` where
    /// an empty string is meaningful and `AI_PROVIDER` where it is rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Resolve the provider name before touching anything else. An empty
        // AI_PROVIDER is an unsupported name, not a missing one.
        let kind: ProviderKind = match lookup("AI_PROVIDER") {
            Some(name) => name.parse()?,
            None => ProviderKind::default(),
        };

        let provider = match kind {
            ProviderKind::OpenAi => ProviderConfig::OpenAi(OpenAiConfig {
                api_key: var("OPENAI_API_KEY").ok_or(ConfigError::MissingVar {
                    var: "OPENAI_API_KEY",
                    context: "AI_PROVIDER=openai",
                })?,
                model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: var("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            }),
            ProviderKind::Vertex => {
                let location =
                    var("VERTEX_LOCATION").unwrap_or_else(|| DEFAULT_VERTEX_LOCATION.to_string());
                let base_url = var("VERTEX_BASE_URL")
                    .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com/v1", location));
                ProviderConfig::Vertex(VertexConfig {
                    project_id: var("VERTEX_PROJECT_ID").ok_or(ConfigError::MissingVar {
                        var: "VERTEX_PROJECT_ID",
                        context: "AI_PROVIDER=vertex",
                    })?,
                    access_token: var("VERTEX_ACCESS_TOKEN").ok_or(ConfigError::MissingVar {
                        var: "VERTEX_ACCESS_TOKEN",
                        context: "AI_PROVIDER=vertex",
                    })?,
                    model: var("VERTEX_MODEL")
                        .unwrap_or_else(|| DEFAULT_VERTEX_MODEL.to_string()),
                    location,
                    base_url,
                })
            }
        };

        let instructions = lookup("INSTRUCTIONS").unwrap_or_default();

        let tools = parse_tools(var("BRIDGE_TOOLS").as_deref().unwrap_or(DEFAULT_TOOLS))?;

        let slack = match (var("SLACK_BOT_TOKEN"), var("SLACK_SIGNING_SECRET")) {
            (Some(bot_token), Some(signing_secret)) => Some(SlackConfig {
                bot_token,
                signing_secret,
                api_url: var("SLACK_API_URL").unwrap_or_else(|| DEFAULT_SLACK_API_URL.to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingVar {
                    var: "SLACK_SIGNING_SECRET",
                    context: "SLACK_BOT_TOKEN",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingVar {
                    var: "SLACK_BOT_TOKEN",
                    context: "SLACK_SIGNING_SECRET",
                });
            }
        };

        let port = match var("PORT") {
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => return Err(ConfigError::InvalidPort(raw)),
            },
            None => DEFAULT_PORT,
        };

        Ok(Self {
            provider,
            instructions,
            tools,
            slack,
            port,
        })
    }
}

/// Parse a JSON array of tool objects, keeping their order
pub fn parse_tools(raw: &str) -> Result<Vec<ToolSpec>, ConfigError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidTools(e.to_string()))?;

    let Value::Array(items) = value else {
        return Err(ConfigError::InvalidTools("expected a JSON array".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(ConfigError::InvalidTools(format!(
                "item {} is not an object: {}",
                i, other
            ))),
        })
        .collect()
}

/// Show only the first few characters of a secret
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{}... ({} chars)", prefix, secret.chars().count())
}
