pub mod openai;
pub mod vertex;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::config::{ConfigError, ProviderConfig};

/// One capability the backend may invoke (e.g. `{"type": "web_search_preview"}`).
///
/// The shape is backend-specific; each adapter translates it into its own
/// native tool declaration.
pub type ToolSpec = Map<String, Value>;

/// Trait for AI backends
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Generate a plain-text answer for `input_text`.
    ///
    /// Returns an empty string when the backend answered successfully but no
    /// text could be found in its response.
    async fn generate(
        &self,
        input_text: &str,
        tools: &[ToolSpec],
        instructions: &str,
    ) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to reach {provider} API: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API authentication failed, check your credentials: {message}")]
    Authentication {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} API rate limit or quota exceeded: {message}")]
    RateLimited {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} API returned HTTP {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("failed to parse {provider} API response: {detail}")]
    InvalidResponse {
        provider: &'static str,
        detail: String,
    },

    #[error("tool #{index} is not a valid {provider} tool declaration: {reason}")]
    InvalidTool {
        provider: &'static str,
        index: usize,
        reason: String,
    },
}

/// Which backend the process talks to. Resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Vertex,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Vertex => "vertex",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "vertex" => Ok(ProviderKind::Vertex),
            _ => Err(ConfigError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Construct the adapter selected by the configuration.
pub fn build_provider(config: &ProviderConfig) -> Box<dyn AiProvider> {
    match config {
        ProviderConfig::OpenAi(cfg) => Box::new(openai::OpenAiProvider::new(cfg.clone())),
        ProviderConfig::Vertex(cfg) => Box::new(vertex::VertexProvider::new(cfg.clone())),
    }
}

/// Turn a non-2xx backend response into a `ProviderError`.
///
/// Both backends report errors as `{"error": {"message": ..., ...}}`; the
/// status code alone decides between auth, quota and generic failures.
pub(crate) fn classify_http_error(
    provider: &'static str,
    status: reqwest::StatusCode,
    body: &str,
) -> ProviderError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| truncate(body, 500).to_string());

    match status.as_u16() {
        401 | 403 => ProviderError::Authentication { provider, message },
        429 => ProviderError::RateLimited { provider, message },
        code => ProviderError::Api {
            provider,
            status: code,
            message,
        },
    }
}

/// Cut `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_provider_kind_case_insensitive() {
        assert_eq!("vertex".parse::<ProviderKind>().unwrap(), ProviderKind::Vertex);
        assert_eq!("Vertex".parse::<ProviderKind>().unwrap(), ProviderKind::Vertex);
        assert_eq!("OPENAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
    }

    #[test]
    fn test_provider_kind_unknown() {
        let err = "claude".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProvider(ref name) if name == "claude"));
        assert!(err.to_string().contains("claude"));
    }

    #[test]
    fn test_provider_kind_not_trimmed() {
        assert!("".parse::<ProviderKind>().is_err());
        assert!(" openai".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_classify_auth_error() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        let err = classify_http_error("openai", StatusCode::UNAUTHORIZED, body);
        match err {
            ProviderError::Authentication { provider, message } => {
                assert_eq!(provider, "openai");
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("Expected authentication error, got: {:?}", other),
        }
    }

    #[test]
    fn test_classify_quota_error() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = classify_http_error("vertex", StatusCode::TOO_MANY_REQUESTS, body);
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[test]
    fn test_classify_non_json_error() {
        let err = classify_http_error("openai", StatusCode::BAD_GATEWAY, "upstream down");
        match err {
            ProviderError::Api { status, message, .. } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("Expected generic API error, got: {:?}", other),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("short", 100), "short");
    }
}
