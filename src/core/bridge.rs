use std::time::Instant;

use tracing::{info, warn};

use crate::core::config::BridgeConfig;
use crate::providers::{AiProvider, ProviderError, ToolSpec, build_provider};

/// Turns one mention into one reply using the configured backend.
///
/// Holds the provider selected at startup together with the tool list and
/// instructions that accompany every call.
pub struct MentionBridge {
    provider: Box<dyn AiProvider>,
    tools: Vec<ToolSpec>,
    instructions: String,
}

impl MentionBridge {
    pub fn new(provider: Box<dyn AiProvider>, tools: Vec<ToolSpec>, instructions: String) -> Self {
        Self {
            provider,
            tools,
            instructions,
        }
    }

    /// Build the bridge and its provider from a loaded configuration
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            build_provider(&config.provider),
            config.tools.clone(),
            config.instructions.clone(),
        )
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Call the backend once for `text`, propagating any failure.
    pub async fn generate(&self, text: &str) -> Result<String, ProviderError> {
        let start = Instant::now();
        let result = self
            .provider
            .generate(text, &self.tools, &self.instructions)
            .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(reply) => info!(
                provider = self.provider.name(),
                reply_len = reply.len(),
                duration_ms,
                "generation complete"
            ),
            Err(e) => warn!(
                provider = self.provider.name(),
                duration_ms,
                err = %e,
                "generation failed"
            ),
        }
        result
    }

    /// Reply text for a mention. Backend failures become a readable message
    /// instead of an error.
    pub async fn reply_to(&self, text: &str) -> String {
        match self.generate(text).await {
            Ok(reply) => reply,
            Err(e) => format!("An error occurred: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records every call and answers with a canned result
    struct ScriptedProvider {
        answer: Option<String>,
        calls: Mutex<Vec<(String, usize, String)>>,
    }

    impl ScriptedProvider {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AiProvider for Arc<ScriptedProvider> {
        async fn generate(
            &self,
            input_text: &str,
            tools: &[ToolSpec],
            instructions: &str,
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push((
                input_text.to_string(),
                tools.len(),
                instructions.to_string(),
            ));
            match &self.answer {
                Some(answer) => Ok(answer.clone()),
                None => Err(ProviderError::RateLimited {
                    provider: "scripted",
                    message: "slow down".to_string(),
                }),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn web_search() -> Vec<ToolSpec> {
        vec![json!({"type": "web_search_preview"}).as_object().unwrap().clone()]
    }

    #[tokio::test]
    async fn test_reply_passes_text_tools_and_instructions() {
        let provider = Arc::new(ScriptedProvider::answering("hi there"));
        let bridge = MentionBridge::new(
            Box::new(provider.clone()),
            web_search(),
            "Be concise.".to_string(),
        );

        let reply = bridge.reply_to("<@U123> hello").await;
        assert_eq!(reply, "hi there");

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("<@U123> hello".to_string(), 1, "Be concise.".to_string()));
    }

    #[tokio::test]
    async fn test_empty_answer_is_not_an_error() {
        let provider = Arc::new(ScriptedProvider::answering(""));
        let bridge = MentionBridge::new(Box::new(provider), Vec::new(), String::new());
        assert_eq!(bridge.generate("hello").await.unwrap(), "");
        assert_eq!(bridge.reply_to("hello").await, "");
    }

    #[tokio::test]
    async fn test_failure_becomes_message() {
        let provider = Arc::new(ScriptedProvider::failing());
        let bridge = MentionBridge::new(Box::new(provider.clone()), Vec::new(), String::new());

        let reply = bridge.reply_to("hello").await;
        assert!(
            reply.starts_with("An error occurred: "),
            "Unexpected reply: {}",
            reply
        );
        assert!(reply.contains("slow down"));
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_propagates_error() {
        let provider = Arc::new(ScriptedProvider::failing());
        let bridge = MentionBridge::new(Box::new(provider), Vec::new(), String::new());
        assert!(matches!(
            bridge.generate("hello").await,
            Err(ProviderError::RateLimited { .. })
        ));
    }
}
