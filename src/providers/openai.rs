use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AiProvider, ProviderError, ToolSpec, classify_http_error, truncate};
use crate::core::config::OpenAiConfig;

const PROVIDER: &str = "openai";

/// OpenAI Responses API provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.config.base_url.trim_end_matches('/'))
    }
}

// ---------- API request/response types ----------

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    tools: &'a [ToolSpec],
    tool_choice: &'static str,
    input: &'a str,
    instructions: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

/// One entry of the response `output` list. Tool calls and reasoning
/// traces may precede the assistant message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum OutputItem {
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        content: Vec<ContentBlock>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(rename = "refusal")]
    Refusal { refusal: String },
    #[serde(other)]
    Other,
}

fn build_request<'a>(
    model: &'a str,
    input_text: &'a str,
    tools: &'a [ToolSpec],
    instructions: &'a str,
) -> ApiRequest<'a> {
    ApiRequest {
        model,
        tools,
        tool_choice: "auto",
        input: input_text,
        instructions,
    }
}

/// Text of the first content block of the first message item, or "".
fn first_message_text(output: &[OutputItem]) -> String {
    for item in output {
        if let OutputItem::Message { content } = item {
            return match content.first() {
                Some(ContentBlock::OutputText { text }) => text.clone(),
                Some(ContentBlock::Refusal { refusal }) => refusal.clone(),
                Some(ContentBlock::Other) | None => String::new(),
            };
        }
    }
    String::new()
}

// ---------- AiProvider implementation ----------

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn generate(
        &self,
        input_text: &str,
        tools: &[ToolSpec],
        instructions: &str,
    ) -> Result<String, ProviderError> {
        let api_request = build_request(&self.config.model, input_text, tools, instructions);

        debug!(
            model = %self.config.model,
            tools = tools.len(),
            input_len = input_text.len(),
            "sending OpenAI responses request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                provider: PROVIDER,
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ProviderError::Http {
            provider: PROVIDER,
            source,
        })?;

        if !status.is_success() {
            return Err(classify_http_error(PROVIDER, status, &body));
        }

        let api_response: ApiResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
                provider: PROVIDER,
                detail: format!("{}: {}", e, truncate(&body, 200)),
            })?;

        let text = first_message_text(&api_response.output);
        debug!(
            output_items = api_response.output.len(),
            text_len = text.len(),
            "OpenAI response received"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
