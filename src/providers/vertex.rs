use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{AiProvider, ProviderError, ToolSpec, classify_http_error, truncate};
use crate::core::config::VertexConfig;

const PROVIDER: &str = "vertex";

const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Vertex AI `generateContent` provider (Gemini models)
pub struct VertexProvider {
    client: Client,
    config: VertexConfig,
}

impl VertexProvider {
    pub fn new(config: VertexConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id,
            self.config.location,
            self.config.model
        )
    }
}

// ---------- API request/response types ----------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    max_output_tokens: u32,
    response_modalities: [&'static str; 1],
}

/// Native Vertex tool declaration. A `ToolSpec` is spread into this type
/// key by key; keys it does not know are rejected.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Tool {
    #[serde(default, alias = "function_declarations", skip_serializing_if = "Option::is_none")]
    function_declarations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retrieval: Option<Value>,
    #[serde(default, alias = "google_search", skip_serializing_if = "Option::is_none")]
    google_search: Option<Value>,
    #[serde(default, alias = "google_search_retrieval", skip_serializing_if = "Option::is_none")]
    google_search_retrieval: Option<Value>,
    #[serde(default, alias = "enterprise_web_search", skip_serializing_if = "Option::is_none")]
    enterprise_web_search: Option<Value>,
    #[serde(default, alias = "google_maps", skip_serializing_if = "Option::is_none")]
    google_maps: Option<Value>,
    #[serde(default, alias = "url_context", skip_serializing_if = "Option::is_none")]
    url_context: Option<Value>,
    #[serde(default, alias = "code_execution", skip_serializing_if = "Option::is_none")]
    code_execution: Option<Value>,
}

impl Tool {
    /// No capability declared, e.g. `{}` or `{"google_search": null}`
    fn is_empty(&self) -> bool {
        self.function_declarations.is_none()
            && self.retrieval.is_none()
            && self.google_search.is_none()
            && self.google_search_retrieval.is_none()
            && self.enterprise_web_search.is_none()
            && self.google_maps.is_none()
            && self.url_context.is_none()
            && self.code_execution.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

fn convert_tools(tools: &[ToolSpec]) -> Result<Vec<Tool>, ProviderError> {
    tools
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let invalid = |reason: String| ProviderError::InvalidTool {
                provider: PROVIDER,
                index,
                reason,
            };
            let tool: Tool = serde_json::from_value(Value::Object(spec.clone()))
                .map_err(|e| invalid(e.to_string()))?;
            if tool.is_empty() {
                return Err(invalid("declares no capability".to_string()));
            }
            Ok(tool)
        })
        .collect()
}

/// Instructions and input stay two separate parts, in that order.
fn build_request<'a>(
    input_text: &'a str,
    tools: Vec<Tool>,
    instructions: &'a str,
) -> ApiRequest<'a> {
    ApiRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part { text: instructions }, Part { text: input_text }],
        }],
        tools,
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            response_modalities: ["TEXT"],
        },
    }
}

/// Text of the first part of the first candidate, or "".
fn first_candidate_text(response: &ApiResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.first())
        .and_then(|part| part.text.clone())
        .unwrap_or_default()
}

// ---------- AiProvider implementation ----------

#[async_trait]
impl AiProvider for VertexProvider {
    async fn generate(
        &self,
        input_text: &str,
        tools: &[ToolSpec],
        instructions: &str,
    ) -> Result<String, ProviderError> {
        let vertex_tools = convert_tools(tools)?;
        let api_request = build_request(input_text, vertex_tools, instructions);

        debug!(
            model = %self.config.model,
            project = %self.config.project_id,
            location = %self.config.location,
            tools = tools.len(),
            "sending Vertex generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.access_token)
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

        let text = first_candidate_text(&api_response);
        debug!(
            candidates = api_response.candidates.len(),
            text_len = text.len(),
            "Vertex response received"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> ToolSpec {
        value.as_object().unwrap().clone()
    }

    fn parse(value: Value) -> ApiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_two_parts_in_order() {
        let request = build_request("what time is it?", Vec::new(), "answer in French");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["contents"],
            json!([{
                "role": "user",
                "parts": [{"text": "answer in French"}, {"text": "what time is it?"}]
            }])
        );
    }

    #[test]
    fn test_two_parts_with_empty_instructions() {
        let request = build_request("hi", Vec::new(), "");
        let parts = &request.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text, "");
        assert_eq!(parts[1].text, "hi");
    }

    #[test]
    fn test_fixed_generation_config() {
        let request = build_request("hi", Vec::new(), "");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["generationConfig"],
            json!({
                "temperature": 0.7,
                "topP": 0.95,
                "maxOutputTokens": 8192,
                "responseModalities": ["TEXT"]
            })
        );
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_convert_known_tools() {
        let tools = vec![
            spec(json!({"google_search": {}})),
            spec(json!({"functionDeclarations": [{"name": "lookup", "description": "Find a thing"}]})),
        ];
        let converted = convert_tools(&tools).unwrap();
        let value = serde_json::to_value(&converted).unwrap();
        assert_eq!(
            value,
            json!([
                {"googleSearch": {}},
                {"functionDeclarations": [{"name": "lookup", "description": "Find a thing"}]}
            ])
        );
    }

    #[test]
    fn test_convert_unknown_tool_fails() {
        let tools = vec![
            spec(json!({"google_search": {}})),
            spec(json!({"type": "web_search_preview"})),
        ];
        let err = convert_tools(&tools).unwrap_err();
        match err {
            ProviderError::InvalidTool { index, reason, .. } => {
                assert_eq!(index, 1);
                assert!(reason.contains("type"), "Unexpected reason: {}", reason);
            }
            other => panic!("Expected invalid tool error, got: {:?}", other),
        }
    }

    #[test]
    fn test_convert_empty_tool_fails() {
        for empty in [json!({"google_search": null}), json!({})] {
            let tools = vec![spec(empty)];
            match convert_tools(&tools).unwrap_err() {
                ProviderError::InvalidTool { index, reason, .. } => {
                    assert_eq!(index, 0);
                    assert_eq!(reason, "declares no capability");
                }
                other => panic!("Expected invalid tool error, got: {:?}", other),
            }
        }
    }

    #[test]
    fn test_no_candidates_returns_empty() {
        let response = parse(json!({"candidates": []}));
        assert_eq!(first_candidate_text(&response), "");

        let response = parse(json!({"usageMetadata": {"promptTokenCount": 3}}));
        assert_eq!(first_candidate_text(&response), "");
    }

    #[test]
    fn test_candidate_without_parts() {
        let response = parse(json!({"candidates": [{"content": {"role": "model"}, "finishReason": "SAFETY"}]}));
        assert_eq!(first_candidate_text(&response), "");

        let response = parse(json!({"candidates": [{"finishReason": "SAFETY"}]}));
        assert_eq!(first_candidate_text(&response), "");
    }

    #[test]
    fn test_first_part_text() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "answer"}, {"text": "more"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(first_candidate_text(&response), "answer");
    }

    #[test]
    fn test_non_text_first_part() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [{"functionCall": {"name": "lookup", "args": {}}}]}
            }]
        }));
        assert_eq!(first_candidate_text(&response), "");
    }
}
