// Gemini ModelClient adapter (C3 production implementation).
//
// Uses the streamGenerateContent SSE endpoint and aggregates the stream into
// a single ModelResponse, mirroring the teacher's
// OpenAIProtocolLlmProvider::chat_completion_stream aggregation approach but
// collapsed to the non-streaming ModelClient::generate contract. Grounded
// web search is requested via the `google_search` tool when
// `GenerateOptions::grounded_search` is set.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use legal_core::{
    Citation, GenerateOptions, ModelClient, ModelMessage, ModelResponse, ModelUsage, OrchestratorError, Result,
    ToolCall, ToolDeclaration,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Clone)]
pub struct GeminiModelClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiModelClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: model.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| OrchestratorError::configuration("GEMINI_API_KEY environment variable not set"))?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(api_key: impl Into<String>, model: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self { client: Client::new(), api_key: api_key.into(), api_base: api_base.into(), model: model.into() }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:streamGenerateContent?alt=sse&key={}", self.api_base, self.model, self.api_key)
    }

    fn convert_messages(messages: &[ModelMessage]) -> Vec<GeminiContent> {
        messages
            .iter()
            .filter(|m| m.role != legal_core::traits::ModelMessageRole::System)
            .map(|m| {
                let role = match m.role {
                    legal_core::traits::ModelMessageRole::User | legal_core::traits::ModelMessageRole::Tool => "user",
                    legal_core::traits::ModelMessageRole::Assistant => "model",
                    legal_core::traits::ModelMessageRole::System => unreachable!(),
                };
                let parts = if let Some(tool_calls) = &m.tool_calls {
                    tool_calls
                        .iter()
                        .map(|tc| GeminiPart::FunctionCall { function_call: GeminiFunctionCall { name: tc.name.clone(), args: tc.arguments.clone() } })
                        .collect()
                } else if let Some(tool_call_id) = &m.tool_call_id {
                    vec![GeminiPart::FunctionResponse {
                        function_response: GeminiFunctionResponse {
                            name: tool_call_id.clone(),
                            response: json!({ "result": m.content }),
                        },
                    }]
                } else {
                    vec![GeminiPart::Text { text: m.content.clone() }]
                };
                GeminiContent { role: role.to_string(), parts }
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDeclaration], grounded_search: bool) -> Option<Vec<GeminiTool>> {
        let mut out = Vec::new();
        if !tools.is_empty() {
            out.push(GeminiTool::FunctionDeclarations {
                function_declarations: tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration { name: t.name.clone(), description: t.description.clone(), parameters: t.parameter_schema.clone() })
                    .collect(),
            });
        }
        if grounded_search {
            out.push(GeminiTool::GoogleSearch { google_search: json!({}) });
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[async_trait]
impl ModelClient for GeminiModelClient {
    async fn generate(
        &self,
        system: &str,
        messages: &[ModelMessage],
        tools: &[ToolDeclaration],
        options: &GenerateOptions,
    ) -> Result<ModelResponse> {
        if options.grounded_search && !tools.is_empty() {
            // Gemini rejects a request mixing function-calling tools with
            // google_search in the same call; grounded agents never carry
            // function tools in this catalog, but guard the invariant here
            // too since it would otherwise surface as an opaque 400.
            return Err(OrchestratorError::invalid_request(
                "grounded_search cannot be combined with function-calling tools in the same request",
            ));
        }

        let request = GeminiRequest {
            system_instruction: GeminiContent { role: "system".to_string(), parts: vec![GeminiPart::Text { text: system.to_string() }] },
            contents: Self::convert_messages(messages),
            tools: Self::convert_tools(tools, options.grounded_search),
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
                max_output_tokens: options.max_output_tokens,
                response_mime_type: options.response_mime.clone(),
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OrchestratorError::upstream_unavailable(format!("gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OrchestratorError::upstream_unavailable(format!("gemini returned {status}: {body}")));
        }

        let text_parts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let tool_requests: Arc<Mutex<Vec<ToolCall>>> = Arc::new(Mutex::new(Vec::new()));
        let citations: Arc<Mutex<Vec<Citation>>> = Arc::new(Mutex::new(Vec::new()));
        let finish_reason: Arc<Mutex<String>> = Arc::new(Mutex::new("stop".to_string()));
        let usage: Arc<Mutex<ModelUsage>> = Arc::new(Mutex::new(ModelUsage::default()));

        let mut stream = response.bytes_stream().eventsource();
        while let Some(event) = stream.next().await {
            let event = event.map_err(|e| OrchestratorError::upstream_unavailable(format!("gemini stream error: {e}")))?;
            if event.data.trim().is_empty() {
                continue;
            }
            let chunk: GeminiStreamChunk = serde_json::from_str(&event.data)
                .map_err(|e| OrchestratorError::upstream_unavailable(format!("malformed gemini chunk: {e}")))?;

            if let Some(usage_meta) = chunk.usage_metadata {
                let mut u = usage.lock().unwrap();
                u.prompt_tokens = usage_meta.prompt_token_count;
                u.completion_tokens = usage_meta.candidates_token_count;
                u.total_tokens = usage_meta.total_token_count;
            }

            for candidate in chunk.candidates {
                if let Some(reason) = candidate.finish_reason {
                    *finish_reason.lock().unwrap() = reason;
                }
                if let Some(grounding) = candidate.grounding_metadata {
                    let mut c = citations.lock().unwrap();
                    for chunk in grounding.grounding_chunks {
                        if let Some(web) = chunk.web {
                            c.push(Citation { title: web.title, uri: web.uri, start: None, end: None });
                        }
                    }
                }
                let Some(content) = candidate.content else { continue };
                for part in content.parts {
                    match part {
                        GeminiPart::Text { text } => text_parts.lock().unwrap().push(text),
                        GeminiPart::FunctionCall { function_call } => {
                            let mut pending = tool_requests.lock().unwrap();
                            let idx = pending.len();
                            pending.push(ToolCall { id: format!("gemini_{idx}"), name: function_call.name, arguments: function_call.args });
                        }
                        GeminiPart::FunctionResponse { .. } => {}
                    }
                }
            }
        }

        Ok(ModelResponse {
            content_parts: Arc::try_unwrap(text_parts).map(|m| m.into_inner().unwrap()).unwrap_or_default(),
            tool_requests: Arc::try_unwrap(tool_requests).map(|m| m.into_inner().unwrap()).unwrap_or_default(),
            citations: Arc::try_unwrap(citations).map(|m| m.into_inner().unwrap()).unwrap_or_default(),
            finish_reason: Arc::try_unwrap(finish_reason).map(|m| m.into_inner().unwrap()).unwrap_or_else(|_| "stop".to_string()),
            usage: Arc::try_unwrap(usage).map(|m| m.into_inner().unwrap()).unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for GeminiModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModelClient")
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Gemini wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum GeminiPart {
    Text { text: String },
    FunctionCall { function_call: GeminiFunctionCall },
    FunctionResponse { function_response: GeminiFunctionResponse },
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum GeminiTool {
    FunctionDeclarations { function_declarations: Vec<GeminiFunctionDeclaration> },
    GoogleSearch { google_search: Value },
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingChunk {
    #[serde(default)]
    web: Option<GeminiWebChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiWebChunk {
    uri: String,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
    #[serde(default)]
    total_token_count: Option<u32>,
}
