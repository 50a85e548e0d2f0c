//! Google Gemini provider over the REST `generateContent` endpoint.
//!
//! Gemini keeps the system instruction outside the message list, names the
//! assistant role `model`, and answers tool calls with `functionResponse`
//! parts keyed by function name rather than call id. Call ids are synthesized
//! here so the rest of the agent can stay id-based.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::agent::tool::ToolCall;
use crate::core::GroundingSource;
use crate::error::AgentError;
use crate::embedding::DEFAULT_GEMINI_BASE_URL;

/// Gemini generation provider.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    #[serde(default, skip_serializing)]
    thought: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Default, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl GeminiProvider {
    /// Creates a new provider from agent configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no key is configured, or
    /// [`AgentError::ApiRequest`] if the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let api_key = config.require_api_key()?.to_string();
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::ApiRequest {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })?;

        Ok(Self {
            http,
            api_key,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    /// Builds the `generateContent` body from our generic request.
    fn build_request(request: &ChatRequest) -> GenerateRequest {
        let mut system_parts = Vec::new();
        let mut contents: Vec<Content> = Vec::new();

        for (idx, msg) in request.messages.iter().enumerate() {
            match msg.role {
                Role::System => system_parts.push(text_part(&msg.content)),
                Role::User => {
                    let mut parts = Vec::new();
                    if let Some(ref image) = msg.image {
                        parts.push(Part {
                            inline_data: Some(InlineData {
                                mime_type: image.mime_type.clone(),
                                data: image.data.clone(),
                            }),
                            ..Part::default()
                        });
                    }
                    parts.push(text_part(&msg.content));
                    contents.push(content("user", parts));
                }
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(text_part(&msg.content));
                    }
                    parts.extend(msg.tool_calls.iter().map(|tc| Part {
                        function_call: Some(FunctionCall {
                            name: tc.name.clone(),
                            args: serde_json::from_str(&tc.arguments)
                                .unwrap_or_else(|_| json!({})),
                        }),
                        thought_signature: tc.signature.clone(),
                        ..Part::default()
                    }));
                    if !parts.is_empty() {
                        contents.push(content("model", parts));
                    }
                }
                Role::Tool => {
                    let name = function_name_for(&request.messages[..idx], msg);
                    contents.push(content(
                        "user",
                        vec![Part {
                            function_response: Some(FunctionResponse {
                                name,
                                response: json!({ "result": msg.content }),
                            }),
                            ..Part::default()
                        }],
                    ));
                }
            }
        }

        let mut tools = Vec::new();
        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|td| {
                    json!({
                        "name": td.name,
                        "description": td.description,
                        "parameters": td.parameters,
                    })
                })
                .collect();
            tools.push(json!({ "functionDeclarations": declarations }));
        }
        if request.web_search {
            tools.push(json!({ "googleSearch": {} }));
        }

        GenerateRequest {
            system_instruction: if system_parts.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: system_parts,
                })
            },
            contents,
            tools,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: request.json_mode.then_some("application/json"),
            },
        }
    }

    /// Converts a `generateContent` response into our generic response.
    fn parse_response(response: GenerateResponse) -> ChatResponse {
        let usage = response
            .usage_metadata
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            });

        let Some(candidate) = response.candidates.into_iter().next() else {
            return ChatResponse {
                usage,
                ..ChatResponse::default()
            };
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if part.thought {
                continue;
            }
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(fc) = part.function_call {
                tool_calls.push(ToolCall {
                    id: format!("call_{}", tool_calls.len()),
                    name: fc.name,
                    arguments: fc.args.to_string(),
                    signature: part.thought_signature,
                });
            }
        }

        let grounding = candidate
            .grounding_metadata
            .map(|g| {
                g.grounding_chunks
                    .into_iter()
                    .filter_map(|c| c.web)
                    .filter(|w| !w.uri.is_empty())
                    .map(|w| GroundingSource {
                        uri: w.uri,
                        title: w.title,
                    })
                    .collect()
            })
            .unwrap_or_default();

        ChatResponse {
            content: text,
            usage,
            tool_calls,
            finish_reason: candidate.finish_reason.map(|r| r.to_lowercase()),
            grounding,
        }
    }
}

fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_string()),
        ..Part::default()
    }
}

fn content(role: &str, parts: Vec<Part>) -> Content {
    Content {
        role: Some(role.to_string()),
        parts,
    }
}

/// Finds the function name of the assistant call a tool message answers.
fn function_name_for(previous: &[ChatMessage], tool_msg: &ChatMessage) -> String {
    let id = tool_msg.tool_call_id.as_deref().unwrap_or_default();
    previous
        .iter()
        .rev()
        .flat_map(|m| m.tool_calls.iter())
        .find(|tc| tc.id == id)
        .map(|tc| tc.name.clone())
        .unwrap_or_default()
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let body = Self::build_request(request);

        let response = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::ApiRequest {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::ApiRequest {
                message: format!("Gemini returned {status}: {detail}"),
                status: Some(status.as_u16()),
            });
        }

        let raw = response.text().await.map_err(|e| AgentError::ApiRequest {
            message: e.to_string(),
            status: None,
        })?;
        let parsed: GenerateResponse =
            serde_json::from_str(&raw).map_err(|e| AgentError::ResponseParse {
                message: e.to_string(),
                content: raw.clone(),
            })?;

        Ok(Self::parse_response(parsed))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{self, ImageAttachment};
    use crate::agent::tool::{CALCULATE_MATH, ToolSet};

    fn request(messages: Vec<ChatMessage>) -> ChatRequest {
        let tools = ToolSet::agent_tools();
        ChatRequest {
            model: "gemini-2.5-flash".to_string(),
            messages,
            temperature: None,
            max_tokens: Some(256),
            json_mode: false,
            tools: tools.definitions().to_vec(),
            web_search: tools.web_search(),
        }
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            GeminiProvider::new(&config),
            Err(AgentError::ApiKeyMissing)
        ));
    }

    #[test]
    fn test_endpoint() {
        let config = AgentConfig::builder()
            .api_key("k")
            .base_url("http://localhost:9000/")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = GeminiProvider::new(&config).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            provider.endpoint("gemini-2.5-flash"),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_build_request_layout() {
        let body = GeminiProvider::build_request(&request(vec![
            message::system_message("You are helpful."),
            message::user_message("hi"),
            message::assistant_message("hello"),
            message::user_message_with_image("what is this?", Some(ImageAttachment::jpeg("AAAA"))),
        ]));
        let json = serde_json::to_value(&body).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You are helpful.");
        assert_eq!(json["contents"].as_array().map_or(0, Vec::len), 3);
        assert_eq!(json["contents"][1]["role"], "model");
        let image_turn = &json["contents"][2];
        assert_eq!(image_turn["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(image_turn["parts"][1]["text"], "what is this?");
        assert!(json["tools"][0]["functionDeclarations"].is_array());
        assert!(json["tools"][1]["googleSearch"].is_object());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 256);
        assert!(json["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_build_request_tool_round_trip() {
        let call = ToolCall {
            id: "call_0".to_string(),
            name: CALCULATE_MATH.to_string(),
            arguments: r#"{"expression":"2+2"}"#.to_string(),
            signature: None,
        };
        let body = GeminiProvider::build_request(&request(vec![
            message::user_message("what is 2+2?"),
            message::assistant_tool_calls_message(vec![call]),
            message::tool_message("call_0", "Calculated Result: 4"),
        ]));
        let json = serde_json::to_value(&body).unwrap_or_else(|e| panic!("{e}"));

        let fc = &json["contents"][1]["parts"][0]["functionCall"];
        assert_eq!(fc["name"], CALCULATE_MATH);
        assert_eq!(fc["args"]["expression"], "2+2");
        assert!(json["contents"][1]["parts"][0].get("thoughtSignature").is_none());
        let fr = &json["contents"][2]["parts"][0]["functionResponse"];
        assert_eq!(fr["name"], CALCULATE_MATH);
        assert_eq!(fr["response"]["result"], "Calculated Result: 4");
    }

    #[test]
    fn test_thought_signature_survives_tool_round() {
        let raw = r#"{"candidates": [{"content": {"role": "model", "parts": [
            {"functionCall": {"name": "calculate_math", "args": {"expression": "1+1"}},
             "thoughtSignature": "SIG123"}
        ]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap_or_else(|e| panic!("{e}"));
        let response = GeminiProvider::parse_response(parsed);
        assert_eq!(response.tool_calls[0].signature.as_deref(), Some("SIG123"));

        let body = GeminiProvider::build_request(&request(vec![
            message::user_message("what is 1+1?"),
            message::assistant_tool_calls_message(response.tool_calls),
            message::tool_message("call_0", "Calculated Result: 2"),
        ]));
        let json = serde_json::to_value(&body).unwrap_or_else(|e| panic!("{e}"));
        let part = &json["contents"][1]["parts"][0];
        assert_eq!(part["functionCall"]["name"], CALCULATE_MATH);
        assert_eq!(part["thoughtSignature"], "SIG123");
    }

    #[test]
    fn test_json_mode_sets_mime_type() {
        let mut req = request(vec![message::user_message("analyze")]);
        req.json_mode = true;
        req.tools.clear();
        req.web_search = false;
        let json = serde_json::to_value(GeminiProvider::build_request(&req))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_parse_response_text_and_grounding() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking", "thought": true},
                    {"text": "The sky is blue "},
                    {"text": "[[Page 1]]."}
                ]},
                "finishReason": "STOP",
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://example.org", "title": "Example"}},
                    {"retrievedContext": {}}
                ]}
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap_or_else(|e| panic!("{e}"));
        let response = GeminiProvider::parse_response(parsed);
        assert_eq!(response.content, "The sky is blue [[Page 1]].");
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.grounding.len(), 1);
        assert_eq!(response.grounding[0].title, "Example");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[test]
    fn test_parse_response_function_calls() {
        let raw = r#"{"candidates": [{"content": {"parts": [
            {"functionCall": {"name": "search_semantic_scholar", "args": {"query": "rag"}}},
            {"functionCall": {"name": "calculate_math", "args": {"expression": "1+1"}}}
        ]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap_or_else(|e| panic!("{e}"));
        let response = GeminiProvider::parse_response(parsed);
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].id, "call_0");
        assert_eq!(response.tool_calls[1].id, "call_1");
        assert_eq!(response.tool_calls[0].arguments, r#"{"query":"rag"}"#);
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
                .unwrap_or_else(|e| panic!("{e}"));
        let response = GeminiProvider::parse_response(parsed);
        assert!(response.content.is_empty());
        assert!(response.tool_calls.is_empty());
    }
}
