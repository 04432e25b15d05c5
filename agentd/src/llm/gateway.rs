//! Gateway LLM client
//!
//! Implements [`LlmClient`] against a single OpenAI-compatible chat-completions
//! endpoint (the unified `AIML_API_KEY` gateway). Every router tier is reached
//! through this one client by varying [`CompletionRequest::model`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, LlmError, Message, MessageContent, Role,
    StopReason, TokenUsage, ToolCall,
};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

pub struct GatewayClient {
    default_model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, default_model: impl Into<String>, max_tokens: u32, timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;
        Ok(Self { default_model: default_model.into(), api_key: api_key.into(), base_url: base_url.into(), http, max_tokens })
    }

    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        debug!(%model, max_tokens = %request.max_tokens, "build_request_body");

        let mut messages = vec![serde_json::json!({"role": "system", "content": request.system_prompt})];
        messages.extend(self.convert_messages(&request.messages));

        let max_tokens = request.max_tokens.min(self.max_tokens);

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "max_tokens": max_tokens,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request.tools.iter().map(|t| t.to_openai_schema()).collect::<Vec<_>>());
            body["tool_choice"] = serde_json::json!("auto");
        }

        body
    }

    /// OpenAI requires one message per tool result, so a single internal
    /// message with multiple tool results becomes multiple wire messages.
    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        let mut result = Vec::new();

        for msg in messages {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };

            match &msg.content {
                MessageContent::Text(text) => {
                    result.push(serde_json::json!({"role": role, "content": text}));
                }
                MessageContent::Blocks(blocks) => {
                    let mut tool_calls = Vec::new();
                    let mut tool_results = Vec::new();
                    let mut text_content = String::new();

                    for block in blocks {
                        match block {
                            ContentBlock::Text { text } => text_content.push_str(text),
                            ContentBlock::ToolUse { id, name, input } => {
                                tool_calls.push(serde_json::json!({
                                    "id": id,
                                    "type": "function",
                                    "function": {"name": name, "arguments": input.to_string()},
                                }));
                            }
                            ContentBlock::ToolResult { tool_use_id, content, .. } => {
                                tool_results.push((tool_use_id.clone(), content.clone()));
                            }
                        }
                    }

                    if !tool_results.is_empty() {
                        for (tool_call_id, content) in tool_results {
                            result.push(serde_json::json!({"role": "tool", "tool_call_id": tool_call_id, "content": content}));
                        }
                        continue;
                    }

                    if !tool_calls.is_empty() {
                        let mut msg = serde_json::json!({"role": "assistant", "tool_calls": tool_calls});
                        if !text_content.is_empty() {
                            msg["content"] = serde_json::json!(text_content);
                        }
                        result.push(msg);
                        continue;
                    }

                    result.push(serde_json::json!({"role": role, "content": text_content}));
                }
            }
        }

        result
    }

    fn parse_response(&self, api_response: GatewayResponse) -> Result<CompletionResponse, LlmError> {
        let choice = api_response.choices.into_iter().next();

        let (content, tool_calls, stop_reason) = match choice {
            Some(c) => {
                let content = c.message.content;
                let mut tool_calls = Vec::new();
                for tc in c.message.tool_calls.unwrap_or_default() {
                    let input = serde_json::from_str(&tc.function.arguments).map_err(|e| LlmError::MalformedToolArgs {
                        name: tc.function.name.clone(),
                        message: e.to_string(),
                    })?;
                    tool_calls.push(ToolCall { id: tc.id, name: tc.function.name, input });
                }
                let stop_reason = match c.finish_reason.as_deref() {
                    Some("stop") => StopReason::EndTurn,
                    Some("tool_calls") => StopReason::ToolUse,
                    Some("length") => StopReason::MaxTokens,
                    _ => StopReason::EndTurn,
                };
                (content, tool_calls, stop_reason)
            }
            None => (None, vec![], StopReason::EndTurn),
        };

        Ok(CompletionResponse {
            content,
            tool_calls,
            stop_reason,
            usage: TokenUsage {
                input_tokens: api_response.usage.prompt_tokens,
                output_tokens: api_response.usage.completion_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmClient for GatewayClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "complete: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "complete: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(LlmError::RateLimited { retry_after: Duration::from_secs(retry_after) });
            }

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "complete: retryable error");
                last_error = Some(LlmError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError { status, message: text });
            }

            let api_response: GatewayResponse = response.json().await?;
            return self.parse_response(api_response);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    choices: Vec<GatewayChoice>,
    usage: GatewayUsage,
}

#[derive(Debug, Deserialize)]
struct GatewayChoice {
    message: GatewayMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayMessage {
    content: Option<String>,
    tool_calls: Option<Vec<GatewayToolCall>>,
}

#[derive(Debug, Deserialize)]
struct GatewayToolCall {
    id: String,
    function: GatewayFunction,
}

#[derive(Debug, Deserialize)]
struct GatewayFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct GatewayUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn client() -> GatewayClient {
        GatewayClient {
            default_model: "gpt-4o".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://gateway.example.com".to_string(),
            http: Client::new(),
            max_tokens: 8192,
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You are helpful".to_string(),
            messages: vec![Message::user("Hello")],
            tools: vec![],
            max_tokens: 1000,
            model: None,
            temperature: None,
        }
    }

    #[test]
    fn test_build_request_body_uses_default_model() {
        let client = client();
        let body = client.build_request_body(&request());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_request_body_honors_routed_model() {
        let client = client();
        let mut req = request();
        req.model = Some("claude-opus-4".to_string());
        let body = client.build_request_body(&req);
        assert_eq!(body["model"], "claude-opus-4");
    }

    #[test]
    fn test_max_tokens_capped_by_client_ceiling() {
        let mut client = client();
        client.max_tokens = 500;
        let mut req = request();
        req.max_tokens = 5000;
        let body = client.build_request_body(&req);
        assert_eq!(body["max_tokens"], 500);
    }

    #[test]
    fn test_parse_response_rejects_malformed_tool_args() {
        let client = client();
        let api_response = GatewayResponse {
            choices: vec![GatewayChoice {
                message: GatewayMessage {
                    content: None,
                    tool_calls: Some(vec![GatewayToolCall {
                        id: "call_1".to_string(),
                        function: GatewayFunction { name: "save_file".to_string(), arguments: "not json".to_string() },
                    }]),
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: GatewayUsage { prompt_tokens: 10, completion_tokens: 5 },
        };
        let result = client.parse_response(api_response);
        assert!(matches!(result, Err(LlmError::MalformedToolArgs { .. })));
    }
}
