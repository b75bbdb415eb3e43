//! Google Gemini API client.
//!
//! Implements the `ChatClient` trait for Gemini models via the
//! Generative Language API's function-calling protocol.

use crate::ai::{ChatClient, Message, ModelTurn, Role, ToolDefinition, ToolRequest};
use crate::error::{AiError, AiResult};
use async_trait::async_trait;
use tracing::debug;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gemini-2.0-flash".to_string(),
            max_output_tokens: 4096,
            temperature: 0.2,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Gemini API client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn api_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE, self.config.model, self.config.api_key
        )
    }

    /// Build the JSON request body for the Gemini API.
    fn build_request_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> serde_json::Value {
        let mut contents = Vec::new();

        for msg in messages {
            let role = match msg.role {
                Role::User | Role::Tool => "user",
                Role::Assistant => "model",
                Role::System => continue, // handled via systemInstruction
            };
            contents.push(serde_json::json!({
                "role": role,
                "parts": [{ "text": msg.content }]
            }));
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": self.config.max_output_tokens,
                "temperature": self.config.temperature,
            }
        });

        // System instruction
        for msg in messages {
            if msg.role == Role::System {
                body["systemInstruction"] = serde_json::json!({
                    "parts": [{ "text": msg.content }]
                });
                break;
            }
        }

        if !tools.is_empty() {
            let tool_defs: Vec<_> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })
                })
                .collect();
            body["tools"] = serde_json::json!([{
                "functionDeclarations": tool_defs
            }]);
        }

        body
    }

    /// Parse a Gemini response into a model turn.
    fn parse_response(&self, json: serde_json::Value) -> AiResult<ModelTurn> {
        let candidates = json["candidates"]
            .as_array()
            .ok_or_else(|| AiError::Parse("no candidates in response".to_string()))?;

        let first = candidates
            .first()
            .ok_or_else(|| AiError::Parse("empty candidates".to_string()))?;

        let parts = first["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut text = String::new();
        let mut tool_requests = Vec::new();

        for part in &parts {
            if let Some(chunk) = part["text"].as_str() {
                text.push_str(chunk);
            }
            if let Some(fc) = part.get("functionCall") {
                tool_requests.push(ToolRequest {
                    name: fc["name"].as_str().unwrap_or("").to_string(),
                    arguments: fc["args"].clone(),
                });
            }
        }

        Ok(ModelTurn {
            text,
            tool_requests,
        })
    }
}

#[async_trait]
impl ChatClient for GeminiClient {
    async fn send(&self, messages: &[Message], tools: &[ToolDefinition]) -> AiResult<ModelTurn> {
        let body = self.build_request_body(messages, tools);
        let url = self.api_url();

        debug!(model = %self.config.model, "Gemini API request");

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::Api(format!("HTTP {status}: {text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        self.parse_response(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_roles_and_system_instruction() {
        let client = GeminiClient::new(GeminiConfig::new("key"));
        let messages = vec![
            Message {
                role: Role::System,
                content: "You are a database analyst.".into(),
            },
            Message::user("list the tables"),
            Message::assistant("Checking."),
            Message::tool("{\"tables\":[]}"),
        ];
        let body = client.build_request_body(&messages, &[]);

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3); // system message lifted out
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("database analyst"));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_request_body_includes_tool_declarations() {
        let client = GeminiClient::new(GeminiConfig::new("key"));
        let tools = vec![ToolDefinition {
            name: "list_tables".into(),
            description: "List tables".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }];
        let body = client.build_request_body(&[Message::user("hi")], &tools);
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "list_tables"
        );
    }

    #[test]
    fn test_parse_response_with_function_call() {
        let client = GeminiClient::new(GeminiConfig::new("key"));
        let json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Let me check." },
                        { "functionCall": { "name": "describe_table", "args": { "table_name": "users" } } }
                    ]
                }
            }]
        });
        let turn = client.parse_response(json).unwrap();
        assert_eq!(turn.text, "Let me check.");
        assert_eq!(turn.tool_requests.len(), 1);
        assert_eq!(turn.tool_requests[0].name, "describe_table");
        assert_eq!(turn.tool_requests[0].arguments["table_name"], "users");
        assert!(!turn.is_final());
    }

    #[test]
    fn test_parse_response_plain_text() {
        let client = GeminiClient::new(GeminiConfig::new("key"));
        let json = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "There are 3 tables." }] }
            }]
        });
        let turn = client.parse_response(json).unwrap();
        assert_eq!(turn.text, "There are 3 tables.");
        assert!(turn.is_final());
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let client = GeminiClient::new(GeminiConfig::new("key"));
        let result = client.parse_response(serde_json::json!({}));
        assert!(matches!(result, Err(AiError::Parse(_))));
    }
}
