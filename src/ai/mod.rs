//! Language-model integration: vendor-neutral chat interface, the Gemini
//! client, and the bounded tool-call loop.

pub mod agent;
pub mod gemini;

use crate::error::AiResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use agent::{AgentLoop, AgentOutcome, ToolCallRecord};
pub use gemini::{GeminiClient, GeminiConfig};

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// A tool exposed to the model for structured invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A structured tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// One model round trip: final (or partial) text plus any tool requests.
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub text: String,
    pub tool_requests: Vec<ToolRequest>,
}

impl ModelTurn {
    pub fn is_final(&self) -> bool {
        self.tool_requests.is_empty()
    }
}

/// Narrow interface to a hosted chat model with function calling.
///
/// Isolates the tool-call loop from any vendor wire format; the loop is
/// tested against stub implementations of this trait.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the accumulated conversation (system prompt first, if any) and
    /// the available tool definitions; returns the model's next turn.
    async fn send(&self, messages: &[Message], tools: &[ToolDefinition]) -> AiResult<ModelTurn>;
}
