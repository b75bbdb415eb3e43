//! Bounded tool-call loop.
//!
//! Drives a multi-turn exchange with a `ChatClient`: the model may answer
//! with structured tool requests, which are dispatched through the registry
//! and fed back as a follow-up turn, until the model produces plain text or
//! the round-trip cap is hit. Every dispatch is recorded in an ordered
//! transparency log returned alongside the final answer.

use crate::ai::{ChatClient, Message, ToolRequest};
use crate::envelope::Envelope;
use crate::error::AiResult;
use crate::tools::ToolRegistry;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// One entry in the transparency log.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    /// Model round trip (1-based) that requested this call.
    pub iteration: u32,
    pub name: String,
    pub arguments: Value,
    pub result: Envelope,
}

/// Final result of one loop execution.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    pub response: String,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model round trips made.
    pub iterations: u32,
    /// True when the loop stopped at the round-trip cap rather than on a
    /// final text answer.
    pub capped: bool,
}

pub struct AgentLoop {
    client: Arc<dyn ChatClient>,
    registry: Arc<ToolRegistry>,
    max_rounds: u32,
}

impl AgentLoop {
    pub fn new(client: Arc<dyn ChatClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            registry,
            max_rounds: 10,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Run the loop for one user message on top of the prior conversation.
    #[instrument(skip_all, fields(history_len = history.len()))]
    pub async fn run(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_message: &str,
    ) -> AiResult<AgentOutcome> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message {
            role: crate::ai::Role::System,
            content: system_prompt.to_string(),
        });
        messages.extend_from_slice(history);
        messages.push(Message::user(user_message));

        let tools = self.registry.definitions();
        let mut records: Vec<ToolCallRecord> = Vec::new();
        let mut last_text = String::new();

        for round in 1..=self.max_rounds {
            let turn = self.client.send(&messages, &tools).await?;

            if !turn.text.is_empty() {
                last_text = turn.text.clone();
            }

            if turn.is_final() {
                debug!(round, "Model produced final answer");
                return Ok(AgentOutcome {
                    response: turn.text,
                    tool_calls: records,
                    iterations: round,
                    capped: false,
                });
            }

            debug!(
                round,
                requests = turn.tool_requests.len(),
                "Dispatching tool requests"
            );

            messages.push(Message::assistant(if turn.text.is_empty() {
                format!("[Requesting tools: {}]", request_names(&turn.tool_requests))
            } else {
                turn.text.clone()
            }));

            let mut results = Vec::with_capacity(turn.tool_requests.len());
            for request in &turn.tool_requests {
                let result = self
                    .registry
                    .dispatch(&request.name, request.arguments.clone())
                    .await;
                records.push(ToolCallRecord {
                    iteration: round,
                    name: request.name.clone(),
                    arguments: request.arguments.clone(),
                    result: result.clone(),
                });
                results.push(serde_json::json!({
                    "tool": request.name,
                    "result": result,
                }));
            }

            messages.push(Message::tool(
                serde_json::to_string(&results).unwrap_or_else(|e| e.to_string()),
            ));
        }

        // Cap reached: return the last available text rather than blocking.
        warn!(
            max_rounds = self.max_rounds,
            "Tool-call loop hit iteration cap"
        );
        Ok(AgentOutcome {
            response: last_text,
            tool_calls: records,
            iterations: self.max_rounds,
            capped: true,
        })
    }
}

fn request_names(requests: &[ToolRequest]) -> String {
    requests
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ModelTurn, ToolDefinition};
    use crate::error::Result;
    use crate::tools::registry::ToolHandler;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Stub that always requests the same tool.
    struct AlwaysToolClient {
        sends: AtomicU32,
    }

    #[async_trait]
    impl ChatClient for AlwaysToolClient {
        async fn send(&self, _: &[Message], _: &[ToolDefinition]) -> AiResult<ModelTurn> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(ModelTurn {
                text: "still looking".into(),
                tool_requests: vec![ToolRequest {
                    name: "list_tables".into(),
                    arguments: json!({}),
                }],
            })
        }
    }

    /// Stub that requests `describe_table` once, then answers with text.
    struct OneToolThenTextClient {
        sends: AtomicU32,
    }

    #[async_trait]
    impl ChatClient for OneToolThenTextClient {
        async fn send(&self, _: &[Message], _: &[ToolDefinition]) -> AiResult<ModelTurn> {
            let n = self.sends.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Ok(ModelTurn {
                    text: String::new(),
                    tool_requests: vec![ToolRequest {
                        name: "describe_table".into(),
                        arguments: json!({"table_name": "users"}),
                    }],
                })
            } else {
                Ok(ModelTurn {
                    text: "The users table has 3 columns.".into(),
                    tool_requests: vec![],
                })
            }
        }
    }

    struct CannedTool {
        name: &'static str,
    }

    #[async_trait]
    impl ToolHandler for CannedTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.into(),
                description: "canned".into(),
                parameters: json!({"type": "object", "properties": {}}),
            }
        }

        async fn execute(&self, _: serde_json::Value) -> Result<serde_json::Value> {
            Ok(json!({"columns": ["id", "name", "email"]}))
        }
    }

    #[tokio::test]
    async fn test_loop_terminates_exactly_at_cap() {
        let client = Arc::new(AlwaysToolClient {
            sends: AtomicU32::new(0),
        });
        let registry = Arc::new(ToolRegistry::new());
        registry.register(CannedTool {
            name: "list_tables",
        });

        let agent = AgentLoop::new(client.clone(), registry).with_max_rounds(10);
        let outcome = agent.run("system", &[], "what tables exist?").await.unwrap();

        assert_eq!(client.sends.load(Ordering::SeqCst), 10);
        assert_eq!(outcome.iterations, 10);
        assert!(outcome.capped);
        assert_eq!(outcome.tool_calls.len(), 10);
        // Last available text is returned rather than blocking.
        assert_eq!(outcome.response, "still looking");
    }

    #[tokio::test]
    async fn test_single_tool_call_then_final_text() {
        let client = Arc::new(OneToolThenTextClient {
            sends: AtomicU32::new(0),
        });
        let registry = Arc::new(ToolRegistry::new());
        registry.register(CannedTool {
            name: "describe_table",
        });

        let agent = AgentLoop::new(client, registry);
        let outcome = agent
            .run("system", &[], "describe the users table")
            .await
            .unwrap();

        assert!(!outcome.capped);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].iteration, 1);
        assert_eq!(outcome.tool_calls[0].name, "describe_table");
        assert!(outcome.tool_calls[0].result.success);
        assert_eq!(outcome.response, "The users table has 3 columns.");
    }

    #[tokio::test]
    async fn test_unknown_tool_continues_loop() {
        let client = Arc::new(OneToolThenTextClient {
            sends: AtomicU32::new(0),
        });
        // Empty registry: describe_table is unknown.
        let registry = Arc::new(ToolRegistry::new());

        let agent = AgentLoop::new(client, registry);
        let outcome = agent.run("system", &[], "hello").await.unwrap();

        // Unknown tool produced a failure envelope; loop still completed.
        assert!(!outcome.capped);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert!(!outcome.tool_calls[0].result.success);
        assert_eq!(outcome.response, "The users table has 3 columns.");
    }
}
