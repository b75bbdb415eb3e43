//! HTTP surface: the direct query endpoint and the AI chat endpoints.
//!
//! All endpoints speak JSON and answer HTTP 200 with a result envelope;
//! backend failures are surfaced as `{success:false, error}` rather than
//! 5xx responses, matching what the browser client expects.

use crate::ai::{AgentLoop, Message};
use crate::envelope::Envelope;
use crate::server::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

const ANALYST_PROMPT: &str = "You are a database analyst assisting a user through a web SQL console. \
You can inspect the connected MySQL database with the available tools: \
list_tables, describe_table, get_foreign_keys, get_table_relationships, \
preview_table_data, execute_select_query, count_records, search_records. \
Use tools to ground every claim about the data before answering. \
All access is read-only. Answer concisely in plain language.";

const SQL_GENERATOR_PROMPT: &str = "You translate natural-language questions into a single MySQL SELECT \
statement for the connected database. Reply with the SQL statement only, \
no commentary and no code fences.";

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/run", post(run_query))
        .route("/ai-chat", post(ai_chat))
        .route("/ai-query", post(ai_query))
        .route("/ai-run", post(ai_run))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "name": state.config.name,
        "version": state.config.version,
        "endpoints": ["/health", "/run", "/ai-chat", "/ai-query", "/ai-run"],
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = if state.driver.is_connected().await {
        "up"
    } else {
        "down"
    };
    Json(json!({
        "status": "ok",
        "database": database,
        "ai": state.chat.is_some(),
    }))
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    #[serde(default)]
    query: String,
}

/// Direct SQL passthrough: read statements return rows, anything else an
/// affected-row count.
#[instrument(skip_all)]
async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> Json<Envelope> {
    Json(state.executor.execute(&request.query).await)
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[allow(dead_code)]
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<IncomingMessage>,
    #[serde(default, rename = "sessionId")]
    session_id: Option<String>,
}

/// Agentic chat: drives the tool-call loop and persists the exchange in the
/// session store.
#[instrument(skip_all, fields(session = request.session_id.as_deref().unwrap_or("default")))]
async fn ai_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<Value> {
    let Some(chat) = &state.chat else {
        return Json(json!(Envelope::failure(
            "AI features disabled: GEMINI_API_KEY is not configured"
        )));
    };

    let Some(user_message) = request.messages.last().map(|m| m.content.clone()) else {
        return Json(json!(Envelope::failure("No message provided")));
    };
    if user_message.trim().is_empty() {
        return Json(json!(Envelope::failure("No message provided")));
    }

    let session_id = request.session_id.unwrap_or_else(|| "default".to_string());
    let history = state.sessions.history(&session_id);

    let agent = AgentLoop::new(Arc::clone(chat), Arc::clone(&state.tools))
        .with_max_rounds(state.config.ai.max_tool_rounds);

    match agent.run(ANALYST_PROMPT, &history, &user_message).await {
        Ok(outcome) => {
            state.sessions.append_all(
                &session_id,
                [
                    Message::user(&user_message),
                    Message::assistant(&outcome.response),
                ],
            );
            let history = state.sessions.history(&session_id);
            Json(json!({
                "success": true,
                "response": outcome.response,
                "tool_calls": outcome.tool_calls,
                "iterations": outcome.iterations,
                "capped": outcome.capped,
                "history": history,
            }))
        }
        Err(e) => Json(json!(Envelope::failure(e.to_string()))),
    }
}

#[derive(Debug, Deserialize)]
struct AiQueryRequest {
    #[serde(default)]
    message: String,
}

/// Single-shot natural-language-to-SQL generation, no tool loop.
#[instrument(skip_all)]
async fn ai_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AiQueryRequest>,
) -> Json<Value> {
    let Some(chat) = &state.chat else {
        return Json(json!(Envelope::failure(
            "AI features disabled: GEMINI_API_KEY is not configured"
        )));
    };
    if request.message.trim().is_empty() {
        return Json(json!(Envelope::failure("No message provided")));
    }

    let messages = vec![
        Message {
            role: crate::ai::Role::System,
            content: SQL_GENERATOR_PROMPT.to_string(),
        },
        Message::user(&request.message),
    ];

    match chat.send(&messages, &[]).await {
        Ok(turn) => {
            let sql = strip_code_fences(&turn.text);
            info!("Generated SQL: {}", sql);
            Json(json!({ "success": true, "sql": sql }))
        }
        Err(e) => Json(json!(Envelope::failure(e.to_string()))),
    }
}

#[derive(Debug, Deserialize)]
struct AiRunRequest {
    #[serde(default)]
    query: String,
}

/// Autonomous read-only execution: same SELECT-only gate the tools use.
#[instrument(skip_all)]
async fn ai_run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AiRunRequest>,
) -> Json<Envelope> {
    match state.executor.run_read_only(&request.query).await {
        Ok(payload) => Json(Envelope::ok(payload)),
        Err(e) => Json(Envelope::failure(e.to_string())),
    }
}

/// Strip markdown code fences the model sometimes wraps SQL in.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```sql")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```sql\nSELECT 1;\n```"),
            "SELECT 1;"
        );
        assert_eq!(strip_code_fences("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("SELECT 1"), "SELECT 1");
        assert_eq!(strip_code_fences("  SELECT 1  "), "SELECT 1");
    }

    #[test]
    fn test_chat_request_accepts_camel_case_session_id() {
        let request: ChatRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "sessionId": "abc"
        }))
        .unwrap();
        assert_eq!(request.session_id.as_deref(), Some("abc"));
        assert_eq!(request.messages.len(), 1);
    }
}
