use std::sync::Arc;

use serde_json::{json, Value};

use crate::app::AppState;
use crate::prompting::{catalog_lines, render_system_prompt, SystemPromptContext};
use crate::types::{HistoryEntry, Product};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Produces one assistant reply for the running conversation. Stateless: the
/// catalog snapshot and the bounded history are passed in on every call.
pub async fn chat_with_assistant(
    state: &Arc<AppState>,
    user_message: &str,
    products: &[Product],
    history: &[HistoryEntry],
) -> Result<String, String> {
    let catalog_text = catalog_lines(products);
    let system = render_system_prompt(&SystemPromptContext {
        business_name: &state.config.business_name,
        business_kind: &state.config.business_kind,
        store_address: &state.config.store_address,
        catalog_text: &catalog_text,
    });
    let messages = build_chat_messages(&system, history, user_message);
    chat_completion(state, &messages).await
}

/// System instruction first, then prior turns oldest-to-newest, then the new
/// user message.
pub fn build_chat_messages(
    system: &str,
    history: &[HistoryEntry],
    user_message: &str,
) -> Vec<Value> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(json!({ "role": "system", "content": system }));
    for entry in history {
        messages.push(json!({ "role": entry.role, "content": entry.content }));
    }
    messages.push(json!({ "role": "user", "content": user_message }));
    messages
}

async fn chat_completion(state: &Arc<AppState>, messages: &[Value]) -> Result<String, String> {
    let response = state
        .http
        .post(OPENAI_CHAT_URL)
        .bearer_auth(&state.config.openai_api_key)
        .json(&json!({
            "model": state.config.openai_model,
            "messages": messages,
            "temperature": 0.7
        }))
        .send()
        .await
        .map_err(|err| format!("openai request failed: {err}"))?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("openai returned {status}: {body}"));
    }
    let payload = response
        .json::<Value>()
        .await
        .map_err(|err| format!("openai parse failed: {err}"))?;
    let text = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
        .to_string();
    if text.is_empty() {
        return Err("openai response had empty content".to_string());
    }
    Ok(text)
}
