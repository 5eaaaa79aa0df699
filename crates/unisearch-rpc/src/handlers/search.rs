//! The `search` tool: listing, invocation and platform report.

use super::JsonRpcError;
use crate::server::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use unisearch_core::backend::EverythingSort;
use unisearch_core::{CancellationToken, SearchConfig};

const TOOL_NAME: &str = "search";

/// Cancels the token when the request future is dropped, e.g. on client
/// disconnect, so the blocking search stops early. Cancelling after the
/// search has finished is a no-op.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Input schema of the `search` tool.
fn tool_schema() -> Value {
    let sort_codes: Vec<u32> = EverythingSort::ALL.iter().map(|s| s.code()).collect();

    json!({
        "type": "object",
        "properties": {
            "base": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query string. See platform-specific documentation for syntax details."
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": SearchConfig::MIN_MAX_RESULTS,
                        "maximum": SearchConfig::MAX_MAX_RESULTS,
                        "default": SearchConfig::DEFAULT_MAX_RESULTS,
                        "description": "Maximum number of results to return (1-1000)"
                    }
                },
                "required": ["query"]
            },
            "windows_params": {
                "type": "object",
                "properties": {
                    "match_case": {
                        "type": "boolean",
                        "default": false,
                        "description": "Enable case-sensitive search"
                    },
                    "match_path": {
                        "type": "boolean",
                        "default": false,
                        "description": "Match against full path instead of filename only"
                    },
                    "match_regex": {
                        "type": "boolean",
                        "default": false,
                        "description": "Enable regex search"
                    },
                    "match_whole_word": {
                        "type": "boolean",
                        "default": false,
                        "description": "Match whole words only"
                    },
                    "sort_by": {
                        "type": "integer",
                        "enum": sort_codes,
                        "default": EverythingSort::default().code(),
                        "description": "Sort order for results"
                    }
                }
            }
        },
        "required": ["base"]
    })
}

fn text_content(text: String) -> Value {
    json!({"content": [{"type": "text", "text": text}]})
}

/// Run the search pipeline on a blocking worker and render it as text.
async fn run_search(state: &AppState, arguments: Value) -> Result<Value, JsonRpcError> {
    let service = Arc::clone(&state.service);
    let token = CancellationToken::new();
    let _guard = CancelOnDrop(token.clone());

    let text = tokio::task::spawn_blocking(move || service.search_text(&arguments, &token))
        .await
        .map_err(|e| JsonRpcError::internal(format!("Search task failed: {}", e)))?;

    Ok(text_content(text))
}

pub async fn list_tools(_state: &AppState, _params: &Value) -> Result<Value, JsonRpcError> {
    Ok(json!({
        "tools": [{
            "name": TOOL_NAME,
            "description": "Search for files and directories using platform-specific search engines",
            "inputSchema": tool_schema()
        }]
    }))
}

pub async fn call_tool(state: &AppState, params: &Value) -> Result<Value, JsonRpcError> {
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| JsonRpcError::invalid_params("Missing required parameter: name"))?;
    if name != TOOL_NAME {
        return Err(JsonRpcError::invalid_params(format!("Unknown tool: {}", name)));
    }

    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    debug!("call_tool {} with {}", name, arguments);
    run_search(state, arguments).await
}

/// Shorthand for `call_tool` with name `search`; params are the arguments.
pub async fn search(state: &AppState, params: &Value) -> Result<Value, JsonRpcError> {
    run_search(state, params.clone()).await
}

pub async fn get_platform_info(state: &AppState, _params: &Value) -> Result<Value, JsonRpcError> {
    let service = &state.service;
    let flags = service.supported_flags();
    let sort_orders: Vec<Value> = if flags.is_some_and(|f| f.sort_by) {
        EverythingSort::ALL
            .iter()
            .map(|s| json!({"code": s.code(), "description": s.description()}))
            .collect()
    } else {
        Vec::new()
    };

    Ok(json!({
        "platform": service.platform(),
        "supported": service.backend_name().is_some(),
        "backend": service.backend_name(),
        "supported_flags": flags,
        "sort_orders": sort_orders,
        "timeout_secs": service.options().timeout.as_secs(),
        "max_filtered": service.options().max_filtered,
    }))
}
