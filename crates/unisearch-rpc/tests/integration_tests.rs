//! Integration tests for the unisearch-rpc JSON-RPC server.
//!
//! These start the real binary, read its `RPC_PORT=` line and talk to it over
//! HTTP. Only requests that are settled before any search tool runs are
//! asserted exactly, so results do not depend on what the host has installed.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncBufReadExt;

/// Make an RPC call to the server.
async fn rpc_call(port: u16, method: &str, params: Value) -> Result<Value, String> {
    let json = rpc_call_raw(port, method, params).await?;
    if let Some(error) = json.get("error") {
        return Err(error.to_string());
    }
    Ok(json.get("result").cloned().unwrap_or(Value::Null))
}

/// Make an RPC call and return the full JSON-RPC payload.
async fn rpc_call_raw(port: u16, method: &str, params: Value) -> Result<Value, String> {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/rpc", port))
        .json(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    response.json::<Value>().await.map_err(|e| e.to_string())
}

/// Check health endpoint.
async fn check_health(port: u16) -> bool {
    let client = reqwest::Client::new();
    if let Ok(response) = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        if let Ok(json) = response.json::<Value>().await {
            return json.get("status").and_then(|v| v.as_str()) == Some("ok");
        }
    }
    false
}

/// Wait for server to be ready.
async fn wait_for_server(port: u16, timeout_secs: u64) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_secs(timeout_secs) {
        if check_health(port).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

struct RpcServerHandle {
    child: tokio::process::Child,
    port: u16,
    stdout_drain: Option<tokio::task::JoinHandle<()>>,
}

impl RpcServerHandle {
    async fn stop(mut self) {
        if let Some(drain) = self.stdout_drain.take() {
            drain.abort();
        }
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
    }
}

impl Drop for RpcServerHandle {
    fn drop(&mut self) {
        if let Some(drain) = self.stdout_drain.take() {
            drain.abort();
        }
        let _ = self.child.start_kill();
    }
}

fn rpc_binary() -> Result<PathBuf, String> {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_unisearch-rpc") {
        return Ok(PathBuf::from(path));
    }

    let current_exe = std::env::current_exe()
        .map_err(|e| format!("failed to resolve current_exe for fallback: {e}"))?;
    let target_debug_dir = current_exe
        .parent()
        .and_then(|p| p.parent())
        .ok_or_else(|| "failed to resolve target/debug directory for fallback".to_string())?;

    let mut fallback = target_debug_dir.join("unisearch-rpc");
    if cfg!(target_os = "windows") {
        fallback.set_extension("exe");
    }
    if !fallback.exists() {
        return Err(format!(
            "CARGO_BIN_EXE_unisearch-rpc not set and fallback binary not found at {}",
            fallback.display()
        ));
    }
    Ok(fallback)
}

/// Start the RPC binary and wait until `/health` is ready.
async fn start_rpc_server(extra_args: &[&str]) -> Result<RpcServerHandle, String> {
    let binary = rpc_binary()?;

    let mut child = tokio::process::Command::new(&binary)
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg("0")
        .args(extra_args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to spawn unisearch-rpc: {e}"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| "failed to capture stdout".to_string())?;
    let mut lines = tokio::io::BufReader::new(stdout).lines();

    let mut discovered_port: Option<u16> = None;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(250), lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                if let Some(value) = line.strip_prefix("RPC_PORT=") {
                    let parsed = value
                        .trim()
                        .parse::<u16>()
                        .map_err(|e| format!("invalid RPC_PORT value '{value}': {e}"))?;
                    discovered_port = Some(parsed);
                    break;
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(err)) => return Err(format!("failed to read unisearch-rpc stdout: {err}")),
            Err(_) => continue,
        }
    }

    let port =
        discovered_port.ok_or_else(|| "RPC_PORT line not emitted by unisearch-rpc".to_string())?;
    if !wait_for_server(port, 15).await {
        return Err(format!("unisearch-rpc failed health check on port {port}"));
    }

    let stdout_drain =
        tokio::spawn(async move { while let Ok(Some(_)) = lines.next_line().await {} });

    Ok(RpcServerHandle {
        child,
        port,
        stdout_drain: Some(stdout_drain),
    })
}

fn tool_text(result: &Value) -> &str {
    result["content"][0]["text"]
        .as_str()
        .expect("tool result should carry text content")
}

fn write_patterns(dir: &Path) -> PathBuf {
    let path = dir.join("patterns.json");
    std::fs::write(&path, r#"{"keywords": ["payroll"], "paths": [".*/vault/.*"]}"#).unwrap();
    path
}

#[tokio::test]
async fn test_health_and_builtin_methods() {
    let server = start_rpc_server(&[]).await.unwrap();

    let result = rpc_call(server.port, "health_check", json!({})).await.unwrap();
    assert_eq!(result["status"], "ok");

    let info = rpc_call(server.port, "get_platform_info", json!({})).await.unwrap();
    assert!(info["platform"].is_string());
    assert_eq!(info["max_filtered"], 10);
    assert_eq!(info["timeout_secs"], 30);

    server.stop().await;
}

#[tokio::test]
async fn test_list_tools_schema() {
    let server = start_rpc_server(&[]).await.unwrap();

    let result = rpc_call(server.port, "list_tools", json!({})).await.unwrap();
    let tools = result["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "search");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["base"]));
    assert_eq!(
        tools[0]["inputSchema"]["properties"]["base"]["properties"]["max_results"]["maximum"],
        1000
    );

    server.stop().await;
}

#[tokio::test]
async fn test_rejected_queries_return_text() {
    let server = start_rpc_server(&[]).await.unwrap();

    let cases = [
        (json!({"base": {"query": "   "}}), "Search failed: Empty query not allowed"),
        (
            json!({"base": {"query": "secret"}}),
            "Search failed: Query contains restricted keywords",
        ),
        (
            json!({"base": {"query": "\"exact phrase\""}}),
            "Search failed: Quoted string queries not supported",
        ),
        (
            json!({"base": {"query": "a"}, "windows_params": "{broken"}),
            "Search failed: Invalid parameters: Invalid JSON in 'windows_params'",
        ),
        (
            json!({"base": {"query": "a"}, "windows_params": [1]}),
            "Search failed: Invalid parameters: 'windows_params' must be a string or dictionary",
        ),
    ];

    for (arguments, expected) in cases {
        let result = rpc_call(
            server.port,
            "call_tool",
            json!({"name": "search", "arguments": arguments}),
        )
        .await
        .unwrap();
        assert_eq!(tool_text(&result), expected);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_protocol_errors() {
    let server = start_rpc_server(&[]).await.unwrap();

    let payload = rpc_call_raw(server.port, "get_models", json!({})).await.unwrap();
    assert_eq!(payload["error"]["code"], -32601);

    let payload = rpc_call_raw(
        server.port,
        "call_tool",
        json!({"name": "rm", "arguments": {}}),
    )
    .await
    .unwrap();
    assert_eq!(payload["error"]["code"], -32602);
    assert_eq!(payload["error"]["message"], "Unknown tool: rm");

    server.stop().await;
}

#[tokio::test]
async fn test_cli_options_applied() {
    let dir = TempDir::new().unwrap();
    let patterns = write_patterns(dir.path());
    let patterns_arg = patterns.to_string_lossy().into_owned();

    let server = start_rpc_server(&[
        "--max-filtered",
        "4",
        "--timeout-secs",
        "7",
        "--sensitive-config",
        &patterns_arg,
    ])
    .await
    .unwrap();

    let info = rpc_call(server.port, "get_platform_info", json!({})).await.unwrap();
    assert_eq!(info["max_filtered"], 4);
    assert_eq!(info["timeout_secs"], 7);

    // Custom keywords replace the built-in set.
    let result = rpc_call(server.port, "search", json!({"base": {"query": "Payroll 2024"}}))
        .await
        .unwrap();
    assert_eq!(
        tool_text(&result),
        "Search failed: Query contains restricted keywords"
    );

    server.stop().await;
}

#[tokio::test]
async fn test_bad_sensitive_config_fails_startup() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");
    let missing_arg = missing.to_string_lossy().into_owned();

    let result = start_rpc_server(&["--sensitive-config", &missing_arg]).await;
    assert!(result.is_err());
}
