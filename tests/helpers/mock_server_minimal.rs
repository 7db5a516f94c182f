//! Minimal mock MCP server: tools capability only, a single `ping` tool.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

fn response(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error(id: &Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

fn handle_request(msg: &Value) -> Option<Value> {
    let id = msg.get("id")?;
    let method = msg["method"].as_str().unwrap_or_default();
    let params = msg.get("params").cloned().unwrap_or(json!({}));

    let reply = match method {
        "initialize" => response(
            id,
            json!({
                "protocolVersion": "2025-11-25",
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "mock-minimal", "version": "1.0.0" },
            }),
        ),
        "ping" => response(id, json!({})),
        "tools/list" => response(
            id,
            json!({
                "tools": [{
                    "name": "ping",
                    "description": "Returns pong",
                    "inputSchema": { "type": "object", "properties": {} },
                }],
            }),
        ),
        "tools/call" => {
            if params["name"].as_str() == Some("ping") {
                response(id, json!({ "content": [{ "type": "text", "text": "pong" }] }))
            } else {
                error(id, -32602, &format!("Unknown tool: {}", params["name"]))
            }
        }
        other => error(id, -32601, &format!("Method not found: {other}")),
    };
    Some(reply)
}

fn main() {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Value>(line) {
            Ok(msg) => handle_request(&msg),
            Err(_) => Some(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": -32700, "message": "Parse error" },
            })),
        };
        if let Some(reply) = reply {
            if writeln!(stdout, "{reply}").is_err() {
                break;
            }
            let _ = stdout.flush();
        }
    }
}
