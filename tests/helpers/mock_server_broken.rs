//! Misbehaving mock MCP server.
//!
//! Answers initialize without `protocolVersion` or `capabilities`, serves
//! a tool list with structural defects, and returns malformed error
//! objects for unknown methods.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

fn response(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn handle_request(msg: &Value) -> Option<Value> {
    let id = msg.get("id")?;
    let method = msg["method"].as_str().unwrap_or_default();
    let params = msg.get("params").cloned().unwrap_or(json!({}));

    let reply = match method {
        "initialize" => response(
            id,
            json!({ "serverInfo": { "name": "mock-broken", "version": "0.0.1" } }),
        ),
        "ping" => response(id, json!({})),
        "tools/list" => response(
            id,
            json!({
                "tools": [
                    {
                        "name": "no_desc_tool",
                        "inputSchema": { "type": "object", "properties": {} },
                    },
                    {
                        "name": "bad_schema_tool",
                        "description": "Tool with invalid schema",
                        "inputSchema": "not-an-object",
                    },
                ],
            }),
        ),
        "tools/call" => response(id, json!({ "content": [{ "type": "text", "text": "ok" }] })),
        // Deliberately missing the jsonrpc envelope field.
        "resources/list" => json!({ "id": id, "result": { "resources": [] } }),
        "resources/read" => response(
            id,
            json!({ "contents": [{ "uri": params["uri"], "text": "data" }] }),
        ),
        "prompts/list" => response(id, json!({ "prompts": [] })),
        "prompts/get" => response(id, json!({ "messages": [] })),
        // Error object without a code.
        other => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "message": format!("Not found: {other}") },
        }),
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
        let Ok(msg) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if let Some(reply) = handle_request(&msg) {
            if writeln!(stdout, "{reply}").is_err() {
                break;
            }
            let _ = stdout.flush();
        }
    }
}
