//! Argument synthesis from declared tool input schemas.
//!
//! Produces a plausibly-valid instance for simple schemas without any
//! schema library. Schemas using composition keywords are declared complex
//! and synthesis declines; callers skip the check instead of guessing.

use serde_json::{json, Map, Value};

const COMPLEX_KEYWORDS: [&str; 5] = ["$ref", "anyOf", "oneOf", "allOf", "if"];

/// Whether the schema uses composition keywords synthesis cannot handle.
#[must_use]
pub fn is_complex_schema(schema: &Value) -> bool {
    schema
        .as_object()
        .is_some_and(|o| COMPLEX_KEYWORDS.iter().any(|k| o.contains_key(*k)))
}

/// Synthesizes arguments that should satisfy the schema, or `None` when
/// the schema (or any required property) is complex.
#[must_use]
pub fn generate_valid_args(schema: &Value) -> Option<Value> {
    if is_complex_schema(schema) {
        return None;
    }
    generate_value(schema)
}

/// Synthesizes arguments the schema should reject: missing required
/// properties when some are declared, an unexpected field otherwise.
#[must_use]
pub fn generate_invalid_args(schema: &Value) -> Value {
    let has_required = schema
        .get("required")
        .and_then(Value::as_array)
        .is_some_and(|r| !r.is_empty());
    if has_required {
        json!({})
    } else {
        json!({ "__invalid_field__": "should_not_be_accepted" })
    }
}

fn generate_value(schema: &Value) -> Option<Value> {
    if is_complex_schema(schema) {
        return None;
    }

    if let Some(members) = schema.get("enum").and_then(Value::as_array) {
        return members.first().cloned();
    }

    let type_name = schema.get("type").and_then(Value::as_str);

    match type_name {
        Some("string") => Some(json!("test")),
        Some("integer") | Some("number") => {
            Some(schema.get("minimum").cloned().unwrap_or(json!(1)))
        }
        Some("boolean") => Some(json!(true)),
        Some("array") => {
            let min_items = schema
                .get("minItems")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            if min_items > 0 {
                if let Some(items) = schema.get("items") {
                    let item = generate_value(items)?;
                    return Some(Value::Array(vec![item; min_items as usize]));
                }
            }
            Some(json!([]))
        }
        Some("object") => generate_object(schema),
        _ if schema.get("properties").is_some() => generate_object(schema),
        _ => Some(json!("test")),
    }
}

fn generate_object(schema: &Value) -> Option<Value> {
    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut result = Map::new();
    for (name, prop_schema) in properties {
        if !required.contains(&name.as_str()) {
            continue;
        }
        if is_complex_schema(prop_schema) {
            return None;
        }
        result.insert(name.clone(), generate_value(prop_schema)?);
    }
    Some(Value::Object(result))
}
