// Action decoder - pulls one {"tool": ..., "params": {...}} object out of a
// model reply.
//
// Models asked for JSON often wrap it in prose ("Sure! {...} Thanks."). We try
// the whole reply first, then exactly one fallback candidate: the first
// balanced brace-delimited substring. No backtracking over later candidates.

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::ActionError;
use crate::tools::types::RawAction;

const TOOL_KEYS: &[&str] = &["tool", "name", "tool_name"];
const PARAM_KEYS: &[&str] = &["params", "arguments", "args", "parameters"];

/// Decode a model reply into a raw action.
///
/// Fails with `MalformedAction` (keeping `text` verbatim) when no JSON object
/// can be recovered.
pub fn decode(text: &str) -> Result<RawAction, ActionError> {
    let value = match serde_json::from_str::<Value>(text.trim()) {
        Ok(value) => value,
        Err(whole_err) => {
            debug!("Reply is not bare JSON ({}), scanning for an object", whole_err);
            let candidate = first_balanced_object(text).ok_or_else(|| {
                ActionError::malformed("no balanced JSON object in model reply", text)
            })?;
            serde_json::from_str::<Value>(candidate).map_err(|e| {
                ActionError::malformed(format!("embedded object is not valid JSON: {}", e), text)
            })?
        }
    };

    match value {
        Value::Object(map) => Ok(from_object(map)),
        other => Err(ActionError::malformed(
            format!("expected a JSON object, got {}", json_type_name(&other)),
            text,
        )),
    }
}

/// Build a RawAction from an already-parsed object (also used for native
/// tool calls, which arrive as structured JSON).
pub fn from_object(mut map: Map<String, Value>) -> RawAction {
    let tool_name = TOOL_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::to_string);

    let arguments = PARAM_KEYS
        .iter()
        .find_map(|k| map.remove(*k))
        .unwrap_or_else(|| Value::Object(Map::new()));

    RawAction {
        tool_name,
        arguments,
    }
}

/// First `{ ... }` substring whose braces balance, ignoring braces inside
/// JSON string literals.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
