//! Poll payload normalization.
//!
//! The gateway may answer a poll with an array of commands, a single command
//! object, or a no-command marker. This flattens every shape into an ordered
//! command list before dispatch.

use serde_json::Value;

/// Reduce a raw poll payload to the ordered commands it carries.
///
/// Precedence: arrays pass through element-wise; `{status: "no-command"}` is
/// empty; an object with a truthy `action` is a single command; a non-empty
/// object whose `action` is absent or null is a single implicit create;
/// anything else carries no commands.
pub fn normalize(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(ref obj) => {
            if obj.get("status").and_then(Value::as_str) == Some("no-command") {
                return Vec::new();
            }
            match obj.get("action") {
                Some(action) if is_truthy(action) => vec![payload],
                Some(Value::Null) | None if !obj.is_empty() => vec![payload],
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// JS truthiness: null, false, 0, and "" are falsy; everything else,
/// including empty arrays and objects, is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
