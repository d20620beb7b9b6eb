//! Conversion between the expression runtime's reference values and plain
//! unstructured trees (C7).
//!
//! `cel_interpreter::Value` is the runtime representation produced by
//! evaluating an expression; `serde_json::Value` is what the rest of this
//! crate (prune, merge, template) operates on. Every evaluation result
//! crosses this bridge exactly once before it touches the merger, so nothing
//! downstream ever has to know the expression runtime exists.

use std::sync::Arc;

use cel_interpreter::objects::{Key, Map as CelMap};
use cel_interpreter::Value as CelValue;
use serde_json::{Map, Number, Value};

use crate::error::Error;

/// Converts an evaluated expression result into an unstructured value.
pub fn to_unstructured(value: CelValue) -> Result<Value, Error> {
    match value {
        CelValue::Null => Ok(Value::Null),
        CelValue::Bool(b) => Ok(Value::Bool(b)),
        CelValue::Int(i) => Ok(Value::Number(Number::from(i))),
        CelValue::UInt(u) => Ok(Value::Number(Number::from(u))),
        CelValue::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| Error::ExpressionEval(format!("non-finite number: {f}"))),
        CelValue::String(s) => Ok(Value::String((*s).clone())),
        CelValue::Bytes(b) => Ok(Value::String(String::from_utf8_lossy(&b).into_owned())),
        CelValue::List(items) => {
            let converted: Result<Vec<Value>, Error> = items
                .iter()
                .cloned()
                .map(to_unstructured)
                .collect();
            Ok(Value::Array(converted?))
        }
        CelValue::Map(map) => map_to_unstructured(map),
        CelValue::Duration(d) => Ok(Value::String(format_duration(d))),
        CelValue::Timestamp(t) => Ok(Value::String(t.to_rfc3339())),
        other => Err(Error::ExpressionEval(format!(
            "unsupported expression result type: {other:?}"
        ))),
    }
}

fn map_to_unstructured(map: CelMap) -> Result<Value, Error> {
    let mut out = Map::new();
    for (key, value) in map.map.iter() {
        let key = key_to_string(key)?;
        out.insert(key, to_unstructured(value.clone())?);
    }
    Ok(Value::Object(out))
}

fn key_to_string(key: &Key) -> Result<String, Error> {
    match key {
        Key::Int(i) => Ok(i.to_string()),
        Key::Uint(u) => Ok(u.to_string()),
        Key::Bool(b) => Ok(b.to_string()),
        Key::String(s) => Ok((**s).clone()),
    }
}

fn format_duration(d: chrono::Duration) -> String {
    let seconds = d.num_seconds();
    let nanos = (d - chrono::Duration::seconds(seconds))
        .num_nanoseconds()
        .unwrap_or(0)
        .unsigned_abs();
    if nanos == 0 {
        format!("{seconds}s")
    } else {
        format!("{seconds}.{nanos:09}s")
    }
}

/// Converts an unstructured value into an expression-runtime value, used to
/// bind `oldObject`/`convertedObject` and to feed `apply_filter`'s arguments
/// back into the merger.
pub fn from_unstructured(value: &Value) -> CelValue {
    match value {
        Value::Null => CelValue::Null,
        Value::Bool(b) => CelValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                CelValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                CelValue::UInt(u)
            } else {
                CelValue::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => CelValue::String(Arc::new(s.clone())),
        Value::Array(items) => {
            CelValue::List(Arc::new(items.iter().map(from_unstructured).collect()))
        }
        Value::Object(map) => {
            let mut cel_map = std::collections::HashMap::new();
            for (k, v) in map {
                cel_map.insert(Key::String(Arc::new(k.clone())), from_unstructured(v));
            }
            CelValue::Map(CelMap {
                map: Arc::new(cel_map),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_scalars_and_containers() {
        let original = json!({
            "name": "widget",
            "replicas": 3,
            "ratio": 1.5,
            "enabled": true,
            "tags": ["a", "b"],
            "meta": null
        });

        let cel = from_unstructured(&original);
        let back = to_unstructured(cel).unwrap();

        assert_eq!(back, original);
    }
}
