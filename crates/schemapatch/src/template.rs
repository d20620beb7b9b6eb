//! Template engine (C5): walks a patch value in lockstep with a schema,
//! evaluating `{"$": "<expression>"}` placeholders against the expression
//! host (C4) and descending into declared/additional-properties/items
//! schema nodes everywhere else.

use serde_json::{Map, Value};

use crate::error::Error;
use crate::expr;
use crate::schema::{self, SchemaView};

/// Expands `patch` against `old_object`, using `old_schema` to resolve
/// placeholder expressions (bound against `old_object` only) and
/// `patch_schema` to guide descent through the patch's own shape. Used by
/// `MutateTemplate`, which has no `convertedObject`.
pub fn substitute(
    old_schema: Option<&Value>,
    patch_schema: Option<&Value>,
    old_object: &Value,
    patch: &Value,
) -> Result<Value, Error> {
    substitute_node(old_schema, patch_schema, old_object, None, patch)
}

/// Expands `patch` for `ConvertTemplate`: placeholder expressions see both
/// `old_object` (the unpruned source object, bound as `oldObject`) and
/// `converted_object` (the target-schema-pruned copy, bound as
/// `convertedObject`) — per SPEC_FULL §4.4, `convertedObject` is "bound to
/// the pruned-to-target value", not the source.
pub fn substitute_conversion(
    old_schema: Option<&Value>,
    patch_schema: Option<&Value>,
    old_object: &Value,
    converted_object: &Value,
    patch: &Value,
) -> Result<Value, Error> {
    substitute_node(old_schema, patch_schema, old_object, Some(converted_object), patch)
}

fn substitute_node(
    old_schema: Option<&Value>,
    patch_schema: Option<&Value>,
    old_object: &Value,
    converted_object: Option<&Value>,
    patch: &Value,
) -> Result<Value, Error> {
    if let Some(expression) = as_placeholder(patch) {
        let result = expr::evaluate(
            old_schema,
            old_object,
            converted_object,
            expression,
            converted_object.is_some(),
        )?;
        return Ok(result);
    }

    match patch {
        Value::Object(map) => {
            substitute_object(old_schema, patch_schema, old_object, converted_object, map)
        }
        Value::Array(items) => {
            substitute_array(old_schema, patch_schema, old_object, converted_object, items)
        }
        scalar => Ok(scalar.clone()),
    }
}

/// A mapping whose exact key set is `{"$"}` and whose sole value is a string.
fn as_placeholder(value: &Value) -> Option<&str> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("$").and_then(Value::as_str)
}

fn substitute_object(
    old_schema: Option<&Value>,
    patch_schema: Option<&Value>,
    old_object: &Value,
    converted_object: Option<&Value>,
    patch_map: &Map<String, Value>,
) -> Result<Value, Error> {
    if let Some(schema) = patch_schema {
        if let Some(t) = schema.type_() {
            if t != "object" {
                return Err(Error::SchemaShape {
                    path: String::new(),
                    expected: "object",
                    got: "mapping",
                });
            }
        }
    }

    let mut out = Map::new();
    for (key, patch_v) in patch_map {
        let child_old = schema::child_schema(old_schema, key);
        let child_patch = schema::child_schema(patch_schema, key);
        let value = substitute_node(child_old, child_patch, old_object, converted_object, patch_v)?;
        out.insert(key.clone(), value);
    }
    Ok(Value::Object(out))
}

fn substitute_array(
    old_schema: Option<&Value>,
    patch_schema: Option<&Value>,
    old_object: &Value,
    converted_object: Option<&Value>,
    patch_items: &[Value],
) -> Result<Value, Error> {
    if let Some(schema) = patch_schema {
        if let Some(t) = schema.type_() {
            if t != "array" {
                return Err(Error::SchemaShape {
                    path: String::new(),
                    expected: "array",
                    got: "sequence",
                });
            }
        }
    }

    // Positional correlation with old_object's corresponding array is not
    // attempted: each element only ever sees the items schema, never a
    // per-index slice of old_object (see SPEC_FULL §9, matches the Go
    // original's `// TODO: correlate`).
    let child_old = schema::items(old_schema);
    let child_patch = schema::items(patch_schema);

    let mut out = Vec::with_capacity(patch_items.len());
    for item in patch_items {
        out.push(substitute_node(
            child_old,
            child_patch,
            old_object,
            converted_object,
            item,
        )?);
    }
    Ok(Value::Array(out))
}
