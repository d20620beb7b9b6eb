//! Schema-aware structural merge of an overlay onto a base value (C3).
//!
//! Follows the same shape-driven recursion as [`crate::prune`]: objects merge
//! key by key against declared/`additionalProperties` schemas, arrays merge
//! according to their `x-kubernetes-list-type` (atomic replace, set union, or
//! map-list correlation by key tuple), and scalars are replaced outright by
//! the overlay value. Unknown overlay keys are rejected unless
//! `preserve_unknown_fields` is set, mirroring server-side-apply's behavior
//! for CRDs without `x-kubernetes-preserve-unknown-fields`.

use serde_json::{Map, Value};

use crate::error::Error;
use crate::schema::{self, ListType};

/// Merges `overlay` onto `base`, guided by `schema`. `preserve_unknown_fields`
/// controls whether overlay keys with no matching schema are accepted
/// (kept as-is) or rejected with [`Error::SchemaMismatch`].
pub fn merge(
    schema: Option<&Value>,
    base: Value,
    overlay: Value,
    preserve_unknown_fields: bool,
) -> Result<Value, Error> {
    log::debug!(
        "merging overlay onto base (preserve_unknown_fields={})",
        preserve_unknown_fields
    );
    let mut path = Vec::new();
    let result = merge_value(schema, base, overlay, preserve_unknown_fields, &mut path);
    if let Err(ref e) = result {
        log::debug!("merge failed: {}", e);
    }
    result
}

fn merge_value(
    schema: Option<&Value>,
    base: Value,
    overlay: Value,
    preserve: bool,
    path: &mut Vec<String>,
) -> Result<Value, Error> {
    match overlay {
        Value::Object(overlay_map) => merge_object(schema, base, overlay_map, preserve, path),
        Value::Array(overlay_arr) => merge_array(schema, base, overlay_arr, preserve, path),
        scalar => Ok(scalar),
    }
}

fn merge_object(
    schema: Option<&Value>,
    base: Value,
    overlay_map: Map<String, Value>,
    preserve: bool,
    path: &mut Vec<String>,
) -> Result<Value, Error> {
    let mut base_map = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for (key, overlay_v) in overlay_map {
        let declared = schema::has_declared_property(schema, &key);
        let child = schema::child_schema(schema, &key);

        if !declared && child.is_none() && !preserve {
            path.push(key.clone());
            log::trace!("{}: overlay key is undeclared and unknown fields are not preserved", path.join("."));
            let err = Error::SchemaMismatch {
                path: path.join("."),
                key: key.clone(),
            };
            path.pop();
            return Err(err);
        }

        path.push(key.clone());
        log::trace!("{}: merging", path.join("."));
        let base_v = base_map.remove(&key).unwrap_or(Value::Null);
        let merged = merge_value(child, base_v, overlay_v, preserve, path)?;
        path.pop();

        base_map.insert(key, merged);
    }

    Ok(Value::Object(base_map))
}

fn merge_array(
    schema: Option<&Value>,
    base: Value,
    overlay_arr: Vec<Value>,
    preserve: bool,
    path: &mut Vec<String>,
) -> Result<Value, Error> {
    let base_arr = match base {
        Value::Array(arr) => arr,
        _ => Vec::new(),
    };

    match schema::list_type(schema) {
        Some(ListType::Set) => Ok(Value::Array(merge_set(base_arr, overlay_arr))),
        Some(ListType::Map) => {
            let keys = schema::list_map_keys(schema);
            let items_schema = schema::items(schema);
            merge_map_list(items_schema, base_arr, overlay_arr, &keys, preserve, path)
        }
        _ => Ok(Value::Array(overlay_arr)),
    }
}

fn merge_set(base_arr: Vec<Value>, overlay_arr: Vec<Value>) -> Vec<Value> {
    let mut result = base_arr;
    for v in overlay_arr {
        if !result.contains(&v) {
            result.push(v);
        }
    }
    result
}

fn key_tuple(value: &Value, keys: &[&str]) -> Option<Vec<Value>> {
    let obj = value.as_object()?;
    let mut tuple = Vec::with_capacity(keys.len());
    for k in keys {
        tuple.push(obj.get(*k)?.clone());
    }
    Some(tuple)
}

fn merge_map_list(
    items_schema: Option<&Value>,
    base_arr: Vec<Value>,
    overlay_arr: Vec<Value>,
    keys: &[&str],
    preserve: bool,
    path: &mut Vec<String>,
) -> Result<Value, Error> {
    let mut entries: Vec<(Option<Vec<Value>>, Value)> = base_arr
        .into_iter()
        .map(|v| {
            let k = key_tuple(&v, keys);
            (k, v)
        })
        .collect();

    'overlay: for overlay_v in overlay_arr {
        let overlay_key = key_tuple(&overlay_v, keys);

        if let Some(ref ok) = overlay_key {
            for (existing_key, existing_v) in entries.iter_mut() {
                if existing_key.as_ref() == Some(ok) {
                    let taken = std::mem::replace(existing_v, Value::Null);
                    *existing_v = merge_value(items_schema, taken, overlay_v, preserve, path)?;
                    continue 'overlay;
                }
            }
        }

        entries.push((overlay_key, overlay_v));
    }

    Ok(Value::Array(entries.into_iter().map(|(_, v)| v).collect()))
}

/// Removes each dotted path in `removals` from `value`, used by the
/// `objects.apply` expression binding (C4) to apply `optional.none()`
/// deletions after the structural merge. A removal path that descends into a
/// sequence is rejected; traversal through a missing intermediate mapping is
/// a no-op.
pub fn apply_removals(value: &mut Value, removals: &[String]) -> Result<(), Error> {
    log::debug!("applying {} removal(s)", removals.len());
    for removal in removals {
        if removal.is_empty() {
            return Err(Error::RemovalPathEmpty);
        }
        log::trace!("{}: removing", removal);
        let parts: Vec<&str> = removal.split('.').collect();
        remove_path(value, &parts, removal)?;
    }
    Ok(())
}

fn remove_path(value: &mut Value, parts: &[&str], original: &str) -> Result<(), Error> {
    match value {
        Value::Object(map) => {
            if parts.len() == 1 {
                map.remove(parts[0]);
                Ok(())
            } else if let Some(next) = map.get_mut(parts[0]) {
                remove_path(next, &parts[1..], original)
            } else {
                Ok(())
            }
        }
        Value::Array(_) => Err(Error::RemovalUnsupported(original.to_string())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_declared_object_keys_recursively() {
        let schema = json!({
            "type": "object",
            "properties": {
                "spec": {
                    "type": "object",
                    "properties": {
                        "replicas": { "type": "integer" },
                        "name": { "type": "string" }
                    }
                }
            }
        });
        let base = json!({ "spec": { "replicas": 1, "name": "a" } });
        let overlay = json!({ "spec": { "replicas": 3 } });

        let merged = merge(Some(&schema), base, overlay, false).unwrap();

        assert_eq!(merged, json!({ "spec": { "replicas": 3, "name": "a" } }));
    }

    #[test]
    fn rejects_undeclared_overlay_keys_without_preserve() {
        let schema = json!({ "type": "object", "properties": {} });
        let base = json!({});
        let overlay = json!({ "extra": 1 });

        let err = merge(Some(&schema), base, overlay, false).unwrap_err();

        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn accepts_undeclared_overlay_keys_with_preserve() {
        let schema = json!({ "type": "object", "properties": {} });
        let base = json!({});
        let overlay = json!({ "extra": 1 });

        let merged = merge(Some(&schema), base, overlay, true).unwrap();

        assert_eq!(merged, json!({ "extra": 1 }));
    }

    #[test]
    fn atomic_array_is_replaced_wholesale() {
        let schema = json!({ "type": "array", "items": { "type": "string" } });
        let base = json!(["a", "b"]);
        let overlay = json!(["c"]);

        let merged = merge(Some(&schema), base, overlay, false).unwrap();

        assert_eq!(merged, json!(["c"]));
    }

    #[test]
    fn set_array_unions_by_value() {
        let schema = json!({
            "type": "array",
            "x-kubernetes-list-type": "set",
            "items": { "type": "string" }
        });
        let base = json!(["a", "b"]);
        let overlay = json!(["b", "c"]);

        let merged = merge(Some(&schema), base, overlay, false).unwrap();

        assert_eq!(merged, json!(["a", "b", "c"]));
    }

    #[test]
    fn map_list_correlates_by_key_and_preserves_order() {
        let schema = json!({
            "type": "array",
            "x-kubernetes-list-type": "map",
            "x-kubernetes-list-map-keys": ["name"],
            "items": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "value": { "type": "string" }
                }
            }
        });
        let base = json!([
            { "name": "a", "value": "1" },
            { "name": "b", "value": "2" }
        ]);
        let overlay = json!([
            { "name": "b", "value": "20" },
            { "name": "c", "value": "3" }
        ]);

        let merged = merge(Some(&schema), base, overlay, false).unwrap();

        assert_eq!(
            merged,
            json!([
                { "name": "a", "value": "1" },
                { "name": "b", "value": "20" },
                { "name": "c", "value": "3" }
            ])
        );
    }

    #[test]
    fn apply_removals_drops_dotted_paths() {
        let mut value = json!({ "spec": { "replicas": 3, "name": "a" } });

        apply_removals(&mut value, &["spec.name".to_string()]).unwrap();

        assert_eq!(value, json!({ "spec": { "replicas": 3 } }));
    }

    #[test]
    fn apply_removals_rejects_sequence_traversal() {
        let mut value = json!({ "items": [1, 2, 3] });

        let err = apply_removals(&mut value, &["items.0".to_string()]).unwrap_err();

        assert!(matches!(err, Error::RemovalUnsupported(_)));
    }

    #[test]
    fn apply_removals_rejects_empty_path() {
        let mut value = json!({});

        let err = apply_removals(&mut value, &["".to_string()]).unwrap_err();

        assert!(matches!(err, Error::RemovalPathEmpty));
    }
}
