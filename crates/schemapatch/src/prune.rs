//! Schema-aware pruning of unstructured values (C2).
//!
//! Mirrors the pruning pass Kubernetes runs over unstructured CRD objects
//! before they hit storage: drop keys the schema doesn't declare, null out
//! scalars whose declared type doesn't match the value's runtime kind, and
//! drop list-map entries missing one of their correlating keys. `apiVersion`,
//! `kind` and `metadata` are always retained at an embedded-resource root,
//! schema or no schema.

use serde_json::{Map, Value};

use crate::schema::{self, ListType, SchemaView};

const META_FIELDS: [&str; 3] = ["apiVersion", "kind", "metadata"];

fn is_meta_field(key: &str) -> bool {
    META_FIELDS.contains(&key)
}

fn dotted(path: &[String]) -> String {
    path.join(".")
}

/// Prunes `value` in place against `schema`, returning the dotted paths of
/// every field dropped for being undeclared (sorted). `is_resource_root`
/// forces meta-field retention even when the schema itself doesn't set
/// `x-kubernetes-embedded-resource`, matching how a top-level object is
/// always treated as an embedded resource for this purpose.
pub fn prune(value: &mut Value, schema: Option<&Value>, is_resource_root: bool) -> Vec<String> {
    log::debug!("pruning value (resource_root={})", is_resource_root);
    let mut dropped = Vec::new();
    let mut path = Vec::new();

    let forced_root;
    let effective_schema = if is_resource_root && !schema::x_embedded_resource(schema) {
        let mut cloned = schema.cloned().unwrap_or_else(|| Value::Object(Map::new()));
        if let Value::Object(map) = &mut cloned {
            map.insert(
                "x-kubernetes-embedded-resource".to_string(),
                Value::Bool(true),
            );
        }
        forced_root = cloned;
        Some(&forced_root)
    } else {
        schema
    };

    prune_value(value, effective_schema, &mut path, &mut dropped);
    dropped.sort();
    log::trace!("pruned {} field(s)", dropped.len());
    dropped
}

fn prune_value(
    value: &mut Value,
    schema: Option<&Value>,
    path: &mut Vec<String>,
    dropped: &mut Vec<String>,
) {
    if schema::x_preserve_unknown_fields(schema) {
        skip_prune(value, schema, path, dropped);
        return;
    }

    match value {
        Value::Object(map) => prune_object(map, schema, path, dropped),
        Value::Array(arr) => prune_array(arr, schema, path, dropped),
        scalar => prune_scalar(scalar, schema, path),
    }
}

fn prune_object(
    map: &mut Map<String, Value>,
    schema: Option<&Value>,
    path: &mut Vec<String>,
    dropped: &mut Vec<String>,
) {
    let keep_meta = schema::x_embedded_resource(schema);
    let keys: Vec<String> = map.keys().cloned().collect();

    for key in keys {
        if keep_meta && is_meta_field(&key) {
            continue;
        }

        if let Some(child) = schema::child_schema(schema, &key) {
            path.push(key.clone());
            prune_value(map.get_mut(&key).unwrap(), Some(child), path, dropped);
            path.pop();
        } else {
            path.push(key.clone());
            log::debug!("{}: dropping undeclared field", dotted(path));
            dropped.push(dotted(path));
            path.pop();
            map.remove(&key);
        }
    }
}

fn prune_array(
    arr: &mut Vec<Value>,
    schema: Option<&Value>,
    path: &mut Vec<String>,
    dropped: &mut Vec<String>,
) {
    let items_schema = schema::items(schema);
    let map_keys = schema::list_map_keys(schema);
    let is_map_list = schema::list_type(schema) == Some(ListType::Map);

    let taken = std::mem::take(arr);
    let mut kept = Vec::with_capacity(taken.len());

    for (i, mut element) in taken.into_iter().enumerate() {
        if is_map_list {
            let has_all_keys = match element.as_object() {
                Some(obj) => map_keys.iter().all(|k| obj.contains_key(*k)),
                None => false,
            };
            if !has_all_keys {
                path.push(i.to_string());
                log::debug!("{}: dropping list-map entry missing a key field", dotted(path));
                path.pop();
                continue;
            }
        }

        path.push(i.to_string());
        prune_value(&mut element, items_schema, path, dropped);
        path.pop();
        kept.push(element);
    }

    *arr = kept;
}

fn prune_scalar(value: &mut Value, schema: Option<&Value>, path: &[String]) {
    let Some(declared) = schema.and_then(SchemaView::type_) else {
        return;
    };

    let compatible = match value {
        Value::Null => true,
        Value::Bool(_) => declared == "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => declared == "integer",
        Value::Number(_) => declared == "number",
        Value::String(_) => declared == "string",
        Value::Object(_) | Value::Array(_) => true,
    };

    if !compatible {
        log::debug!("{}: nulling out value with declared type {}", dotted(path), declared);
        *value = Value::Null;
    }
}

/// Walk under an `x-kubernetes-preserve-unknown-fields` node: declared
/// children are pruned as normal, undeclared ones are left untouched.
fn skip_prune(
    value: &mut Value,
    schema: Option<&Value>,
    path: &mut Vec<String>,
    dropped: &mut Vec<String>,
) {
    match value {
        Value::Object(map) => {
            let keep_meta = schema::x_embedded_resource(schema);
            let keys: Vec<String> = map.keys().cloned().collect();

            for key in keys {
                if keep_meta && is_meta_field(&key) {
                    continue;
                }

                if let Some(child) = schema::child_schema(schema, &key) {
                    path.push(key.clone());
                    prune_value(map.get_mut(&key).unwrap(), Some(child), path, dropped);
                    path.pop();
                }
                // undeclared key under preserve-unknown-fields: left as is.
            }
        }
        Value::Array(arr) => {
            let items_schema = schema::items(schema);
            for (i, element) in arr.iter_mut().enumerate() {
                path.push(i.to_string());
                skip_prune(element, items_schema, path, dropped);
                path.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn drops_undeclared_object_keys() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        });
        let mut value = json!({ "name": "a", "extra": 1 });

        let dropped = prune(&mut value, Some(&schema), false);

        assert_eq!(dropped, vec!["extra".to_string()]);
        assert_eq!(value, json!({ "name": "a" }));
    }

    #[test]
    fn keeps_meta_fields_at_resource_root_without_schema_flag() {
        let schema = json!({
            "type": "object",
            "properties": { "spec": { "type": "object", "properties": {} } }
        });
        let mut value = json!({
            "apiVersion": "v1",
            "kind": "Widget",
            "metadata": { "name": "a" },
            "spec": {},
            "extra": 1
        });

        let dropped = prune(&mut value, Some(&schema), true);

        assert_eq!(dropped, vec!["extra".to_string()]);
        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "Widget");
    }

    #[test]
    fn nulls_out_type_mismatched_scalars() {
        let schema = json!({
            "type": "object",
            "properties": { "count": { "type": "integer" } }
        });
        let mut value = json!({ "count": "not-a-number" });

        prune(&mut value, Some(&schema), false);

        assert_eq!(value["count"], Value::Null);
    }

    #[test_case(json!(5), "integer", true; "int matches integer")]
    #[test_case(json!(5), "number", false; "int does not match number")]
    #[test_case(json!(5.5), "number", true; "float matches number")]
    #[test_case(json!(5.5), "integer", false; "float does not match integer")]
    #[test_case(json!(true), "boolean", true; "bool matches boolean")]
    #[test_case(json!("a"), "string", true; "string matches string")]
    fn scalar_compatibility(mut value: Value, declared_type: &str, expect_kept: bool) {
        let schema = json!({ "type": declared_type });
        prune_scalar(&mut value, Some(&schema), &[]);
        assert_eq!(value != Value::Null, expect_kept);
    }

    #[test]
    fn drops_list_map_entries_missing_a_key() {
        let schema = json!({
            "type": "array",
            "x-kubernetes-list-type": "map",
            "x-kubernetes-list-map-keys": ["name"],
            "items": { "type": "object", "properties": { "name": { "type": "string" } } }
        });
        let mut value = json!([{ "name": "a" }, { "value": "b" }]);

        prune(&mut value, Some(&schema), false);

        assert_eq!(value, json!([{ "name": "a" }]));
    }

    #[test]
    fn preserve_unknown_fields_keeps_undeclared_but_still_prunes_declared_children() {
        let schema = json!({
            "type": "object",
            "x-kubernetes-preserve-unknown-fields": true,
            "properties": {
                "known": {
                    "type": "object",
                    "properties": { "inner": { "type": "string" } }
                }
            }
        });
        let mut value = json!({
            "unknown": { "anything": "goes" },
            "known": { "inner": "kept", "alsoUnknown": "dropped only if declared" }
        });

        let dropped = prune(&mut value, Some(&schema), false);

        assert!(dropped.contains(&"known.alsoUnknown".to_string()));
        assert_eq!(value["unknown"], json!({ "anything": "goes" }));
        assert_eq!(value["known"]["inner"], "kept");
    }

    #[test]
    fn missing_schema_drops_every_object_key_but_keeps_array_and_scalar_values() {
        let mut object = json!({ "a": 1, "b": 2 });
        let dropped = prune(&mut object, None, false);
        assert_eq!(dropped.len(), 2);
        assert_eq!(object, json!({}));

        let mut array = json!([1, "two", true]);
        prune(&mut array, None, false);
        assert_eq!(array, json!([1, "two", true]));
    }

    #[test]
    fn pruning_is_idempotent() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "count": { "type": "integer" }
            }
        });
        let mut value = json!({ "name": "a", "count": "bad", "extra": 1 });

        prune(&mut value, Some(&schema), false);
        let once = value.clone();
        prune(&mut value, Some(&schema), false);

        assert_eq!(once, value);
    }
}
