//! Orchestrators (C6): the six top-level operations exposed to callers,
//! each composing prune/substitute/evaluate/merge in a fixed pipeline.
//!
//! Every entry point deep-copies caller-owned input before any destructive
//! step (pruning and merging mutate their working copies in place), so
//! callers never see their own `object`/`patch` values change underneath
//! them.

use serde_json::Value;

use crate::error::Error;
use crate::expr;
use crate::merge;
use crate::prune;
use crate::template;

const MUTATION_KEY: &str = "mutation";

fn mutation_expression(patch: &Value) -> Result<&str, Error> {
    patch
        .as_object()
        .and_then(|m| m.get(MUTATION_KEY))
        .and_then(Value::as_str)
        .ok_or(Error::MissingMutationKey)
}

/// Expands `patch` as a template against `object`, then merges the resulting
/// overlay back onto `object`.
pub fn mutate_template(schema: Option<&Value>, object: &Value, patch: &Value) -> Result<Value, Error> {
    log::debug!("mutate_template: substituting patch against object");
    let overlay = template::substitute(schema, schema, object, patch)?;
    merge::merge(schema, object.clone(), overlay, false)
}

/// Evaluates `patch`'s `mutation` expression against `object`, then merges
/// the resulting overlay back onto `object`.
pub fn mutate_eval(schema: Option<&Value>, object: &Value, patch: &Value) -> Result<Value, Error> {
    let expression = mutation_expression(patch)?;
    log::debug!("mutate_eval: evaluating mutation expression against object");
    let overlay = expr::evaluate(schema, object, None, expression, false)?;
    merge::merge(schema, object.clone(), overlay, false)
}

/// Evaluates `patch`'s `mutation` expression wrapped in `objects.apply`,
/// which performs the merge (and any removals) itself via `apply_filter`.
pub fn mutate_apply(schema: Option<&Value>, object: &Value, patch: &Value) -> Result<Value, Error> {
    let expression = mutation_expression(patch)?;
    log::debug!("mutate_apply: evaluating objects.apply(oldObject, ...) expression");
    let wrapped = wrap_objects_apply("oldObject", expression);
    expr::evaluate(schema, object, None, &wrapped, false)
}

/// Expands `patch` as a template against `object`, against the target
/// schema, then merges it onto the target-pruned copy of `object`.
pub fn convert_template(
    from_schema: Option<&Value>,
    to_schema: Option<&Value>,
    object: &Value,
    patch: &Value,
) -> Result<Value, Error> {
    log::debug!("convert_template: pruning object to target schema");
    let mut pruned = object.clone();
    prune::prune(&mut pruned, to_schema, true);

    log::debug!("convert_template: substituting patch with convertedObject bound to the pruned object");
    let overlay = template::substitute_conversion(from_schema, to_schema, object, &pruned, patch)?;
    merge::merge(to_schema, pruned, overlay, true)
}

/// Evaluates `patch`'s `mutation` expression (with both `oldObject` and
/// `convertedObject` bound) and merges the result onto the target-pruned
/// copy of `object`.
pub fn convert_eval(
    from_schema: Option<&Value>,
    to_schema: Option<&Value>,
    object: &Value,
    patch: &Value,
) -> Result<Value, Error> {
    let _ = from_schema;
    let expression = mutation_expression(patch)?;
    log::debug!("convert_eval: pruning object to target schema");
    let mut pruned = object.clone();
    prune::prune(&mut pruned, to_schema, true);

    log::debug!("convert_eval: evaluating mutation expression");
    let overlay = expr::evaluate(to_schema, object, Some(&pruned), expression, true)?;
    merge::merge(to_schema, pruned, overlay, true)
}

/// Evaluates `patch`'s `mutation` expression wrapped in `objects.apply`
/// against `convertedObject` (the target-pruned copy of `object`), which
/// performs the merge itself.
pub fn convert_apply(
    from_schema: Option<&Value>,
    to_schema: Option<&Value>,
    object: &Value,
    patch: &Value,
) -> Result<Value, Error> {
    let _ = from_schema;
    let expression = mutation_expression(patch)?;
    log::debug!("convert_apply: pruning object to target schema");
    let mut pruned = object.clone();
    prune::prune(&mut pruned, to_schema, true);

    log::debug!("convert_apply: evaluating objects.apply(convertedObject, ...) expression");
    let wrapped = wrap_objects_apply("convertedObject", expression);
    expr::evaluate(to_schema, object, Some(&pruned), &wrapped, true)
}

/// Wraps a user expression as `objects.apply(<base>,\n<expr>\n)`. The
/// trailing newline before the closing paren keeps a trailing line comment
/// inside the user expression from eating the closing paren.
fn wrap_objects_apply(base_var: &str, expression: &str) -> String {
    format!("objects.apply({base_var},\n{expression}\n)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
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
        })
    }

    #[test]
    fn mutate_template_merges_expanded_overlay() {
        let s = schema();
        let object = json!({ "spec": { "replicas": 1, "name": "a" } });
        let patch = json!({ "spec": { "replicas": { "$": "oldObject.spec.replicas + 1" } } });

        let result = mutate_template(Some(&s), &object, &patch).unwrap();

        assert_eq!(result, json!({ "spec": { "replicas": 2, "name": "a" } }));
    }

    #[test]
    fn mutate_eval_merges_expression_result() {
        let s = schema();
        let object = json!({ "spec": { "replicas": 1, "name": "a" } });
        let patch = json!({ "mutation": "{\"spec\": {\"replicas\": 5}}" });

        let result = mutate_eval(Some(&s), &object, &patch).unwrap();

        assert_eq!(result, json!({ "spec": { "replicas": 5, "name": "a" } }));
    }

    #[test]
    fn mutate_apply_merges_and_removes_via_objects_apply() {
        let s = schema();
        let object = json!({ "spec": { "replicas": 1, "name": "a" } });
        let patch =
            json!({ "mutation": "{\"spec\": {\"replicas\": 9, \"name\": optional.none()}}" });

        let result = mutate_apply(Some(&s), &object, &patch).unwrap();

        assert_eq!(result, json!({ "spec": { "replicas": 9 } }));
    }

    #[test]
    fn mutate_eval_requires_mutation_key() {
        let object = json!({});
        let patch = json!({});

        let err = mutate_eval(None, &object, &patch).unwrap_err();

        assert!(matches!(err, Error::MissingMutationKey));
    }

    #[test]
    fn convert_template_prunes_to_target_schema_before_merging() {
        let to_schema = json!({
            "type": "object",
            "properties": {
                "spec": {
                    "type": "object",
                    "properties": { "replicas": { "type": "integer" } }
                }
            }
        });
        let object = json!({ "spec": { "replicas": 1, "legacyField": "gone" } });
        let patch = json!({ "spec": { "replicas": { "$": "convertedObject.spec.replicas + 1" } } });

        let result = convert_template(None, Some(&to_schema), &object, &patch).unwrap();

        assert_eq!(result, json!({ "spec": { "replicas": 2 } }));
    }

    #[test]
    fn convert_apply_merges_with_preserve_unknown_fields() {
        let to_schema = json!({
            "type": "object",
            "properties": {
                "spec": {
                    "type": "object",
                    "properties": { "replicas": { "type": "integer" } }
                }
            }
        });
        let object = json!({ "spec": { "replicas": 1, "legacyField": "gone" } });
        let patch = json!({ "mutation": "{\"extra\": 7}" });

        // `extra` is undeclared in `to_schema`; convert_apply's internal
        // merge must use preserve_unknown_fields=true (like convert_template/
        // convert_eval) or this would fail with SchemaMismatch.
        let result = convert_apply(None, Some(&to_schema), &object, &patch).unwrap();

        assert_eq!(result, json!({ "spec": { "replicas": 1 }, "extra": 7 }));
    }
}
