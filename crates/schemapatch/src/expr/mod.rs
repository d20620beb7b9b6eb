//! Expression host (C4): builds an evaluation environment around an
//! unstructured value, runs a user expression against it, and bridges the
//! result back to `serde_json::Value`.
//!
//! The `objects.apply` macro (see [`macros`]) is expanded textually before
//! compilation; the `apply_filter` primitive it rewrites to is registered as
//! a native function here and invokes [`crate::merge`] directly, so the
//! merge semantics live in exactly one place regardless of which dialect
//! (template or expression) produced the overlay.

pub mod macros;

use std::collections::HashMap;
use std::sync::Arc;

use cel_interpreter::objects::{Key, Map as CelMap};
use cel_interpreter::{Context, ExecutionError, Program, Value as CelValue};
use serde_json::Value;

use crate::error::Error;
use crate::merge;
use crate::value_bridge;

/// Evaluates `expression` against `old_object` (always bound as `oldObject`)
/// and, during conversion, `converted_object` (bound as `convertedObject`).
/// `schema` is the schema `apply_filter` merges against when the expression
/// uses `objects.apply`. `preserve_unknown_fields` is forwarded to that
/// merge unchanged — `false` for `MutateApply`, `true` for `ConvertApply`,
/// matching the corresponding orchestrator's direct `merge::merge` calls.
pub fn evaluate(
    schema: Option<&Value>,
    old_object: &Value,
    converted_object: Option<&Value>,
    expression: &str,
    preserve_unknown_fields: bool,
) -> Result<Value, Error> {
    let rewritten = macros::expand(expression)?;

    let program =
        Program::compile(&rewritten).map_err(|e| Error::ExpressionCompile(e.to_string()))?;

    let mut context = Context::default();
    context
        .add_variable("oldObject", value_bridge::from_unstructured(old_object))
        .map_err(|e| Error::ExpressionCompile(e.to_string()))?;

    if let Some(converted) = converted_object {
        context
            .add_variable(
                "convertedObject",
                value_bridge::from_unstructured(converted),
            )
            .map_err(|e| Error::ExpressionCompile(e.to_string()))?;
    }

    let schema_for_filter = schema.cloned();
    context.add_function(
        "apply_filter",
        move |base: CelValue, applystruct: CelValue| -> Result<CelValue, ExecutionError> {
            apply_filter(
                schema_for_filter.as_ref(),
                base,
                applystruct,
                preserve_unknown_fields,
            )
        },
    );

    let result = program
        .execute(&context)
        .map_err(|e| Error::ExpressionEval(e.to_string()))?;

    value_bridge::to_unstructured(result)
}

/// Binding for the `apply_filter(base, applystruct)` function that
/// `objects.apply` rewrites to. `applystruct` is a CEL map with `"object"`
/// and `"removals"` entries (see [`macros::expand`]) — there is no custom CEL
/// type registration here, unlike the Go original's `ApplyStruct` runtime
/// type, because the expression crate has no type-provider plug-in surface
/// for registering native message types.
fn apply_filter(
    schema: Option<&Value>,
    base: CelValue,
    applystruct: CelValue,
    preserve_unknown_fields: bool,
) -> Result<CelValue, ExecutionError> {
    let CelValue::Map(fields) = applystruct else {
        return Err(ExecutionError::function_error(
            "apply_filter",
            "second argument must be the applystruct map produced by objects.apply()",
        ));
    };

    let object = fields
        .map
        .get(&Key::String(Arc::new("object".to_string())))
        .cloned()
        .unwrap_or_else(|| CelValue::Map(CelMap { map: Arc::new(HashMap::new()) }));

    let removals_value = fields
        .map
        .get(&Key::String(Arc::new("removals".to_string())))
        .cloned()
        .unwrap_or_else(|| CelValue::List(Arc::new(Vec::new())));

    let base_unstructured = value_bridge::to_unstructured(base)
        .map_err(|e| ExecutionError::function_error("apply_filter", e.to_string()))?;
    let overlay_unstructured = value_bridge::to_unstructured(object)
        .map_err(|e| ExecutionError::function_error("apply_filter", e.to_string()))?;

    let mut merged = merge::merge(
        schema,
        base_unstructured,
        overlay_unstructured,
        preserve_unknown_fields,
    )
    .map_err(|e| ExecutionError::function_error("apply_filter", e.to_string()))?;

    let removals: Vec<String> = match removals_value {
        CelValue::List(items) => items
            .iter()
            .filter_map(|v| match v {
                CelValue::String(s) => Some((**s).clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    merge::apply_removals(&mut merged, &removals)
        .map_err(|e| ExecutionError::function_error("apply_filter", e.to_string()))?;

    Ok(value_bridge::from_unstructured(&merged))
}
