//! Read-only navigation over an OpenAPI-shaped schema node (C1).
//!
//! Schemas are plain `serde_json::Value` trees — there is no dedicated parser
//! type. `SchemaView` is the capability set the rest of the crate needs to
//! walk one: declared properties, the catch-all schema for undeclared keys,
//! array item shape, and the `x-kubernetes-*` extensions that drive merge and
//! prune behavior. Every accessor returns `None`/empty/`false` when the
//! underlying node doesn't carry that field, so callers never have to special
//! case a missing schema versus an empty one.

use serde_json::{Map, Value};

/// `x-kubernetes-list-type` discriminator for array merge/prune semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    /// Entire array is replaced wholesale by the overlay.
    Atomic,
    /// Array is treated as a set of scalars, merged by value equality.
    Set,
    /// Array is treated as a list of objects, merged by a key tuple.
    Map,
}

impl ListType {
    fn from_str(s: &str) -> Option<ListType> {
        match s {
            "atomic" => Some(ListType::Atomic),
            "set" => Some(ListType::Set),
            "map" => Some(ListType::Map),
            _ => None,
        }
    }
}

pub trait SchemaView {
    fn type_(&self) -> Option<&str>;
    fn format(&self) -> Option<&str>;
    fn properties(&self) -> Option<&Map<String, Value>>;
    fn additional_properties(&self) -> Option<&Value>;
    fn items(&self) -> Option<&Value>;
    fn list_type(&self) -> Option<ListType>;
    fn list_map_keys(&self) -> Vec<&str>;
    fn x_preserve_unknown_fields(&self) -> bool;
    fn x_embedded_resource(&self) -> bool;
}

impl SchemaView for Value {
    fn type_(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    fn format(&self) -> Option<&str> {
        self.get("format").and_then(Value::as_str)
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.get("properties").and_then(Value::as_object)
    }

    fn additional_properties(&self) -> Option<&Value> {
        match self.get("additionalProperties") {
            None | Some(Value::Bool(false)) => None,
            Some(v) => Some(v),
        }
    }

    fn items(&self) -> Option<&Value> {
        self.get("items")
    }

    fn list_type(&self) -> Option<ListType> {
        self.get("x-kubernetes-list-type")
            .and_then(Value::as_str)
            .and_then(ListType::from_str)
    }

    fn list_map_keys(&self) -> Vec<&str> {
        self.get("x-kubernetes-list-map-keys")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    fn x_preserve_unknown_fields(&self) -> bool {
        self.get("x-kubernetes-preserve-unknown-fields")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn x_embedded_resource(&self) -> bool {
        self.get("x-kubernetes-embedded-resource")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Property schema for `key`, declared or falling back to `additionalProperties`.
pub fn child_schema<'a>(schema: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    let schema = schema?;
    schema
        .properties()
        .and_then(|props| props.get(key))
        .or_else(|| schema.additional_properties())
}

/// Whether `key` is declared in `properties` (as opposed to falling under
/// `additionalProperties` or being entirely unknown).
pub fn has_declared_property(schema: Option<&Value>, key: &str) -> bool {
    schema
        .and_then(SchemaView::properties)
        .map(|props| props.contains_key(key))
        .unwrap_or(false)
}

pub fn items(schema: Option<&Value>) -> Option<&Value> {
    schema.and_then(SchemaView::items)
}

pub fn list_type(schema: Option<&Value>) -> Option<ListType> {
    schema.and_then(SchemaView::list_type)
}

pub fn list_map_keys(schema: Option<&Value>) -> Vec<&str> {
    schema.map(SchemaView::list_map_keys).unwrap_or_default()
}

pub fn x_preserve_unknown_fields(schema: Option<&Value>) -> bool {
    schema
        .map(SchemaView::x_preserve_unknown_fields)
        .unwrap_or(false)
}

pub fn x_embedded_resource(schema: Option<&Value>) -> bool {
    schema
        .map(SchemaView::x_embedded_resource)
        .unwrap_or(false)
}
