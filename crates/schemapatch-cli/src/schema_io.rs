//! File loading for the CLI: schema/object/patch arguments are all plain
//! JSON or YAML files on disk, sniffed by extension the way `schema.rs`'s
//! `load_url` does for its `file://` scheme (minus the HTTP branch, which
//! this thin CLI has no use for).

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

pub fn load_value(path: &str) -> Result<Value, Error> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    if is_yaml_path(path) {
        serde_yaml::Deserializer::from_str(&content)
            .next()
            .map(|d| {
                Value::deserialize(d).map_err(|e| Error::FileParse {
                    path: path.to_string(),
                    format: "yaml",
                    reason: e.to_string(),
                })
            })
            .unwrap_or_else(|| Ok(Value::Null))
    } else {
        serde_json::from_str(&content).map_err(|e| Error::FileParse {
            path: path.to_string(),
            format: "json",
            reason: e.to_string(),
        })
    }
}

fn is_yaml_path(path: &str) -> bool {
    path.ends_with(".yaml") || path.ends_with(".yml")
}
