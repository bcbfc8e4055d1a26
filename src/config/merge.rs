//! Deep merge of configuration trees.
//!
//! # Responsibilities
//! - Merge mapping values recursively
//! - Concatenate sequence values (base first, overlay second)
//! - Replace scalars with the overlay value
//!
//! # Design Decisions
//! - Pure function over `serde_json::Value`; sources parsed from TOML or
//!   JSON are normalized to JSON trees before merging
//! - Later sources win on scalar conflicts when folding a source list
//! - Non-object roots are a hard error for the calling load operation

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while merging configuration trees.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Both merge roots must be mapping-typed.
    #[error("cannot merge {overlay} into {base}: both roots must be tables")]
    RootTypeMismatch {
        base: &'static str,
        overlay: &'static str,
    },
}

/// Merge `overlay` into `base`.
///
/// Both roots must be objects. Nested objects merge recursively, arrays
/// concatenate, and any other overlay value replaces the base value.
pub fn merge(base: Value, overlay: Value) -> Result<Value, MergeError> {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => Ok(Value::Object(merge_objects(b, o))),
        (b, o) => Err(MergeError::RootTypeMismatch {
            base: type_name(&b),
            overlay: type_name(&o),
        }),
    }
}

/// Fold an ordered list of sources over a defaults tree.
///
/// Sources are applied left to right, so later sources win on conflicts.
pub fn merge_all<I>(defaults: Value, sources: I) -> Result<Value, MergeError>
where
    I: IntoIterator<Item = Value>,
{
    let mut merged = defaults;
    for source in sources {
        merged = merge(merged, source)?;
    }
    Ok(merged)
}

fn merge_objects(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, overlay_value) in overlay {
        let merged = match base.remove(&key) {
            Some(base_value) => merge_values(base_value, overlay_value),
            None => overlay_value,
        };
        base.insert(key, merged);
    }
    base
}

fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => Value::Object(merge_objects(b, o)),
        (Value::Array(mut b), Value::Array(o)) => {
            b.extend(o);
            Value::Array(b)
        }
        (_, overlay) => overlay,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}
