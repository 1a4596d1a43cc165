//! The final traversal that replaces internal value records with their
//! external serializable forms.

use super::Value;

/// Recursively converts internal shapes to external ones:
///
/// - `Tag` becomes the two-element array `[name, unwrap(arg)]`
/// - `Statement` becomes its argument groups, recursively unwrapped
/// - `Path` becomes its serialized string
/// - `Collection` becomes its most recent value
///
/// Arrays and objects recurse element-wise; everything else passes through.
pub fn unwrap_value(value: Value) -> Value {
    match value {
        Value::Tag(tag) => {
            let tag = *tag;
            Value::Array(vec![Value::String(tag.name), unwrap_value(tag.arg)])
        }
        Value::Statement(statement) => {
            let statement = *statement;
            Value::Array(
                statement
                    .args
                    .into_iter()
                    .map(|group| Value::Array(group.into_iter().map(unwrap_value).collect()))
                    .collect(),
            )
        }
        Value::Path(path) => Value::String(path.to_string()),
        Value::Collection(collection) => unwrap_value(collection.into_last()),
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, unwrap_value(value)))
                .collect(),
        ),
        other => other,
    }
}
