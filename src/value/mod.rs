use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq, SerializeTuple};
use serde::{Serialize, Serializer};

use crate::keypath::KeyPath;

mod merge;
mod unwrap;

pub(crate) use merge::merge_under;
pub use unwrap::unwrap_value;

/// Objects preserve the order keys were written in.
pub type Object = IndexMap<String, Value>;

/// A parsed configuration value.
///
/// `Tag`, `Statement`, `Path` and `Collection` are internal shapes: they are
/// produced during parsing and either resolved away or converted to their
/// external form by the final unwrap pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    Tag(Box<Tag>),
    Statement(Box<Statement>),
    Path(KeyPath),
    Collection(Collection),
}

/// A tag invocation that had no registered resolver. Unwraps to the pair
/// `[name, arg]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub arg: Value,
}

/// Collected statement invocations for one key. Each inner vector holds the
/// arguments of one invocation line.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub name: KeyPath,
    pub args: Vec<Vec<Value>>,
}

/// Wraps the values assigned to a duplicated key when the parser runs under
/// the `collect` duplicate-key policy. Never appears otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    collected: Vec<Value>,
}

impl Collection {
    pub fn new(first: Value, second: Value) -> Self {
        Self {
            collected: vec![first, second],
        }
    }

    pub fn push(&mut self, value: Value) {
        self.collected.push(value);
    }

    /// The most recently collected value; this is what the collection
    /// unwraps to.
    pub fn last(&self) -> &Value {
        self.collected.last().expect("collection is never empty")
    }

    pub fn into_last(mut self) -> Value {
        self.collected.pop().expect("collection is never empty")
    }

    pub fn iter(&self) -> std::slice::Iter<Value> {
        self.collected.iter()
    }

    pub fn len(&self) -> usize {
        self.collected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collected.is_empty()
    }
}

impl Value {
    /// Primitives are the only values an embedded expression may produce.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Integer(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// The textual form of a primitive: what embedded expressions splice
    /// into strings and what the `string` tag returns. `None` for
    /// non-primitives.
    pub fn primitive_text(&self) -> Option<String> {
        match self {
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Integer(n) => Some(n.to_string()),
            Value::Float(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// How this value reads in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Tag(_) => "tag",
            Value::Statement(_) => "statement",
            Value::Path(_) => "key path",
            Value::Collection(_) => "collection",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Navigates the tree by a serialized key path, e.g.
    /// `value.get("server.hosts[0]")`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let path = KeyPath::parse(path).ok()?;
        self.get_path(&path)
    }

    /// Navigates the tree by an already-parsed key path.
    pub fn get_path(&self, path: &KeyPath) -> Option<&Value> {
        navigate(self, path.parts())
    }
}

/// Walks `parts` down a value: named parts address objects, index parts
/// address arrays; any mismatch resolves to `None`.
pub(crate) fn navigate<'a>(value: &'a Value, parts: &[crate::keypath::KeyPart]) -> Option<&'a Value> {
    use crate::keypath::KeyPart;
    let mut current = value;
    for part in parts {
        current = match (current, part) {
            (Value::Object(map), KeyPart::Alphanumeric(name))
            | (Value::Object(map), KeyPart::Str(name))
            | (Value::Object(map), KeyPart::Variable(name)) => map.get(name)?,
            (Value::Array(items), KeyPart::Index(index)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolves a key path against the root object of the result tree.
pub(crate) fn get_in_object<'a>(map: &'a Object, path: &KeyPath) -> Option<&'a Value> {
    let first = map.get(path.first().name()?)?;
    navigate(first, &path.parts()[1..])
}

impl Serialize for Value {
    /// Internal shapes serialize as their unwrapped form, so a tree can be
    /// handed to any serde format whether or not the caller unwrapped it.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Value::Tag(tag) => {
                let mut tuple = serializer.serialize_tuple(2)?;
                tuple.serialize_element(&tag.name)?;
                tuple.serialize_element(&tag.arg)?;
                tuple.end()
            }
            Value::Statement(statement) => {
                let mut seq = serializer.serialize_seq(Some(statement.args.len()))?;
                for group in &statement.args {
                    seq.serialize_element(group)?;
                }
                seq.end()
            }
            Value::Path(path) => serializer.serialize_str(&path.to_string()),
            Value::Collection(collection) => collection.last().serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
