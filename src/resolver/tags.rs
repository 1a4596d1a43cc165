//! Built-in tags: `ref`, `env` and the primitive conversions.

use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::BconfResult;
use crate::keypath::{KeyPart, KeyPath};
use crate::parser::number::parse_number_text;
use crate::value::Value;

use super::{ResolverContext, TagResolver};

pub(crate) fn builtin_tags() -> HashMap<String, TagResolver> {
    let mut tags: HashMap<String, TagResolver> = HashMap::new();
    tags.insert("ref".to_string(), Rc::new(ref_tag));
    tags.insert("env".to_string(), Rc::new(env_tag));
    tags.insert("string".to_string(), Rc::new(string_tag));
    tags.insert("number".to_string(), Rc::new(number_tag));
    tags.insert("int".to_string(), Rc::new(int_tag));
    tags.insert("float".to_string(), Rc::new(float_tag));
    tags.insert("bool".to_string(), Rc::new(bool_tag));
    tags
}

fn one_arg(ctx: &mut ResolverContext, tag: &str) -> BconfResult<Value> {
    match ctx.next()? {
        Some(value) => Ok(value),
        None => Err(ctx.error(format!("{} expects an argument", tag))),
    }
}

/// `ref(path)` copies the value at `path` out of the already-materialised
/// result tree. A bare number is treated as a root key in string form.
fn ref_tag(ctx: &mut ResolverContext) -> BconfResult<Value> {
    let arg = one_arg(ctx, "ref")?;
    let path = match arg {
        Value::Path(path) => path,
        Value::Integer(n) => KeyPath::new(KeyPart::Alphanumeric(n.to_string())),
        other => {
            return Err(ctx.error(format!("ref expects a key path, got {}", other.type_name())))
        }
    };
    match ctx.lookup(&path) {
        Some(value) => Ok(value),
        None => Err(ctx.error(format!("no value exists at key '{}'", path))),
    }
}

fn env_tag(ctx: &mut ResolverContext) -> BconfResult<Value> {
    let name = match one_arg(ctx, "env")? {
        Value::String(name) => name,
        other => {
            return Err(ctx.error(format!(
                "env expects a variable name string, got {}",
                other.type_name()
            )))
        }
    };
    match ctx.env().get(&name) {
        Some(value) => Ok(Value::String(value.clone())),
        None => Err(ctx.error(format!("environment variable '{}' is not set", name))),
    }
}

fn string_tag(ctx: &mut ResolverContext) -> BconfResult<Value> {
    let value = one_arg(ctx, "string")?;
    match value.primitive_text() {
        Some(text) => Ok(Value::String(text)),
        None => Err(ctx.error(format!(
            "cannot convert {} to a string",
            value.type_name()
        ))),
    }
}

/// The shared primitive-to-number conversion behind `number`, `int` and
/// `float`. Strings go through the full numeric grammar.
fn to_number(ctx: &ResolverContext, value: Value) -> BconfResult<Value> {
    match value {
        Value::Integer(_) | Value::Float(_) => Ok(value),
        Value::Bool(true) => Ok(Value::Integer(1)),
        Value::Bool(false) => Ok(Value::Integer(0)),
        Value::Null => Ok(Value::Integer(0)),
        Value::String(text) => parse_number_text(&text).map_err(|message| ctx.error(message)),
        other => Err(ctx.error(format!(
            "cannot convert {} to a number",
            other.type_name()
        ))),
    }
}

fn number_tag(ctx: &mut ResolverContext) -> BconfResult<Value> {
    let value = one_arg(ctx, "number")?;
    to_number(ctx, value)
}

fn int_tag(ctx: &mut ResolverContext) -> BconfResult<Value> {
    let value = one_arg(ctx, "int")?;
    match to_number(ctx, value)? {
        Value::Float(f) => Ok(Value::Integer(f.trunc() as i64)),
        value => Ok(value),
    }
}

fn float_tag(ctx: &mut ResolverContext) -> BconfResult<Value> {
    let value = one_arg(ctx, "float")?;
    match to_number(ctx, value)? {
        Value::Integer(n) => Ok(Value::Float(n as f64)),
        value => Ok(value),
    }
}

fn bool_tag(ctx: &mut ResolverContext) -> BconfResult<Value> {
    match one_arg(ctx, "bool")? {
        value @ Value::Bool(_) => Ok(value),
        Value::Null => Ok(Value::Bool(false)),
        Value::Integer(n) => Ok(Value::Bool(n != 0)),
        Value::Float(f) => Ok(Value::Bool(f != 0.0)),
        Value::String(s) => Ok(Value::Bool(!s.is_empty())),
        other => Err(ctx.error(format!(
            "cannot convert {} to a boolean",
            other.type_name()
        ))),
    }
}
