//! The resolver runtime: the protocol by which user-provided tag and
//! statement callbacks inject computed values back into a running parse.

use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::BconfResult;
use crate::value::Value;

pub use crate::parser::scope::VarScope;
pub use context::{InnerParseOptions, ResolverContext, SetVariableArgs};

mod context;
pub(crate) mod statements;
pub(crate) mod tags;

/// A tag resolver turns `name(...)` into a value. It may pull any number of
/// argument values through [ResolverContext::next].
pub type TagResolver = Rc<dyn Fn(&mut ResolverContext) -> BconfResult<Value>>;

/// A statement resolver decides what happens to a statement line.
pub type StatementResolver = Rc<dyn Fn(&mut ResolverContext) -> BconfResult<StatementAction>>;

/// What the parser does with a statement after its resolver returns.
#[derive(Debug)]
pub enum StatementAction {
    /// Drop the statement entirely.
    Discard,
    /// Deep-merge the given object into the block being parsed. Errors when
    /// the value is not an object.
    Merge { value: Value },
    /// Append to the `Statement` record at the key: the given value as one
    /// call group, or the statement's remaining values when `None`.
    Collect(Option<Value>),
}

/// Whether the enclosing block is the document root or an object body;
/// exposed to resolvers as [ResolverContext::scope].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLevel {
    Root,
    Object,
}

/// How a bare identifier in value position is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Return the identifier (with any dotted/indexed continuation) as a
    /// key path. Used inside tag arguments.
    KeyPath,
    /// Return the identifier's literal as a string, rejecting dotted or
    /// indexed continuations. Used for statement arguments.
    Literal,
    /// Bare identifiers are an error. Used for assignment values.
    Disallow,
}

/// Options for parsing one value; resolvers may override them per
/// [ResolverContext::next_with] call.
#[derive(Debug, Clone, Copy)]
pub struct ValueArgs {
    pub identifiers: IdentifierPolicy,
    /// When set, `$var` parses to a key path instead of resolving through
    /// the scope chain.
    pub var_as_key_path: bool,
}

impl ValueArgs {
    /// Defaults for values after `=` and `<<` and inside arrays.
    pub fn assignment() -> Self {
        Self {
            identifiers: IdentifierPolicy::Disallow,
            var_as_key_path: false,
        }
    }

    /// Defaults inside a tag's parentheses.
    pub fn tag() -> Self {
        Self {
            identifiers: IdentifierPolicy::KeyPath,
            var_as_key_path: false,
        }
    }

    /// Defaults for statement arguments.
    pub fn statement() -> Self {
        Self {
            identifiers: IdentifierPolicy::Literal,
            var_as_key_path: true,
        }
    }
}

/// The merged tag and statement tables for one parser instance. Built-ins
/// are installed first, so user entries win on name conflicts.
#[derive(Clone)]
pub(crate) struct ResolverTables {
    pub tags: HashMap<String, TagResolver>,
    pub statements: HashMap<String, StatementResolver>,
}

impl ResolverTables {
    pub fn with_builtins(
        user_tags: Vec<(String, TagResolver)>,
        user_statements: Vec<(String, StatementResolver)>,
    ) -> Self {
        let mut tags = tags::builtin_tags();
        for (name, resolver) in user_tags {
            tags.insert(name, resolver);
        }
        let mut statements = statements::builtin_statements();
        for (name, resolver) in user_statements {
            statements.insert(name, resolver);
        }
        Self { tags, statements }
    }
}
