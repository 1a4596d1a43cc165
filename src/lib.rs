//! bconf is a human-authored configuration language: hierarchical keys with
//! array indexes, typed scalars, strings with escapes and embedded `${...}`
//! expressions, scoped variables with import/export, base-document
//! composition via `extends`, and an extensible tag/statement system.
//!
//! ```
//! let result = bconf::parse(
//!     "$port = 8080\n\
//!      server {\n\
//!          host = \"0.0.0.0\"\n\
//!          port = $port\n\
//!          banner = \"listening on ${$port}\"\n\
//!      }",
//! )
//! .unwrap();
//!
//! assert_eq!(result.data.get("server.port").unwrap().as_i64(), Some(8080));
//! assert_eq!(
//!     result.data.get("server.banner").unwrap().as_str(),
//!     Some("listening on 8080")
//! );
//! ```
//!
//! Tags and statements let callers hook arbitrary value computation into a
//! parse; see [ParseOptions::with_tag] and [ParseOptions::with_statement].

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use parser::{run_parser, Settings};
use resolver::ResolverTables;

pub mod errors;
pub mod keypath;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod resolver;
pub mod value;

#[cfg(test)]
mod testing;

pub use errors::{BconfError, BconfResult};
pub use keypath::{KeyPart, KeyPath};
pub use loader::{FileLoader, FsLoader, LoadArgs};
pub use parser::DuplicateKeys;
pub use resolver::{
    BlockLevel, IdentifierPolicy, InnerParseOptions, ResolverContext, SetVariableArgs,
    StatementAction, StatementResolver, TagResolver, ValueArgs, VarScope,
};
pub use value::{unwrap_value, Collection, Object, Statement, Tag, Value};

/// The outcome of a successful parse.
#[derive(Debug)]
pub struct ParseResult {
    /// The document tree.
    pub data: Value,
    /// The exported variables.
    pub variables: Value,
}

/// Options for [parse_with].
pub struct ParseOptions {
    /// Tag resolvers merged over the built-in table; user entries win on
    /// name conflicts.
    pub tags: Vec<(String, TagResolver)>,
    /// Statement resolvers, same merge rule.
    pub statements: Vec<(String, StatementResolver)>,
    /// Variables pre-defined in the root scope. Names must be `$`-prefixed
    /// to be reachable from documents.
    pub variables: HashMap<String, Value>,
    /// The environment map `env(...)` reads. Defaults to the process
    /// environment.
    pub env: Option<HashMap<String, String>>,
    /// Base directory handed to the file loader. Defaults to the current
    /// working directory, `/` as a fallback.
    pub root_dir: Option<PathBuf>,
    /// Source name used in error messages and exposed to resolvers.
    pub file: Option<String>,
    /// The file loader behind `import` and `extends`. Defaults to
    /// [FsLoader].
    pub loader: Option<Rc<dyn FileLoader>>,
    /// Whether internal value shapes are unwrapped at the end. Default
    /// true.
    pub unwrap: bool,
    pub duplicate_keys: DuplicateKeys,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tags: vec![],
            statements: vec![],
            variables: HashMap::new(),
            env: None,
            root_dir: None,
            file: None,
            loader: None,
            unwrap: true,
            duplicate_keys: DuplicateKeys::default(),
        }
    }
}

impl ParseOptions {
    pub fn with_tag<F>(mut self, name: &str, resolver: F) -> Self
    where
        F: Fn(&mut ResolverContext) -> BconfResult<Value> + 'static,
    {
        self.tags.push((name.to_string(), Rc::new(resolver)));
        self
    }

    pub fn with_statement<F>(mut self, name: &str, resolver: F) -> Self
    where
        F: Fn(&mut ResolverContext) -> BconfResult<StatementAction> + 'static,
    {
        self.statements.push((name.to_string(), Rc::new(resolver)));
        self
    }

    pub fn with_variable(mut self, name: &str, value: Value) -> Self {
        self.variables.insert(name.to_string(), value);
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_root_dir<P: Into<PathBuf>>(mut self, root_dir: P) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    pub fn with_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }

    pub fn with_loader(mut self, loader: Rc<dyn FileLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_duplicate_keys(mut self, policy: DuplicateKeys) -> Self {
        self.duplicate_keys = policy;
        self
    }

    /// Keeps `Tag`/`Statement`/`KeyPath`/`Collection` records in the result
    /// instead of unwrapping them.
    pub fn keep_internal_values(mut self) -> Self {
        self.unwrap = false;
        self
    }

    fn into_settings(self) -> (Settings, HashMap<String, Value>) {
        let ParseOptions {
            tags,
            statements,
            variables,
            env,
            root_dir,
            file,
            loader,
            unwrap,
            duplicate_keys,
        } = self;
        let settings = Settings {
            resolvers: ResolverTables::with_builtins(tags, statements),
            env: env.unwrap_or_else(|| std::env::vars().collect()),
            root_dir: root_dir.unwrap_or_else(default_root_dir),
            file,
            loader: loader.unwrap_or_else(|| Rc::new(FsLoader)),
            unwrap,
            duplicate_keys,
        };
        (settings, variables)
    }
}

/// Parses a document with default options.
pub fn parse(input: &str) -> BconfResult<ParseResult> {
    parse_with(input, ParseOptions::default())
}

/// Parses a document. Returns the unwrapped document tree and the exported
/// variables, or the first error encountered.
pub fn parse_with(input: &str, options: ParseOptions) -> BconfResult<ParseResult> {
    let (settings, seed) = options.into_settings();
    run_parser(input, Rc::new(settings), seed)
}

fn default_root_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
}
