//! The recursive-descent parser: drives the block loop, key-path
//! materialization, operator dispatch, scopes and the resolver protocol.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use log::debug;

use crate::errors::{BconfError, BconfResult};
use crate::keypath::{KeyPart, KeyPath};
use crate::lexer::{self, Token, TokenKind};
use crate::loader::FileLoader;
use crate::resolver::{
    IdentifierPolicy, ResolverContext, ResolverTables, StatementAction, ValueArgs,
};
use crate::value::{merge_under, unwrap_value, Collection, Object, Statement, Tag, Value};
use crate::ParseResult;

use scope::{Scopes, VarScope};

pub(crate) mod number;
pub(crate) mod scope;
mod strings;

/// What happens when the same non-index key is assigned twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKeys {
    /// The later assignment wins. The default.
    Override,
    /// Every assigned value is kept in a [Collection]; the collection
    /// unwraps to the most recent value.
    Collect,
    /// A duplicate assignment is an error.
    Disallow,
}

impl Default for DuplicateKeys {
    fn default() -> Self {
        DuplicateKeys::Override
    }
}

/// Per-parse configuration, shared (behind `Rc`) between the parser, its
/// resolver contexts and any nested parses those start.
#[derive(Clone)]
pub(crate) struct Settings {
    pub resolvers: ResolverTables,
    pub env: HashMap<String, String>,
    pub root_dir: PathBuf,
    pub file: Option<String>,
    pub loader: Rc<dyn FileLoader>,
    pub unwrap: bool,
    pub duplicate_keys: DuplicateKeys,
}

/// Runs a full parse over `input` and packages the result per the settings'
/// unwrap flag. Both the public entry points and nested
/// [ResolverContext::parse] calls come through here.
pub(crate) fn run_parser(
    input: &str,
    settings: Rc<Settings>,
    seed: HashMap<String, Value>,
) -> BconfResult<ParseResult> {
    let parser = Parser::new(input, settings.clone(), seed);
    let (data, exports) = parser
        .run()
        .map_err(|err| err.with_file(settings.file.as_deref()))?;

    let mut data = Value::Object(data);
    let mut variables = Value::Object(exports);
    if settings.unwrap {
        data = unwrap_value(data);
        variables = unwrap_value(variables);
    }
    Ok(ParseResult { data, variables })
}

enum StoreOp {
    Assign,
    Append,
    /// A key on a line of its own; assigns `true`.
    Shorthand,
    /// Appends one call group to the `Statement` record at the key. The
    /// group travels as a `Value::Array`.
    CollectStatement,
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub(crate) root: Object,
    pub(crate) scopes: Scopes,
    pub(crate) exports: Object,
    pub(crate) settings: Rc<Settings>,
    pub(crate) depth: usize,
}

impl Parser {
    pub fn new(input: &str, settings: Rc<Settings>, seed: HashMap<String, Value>) -> Self {
        let tokens = lexer::tokenize(input)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace && t.kind != TokenKind::Comment)
            .collect();
        Self {
            tokens,
            pos: 0,
            root: Object::new(),
            scopes: Scopes::new(seed),
            exports: Object::new(),
            settings,
            depth: 0,
        }
    }

    /// Parses the root block to completion and returns the document object
    /// together with the exported variables.
    pub fn run(mut self) -> BconfResult<(Object, Object)> {
        debug!(
            "parsing {}",
            self.settings.file.as_deref().unwrap_or("<input>")
        );
        self.parse_root()?;
        Ok((self.root, self.exports))
    }

    fn parse_root(&mut self) -> BconfResult<()> {
        loop {
            self.skip_newlines();
            match self.kind() {
                TokenKind::Eof => return Ok(()),
                TokenKind::Comma => {
                    return Err(self.error_at_current("unexpected ',' at the root"))
                }
                _ => self.parse_entry(None, None)?,
            }
        }
    }

    /// Parses one block line: a key path followed by an operator. `detached`
    /// is the object under construction for nested blocks; `None` targets
    /// the document root.
    fn parse_entry(
        &mut self,
        detached: Option<&mut Object>,
        stop: Option<TokenKind>,
    ) -> BconfResult<()> {
        let key_token = self.current().clone();
        let key = self.parse_key_path()?;

        match self.kind() {
            TokenKind::Assign => {
                self.bump();
                let value = self.parse_value(ValueArgs::assignment())?;
                self.store(detached, &key, value, StoreOp::Assign, &key_token)
            }
            TokenKind::Append => {
                self.bump();
                let value = self.parse_value(ValueArgs::assignment())?;
                self.store(detached, &key, value, StoreOp::Append, &key_token)
            }
            TokenKind::LBrace => {
                let body = self.parse_object_body()?;
                self.store(
                    detached,
                    &key,
                    Value::Object(body),
                    StoreOp::Assign,
                    &key_token,
                )
            }
            kind if is_entry_end(kind, stop) => {
                // The terminator stays for the block loop to consume.
                self.store(detached, &key, Value::Bool(true), StoreOp::Shorthand, &key_token)
            }
            kind if is_value_start(kind) => self.parse_statement(key, detached, stop, &key_token),
            _ => Err(self.error_at_current(format!(
                "unexpected {} after key '{}'",
                self.current().describe(),
                key
            ))),
        }
    }

    /// Parses `{ ... }` into a fresh object. A new variable scope wraps the
    /// body and is dropped when the object closes.
    pub(crate) fn parse_object_body(&mut self) -> BconfResult<Object> {
        self.expect(TokenKind::LBrace)?;
        self.scopes.push();
        self.depth += 1;
        let result = self.parse_object_entries();
        self.depth -= 1;
        self.scopes.pop();
        let body = result?;
        self.expect(TokenKind::RBrace)?;
        Ok(body)
    }

    fn parse_object_entries(&mut self) -> BconfResult<Object> {
        let mut body = Object::new();
        loop {
            self.skip_separators();
            match self.kind() {
                TokenKind::RBrace | TokenKind::Eof => return Ok(body),
                _ => self.parse_entry(Some(&mut body), Some(TokenKind::RBrace))?,
            }
        }
    }

    // ------------------------------------------------------------------
    // Key paths
    // ------------------------------------------------------------------

    /// `keyPart (DOT keyPart | '[' integer ']')*`. The first part may be an
    /// identifier, a variable or a quoted string; later parts may not be
    /// variables, and index parts require non-negative integers.
    pub(crate) fn parse_key_path(&mut self) -> BconfResult<KeyPath> {
        self.fail_if_illegal()?;
        let token = self.current().clone();
        let first = match token.kind {
            TokenKind::Identifier => {
                self.bump();
                KeyPart::Alphanumeric(token.literal)
            }
            TokenKind::Variable => {
                self.bump();
                KeyPart::Variable(token.literal)
            }
            TokenKind::DoubleQuote | TokenKind::TripleQuote => KeyPart::Str(self.parse_string()?),
            TokenKind::Assign | TokenKind::Append | TokenKind::Dot | TokenKind::Comma => {
                return Err(self.error_at_current("empty key"))
            }
            _ => return Err(self.error_at_current(format!("unexpected {}", token.describe()))),
        };

        let mut path = KeyPath::new(first);
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.bump();
                    self.fail_if_illegal()?;
                    let part = self.current().clone();
                    match part.kind {
                        TokenKind::Identifier => {
                            self.bump();
                            path.push(KeyPart::Alphanumeric(part.literal));
                        }
                        TokenKind::DoubleQuote | TokenKind::TripleQuote => {
                            let key = self.parse_string()?;
                            path.push(KeyPart::Str(key));
                        }
                        TokenKind::Variable => {
                            return Err(self.error_at_current(
                                "variables may only appear at the start of a key",
                            ))
                        }
                        _ => {
                            return Err(self.error_at_current(format!(
                                "expected a key part after '.', found {}",
                                part.describe()
                            )))
                        }
                    }
                }
                TokenKind::IndexLBracket => {
                    self.bump();
                    let index_token = self.current().clone();
                    let index = match index_token.kind {
                        TokenKind::Identifier
                            if !index_token.literal.is_empty()
                                && index_token.literal.chars().all(|c| c.is_ascii_digit()) =>
                        {
                            index_token.literal.parse::<usize>().map_err(|_| {
                                self.error_at_current(format!(
                                    "invalid index '{}'",
                                    index_token.literal
                                ))
                            })?
                        }
                        _ => {
                            return Err(self.error_at_current(format!(
                                "invalid index {}",
                                index_token.describe()
                            )))
                        }
                    };
                    self.bump();
                    self.expect(TokenKind::RBracket)?;
                    path.push(KeyPart::Index(index));
                }
                _ => return Ok(path),
            }
        }
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    pub(crate) fn parse_value(&mut self, args: ValueArgs) -> BconfResult<Value> {
        self.fail_if_illegal()?;
        let token = self.current().clone();
        match token.kind {
            TokenKind::Null => {
                self.bump();
                Ok(Value::Null)
            }
            TokenKind::Boolean => {
                self.bump();
                Ok(Value::Bool(token.literal == "true"))
            }
            TokenKind::DoubleQuote | TokenKind::TripleQuote => {
                Ok(Value::String(self.parse_string()?))
            }
            TokenKind::LBrace => Ok(Value::Object(self.parse_object_body()?)),
            TokenKind::LBracket => self.parse_array(args),
            TokenKind::Variable => {
                let path = self.parse_key_path()?;
                if args.var_as_key_path {
                    Ok(Value::Path(path))
                } else {
                    self.resolve_variable(&path, &token)
                }
            }
            TokenKind::Identifier => {
                if self.tag_follows() {
                    return self.parse_tag();
                }
                if number::is_number_candidate(&token.literal) {
                    return self.parse_number();
                }
                match args.identifiers {
                    IdentifierPolicy::KeyPath => Ok(Value::Path(self.parse_key_path()?)),
                    IdentifierPolicy::Literal => {
                        self.bump();
                        if matches!(self.kind(), TokenKind::Dot | TokenKind::IndexLBracket) {
                            return Err(self.error_at_current(format!(
                                "unexpected {} after '{}'",
                                self.current().describe(),
                                token.literal
                            )));
                        }
                        Ok(Value::String(token.literal))
                    }
                    IdentifierPolicy::Disallow => {
                        let path = self.parse_key_path()?;
                        Err(BconfError::parse(
                            token.row,
                            token.column,
                            format!("invalid key '{}'", path),
                        ))
                    }
                }
            }
            _ => Err(self.error_at_current(format!("unexpected {}", token.describe()))),
        }
    }

    /// `[ ... ]` with values separated by commas and/or newlines; empty
    /// arrays and trailing separators are fine.
    fn parse_array(&mut self, args: ValueArgs) -> BconfResult<Value> {
        self.expect(TokenKind::LBracket)?;
        let mut items = vec![];
        loop {
            self.skip_separators();
            match self.kind() {
                TokenKind::RBracket => break,
                TokenKind::Eof => {
                    return Err(self.error_at_current("expected ']', found end of input"))
                }
                _ => items.push(self.parse_value(args)?),
            }
        }
        self.bump();
        Ok(Value::Array(items))
    }

    /// Reassembles a number from identifier/dot tokens and classifies it.
    fn parse_number(&mut self) -> BconfResult<Value> {
        let token = self.bump();
        let mut literal = token.literal.clone();
        let mut force_float = false;

        if self.kind() == TokenKind::Dot {
            self.bump();
            let fraction = self.current().clone();
            let leads_with_digit = fraction
                .literal
                .chars()
                .next()
                .map(|c| c.is_ascii_digit() || c == '_')
                .unwrap_or(false);
            if fraction.kind != TokenKind::Identifier || !leads_with_digit {
                return Err(
                    self.error_at_current(format!("invalid number '{}.': expected digits", literal))
                );
            }
            self.bump();
            literal.push('.');
            literal.push_str(&fraction.literal);
            force_float = true;
        }
        if self.kind() == TokenKind::Dot {
            return Err(self.error_at_current(format!("invalid number '{}'", literal)));
        }

        number::parse_number_literal(&literal, force_float)
            .map_err(|message| BconfError::parse(token.row, token.column, message))
    }

    fn resolve_variable(&self, path: &KeyPath, token: &Token) -> BconfResult<Value> {
        let name = path.variable_name().expect("variable-headed path");
        let base = match self.scopes.get(name) {
            Some(value) => value,
            None => {
                return Err(BconfError::parse(
                    token.row,
                    token.column,
                    format!("could not resolve variable '{}'", name),
                ))
            }
        };
        match crate::value::navigate(base, &path.parts()[1..]) {
            Some(value) => Ok(value.clone()),
            None => Err(BconfError::parse(
                token.row,
                token.column,
                format!("could not resolve variable '{}'", path),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Tags and statements
    // ------------------------------------------------------------------

    /// A tag is an identifier directly followed by its `(`. The lexer uses
    /// the same adjacency rule for its tagged-value frame.
    fn tag_follows(&self) -> bool {
        let token = self.current();
        if token.kind != TokenKind::Identifier {
            return false;
        }
        let next = &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)];
        next.kind == TokenKind::LParen
            && next.row == token.row
            && next.column == token.column + token.literal.chars().count() as u32
    }

    pub(crate) fn parse_tag(&mut self) -> BconfResult<Value> {
        let name_token = self.bump();
        let name = name_token.literal;
        self.expect(TokenKind::LParen)?;

        let resolver = self.settings.resolvers.tags.get(&name).cloned();
        match resolver {
            Some(resolver) => {
                let result = {
                    let mut ctx = ResolverContext::for_tag(self);
                    resolver(&mut ctx)
                };
                let value = match result {
                    Ok(value) => value,
                    Err(err) => return Err(self.rewrap_resolver_error(err)),
                };
                // Values the resolver did not pull are parsed and dropped.
                loop {
                    self.skip_separators();
                    match self.kind() {
                        TokenKind::RParen => break,
                        TokenKind::Eof => {
                            return Err(
                                self.error_at_current("expected ')', found end of input")
                            )
                        }
                        _ => {
                            self.parse_value(ValueArgs::tag())?;
                        }
                    }
                }
                self.bump();
                Ok(value)
            }
            None => {
                let arg = self.parse_value(ValueArgs::tag())?;
                self.expect(TokenKind::RParen)?;
                Ok(Value::Tag(Box::new(Tag { name, arg })))
            }
        }
    }

    fn parse_statement(
        &mut self,
        key: KeyPath,
        detached: Option<&mut Object>,
        stop: Option<TokenKind>,
        key_token: &Token,
    ) -> BconfResult<()> {
        if key.parts().iter().any(|p| matches!(p, KeyPart::Index(_))) {
            return Err(BconfError::parse(
                key_token.row,
                key_token.column,
                format!("invalid statement key '{}'", key),
            ));
        }

        let name = key.first_name().expect("statement keys are named").to_string();
        let resolver = self.settings.resolvers.statements.get(&name).cloned();
        let action = match resolver {
            Some(resolver) => {
                let result = {
                    let mut ctx = ResolverContext::for_statement(self, stop);
                    resolver(&mut ctx)
                };
                match result {
                    Ok(action) => action,
                    Err(err) => return Err(self.rewrap_resolver_error(err)),
                }
            }
            None => StatementAction::Collect(None),
        };

        let remaining = self.read_statement_values(stop)?;
        match action {
            StatementAction::Discard => Ok(()),
            StatementAction::Merge { value } => match value {
                Value::Object(incoming) => {
                    let target = match detached {
                        Some(obj) => obj,
                        None => &mut self.root,
                    };
                    merge_under(target, incoming);
                    Ok(())
                }
                other => Err(BconfError::parse(
                    key_token.row,
                    key_token.column,
                    format!("merge value must be an object, got {}", other.type_name()),
                )),
            },
            StatementAction::Collect(Some(value)) => self.store(
                detached,
                &key,
                Value::Array(vec![value]),
                StoreOp::CollectStatement,
                key_token,
            ),
            StatementAction::Collect(None) => self.store(
                detached,
                &key,
                Value::Array(remaining),
                StoreOp::CollectStatement,
                key_token,
            ),
        }
    }

    fn read_statement_values(&mut self, stop: Option<TokenKind>) -> BconfResult<Vec<Value>> {
        let mut values = vec![];
        loop {
            let kind = self.kind();
            if matches!(kind, TokenKind::Newline | TokenKind::Eof | TokenKind::Comma)
                || Some(kind) == stop
            {
                return Ok(values);
            }
            values.push(self.parse_value(ValueArgs::statement())?);
        }
    }

    pub(crate) fn rewrap_resolver_error(&self, err: BconfError) -> BconfError {
        match err {
            BconfError::Parse { .. } => err,
            BconfError::Io(io_err) => self.error_at_current(io_err.to_string()),
        }
    }

    // ------------------------------------------------------------------
    // Storage
    // ------------------------------------------------------------------

    fn store(
        &mut self,
        detached: Option<&mut Object>,
        key: &KeyPath,
        value: Value,
        op: StoreOp,
        key_token: &Token,
    ) -> BconfResult<()> {
        // `$x = ...` and `$x << ...` bind in the scope chain; shorthand and
        // statement entries under a variable key live in the block object
        // (which is how import/export blocks list their names).
        if key.is_variable() && matches!(op, StoreOp::Assign | StoreOp::Append) {
            return self.store_variable(key, value, op, key_token);
        }
        let policy = self.settings.duplicate_keys;
        let target = match detached {
            Some(obj) => obj,
            None => &mut self.root,
        };
        store_in_object(target, key, value, op, policy)
            .map_err(|message| BconfError::parse(key_token.row, key_token.column, message))
    }

    fn store_variable(
        &mut self,
        key: &KeyPath,
        value: Value,
        op: StoreOp,
        key_token: &Token,
    ) -> BconfResult<()> {
        if key.len() > 1 {
            return Err(BconfError::parse(
                key_token.row,
                key_token.column,
                format!("invalid key '{}': variables cannot be assigned through a path", key),
            ));
        }
        let name = key.variable_name().expect("variable-headed path").to_string();
        let value = match op {
            StoreOp::Append => {
                let mut items = match self.scopes.get(&name) {
                    Some(Value::Array(items)) => items.clone(),
                    _ => vec![],
                };
                items.push(value);
                Value::Array(items)
            }
            _ => value,
        };
        self.scopes.set(&name, value, VarScope::Current);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> BconfResult<Token> {
        if self.kind() == kind {
            Ok(self.bump())
        } else {
            Err(self.error_at_current(format!(
                "expected {}, found {}",
                kind,
                self.current().describe()
            )))
        }
    }

    pub(crate) fn error_at_current<M: Into<String>>(&self, message: M) -> BconfError {
        let token = self.current();
        BconfError::parse(token.row, token.column, message)
    }

    fn fail_if_illegal(&self) -> BconfResult<()> {
        if self.kind() == TokenKind::Illegal {
            let literal = self.current().literal.escape_debug().to_string();
            return Err(self.error_at_current(format!("illegal character '{}'", literal)));
        }
        Ok(())
    }

    fn skip_newlines(&mut self) {
        while self.kind() == TokenKind::Newline {
            self.bump();
        }
    }

    /// Newlines and commas both separate entries inside objects, arrays and
    /// tag argument lists.
    pub(crate) fn skip_separators(&mut self) {
        while matches!(self.kind(), TokenKind::Newline | TokenKind::Comma) {
            self.bump();
        }
    }
}

fn is_entry_end(kind: TokenKind, stop: Option<TokenKind>) -> bool {
    matches!(kind, TokenKind::Newline | TokenKind::Eof | TokenKind::Comma) || Some(kind) == stop
}

fn is_value_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::Boolean
            | TokenKind::Null
            | TokenKind::LBracket
            | TokenKind::DoubleQuote
            | TokenKind::TripleQuote
    )
}

// ----------------------------------------------------------------------
// Key-path materialization
// ----------------------------------------------------------------------

fn store_in_object(
    map: &mut Object,
    path: &KeyPath,
    value: Value,
    op: StoreOp,
    policy: DuplicateKeys,
) -> Result<(), String> {
    store_named(map, path, path.parts(), value, op, policy)
}

fn store_named(
    map: &mut Object,
    path: &KeyPath,
    parts: &[KeyPart],
    value: Value,
    op: StoreOp,
    policy: DuplicateKeys,
) -> Result<(), String> {
    let name = parts[0]
        .name()
        .expect("index parts never lead a stored path")
        .to_string();
    if parts.len() == 1 {
        return apply_named_terminal(map, &name, path, value, op, policy);
    }
    let child = map.entry(name).or_insert(Value::Null);
    store_in_slot(child, path, &parts[1..], value, op, policy)
}

/// Walks one level down, materialising the container the next part needs:
/// an array for index parts (grown with nulls), an object for named parts.
/// A wrong-typed container is replaced.
fn store_in_slot(
    slot: &mut Value,
    path: &KeyPath,
    parts: &[KeyPart],
    value: Value,
    op: StoreOp,
    policy: DuplicateKeys,
) -> Result<(), String> {
    match &parts[0] {
        KeyPart::Index(index) => {
            let index = *index;
            if !matches!(slot, Value::Array(_)) {
                *slot = Value::Array(vec![]);
            }
            let items = match slot {
                Value::Array(items) => items,
                _ => unreachable!(),
            };
            while items.len() <= index {
                items.push(Value::Null);
            }
            if parts.len() == 1 {
                match op {
                    // Index assignments may always overwrite.
                    StoreOp::Assign | StoreOp::Shorthand | StoreOp::CollectStatement => {
                        items[index] = value;
                    }
                    StoreOp::Append => append_value(&mut items[index], value),
                }
                Ok(())
            } else {
                store_in_slot(&mut items[index], path, &parts[1..], value, op, policy)
            }
        }
        _named => {
            if !matches!(slot, Value::Object(_)) {
                *slot = Value::Object(Object::new());
            }
            let map = match slot {
                Value::Object(map) => map,
                _ => unreachable!(),
            };
            store_named(map, path, parts, value, op, policy)
        }
    }
}

fn apply_named_terminal(
    map: &mut Object,
    name: &str,
    path: &KeyPath,
    value: Value,
    op: StoreOp,
    policy: DuplicateKeys,
) -> Result<(), String> {
    match op {
        StoreOp::Append => {
            let slot = map.entry(name.to_string()).or_insert(Value::Null);
            append_value(slot, value);
            Ok(())
        }
        StoreOp::CollectStatement => {
            let group = match value {
                Value::Array(items) => items,
                _ => unreachable!("call groups travel as arrays"),
            };
            match map.get_mut(name) {
                Some(Value::Statement(existing)) => existing.args.push(group),
                _ => {
                    map.insert(
                        name.to_string(),
                        Value::Statement(Box::new(Statement {
                            name: path.clone(),
                            args: vec![group],
                        })),
                    );
                }
            }
            Ok(())
        }
        StoreOp::Assign | StoreOp::Shorthand => {
            if !map.contains_key(name) {
                map.insert(name.to_string(), value);
                return Ok(());
            }
            match policy {
                DuplicateKeys::Override => {
                    map.insert(name.to_string(), value);
                    Ok(())
                }
                DuplicateKeys::Disallow => Err(format!("duplicate key '{}'", name)),
                DuplicateKeys::Collect => {
                    let existing = map.get_mut(name).unwrap();
                    match existing {
                        Value::Collection(collection) => collection.push(value),
                        _ => {
                            let old = std::mem::replace(existing, Value::Null);
                            *existing = Value::Collection(Collection::new(old, value));
                        }
                    }
                    Ok(())
                }
            }
        }
    }
}

fn append_value(slot: &mut Value, value: Value) {
    match slot {
        Value::Array(items) => items.push(value),
        _ => *slot = Value::Array(vec![value]),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::testing::{parse_err, parse_json};
    use crate::value::Value;
    use crate::{parse_with, DuplicateKeys, ParseOptions, StatementAction};

    #[test]
    fn scalars() {
        assert_eq!(
            parse_json("a = 1\nb = -2\nc = 1.5\nd = \"text\"\ne = true\nf = false\ng = null"),
            json!({ "a": 1, "b": -2, "c": 1.5, "d": "text", "e": true, "f": false, "g": null })
        );
    }

    #[test]
    fn variables_resolve_through_scopes() {
        assert_eq!(
            parse_json("$p = 8080\nserver { host = \"0.0.0.0\"\nport = $p }"),
            json!({ "server": { "host": "0.0.0.0", "port": 8080 } })
        );
    }

    #[test]
    fn index_assignment_pads_with_nulls() {
        assert_eq!(parse_json("arr[2] = \"X\""), json!({ "arr": [null, null, "X"] }));
        // Positions below stay intact when previously set.
        assert_eq!(
            parse_json("arr[0] = 1\narr[2] = 3"),
            json!({ "arr": [1, null, 3] })
        );
    }

    #[test]
    fn append_operator_builds_arrays() {
        assert_eq!(parse_json("list << \"a\"\nlist << \"b\""), json!({ "list": ["a", "b"] }));
        // A non-array value is replaced by a fresh array.
        assert_eq!(parse_json("list = 1\nlist << 2"), json!({ "list": [2] }));
    }

    #[test]
    fn unhandled_statements_collect_call_groups() {
        assert_eq!(
            parse_json("allow from localhost\nallow from \"10.0.0.0/8\""),
            json!({ "allow": [["from", "localhost"], ["from", "10.0.0.0/8"]] })
        );
    }

    #[test]
    fn embedded_expressions_splice_into_strings() {
        assert_eq!(
            parse_json("$v = \"world\"\ns = \"hello ${$v}!\""),
            json!({ "s": "hello world!" })
        );
        assert_eq!(
            parse_json("a = \"${1_000}\"\nb = \"${true}/${null}\"\nc = \"${\"lit\"}\""),
            json!({ "a": "1000", "b": "true/null", "c": "lit" })
        );
        assert_eq!(
            parse_json("port = 80\nurl = \"http://host:${ref(port)}/\""),
            json!({ "port": 80, "url": "http://host:80/" })
        );
    }

    #[test]
    fn deep_paths_share_containers() {
        assert_eq!(
            parse_json("a.b[0].c = 1\na.b[0].d = 2"),
            json!({ "a": { "b": [{ "c": 1, "d": 2 }] } })
        );
    }

    #[test]
    fn shorthands() {
        assert_eq!(
            parse_json("verbose\nserver { tls }"),
            json!({ "verbose": true, "server": { "tls": true } })
        );
    }

    #[test]
    fn arrays() {
        assert_eq!(parse_json("a = []"), json!({ "a": [] }));
        assert_eq!(parse_json("a = [1, 2, 3,]"), json!({ "a": [1, 2, 3] }));
        assert_eq!(parse_json("a = [\n  1\n  2\n]"), json!({ "a": [1, 2] }));
        assert_eq!(
            parse_json("a = [{ x = 1 }, [2], null]"),
            json!({ "a": [{ "x": 1 }, [2], null] })
        );
    }

    #[test]
    fn numbers_recombine_across_tokens() {
        // "1.5e-3" lexes as IDENT DOT IDENT because '-' is an identifier
        // character; the parser reassembles it.
        assert_eq!(
            parse_json("a = 1.5e-3\nb = 2.5E+2\nc = 1_000\nd = +7"),
            json!({ "a": 0.0015, "b": 250.0, "c": 1000, "d": 7 })
        );
    }

    #[test]
    fn quoted_keys_are_single_parts() {
        assert_eq!(
            parse_json("\"a.b\" = 1\nplain.\"x y\" = 2"),
            json!({ "a.b": 1, "plain": { "x y": 2 } })
        );
    }

    #[test]
    fn comments_are_ignored() {
        assert_eq!(
            parse_json("# leading\na = 1 # trailing\n# full line\nb = 2"),
            json!({ "a": 1, "b": 2 })
        );
    }

    #[test]
    fn triple_strings_keep_raw_newlines() {
        assert_eq!(
            parse_json("text = \"\"\"line one\nline two\"\"\""),
            json!({ "text": "line one\nline two" })
        );
    }

    #[test]
    fn duplicate_keys_override_by_default() {
        assert_eq!(parse_json("k = 1\nk = 2"), json!({ "k": 2 }));
    }

    #[test]
    fn duplicate_keys_disallow() {
        let options = ParseOptions::default().with_duplicate_keys(DuplicateKeys::Disallow);
        let err = parse_with("k = 1\nk = 2", options).unwrap_err();
        assert!(err.message().contains("duplicate key 'k'"));
        assert_eq!(err.row(), Some(2));

        // Index assignments may always overwrite.
        let options = ParseOptions::default().with_duplicate_keys(DuplicateKeys::Disallow);
        assert!(parse_with("a[0] = 1\na[0] = 2", options).is_ok());
    }

    #[test]
    fn duplicate_keys_collect() {
        let options = ParseOptions::default().with_duplicate_keys(DuplicateKeys::Collect);
        let result = parse_with("k = 1\nk = 2\nk = 3", options).unwrap();
        // Unwrapped, a collection reads as its most recent value.
        assert_eq!(serde_json::to_value(&result.data).unwrap(), json!({ "k": 3 }));

        let options = ParseOptions::default()
            .with_duplicate_keys(DuplicateKeys::Collect)
            .keep_internal_values();
        let result = parse_with("k = 1\nk = 2\nk = 3", options).unwrap();
        match result.data.get("k").unwrap() {
            Value::Collection(collection) => {
                assert_eq!(collection.len(), 3);
                assert_eq!(collection.last(), &Value::Integer(3));
            }
            other => panic!("expected a collection, got {:?}", other),
        }
    }

    #[test]
    fn lexical_scoping_finds_nearest_binding() {
        assert_eq!(
            parse_json("$x = 1\na { $x = 2\nv = $x }\nw = $x"),
            json!({ "a": { "v": 2 }, "w": 1 })
        );
    }

    #[test]
    fn sibling_scopes_are_invisible() {
        let err = parse_err("a { $y = 5 }\nb { v = $y }");
        assert!(err.message().contains("could not resolve variable '$y'"));
    }

    #[test]
    fn child_scope_bindings_do_not_escape() {
        let err = parse_err("obj { $x = 1 }\nkey = $x");
        assert!(err.message().contains("could not resolve variable"));
        assert_eq!(err.row(), Some(2));
    }

    #[test]
    fn invalid_bare_identifier_value() {
        let err = parse_err("key = invalid+");
        assert!(err.message().contains("invalid key 'invalid+'"));
        assert_eq!(err.row(), Some(1));
    }

    #[test]
    fn newline_in_double_string_points_at_the_character() {
        let err = parse_err("\"hello\nworld\"");
        assert!(err.message().contains("illegal character"));
        assert_eq!(err.row(), Some(1));
        assert_eq!(err.column(), Some(7));
    }

    #[test]
    fn consecutive_underscores_in_numbers() {
        let err = parse_err("num = 1__000");
        assert!(err.message().contains("consecutive underscores"));
    }

    #[test]
    fn root_commas_are_rejected() {
        let err = parse_err("a = 1, b = 2");
        assert!(err.message().contains("','"));
    }

    #[test]
    fn missing_delimiters() {
        assert!(parse_err("a = [1, 2").message().contains("']'"));
        assert!(parse_err("a { b = 1").message().contains("'}'"));
        assert!(parse_err("a = \"unterminated").message().contains("unterminated"));
        assert!(parse_err("a = custom(1").message().contains("')'"));
    }

    #[test]
    fn unexpected_operator_errors() {
        let err = parse_err("a = = 1");
        assert!(err.message().contains("'='"));
        let err = parse_err("= 1");
        assert!(err.message().contains("empty key"));
        let err = parse_err("a.$b = 1");
        assert!(err.message().contains("start of a key"));
    }

    #[test]
    fn invalid_indexes() {
        assert!(parse_err("a[-1] = 1").message().contains("invalid index"));
        assert!(parse_err("a[1.5] = 1").message().contains("']'"));
        assert!(parse_err("a[x] = 1").message().contains("invalid index"));
    }

    #[test]
    fn variable_paths_cannot_be_assigned() {
        let err = parse_err("$x = {}\n$x.y = 1");
        assert!(err.message().contains("variables cannot be assigned"));
    }

    #[test]
    fn variable_appends() {
        assert_eq!(
            parse_json("$xs << 1\n$xs << 2\nout = $xs"),
            json!({ "out": [1, 2] })
        );
    }

    #[test]
    fn variables_may_hold_structures() {
        assert_eq!(
            parse_json("$srv = { host = \"h\"\nports = [1, 2] }\nfirst = $srv.ports[0]"),
            json!({ "first": 1 })
        );
    }

    #[test]
    fn seeded_variables_are_visible() {
        let options = ParseOptions::default().with_variable("$env-name", Value::from("prod"));
        let result = parse_with("name = $env-name", options).unwrap();
        assert_eq!(
            serde_json::to_value(&result.data).unwrap(),
            json!({ "name": "prod" })
        );
    }

    #[test]
    fn statement_resolver_discard_and_collect() {
        let options = ParseOptions::default()
            .with_statement("note", |ctx: &mut crate::ResolverContext| {
                while ctx.next()?.is_some() {}
                Ok(StatementAction::Discard)
            })
            .with_statement("pin", |ctx: &mut crate::ResolverContext| {
                let value = ctx.next()?.unwrap_or(Value::Null);
                Ok(StatementAction::Collect(Some(value)))
            });
        let result = parse_with(
            "note this is dropped\npin \"first\" ignored\npin \"second\" ignored",
            options,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&result.data).unwrap(),
            json!({ "pin": [["first"], ["second"]] })
        );
    }

    #[test]
    fn statement_merge_targets_the_enclosing_block() {
        let options = ParseOptions::default().with_statement(
            "defaults",
            |ctx: &mut crate::ResolverContext| {
                while ctx.next()?.is_some() {}
                let mut map = crate::Object::new();
                map.insert("injected".to_string(), Value::Bool(true));
                Ok(StatementAction::Merge {
                    value: Value::Object(map),
                })
            },
        );
        let result = parse_with("outer { defaults\nown = 1 }", options).unwrap();
        assert_eq!(
            serde_json::to_value(&result.data).unwrap(),
            json!({ "outer": { "injected": true, "own": 1 } })
        );
    }

    #[test]
    fn merge_value_must_be_an_object() {
        let options = ParseOptions::default().with_statement(
            "bad",
            |_ctx: &mut crate::ResolverContext| {
                Ok(StatementAction::Merge {
                    value: Value::Integer(1),
                })
            },
        );
        let err = parse_with("bad now", options).unwrap_err();
        assert!(err.message().contains("merge value must be an object"));
    }

    #[test]
    fn statement_keys_cannot_be_indexed() {
        let err = parse_err("a[0] from x");
        assert!(err.message().contains("invalid statement key"));
    }

    #[test]
    fn unwrapped_trees_contain_only_external_shapes() {
        fn assert_external(value: &Value) {
            match value {
                Value::Tag(_) | Value::Statement(_) | Value::Path(_) | Value::Collection(_) => {
                    panic!("internal shape survived unwrap: {:?}", value)
                }
                Value::Array(items) => items.iter().for_each(assert_external),
                Value::Object(map) => map.values().for_each(assert_external),
                _ => {}
            }
        }
        let options = ParseOptions::default().with_duplicate_keys(DuplicateKeys::Collect);
        let result = parse_with(
            "k = 1\nk = 2\nv = custom(a.b)\nallow from localhost\nnested { w = other(1) }",
            options,
        )
        .unwrap();
        assert_external(&result.data);
        // The unresolved tag still unwraps to its [name, arg] pair.
        assert_eq!(
            serde_json::to_value(&result.data).unwrap()["v"],
            json!(["custom", "a.b"])
        );
    }

    #[test]
    fn statements_spanning_object_arguments() {
        // The object argument of a statement parses before the newline ends
        // the statement, so braces may span lines.
        assert_eq!(
            parse_json("feature with {\n  depth = 2\n}"),
            json!({ "feature": [["with", { "depth": 2 }]] })
        );
    }

    #[test]
    fn object_values_after_assign() {
        assert_eq!(
            parse_json("a = { b = 1, c = { d = 2 } }"),
            json!({ "a": { "b": 1, "c": { "d": 2 } } })
        );
    }

    #[test]
    fn replacing_scalar_with_container_on_deep_assignment() {
        assert_eq!(
            parse_json("a = 1\na.b = 2"),
            json!({ "a": { "b": 2 } })
        );
        assert_eq!(
            parse_json("a = 1\na[0] = 2"),
            json!({ "a": [2] })
        );
    }

    #[test]
    fn nested_index_chains() {
        assert_eq!(
            parse_json("m[1][2] = \"x\""),
            json!({ "m": [null, [null, null, "x"]] })
        );
    }

    #[test]
    fn tags_require_adjacent_parens() {
        // With a space, the identifier is no tag; in value position that is
        // an invalid bare identifier.
        let err = parse_err("a = custom (1)");
        assert!(err.message().contains("invalid key 'custom'"));
    }

    #[test]
    fn data_is_empty_object_for_empty_input() {
        assert_eq!(parse_json(""), json!({}));
        assert_eq!(parse_json("\n\n# only a comment\n"), json!({}));
    }
}
