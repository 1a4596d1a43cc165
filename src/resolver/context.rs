use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::{BconfError, BconfResult};
use crate::keypath::KeyPath;
use crate::lexer::TokenKind;
use crate::loader::LoadArgs;
use crate::parser::scope::VarScope;
use crate::parser::{run_parser, Parser};
use crate::value::{get_in_object, Value};
use crate::ParseResult;

use super::{BlockLevel, ValueArgs};

enum Mode {
    Tag,
    Statement,
}

/// The handle a tag or statement resolver works through.
///
/// It borrows the parser mutably for the duration of the resolver call, so a
/// resolver can pull further values out of the token stream (`next`), read
/// the partially built result tree (`lookup`), read and write variables,
/// load files, and run nested parses, all against the live parser state.
pub struct ResolverContext<'p> {
    parser: &'p mut Parser,
    mode: Mode,
    stop: Option<TokenKind>,
    next_args: ValueArgs,
    finished: bool,
}

impl<'p> ResolverContext<'p> {
    pub(crate) fn for_tag(parser: &'p mut Parser) -> Self {
        Self {
            parser,
            mode: Mode::Tag,
            stop: Some(TokenKind::RParen),
            next_args: ValueArgs::tag(),
            finished: false,
        }
    }

    pub(crate) fn for_statement(parser: &'p mut Parser, stop: Option<TokenKind>) -> Self {
        Self {
            parser,
            mode: Mode::Statement,
            stop,
            next_args: ValueArgs::statement(),
            finished: false,
        }
    }

    /// The environment map the parser was configured with.
    pub fn env(&self) -> &HashMap<String, String> {
        &self.parser.settings.env
    }

    /// The source being parsed, when the caller named one.
    pub fn file(&self) -> Option<&str> {
        self.parser.settings.file.as_deref()
    }

    /// Whether the statement or tag sits at the document root or inside an
    /// object block.
    pub fn scope(&self) -> BlockLevel {
        if self.parser.depth == 0 {
            BlockLevel::Root
        } else {
            BlockLevel::Object
        }
    }

    /// The parsing options `next` uses when no override is given.
    pub fn next_args(&self) -> ValueArgs {
        self.next_args
    }

    /// Pulls the next argument value. Returns `None` once the argument list
    /// is exhausted: at `)` for tags; at newline, comma, end of input or
    /// the enclosing block's stop token for statements.
    pub fn next(&mut self) -> BconfResult<Option<Value>> {
        self.next_with(self.next_args)
    }

    /// Like [next](Self::next), but with explicit value-parsing options.
    pub fn next_with(&mut self, args: ValueArgs) -> BconfResult<Option<Value>> {
        if self.finished {
            return Ok(None);
        }
        match self.mode {
            Mode::Tag => {
                self.parser.skip_separators();
                if matches!(self.parser.kind(), TokenKind::RParen | TokenKind::Eof) {
                    self.finished = true;
                    return Ok(None);
                }
            }
            Mode::Statement => {
                let kind = self.parser.kind();
                if matches!(kind, TokenKind::Newline | TokenKind::Eof | TokenKind::Comma)
                    || Some(kind) == self.stop
                {
                    self.finished = true;
                    return Ok(None);
                }
            }
        }
        self.parser.parse_value(args).map(Some)
    }

    /// Reads from the already-materialised result tree. Variables are not
    /// consulted; use [get_variable](Self::get_variable) for those.
    pub fn lookup(&self, path: &KeyPath) -> Option<Value> {
        get_in_object(&self.parser.root, path).cloned()
    }

    /// Resolves a variable through the scope chain.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.parser.scopes.get(name).cloned()
    }

    /// Resolves a variable-headed key path through the scope chain,
    /// navigating any trailing parts into the bound value.
    pub fn get_variable_path(&self, path: &KeyPath) -> Option<Value> {
        let base = self.parser.scopes.get(path.variable_name()?)?;
        crate::value::navigate(base, &path.parts()[1..]).cloned()
    }

    /// Declares or overrides a variable. Returns `false` when the name is
    /// already declared in the targeted scope and `override_existing` is
    /// not set. With `export`, the binding is also recorded in the
    /// exported-variables map; `export_only` records it there without
    /// touching the scope chain.
    pub fn set_variable(
        &mut self,
        name: &str,
        value: Value,
        args: SetVariableArgs,
    ) -> BconfResult<bool> {
        let valid = name.starts_with('$')
            && name.len() > 1
            && !name.contains('.')
            && !name.contains('[')
            && !name.contains(']');
        if !valid {
            return Err(self.error(format!("invalid variable name '{}'", name)));
        }

        if args.export_only {
            self.parser.exports.insert(name.to_string(), value);
            return Ok(true);
        }
        if self.parser.scopes.declared_in(name, args.scope) && !args.override_existing {
            return Ok(false);
        }
        if args.export {
            self.parser
                .exports
                .insert(name.to_string(), value.clone());
        }
        self.parser.scopes.set(name, value, args.scope);
        Ok(true)
    }

    /// Loads a file through the configured loader, relative to the parse's
    /// root directory.
    pub fn load_file(&self, path: &str) -> BconfResult<String> {
        self.load_file_with(path, &LoadArgs::default())
    }

    pub fn load_file_with(&self, path: &str, args: &LoadArgs) -> BconfResult<String> {
        let settings = &self.parser.settings;
        settings
            .loader
            .load(&settings.root_dir, path, args)
            .map_err(BconfError::Io)
    }

    /// Runs a fresh parser over `input` with this parse's settings. The
    /// nested parse has its own root scope, result tree and exports; it
    /// keeps internal value shapes (`unwrap` defaults to false) so exported
    /// variables and merged data survive intact.
    pub fn parse(&self, input: &str) -> BconfResult<ParseResult> {
        self.parse_with(input, InnerParseOptions::default())
    }

    pub fn parse_with(&self, input: &str, options: InnerParseOptions) -> BconfResult<ParseResult> {
        let mut settings = (*self.parser.settings).clone();
        settings.unwrap = options.unwrap;
        if options.file.is_some() {
            settings.file = options.file;
        }
        run_parser(input, Rc::new(settings), HashMap::new())
    }

    /// A parse error pointing at the current token; resolvers use this to
    /// report their own failures.
    pub fn error<M: Into<String>>(&self, message: M) -> BconfError {
        self.parser.error_at_current(message)
    }
}

/// Flags for [ResolverContext::set_variable].
#[derive(Debug, Clone, Copy)]
pub struct SetVariableArgs {
    pub scope: VarScope,
    pub override_existing: bool,
    pub export: bool,
    pub export_only: bool,
}

impl Default for SetVariableArgs {
    fn default() -> Self {
        Self {
            scope: VarScope::Current,
            override_existing: false,
            export: false,
            export_only: false,
        }
    }
}

/// Overrides for a nested [ResolverContext::parse] call.
#[derive(Debug, Clone, Default)]
pub struct InnerParseOptions {
    /// Defaults to false: nested parses keep internal shapes.
    pub unwrap: bool,
    /// Source name for error messages, typically the loaded path.
    pub file: Option<String>,
}
