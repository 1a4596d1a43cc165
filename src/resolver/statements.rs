//! Built-in statements: `import`, `export` and `extends`.

use std::collections::HashMap;
use std::rc::Rc;

use itertools::Itertools;
use log::debug;

use crate::errors::BconfResult;
use crate::parser::scope::VarScope;
use crate::value::Value;

use super::{
    InnerParseOptions, ResolverContext, SetVariableArgs, StatementAction, StatementResolver,
};

pub(crate) fn builtin_statements() -> HashMap<String, StatementResolver> {
    let mut statements: HashMap<String, StatementResolver> = HashMap::new();
    statements.insert("import".to_string(), Rc::new(import_statement));
    statements.insert("export".to_string(), Rc::new(export_statement));
    statements.insert("extends".to_string(), Rc::new(extends_statement));
    statements
}

/// `extends "path"` loads and parses the base document, then merges it
/// under the current document so everything written afterwards overrides it.
fn extends_statement(ctx: &mut ResolverContext) -> BconfResult<StatementAction> {
    let path = match ctx.next()? {
        Some(Value::String(path)) if !path.is_empty() => path,
        Some(other) => {
            return Err(ctx.error(format!(
                "extends expects a file path, got {}",
                other.type_name()
            )))
        }
        _ => return Err(ctx.error("extends expects a file path")),
    };

    debug!("extends: loading '{}'", path);
    let source = ctx.load_file(&path)?;
    let base = ctx.parse_with(
        &source,
        InnerParseOptions {
            unwrap: false,
            file: Some(path),
        },
    )?;
    Ok(StatementAction::Merge { value: base.data })
}

/// `import from "path" { $name [as $alias], ... }` parses the referenced
/// document and binds each listed exported variable (under its alias, when
/// given) in the root scope.
fn import_statement(ctx: &mut ResolverContext) -> BconfResult<StatementAction> {
    match ctx.next()? {
        Some(Value::String(keyword)) if keyword == "from" => {}
        _ => return Err(ctx.error("import expects the form: import from \"path\" { $name, ... }")),
    }
    let path = match ctx.next()? {
        Some(Value::String(path)) if !path.is_empty() => path,
        _ => return Err(ctx.error("import expects a non-empty file path after 'from'")),
    };
    let block = match ctx.next()? {
        Some(Value::Object(block)) => block,
        _ => return Err(ctx.error("import expects a block listing the variables to import")),
    };

    debug!("import: loading '{}'", path);
    let source = ctx.load_file(&path)?;
    let imported = ctx.parse_with(
        &source,
        InnerParseOptions {
            unwrap: false,
            file: Some(path.clone()),
        },
    )?;
    let exports = match imported.variables {
        Value::Object(map) => map,
        _ => unreachable!("nested parses always produce an export object"),
    };

    for (name, entry) in block {
        if !name.starts_with('$') {
            continue;
        }
        let aliases = alias_names(ctx, &name, &entry)?;
        let value = match exports.get(&name) {
            Some(value) => value.clone(),
            None => {
                return Err(ctx.error(format!(
                    "variable '{}' is not exported by '{}'",
                    name, path
                )))
            }
        };
        let targets = if aliases.is_empty() { vec![name] } else { aliases };
        for target in targets {
            let bound = ctx.set_variable(
                &target,
                value.clone(),
                SetVariableArgs {
                    scope: VarScope::Root,
                    ..Default::default()
                },
            )?;
            if !bound {
                return Err(ctx.error(format!("variable '{}' is already declared", target)));
            }
        }
    }
    Ok(StatementAction::Discard)
}

/// `export vars { $name [as $alias], ... }` records each listed variable in
/// the exported-variables map. Unbound names are declared `true` inline;
/// aliases create additional export entries for the same value.
fn export_statement(ctx: &mut ResolverContext) -> BconfResult<StatementAction> {
    match ctx.next()? {
        Some(Value::String(keyword)) if keyword == "vars" => {}
        _ => return Err(ctx.error("export expects the form: export vars { $name, ... }")),
    }
    let block = match ctx.next()? {
        Some(Value::Object(block)) => block,
        _ => return Err(ctx.error("export expects a block listing the variables to export")),
    };

    for (name, entry) in block {
        if !name.starts_with('$') {
            // Non-variable keys in the block carry no meaning here.
            continue;
        }
        let aliases = alias_names(ctx, &name, &entry)?;
        let value = match ctx.get_variable(&name) {
            Some(value) => value,
            None => {
                // An unbound name is an inline declaration.
                ctx.set_variable(
                    &name,
                    Value::Bool(true),
                    SetVariableArgs {
                        scope: VarScope::Root,
                        override_existing: true,
                        ..Default::default()
                    },
                )?;
                Value::Bool(true)
            }
        };
        ctx.set_variable(
            &name,
            value.clone(),
            SetVariableArgs {
                export_only: true,
                ..Default::default()
            },
        )?;
        for alias in aliases {
            ctx.set_variable(
                &alias,
                value.clone(),
                SetVariableArgs {
                    export_only: true,
                    ..Default::default()
                },
            )?;
        }
    }
    Ok(StatementAction::Discard)
}

/// Reads the aliases out of one import/export block entry. A bare `$name`
/// parses as `true`; `$name as $alias` arrives as a collected statement
/// whose call groups must each be exactly `["as", $alias]`.
fn alias_names(ctx: &ResolverContext, name: &str, entry: &Value) -> BconfResult<Vec<String>> {
    match entry {
        Value::Bool(true) => Ok(vec![]),
        Value::Statement(statement) => {
            let mut aliases = vec![];
            for group in &statement.args {
                match group.as_slice() {
                    [Value::String(keyword), Value::Path(alias)]
                        if keyword == "as" && alias.len() == 1 && alias.is_variable() =>
                    {
                        aliases.push(alias.variable_name().unwrap().to_string());
                    }
                    _ => {
                        return Err(ctx.error(format!(
                            "malformed alias for '{}': expected 'as $alias', found [{}]",
                            name,
                            group.iter().map(|v| v.type_name()).join(", ")
                        )))
                    }
                }
            }
            Ok(aliases)
        }
        _ => Err(ctx.error(format!("malformed alias for '{}'", name))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::testing::{loader_options, parse_json_with};
    use crate::{parse_with, ParseOptions};

    #[test]
    fn extends_merges_under_current_content() {
        let options = || loader_options(vec![("base", "k = 1\nother = 3")]);
        assert_eq!(
            parse_json_with("extends \"base\"\nk = 2", options()),
            json!({ "k": 2, "other": 3 })
        );
        // Keys written before the extends also win.
        assert_eq!(
            parse_json_with("k = 5\nextends \"base\"", options()),
            json!({ "k": 5, "other": 3 })
        );
    }

    #[test]
    fn extends_chains_preserve_order() {
        let options = loader_options(vec![
            ("one", "a = 1\nshared = \"one\""),
            ("two", "b = 2\nshared = \"two\""),
        ]);
        assert_eq!(
            parse_json_with("extends \"one\"\nextends \"two\"\nc = 3", options),
            json!({ "a": 1, "shared": "one", "b": 2, "c": 3 })
        );
    }

    #[test]
    fn extends_merges_objects_deeply() {
        let options = loader_options(vec![(
            "base",
            "server { host = \"127.0.0.1\"\nport = 80 }",
        )]);
        assert_eq!(
            parse_json_with("server.port = 9000\nextends \"base\"", options),
            json!({ "server": { "port": 9000, "host": "127.0.0.1" } })
        );
    }

    #[test]
    fn extends_sees_refs_after_merge() {
        let options = loader_options(vec![("base", "origin = \"base\"")]);
        assert_eq!(
            parse_json_with("extends \"base\"\ncopy = ref(origin)", options),
            json!({ "origin": "base", "copy": "base" })
        );
    }

    #[test]
    fn extends_inside_an_object_merges_into_that_block() {
        let options = loader_options(vec![("defaults", "timeout = 30\nretries = 2")]);
        assert_eq!(
            parse_json_with(
                "server {\nextends \"defaults\"\ntimeout = 5\nname = \"s\"\n}",
                options
            ),
            json!({ "server": { "timeout": 5, "retries": 2, "name": "s" } })
        );
    }

    #[test]
    fn imports_chain_across_files() {
        let options = loader_options(vec![
            ("leaf", "$x = 1\nexport vars { $x }"),
            (
                "mid",
                "import from \"leaf\" { $x }\n$y = 2\nexport vars { $x as $leafx, $y }",
            ),
        ]);
        assert_eq!(
            parse_json_with(
                "import from \"mid\" { $leafx, $y }\na = $leafx\nb = $y",
                options
            ),
            json!({ "a": 1, "b": 2 })
        );
    }

    #[test]
    fn extends_missing_file_is_a_positioned_error() {
        let err = parse_with("x = 1\nextends \"gone\"", loader_options(vec![])).unwrap_err();
        assert_eq!(err.row(), Some(2));
        assert!(err.message().contains("gone"));
    }

    #[test]
    fn import_binds_exported_variables() {
        let options = loader_options(vec![(
            "vars",
            "$port = 8080\n$host = \"0.0.0.0\"\nexport vars { $port, $host }",
        )]);
        assert_eq!(
            parse_json_with(
                "import from \"vars\" { $port, $host as $addr }\np = $port\na = $addr",
                options
            ),
            json!({ "p": 8080, "a": "0.0.0.0" })
        );
    }

    #[test]
    fn import_rejects_unexported_variables() {
        let options = loader_options(vec![("vars", "$port = 8080")]);
        let err = parse_with("import from \"vars\" { $port }", options).unwrap_err();
        assert!(err.message().contains("'$port' is not exported"));
    }

    #[test]
    fn import_rejects_wrong_keyword_and_bad_paths() {
        let err = parse_with("import of \"x\" { $a }", loader_options(vec![])).unwrap_err();
        assert!(err.message().contains("import expects"));

        let err = parse_with("import from 3 { $a }", loader_options(vec![])).unwrap_err();
        assert!(err.message().contains("file path"));

        let err = parse_with("import from \"\" { $a }", loader_options(vec![])).unwrap_err();
        assert!(err.message().contains("file path"));
    }

    #[test]
    fn import_rejects_alias_collisions() {
        let options = loader_options(vec![("vars", "$a = 1\nexport vars { $a }")])
            .with_variable("$a", crate::Value::Integer(9));
        let err = parse_with("import from \"vars\" { $a }", options).unwrap_err();
        assert!(err.message().contains("already declared"));
    }

    #[test]
    fn import_rejects_malformed_aliases() {
        let options = loader_options(vec![("vars", "$a = 1\nexport vars { $a }")]);
        let err = parse_with("import from \"vars\" { $a as banana }", options).unwrap_err();
        assert!(err.message().contains("malformed alias"));
    }

    #[test]
    fn export_declares_missing_names_inline() {
        let options = loader_options(vec![("vars", "export vars { $feature }")]);
        assert_eq!(
            parse_json_with("import from \"vars\" { $feature }\non = $feature", options),
            json!({ "on": true })
        );
    }

    #[test]
    fn export_aliases_point_at_the_same_value() {
        let options = loader_options(vec![(
            "vars",
            "$n = 42\nexport vars { $n as $answer }",
        )]);
        // Both the original name and the alias are exported.
        assert_eq!(
            parse_json_with(
                "import from \"vars\" { $n, $answer }\na = $n\nb = $answer",
                options
            ),
            json!({ "a": 42, "b": 42 })
        );
    }

    #[test]
    fn exported_variables_surface_from_the_entry_point() {
        let result = crate::parse("$x = 7\nexport vars { $x }").unwrap();
        assert_eq!(
            serde_json::to_value(&result.variables).unwrap(),
            json!({ "$x": 7 })
        );
    }

    #[test]
    fn nested_scopes_do_not_leak_across_files() {
        // The imported file's non-exported variables stay invisible.
        let options = loader_options(vec![("vars", "$hidden = 1\n$shown = 2\nexport vars { $shown }")]);
        let err = parse_with("import from \"vars\" { $hidden }", options).unwrap_err();
        assert!(err.message().contains("not exported"));
    }

    #[test]
    fn user_statements_override_builtins() {
        let options = ParseOptions::default().with_statement(
            "extends",
            |ctx: &mut crate::ResolverContext| {
                while ctx.next()?.is_some() {}
                Ok(crate::StatementAction::Discard)
            },
        );
        // The stock resolver would fail on the missing file; ours discards.
        assert_eq!(
            serde_json::to_value(&parse_with("extends \"gone\"", options).unwrap().data).unwrap(),
            json!({})
        );
    }
}
