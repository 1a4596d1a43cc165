//! Shared helpers for the test suites.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::rc::Rc;

use crate::loader::{FileLoader, LoadArgs};
use crate::{BconfError, ParseOptions, Value};

/// A loader serving documents from an in-memory map, keyed by path.
pub(crate) struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new(files: Vec<(&str, &str)>) -> Rc<Self> {
        Rc::new(Self {
            files: files
                .into_iter()
                .map(|(path, text)| (path.to_string(), text.to_string()))
                .collect(),
        })
    }
}

impl FileLoader for MemoryLoader {
    fn load(&self, _root_dir: &Path, path: &str, _args: &LoadArgs) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("file not found: '{}'", path))
        })
    }
}

pub(crate) fn loader_options(files: Vec<(&str, &str)>) -> ParseOptions {
    ParseOptions::default().with_loader(MemoryLoader::new(files))
}

pub(crate) fn parse_data(input: &str) -> Value {
    crate::parse(input).expect("parse failed").data
}

pub(crate) fn parse_json(input: &str) -> serde_json::Value {
    serde_json::to_value(&parse_data(input)).unwrap()
}

pub(crate) fn parse_json_with(input: &str, options: ParseOptions) -> serde_json::Value {
    serde_json::to_value(&crate::parse_with(input, options).expect("parse failed").data).unwrap()
}

pub(crate) fn parse_err(input: &str) -> BconfError {
    crate::parse(input).expect_err("expected a parse error")
}
