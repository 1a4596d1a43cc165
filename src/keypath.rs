use std::fmt::{Display, Formatter};

use smallvec::SmallVec;

use crate::errors::{BconfError, BconfResult};

/// One segment of a [KeyPath].
///
/// `Variable` parts carry their `$` prefix and may only appear in the first
/// position; the parser enforces that invariant when reading paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Alphanumeric(String),
    Str(String),
    Variable(String),
    Index(usize),
}

impl KeyPart {
    /// The name this part addresses, if it is a named (non-index) part.
    pub fn name(&self) -> Option<&str> {
        match self {
            KeyPart::Alphanumeric(name) | KeyPart::Str(name) | KeyPart::Variable(name) => {
                Some(name)
            }
            KeyPart::Index(_) => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            KeyPart::Index(index) => Some(*index),
            _ => None,
        }
    }
}

/// An ordered, non-empty sequence of key parts addressing a position in the
/// result tree, e.g. `server.hosts[0].name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    parts: SmallVec<[KeyPart; 4]>,
}

impl KeyPath {
    pub fn new(first: KeyPart) -> Self {
        let mut parts = SmallVec::new();
        parts.push(first);
        Self { parts }
    }

    pub fn push(&mut self, part: KeyPart) {
        debug_assert!(
            !matches!(part, KeyPart::Variable(_)),
            "variable parts only appear in first position"
        );
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn first(&self) -> &KeyPart {
        &self.parts[0]
    }

    /// True when the path starts with a `$variable` part.
    pub fn is_variable(&self) -> bool {
        matches!(self.parts[0], KeyPart::Variable(_))
    }

    /// The variable name (including `$`) when this is a variable-headed path.
    pub fn variable_name(&self) -> Option<&str> {
        match &self.parts[0] {
            KeyPart::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// The first named part; used to look up statement resolvers.
    pub fn first_name(&self) -> Option<&str> {
        self.parts[0].name()
    }

    /// Parses a path from its serialized text form. This is the left inverse
    /// of [Display] for paths without embedded whitespace, and is what hosts
    /// and the `ref` tag use to address the result tree.
    pub fn parse(input: &str) -> BconfResult<KeyPath> {
        let err = || BconfError::parse(1, 1, format!("invalid key path '{}'", input));
        let mut parts: SmallVec<[KeyPart; 4]> = SmallVec::new();
        let chars: Vec<char> = input.chars().collect();
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    // A dot must sit between two named parts.
                    if parts.is_empty() {
                        return Err(err());
                    }
                    pos += 1;
                    let name = read_name(&chars, &mut pos);
                    if name.is_empty() {
                        return Err(err());
                    }
                    parts.push(KeyPart::Alphanumeric(name));
                }
                '[' => {
                    if parts.is_empty() {
                        return Err(err());
                    }
                    pos += 1;
                    let digits = read_digits(&chars, &mut pos);
                    if digits.is_empty() || chars.get(pos) != Some(&']') {
                        return Err(err());
                    }
                    pos += 1;
                    let index = digits.parse::<usize>().map_err(|_| err())?;
                    parts.push(KeyPart::Index(index));
                }
                '$' if parts.is_empty() => {
                    pos += 1;
                    let name = read_name(&chars, &mut pos);
                    if name.is_empty() {
                        return Err(err());
                    }
                    parts.push(KeyPart::Variable(format!("${}", name)));
                }
                _ => {
                    if !parts.is_empty() {
                        return Err(err());
                    }
                    let name = read_name(&chars, &mut pos);
                    if name.is_empty() {
                        return Err(err());
                    }
                    parts.push(KeyPart::Alphanumeric(name));
                }
            }
        }

        if parts.is_empty() {
            return Err(err());
        }
        Ok(KeyPath { parts })
    }
}

fn read_name(chars: &[char], pos: &mut usize) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.get(*pos) {
        if c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-' {
            out.push(c);
            *pos += 1;
        } else {
            break;
        }
    }
    out
}

fn read_digits(chars: &[char], pos: &mut usize) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.get(*pos) {
        if c.is_ascii_digit() {
            out.push(c);
            *pos += 1;
        } else {
            break;
        }
    }
    out
}

impl Display for KeyPath {
    /// Named parts join with `.`; index parts render as `[N]` attached to
    /// the preceding part without a dot.
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            match part {
                KeyPart::Alphanumeric(name) | KeyPart::Str(name) | KeyPart::Variable(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                KeyPart::Index(index) => {
                    write!(f, "[{}]", index)?;
                }
            }
        }
        Ok(())
    }
}

impl From<KeyPart> for KeyPath {
    fn from(part: KeyPart) -> Self {
        KeyPath::new(part)
    }
}
