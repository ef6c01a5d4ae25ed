//! Relation identity and naming
//!
//! A relation's id is stable across renames; its qualified name is not.
//! Anything that resolves a relation by name (prepared statements) must
//! therefore be re-derived when the name changes.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::TupleDescriptor;

/// Stable identity of a relation, independent of its name.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(u32);

impl RelationId {
    #[inline]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schema-qualified relation name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Name in the default `public` schema
    pub fn public(name: impl Into<String>) -> Self {
        Self::new("public", name)
    }

    /// Parses `schema.name`, or a bare `name` in the `public` schema
    pub fn parse(text: &str) -> Self {
        match text.split_once('.') {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::public(text),
        }
    }

    /// `schema.name` with each part quoted only where SQL requires it
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_identifier(&self.schema), quote_identifier(&self.name))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

static PLAIN_IDENTIFIER: OnceLock<Regex> = OnceLock::new();

const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "by", "check", "column", "constraint", "create", "default", "delete",
    "desc", "distinct", "end", "false", "for", "from", "group", "having", "in", "insert",
    "into", "is", "join", "not", "null", "on", "or", "order", "select", "table", "to", "true",
    "union", "unique", "update", "user", "using", "values", "when", "where", "with",
];

/// Quotes an identifier unless it is a plain lower-case, non-reserved word.
pub fn quote_identifier(ident: &str) -> String {
    let plain = PLAIN_IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[a-z_][a-z0-9_$]*$").expect("identifier pattern is valid")
    });

    if plain.is_match(ident) && !RESERVED_WORDS.contains(&ident) {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// A relation as seen by the engine: identity, current name and layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub id: RelationId,
    pub name: QualifiedName,
    pub descriptor: TupleDescriptor,
}

impl Relation {
    pub fn new(id: RelationId, name: QualifiedName, descriptor: TupleDescriptor) -> Self {
        Self {
            id,
            name,
            descriptor,
        }
    }
}
