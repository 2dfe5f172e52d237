//! Inline `(( tag|args ))` expressions.
//!
//! A string argument containing a token is replaced as a whole by the value
//! the token evaluates to. The tag picks the evaluation mode:
//!
//! - `eval|<literal>` parses a Python-style literal.
//! - `vars|<tag>[, <index>]` reads a previously recorded result.
//! - `<imported>|<args>` calls an imported callable.
//! - `fake_<category>` / `fake-<category>` generates synthetic data.
//!
//! Every evaluation except `vars` records its result under its tag.

pub mod fake;
pub mod literal;
pub mod modules;
pub mod namespace;

pub use fake::{FakeData, Faker};
pub use modules::{Module, ModuleRegistry};
pub use namespace::{Callable, Namespace};

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// What to do with a tag that matches no evaluation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unresolved {
    /// Resolve to an empty string.
    #[default]
    Empty,
    /// Fail with a lookup error.
    Error,
}

/// Extract the trimmed body of the first expression token in `text`, if any.
///
/// The token ends at the first `))` outside balanced parentheses and quotes,
/// so `(( eval|(1, 2) ))` keeps its tuple and later tokens are left alone.
pub fn find_token(text: &str) -> Option<&str> {
    let start = text.find("((")? + 2;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' => depth += 1,
                b')' if depth > 0 => depth -= 1,
                b')' if bytes.get(i + 1) == Some(&b')') => {
                    return Some(text[start..i].trim());
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Evaluates expression bodies against a namespace.
pub struct Resolver<'a> {
    namespace: &'a mut Namespace,
    fake: &'a dyn FakeData,
    unresolved: Unresolved,
}

impl<'a> Resolver<'a> {
    pub fn new(namespace: &'a mut Namespace, fake: &'a dyn FakeData) -> Self {
        Self {
            namespace,
            fake,
            unresolved: Unresolved::default(),
        }
    }

    /// Set the policy for unknown tags.
    pub fn unresolved(mut self, policy: Unresolved) -> Self {
        self.unresolved = policy;
        self
    }

    pub fn namespace(&self) -> &Namespace {
        self.namespace
    }

    /// Replace a scalar with its token's value. Non-strings and strings
    /// without a token are returned unchanged.
    pub fn resolve_scalar(&mut self, value: &Value) -> Result<Value> {
        match value {
            Value::String(text) => match find_token(text) {
                Some(body) => self.resolve(body),
                None => Ok(value.clone()),
            },
            other => Ok(other.clone()),
        }
    }

    /// Evaluate one expression body (the text between `((` and `))`).
    pub fn resolve(&mut self, body: &str) -> Result<Value> {
        let (tag, rest) = match body.split_once('|') {
            Some((tag, rest)) => (tag.trim(), rest.trim()),
            None => (body.trim(), ""),
        };
        debug!("resolve: tag '{}' args '{}'", tag, rest);

        if tag == "vars" {
            return self.lookup_var(rest);
        }

        let value = if tag == "eval" {
            literal::parse(rest)?
        } else if self.namespace.is_imported(tag) {
            let args = parse_call_args(rest)?;
            self.namespace.call(tag, &args)?
        } else if let Some(category) = fake_category(tag) {
            self.fake.generate(category).ok_or_else(|| {
                Error::Lookup(format!("unknown fake data category '{}'", category))
            })?
        } else {
            match self.unresolved {
                Unresolved::Empty => {
                    debug!("resolve: unknown tag '{}', using empty string", tag);
                    Value::String(String::new())
                }
                Unresolved::Error => {
                    return Err(Error::Lookup(format!(
                        "'{}' is not imported and is not a known expression",
                        tag
                    )))
                }
            }
        };

        self.namespace.record(tag, value.clone());
        Ok(value)
    }

    fn lookup_var(&self, rest: &str) -> Result<Value> {
        let (name, index) = match rest.split_once(',') {
            Some((name, index)) => {
                let index = index.trim();
                let index: usize = index.parse().map_err(|_| {
                    Error::Expression(format!("vars index must be a non-negative integer, got '{}'", index))
                })?;
                (name.trim(), index)
            }
            None => (rest.trim(), 0),
        };
        if name.is_empty() {
            return Err(Error::Expression("vars requires a tag name".into()));
        }
        self.namespace.lookup(name, index).cloned()
    }
}

/// `fake_name` / `fake-name` → `name`.
fn fake_category(tag: &str) -> Option<&str> {
    tag.strip_prefix("fake_")
        .or_else(|| tag.strip_prefix("fake-"))
        .filter(|category| !category.is_empty())
}

/// Arguments for an imported call: one bracketed list, or comma-separated
/// values coerced independently.
fn parse_call_args(rest: &str) -> Result<Vec<Value>> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    if rest.starts_with('[') {
        return match literal::parse(rest)? {
            list @ Value::Array(_) => Ok(vec![list]),
            other => Err(Error::Expression(format!(
                "expected a bracketed list, got {}",
                other
            ))),
        };
    }
    Ok(rest.split(',').map(literal::coerce).collect())
}
