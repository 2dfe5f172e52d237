use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A callable that scripts can invoke through `(( name|args ))`.
pub type Callable = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Per-run store of imported callables and recorded results.
///
/// Results are an append-only history per tag: every evaluation under a tag
/// pushes a new entry, and `vars|tag,N` reads entry `N`.
#[derive(Clone, Default)]
pub struct Namespace {
    imported: HashMap<String, Callable>,
    results: HashMap<String, Vec<Value>>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable. The first registration of a name wins; returns
    /// `false` if the name was already present.
    pub fn register_import(&mut self, name: impl Into<String>, callable: Callable) -> bool {
        let name = name.into();
        if self.imported.contains_key(&name) {
            return false;
        }
        self.imported.insert(name, callable);
        true
    }

    /// Whether `name` resolves to an imported callable.
    pub fn is_imported(&self, name: &str) -> bool {
        self.imported.contains_key(name)
    }

    /// Invoke an imported callable.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let callable = self
            .imported
            .get(name)
            .ok_or_else(|| Error::Lookup(format!("'{}' has not been imported", name)))?;
        callable(args)
    }

    /// Names of all imported callables, sorted.
    pub fn imported_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.imported.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Append a value to the history for `tag`.
    pub fn record(&mut self, tag: impl Into<String>, value: Value) {
        self.results.entry(tag.into()).or_default().push(value);
    }

    /// Read entry `index` of the history for `tag`.
    pub fn lookup(&self, tag: &str, index: usize) -> Result<&Value> {
        let history = self
            .results
            .get(tag)
            .ok_or_else(|| Error::Lookup(format!("no results recorded for '{}'", tag)))?;
        history.get(index).ok_or_else(|| {
            Error::Lookup(format!(
                "index {} out of range for '{}' ({} recorded)",
                index,
                tag,
                history.len()
            ))
        })
    }

    /// Full history for `tag` (empty if nothing was recorded).
    pub fn results(&self, tag: &str) -> &[Value] {
        self.results.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("imported", &self.imported_names())
            .field("results", &self.results)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(value: Value) -> Callable {
        Arc::new(move |_| Ok(value.clone()))
    }

    #[test]
    fn test_first_import_wins() {
        let mut ns = Namespace::new();
        assert!(ns.register_import("f", constant(json!(1))));
        assert!(!ns.register_import("f", constant(json!(2))));
        assert_eq!(ns.call("f", &[]).unwrap(), json!(1));
    }

    #[test]
    fn test_call_missing() {
        let ns = Namespace::new();
        assert!(matches!(ns.call("nope", &[]), Err(Error::Lookup(_))));
    }

    #[test]
    fn test_record_and_lookup() {
        let mut ns = Namespace::new();
        ns.record("eval", json!("a"));
        ns.record("eval", json!("b"));
        assert_eq!(ns.lookup("eval", 0).unwrap(), &json!("a"));
        assert_eq!(ns.lookup("eval", 1).unwrap(), &json!("b"));
        assert_eq!(ns.results("eval").len(), 2);
        assert!(matches!(ns.lookup("eval", 2), Err(Error::Lookup(_))));
        assert!(matches!(ns.lookup("other", 0), Err(Error::Lookup(_))));
        assert!(ns.results("other").is_empty());
    }

    #[test]
    fn test_debug_lists_names() {
        let mut ns = Namespace::new();
        ns.register_import("b", constant(json!(null)));
        ns.register_import("a", constant(json!(null)));
        assert_eq!(ns.imported_names(), vec!["a", "b"]);
        assert!(format!("{:?}", ns).contains("\"a\""));
    }
}
