//! Turning a raw command's argument spec into positional [`Args`].

use crate::expr::Resolver;
use crate::script::Command;
use crate::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Normalized arguments for one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    op: String,
    values: Vec<Value>,
}

/// Render a scalar the way element values are compared: strings as-is,
/// numbers and booleans in their literal form.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

impl Args {
    pub fn new(op: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            op: op.into(),
            values,
        }
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Read a parameter by keyword when the sole argument is a mapping,
    /// by position otherwise.
    pub fn param(&self, index: usize, name: &str) -> Option<&Value> {
        match self.values.as_slice() {
            [Value::Object(map)] => map.get(name),
            values => values.get(index).filter(|v| !v.is_null()),
        }
    }

    fn missing(&self, name: &str) -> Error {
        Error::Argument(format!("{}: missing argument '{}'", self.op, name))
    }

    fn invalid(&self, name: &str, expected: &str, got: &Value) -> Error {
        Error::Argument(format!(
            "{}: argument '{}' must be {}, got {}",
            self.op, name, expected, got
        ))
    }

    /// A required scalar parameter as text.
    pub fn string(&self, index: usize, name: &str) -> Result<String> {
        self.opt_string(index, name)?
            .ok_or_else(|| self.missing(name))
    }

    pub fn opt_string(&self, index: usize, name: &str) -> Result<Option<String>> {
        match self.param(index, name) {
            None => Ok(None),
            Some(v) => scalar_text(v)
                .map(Some)
                .ok_or_else(|| self.invalid(name, "a scalar", v)),
        }
    }

    pub fn opt_f64(&self, index: usize, name: &str) -> Result<Option<f64>> {
        match self.param(index, name) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(name, "a number", &Value::String(s.clone()))),
            Some(v) => Err(self.invalid(name, "a number", v)),
        }
    }

    pub fn opt_i64(&self, index: usize, name: &str) -> Result<Option<i64>> {
        match self.opt_f64(index, name)? {
            None => Ok(None),
            Some(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
            Some(f) => Err(self.invalid(name, "an integer", &Value::from(f))),
        }
    }

    pub fn i64(&self, index: usize, name: &str) -> Result<i64> {
        self.opt_i64(index, name)?.ok_or_else(|| self.missing(name))
    }

    pub fn usize(&self, index: usize, name: &str) -> Result<usize> {
        let n = self.i64(index, name)?;
        usize::try_from(n).map_err(|_| self.invalid(name, "non-negative", &Value::from(n)))
    }

    pub fn f64(&self, index: usize, name: &str) -> Result<f64> {
        self.opt_f64(index, name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_bool(&self, index: usize, name: &str) -> Result<Option<bool>> {
        match self.param(index, name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::Number(n)) => Ok(Some(n.as_f64() != Some(0.0))),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Some(true)),
                "false" | "no" | "0" | "" => Ok(Some(false)),
                _ => Err(self.invalid(name, "a boolean", &Value::String(s.clone()))),
            },
            Some(v) => Err(self.invalid(name, "a boolean", v)),
        }
    }

    pub fn bool_or(&self, index: usize, name: &str, default: bool) -> Result<bool> {
        Ok(self.opt_bool(index, name)?.unwrap_or(default))
    }

    /// A timeout in (possibly fractional) seconds.
    pub fn timeout(&self, index: usize, default: Duration) -> Result<Duration> {
        match self.opt_f64(index, "timeout")? {
            None => Ok(default),
            Some(secs) => Duration::try_from_secs_f64(secs).map_err(|_| {
                self.invalid("timeout", "a non-negative number of seconds", &Value::from(secs))
            }),
        }
    }
}

/// Resolve embedded expressions. Strings and the elements of flat or nested
/// sequences are resolved; mappings pass through unchanged.
pub fn resolve_value(value: &Value, resolver: &mut Resolver<'_>) -> Result<Value> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(inner) => inner
                    .iter()
                    .map(|v| resolver.resolve_scalar(v))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array),
                other => resolver.resolve_scalar(other),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(_) => Ok(value.clone()),
        other => resolver.resolve_scalar(other),
    }
}

/// Lay a resolved spec out as positional arguments.
///
/// A sequence whose first element is itself a sequence is one argument; any
/// other sequence spreads. Scalars and mappings are the sole argument.
pub fn shape(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) if matches!(items.first(), Some(Value::Array(_))) => {
            vec![Value::Array(items)]
        }
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

/// Resolve and shape one command's arguments.
pub fn normalize(command: &Command, resolver: &mut Resolver<'_>) -> Result<Args> {
    let resolved = match &command.args {
        Some(spec) => Some(resolve_value(spec, resolver)?),
        None => None,
    };
    Ok(Args::new(command.name.clone(), shape(resolved)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Faker, Namespace};
    use serde_json::json;

    fn run(spec: Value) -> (Args, Namespace) {
        let mut ns = Namespace::new();
        let args = {
            let mut r = Resolver::new(&mut ns, &Faker);
            normalize(&Command::with_args("op", spec), &mut r).unwrap()
        };
        (args, ns)
    }

    #[test]
    fn test_identity_without_tokens() {
        let spec = json!(["#a", 1, true, "plain (text)"]);
        let (args, ns) = run(spec.clone());
        assert_eq!(args.values(), spec.as_array().unwrap().as_slice());
        assert!(ns.results("eval").is_empty());
    }

    #[test]
    fn test_scalar_becomes_sole_argument() {
        let (args, _) = run(json!("(( eval|5 ))"));
        assert_eq!(args.values(), &[json!(5)]);
    }

    #[test]
    fn test_nested_sequence_is_one_argument() {
        let (args, ns) = run(json!([["#a", "(( eval|'x' ))"], ["#b", "y"]]));
        assert_eq!(args.len(), 1);
        assert_eq!(args.get(0), Some(&json!([["#a", "x"], ["#b", "y"]])));
        assert_eq!(ns.results("eval"), &[json!("x")]);
    }

    #[test]
    fn test_mapping_passes_unchanged() {
        let spec = json!({"selector": "#a", "value": "(( eval|1 ))"});
        let (args, ns) = run(spec.clone());
        assert_eq!(args.values(), &[spec]);
        assert!(ns.results("eval").is_empty());
        assert_eq!(args.param(0, "selector"), Some(&json!("#a")));
        assert_eq!(args.string(1, "value").unwrap(), "(( eval|1 ))");
    }

    #[test]
    fn test_bare_and_null_have_no_arguments() {
        let mut ns = Namespace::new();
        let mut r = Resolver::new(&mut ns, &Faker);
        assert!(normalize(&Command::bare("back"), &mut r).unwrap().is_empty());
        assert!(shape(Some(Value::Null)).is_empty());
    }

    #[test]
    fn test_typed_accessors() {
        let args = Args::new("op", vec![json!("#a"), json!(42), json!("2.5"), json!("yes")]);
        assert_eq!(args.string(0, "selector").unwrap(), "#a");
        assert_eq!(args.string(1, "value").unwrap(), "42");
        assert_eq!(args.i64(1, "n").unwrap(), 42);
        assert_eq!(args.f64(2, "x").unwrap(), 2.5);
        assert!(args.bool_or(3, "flag", false).unwrap());
        assert!(!args.bool_or(9, "flag", false).unwrap());
        assert_eq!(
            args.timeout(2, Duration::from_secs(30)).unwrap(),
            Duration::from_millis(2500)
        );
        assert!(matches!(args.string(5, "missing"), Err(Error::Argument(_))));
        assert!(matches!(
            Args::new("op", vec![json!(1e20)]).timeout(0, Duration::ZERO),
            Err(Error::Argument(_))
        ));
        assert!(matches!(
            Args::new("op", vec![json!(-1)]).timeout(0, Duration::ZERO),
            Err(Error::Argument(_))
        ));
        assert!(matches!(args.i64(2, "n"), Err(Error::Argument(_))));
    }

    #[test]
    fn test_non_scalar_string_is_argument_error() {
        let args = Args::new("op", vec![json!(["#a"]), json!({"k": 1})]);
        let err = args.string(0, "selector").unwrap_err();
        assert!(err.to_string().contains("op: argument 'selector'"));
    }
}
