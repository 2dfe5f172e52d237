//! Importable callable libraries.
//!
//! `import: random.randint` registers `randint`; `import: random` registers
//! every function as `random.<name>`.

use super::namespace::{Callable, Namespace};
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::debug;

/// Imports available in every run without an explicit `import` command.
const PRELUDE: &[(&str, &str)] = &[
    ("randint", "random.randint"),
    ("random", "random.random"),
    ("choice", "random.choice"),
    ("prompt", "utils.prompt"),
];

/// A named set of callables.
#[derive(Clone)]
pub struct Module {
    name: String,
    functions: BTreeMap<String, Callable>,
}

impl Module {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: BTreeMap::new(),
        }
    }

    /// Add a function.
    pub fn function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Callable> {
        self.functions.get(name)
    }

    /// Function names in sorted order.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Modules that `import` commands can reach.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Module>,
}

impl ModuleRegistry {
    /// A registry with no modules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard library: `random`, `string`, `time`, `os`, `utils`.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(random_module());
        registry.register(string_module());
        registry.register(time_module());
        registry.register(os_module());
        registry.register(utils_module());
        registry
    }

    /// Add or replace a module.
    pub fn register(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), module);
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Populate a fresh namespace with the prelude imports that exist in
    /// this registry.
    pub fn install_prelude(&self, namespace: &mut Namespace) {
        for (alias, path) in PRELUDE {
            let Some((module, function)) = path.split_once('.') else {
                continue;
            };
            if let Some(f) = self.get(module).and_then(|m| m.get(function)) {
                namespace.register_import(*alias, f.clone());
            }
        }
    }

    /// Resolve an import spec (`module.callable` or `module`) into the
    /// namespace. Returns the names that were newly registered.
    pub fn import(&self, spec: &str, namespace: &mut Namespace) -> Result<Vec<String>> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(Error::Argument("import requires a module name".into()));
        }

        if let Some(module) = self.get(spec) {
            let mut added = Vec::new();
            for name in module.function_names() {
                let qualified = format!("{}.{}", module.name, name);
                if let Some(f) = module.get(name) {
                    if namespace.register_import(qualified.clone(), f.clone()) {
                        added.push(qualified);
                    }
                }
            }
            debug!("import {}: {} callables", spec, added.len());
            return Ok(added);
        }

        let (module_name, function) = spec
            .rsplit_once('.')
            .ok_or_else(|| Error::Lookup(format!("no module named '{}'", spec)))?;
        let module = self
            .get(module_name)
            .ok_or_else(|| Error::Lookup(format!("no module named '{}'", module_name)))?;
        let f = module.get(function).ok_or_else(|| {
            Error::Lookup(format!(
                "module '{}' has no callable '{}'",
                module_name, function
            ))
        })?;
        debug!("import {}", spec);
        if namespace.register_import(function, f.clone()) {
            Ok(vec![function.to_string()])
        } else {
            Ok(Vec::new())
        }
    }
}

// --- argument helpers ---

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}..={}", min, max)
        };
        return Err(Error::Argument(format!(
            "{}() takes {} arguments ({} given)",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn int_arg(name: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::Argument(format!("{}() expected an integer, got {}", name, value)))
}

fn float_arg(name: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::Argument(format!("{}() expected a number, got {}", name, value)))
}

fn str_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A single list argument, or the argument list itself.
fn items(args: &[Value]) -> Vec<Value> {
    match args {
        [Value::Array(items)] => items.clone(),
        _ => args.to_vec(),
    }
}

// --- standard modules ---

fn random_module() -> Module {
    Module::new("random")
        .function("randint", |args| {
            arity("randint", args, 2, 2)?;
            let a = int_arg("randint", &args[0])?;
            let b = int_arg("randint", &args[1])?;
            if a > b {
                return Err(Error::Argument(format!(
                    "randint() empty range ({}, {})",
                    a, b
                )));
            }
            Ok(Value::from(rand::thread_rng().gen_range(a..=b)))
        })
        .function("random", |args| {
            arity("random", args, 0, 0)?;
            Ok(Value::from(rand::thread_rng().gen::<f64>()))
        })
        .function("uniform", |args| {
            arity("uniform", args, 2, 2)?;
            let a = float_arg("uniform", &args[0])?;
            let b = float_arg("uniform", &args[1])?;
            Ok(Value::from(a + (b - a) * rand::thread_rng().gen::<f64>()))
        })
        .function("choice", |args| {
            let pool = items(args);
            pool.choose(&mut rand::thread_rng())
                .cloned()
                .ok_or_else(|| Error::Argument("choice() from an empty sequence".into()))
        })
        .function("randrange", |args| {
            arity("randrange", args, 1, 3)?;
            let (start, stop, step) = match args {
                [stop] => (0, int_arg("randrange", stop)?, 1),
                [start, stop] => (int_arg("randrange", start)?, int_arg("randrange", stop)?, 1),
                [start, stop, step] => (
                    int_arg("randrange", start)?,
                    int_arg("randrange", stop)?,
                    int_arg("randrange", step)?,
                ),
                _ => return Err(Error::Argument("randrange() takes 1..=3 arguments".into())),
            };
            if step <= 0 || start >= stop {
                return Err(Error::Argument(format!(
                    "randrange() empty range ({}, {}, {})",
                    start, stop, step
                )));
            }
            // i128 holds any i64 span; the picked value lies in [start, stop).
            let (start, step) = (i128::from(start), i128::from(step));
            let steps = (i128::from(stop) - start + step - 1) / step;
            let k = rand::thread_rng().gen_range(0..steps);
            let picked = i64::try_from(start + k * step).map_err(|_| {
                Error::Argument("randrange() result out of range".into())
            })?;
            Ok(Value::from(picked))
        })
        .function("sample", |args| {
            arity("sample", args, 2, 2)?;
            let Value::Array(pool) = &args[0] else {
                return Err(Error::Argument("sample() expected a list".into()));
            };
            let k = int_arg("sample", &args[1])?;
            if k < 0 || k as usize > pool.len() {
                return Err(Error::Argument(
                    "sample() larger than population or is negative".into(),
                ));
            }
            let picked: Vec<Value> = pool
                .choose_multiple(&mut rand::thread_rng(), k as usize)
                .cloned()
                .collect();
            Ok(Value::Array(picked))
        })
        .function("shuffle", |args| {
            let mut pool = items(args);
            pool.shuffle(&mut rand::thread_rng());
            Ok(Value::Array(pool))
        })
}

fn random_string(charset: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

fn length_arg(name: &str, args: &[Value], default: usize) -> Result<usize> {
    arity(name, args, 0, 1)?;
    match args.first() {
        None => Ok(default),
        Some(v) => {
            let n = int_arg(name, v)?;
            usize::try_from(n)
                .map_err(|_| Error::Argument(format!("{}() length must be positive", name)))
        }
    }
}

fn string_module() -> Module {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const DIGITS: &[u8] = b"0123456789";
    Module::new("string")
        .function("ascii_letters", |args| {
            let len = length_arg("ascii_letters", args, 8)?;
            Ok(Value::String(random_string(LETTERS, len)))
        })
        .function("digits", |args| {
            let len = length_arg("digits", args, 6)?;
            Ok(Value::String(random_string(DIGITS, len)))
        })
        .function("upper", |args| {
            arity("upper", args, 1, 1)?;
            Ok(Value::String(str_arg(&args[0]).to_uppercase()))
        })
        .function("lower", |args| {
            arity("lower", args, 1, 1)?;
            Ok(Value::String(str_arg(&args[0]).to_lowercase()))
        })
}

fn time_module() -> Module {
    Module::new("time")
        .function("time", |args| {
            arity("time", args, 0, 0)?;
            let now = chrono::Utc::now();
            Ok(Value::from(now.timestamp_millis() as f64 / 1000.0))
        })
        .function("strftime", |args| {
            arity("strftime", args, 0, 1)?;
            let fmt = args
                .first()
                .map(str_arg)
                .unwrap_or_else(|| "%Y-%m-%d %H:%M:%S".to_string());
            let items: Vec<chrono::format::Item> = chrono::format::StrftimeItems::new(&fmt).collect();
            if items.iter().any(|i| matches!(i, chrono::format::Item::Error)) {
                return Err(Error::Argument(format!("strftime() invalid format '{}'", fmt)));
            }
            let formatted = chrono::Local::now().format_with_items(items.into_iter());
            Ok(Value::String(formatted.to_string()))
        })
}

fn os_module() -> Module {
    Module::new("os").function("getenv", |args| {
        arity("getenv", args, 1, 2)?;
        let name = str_arg(&args[0]);
        match std::env::var(&name) {
            Ok(v) => Ok(Value::String(v)),
            Err(_) => Ok(args.get(1).cloned().unwrap_or(Value::Null)),
        }
    })
}

fn utils_module() -> Module {
    Module::new("utils").function("prompt", |args| {
        arity("prompt", args, 0, 1)?;
        let question = args.first().map(str_arg).unwrap_or_default();
        Ok(Value::String(prompt(&question)?))
    })
}

/// Ask a question on stdout and block for one line of stdin.
pub fn prompt(question: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}: ", question)?;
    stdout.flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prelude_registers_random_helpers() {
        let registry = ModuleRegistry::standard();
        let mut ns = Namespace::new();
        registry.install_prelude(&mut ns);
        for name in ["randint", "random", "choice", "prompt"] {
            assert!(ns.is_imported(name), "{} missing", name);
        }
    }

    #[test]
    fn test_import_single_callable() {
        let registry = ModuleRegistry::standard();
        let mut ns = Namespace::new();
        let added = registry.import("string.upper", &mut ns).unwrap();
        assert_eq!(added, vec!["upper".to_string()]);
        assert_eq!(ns.call("upper", &[json!("abc")]).unwrap(), json!("ABC"));
    }

    #[test]
    fn test_import_is_idempotent() {
        let registry = ModuleRegistry::standard();
        let mut ns = Namespace::new();
        registry.import("random.randint", &mut ns).unwrap();
        let again = registry.import("random.randint", &mut ns).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_import_whole_module() {
        let registry = ModuleRegistry::standard();
        let mut ns = Namespace::new();
        let added = registry.import("string", &mut ns).unwrap();
        assert!(added.contains(&"string.digits".to_string()));
        let digits = ns.call("string.digits", &[json!(4)]).unwrap();
        let digits = digits.as_str().unwrap();
        assert_eq!(digits.len(), 4);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_import_unknown() {
        let registry = ModuleRegistry::standard();
        let mut ns = Namespace::new();
        assert!(matches!(
            registry.import("nosuch", &mut ns),
            Err(Error::Lookup(_))
        ));
        assert!(matches!(
            registry.import("random.nosuch", &mut ns),
            Err(Error::Lookup(_))
        ));
    }

    #[test]
    fn test_custom_module() {
        let mut registry = ModuleRegistry::empty();
        registry.register(Module::new("math").function("add", |args| {
            let a = int_arg("add", &args[0])?;
            let b = int_arg("add", &args[1])?;
            Ok(json!(a + b))
        }));
        let mut ns = Namespace::new();
        registry.import("math.add", &mut ns).unwrap();
        assert_eq!(ns.call("add", &[json!(2), json!(3)]).unwrap(), json!(5));
    }

    #[test]
    fn test_randint_bounds_and_arity() {
        let f = random_module();
        let randint = f.get("randint").unwrap();
        for _ in 0..50 {
            let v = randint(&[json!(1), json!(3)]).unwrap().as_i64().unwrap();
            assert!((1..=3).contains(&v));
        }
        assert!(matches!(randint(&[json!(1)]), Err(Error::Argument(_))));
        assert!(matches!(
            randint(&[json!(5), json!(1)]),
            Err(Error::Argument(_))
        ));
    }

    #[test]
    fn test_choice_accepts_list_or_args() {
        let f = random_module();
        let choice = f.get("choice").unwrap();
        let v = choice(&[json!(["a", "b"])]).unwrap();
        assert!(v == json!("a") || v == json!("b"));
        let v = choice(&[json!(7), json!(7)]).unwrap();
        assert_eq!(v, json!(7));
        assert!(choice(&[]).is_err());
    }

    #[test]
    fn test_randrange() {
        let f = random_module();
        let randrange = f.get("randrange").unwrap();
        for _ in 0..50 {
            let v = randrange(&[json!(0), json!(10), json!(5)])
                .unwrap()
                .as_i64()
                .unwrap();
            assert!(v == 0 || v == 5);
        }
        assert!(randrange(&[json!(0)]).is_err());
    }

    #[test]
    fn test_randrange_extreme_bounds() {
        let f = random_module();
        let randrange = f.get("randrange").unwrap();
        let v = randrange(&[json!(0), json!(i64::MAX), json!(2)])
            .unwrap()
            .as_i64()
            .unwrap();
        assert!(v >= 0 && v % 2 == 0);
        let v = randrange(&[json!(i64::MIN), json!(i64::MAX)])
            .unwrap()
            .as_i64()
            .unwrap();
        assert!(v < i64::MAX);
    }

    #[test]
    fn test_getenv_default() {
        let f = os_module();
        let getenv = f.get("getenv").unwrap();
        assert_eq!(
            getenv(&[json!("WEBRUNNER_SURELY_UNSET_VAR"), json!("fallback")]).unwrap(),
            json!("fallback")
        );
    }

    #[test]
    fn test_strftime_rejects_bad_format() {
        let f = time_module();
        let strftime = f.get("strftime").unwrap();
        assert!(strftime(&[json!("%Y")]).unwrap().as_str().unwrap().len() == 4);
        assert!(strftime(&[json!("%Q")]).is_err());
    }
}
