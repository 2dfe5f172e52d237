use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// One script entry: an operation name plus its optional argument spec.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Operation (or pseudo-command) name.
    pub name: String,
    /// Raw argument spec as written in the script. `None` for bare commands.
    pub args: Option<Value>,
}

impl Command {
    /// A command with no arguments.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: None,
        }
    }

    /// A command with an argument spec.
    pub fn with_args(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Null => None,
            other => Some(other),
        };
        Self {
            name: name.into(),
            args,
        }
    }

    /// Back to the script-level value: a string or a single-key mapping.
    pub fn to_value(&self) -> Value {
        match &self.args {
            None => Value::String(self.name.clone()),
            Some(args) => {
                let mut map = serde_json::Map::new();
                map.insert(self.name.clone(), args.clone());
                Value::Object(map)
            }
        }
    }

    /// YAML rendering used in failure reports.
    pub fn pretty(&self) -> String {
        serde_yaml::to_string(&vec![self.to_value()])
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| self.to_value().to_string())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.args {
            None => f.write_str(&self.name),
            Some(args) => write!(f, "{}: {}", self.name, args),
        }
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CommandVisitor)
    }
}

struct CommandVisitor;

impl<'de> Visitor<'de> for CommandVisitor {
    type Value = Command;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a command (string for bare commands, or map with a single key)")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if value.trim().is_empty() {
            return Err(de::Error::custom("command name must not be empty"));
        }
        Ok(Command::bare(value.trim()))
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let name: String = map
            .next_key()?
            .ok_or_else(|| de::Error::custom("expected command name key"))?;
        let args: Value = map.next_value()?;

        if let Some(extra) = map.next_key::<String>()? {
            return Err(de::Error::custom(format!(
                "expected exactly one operation per command, found '{}' and '{}'",
                name, extra
            )));
        }

        Ok(Command::with_args(name, args))
    }
}
