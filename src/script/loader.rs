use super::Command;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Script document format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Detect the format from a path. Returns `None` for unrecognized
    /// extensions; callers fall back to YAML.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// An ordered list of commands, optionally remembering where it came from.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Commands in execution order.
    pub commands: Vec<Command>,

    /// File the script was loaded from, if any.
    pub path: Option<PathBuf>,
}

impl Script {
    /// Build a script from commands.
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            path: None,
        }
    }

    /// Load a script file. `.yaml`/`.yml` parse as YAML, `.json` as JSON,
    /// anything else as YAML with a warning.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let format = Format::detect(path).unwrap_or_else(|| {
            warn!(
                "couldn't detect file type of '{}' from its extension, defaulting to YAML",
                path.display()
            );
            Format::Yaml
        });
        let mut script = Self::parse(&content, format)?;
        script.path = Some(path.to_path_buf());
        Ok(script)
    }

    /// Parse a script document in the given format.
    pub fn parse(content: &str, format: Format) -> Result<Self> {
        match format {
            Format::Yaml => Self::parse_yaml(content),
            Format::Json => Self::parse_json(content),
        }
    }

    /// Parse a YAML script document.
    pub fn parse_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let commands: Vec<Command> = serde_yaml::from_str(yaml)?;
        Ok(Self::new(commands))
    }

    /// Parse a JSON script document.
    pub fn parse_json(json: &str) -> Result<Self> {
        let commands: Vec<Command> = serde_json::from_str(json)?;
        Ok(Self::new(commands))
    }

    /// Build a script from an already-parsed value (a sequence of commands).
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let commands: Vec<Command> = serde_json::from_value(value)?;
        Ok(Self::new(commands))
    }

    /// Directory that relative includes resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
