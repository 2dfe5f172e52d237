//! # webrunner
//!
//! Script-driven browser automation. Write an ordered list of commands in YAML
//! or JSON, embed `(( tag|args ))` expressions for dynamic values, and run it
//! against Chrome.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use webrunner::{BrowserSession, Runner, Script, SessionConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> webrunner::Result<()> {
//! let script = Script::load("scripts/example.yaml")?;
//! let session = BrowserSession::launch(SessionConfig::default()).await?;
//! let mut runner = Runner::new(session);
//! let result = runner.command_script(&script).await?;
//! println!("{} commands, {} failed", result.commands_executed, result.failures.len());
//! runner.into_session().close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Script format
//!
//! ```yaml
//! - import: random.randint
//! - goto: /login
//! - set_value: ["#email", "(( fake_email ))"]
//! - set_value: ["#pin", "(( randint|1000,9999 ))"]
//! - assert_value_of_element: ["#pin", "(( vars|randint,0 ))"]
//! - text_of: "#greeting"
//! - include: common/logout.yaml
//! ```

pub mod automation;
pub mod expr;
pub mod runner;
pub mod script;

pub use automation::{
    Automation, BrowserSession, SessionConfig, SessionState, SetValueOptions, Viewport,
    WaitCondition,
};
pub use expr::{FakeData, Faker, Module, ModuleRegistry, Namespace, Resolver, Unresolved};
pub use runner::{
    Args, CommandFailure, Operation, RunOptions, RunResult, RunState, Runner, UnknownCommand,
};
pub use script::{Command, Format, Script};

/// Result type for webrunner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or running a script.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("script error: {0}")]
    Script(String),

    #[error("expression error: {0}")]
    Expression(String),

    #[error("lookup error: {0}")]
    Lookup(String),

    #[error("argument error: {0}")]
    Argument(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("session already stopped")]
    SessionStopped,

    #[error("action failed: {0}")]
    ActionFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("assertion failed: {0}")]
    AssertionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_and_mapping_commands() {
        let yaml = r##"
- refresh_page
- go: "https://example.com"
- set_value: ["#field", "hello"]
- set_values:
    - ["#a", "1"]
    - ["#b", "2"]
"##;
        let script = Script::parse_yaml(yaml).unwrap();
        assert_eq!(script.len(), 4);

        assert_eq!(script.commands[0].name, "refresh_page");
        assert!(script.commands[0].args.is_none());

        assert_eq!(script.commands[1].name, "go");
        assert_eq!(script.commands[1].args, Some(json!("https://example.com")));

        assert_eq!(script.commands[2].args, Some(json!(["#field", "hello"])));
        assert_eq!(
            script.commands[3].args,
            Some(json!([["#a", "1"], ["#b", "2"]]))
        );
    }

    #[test]
    fn test_parse_json_script() {
        let json = r##"[
            {"set_value": ["#field", "(( eval|'hello' ))"]},
            {"assert_value_of_element": ["#field", "(( vars|eval,0 ))"]},
            "back"
        ]"##;
        let script = Script::parse_json(json).unwrap();
        assert_eq!(script.len(), 3);
        assert_eq!(script.commands[1].name, "assert_value_of_element");
        assert_eq!(script.commands[2].name, "back");
    }

    #[test]
    fn test_null_argument_is_bare_command() {
        let yaml = r#"
- back:
- forward: ~
"#;
        let script = Script::parse_yaml(yaml).unwrap();
        assert!(script.commands[0].args.is_none());
        assert!(script.commands[1].args.is_none());
    }

    #[test]
    fn test_validation_multiple_keys() {
        let yaml = r##"
- click: "#a"
  set_value: ["#b", "x"]
"##;
        let result = Script::parse_yaml(yaml);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("exactly one operation"));
    }

    #[test]
    fn test_validation_empty_mapping() {
        let result = Script::parse_yaml("- {}");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_root_not_sequence() {
        let result = Script::parse_yaml("go: https://example.com");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_numeric_entry() {
        let result = Script::parse_json("[1, \"back\"]");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_include_directive() {
        let yaml = r##"
- include: flows/login.yaml
- click: "#continue"
"##;
        let script = Script::parse_yaml(yaml).unwrap();
        assert_eq!(script.commands[0].name, "include");
        assert_eq!(script.commands[0].args, Some(json!("flows/login.yaml")));
    }

    #[test]
    fn test_command_keeps_mapping_argument() {
        let yaml = r##"
- goto:
    url: /forms
    wait_for_visible: "#textfield"
"##;
        let script = Script::parse_yaml(yaml).unwrap();
        let args = script.commands[0].args.as_ref().unwrap();
        assert_eq!(args["url"], json!("/forms"));
        assert_eq!(args["wait_for_visible"], json!("#textfield"));
    }

    #[test]
    fn test_load_example_script() {
        let script = Script::load("scripts/example.yaml").unwrap();
        assert!(!script.is_empty());
        assert_eq!(script.commands[0].name, "import");
    }

    #[test]
    fn test_bundled_scripts_use_known_commands() {
        for path in [
            "scripts/example.yaml",
            "scripts/common/setup.yaml",
            "scripts/smoke.json",
        ] {
            let script = Script::load(path).unwrap();
            for command in &script.commands {
                let name = command.name.as_str();
                assert!(
                    Operation::from_name(name).is_some()
                        || script::RESERVED_COMMANDS.contains(&name),
                    "{}: unknown command '{}'",
                    path,
                    name
                );
            }
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::SessionStopped.to_string(), "session already stopped");
        assert_eq!(
            Error::Lookup("no results recorded for 'x'".into()).to_string(),
            "lookup error: no results recorded for 'x'"
        );
    }
}
