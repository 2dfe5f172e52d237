mod dispatch;
mod normalize;

pub use dispatch::{execute, Operation, UnknownCommand, DEFAULT_SCREENSHOT_PATH, OPERATION_NAMES};
pub use normalize::{normalize, resolve_value, scalar_text, shape, Args};

use crate::automation::{Automation, SessionState};
use crate::expr::{FakeData, Faker, ModuleRegistry, Namespace, Resolver, Unresolved};
use crate::script::{Command, Script, MAX_INCLUDE_DEPTH};
use crate::{Error, Result};
use rand::Rng;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Interpreter policies for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Abort the run and return the first failure.
    pub errors: bool,
    /// Log each command at info level before running it.
    pub verbose: bool,
    /// Stop the session after a failure.
    pub stop_on_failure: bool,
    pub unknown: UnknownCommand,
    pub unresolved: Unresolved,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            errors: false,
            verbose: false,
            stop_on_failure: true,
            unknown: UnknownCommand::default(),
            unresolved: Unresolved::default(),
        }
    }
}

/// A command that failed during a run.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    /// 1-based position in execution order (included commands count too).
    pub index: usize,
    /// The command as YAML.
    pub command: String,
    pub error: String,
}

/// Result of running a script.
#[derive(Debug)]
pub struct RunResult {
    /// Number of commands that completed without error.
    pub commands_executed: usize,
    pub failures: Vec<CommandFailure>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
    /// Imports and recorded results at the end of the run.
    pub namespace: Namespace,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Where the runner is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// The last run stopped early on a failure.
    Aborted,
}

/// Context for command execution.
#[derive(Debug, Clone)]
struct ExecutionContext {
    /// Base path for resolving relative includes.
    base_path: PathBuf,
    /// Current include depth.
    include_depth: usize,
}

impl ExecutionContext {
    fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            include_depth: 0,
        }
    }

    /// Create a child context for an include.
    fn child(&self, new_base: impl Into<PathBuf>) -> Result<Self> {
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            return Err(Error::Script(format!(
                "maximum include depth ({}) exceeded",
                MAX_INCLUDE_DEPTH
            )));
        }
        Ok(Self {
            base_path: new_base.into(),
            include_depth: self.include_depth + 1,
        })
    }

    /// Resolve a relative path against the base path.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

/// Mutable state threaded through one run.
struct Progress {
    namespace: Namespace,
    index: usize,
    executed: usize,
    failures: Vec<CommandFailure>,
}

/// Executes command scripts against an automation session.
pub struct Runner<A: Automation> {
    session: A,
    registry: ModuleRegistry,
    fake: Box<dyn FakeData>,
    options: RunOptions,
    state: RunState,
}

impl<A: Automation> Runner<A> {
    /// Create a runner with the standard modules and default options.
    pub fn new(session: A) -> Self {
        Self {
            session,
            registry: ModuleRegistry::standard(),
            fake: Box::new(Faker),
            options: RunOptions::default(),
            state: RunState::Idle,
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the modules that `import` can reach.
    pub fn with_registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the `fake_*` data provider.
    pub fn with_fake_data(mut self, fake: impl FakeData + 'static) -> Self {
        self.fake = Box::new(fake);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut RunOptions {
        &mut self.options
    }

    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn session(&self) -> &A {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut A {
        &mut self.session
    }

    pub fn into_session(self) -> A {
        self.session
    }

    /// Load a script file and run it; includes resolve against its directory.
    pub async fn command_script_file(&mut self, path: impl AsRef<Path>) -> Result<RunResult> {
        let script = Script::load(path)?;
        self.command_script(&script).await
    }

    /// Run a script with a fresh namespace.
    ///
    /// Failures are reported and collected in the result. With
    /// [`RunOptions::errors`] set, the first failure is returned instead.
    pub async fn command_script(&mut self, script: &Script) -> Result<RunResult> {
        let start = Instant::now();
        let ctx = ExecutionContext::new(script.base_dir());
        let mut progress = Progress {
            namespace: Namespace::new(),
            index: 0,
            executed: 0,
            failures: Vec::new(),
        };
        self.registry.install_prelude(&mut progress.namespace);

        debug!("Running script with {} commands", script.len());
        self.state = RunState::Running;
        if let Err(e) = self
            .run_commands(&script.commands, &ctx, &mut progress)
            .await
        {
            self.state = RunState::Aborted;
            return Err(e);
        }
        self.state = RunState::Idle;

        Ok(RunResult {
            commands_executed: progress.executed,
            failures: progress.failures,
            duration_ms: start.elapsed().as_millis() as u64,
            namespace: progress.namespace,
        })
    }

    async fn run_commands(
        &mut self,
        commands: &[Command],
        ctx: &ExecutionContext,
        progress: &mut Progress,
    ) -> Result<()> {
        for command in commands {
            progress.index += 1;
            let index = progress.index;
            if self.options.verbose {
                info!("[{}] {}", index, command);
            } else {
                debug!("Executing command {}: {}", index, command.name);
            }

            if self.session.config().demo {
                let ms = rand::thread_rng().gen_range(0..1000u64);
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }

            if command.name == "include" {
                match self.load_include(command, ctx, &mut progress.namespace) {
                    Ok((included, child_ctx)) => {
                        Box::pin(self.run_commands(&included.commands, &child_ctx, progress))
                            .await?;
                    }
                    Err(e) => self.fail(index, command, e, progress).await?,
                }
                continue;
            }

            match self.run_command(command, &mut progress.namespace).await {
                Ok(()) => progress.executed += 1,
                Err(e) => self.fail(index, command, e, progress).await?,
            }
        }
        Ok(())
    }

    /// Report a failure, stop the session if configured, and decide whether
    /// the run continues.
    async fn fail(
        &mut self,
        index: usize,
        command: &Command,
        err: Error,
        progress: &mut Progress,
    ) -> Result<()> {
        let pretty = command.pretty();
        error!("Command {} failed: {}\n{}", index, err, pretty);
        progress.failures.push(CommandFailure {
            index,
            command: pretty,
            error: err.to_string(),
        });

        if self.options.stop_on_failure && self.session.state() == SessionState::Running {
            if let Err(e) = self.session.stop().await {
                warn!("Failed to stop session: {}", e);
            }
        }

        if self.options.errors {
            Err(err)
        } else {
            Ok(())
        }
    }

    fn resolve_args(&self, command: &Command, namespace: &mut Namespace) -> Result<Args> {
        let mut resolver =
            Resolver::new(namespace, self.fake.as_ref()).unresolved(self.options.unresolved);
        normalize(command, &mut resolver)
    }

    fn load_include(
        &self,
        command: &Command,
        ctx: &ExecutionContext,
        namespace: &mut Namespace,
    ) -> Result<(Script, ExecutionContext)> {
        let args = self.resolve_args(command, namespace)?;
        let path = ctx.resolve_path(&args.string(0, "path")?);
        info!("include: {}", path.display());

        let child_base = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let child_ctx = ctx.child(child_base)?;
        let script = Script::load(&path).map_err(|e| {
            Error::Script(format!("failed to load include '{}': {}", path.display(), e))
        })?;
        Ok((script, child_ctx))
    }

    async fn run_command(&mut self, command: &Command, namespace: &mut Namespace) -> Result<()> {
        match command.name.as_str() {
            "import" => {
                let args = self.resolve_args(command, namespace)?;
                if args.is_empty() {
                    return Err(Error::Argument("import: missing module name".into()));
                }
                for value in args.values() {
                    let spec = scalar_text(value).ok_or_else(|| {
                        Error::Argument(format!("import: expected a module name, got {}", value))
                    })?;
                    let added = self.registry.import(&spec, namespace)?;
                    debug!("import {}: {:?}", spec, added);
                }
                Ok(())
            }
            tag @ ("value_of" | "text_of") => {
                let args = self.resolve_args(command, namespace)?;
                let selector = args.string(0, "selector")?;
                if self.session.state() == SessionState::Stopped {
                    return Err(Error::SessionStopped);
                }
                let value = if tag == "value_of" {
                    self.session.get_value(&selector).await?
                } else {
                    self.session.get_text(&selector).await?
                };
                debug!("{} {} = '{}'", tag, selector, value);
                namespace.record(tag, Value::String(value));
                Ok(())
            }
            name => match Operation::from_name(name) {
                Some(op) => {
                    let args = self.resolve_args(command, namespace)?;
                    execute(&mut self.session, op, &args).await
                }
                None => match self.options.unknown {
                    UnknownCommand::Ignore => Ok(()),
                    UnknownCommand::Warn => {
                        warn!("Unknown command '{}', skipping", name);
                        Ok(())
                    }
                    UnknownCommand::Error => Err(Error::UnknownCommand(name.to_string())),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_resolve_path() {
        let ctx = ExecutionContext::new("/scripts");
        assert_eq!(
            ctx.resolve_path("common/login.yaml"),
            PathBuf::from("/scripts/common/login.yaml")
        );
        assert_eq!(ctx.resolve_path("/abs.yaml"), PathBuf::from("/abs.yaml"));
    }

    #[test]
    fn test_context_depth_limit() {
        let mut ctx = ExecutionContext::new(".");
        for _ in 0..MAX_INCLUDE_DEPTH {
            ctx = ctx.child(".").unwrap();
        }
        let err = ctx.child(".").unwrap_err();
        assert!(err.to_string().contains("maximum include depth"));
    }

    #[test]
    fn test_default_options() {
        let options = RunOptions::default();
        assert!(!options.errors);
        assert!(options.stop_on_failure);
        assert_eq!(options.unknown, UnknownCommand::Warn);
        assert_eq!(options.unresolved, Unresolved::Empty);
    }
}
