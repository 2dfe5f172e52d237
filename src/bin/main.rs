use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use webrunner::script::RESERVED_COMMANDS;
use webrunner::{
    BrowserSession, Operation, RunOptions, Runner, Script, SessionConfig, UnknownCommand,
    Unresolved,
};

#[derive(Parser)]
#[command(name = "webrunner")]
#[command(about = "Run YAML/JSON browser automation scripts")]
#[command(version)]
struct Cli {
    /// Script files to run, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Base URL prefixed to relative `goto` paths
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Default wait timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// Offset (px) used when scrolling elements into view
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    default_offset: i64,

    /// Abort a script on its first failing command
    #[arg(long)]
    errors: bool,

    /// Run in headless mode
    #[arg(long)]
    headless: bool,

    /// Scroll elements into view before interacting with them
    #[arg(long)]
    scroll_to_element: bool,

    /// Bring the browser window to the front after launch
    #[arg(long)]
    focus: bool,

    /// Demo mode: cursor and keystroke overlays, typed input, random pauses
    #[arg(long)]
    demo: bool,

    /// Run scripts in parallel worker processes
    #[arg(long, value_name = "N", default_value_t = 1)]
    workers: usize,

    /// Treat unknown commands and unresolved expressions as errors
    #[arg(long)]
    strict: bool,

    /// Verbose output (-v for info and command echo, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate scripts without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig {
            headless: self.headless,
            timeout_secs: self.timeout,
            default_offset: self.default_offset,
            scroll_to_element: self.scroll_to_element,
            focus: self.focus,
            demo: self.demo,
            ..SessionConfig::default()
        };
        if let Some(ref base_url) = self.base_url {
            config.base_url = base_url.clone();
        }
        config
    }

    fn run_options(&self) -> RunOptions {
        let mut options = RunOptions {
            errors: self.errors,
            verbose: self.verbose > 0,
            ..RunOptions::default()
        };
        if self.strict {
            options.unknown = UnknownCommand::Error;
            options.unresolved = Unresolved::Error;
        }
        options
    }

    /// Arguments for a worker process running a single script.
    fn worker_args(&self, file: &Path) -> Vec<String> {
        let mut args = vec![
            "--timeout".to_string(),
            self.timeout.to_string(),
            format!("--default-offset={}", self.default_offset),
        ];
        if let Some(ref base_url) = self.base_url {
            args.push("--base-url".into());
            args.push(base_url.clone());
        }
        for (set, flag) in [
            (self.errors, "--errors"),
            (self.headless, "--headless"),
            (self.scroll_to_element, "--scroll-to-element"),
            (self.focus, "--focus"),
            (self.demo, "--demo"),
            (self.strict, "--strict"),
            (self.quiet, "--quiet"),
        ] {
            if set {
                args.push(flag.into());
            }
        }
        for _ in 0..self.verbose {
            args.push("-v".into());
        }
        args.push(file.display().to_string());
        args
    }
}

/// Validate a script and its includes; returns the number of problems.
fn check_script(path: &Path, strict: bool, depth: usize) -> usize {
    let script = match Script::load(path) {
        Ok(s) => s,
        Err(e) => {
            println!("✗ {}: {}", path.display(), e);
            return 1;
        }
    };
    let mut problems = 0;
    let indent = "  ".repeat(depth + 1);
    for command in &script.commands {
        let name = command.name.as_str();
        if name == "include" {
            let include = command
                .args
                .as_ref()
                .and_then(|v| v.as_str())
                .map(|p| script.base_dir().join(p));
            match include {
                Some(p) if depth < webrunner::script::MAX_INCLUDE_DEPTH => {
                    problems += check_script(&p, strict, depth + 1);
                }
                Some(p) => {
                    println!("{}✗ include too deep: {}", indent, p.display());
                    problems += 1;
                }
                None => println!("{}? include with a computed path (not checked)", indent),
            }
        } else if Operation::from_name(name).is_none() && !RESERVED_COMMANDS.contains(&name) {
            println!("{}? unknown command: {}", indent, name);
            if strict {
                problems += 1;
            }
        }
    }
    println!(
        "{}{}: {} commands",
        "  ".repeat(depth),
        path.display(),
        script.len()
    );
    problems
}

async fn run_file(cli: &Cli, path: &Path) -> bool {
    let script = match Script::load(path) {
        Ok(s) => s,
        Err(e) => {
            println!("✗ Failed to load: {}", e);
            return false;
        }
    };

    let session = match BrowserSession::launch(cli.session_config()).await {
        Ok(s) => s,
        Err(e) => {
            println!("✗ Failed to launch browser: {}", e);
            return false;
        }
    };

    let mut runner = Runner::new(session).with_options(cli.run_options());
    let outcome = runner.command_script(&script).await;
    if let Err(e) = runner.into_session().close().await {
        tracing::warn!("Failed to close browser: {}", e);
    }

    println!();
    match outcome {
        Ok(result) => {
            if result.success() {
                println!("✓ Success");
            } else {
                println!("✗ {} failed", result.failures.len());
                for failure in &result.failures {
                    println!("  [{}] {}", failure.index, failure.error);
                }
            }
            println!("  Commands: {}", result.commands_executed);
            println!("  Duration: {}ms", result.duration_ms);
            result.success() || !cli.errors
        }
        Err(e) => {
            println!("✗ Aborted");
            println!("  Error: {}", e);
            false
        }
    }
}

async fn run_workers(cli: &Cli) -> webrunner::Result<bool> {
    let exe = std::env::current_exe()?;
    let permits = Arc::new(Semaphore::new(cli.workers.max(1)));
    let mut set = JoinSet::new();

    for file in &cli.files {
        let mut cmd = tokio::process::Command::new(&exe);
        cmd.args(cli.worker_args(file));
        let permits = permits.clone();
        let file = file.clone();
        set.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            tracing::debug!("worker start: {}", file.display());
            match cmd.status().await {
                Ok(status) => status.success(),
                Err(e) => {
                    tracing::error!("Failed to start worker for {}: {}", file.display(), e);
                    false
                }
            }
        });
    }

    let mut ok = true;
    while let Some(joined) = set.join_next().await {
        ok &= joined.unwrap_or(false);
    }
    Ok(ok)
}

#[tokio::main]
async fn main() -> webrunner::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    if cli.check {
        let problems: usize = cli
            .files
            .iter()
            .map(|f| check_script(f, cli.strict, 0))
            .sum();
        if problems > 0 {
            println!("{} problem(s) found", problems);
            std::process::exit(1);
        }
        println!("All scripts valid");
        return Ok(());
    }

    let ok = if cli.workers > 1 && cli.files.len() > 1 {
        run_workers(&cli).await?
    } else {
        let mut ok = true;
        for file in &cli.files {
            println!("Processing {}:", file.display());
            ok &= run_file(&cli, file).await;
        }
        ok
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}
