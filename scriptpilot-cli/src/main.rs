//! # scriptpilot CLI
//!
//! Turns requests into Python scripts, runs them and reports back.
//!
//! Usage:
//!   scriptpilot                      interactive mode
//!   scriptpilot <request...>         run one request and exit
//!   scriptpilot --dry-run            show each script and ask before running it
//!
//! Examples:
//!   scriptpilot "How many files are in my Downloads folder?"
//!   scriptpilot --model gpt-4o-mini --dry-run

mod config;
mod console;
mod logging;
mod provider;

use clap::Parser;
use config::Config;
use console::TerminalConsole;
use provider::Provider;
use rustyline::error::ReadlineError;
use scriptpilot_agent::{Console, CtrlC, PythonRunner, ScriptArchive, ScriptLoop, ScriptRunner, SystemPrompt};
use scriptpilot_error::{Error, Result};
use scriptpilot_llm::LlmProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scriptpilot")]
#[command(author, version, about = "A command-line assistant that writes and runs Python scripts for you")]
struct Cli {
    /// Request to run directly. If empty, start interactive mode
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,

    /// Print each script before executing it and ask for confirmation
    #[arg(long)]
    dry_run: bool,

    /// Model to use instead of the configured one
    #[arg(short, long)]
    model: Option<String>,

    /// Config file (default: ~/.scriptpilot/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn banner() -> String {
    format!(
        r"   / \__
  (    @\___
  /         O
 /   (_____/
/_____/   U    scriptpilot v{}",
        env!("CARGO_PKG_VERSION")
    )
}

/// Node name as `uname -n` reports it.
#[cfg(unix)]
fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(not(unix))]
fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn input_prompt() -> String {
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| ".".to_string());
    format!("{}@{} > ", hostname(), cwd)
}

/// Fail early when the configured interpreter cannot be started.
fn check_interpreter(python: &str) -> Result<()> {
    std::process::Command::new(python)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map_err(|e| Error::spawn_failed(python, e.to_string()))
        .and_then(|status| {
            if status.success() {
                Ok(())
            } else {
                Err(Error::spawn_failed(python, format!("`{} --version` exited with {}", python, status)))
            }
        })
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(config::default_path);
    let mut config = Config::load_or_init(&path)?;
    config.apply_env(|name| std::env::var(name).ok());

    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if cli.dry_run {
        config.dry_run = true;
    }

    tracing::debug!(
        path = %path.display(),
        provider = ?config.provider,
        model = ?config.model,
        dry_run = config.dry_run,
        "config loaded"
    );
    Ok(config)
}

async fn interactive<P, R>(script_loop: &ScriptLoop<'_, P, R, CtrlC>, console: &mut TerminalConsole) -> Result<()>
where
    P: LlmProvider,
    R: ScriptRunner,
{
    console.print(&banner());

    loop {
        console.print("\nWhat can I do for you? (Ctrl-C to exit)");
        match console.read_request(&input_prompt()) {
            Ok(line) => {
                console.print("");
                let Some(line) = line else {
                    continue;
                };
                if let Err(e) = script_loop.run(console, &line).await {
                    tracing::debug!(error = ?e, "cycle failed");
                    console.print(&format!("Error: {}", e));
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                console.print("Exiting...");
                return Ok(());
            }
            Err(ReadlineError::Io(e)) => return Err(Error::from(e).with_operation("cli::interactive")),
            Err(e) => {
                return Err(Error::unexpected("line editor failed")
                    .with_operation("cli::interactive")
                    .set_source(e))
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    check_interpreter(&config.python)?;

    let provider = Provider::new(config.provider_config()?)?;
    let runner = PythonRunner::new(&config.python);
    let system_prompt = SystemPrompt::default().to_prompt();

    let mut script_loop =
        ScriptLoop::new(&provider, &runner, &CtrlC, system_prompt).with_config(config.loop_config());
    if config.archive_scripts {
        script_loop = script_loop.with_archive(ScriptArchive::new(config::app_dir().join("scripts"))?);
    }

    if !cli.prompt.is_empty() {
        let mut console = TerminalConsole::new(None)?;
        let report = script_loop.run(&mut console, &cli.prompt.join(" ")).await?;
        tracing::debug!(turns = report.turns, tokens = report.usage.total_tokens(), "done");
        return Ok(());
    }

    let mut console = TerminalConsole::new(Some(config::history_path()))?;
    interactive(&script_loop, &mut console).await
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::debug!(error = ?e, "exiting with error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
