//! skiff CLI - a sandboxed coding agent
//!
//! Usage:
//!   skiff                       Interactive session, one message per line
//!   skiff --prompt "<task>"     Run a single turn and exit
//!   skiff --init                Write a default skiff.toml

use anyhow::{bail, Context, Result};
use clap::Parser;
use skiff_agent::{
    load_system_prompt, AgentLoop, AnthropicBackend, LoopConfig, LoopEvent, TurnOutcome,
};
use skiff_core::{SkiffConfig, CONFIG_FILE_NAME};
use skiff_tools::{Dispatcher, Sandbox};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Longest argument preview shown for a tool call without an audit log
const ARGS_PREVIEW_CHARS: usize = 80;

const QUIT_WORDS: [&str; 3] = ["q", "quit", "exit"];

#[derive(Parser)]
#[command(name = "skiff")]
#[command(author, version, about = "Sandboxed coding agent")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to ./skiff.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory the tools are confined to
    #[arg(long, value_name = "DIR")]
    sandbox: Option<PathBuf>,

    /// Model identifier
    #[arg(long, value_name = "ID")]
    model: Option<String>,

    /// Model calls allowed per user turn
    #[arg(long, value_name = "N")]
    max_iterations: Option<usize>,

    /// Run one turn with this message and exit
    #[arg(short, long, value_name = "TEXT")]
    prompt: Option<String>,

    /// Write a default config file and exit
    #[arg(long)]
    init: bool,
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// File config with command-line overrides applied
    fn load_config(&self) -> Result<SkiffConfig> {
        let path = self.config_path();
        let mut config = SkiffConfig::load_or_default(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        if let Some(root) = &self.sandbox {
            config.sandbox.root = root.clone();
        }
        if let Some(model) = &self.model {
            config.agent.model = model.clone();
        }
        if let Some(max_iterations) = self.max_iterations {
            config.agent.max_iterations = max_iterations;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for the conversation
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if cli.init {
        return cmd_init(cli.config_path());
    }

    let config = cli.load_config()?;
    let sandbox = Sandbox::create(&config.sandbox.root).with_context(|| {
        format!(
            "Failed to prepare sandbox at {}",
            config.sandbox.root.display()
        )
    })?;
    let backend = AnthropicBackend::from_config(&config)?;
    let system_prompt = load_system_prompt(config.agent.system_prompt_file.as_deref())?;

    info!(
        "Model {} with sandbox {}",
        backend.model(),
        sandbox.root().display()
    );

    let mut agent = AgentLoop::new(
        backend,
        Dispatcher::new(sandbox),
        system_prompt,
        LoopConfig::from_config(&config),
    )
    .with_observer(|event: LoopEvent| render_event(&event));

    match cli.prompt {
        Some(prompt) => {
            let outcome = agent.run_turn(&prompt).await;
            print_outcome(&outcome);
            Ok(())
        }
        None => run_interactive(&mut agent).await,
    }
}

fn cmd_init(path: PathBuf) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    SkiffConfig::write_default(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

async fn run_interactive(agent: &mut AgentLoop<AnthropicBackend>) -> Result<()> {
    println!("skiff: coding agent, q to quit");
    println!("Sandbox: {}", agent.sandbox_root().display());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if QUIT_WORDS.contains(&input) {
            break;
        }

        let outcome = agent.run_turn(input).await;
        print_outcome(&outcome);
        println!();
    }

    let usage = agent.usage();
    info!(
        "Session used {} input / {} output tokens over {} requests",
        usage.input_tokens, usage.output_tokens, usage.requests
    );
    Ok(())
}

/// Model text was already rendered as it arrived; only sentinels remain
fn print_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Completed { .. } => {}
        TurnOutcome::MaxIterations => println!("{}", outcome),
        TurnOutcome::BackendFailed { .. } => eprintln!("{}", outcome),
    }
}

/// Render loop progress on stdout, one line per tool call
fn render_event(event: &LoopEvent) {
    match event {
        LoopEvent::ModelText { text } => println!("{}", text.trim_end()),
        LoopEvent::ToolFinished {
            call,
            audit_log,
            result,
        } => {
            let summary = audit_log
                .clone()
                .unwrap_or_else(|| preview_arguments(&call.arguments));
            let status = if result.is_error { "error" } else { "ok" };
            println!("[{}] {} -> {}", call.tool_name, summary, status);
        }
        LoopEvent::Trimmed { removed, remaining } => {
            println!("(context trimmed: {} turns dropped, {} kept)", removed, remaining);
        }
        // Reported by the turn outcome
        LoopEvent::IterationCapReached { .. } => {}
    }
}

fn preview_arguments(arguments: &serde_json::Value) -> String {
    let text = arguments.to_string();
    if text.chars().count() <= ARGS_PREVIEW_CHARS {
        return text;
    }
    let mut preview: String = text.chars().take(ARGS_PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}
