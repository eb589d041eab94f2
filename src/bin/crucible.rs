use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crucible::{CallContext, Engine, EngineConfig};

#[derive(Parser, Debug)]
#[command(name = "crucible", version, about = "Sandboxed, stateful snippet execution")]
struct Cli {
    /// Snippet file to execute
    file: Option<PathBuf>,

    /// Execute the given snippet text instead of a file
    #[arg(short = 'e', long = "eval", value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,

    /// Engine configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Caller identity used to partition persistent state
    #[arg(long)]
    caller: Option<String>,

    /// Comma-separated variable names to persist after execution
    #[arg(long, default_value = "")]
    save: String,

    /// Print the saved-variable snapshot after any execution
    #[arg(long)]
    state: bool,

    /// Clear saved variables and the execution counter
    #[arg(long)]
    reset: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(config);
    let ctx = CallContext {
        caller: cli.caller.clone(),
        progress: None,
    };

    let code = match (&cli.eval, &cli.file) {
        (Some(code), _) => Some(code.clone()),
        (None, Some(path)) => Some(std::fs::read_to_string(path)?),
        (None, None) => None,
    };

    if code.is_none() && !cli.state && !cli.reset {
        return Err("nothing to do: pass a snippet file, -e CODE, --state or --reset".into());
    }

    if let Some(code) = code {
        println!("{}", engine.run(&code, &cli.save, &ctx).await);
    }
    if cli.state {
        println!("{}", engine.view_state(&ctx));
    }
    if cli.reset {
        println!("{}", engine.clear(&ctx));
    }

    Ok(())
}
