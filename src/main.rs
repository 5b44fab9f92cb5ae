use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lifecycle_hooks::config::Config;
use lifecycle_hooks::demo::{TaskRunner, Variant, EXECUTE};
use lifecycle_hooks::hooks::RunOutcome;

#[derive(Parser)]
#[command(name = "lifecycle-hooks")]
#[command(about = "Run tasks through declarative before/after/around hooks", long_about = None)]
struct Cli {
    /// Path to a config file (default: the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a task variant through the `execute` lifecycle
    Run {
        /// Which task variant supplies the hook implementations
        #[arg(short, long, value_enum, default_value = "child")]
        variant: Variant,
    },
    /// List configured lifecycles and their hooks
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or write the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // `config --init` writes the file, so it must not require one to exist
    let config = match &cli.command {
        Commands::Config { init: true, .. } => Config::default(),
        _ => load_config(cli.config.as_deref())?,
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run { variant } => {
            run_task(&config, variant).await?;
        }
        Commands::List { json } => {
            list_lifecycles(&config, json)?;
        }
        Commands::Config { show, init } => {
            handle_config(&config, cli.config.as_deref(), show, init)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

async fn run_task(config: &Config, variant: Variant) -> Result<()> {
    let engine = config.build_registry()?.into_engine();
    let runner = TaskRunner::new(variant.task());

    let execution = runner.execute(&engine).await?;

    for line in &execution.log {
        println!("{}", line);
    }

    match execution.outcome {
        RunOutcome::Completed(value) => println!("\n✓ {}", value),
        RunOutcome::Aborted(info) => {
            println!("\n✗ {} aborted by '{}': {}", EXECUTE, info.hook, info.reason)
        }
    }

    Ok(())
}

fn list_lifecycles(config: &Config, json: bool) -> Result<()> {
    let registry = config.build_registry()?;

    if json {
        let listing: Vec<_> = registry
            .lifecycles()
            .into_iter()
            .map(|phase_set| {
                let hooks: Vec<_> = registry
                    .list_hooks(&phase_set.name)
                    .into_iter()
                    .map(|(name, kind, ordinal)| {
                        serde_json::json!({ "name": name, "kind": kind, "ordinal": ordinal })
                    })
                    .collect();
                serde_json::json!({
                    "name": phase_set.name,
                    "abort_policy": phase_set.abort_policy,
                    "hooks": hooks,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for phase_set in registry.lifecycles() {
        println!("{} ({:?})", phase_set.name, phase_set.abort_policy);
        for (name, kind, ordinal) in registry.list_hooks(&phase_set.name) {
            println!("  #{:<3} {:<7} {}", ordinal, kind.display_name(), name);
        }
    }

    Ok(())
}

fn handle_config(config: &Config, path: Option<&Path>, show: bool, init: bool) -> Result<()> {
    if init {
        let default = Config::default();
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => Config::config_path()?,
        };
        default.save_to(&target)?;
        println!("Configuration saved to: {}", target.display());
        return Ok(());
    }

    if show {
        println!("Current configuration:");
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    println!("No changes made. Use --show to view current configuration.");
    Ok(())
}
