//! `rusty-automation-tool` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate` — validate a workflow JSON file's DAG, print the order.
//! - `run`      — execute a workflow JSON file and print the result.
//! - `serve`    — start the API server.

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use engine::{topo_sort, ConfigPreset, Engine, EngineConfig, Workflow};

#[derive(Parser)]
#[command(name = "rusty-automation-tool", about = "Workflow automation engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Default,
    Validation,
    Development,
}

impl From<Preset> for ConfigPreset {
    fn from(p: Preset) -> Self {
        match p {
            Preset::Default => ConfigPreset::Default,
            Preset::Validation => ConfigPreset::Validation,
            Preset::Development => ConfigPreset::Development,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow definition JSON file's DAG.
    Validate {
        /// Path to the workflow JSON file.
        path: std::path::PathBuf,
    },
    /// Execute a workflow definition JSON file and print the result.
    Run {
        /// Path to the workflow JSON file.
        path: std::path::PathBuf,
        /// Run level-parallel instead of strictly sequential.
        #[arg(long)]
        parallel: bool,
        #[arg(long, value_enum, default_value = "default")]
        preset: Preset,
    },
    /// Start the REST API server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, value_enum, default_value = "default")]
        preset: Preset,
    },
}

fn load_workflow(path: &std::path::Path) -> Workflow {
    let content = std::fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("invalid workflow JSON: {e}"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { path } => {
            let workflow = load_workflow(&path);
            match topo_sort(&workflow) {
                Ok(order) => println!("workflow is valid, execution order: {order:?}"),
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Run { path, parallel, preset } => {
            let workflow = load_workflow(&path);
            let engine = Engine::new(EngineConfig::from_preset(preset.into())).expect("invalid engine configuration");

            let result =
                if parallel { engine.run_parallel(&workflow).await } else { engine.run_sequential(&workflow).await };

            match result {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result).expect("result is always serializable"));
                    if !result.errors.is_empty() {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("execution rejected: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Serve { bind, preset } => {
            info!("starting API server on {bind}");
            api::serve(&bind, EngineConfig::from_preset(preset.into())).await.unwrap();
        }
    }
}
