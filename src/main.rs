//! VisFlow command line
//!
//! Loads a diagram, runs propagation against datasets on disk and prints
//! what every node produced.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use visflow::config::{EngineConfig, LoggingConfig};
use visflow::flow::{Diagram, FlowEvent, FlowEvents, PassStatus};
use visflow::{DirectoryFetcher, Session};

/// VisFlow - subset-flow diagram runner
#[derive(Parser, Debug)]
#[command(name = "visflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the platform data directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a diagram, fetch its datasets and print every node's output
    Run {
        /// Diagram file (JSON)
        diagram: PathBuf,

        /// Dataset root; files are read from <data-dir>/<username>/<filename>
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Owner for data sources that don't name one
        #[arg(short, long)]
        username: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a diagram's structure without fetching data
    Check {
        /// Diagram file (JSON)
        diagram: PathBuf,
    },
}

fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "visflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::load_or_default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    let _guard = init_logging(&config.logging);

    match cli.command {
        Commands::Run {
            diagram,
            data_dir,
            username,
            json,
        } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(user) = username {
                config.username = user;
            }
            run(config, diagram, json)
        }
        Commands::Check { diagram } => check(diagram),
    }
}

fn run(config: EngineConfig, path: PathBuf, json: bool) -> anyhow::Result<()> {
    tracing::info!("Running {:?} with datasets from {:?}", path, config.data_dir);
    let fetcher = Arc::new(DirectoryFetcher::new(&config.data_dir));
    let (mut session, events) = Session::with_channel(config, fetcher);
    session
        .load_diagram(&path)
        .with_context(|| format!("Failed to load diagram {}", path.display()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let status = runtime.block_on(session.settle());
    if let PassStatus::Completed {
        generation,
        processed,
    } = status
    {
        tracing::info!("Pass {} processed {} nodes", generation, processed);
    }

    let errors: Vec<String> = events
        .try_iter()
        .filter_map(|event| match event {
            FlowEvent::NodeError { node, message } => Some(format!("{}: {}", node, message)),
            FlowEvent::SystemMessage(message) => Some(message),
            _ => None,
        })
        .collect();

    let flow = session.flow();
    let rows: Vec<serde_json::Value> = flow
        .node_ids()
        .map(|id| {
            let output = flow.output_package(id).ok().map(|p| p.count());
            serde_json::json!({
                "id": id.0,
                "type": flow.node(id).and_then(|n| n.node_type()),
                "label": flow.label(id),
                "state": flow.node_state(id).map(|s| s.to_string()),
                "output": output,
            })
        })
        .collect();

    if json {
        let report = serde_json::json!({ "nodes": rows, "errors": errors });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for row in &rows {
            println!(
                "{:>4}  {:<24} {:<10} {}",
                row["id"],
                row["label"].as_str().unwrap_or_default(),
                row["state"].as_str().unwrap_or_default(),
                row["output"]
                    .as_u64()
                    .map_or_else(|| "-".to_string(), |n| format!("{} items", n)),
            );
        }
        for error in &errors {
            eprintln!("error: {}", error);
        }
    }
    Ok(())
}

fn check(path: PathBuf) -> anyhow::Result<()> {
    let diagram = Diagram::load(&path)
        .with_context(|| format!("Failed to read diagram {}", path.display()))?;
    let flow = diagram
        .instantiate(FlowEvents::disabled())
        .with_context(|| format!("Invalid diagram {}", path.display()))?;
    println!(
        "{}: {} nodes, {} edges (format version {})",
        path.display(),
        flow.node_count(),
        flow.edge_count(),
        diagram.version
    );
    Ok(())
}
