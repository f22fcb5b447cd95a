//! Command-line front end: reads an edge list and prints its metrics report or a laid out render
//! frame as JSON.

use std::{
    fs::File,
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coexnet::{
    analytics,
    config::Config,
    graph::{DuplicateEdges, Graph},
    layout::{self, Seeding},
    render::Frame,
};

#[derive(Parser)]
#[command(name = "coexnet", version)]
#[command(about = "Lay out and analyse gene co-expression networks")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON configuration file, missing fields take their defaults
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Collapse rows joining the same pair of genes into one edge with the summed weight
    #[arg(long, global = true)]
    merge_duplicates: bool,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the metrics report and its warnings
    Metrics {
        /// Edge list, one `<source> <target> [weight]` row per line
        file: PathBuf,
    },
    /// Run the layout simulation and print the final render frame
    Layout {
        /// Edge list, one `<source> <target> [weight]` row per line
        file: PathBuf,

        /// Seed of the initial layout
        #[arg(long, short = 's', default_value_t = 0)]
        seed: u64,
    },
}

#[derive(Serialize)]
struct LayoutOutput {
    #[serde(flatten)]
    frame: Frame,
    status: layout::SimulationStatus,
    ticks: usize,
    warning: Option<layout::LayoutWarning>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.global.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if cli.global.merge_duplicates {
        config.duplicates = DuplicateEdges::Merge;
    }

    match cli.command {
        Command::Metrics { file } => {
            let graph = load(&file, config.duplicates)?;
            let analysis = analytics::compute(&graph, &config.analytics)
                .with_context(|| format!("failed to analyse {}", file.display()))?;

            emit(&analysis, cli.global.pretty)
        }
        Command::Layout { file, seed } => {
            let graph = load(&file, config.duplicates)?;
            let result = layout::layout(&graph, config.layout, Seeding::Random(seed))
                .with_context(|| format!("failed to lay out {}", file.display()))?;

            info!(ticks = result.ticks, status = ?result.status, "layout finished");

            let output = LayoutOutput {
                frame: Frame::new(&graph, &result.positions)?,
                status: result.status,
                ticks: result.ticks,
                warning: result.warning,
            };

            emit(&output, cli.global.pretty)
        }
    }
}

fn load(path: &Path, duplicates: DuplicateEdges) -> Result<Graph> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let graph = Graph::builder()
        .duplicates(duplicates)
        .read(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))?
        .build();

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "loaded {}",
        path.display()
    );

    Ok(graph)
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();

    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;

    Ok(())
}
