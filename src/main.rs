use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nodeviz::camera::Viewport;
use nodeviz::config::AppConfig;
use nodeviz::headless::{FrameLog, LogShell, run_until_settled};
use nodeviz::io::{FormatRegistry, GraphRecord};
use nodeviz::model::{DEFAULT_NODE_RADIUS, GraphModel};
use nodeviz::simulation::LayoutEngine;
use nodeviz::visualizer::Visualizer;

/// Force-directed layout and inspection for node/edge graphs.
#[derive(Parser)]
#[command(name = "nodeviz")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Settle a layout in one batch and write the positioned graph
    Layout {
        /// Input graph (.json, .yaml, .yml)
        #[arg(short, long)]
        input: PathBuf,

        /// Output graph; format follows the extension
        #[arg(short, long)]
        output: PathBuf,

        /// Config file (.yaml, .yml, .json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Give up after this many ticks
        #[arg(long, default_value = "10000")]
        max_ticks: usize,

        /// Seed for random placement of unpositioned nodes
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the live simulation loop until the layout settles
    Run {
        /// Input graph (.json, .yaml, .yml)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to save the graph once the loop ends
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file (.yaml, .yml, .json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many milliseconds even if still moving
        #[arg(long, default_value = "30000")]
        duration_ms: u64,

        /// Seed for random placement of unpositioned nodes
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the node and edge tables
    Inspect {
        /// Input graph (.json, .yaml, .yml)
        #[arg(short, long)]
        input: PathBuf,

        /// Only show rows matching this text
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> anyhow::Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    Ok(config)
}

fn layout(input: &Path, output: &Path, config: &AppConfig, max_ticks: usize) -> anyhow::Result<()> {
    let formats = FormatRegistry::with_defaults();
    let record = formats
        .read_graph(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let params = config.simulation.clone().sanitized();
    let viewport = Viewport::new(
        config.canvas.width,
        config.canvas.height,
        params.min_scale,
        params.max_scale,
    );
    let mut model = match config.seed {
        Some(seed) => GraphModel::with_seed(seed),
        None => GraphModel::new(),
    };
    let spawn_area = viewport
        .boundaries()
        .deflate(params.boundary_padding + DEFAULT_NODE_RADIUS);
    let summary = record.load_into(&mut model, &spawn_area);
    info!(%summary, "graph loaded");

    let mut engine = LayoutEngine::new(params);
    let result = engine.run_to_convergence(&mut model, viewport.boundaries(), max_ticks);

    formats
        .write_graph(output, &GraphRecord::from_model(&model))
        .with_context(|| format!("failed to write {}", output.display()))?;

    if result.settled {
        println!("Settled after {} ticks: {}", result.ticks, summary);
    } else {
        println!(
            "Stopped after {} ticks without settling (movement {:.3}): {}",
            result.ticks, result.total_movement, summary
        );
    }
    Ok(())
}

async fn run(
    input: &Path,
    output: Option<&Path>,
    config: &AppConfig,
    limit: Duration,
) -> anyhow::Result<()> {
    let mut visualizer = Visualizer::new(
        config,
        FrameLog::default(),
        LogShell::default(),
        Instant::now(),
    );
    visualizer.load_from(input, Instant::now())?;

    let started = Instant::now();
    let settled = run_until_settled(&mut visualizer, limit).await;
    info!(
        settled,
        elapsed_ms = started.elapsed().as_millis() as u64,
        frames = visualizer.renderer().frames(),
        "simulation loop finished"
    );

    if let Some(output) = output {
        visualizer.save_to(output)?;
    }

    if settled {
        println!("Layout settled after {} frames", visualizer.renderer().frames());
    } else {
        println!("Layout still moving after {} ms", limit.as_millis());
    }
    Ok(())
}

fn inspect(input: &Path, filter: Option<&str>) -> anyhow::Result<()> {
    let mut visualizer = Visualizer::new(
        &AppConfig::default(),
        FrameLog::default(),
        LogShell::default(),
        Instant::now(),
    );
    visualizer.load_from(input, Instant::now())?;
    visualizer.set_filter(filter.unwrap_or_default());

    if let Some(tables) = visualizer.shell().last_tables() {
        println!("{tables}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layout {
            input,
            output,
            config,
            max_ticks,
            seed,
        } => {
            let config = load_config(config.as_deref(), seed)?;
            layout(&input, &output, &config, max_ticks)?;
        }
        Commands::Run {
            input,
            output,
            config,
            duration_ms,
            seed,
        } => {
            let config = load_config(config.as_deref(), seed)?;
            run(&input, output.as_deref(), &config, Duration::from_millis(duration_ms)).await?;
        }
        Commands::Inspect { input, filter } => {
            inspect(&input, filter.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["nodeviz"]).is_err());
    }

    #[test]
    fn cli_parses_layout_subcommand() {
        let cli = Cli::try_parse_from([
            "nodeviz", "layout", "--input", "g.json", "--output", "out.yaml", "--seed", "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Layout {
                input,
                output,
                config,
                max_ticks,
                seed,
            } => {
                assert_eq!(input, PathBuf::from("g.json"));
                assert_eq!(output, PathBuf::from("out.yaml"));
                assert!(config.is_none());
                assert_eq!(max_ticks, 10000);
                assert_eq!(seed, Some(4));
            }
            _ => panic!("Expected Layout command"),
        }
    }

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::try_parse_from(["nodeviz", "run", "-i", "g.json", "--duration-ms", "500"])
            .unwrap();
        match cli.command {
            Commands::Run {
                input,
                output,
                duration_ms,
                ..
            } => {
                assert_eq!(input, PathBuf::from("g.json"));
                assert!(output.is_none());
                assert_eq!(duration_ms, 500);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn cli_parses_inspect_subcommand() {
        let cli = Cli::try_parse_from(["nodeviz", "inspect", "-i", "g.yaml", "-f", "alice"]).unwrap();
        match cli.command {
            Commands::Inspect { input, filter } => {
                assert_eq!(input, PathBuf::from("g.yaml"));
                assert_eq!(filter.as_deref(), Some("alice"));
            }
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn seed_flag_overrides_config() {
        let config = load_config(None, Some(9)).unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(load_config(None, None).unwrap().seed, None);
    }
}
