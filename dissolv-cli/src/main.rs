//! Dissolv CLI - turn KiCad PCB files into solid-model placement requests.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dissolv::{BoardData, BuildConfig, BuildEvent, BuildResult, DissolvCore};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dissolv")]
#[command(about = "KiCad PCB to solid-model placement tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a board file and report the entities found
    Scan {
        /// Path to .kicad_pcb file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Build placement requests for a board file
    Build {
        /// Path to .kicad_pcb file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON configuration file
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Root of the package-model library
        #[arg(long, value_name = "DIR")]
        model_root: Option<PathBuf>,

        /// Minimum trace length in mm
        #[arg(long, value_name = "MM")]
        min_trace_length: Option<f64>,

        /// Record disconnected outline primitives instead of failing
        #[arg(long)]
        allow_open_outline: bool,

        /// Skip footprints with unsupported rotations instead of failing
        #[arg(long)]
        skip_unresolved: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Also write the JSON result to this file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

struct BuildArgs {
    config: Option<PathBuf>,
    model_root: Option<PathBuf>,
    min_trace_length: Option<f64>,
    allow_open_outline: bool,
    skip_unresolved: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Scan { file, format } => handle_scan(&file, format),
        Commands::Build {
            file,
            config,
            model_root,
            min_trace_length,
            allow_open_outline,
            skip_unresolved,
            format,
            output,
        } => {
            let args = BuildArgs {
                config,
                model_root,
                min_trace_length,
                allow_open_outline,
                skip_unresolved,
            };
            handle_build(&file, args, format, output.as_deref())
        }
        Commands::Config => handle_config(),
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_scan(file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let board = DissolvCore::scan(file, &BuildConfig::default())
        .with_context(|| format!("failed to scan {}", file.display()))?;

    match format {
        OutputFormat::Human => output_scan_human(&board),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&board)?),
    }
    Ok(())
}

fn load_config(args: &BuildArgs) -> anyhow::Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            BuildConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => BuildConfig::default(),
    };
    if let Some(root) = &args.model_root {
        debug!("Model root overridden: {}", root.display());
        config.model_root = root.clone();
    }
    if let Some(min) = args.min_trace_length {
        debug!("Minimum trace length overridden: {}", min);
        config.min_trace_length = min;
    }
    config.allow_open_outline |= args.allow_open_outline;
    config.skip_unresolved_footprints |= args.skip_unresolved;
    config.validate()?;
    Ok(config)
}

fn handle_build(
    file: &Path,
    args: BuildArgs,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let result = DissolvCore::build(file, &config)
        .with_context(|| format!("failed to build {}", file.display()))?;

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!(
            "Wrote {} requests for {} to {}",
            result.batch.request_count(),
            file.display(),
            path.display()
        );
    }

    match format {
        OutputFormat::Human => output_build_human(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

fn handle_config() -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&BuildConfig::default())?);
    Ok(())
}

fn output_scan_human(board: &BoardData) {
    println!("\nBoard: {}", board.filename);
    println!("{}", "─".repeat(60));
    println!("  Footprints:         {}", board.footprints.len());
    println!("  Pads:               {}", board.pads.len());
    println!("  Segments:           {}", board.segments.len());
    println!("  Vias:               {}", board.vias.len());
    println!("  Outline primitives: {}", board.outline.len());
    println!("  Package models:     {}", board.models.len());
}

fn output_build_human(result: &BuildResult) {
    let stats = &result.stats;
    println!("\nBoard: {}", result.file.display());
    println!("{}", "─".repeat(60));
    println!(
        "  Traces: {} ({} excluded), joints: {}",
        stats.traces,
        stats.excluded_traces,
        result.batch.joints.len()
    );
    println!("  Vias:   {}", stats.vias);
    println!("  Pads:   {}", stats.pads);
    println!("  Models: {}", stats.models);
    match &result.batch.boundary {
        Some(boundary) => match &boundary.kind {
            dissolv::geometry::BoundaryShape::Rect { start, end } => {
                println!("  Boundary: rectangle {} -> {}", start, end)
            }
            dissolv::geometry::BoundaryShape::Chain(chain) => {
                println!("  Boundary: {} primitives", chain.len())
            }
        },
        None => println!("  Boundary: none"),
    }

    if result.has_events() {
        println!("\n  Events:");
        for event in &result.events {
            match event {
                BuildEvent::TraceExcluded { name, length, net } => {
                    println!("    - {} ({}) excluded, length {:.4}mm", name, net, length)
                }
                BuildEvent::OutlineDisconnected { primitive } => {
                    println!("    - outline {} is disconnected", primitive)
                }
                BuildEvent::FootprintSkipped { reference, reason } => {
                    println!("    - footprint {} skipped: {}", reference, reason)
                }
            }
        }
    }
}
