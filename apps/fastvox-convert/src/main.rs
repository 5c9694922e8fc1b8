//! fastvox converter
//!
//! Reads a MagicaVoxel `.vox` model, builds a sparse voxel octree from its
//! voxels and writes the flattened node list consumed by the path tracer.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p fastvox-convert -- [OPTIONS]
//! ```
//!
//! Without options, `test.vox` is converted into `scene_vox.json`.
//!
//! ## Examples
//!
//! ```bash
//! # Reproducible materials, compiled on all cores
//! cargo run -p fastvox-convert -- --seed 42 --parallel
//!
//! # Cap the octree at one million nodes
//! cargo run -p fastvox-convert -- -i big.vox --max-nodes 1000000
//!
//! # Second model of a file, as a raw GPU buffer
//! cargo run -p fastvox-convert -- -i castle.vox -m 1 -o castle.bin --format gpu
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use fastvox_core::constants::DEFAULT_MAX_DEPTH;
use fastvox_scene::{convert, ConvertConfig, OutputFormat, DEFAULT_INPUT, DEFAULT_OUTPUT};
use glam::Vec3;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// JSON scene records
    Json,
    /// Raw GPU node buffer
    Gpu,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => Self::Json,
            Format::Gpu => Self::Gpu,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// MagicaVoxel file to read
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// File to write
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Model index within the file
    #[arg(short, long, default_value_t = 0)]
    model: usize,

    /// Reject models needing a deeper octree
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Fail instead of growing the octree past this many nodes
    #[arg(long)]
    max_nodes: Option<usize>,

    /// World-space center of the root node
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    anchor: Option<Vec<f32>>,

    /// Seed for placeholder materials
    #[arg(long)]
    seed: Option<u64>,

    /// Compile top-level octants in parallel
    #[arg(long)]
    parallel: bool,

    /// Output encoding
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,
}

impl From<Args> for ConvertConfig {
    fn from(args: Args) -> Self {
        let anchor = args
            .anchor
            .map_or(Vec3::ZERO, |xyz| Vec3::from_slice(&xyz));

        let config = Self::new(args.input, args.output)
            .with_model(args.model)
            .with_max_depth(args.max_depth)
            .with_anchor(anchor)
            .with_seed(args.seed)
            .with_parallel(args.parallel)
            .with_format(args.format.into(), args.pretty);
        match args.max_nodes {
            Some(limit) => config.with_node_limit(limit),
            None => config,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ConvertConfig::from(Args::parse());
    let report = convert(&config)?;

    if report.dropped > 0 {
        warn!(
            "{} voxels lay on a split plane and are missing from the output",
            report.dropped
        );
    }
    info!(
        "Done: root size {}, {} records from {} voxels",
        report.root_size,
        report.stats.total(),
        report.inserted + report.dropped
    );

    Ok(())
}
