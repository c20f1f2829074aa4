//! Parameter sweep driver: one quiver plot with trajectories per value of mu.

pub mod render;

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use clap::Parser;
use rkfield_core::{run_sweep, Rk4Scheme, SweepConfig};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "rkfield",
    about = "Integrate x' = mu*x - y + x*y^2, y' = x + mu*y + y^3 with RK4 and plot a mu sweep"
)]
pub struct Args {
    /// Number of randomized initial conditions per plot.
    pub trajectories: Option<usize>,

    /// Same as the positional trajectory count.
    #[arg(
        long = "trajectories",
        value_name = "N",
        conflicts_with = "trajectories"
    )]
    pub trajectories_flag: Option<usize>,

    /// JSON sweep configuration; flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the SVG plots are written to.
    #[arg(long, default_value = "plots")]
    pub out: PathBuf,

    /// Seed for the initial conditions. Random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub steps: Option<usize>,

    #[arg(long)]
    pub step_size: Option<BigDecimal>,

    /// Significant decimal digits.
    #[arg(long)]
    pub precision: Option<u64>,

    /// `reference` or `classical`.
    #[arg(long)]
    pub scheme: Option<Rk4Scheme>,

    /// Also dump every frame to frames.json.
    #[arg(long)]
    pub json: bool,
}

impl Args {
    pub fn trajectory_count(&self) -> Option<usize> {
        self.trajectories.or(self.trajectories_flag)
    }
}

pub fn load_config(args: &Args) -> Result<SweepConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => SweepConfig::default(),
    };
    if let Some(trajectories) = args.trajectory_count() {
        config.trajectories = trajectories;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(steps) = args.steps {
        config.steps = steps;
    }
    if let Some(step_size) = &args.step_size {
        config.step_size = step_size.clone();
    }
    if let Some(precision) = args.precision {
        config.precision = precision;
    }
    if let Some(scheme) = args.scheme {
        config.scheme = scheme;
    }
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<SweepConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Runs the sweep and writes the plots. Returns the written files.
pub fn run(args: &Args) -> Result<Vec<PathBuf>> {
    let config = load_config(args)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(
        seed,
        trajectories = config.trajectories,
        mus = config.mus.len(),
        precision = config.precision,
        scheme = ?config.scheme,
        "starting sweep"
    );

    let conditions = config.initial_conditions(seed)?;
    let frames = run_sweep(&config, conditions)?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;
    let mut written = Vec::with_capacity(frames.len() + 1);
    for frame in &frames {
        let path = render::render_frame(frame, &config.field_axis, &args.out)?;
        let diverged = frame.trajectories.iter().filter(|t| t.is_diverged()).count();
        info!(mu = %frame.mu, diverged, path = %path.display(), "wrote plot");
        written.push(path);
    }

    if args.json {
        let path = args.out.join("frames.json");
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &frames)?;
        written.push(path);
    }
    Ok(written)
}
