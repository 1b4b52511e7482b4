//! Motion retargeting command line tool.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use motion_retarget::{
    config::Config,
    document::{load_pose_sequence, write_json},
    filters::SmoothingMethod,
    retarget::Retargeter,
    rig::{RigFamily, RigProfileTable},
    smoothing::PoseSmoother,
    stats::SequenceStats,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pose document produced by the landmark detector
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the animation document
    #[arg(short, long)]
    output: PathBuf,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Smoothing method (none, kalman, savgol, combined)
    #[arg(short, long)]
    method: Option<SmoothingMethod>,

    /// Target rig family (mixamo, rigify, ue4, generic, or custom to use the
    /// configured custom mapping)
    #[arg(short, long)]
    rig: Option<RigFamily>,

    /// Also write the smoothed pose document
    #[arg(long)]
    smoothed: Option<PathBuf>,

    /// Also write summary statistics of the smoothed sequence
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(method) = args.method {
        config.smoothing.method = method;
    }
    if let Some(family) = args.rig {
        config.rig.family = Some(family);
        // A built-in family overrides any custom mapping from the config file
        if family != RigFamily::Custom {
            config.rig.custom_mapping.clear();
        }
    }
    config.validate()?;

    // Fail on configuration before touching any data
    let smoother = PoseSmoother::new(config.smoothing.clone())?;
    let mut table = RigProfileTable::with_builtin();
    let profile = config.rig.resolve_profile(&mut table)?;
    let retargeter = Retargeter::new(&profile, config.retarget.clone())?;

    let sequence = load_pose_sequence(&args.input)
        .with_context(|| format!("Failed to load pose document {}", args.input.display()))?;
    info!(
        "Loaded {} frames at {} fps from {}",
        sequence.frame_count(),
        sequence.frame_rate(),
        args.input.display()
    );

    let smoothed = smoother.smooth(&sequence)?;

    if let Some(path) = &args.smoothed {
        write_json(path, &smoothed.sequence.to_document())?;
        info!("Smoothed poses written to {}", path.display());
    }

    if let Some(path) = &args.stats {
        let stats = SequenceStats::compute(&smoothed.sequence, config.smoothing.confidence_threshold);
        info!("Mean detection rate: {:.1}%", stats.mean_detection_rate() * 100.0);
        write_json(path, &stats)?;
    }

    let output = retargeter.retarget(&smoothed.sequence);
    write_json(&args.output, &output.animation)?;

    let warnings = smoothed.warnings.len() + output.warnings.len();
    if warnings > 0 {
        warn!("Finished with {warnings} warnings");
    }
    info!(
        "Animation with {} frames and {} bones written to {}",
        output.animation.len(),
        output.animation.bone_names().len(),
        args.output.display()
    );

    Ok(())
}
