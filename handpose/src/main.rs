//! handpose - hand pose detection demo
//!
//! Replays a script of synthetic hand shapes through a pose detector and
//! logs pose transitions and the actions they drive.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tracing::info;

use handpose::config::PoseConfig;
use handpose::pose::{
    DetectorConfig, Hand, HandShape, PoseDetector, PoseEvent, ShapeScript, SmoothingConfig,
};

const DEFAULT_SCRIPT: &str = "open:0.5,pinch:0.6,open:0.5,fist:0.6,point:0.7,open:0.5";

#[derive(Parser, Debug)]
#[command(name = "handpose", about = "Hand pose detection on scripted tracking data")]
struct Cli {
    /// Pose configuration file (s-expression); built-in poses when omitted
    #[arg(long)]
    poses: Option<PathBuf>,

    /// Hand to simulate: left or right
    #[arg(long, default_value = "right")]
    hand: String,

    /// Shape script: comma-separated shape:seconds steps
    /// (shapes: open, fist, point, pinch)
    #[arg(long, default_value = DEFAULT_SCRIPT)]
    script: String,

    /// Seconds spent blending into each script step
    #[arg(long, default_value_t = 0.1)]
    blend: f32,

    /// Tick rate in Hz
    #[arg(long, default_value_t = 60.0)]
    rate: f32,

    /// Lose tracking for one tick every N ticks (0 = never)
    #[arg(long, default_value_t = 0)]
    dropout_every: u64,

    /// Smooth joint positions before feature extraction
    #[arg(long)]
    smooth: bool,

    /// Print each tick's feature vector to stdout
    #[arg(long)]
    features: bool,

    /// Print the pose configuration as an s-expression and exit
    #[arg(long)]
    dump_config: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("handpose {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handpose=info".into()),
        )
        .init();

    let config = match &cli.poses {
        Some(path) => PoseConfig::load(path)
            .with_context(|| format!("loading pose configuration {}", path.display()))?,
        None => PoseConfig::builtin().context("parsing built-in poses")?,
    };
    let warnings = config.log_warnings();

    if cli.dump_config {
        println!("{}", config.to_sexp());
        return Ok(());
    }

    let hand = Hand::parse(&cli.hand)
        .ok_or_else(|| anyhow!("unknown hand: {}. Use: left or right", cli.hand))?;
    if !(cli.rate > 0.0) {
        bail!("tick rate must be positive, got {}", cli.rate);
    }
    let script = parse_script(&cli.script, cli.blend)?;

    info!("handpose v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "{} poses ({} warnings), {} actions, {:.1}s script on {} hand",
        config.poses.len(),
        warnings,
        config.actions.len(),
        script.duration(),
        hand.as_str()
    );

    let detector_config = DetectorConfig {
        smoothing: SmoothingConfig {
            enabled: cli.smooth,
            ..SmoothingConfig::default()
        },
        ..DetectorConfig::default()
    };
    let mut detector = PoseDetector::with_config(hand, config.poses.clone(), detector_config);
    detector.add_observer(|event: &PoseEvent| info!("{}", event.to_sexp()));
    let mut actions = config.actions.clone();

    let dt = 1.0 / cli.rate;
    let mut tick: u64 = 0;
    while let Some(shape) = script.shape_at(tick as f32 * dt) {
        let t = tick as f32 * dt;
        let mut skeleton = shape.skeleton(hand);
        skeleton.timestamp_ns = (f64::from(t) * 1e9) as u64;

        let dropped = cli.dropout_every > 0 && (tick + 1) % cli.dropout_every == 0;
        if dropped {
            skeleton.lose_tracking();
        }

        for event in detector.update(dt, &skeleton) {
            if let Some((action, value)) = actions.apply(&event) {
                info!("action {} = {}", action, value);
            }
        }

        if cli.features && !dropped {
            if let Some(features) = detector.last_features() {
                println!(
                    "{:.3} {} {}",
                    t,
                    script.label_at(t).unwrap_or("-"),
                    features.to_sexp()
                );
            }
        }
        tick += 1;
    }

    info!("script finished after {} ticks", tick);
    println!("{}", detector.status_sexp());
    println!("{}", actions.values_sexp());

    for event in detector.reset() {
        actions.apply(&event);
    }
    Ok(())
}

/// Parse `shape:seconds` steps separated by commas.
fn parse_script(text: &str, blend: f32) -> anyhow::Result<ShapeScript> {
    let mut script = ShapeScript::new(blend);
    for step in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, seconds) = step
            .split_once(':')
            .with_context(|| format!("script step {:?}: expected shape:seconds", step))?;
        let shape = HandShape::preset(name).with_context(|| {
            format!(
                "script step {:?}: unknown shape {:?}. Use: open, fist, point, pinch",
                step, name
            )
        })?;
        let seconds: f32 = seconds
            .parse()
            .with_context(|| format!("script step {:?}: bad duration", step))?;
        if !(seconds > 0.0) {
            bail!("script step {:?}: duration must be positive", step);
        }
        script.push(name, shape, seconds);
    }
    if script.is_empty() {
        bail!("script has no steps");
    }
    Ok(script)
}
