//! Mirror control demo: replays a landmark trace over a still camera frame.

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use specular_mirror::{
    aura::GeminiClassifier,
    camera::StillImageCamera,
    config::{Config, EXAMPLE_CONFIG},
    control::MirrorControl,
    landmarks::{LandmarkSource, ReplayLandmarkSource},
    render_loop::IntervalFrameClock,
    surface::{status_label, tint},
    Error,
};
use std::{path::PathBuf, sync::Arc, time::Duration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image served as the camera frame
    #[arg(short, long)]
    still: Option<PathBuf>,

    /// Landmark trace (JSON) replayed as the face tracker
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Filter override (exponential, exponential:<alpha>, none)
    #[arg(short, long)]
    filter: Option<String>,

    /// Frame clock rate override in Hz
    #[arg(long)]
    refresh_rate: Option<u32>,

    /// Seconds to run before tearing down
    #[arg(long, default_value = "5")]
    duration: u64,

    /// Press the control once to classify the aura
    #[arg(short, long)]
    analyze: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    dump_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.dump_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Specular mirror");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).unwrap_or_else(|e| {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            })
        }
        None => Config::default(),
    };
    if let Some(filter) = args.filter {
        config.tracking.filter = filter;
    }
    if let Some(rate) = args.refresh_rate {
        config.tracking.refresh_rate = rate;
    }
    config.validate()?;

    let Some(still) = args.still else {
        anyhow::bail!("--still <IMAGE> is required unless --dump-config is given");
    };

    let classifier = Arc::new(GeminiClassifier::new(&config.classifier)?);
    let camera = Arc::new(StillImageCamera::new(still));
    let clock = IntervalFrameClock::new(config.tracking.refresh_rate);
    let mut control = MirrorControl::mount(config, camera, classifier, clock)?;

    let trace = args.trace;
    let tracker = control
        .init_tracker(async move {
            let path = trace.ok_or_else(|| Error::TrackerUnavailable("no landmark trace given".to_string()))?;
            let source: Box<dyn LandmarkSource> = Box::new(ReplayLandmarkSource::from_file(path)?);
            Ok(source)
        })
        .await;
    if let Err(e) = tracker {
        warn!("Continuing without pose tracking: {}", e);
    }

    if let Err(e) = control.setup_camera().await {
        warn!("Camera unavailable: {}", e);
    }

    let mut auras = control.subscribe_aura();
    let aura_log = tokio::spawn(async move {
        while auras.changed().await.is_ok() {
            if let Some(aura) = auras.borrow().clone() {
                info!("Aura: {} ({}) tint {}", aura.mood, aura.color, tint(Some(&aura)));
            }
        }
    });

    if args.analyze {
        match control.press() {
            Ok(flight) => info!("Aura outcome: {:?}", flight.await?),
            Err(reason) => warn!("Aura analysis not started: {:?}", reason),
        }
        control.release();
    }

    tokio::select! {
        () = tokio::time::sleep(Duration::from_secs(args.duration)) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Exit requested by user");
        }
    }

    let snapshot = *control.subscribe_poses().borrow();
    let transform = control.surface_transform();
    info!(
        "Final pose: pitch={:.2} yaw={:.2} roll={:.2} scale={:.3} fps={} label={}",
        transform.rotate_x,
        transform.rotate_y,
        transform.rotate_z,
        transform.scale,
        snapshot.diagnostics.fps,
        status_label(&control.session_state())
    );

    control.teardown().await;
    drop(control);
    aura_log.abort();

    Ok(())
}
