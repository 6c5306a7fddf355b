use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use replay_common::{BuildMode, HistoryAggregator, OutputKind, ReplayConfig, SnapshotStore};
use replay_visualizer::{FrameCompositor, Fonts, Mp4Presenter, NullPresenter, PngSequencePresenter, Presenter};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod app;
mod input;
mod logging;
mod playback;
mod timing;

use app::{ReplayApp, RunEnd, RunSummary};
use input::{EventSource, NoEvents, TerminalEvents};
use playback::{ExhaustReason, PlaybackController};
use timing::FrameLimiter;

/// Trainer build selector accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ModeArg {
    Release,
    Debug,
}

impl From<ModeArg> for BuildMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Release => BuildMode::Release,
            ModeArg::Debug => BuildMode::Debug,
        }
    }
}

/// Command-line arguments for the replay viewer. Each one overrides the config file.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional path to a replay.toml file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run directory holding constants.json and gen_<N>.json
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Trainer build whose default run directory is used (release or debug)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Generation id to start from
    #[arg(long)]
    start_generation: Option<u32>,

    /// Generation stride; must match the trainer's save interval
    #[arg(long)]
    gen_step: Option<u32>,

    /// Ticks per second
    #[arg(long)]
    tick_rate: Option<u32>,

    /// Run as fast as frames can be composed
    #[arg(long)]
    no_throttle: bool,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// TTF/OTF font used for panel text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Encode the replay to this MP4 file
    #[arg(long, conflicts_with = "png_dir")]
    mp4: Option<PathBuf>,

    /// Write every composed frame as a PNG into this directory
    #[arg(long)]
    png_dir: Option<PathBuf>,

    /// Start with the scatter legend hidden
    #[arg(long)]
    hide_legend: bool,

    /// Ignore the keyboard even when attached to a terminal
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

/// Folds command-line overrides into the loaded configuration.
fn apply_overrides(mut config: ReplayConfig, args: &Args) -> Result<ReplayConfig> {
    if let Some(dir) = &args.data_dir {
        config.playback.data_directory = Some(dir.clone());
    }
    if let Some(mode) = args.mode {
        config.playback.mode = mode.into();
    }
    if let Some(start) = args.start_generation {
        config.playback.start_generation = start;
    }
    if let Some(step) = args.gen_step {
        config.playback.gen_step = step;
    }
    if let Some(max_ticks) = args.max_ticks {
        config.playback.max_ticks = Some(max_ticks);
    }
    if let Some(rate) = args.tick_rate {
        config.display.tick_rate = rate;
    }
    if args.no_throttle {
        config.display.throttle = false;
    }
    if args.hide_legend {
        config.display.show_legend = false;
    }
    if let Some(font) = &args.font {
        config.display.font_path = Some(font.clone());
    }
    if let Some(path) = &args.mp4 {
        config.output.kind = OutputKind::Mp4;
        config.output.path = path.clone();
    } else if let Some(dir) = &args.png_dir {
        config.output.kind = OutputKind::Png;
        config.output.path = dir.clone();
    }
    if args.headless {
        config.input.interactive = Some(false);
    }

    config.validate()?;
    Ok(config)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger; RUST_LOG still takes precedence
    logging::init();

    info!("Starting NEAT Replay Viewer...");

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ReplayConfig::load(path)?
        }
        None => ReplayConfig::default(),
    };
    let config = apply_overrides(config, &args)?;

    let summary = run(&config)?;
    info!(
        "Replay finished after {} ticks ({} frames presented), last generation {} of {} shown",
        summary.ticks, summary.frames_presented, summary.last_generation, summary.generations_seen
    );
    match summary.end {
        RunEnd::Exhausted(ExhaustReason::Unreadable { generation, message }) => {
            error!("Stopped at unreadable generation {}", generation);
            anyhow::bail!("Generation {} could not be read: {}", generation, message)
        }
        RunEnd::Exhausted(ExhaustReason::EndOfRun { next }) => {
            info!("End of recorded run (no generation {})", next);
            Ok(())
        }
        RunEnd::Quit | RunEnd::TickLimit => Ok(()),
    }
}

/// Builds the loop context from `config` and plays the run.
fn run(config: &ReplayConfig) -> Result<RunSummary> {
    let data_dir = config.data_directory();
    info!("Run directory: {}", data_dir.display());
    let store = SnapshotStore::new(&data_dir);

    let constants = store
        .load_constants()
        .with_context(|| format!("Failed to load run constants from {}", data_dir.display()))?;
    info!(
        "Environment {}x{}, target radius {}",
        constants.env_width, constants.env_height, constants.target_radius
    );

    let fonts = Fonts::resolve(config.display.font_path.as_deref());

    let mut history = HistoryAggregator::new();
    let start = config.playback.start_generation;
    let playback = PlaybackController::start(store, start, config.playback.gen_step, &mut history)
        .with_context(|| format!("Failed to load starting generation {}", start))?;

    let compositor = FrameCompositor::new(constants, fonts);
    let layout = *compositor.layout();
    info!("Frame dimensions: {}x{}", layout.frame_width, layout.frame_height);

    let presenter: Box<dyn Presenter> = match config.output.kind {
        OutputKind::None => Box::new(NullPresenter::default()),
        OutputKind::Png => Box::new(PngSequencePresenter::create(&config.output.path)?),
        OutputKind::Mp4 => Box::new(Mp4Presenter::create(
            &config.output.path,
            layout.frame_width,
            layout.frame_height,
            config.display.tick_rate,
            format!("NEAT replay of {}", data_dir.display()),
        )?),
    };

    let interactive = config
        .input
        .interactive
        .unwrap_or_else(|| std::io::stdin().is_terminal());
    let events: Box<dyn EventSource> = if interactive {
        info!("Keys: q/Esc quit, Space/p pause, l legend");
        Box::new(TerminalEvents::enable()?)
    } else {
        Box::new(NoEvents)
    };

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("[{elapsed_precise}] {spinner} {msg}")?);
    progress.enable_steady_tick(Duration::from_millis(100));

    let limiter = FrameLimiter::new(config.display.tick_rate, config.display.throttle);
    let mut app = ReplayApp::new(
        playback,
        history,
        compositor,
        presenter,
        events,
        config.display.show_legend,
        limiter,
        config.playback.max_ticks,
        progress,
    );

    let started = Instant::now();
    let summary = app.run()?;
    // Restores the terminal before the summary is logged
    drop(app);
    info!("Played for {:.1}s", started.elapsed().as_secs_f32());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_run(dir: &std::path::Path) {
        fs::write(
            dir.join("constants.json"),
            r#"{"ENV_WIDTH": 400, "ENV_HEIGHT": 300, "TARGET_RADIUS": 8}"#,
        )
        .unwrap();
        fs::write(
            dir.join("gen_0.json"),
            r#"{"generation": 0, "avgRawFit": 0.5, "bestRawFit": 1.5, "champSpecies": 0,
                "replay": [{"rotation": 90, "rocketX": 20, "rocketY": 20, "targetX": 200, "targetY": 150}],
                "species": [{"id": 3, "members": [{"nodes": [{"id": 0, "type": 0}, {"id": 1, "type": 1}],
                    "connections": [{"inId": 0, "outId": 1, "weight": -1.0, "isEnabled": true}]}]}]}"#,
        )
        .unwrap();
    }

    #[test]
    fn overrides_take_precedence_over_config() {
        let args = Args {
            data_dir: Some(PathBuf::from("runs/a")),
            mode: Some(ModeArg::Debug),
            gen_step: Some(5),
            png_dir: Some(PathBuf::from("frames")),
            no_throttle: true,
            headless: true,
            ..Args::default()
        };
        let config = apply_overrides(ReplayConfig::default(), &args).unwrap();
        assert_eq!(config.data_directory(), PathBuf::from("runs/a"));
        assert_eq!(config.playback.mode, BuildMode::Debug);
        assert_eq!(config.playback.gen_step, 5);
        assert_eq!(config.output.kind, OutputKind::Png);
        assert!(!config.display.throttle);
        assert_eq!(config.input.interactive, Some(false));
    }

    #[test]
    fn mode_flag_accepts_only_known_builds() {
        let args = Args::try_parse_from(["neat-replay", "--mode", "debug"]).unwrap();
        assert_eq!(args.mode, Some(ModeArg::Debug));
        assert!(Args::try_parse_from(["neat-replay", "--mode", "profile"]).is_err());
    }

    #[test]
    fn zero_gen_step_is_rejected() {
        let args = Args { gen_step: Some(0), ..Args::default() };
        assert!(apply_overrides(ReplayConfig::default(), &args).is_err());
    }

    #[test]
    fn headless_run_to_end_of_data() {
        let dir = tempfile::tempdir().unwrap();
        write_run(dir.path());
        let frames = dir.path().join("frames");
        let args = Args {
            data_dir: Some(dir.path().to_path_buf()),
            png_dir: Some(frames.clone()),
            no_throttle: true,
            headless: true,
            ..Args::default()
        };
        let result = run_with_args(args);
        assert!(result.is_ok(), "Replay failed: {:?}", result);
        // one frame tick plus the tick that found no generation 20
        assert!(frames.join("frame_000000.png").exists());
        assert!(frames.join("frame_000001.png").exists());
    }

    #[test]
    fn missing_run_directory_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            data_dir: Some(dir.path().join("missing")),
            headless: true,
            ..Args::default()
        };
        assert!(run_with_args(args).is_err());
    }
}
