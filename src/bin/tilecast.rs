use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tilecast::{
    CancelToken, DimensionPolicy, DurationPreset, FpsEstimator, InputKind, ProgressEvent,
    SystemToolchain, TileConfig, TilePipeline, TilePreset, Toolchain,
};

#[derive(Parser, Debug)]
#[command(name = "tilecast", version, about = "Split an animation into a grid of animated tiles")]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, tile and encode every tile (requires `ffmpeg` on PATH).
    Split(SplitArgs),
    /// Show the canvas, frame count, timing and grid without encoding.
    Plan(PlanArgs),
    /// Estimate the frame rate of a file and report which source found it.
    EstimateFps(EstimateArgs),
}

#[derive(Args, Debug)]
struct SplitArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Print the batch report as JSON on stdout instead of the text summary.
    #[arg(long)]
    report_json: bool,

    /// Exit with status 2 when any tile fails.
    #[arg(long)]
    fail_on_partial: bool,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Print the plan as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    /// Animation or video file.
    file: PathBuf,

    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,

    #[arg(long, default_value = "exiftool")]
    exiftool: String,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Animated file, or a directory of numbered frames.
    input: PathBuf,

    /// JSON config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    input_kind: Option<KindChoice>,

    #[arg(long, value_enum)]
    tile_preset: Option<TilePresetChoice>,

    #[arg(long)]
    tile_width: Option<u32>,

    #[arg(long)]
    tile_height: Option<u32>,

    #[arg(long, value_enum, conflicts_with_all = ["frame_duration_ms", "fps"])]
    duration_preset: Option<DurationChoice>,

    /// Frame duration in milliseconds.
    #[arg(long, conflicts_with = "fps")]
    frame_duration_ms: Option<u32>,

    #[arg(long)]
    fps: Option<f64>,

    /// Fail on frames whose size differs from the first frame instead of padding them.
    #[arg(long)]
    strict: bool,

    /// Output root (default: $TILECAST_OUTPUT_ROOT or ./tiles).
    #[arg(long)]
    output_root: Option<PathBuf>,

    #[arg(long)]
    base_name: Option<String>,

    /// SVG rasterization width.
    #[arg(long)]
    svg_width: Option<u32>,

    /// SVG rasterization height.
    #[arg(long)]
    svg_height: Option<u32>,

    /// Encode tiles in parallel.
    #[arg(long)]
    parallel: bool,

    #[arg(long, requires = "parallel")]
    threads: Option<usize>,

    #[arg(long)]
    ffmpeg: Option<String>,

    #[arg(long)]
    exiftool: Option<String>,

    /// Video bitrate, e.g. 2M.
    #[arg(long)]
    bitrate: Option<String>,

    /// Fail tiles whose output file already exists.
    #[arg(long)]
    no_overwrite: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    File,
    Directory,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TilePresetChoice {
    Telegram,
    Small,
    Medium,
    Large,
    Hd,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DurationChoice {
    Fast,
    Medium,
    Slow,
}

impl InputArgs {
    fn into_config(self) -> anyhow::Result<TileConfig> {
        let mut cfg = match &self.config {
            Some(path) => TileConfig::from_path(path)?,
            None => TileConfig::default(),
        };
        cfg.input_path = self.input;

        if let Some(kind) = self.input_kind {
            cfg.input_kind = Some(match kind {
                KindChoice::File => InputKind::File,
                KindChoice::Directory => InputKind::Directory,
            });
        }
        if let Some(preset) = self.tile_preset {
            cfg = cfg.with_tile_preset(match preset {
                TilePresetChoice::Telegram => TilePreset::Telegram,
                TilePresetChoice::Small => TilePreset::Small,
                TilePresetChoice::Medium => TilePreset::Medium,
                TilePresetChoice::Large => TilePreset::Large,
                TilePresetChoice::Hd => TilePreset::Hd,
            });
        }
        if let Some(w) = self.tile_width {
            cfg.tile_width = w;
        }
        if let Some(h) = self.tile_height {
            cfg.tile_height = h;
        }

        if let Some(preset) = self.duration_preset {
            cfg = cfg.with_duration_preset(match preset {
                DurationChoice::Fast => DurationPreset::Fast,
                DurationChoice::Medium => DurationPreset::Medium,
                DurationChoice::Slow => DurationPreset::Slow,
            });
        }
        if let Some(ms) = self.frame_duration_ms {
            cfg.frame_duration_ms = Some(ms);
            cfg.fps = None;
        }
        if let Some(fps) = self.fps {
            cfg.fps = Some(fps);
            cfg.frame_duration_ms = None;
        }

        if self.strict {
            cfg.dimension_validation = DimensionPolicy::Strict;
        }
        if let Some(root) = self.output_root {
            cfg.output_root = root;
        }
        if self.base_name.is_some() {
            cfg.base_name = self.base_name;
        }
        if let Some(w) = self.svg_width {
            cfg.svg_raster_size.width = w;
        }
        if let Some(h) = self.svg_height {
            cfg.svg_raster_size.height = h;
        }
        if self.parallel {
            cfg.parallel = true;
        }
        if self.threads.is_some() {
            cfg.threads = self.threads;
        }
        if let Some(ffmpeg) = self.ffmpeg {
            cfg.encoder.ffmpeg = ffmpeg;
        }
        if let Some(exiftool) = self.exiftool {
            cfg.exiftool = exiftool;
        }
        if let Some(bitrate) = self.bitrate {
            cfg.encoder.bitrate = bitrate;
        }
        if self.no_overwrite {
            cfg.encoder.overwrite = false;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);
    match cli.cmd {
        Command::Split(args) => cmd_split(args),
        Command::Plan(args) => cmd_plan(args),
        Command::EstimateFps(args) => cmd_estimate_fps(args),
    }
}

fn init_logging(verbose: bool, json: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

fn cmd_split(args: SplitArgs) -> anyhow::Result<ExitCode> {
    let cfg = args.input.into_config()?;
    if !SystemToolchain.is_available(&cfg.encoder.ffmpeg) {
        tracing::warn!(
            ffmpeg = %cfg.encoder.ffmpeg,
            "ffmpeg did not run; every tile encode will fail"
        );
    }
    let pipeline = TilePipeline::new(cfg)?;

    let (tx, rx) = std::sync::mpsc::channel::<ProgressEvent>();
    let cancel = CancelToken::new();
    let report = std::thread::scope(|s| {
        s.spawn(move || {
            for event in rx {
                if let ProgressEvent::TileFinished {
                    tile,
                    succeeded,
                    error,
                } = event
                {
                    match error {
                        Some(e) if !succeeded => eprintln!("tile {tile} failed: {e}"),
                        _ => eprintln!("tile {tile} done"),
                    }
                }
            }
        });
        let report = pipeline.run_with(&cancel, Some(&tx));
        drop(tx);
        report
    })?;

    if args.report_json {
        println!("{}", report.to_json().context("serialize batch report")?);
    } else {
        println!("{}", report.summary());
    }

    if args.fail_on_partial && !report.is_complete_success() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<ExitCode> {
    let cfg = args.input.into_config()?;
    let plan = TilePipeline::new(cfg)?.plan()?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("serialize plan")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    println!("input: {} ({:?})", plan.input_path.display(), plan.input_kind);
    println!("strategy: {:?}", plan.strategy);
    println!(
        "canvas: {}x{}, {} frames",
        plan.canvas.width, plan.canvas.height, plan.frame_count
    );
    println!(
        "timing: {:.3} fps ({:.3} ms/frame, {:?})",
        plan.timing.fps, plan.timing.frame_duration_ms, plan.timing.source
    );
    println!(
        "grid: {} rows x {} cols of {}x{} = {} tiles",
        plan.grid.rows,
        plan.grid.cols,
        plan.grid.tile.width,
        plan.grid.tile.height,
        plan.grid.len()
    );
    for (_, message) in &plan.advisories {
        println!("advisory: {message}");
    }
    for w in &plan.warnings {
        if !plan.advisories.iter().any(|(_, m)| m == w) {
            println!("warning: {w}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_estimate_fps(args: EstimateArgs) -> anyhow::Result<ExitCode> {
    anyhow::ensure!(
        args.file.is_file(),
        "not a file: '{}'",
        args.file.display()
    );
    let estimator =
        FpsEstimator::new(Arc::new(SystemToolchain)).with_programs(args.ffmpeg, args.exiftool);
    match estimator.estimate(&args.file) {
        Some(est) => {
            println!("{} fps ({:?})", est.fps, est.source);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("undetermined");
            Ok(ExitCode::FAILURE)
        }
    }
}
