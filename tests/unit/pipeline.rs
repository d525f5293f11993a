use std::ffi::OsString;

use super::*;
use crate::fps::FpsSource;
use crate::tile::Tile;
use crate::tools::ToolOutput;

struct NoTools;

impl Toolchain for NoTools {
    fn run(&self, program: &str, _args: &[OsString]) -> TileResult<ToolOutput> {
        Err(TileError::Other(anyhow::anyhow!("{program} not installed")))
    }
}

struct TouchEncoder;

impl TileEncoder for TouchEncoder {
    fn extension(&self) -> &str {
        "bin"
    }

    fn encode(&self, _tile: &Tile, _fps: f64, out_path: &Path) -> TileResult<()> {
        std::fs::write(out_path, b"tile").map_err(|e| TileError::disk("writing", out_path, e))
    }
}

fn pipeline(config: TileConfig) -> TilePipeline {
    TilePipeline::with_parts(config, Arc::new(NoTools), Box::new(TouchEncoder)).unwrap()
}

fn png_dir(dir: &Path, frames: usize, w: u32, h: u32) {
    for i in 0..frames {
        image::RgbaImage::from_pixel(w, h, image::Rgba([i as u8, 0, 0, 255]))
            .save(dir.join(format!("{i}.png")))
            .unwrap();
    }
}

#[test]
fn explicit_duration_wins() {
    let dir = tempfile::tempdir().unwrap();
    png_dir(dir.path(), 1, 4, 4);
    let cfg = TileConfig {
        frame_duration_ms: Some(40),
        ..TileConfig::new(dir.path())
    };
    let plan = pipeline(cfg).plan().unwrap();
    assert_eq!(plan.timing.source, TimingSource::ExplicitDuration);
    assert!((plan.timing.fps - 25.0).abs() < 1e-9);
}

#[test]
fn explicit_fps_is_converted() {
    let dir = tempfile::tempdir().unwrap();
    png_dir(dir.path(), 1, 4, 4);
    let cfg = TileConfig {
        fps: Some(8.0),
        ..TileConfig::new(dir.path())
    };
    let plan = pipeline(cfg).plan().unwrap();
    assert_eq!(plan.timing.source, TimingSource::ExplicitFps);
    assert_eq!(plan.timing.frame_duration_ms, 125.0);
}

#[test]
fn directory_without_timing_uses_the_default_silently() {
    let dir = tempfile::tempdir().unwrap();
    png_dir(dir.path(), 2, 4, 4);
    let plan = pipeline(TileConfig::new(dir.path())).plan().unwrap();
    assert_eq!(plan.timing.source, TimingSource::Default);
    assert_eq!(plan.timing.frame_duration_ms, DEFAULT_FRAME_DURATION_MS);
    assert_eq!(plan.timing.fps, 5.0);
    assert!(plan.warnings.iter().all(|w| !w.contains("fps undetermined")));
}

#[test]
fn undetermined_fps_on_a_file_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]))
        .save(&path)
        .unwrap();
    let plan = pipeline(TileConfig::new(&path)).plan().unwrap();
    assert_eq!(plan.timing.source, TimingSource::Default);
    assert!(plan.warnings.iter().any(|w| w.contains("fps undetermined")));
}

#[test]
fn gif_delay_is_estimated_without_external_tools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("anim.gif");
    {
        let file = std::fs::File::create(&path).unwrap();
        let mut enc = image::codecs::gif::GifEncoder::new(file);
        enc.encode_frames((0..3).map(|i| {
            image::Frame::from_parts(
                image::RgbaImage::from_pixel(8, 8, image::Rgba([i * 80, 0, 0, 255])),
                0,
                0,
                image::Delay::from_numer_denom_ms(100, 1),
            )
        }))
        .unwrap();
    }
    let plan = pipeline(TileConfig::new(&path)).plan().unwrap();
    assert_eq!(plan.strategy, ExtractStrategy::ContainerFrames);
    assert_eq!(plan.frame_count, 3);
    assert_eq!(
        plan.timing.source,
        TimingSource::Estimated(FpsSource::DecoderFrameDelay)
    );
    assert!((plan.timing.frame_duration_ms - 100.0).abs() < 1e-9);
}

#[test]
fn plan_reports_grid_and_advisories() {
    let dir = tempfile::tempdir().unwrap();
    png_dir(dir.path(), 2, 100, 50);
    let cfg = TileConfig {
        tile_width: 40,
        tile_height: 40,
        ..TileConfig::new(dir.path())
    };
    let plan = pipeline(cfg).plan().unwrap();
    assert_eq!((plan.grid.rows, plan.grid.cols), (2, 3));
    assert_eq!(plan.canvas, Canvas::new(100, 50));
    assert!(plan.advisories.is_empty());

    let wide = TileConfig {
        tile_width: 40,
        tile_height: 64,
        ..TileConfig::new(dir.path())
    };
    let plan = pipeline(wide).plan().unwrap();
    assert_eq!(plan.advisories.len(), 1);
    assert_eq!(plan.advisories[0].0, GridAdvisory::SingleRow);
}

#[test]
fn base_name_override_names_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("walk");
    std::fs::create_dir(&input).unwrap();
    png_dir(&input, 1, 4, 4);
    let out = tempfile::tempdir().unwrap();

    let cfg = TileConfig {
        base_name: Some("hero".to_string()),
        output_root: out.path().to_path_buf(),
        ..TileConfig::new(&input)
    };
    let report = pipeline(cfg).run().unwrap();
    let dir_name = report.output_dir.file_name().unwrap().to_string_lossy().into_owned();
    assert!(dir_name.starts_with("hero_"), "{dir_name}");
    assert_eq!(report.artifacts.len(), 1);
    assert!(report.artifacts[0].path.ends_with("hero_Row1_Col1.bin"));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let cfg = TileConfig {
        tile_height: 0,
        ..TileConfig::new("anything")
    };
    let err = TilePipeline::with_parts(cfg, Arc::new(NoTools), Box::new(TouchEncoder))
        .err()
        .unwrap();
    assert!(matches!(err, TileError::InvalidConfiguration(_)));
}

#[test]
fn zero_threads_is_rejected() {
    assert!(build_thread_pool(Some(0)).is_err());
    assert!(build_thread_pool(Some(2)).is_ok());
}
