//! Run configuration.
//!
//! JSON-facing, `snake_case` keys. Every field has a default except the input path and whatever
//! the caller wants to change; [`TileConfig::validate`] runs before a pipeline is built.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::assets::extract::InputKind;
use crate::encode::EncoderOpts;
use crate::foundation::core::TileSpec;
use crate::foundation::error::{TileError, TileResult};
use crate::frame::DimensionPolicy;

/// Environment variable overriding the default output root.
pub const OUTPUT_ROOT_ENV: &str = "TILECAST_OUTPUT_ROOT";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TileConfig {
    pub input_path: PathBuf,
    /// Detected from the filesystem when unset.
    pub input_kind: Option<InputKind>,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Mutually exclusive with `fps`.
    pub frame_duration_ms: Option<u32>,
    pub fps: Option<f64>,
    pub dimension_validation: DimensionPolicy,
    pub output_root: PathBuf,
    /// Overrides the input-derived base name of the output directory and files.
    pub base_name: Option<String>,
    /// Fixed size SVG frames are rasterized at.
    pub svg_raster_size: RasterSize,
    /// Encode tiles on a worker pool instead of one at a time.
    pub parallel: bool,
    /// Worker count for `parallel`; rayon picks when unset.
    pub threads: Option<usize>,
    pub encoder: EncoderOpts,
    /// `exiftool` program name or path, used as the last FPS source.
    pub exiftool: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

impl Default for RasterSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl Default for TileConfig {
    fn default() -> Self {
        let preset = TilePreset::Telegram.size();
        Self {
            input_path: PathBuf::new(),
            input_kind: None,
            tile_width: preset.width,
            tile_height: preset.height,
            frame_duration_ms: None,
            fps: None,
            dimension_validation: DimensionPolicy::default(),
            output_root: default_output_root(),
            base_name: None,
            svg_raster_size: RasterSize::default(),
            parallel: false,
            threads: None,
            encoder: EncoderOpts::default(),
            exiftool: "exiftool".to_string(),
        }
    }
}

/// `$TILECAST_OUTPUT_ROOT` if set and non-empty, else `./tiles`.
pub fn default_output_root() -> PathBuf {
    std::env::var_os(OUTPUT_ROOT_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tiles"))
}

impl TileConfig {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            ..Self::default()
        }
    }

    pub fn from_reader<R: std::io::Read>(r: R) -> TileResult<Self> {
        serde_json::from_reader(r).map_err(|e| TileError::config(format!("parse config JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> TileResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TileError::config(format!("open config JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> TileResult<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(TileError::config("input_path is required"));
        }
        self.tile_spec()?;
        if self.frame_duration_ms.is_some() && self.fps.is_some() {
            return Err(TileError::config(
                "set either frame_duration_ms or fps, not both",
            ));
        }
        if self.frame_duration_ms == Some(0) {
            return Err(TileError::config("frame_duration_ms must be > 0"));
        }
        if let Some(fps) = self.fps
            && (!fps.is_finite() || fps <= 0.0)
        {
            return Err(TileError::config(format!("fps must be > 0, got {fps}")));
        }
        let RasterSize { width, height } = self.svg_raster_size;
        if width == 0 || height == 0 {
            return Err(TileError::config(format!(
                "svg_raster_size must be positive, got {width}x{height}"
            )));
        }
        if self.threads == Some(0) {
            return Err(TileError::config("threads must be >= 1 when set"));
        }
        if let Some(name) = &self.base_name
            && (name.trim().is_empty() || name.contains(['/', '\\']))
        {
            return Err(TileError::config(format!(
                "base_name must be a non-empty file name, got '{name}'"
            )));
        }
        if self.encoder.ffmpeg.trim().is_empty() {
            return Err(TileError::config("encoder.ffmpeg must not be empty"));
        }
        Ok(())
    }

    pub fn tile_spec(&self) -> TileResult<TileSpec> {
        TileSpec::new(self.tile_width, self.tile_height)
    }

    pub fn with_tile_preset(mut self, preset: TilePreset) -> Self {
        let TileSpec { width, height } = preset.size();
        self.tile_width = width;
        self.tile_height = height;
        self
    }

    /// Selects a duration preset, clearing any explicit fps.
    pub fn with_duration_preset(mut self, preset: DurationPreset) -> Self {
        self.frame_duration_ms = Some(preset.duration_ms());
        self.fps = None;
        self
    }
}

/// Named frame durations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPreset {
    Fast,
    Medium,
    Slow,
}

impl DurationPreset {
    pub fn duration_ms(self) -> u32 {
        match self {
            Self::Fast => 100,
            Self::Medium => 200,
            Self::Slow => 500,
        }
    }
}

/// Named square tile sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TilePreset {
    /// 100x100, the sticker/emoji size.
    Telegram,
    Small,
    Medium,
    Large,
    Hd,
}

impl TilePreset {
    pub fn size(self) -> TileSpec {
        let side = match self {
            Self::Telegram => 100,
            Self::Small => 64,
            Self::Medium => 256,
            Self::Large => 512,
            Self::Hd => 1024,
        };
        TileSpec {
            width: side,
            height: side,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
