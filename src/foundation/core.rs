use std::fmt;

use crate::foundation::error::{TileError, TileResult};

/// Frame duration used when nothing else determines the playback rate (5 fps).
pub const DEFAULT_FRAME_DURATION_MS: f64 = 200.0;

/// Full-resolution area of the source animation in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned pixel rectangle, `[x, x + width) x [y, y + height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Requested tile size in pixels. Both sides are non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileSpec {
    pub width: u32,
    pub height: u32,
}

impl TileSpec {
    pub fn new(width: u32, height: u32) -> TileResult<Self> {
        if width == 0 || height == 0 {
            return Err(TileError::config(format!(
                "tile size must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Dimensions handed to the encoder: each side rounded up to the next even number.
    ///
    /// `yuva420p` needs even sides. This never changes the logical tile size.
    pub fn encode_dimensions(self) -> (u32, u32) {
        (self.width.next_multiple_of(2), self.height.next_multiple_of(2))
    }
}

/// Zero-based grid cell address.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TileId {
    pub row: u32,
    pub col: u32,
}

impl TileId {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// `{base}_Row{row+1}_Col{col+1}.{ext}`
    pub fn file_name(self, base_name: &str, ext: &str) -> String {
        format!("{base_name}_{self}.{ext}")
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row{}_Col{}", self.row + 1, self.col + 1)
    }
}

/// Playback rate for a frame duration in milliseconds.
pub fn duration_ms_to_fps(duration_ms: f64) -> TileResult<f64> {
    if !duration_ms.is_finite() || duration_ms <= 0.0 {
        return Err(TileError::config(format!(
            "frame duration must be positive, got {duration_ms}ms"
        )));
    }
    Ok(1000.0 / duration_ms)
}

/// Frame duration in milliseconds for a playback rate.
pub fn fps_to_duration_ms(fps: f64) -> TileResult<f64> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(TileError::config(format!("fps must be positive, got {fps}")));
    }
    Ok(1000.0 / fps)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
