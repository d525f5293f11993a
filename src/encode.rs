//! Per-tile output encoding.

use std::path::Path;

use crate::foundation::error::TileResult;
use crate::tile::Tile;

pub mod ffmpeg;

pub use ffmpeg::{EncoderOpts, FfmpegTileEncoder};

/// Turns one tile into one animated artifact on disk.
///
/// Implementations must leave no scratch files behind on any exit path. A failure that only
/// affects this tile is a [`TileError::EncodeFailure`](crate::TileError::EncodeFailure).
pub trait TileEncoder: Send + Sync {
    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &str;

    fn encode(&self, tile: &Tile, fps: f64, out_path: &Path) -> TileResult<()>;
}
