//! Cropping a frame sequence into fixed-size tiles, and putting tiles back together.

use crate::foundation::core::{Canvas, Region, TileId, TileSpec};
use crate::foundation::error::{TileError, TileResult};
use crate::frame::{Frame, FrameSequence};
use crate::grid::GridPlan;

/// One grid cell's frames, every frame exactly `tile.width x tile.height`.
#[derive(Clone, Debug)]
pub struct Tile {
    pub id: TileId,
    pub sequence: FrameSequence,
}

/// The part of the canvas covered by cell `id`, or `None` when the cell lies wholly outside it.
pub fn source_region(canvas: Canvas, tile: TileSpec, id: TileId) -> Option<Region> {
    let x = u64::from(id.col) * u64::from(tile.width);
    let y = u64::from(id.row) * u64::from(tile.height);
    if x >= u64::from(canvas.width) || y >= u64::from(canvas.height) {
        return None;
    }
    let x2 = (x + u64::from(tile.width)).min(u64::from(canvas.width));
    let y2 = (y + u64::from(tile.height)).min(u64::from(canvas.height));
    // All four values are bounded by the canvas, so they fit in u32.
    Some(Region {
        x: x as u32,
        y: y as u32,
        width: (x2 - x) as u32,
        height: (y2 - y) as u32,
    })
}

/// Crop one frame for cell `id`, padding edge tiles with transparent pixels.
pub fn crop_frame(frame: &Frame, tile: TileSpec, id: TileId) -> Frame {
    let canvas = Canvas::new(frame.width, frame.height);
    let mut out = Frame::transparent(frame.index, tile.width, tile.height);
    out.duration_ms = frame.duration_ms;
    if let Some(region) = source_region(canvas, tile, id) {
        frame.copy_region_to(region, &mut out, 0, 0);
    }
    out
}

/// Crop every frame of `sequence` for cell `id`.
pub fn crop_tile(sequence: &FrameSequence, grid: &GridPlan, id: TileId) -> TileResult<Tile> {
    if id.row >= grid.rows || id.col >= grid.cols {
        return Err(TileError::config(format!(
            "tile {id} is outside the {}x{} grid",
            grid.rows, grid.cols
        )));
    }
    let frames = sequence
        .frames()
        .iter()
        .map(|f| crop_frame(f, grid.tile, id))
        .collect();
    Ok(Tile {
        id,
        sequence: FrameSequence::uniform(frames)?,
    })
}

/// Place every tile at `(col * tw, row * th)` and clip to the grid's canvas.
///
/// Inverse of [`crop_tile`] over the covered region; padding is dropped.
pub fn recompose(tiles: &[Tile], grid: &GridPlan) -> TileResult<FrameSequence> {
    let Some(first) = tiles.first() else {
        return Err(TileError::Other(anyhow::anyhow!("no tiles to recompose")));
    };
    let len = first.sequence.len();
    let Canvas { width, height } = grid.canvas;

    let mut frames: Vec<Frame> = first
        .sequence
        .frames()
        .iter()
        .map(|f| {
            let mut canvas = Frame::transparent(f.index, width, height);
            canvas.duration_ms = f.duration_ms;
            canvas
        })
        .collect();

    for tile in tiles {
        if tile.sequence.len() != len {
            return Err(TileError::Other(anyhow::anyhow!(
                "tile {} has {} frames, expected {len}",
                tile.id,
                tile.sequence.len()
            )));
        }
        let Some(region) = source_region(grid.canvas, grid.tile, tile.id) else {
            continue;
        };
        for (src, dst) in tile.sequence.frames().iter().zip(frames.iter_mut()) {
            src.copy_region_to(
                Region::full(region.width, region.height),
                dst,
                region.x,
                region.y,
            );
        }
    }

    FrameSequence::uniform(frames)
}

#[cfg(test)]
#[path = "../tests/unit/tile.rs"]
mod tests;
