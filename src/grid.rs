use crate::foundation::core::{Canvas, TileId, TileSpec};
use crate::foundation::error::{TileError, TileResult};

/// Tile grid for one canvas and tile size: `rows = ceil(H / th)`, `cols = ceil(W / tw)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct GridPlan {
    pub rows: u32,
    pub cols: u32,
    pub canvas: Canvas,
    pub tile: TileSpec,
}

/// Non-blocking layout hints. The caller decides whether to continue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridAdvisory {
    /// One row, several columns: the tile is at least as tall as the canvas.
    SingleRow,
    /// One column, several rows: the tile is at least as wide as the canvas.
    SingleColumn,
    /// The tile covers the whole canvas.
    SingleTile,
}

impl GridPlan {
    pub fn plan(canvas: Canvas, tile: TileSpec) -> TileResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(TileError::config(format!(
                "canvas must be non-empty, got {}x{}",
                canvas.width, canvas.height
            )));
        }
        let tile = TileSpec::new(tile.width, tile.height)?;
        Ok(Self {
            rows: canvas.height.div_ceil(tile.height),
            cols: canvas.width.div_ceil(tile.width),
            canvas,
            tile,
        })
    }

    pub fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = TileId> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| TileId::new(row, col)))
    }

    pub fn advisories(&self) -> Vec<GridAdvisory> {
        match (self.rows, self.cols) {
            (1, 1) => vec![GridAdvisory::SingleTile],
            (1, _) => vec![GridAdvisory::SingleRow],
            (_, 1) => vec![GridAdvisory::SingleColumn],
            _ => Vec::new(),
        }
    }

    /// Human-readable advisory text with a suggested tile size.
    pub fn describe(&self, advisory: GridAdvisory) -> String {
        let Canvas { width, height } = self.canvas;
        let TileSpec {
            width: tw,
            height: th,
        } = self.tile;
        match advisory {
            GridAdvisory::SingleRow => format!(
                "tile height {th} covers the {height}px canvas: only one row of {} tiles; \
                 try a tile height of {} or less",
                self.cols,
                (height / 2).max(1)
            ),
            GridAdvisory::SingleColumn => format!(
                "tile width {tw} covers the {width}px canvas: only one column of {} tiles; \
                 try a tile width of {} or less",
                self.rows,
                (width / 2).max(1)
            ),
            GridAdvisory::SingleTile => format!(
                "tile {tw}x{th} covers the whole {width}x{height} canvas: a single tile; \
                 try {}x{} or less",
                (width / 2).max(1),
                (height / 2).max(1)
            ),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/grid.rs"]
mod tests;
