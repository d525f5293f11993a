use std::fmt::Write as _;
use std::path::PathBuf;

use crate::foundation::core::TileId;
use crate::grid::GridPlan;

/// One tile's output file and whether its encode succeeded.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub row: u32,
    pub col: u32,
    pub encode_succeeded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TileFailure {
    pub row: u32,
    pub col: u32,
    pub error: String,
}

/// Outcome of a run. Partial success is a normal result.
#[derive(Clone, Debug, serde::Serialize)]
pub struct BatchReport {
    pub output_dir: PathBuf,
    pub grid: GridPlan,
    pub fps: f64,
    pub frame_duration_ms: f64,
    pub frame_count: usize,
    pub total_tiles: usize,
    pub succeeded: usize,
    /// Row-major.
    pub failed: Vec<TileFailure>,
    /// Row-major, one per attempted tile.
    pub artifacts: Vec<OutputArtifact>,
    pub warnings: Vec<String>,
    pub cancelled: bool,
    /// Tiles attempted before the run stopped (all of them unless cancelled).
    pub completed: usize,
}

impl BatchReport {
    pub fn is_complete_success(&self) -> bool {
        !self.cancelled && self.failed.is_empty() && self.succeeded == self.total_tiles
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(
            s,
            "{} tiles ({}x{} grid of {}x{}) from {} frames at {:.3} fps",
            self.total_tiles,
            self.grid.rows,
            self.grid.cols,
            self.grid.tile.width,
            self.grid.tile.height,
            self.frame_count,
            self.fps
        );
        let _ = writeln!(
            s,
            "succeeded: {}, failed: {}",
            self.succeeded,
            self.failed.len()
        );
        if self.cancelled {
            let _ = writeln!(
                s,
                "cancelled after {} of {} tiles",
                self.completed, self.total_tiles
            );
        }
        for f in &self.failed {
            let _ = writeln!(
                s,
                "  failed {}: {}",
                TileId::new(f.row, f.col),
                f.error
            );
        }
        for w in &self.warnings {
            let _ = writeln!(s, "  warning: {w}");
        }
        let _ = write!(s, "output: {}", self.output_dir.display());
        s
    }
}

#[cfg(test)]
#[path = "../tests/unit/report.rs"]
mod tests;
