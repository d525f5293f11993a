//! Progress events and cooperative cancellation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::assets::extract::ExtractStrategy;
use crate::foundation::core::{Canvas, TileId};
use crate::fps::FpsSource;
use crate::grid::GridAdvisory;

/// Where the frame duration of a run came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingSource {
    ExplicitDuration,
    ExplicitFps,
    Estimated(FpsSource),
    FrameMetadata,
    Default,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Extracted {
        strategy: ExtractStrategy,
        frames: usize,
        canvas: Canvas,
    },
    FpsResolved {
        fps: f64,
        frame_duration_ms: f64,
        source: TimingSource,
    },
    GridPlanned {
        rows: u32,
        cols: u32,
        output_dir: PathBuf,
    },
    Advisory {
        advisory: GridAdvisory,
        message: String,
    },
    TileStarted {
        tile: TileId,
    },
    TileFinished {
        tile: TileId,
        succeeded: bool,
        error: Option<String>,
    },
    Cancelled {
        completed: usize,
        total: usize,
    },
    Finished {
        succeeded: usize,
        failed: usize,
        total: usize,
    },
}

/// Optional event channel. A dropped receiver is not an error.
#[derive(Clone, Copy, Default)]
pub(crate) struct Emitter<'a> {
    tx: Option<&'a Sender<ProgressEvent>>,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(tx: Option<&'a Sender<ProgressEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Shared stop flag, checked before each tile is dispatched.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
