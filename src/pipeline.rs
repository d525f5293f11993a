//! Run orchestration: resolve, extract, time, plan, then crop and encode every tile.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use rayon::prelude::*;

use crate::assets::extract::{
    AnimationSource, ExtractOpts, ExtractStrategy, Extraction, FrameExtractor, InputKind,
};
use crate::config::TileConfig;
use crate::encode::{FfmpegTileEncoder, TileEncoder};
use crate::events::{CancelToken, Emitter, ProgressEvent, TimingSource};
use crate::foundation::core::{
    Canvas, DEFAULT_FRAME_DURATION_MS, TileId, duration_ms_to_fps, fps_to_duration_ms,
};
use crate::foundation::error::{TileError, TileResult};
use crate::fps::FpsEstimator;
use crate::frame::FrameSequence;
use crate::grid::{GridAdvisory, GridPlan};
use crate::report::{BatchReport, OutputArtifact, TileFailure};
use crate::tile::crop_tile;
use crate::tools::{SystemToolchain, Toolchain};

/// Resolved playback timing of a run.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Timing {
    pub fps: f64,
    pub frame_duration_ms: f64,
    pub source: TimingSource,
}

/// Everything known about a run before any tile is encoded.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RunPlan {
    pub input_path: PathBuf,
    pub input_kind: InputKind,
    pub base_name: String,
    pub strategy: ExtractStrategy,
    pub canvas: Canvas,
    pub frame_count: usize,
    pub timing: Timing,
    pub grid: GridPlan,
    pub advisories: Vec<(GridAdvisory, String)>,
    pub warnings: Vec<String>,
}

struct Prepared {
    source: AnimationSource,
    extraction: Extraction,
    timing: Timing,
    grid: GridPlan,
    advisories: Vec<(GridAdvisory, String)>,
    warnings: Vec<String>,
}

struct TileOutcome {
    id: TileId,
    path: PathBuf,
    result: TileResult<()>,
}

pub struct TilePipeline {
    config: TileConfig,
    tools: Arc<dyn Toolchain>,
    encoder: Box<dyn TileEncoder>,
}

impl TilePipeline {
    /// Pipeline using the system `ffmpeg`/`exiftool` and the VP9 WebM encoder.
    pub fn new(config: TileConfig) -> TileResult<Self> {
        let tools: Arc<dyn Toolchain> = Arc::new(SystemToolchain);
        let encoder = Box::new(FfmpegTileEncoder::new(tools.clone(), config.encoder.clone()));
        Self::with_parts(config, tools, encoder)
    }

    pub fn with_parts(
        config: TileConfig,
        tools: Arc<dyn Toolchain>,
        encoder: Box<dyn TileEncoder>,
    ) -> TileResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tools,
            encoder,
        })
    }

    pub fn config(&self) -> &TileConfig {
        &self.config
    }

    /// Extract, time and plan without writing anything.
    pub fn plan(&self) -> TileResult<RunPlan> {
        let p = self.prepare(Emitter::default())?;
        Ok(RunPlan {
            input_path: p.source.path.clone(),
            input_kind: p.source.kind,
            base_name: self.base_name(&p.source),
            strategy: p.extraction.strategy,
            canvas: p.extraction.sequence.canvas(),
            frame_count: p.extraction.sequence.len(),
            timing: p.timing,
            grid: p.grid,
            advisories: p.advisories,
            warnings: p.warnings,
        })
    }

    pub fn run(&self) -> TileResult<BatchReport> {
        self.run_with(&CancelToken::new(), None)
    }

    /// Run to completion, cancellation, or the first fatal error.
    ///
    /// Per-tile encode failures end up in the report. Tiles written before a fatal error or a
    /// cancel are left on disk.
    #[tracing::instrument(skip_all, fields(input = %self.config.input_path.display()))]
    pub fn run_with(
        &self,
        cancel: &CancelToken,
        events: Option<&Sender<ProgressEvent>>,
    ) -> TileResult<BatchReport> {
        let emitter = Emitter::new(events);
        let Prepared {
            source,
            mut extraction,
            timing,
            grid,
            warnings,
            ..
        } = self.prepare(emitter)?;

        let base_name = self.base_name(&source);
        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        let output_dir = self
            .config
            .output_root
            .join(format!("{base_name}_{stamp}"));

        let outcome = std::fs::create_dir_all(&output_dir)
            .map_err(|e| TileError::disk("creating output directory", &output_dir, e))
            .and_then(|()| {
                emitter.emit(ProgressEvent::GridPlanned {
                    rows: grid.rows,
                    cols: grid.cols,
                    output_dir: output_dir.clone(),
                });
                tracing::info!(
                    rows = grid.rows,
                    cols = grid.cols,
                    output_dir = %output_dir.display(),
                    "processing tiles"
                );
                self.process_tiles(
                    &extraction.sequence,
                    &grid,
                    timing.fps,
                    &output_dir,
                    &base_name,
                    cancel,
                    emitter,
                )
            });

        // Normalization scratch goes away whatever happened to the tiles.
        let released = extraction.release_scratch();
        let mut outcomes = outcome?;
        released?;

        let fatal = outcomes
            .iter()
            .position(|o| o.result.as_ref().is_err_and(TileError::is_fatal));
        if let Some(i) = fatal
            && let Err(e) = outcomes.swap_remove(i).result
        {
            tracing::error!(error = %e, "aborting run");
            return Err(e);
        }

        outcomes.sort_by_key(|o| o.id);
        let total_tiles = grid.len();
        let completed = outcomes.len();
        let cancelled = cancel.is_cancelled() && completed < total_tiles;

        let mut failed = Vec::new();
        let mut artifacts = Vec::with_capacity(completed);
        for o in &outcomes {
            if let Err(e) = &o.result {
                failed.push(TileFailure {
                    row: o.id.row,
                    col: o.id.col,
                    error: e.to_string(),
                });
            }
            artifacts.push(OutputArtifact {
                path: o.path.clone(),
                row: o.id.row,
                col: o.id.col,
                encode_succeeded: o.result.is_ok(),
            });
        }
        let succeeded = completed - failed.len();

        if cancelled {
            tracing::warn!(completed, total_tiles, "run cancelled");
            emitter.emit(ProgressEvent::Cancelled {
                completed,
                total: total_tiles,
            });
        }
        emitter.emit(ProgressEvent::Finished {
            succeeded,
            failed: failed.len(),
            total: total_tiles,
        });
        tracing::info!(succeeded, failed = failed.len(), total_tiles, "run finished");

        Ok(BatchReport {
            output_dir,
            grid,
            fps: timing.fps,
            frame_duration_ms: timing.frame_duration_ms,
            frame_count: extraction.sequence.len(),
            total_tiles,
            succeeded,
            failed,
            artifacts,
            warnings,
            cancelled,
            completed,
        })
    }

    fn prepare(&self, emitter: Emitter<'_>) -> TileResult<Prepared> {
        let source =
            AnimationSource::resolve(self.config.input_path.clone(), self.config.input_kind)?;
        let tile = self.config.tile_spec()?;

        let extractor = FrameExtractor::new(
            self.tools.clone(),
            ExtractOpts {
                policy: self.config.dimension_validation,
                svg_width: self.config.svg_raster_size.width,
                svg_height: self.config.svg_raster_size.height,
                ffmpeg: self.config.encoder.ffmpeg.clone(),
            },
        );
        let extraction = extractor.extract(&source)?;
        let mut warnings = extraction.warnings.clone();
        emitter.emit(ProgressEvent::Extracted {
            strategy: extraction.strategy,
            frames: extraction.sequence.len(),
            canvas: extraction.sequence.canvas(),
        });

        let timing = self.resolve_timing(&source, &extraction.sequence, &mut warnings)?;
        emitter.emit(ProgressEvent::FpsResolved {
            fps: timing.fps,
            frame_duration_ms: timing.frame_duration_ms,
            source: timing.source,
        });

        let grid = GridPlan::plan(extraction.sequence.canvas(), tile)?;
        let mut advisories = Vec::new();
        for advisory in grid.advisories() {
            let message = grid.describe(advisory);
            tracing::warn!(?advisory, "{message}");
            emitter.emit(ProgressEvent::Advisory {
                advisory,
                message: message.clone(),
            });
            warnings.push(message.clone());
            advisories.push((advisory, message));
        }

        Ok(Prepared {
            source,
            extraction,
            timing,
            grid,
            advisories,
            warnings,
        })
    }

    /// Explicit duration, explicit fps, estimate (files only), first-frame delay, then the
    /// default.
    fn resolve_timing(
        &self,
        source: &AnimationSource,
        sequence: &FrameSequence,
        warnings: &mut Vec<String>,
    ) -> TileResult<Timing> {
        if let Some(ms) = self.config.frame_duration_ms {
            let ms = f64::from(ms);
            return Ok(Timing {
                fps: duration_ms_to_fps(ms)?,
                frame_duration_ms: ms,
                source: TimingSource::ExplicitDuration,
            });
        }
        if let Some(fps) = self.config.fps {
            return Ok(Timing {
                fps,
                frame_duration_ms: fps_to_duration_ms(fps)?,
                source: TimingSource::ExplicitFps,
            });
        }

        if source.kind == InputKind::File {
            let estimator = FpsEstimator::new(self.tools.clone())
                .with_programs(&self.config.encoder.ffmpeg, &self.config.exiftool);
            match estimator.estimate(&source.path) {
                Some(est) => {
                    return Ok(Timing {
                        fps: est.fps,
                        frame_duration_ms: fps_to_duration_ms(est.fps)?,
                        source: TimingSource::Estimated(est.source),
                    });
                }
                None => {
                    let msg = TileError::FpsUndetermined(source.path.clone()).to_string();
                    tracing::warn!("{msg}; falling back");
                    warnings.push(msg);
                }
            }
        }

        if let Some(ms) = sequence.first().duration_ms {
            return Ok(Timing {
                fps: duration_ms_to_fps(ms)?,
                frame_duration_ms: ms,
                source: TimingSource::FrameMetadata,
            });
        }

        Ok(Timing {
            fps: duration_ms_to_fps(DEFAULT_FRAME_DURATION_MS)?,
            frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
            source: TimingSource::Default,
        })
    }

    fn base_name(&self, source: &AnimationSource) -> String {
        self.config
            .base_name
            .clone()
            .unwrap_or_else(|| source.base_name())
    }

    #[allow(clippy::too_many_arguments)]
    fn process_tiles(
        &self,
        sequence: &FrameSequence,
        grid: &GridPlan,
        fps: f64,
        output_dir: &Path,
        base_name: &str,
        cancel: &CancelToken,
        emitter: Emitter<'_>,
    ) -> TileResult<Vec<TileOutcome>> {
        let abort = AtomicBool::new(false);
        let process = |id: TileId| -> Option<TileOutcome> {
            if cancel.is_cancelled() || abort.load(Ordering::SeqCst) {
                return None;
            }
            emitter.emit(ProgressEvent::TileStarted { tile: id });
            let path = output_dir.join(id.file_name(base_name, self.encoder.extension()));
            let result = crop_tile(sequence, grid, id)
                .and_then(|tile| self.encoder.encode(&tile, fps, &path));

            match &result {
                Ok(()) => tracing::info!(tile = %id, "tile encoded"),
                Err(e) if e.is_fatal() => {
                    abort.store(true, Ordering::SeqCst);
                    tracing::error!(tile = %id, error = %e, "tile failed fatally");
                }
                Err(e) => tracing::warn!(tile = %id, error = %e, "tile failed"),
            }
            emitter.emit(ProgressEvent::TileFinished {
                tile: id,
                succeeded: result.is_ok(),
                error: result.as_ref().err().map(ToString::to_string),
            });
            Some(TileOutcome { id, path, result })
        };

        let cells: Vec<TileId> = grid.cells().collect();
        if !self.config.parallel {
            return Ok(cells.into_iter().map_while(process).collect());
        }

        let pool = build_thread_pool(self.config.threads)?;
        let outcomes = pool.install(|| {
            cells
                .par_iter()
                .map(|id| process(*id))
                .collect::<Vec<_>>()
        });
        Ok(outcomes.into_iter().flatten().collect())
    }
}

fn build_thread_pool(threads: Option<usize>) -> TileResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(TileError::config("'threads' must be >= 1 when set"));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("tilecast-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TileError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
