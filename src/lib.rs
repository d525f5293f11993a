#![forbid(unsafe_code)]
//! Split an animation into a grid of fixed-size, alpha-preserving animated tiles.
//!
//! [`TilePipeline`] drives the whole run: it normalizes the input into a [`FrameSequence`],
//! resolves the playback rate, plans a [`GridPlan`], then crops and encodes every tile and
//! returns a [`BatchReport`].

pub mod assets;
pub mod config;
pub mod encode;
pub mod events;
pub mod foundation;
pub mod fps;
pub mod frame;
pub mod grid;
pub mod pipeline;
pub mod report;
pub mod tile;
pub mod tools;

pub use assets::extract::{AnimationSource, ExtractStrategy, FrameExtractor, InputKind};
pub use assets::natural_sort::natural_cmp;
pub use config::{DurationPreset, TileConfig, TilePreset};
pub use encode::{EncoderOpts, FfmpegTileEncoder, TileEncoder};
pub use events::{CancelToken, ProgressEvent, TimingSource};
pub use foundation::core::{Canvas, Region, TileId, TileSpec};
pub use foundation::error::{TileError, TileResult};
pub use fps::{FpsEstimate, FpsEstimator, FpsSource};
pub use frame::{DimensionPolicy, Frame, FrameSequence};
pub use grid::{GridAdvisory, GridPlan};
pub use pipeline::{RunPlan, TilePipeline, Timing};
pub use report::{BatchReport, OutputArtifact, TileFailure};
pub use tile::Tile;
pub use tools::{SystemToolchain, ToolOutput, Toolchain};
