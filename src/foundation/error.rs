use std::path::PathBuf;

use crate::foundation::core::TileId;

pub type TileResult<T> = Result<T, TileError>;

/// Failure categories of a tiling run.
///
/// Everything except [`TileError::EncodeFailure`] and [`TileError::FpsUndetermined`] aborts the
/// run; see [`TileError::is_fatal`].
#[derive(thiserror::Error, Debug)]
pub enum TileError {
    #[error("input not found: '{}'", .0.display())]
    InputNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unsupported format: '{}': {detail}", path.display())]
    UnsupportedFormat { path: PathBuf, detail: String },

    #[error(
        "dimension mismatch: frame {index} is {got_width}x{got_height}, expected {width}x{height}"
    )]
    DimensionMismatch {
        index: usize,
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },

    #[error("fps undetermined for '{}'", .0.display())]
    FpsUndetermined(PathBuf),

    #[error("encode failed for tile {tile}: {detail}")]
    EncodeFailure { tile: TileId, detail: String },

    #[error("disk i/o failure while {stage} '{}': {source}", path.display())]
    DiskIo {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TileError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn unsupported(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn encode(tile: TileId, detail: impl Into<String>) -> Self {
        Self::EncodeFailure {
            tile,
            detail: detail.into(),
        }
    }

    pub fn disk(stage: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DiskIo {
            stage,
            path: path.into(),
            source,
        }
    }

    /// Whether this error stops the whole run rather than a single tile.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::EncodeFailure { .. } | Self::FpsUndetermined(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
