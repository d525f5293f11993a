use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::decode::{decode_animation, decode_still, sniff_format};
use crate::assets::natural_sort::sort_paths;
use crate::assets::svg_raster::SvgRasterizer;
use crate::foundation::error::{TileError, TileResult};
use crate::frame::{DimensionPolicy, Frame, FrameSequence};
use crate::tools::{Toolchain, display_args};

/// Extensions treated as still frames when scanning a directory.
pub const STILL_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "gif", "tif", "tiff"];

/// Extensions treated as vector frames when scanning a directory.
pub const VECTOR_EXTENSIONS: &[&str] = &["svg"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    File,
    Directory,
}

/// The selected input. Immutable once resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationSource {
    pub path: PathBuf,
    pub kind: InputKind,
}

impl AnimationSource {
    /// Check that `path` exists and matches `kind` (detected from the filesystem when `None`).
    pub fn resolve(path: impl Into<PathBuf>, kind: Option<InputKind>) -> TileResult<Self> {
        let path = path.into();
        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TileError::InputNotFound(path));
            }
            Err(e) => return Err(TileError::disk("inspecting input", path, e)),
        };

        let actual = if meta.is_dir() {
            InputKind::Directory
        } else {
            InputKind::File
        };
        if let Some(expected) = kind
            && expected != actual
        {
            return Err(TileError::config(format!(
                "input '{}' is a {actual:?}, but input_kind is {expected:?}",
                path.display()
            )));
        }

        Ok(Self { path, kind: actual })
    }

    /// File stem for files, directory name for directories.
    pub fn base_name(&self) -> String {
        let name = match self.kind {
            InputKind::File => self.path.file_stem(),
            InputKind::Directory => self.path.file_name(),
        };
        name.map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "animation".to_string())
    }
}

/// Extraction strategies in declared priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractStrategy {
    /// Directory of raster images, one frame per file.
    StillSequence,
    /// Directory of SVG files rasterized at a fixed size.
    VectorSequence,
    /// Frame-by-frame decode of a single animated file.
    ContainerFrames,
    /// A single file read as one still image.
    StaticImage,
}

impl ExtractStrategy {
    pub const PRIORITY: [ExtractStrategy; 4] = [
        ExtractStrategy::StillSequence,
        ExtractStrategy::VectorSequence,
        ExtractStrategy::ContainerFrames,
        ExtractStrategy::StaticImage,
    ];

    fn applies_to(self, kind: InputKind) -> bool {
        match self {
            Self::StillSequence | Self::VectorSequence => kind == InputKind::Directory,
            Self::ContainerFrames | Self::StaticImage => kind == InputKind::File,
        }
    }
}

/// Result of a successful extraction.
///
/// Holds the scratch directory used to normalize the input (if any) until
/// [`Extraction::release_scratch`] or drop.
#[derive(Debug)]
pub struct Extraction {
    pub sequence: FrameSequence,
    pub strategy: ExtractStrategy,
    pub warnings: Vec<String>,
    scratch: Option<tempfile::TempDir>,
}

impl Extraction {
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|d| d.path())
    }

    /// Remove the normalization scratch directory now, reporting failures.
    pub fn release_scratch(&mut self) -> TileResult<()> {
        if let Some(dir) = self.scratch.take() {
            let path = dir.path().to_path_buf();
            dir.close()
                .map_err(|e| TileError::disk("removing scratch directory", path, e))?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ExtractOpts {
    pub policy: DimensionPolicy,
    pub svg_width: u32,
    pub svg_height: u32,
    pub ffmpeg: String,
}

impl Default for ExtractOpts {
    fn default() -> Self {
        Self {
            policy: DimensionPolicy::Lenient,
            svg_width: 1024,
            svg_height: 1024,
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

struct Attempt {
    frames: Vec<Frame>,
    scratch: Option<tempfile::TempDir>,
}

/// Normalizes any supported input into an ordered, uniform-size RGBA [`FrameSequence`].
pub struct FrameExtractor {
    tools: Arc<dyn Toolchain>,
    opts: ExtractOpts,
}

impl FrameExtractor {
    pub fn new(tools: Arc<dyn Toolchain>, opts: ExtractOpts) -> Self {
        Self { tools, opts }
    }

    #[tracing::instrument(skip(self, source), fields(path = %source.path.display()))]
    pub fn extract(&self, source: &AnimationSource) -> TileResult<Extraction> {
        if !source.path.exists() {
            return Err(TileError::InputNotFound(source.path.clone()));
        }

        let listing = match source.kind {
            InputKind::Directory => Some(list_dir(&source.path)?),
            InputKind::File => None,
        };

        let mut failures = Vec::new();
        for strategy in ExtractStrategy::PRIORITY {
            if !strategy.applies_to(source.kind) {
                continue;
            }
            let result = match strategy {
                ExtractStrategy::StillSequence => {
                    self.still_sequence(listing.as_deref().unwrap_or_default())
                }
                ExtractStrategy::VectorSequence => {
                    self.vector_sequence(&source.path, listing.as_deref().unwrap_or_default())
                }
                ExtractStrategy::ContainerFrames => self.container_frames(&source.path),
                ExtractStrategy::StaticImage => self.static_image(&source.path),
            };

            match result {
                Ok(Some(attempt)) if !attempt.frames.is_empty() => {
                    tracing::info!(
                        ?strategy,
                        frames = attempt.frames.len(),
                        "extracted frames"
                    );
                    let (sequence, warnings) =
                        FrameSequence::new(attempt.frames, self.opts.policy)?;
                    return Ok(Extraction {
                        sequence,
                        strategy,
                        warnings,
                        scratch: attempt.scratch,
                    });
                }
                Ok(_) => tracing::debug!(?strategy, "strategy yielded no frames"),
                Err(e) if matches!(e, TileError::DiskIo { .. }) => return Err(e),
                Err(e) => {
                    tracing::debug!(?strategy, error = %e, "strategy failed");
                    failures.push(format!("{strategy:?}: {e}"));
                }
            }
        }

        let detail = if failures.is_empty() {
            "no extraction strategy produced a frame".to_string()
        } else {
            failures.join("; ")
        };
        Err(TileError::unsupported(&source.path, detail))
    }

    fn still_sequence(&self, listing: &[PathBuf]) -> TileResult<Option<Attempt>> {
        let files = with_extensions(listing, STILL_EXTENSIONS);
        if files.is_empty() {
            return Ok(None);
        }
        let frames = files
            .iter()
            .enumerate()
            .map(|(i, path)| decode_still(path, i))
            .collect::<TileResult<Vec<_>>>()?;
        Ok(Some(Attempt {
            frames,
            scratch: None,
        }))
    }

    fn vector_sequence(&self, dir: &Path, listing: &[PathBuf]) -> TileResult<Option<Attempt>> {
        let files = with_extensions(listing, VECTOR_EXTENSIONS);
        if files.is_empty() {
            return Ok(None);
        }
        let raster = SvgRasterizer::new(Some(dir), self.opts.svg_width, self.opts.svg_height)?;
        let frames = files
            .iter()
            .enumerate()
            .map(|(i, path)| raster.rasterize_file(path, i))
            .collect::<TileResult<Vec<_>>>()?;
        Ok(Some(Attempt {
            frames,
            scratch: None,
        }))
    }

    fn container_frames(&self, path: &Path) -> TileResult<Option<Attempt>> {
        if let Some(frames) = decode_animation(path)? {
            return Ok(Some(Attempt {
                frames,
                scratch: None,
            }));
        }
        if sniff_format(path)?.is_some() || has_extension(path, VECTOR_EXTENSIONS) {
            // A still image; the static fallback reads it.
            return Ok(None);
        }
        self.ffmpeg_frames(path).map(Some)
    }

    /// Extract every frame as RGBA PNG into a scratch directory using `ffmpeg`.
    fn ffmpeg_frames(&self, path: &Path) -> TileResult<Attempt> {
        let scratch = tempfile::Builder::new()
            .prefix("tilecast-extract-")
            .tempdir()
            .map_err(|e| TileError::disk("creating scratch directory", std::env::temp_dir(), e))?;
        let pattern = scratch.path().join("frame_%06d.png");

        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(path.as_os_str().to_os_string());
        args.extend(
            ["-vsync", "passthrough", "-pix_fmt", "rgba"]
                .into_iter()
                .map(OsString::from),
        );
        args.push(pattern.into_os_string());

        tracing::debug!(args = %display_args(&args), "extracting frames with ffmpeg");
        let out = self.tools.run(&self.opts.ffmpeg, &args)?;
        if !out.success {
            return Err(TileError::Other(anyhow::anyhow!(
                "ffmpeg frame extraction exited with status {:?}: {}",
                out.code,
                out.stderr.trim()
            )));
        }

        let listing = list_dir(scratch.path())?;
        let files = with_extensions(&listing, &["png"]);
        let frames = files
            .iter()
            .enumerate()
            .map(|(i, p)| decode_still(p, i))
            .collect::<TileResult<Vec<_>>>()?;
        Ok(Attempt {
            frames,
            scratch: Some(scratch),
        })
    }

    fn static_image(&self, path: &Path) -> TileResult<Option<Attempt>> {
        let frame = if has_extension(path, VECTOR_EXTENSIONS) {
            SvgRasterizer::new(path.parent(), self.opts.svg_width, self.opts.svg_height)?
                .rasterize_file(path, 0)?
        } else {
            decode_still(path, 0)?
        };
        Ok(Some(Attempt {
            frames: vec![frame],
            scratch: None,
        }))
    }
}

/// Visible regular files of `dir`, in natural order.
fn list_dir(dir: &Path) -> TileResult<Vec<PathBuf>> {
    let rd = std::fs::read_dir(dir).map_err(|e| TileError::disk("listing", dir, e))?;
    let mut out = Vec::new();
    for entry in rd {
        let entry = entry.map_err(|e| TileError::disk("listing", dir, e))?;
        let path = entry.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if hidden || !path.is_file() {
            continue;
        }
        out.push(path);
    }
    sort_paths(&mut out);
    Ok(out)
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

fn with_extensions(listing: &[PathBuf], exts: &[&str]) -> Vec<PathBuf> {
    listing
        .iter()
        .filter(|p| has_extension(p, exts))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/extract.rs"]
mod tests;
