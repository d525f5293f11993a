use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use crate::encode::TileEncoder;
use crate::foundation::core::TileSpec;
use crate::foundation::error::{TileError, TileResult};
use crate::tile::Tile;
use crate::tools::{Toolchain, display_args};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderOpts {
    /// `ffmpeg` program name or path.
    pub ffmpeg: String,
    /// Target video bitrate, in ffmpeg's notation.
    pub bitrate: String,
    /// Replace existing output files instead of failing the tile.
    pub overwrite: bool,
}

impl Default for EncoderOpts {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            bitrate: "2M".to_string(),
            overwrite: true,
        }
    }
}

/// VP9 WebM with alpha (`yuva420p`) via the system `ffmpeg`.
///
/// Frames are staged as PNG files in a private scratch directory, which is removed whether or not
/// the encode succeeds.
pub struct FfmpegTileEncoder {
    tools: Arc<dyn Toolchain>,
    opts: EncoderOpts,
}

impl FfmpegTileEncoder {
    pub fn new(tools: Arc<dyn Toolchain>, opts: EncoderOpts) -> Self {
        Self { tools, opts }
    }
}

impl TileEncoder for FfmpegTileEncoder {
    fn extension(&self) -> &str {
        "webm"
    }

    fn encode(&self, tile: &Tile, fps: f64, out_path: &Path) -> TileResult<()> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(TileError::encode(tile.id, format!("invalid fps {fps}")));
        }
        if !self.opts.overwrite && out_path.exists() {
            return Err(TileError::encode(
                tile.id,
                format!("output '{}' already exists", out_path.display()),
            ));
        }

        let scratch = tempfile::Builder::new()
            .prefix("tilecast-tile-")
            .tempdir()
            .map_err(|e| TileError::disk("creating scratch directory", std::env::temp_dir(), e))?;

        for (i, frame) in tile.sequence.frames().iter().enumerate() {
            let path = scratch.path().join(format!("frame_{:06}.png", i + 1));
            frame
                .to_rgba_image()?
                .save_with_format(&path, image::ImageFormat::Png)
                .map_err(|e| match e {
                    image::ImageError::IoError(io) => TileError::disk("writing tile frame", &path, io),
                    other => TileError::Other(anyhow::Error::new(other).context(format!(
                        "encode tile frame '{}'",
                        path.display()
                    ))),
                })?;
        }

        let spec = TileSpec::new(tile.sequence.width(), tile.sequence.height())?;
        let pattern = scratch.path().join("frame_%06d.png");
        let args = encode_args(&pattern, fps, spec, out_path, &self.opts);
        tracing::debug!(tile = %tile.id, args = %display_args(&args), "encoding tile");

        // Past the no-overwrite check, anything at `out_path` after a failure is ours.
        let failure = match self.tools.run(&self.opts.ffmpeg, &args) {
            Ok(out) if out.success => None,
            Ok(out) => Some(format!(
                "ffmpeg exited with status {:?}: {}",
                out.code,
                out.stderr.trim()
            )),
            Err(e) => Some(e.to_string()),
        };
        if let Some(detail) = failure {
            discard_partial_output(out_path);
            return Err(TileError::encode(tile.id, detail));
        }

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(
                tile = %tile.id,
                path = %scratch_path.display(),
                error = %e,
                "failed to remove tile scratch directory"
            );
        }
        Ok(())
    }
}

fn discard_partial_output(out_path: &Path) {
    match std::fs::remove_file(out_path) {
        Ok(()) => tracing::debug!(path = %out_path.display(), "removed partial tile output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %out_path.display(),
            error = %e,
            "failed to remove partial tile output"
        ),
    }
}

/// Command line for one tile: PNG sequence in, VP9 + alpha WebM out.
///
/// The filter chain scales to the tile size, then pads to even sides for `yuva420p` with
/// transparent pixels. The padding exists only in the encoded stream.
pub fn encode_args(
    pattern: &Path,
    fps: f64,
    tile: TileSpec,
    out_path: &Path,
    opts: &EncoderOpts,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        if opts.overwrite { "-y" } else { "-n" }.into(),
        "-framerate".into(),
        fps.to_string().into(),
        "-i".into(),
        pattern.as_os_str().to_os_string(),
        "-vf".into(),
        format!(
            "scale={}:{}:flags=lanczos,pad=ceil(iw/2)*2:ceil(ih/2)*2:color=black@0",
            tile.width, tile.height
        )
        .into(),
    ];
    args.extend(
        [
            "-c:v",
            "libvpx-vp9",
            "-pix_fmt",
            "yuva420p",
            "-auto-alt-ref",
            "0",
            "-b:v",
            opts.bitrate.as_str(),
            "-an",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(out_path.as_os_str().to_os_string());
    args
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
