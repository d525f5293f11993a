use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, ImageFormat, ImageReader};

use crate::foundation::error::{TileError, TileResult};
use crate::frame::Frame;

fn open_buffered(path: &Path) -> TileResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| TileError::disk("opening", path, e))
}

/// Image format detected from the file contents, falling back to the extension.
pub fn sniff_format(path: &Path) -> TileResult<Option<ImageFormat>> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| TileError::disk("reading", path, e))?;
    Ok(reader.format())
}

/// Decode a single still image to straight RGBA8.
pub fn decode_still(path: &Path, index: usize) -> TileResult<Frame> {
    let img = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| TileError::disk("reading", path, e))?
        .decode()
        .with_context(|| format!("decode image '{}'", path.display()))?;
    Ok(Frame::from_rgba_image(index, img.to_rgba8()))
}

/// Decode every frame of an animated GIF, WebP or APNG, with per-frame delays.
///
/// Returns `Ok(None)` for formats without an animation decoder and for still WebP/PNG files.
pub fn decode_animation(path: &Path) -> TileResult<Option<Vec<Frame>>> {
    animation_frames(path, None)
}

/// Display time of the first frame as reported by the animation decoder.
pub fn first_frame_delay_ms(path: &Path) -> TileResult<Option<f64>> {
    let frames = animation_frames(path, Some(1))?;
    Ok(frames
        .and_then(|f| f.into_iter().next())
        .and_then(|f| f.duration_ms))
}

fn animation_frames(path: &Path, limit: Option<usize>) -> TileResult<Option<Vec<Frame>>> {
    let Some(format) = sniff_format(path)? else {
        return Ok(None);
    };

    let frames = match format {
        ImageFormat::Gif => {
            let dec = GifDecoder::new(open_buffered(path)?).context("open gif decoder")?;
            collect_frames(dec, limit)?
        }
        ImageFormat::WebP => {
            let dec = WebPDecoder::new(open_buffered(path)?).context("open webp decoder")?;
            if !dec.has_animation() {
                return Ok(None);
            }
            collect_frames(dec, limit)?
        }
        ImageFormat::Png => {
            let dec = PngDecoder::new(open_buffered(path)?).context("open png decoder")?;
            if !dec.is_apng().context("inspect png animation chunks")? {
                return Ok(None);
            }
            collect_frames(dec.apng().context("open apng decoder")?, limit)?
        }
        _ => return Ok(None),
    };
    Ok(Some(frames))
}

fn collect_frames<'a, D: AnimationDecoder<'a>>(
    decoder: D,
    limit: Option<usize>,
) -> TileResult<Vec<Frame>> {
    let mut out = Vec::new();
    for (index, frame) in decoder.into_frames().enumerate() {
        if limit.is_some_and(|n| index >= n) {
            break;
        }
        let frame = frame.with_context(|| format!("decode animation frame {index}"))?;
        let (num, den) = frame.delay().numer_denom_ms();
        let delay_ms = (den != 0).then(|| f64::from(num) / f64::from(den));
        out.push(Frame::from_rgba_image(index, frame.into_buffer()).with_duration_ms(delay_ms));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
