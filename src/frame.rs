use crate::foundation::core::{Canvas, Region};
use crate::foundation::error::{TileError, TileResult};

/// Bytes per pixel. Frames are always straight-alpha RGBA8.
pub const CHANNELS: usize = 4;

/// How [`FrameSequence::new`] treats frames whose size differs from the first frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPolicy {
    /// Any mismatch is a [`TileError::DimensionMismatch`].
    Strict,
    /// Mismatched frames are placed at the origin of a transparent canvas of the first frame's size.
    #[default]
    Lenient,
}

/// One decoded frame: straight RGBA8, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Decoder-reported display time, when the container has one.
    pub duration_ms: Option<f64>,
}

impl Frame {
    pub fn new(index: usize, width: u32, height: u32, data: Vec<u8>) -> TileResult<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(TileError::Other(anyhow::anyhow!(
                "frame {index}: buffer has {} bytes, expected {expected} for {width}x{height} rgba",
                data.len()
            )));
        }
        Ok(Self {
            index,
            width,
            height,
            data,
            duration_ms: None,
        })
    }

    /// A fully transparent frame (every byte zero).
    pub fn transparent(index: usize, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            data: vec![0u8; width as usize * height as usize * CHANNELS],
            duration_ms: None,
        }
    }

    pub fn from_rgba_image(index: usize, img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            index,
            width,
            height,
            data: img.into_raw(),
            duration_ms: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: Option<f64>) -> Self {
        self.duration_ms = duration_ms.filter(|d| d.is_finite() && *d > 0.0);
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Copy `region` of `self` to `(dx, dy)` of `dst`.
    ///
    /// The region is clipped against both frames, so out-of-range parts are skipped.
    pub fn copy_region_to(&self, region: Region, dst: &mut Frame, dx: u32, dy: u32) {
        let Region {
            x: sx,
            y: sy,
            width: w,
            height: h,
        } = region;
        let w = w
            .min(self.width.saturating_sub(sx))
            .min(dst.width.saturating_sub(dx)) as usize;
        let h = h
            .min(self.height.saturating_sub(sy))
            .min(dst.height.saturating_sub(dy));
        if w == 0 {
            return;
        }

        let row_bytes = w * CHANNELS;
        for row in 0..h {
            let src_start = ((sy + row) as usize * self.width as usize + sx as usize) * CHANNELS;
            let dst_start = ((dy + row) as usize * dst.width as usize + dx as usize) * CHANNELS;
            dst.data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&self.data[src_start..src_start + row_bytes]);
        }
    }

    pub fn to_rgba_image(&self) -> TileResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            TileError::Other(anyhow::anyhow!(
                "frame {} buffer does not match {}x{}",
                self.index,
                self.width,
                self.height
            ))
        })
    }
}

/// Ordered, non-empty list of frames sharing one canvas size.
#[derive(Clone, Debug)]
pub struct FrameSequence {
    canvas: Canvas,
    frames: Vec<Frame>,
}

impl FrameSequence {
    /// Validate `frames` against the first frame's dimensions.
    ///
    /// Returns the sequence and one warning per normalized frame (lenient mode only).
    pub fn new(frames: Vec<Frame>, policy: DimensionPolicy) -> TileResult<(Self, Vec<String>)> {
        let Some(first) = frames.first() else {
            return Err(TileError::Other(anyhow::anyhow!(
                "a frame sequence needs at least one frame"
            )));
        };
        let (width, height) = first.dimensions();
        if width == 0 || height == 0 {
            return Err(TileError::Other(anyhow::anyhow!(
                "first frame has empty dimensions {width}x{height}"
            )));
        }

        let mut warnings = Vec::new();
        let mut out = Vec::with_capacity(frames.len());
        for (index, mut frame) in frames.into_iter().enumerate() {
            frame.index = index;
            if frame.dimensions() == (width, height) {
                out.push(frame);
                continue;
            }

            if policy == DimensionPolicy::Strict {
                return Err(TileError::DimensionMismatch {
                    index,
                    width,
                    height,
                    got_width: frame.width,
                    got_height: frame.height,
                });
            }

            let msg = format!(
                "frame {index} is {}x{}, normalized onto the {width}x{height} canvas",
                frame.width, frame.height
            );
            tracing::warn!("{msg}");
            warnings.push(msg);

            let mut canvas = Frame::transparent(index, width, height);
            frame.copy_region_to(Region::full(frame.width, frame.height), &mut canvas, 0, 0);
            canvas.duration_ms = frame.duration_ms;
            out.push(canvas);
        }

        Ok((
            Self {
                canvas: Canvas::new(width, height),
                frames: out,
            },
            warnings,
        ))
    }

    /// Build a sequence whose frames are already known to share one size.
    pub fn uniform(frames: Vec<Frame>) -> TileResult<Self> {
        Self::new(frames, DimensionPolicy::Strict).map(|(seq, _)| seq)
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    pub fn height(&self) -> u32 {
        self.canvas.height
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn first(&self) -> &Frame {
        &self.frames[0]
    }
}

#[cfg(test)]
#[path = "../tests/unit/frame.rs"]
mod tests;
