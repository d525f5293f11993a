use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::error::{TileError, TileResult};
use crate::frame::Frame;

const MAX_DIM: u32 = 16_384;

/// Rasterizes SVG files to a fixed output size, stretching each document to fill it.
pub struct SvgRasterizer {
    opts: usvg::Options<'static>,
    width: u32,
    height: u32,
}

impl SvgRasterizer {
    /// `resources_dir` resolves relative `href`s and is searched for extra fonts.
    pub fn new(resources_dir: Option<&Path>, width: u32, height: u32) -> TileResult<Self> {
        if width == 0 || height == 0 || width > MAX_DIM || height > MAX_DIM {
            return Err(TileError::config(format!(
                "svg raster size must be within 1..={MAX_DIM}, got {width}x{height}"
            )));
        }

        let opts = usvg::Options {
            resources_dir: resources_dir.map(Path::to_path_buf),
            fontdb: build_fontdb(resources_dir),
            ..Default::default()
        };
        Ok(Self {
            opts,
            width,
            height,
        })
    }

    pub fn rasterize_file(&self, path: &Path, index: usize) -> TileResult<Frame> {
        let bytes = std::fs::read(path).map_err(|e| TileError::disk("reading", path, e))?;
        self.rasterize(&bytes, index)
            .with_context(|| format!("rasterize svg '{}'", path.display()))
            .map_err(TileError::from)
    }

    fn rasterize(&self, bytes: &[u8], index: usize) -> anyhow::Result<Frame> {
        let tree = usvg::Tree::from_data(bytes, &self.opts).context("parse svg tree")?;
        let size = tree.size();
        anyhow::ensure!(
            size.width() > 0.0 && size.height() > 0.0,
            "svg has invalid width/height"
        );

        let mut pixmap = resvg::tiny_skia::Pixmap::new(self.width, self.height)
            .context("failed to allocate svg pixmap")?;
        let sx = (self.width as f32) / size.width();
        let sy = (self.height as f32) / size.height();
        let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
        resvg::render(&tree, xform, &mut pixmap.as_mut());

        let mut data = pixmap.take();
        demultiply_rgba8_in_place(&mut data);
        Ok(Frame::new(index, self.width, self.height, data)?)
    }
}

fn build_fontdb(resources_dir: Option<&Path>) -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    if let Some(dir) = resources_dir {
        load_fonts_from_dir(&mut db, dir);
        load_fonts_from_dir(&mut db, &dir.join("fonts"));
    }
    Arc::new(db)
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        let _ = db.load_font_file(&path);
    }
}

/// tiny-skia renders premultiplied alpha; frames carry straight alpha.
fn demultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/svg_raster.rs"]
mod tests;
