//! Input decoding: still and animated rasters, SVG rasterization, and frame extraction.

pub mod decode;
pub mod extract;
pub mod natural_sort;
pub mod svg_raster;
