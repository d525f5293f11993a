//! Playback-rate estimation from source metadata.
//!
//! Sources run in [`FpsEstimator::CHAIN`] order and the first usable value wins. A source that
//! fails (tool missing, unparsable output, no metadata) simply yields nothing.

use std::ffi::OsString;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::assets::decode::first_frame_delay_ms;
use crate::tools::Toolchain;

static FPS_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s,])(\d+(?:\.\d+)?)\s*fps\b").expect("fps token regex")
});
static TBR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s,])(\d+(?:\.\d+)?)(k?)\s*tbr\b").expect("tbr token regex")
});

/// Which source produced an estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FpsSource {
    /// `<n> fps` in the `ffmpeg -i` stream description.
    DiagnosticFps,
    /// `<n> tbr` in the same text.
    DiagnosticTbr,
    /// Inverted first-frame delay from the animation decoder.
    DecoderFrameDelay,
    /// `exiftool -FrameRate`.
    MetadataTool,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct FpsEstimate {
    pub fps: f64,
    pub source: FpsSource,
}

pub struct FpsEstimator {
    tools: Arc<dyn Toolchain>,
    ffmpeg: String,
    exiftool: String,
}

impl FpsEstimator {
    pub const CHAIN: [FpsSource; 4] = [
        FpsSource::DiagnosticFps,
        FpsSource::DiagnosticTbr,
        FpsSource::DecoderFrameDelay,
        FpsSource::MetadataTool,
    ];

    pub fn new(tools: Arc<dyn Toolchain>) -> Self {
        Self {
            tools,
            ffmpeg: "ffmpeg".to_string(),
            exiftool: "exiftool".to_string(),
        }
    }

    pub fn with_programs(mut self, ffmpeg: impl Into<String>, exiftool: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.exiftool = exiftool.into();
        self
    }

    /// Estimate the playback rate of `path`, or `None` when every source comes up empty.
    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    pub fn estimate(&self, path: &Path) -> Option<FpsEstimate> {
        // Both diagnostic sources read the same `ffmpeg -i` text; run it at most once.
        let mut diagnostics: Option<Option<String>> = None;

        for source in Self::CHAIN {
            let fps = match source {
                FpsSource::DiagnosticFps => diagnostics
                    .get_or_insert_with(|| self.diagnostics(path))
                    .as_deref()
                    .and_then(parse_fps_token),
                FpsSource::DiagnosticTbr => diagnostics
                    .get_or_insert_with(|| self.diagnostics(path))
                    .as_deref()
                    .and_then(parse_tbr_token),
                FpsSource::DecoderFrameDelay => self.decoder_delay(path),
                FpsSource::MetadataTool => self.metadata_tool(path),
            };

            if let Some(fps) = fps.filter(|v| v.is_finite() && *v > 0.0) {
                tracing::info!(fps, ?source, "estimated fps");
                return Some(FpsEstimate { fps, source });
            }
            tracing::debug!(?source, "fps source yielded nothing");
        }
        None
    }

    fn diagnostics(&self, path: &Path) -> Option<String> {
        let args = vec![
            OsString::from("-hide_banner"),
            OsString::from("-i"),
            path.as_os_str().to_os_string(),
        ];
        // Without an output file ffmpeg exits non-zero; the stream description is still printed.
        match self.tools.run(&self.ffmpeg, &args) {
            Ok(out) => Some(out.diagnostics()),
            Err(e) => {
                tracing::debug!(error = %e, "ffmpeg diagnostics unavailable");
                None
            }
        }
    }

    fn decoder_delay(&self, path: &Path) -> Option<f64> {
        match first_frame_delay_ms(path) {
            Ok(delay) => delay.filter(|d| *d > 0.0).map(|d| 1000.0 / d),
            Err(e) => {
                tracing::debug!(error = %e, "decoder delay lookup failed");
                None
            }
        }
    }

    fn metadata_tool(&self, path: &Path) -> Option<f64> {
        let args = vec![
            OsString::from("-FrameRate"),
            OsString::from("-b"),
            path.as_os_str().to_os_string(),
        ];
        let out = self.tools.run(&self.exiftool, &args).ok()?;
        if !out.success {
            return None;
        }
        String::from_utf8_lossy(&out.stdout).trim().parse().ok()
    }
}

/// First standalone `<number> fps` token in free-form diagnostic text.
///
/// The number must start a word, so file names like `party_60fps.gif` do not match.
pub fn parse_fps_token(text: &str) -> Option<f64> {
    FPS_TOKEN
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .find(|v| *v > 0.0)
}

/// First `<number> tbr` token; ffmpeg abbreviates thousands as `1k tbr`.
pub fn parse_tbr_token(text: &str) -> Option<f64> {
    TBR_TOKEN
        .captures_iter(text)
        .filter_map(|c| {
            let value = c[1].parse::<f64>().ok()?;
            Some(if &c[2] == "k" { value * 1000.0 } else { value })
        })
        .find(|v| *v > 0.0)
}

#[cfg(test)]
#[path = "../tests/unit/fps.rs"]
mod tests;
