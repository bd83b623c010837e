//! Frame sources: the decoder side of the pipeline.
//!
//! A source yields frames in display order together with their native display duration.
//! Opening happens in the constructors (or [`open_source`]); closing is `Drop`.

use std::path::{Path, PathBuf};

use crate::foundation::{
    caps::Capabilities,
    error::{CastError, CastResult},
    frame::{Frame, check_duration},
};

/// Animated GIF / WebP decoding through the `image` crate.
pub mod animated;
/// In-memory frames.
pub mod memory;
/// ffmpeg-backed video decoding.
pub mod video;

/// Fallback display duration when a source does not state one.
pub const DEFAULT_FRAME_DURATION_MS: f64 = 100.0;

/// What a source knows about itself once opened.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    /// Path the source was opened from, if any.
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    /// Native sampling rate in frames per second, when known.
    pub native_frame_rate: Option<f64>,
    /// Total number of frames, when known.
    pub frame_count: Option<u64>,
}

/// One decoded frame and its native display duration.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFrame {
    frame: Frame,
    duration_ms: f64,
}

impl SourceFrame {
    /// `duration_ms` must be finite and > 0.
    pub fn new(frame: Frame, duration_ms: f64) -> CastResult<Self> {
        check_duration(duration_ms)?;
        Ok(Self { frame, duration_ms })
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn into_parts(self) -> (Frame, f64) {
        (self.frame, self.duration_ms)
    }
}

/// Decoder contract consumed by the extractor.
pub trait FrameSource {
    fn info(&self) -> &SourceInfo;

    /// Next frame in display order, or `None` at the end of the sequence.
    fn next_frame(&mut self) -> CastResult<Option<SourceFrame>>;
}

/// Kind of source a path resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Gif,
    Webp,
    Video,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "mp4" | "mov" | "m4v" | "webm" | "mkv" | "avi" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Open `path` with the decoder matching its extension.
pub fn open_source(path: &Path, caps: &Capabilities) -> CastResult<Box<dyn FrameSource>> {
    if !path.is_file() {
        return Err(CastError::source_unavailable(format!(
            "'{}' does not exist or is not a file",
            path.display()
        )));
    }
    let kind = SourceKind::from_path(path).ok_or_else(|| {
        CastError::source_unavailable(format!(
            "'{}' has an unsupported extension (expected gif, webp or a video container)",
            path.display()
        ))
    })?;

    let source: Box<dyn FrameSource> = match kind {
        SourceKind::Gif => Box::new(animated::AnimatedImageSource::open_gif(path)?),
        SourceKind::Webp => Box::new(animated::AnimatedImageSource::open_webp(path)?),
        SourceKind::Video => {
            if !caps.video_decode() {
                return Err(CastError::source_unavailable(
                    "video sources need ffmpeg and ffprobe on PATH",
                ));
            }
            Box::new(video::VideoSource::open(path)?)
        }
    };

    let info = source.info();
    tracing::info!(
        path = %path.display(),
        ?kind,
        width = info.width,
        height = info.height,
        native_fps = ?info.native_frame_rate,
        frames = ?info.frame_count,
        "opened source"
    );
    Ok(source)
}
