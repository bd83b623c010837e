use std::{
    fs::File,
    io::{BufRead, BufReader, Cursor, Read, Seek},
    path::{Path, PathBuf},
};

use image::{AnimationDecoder as _, ImageDecoder as _};

use super::{DEFAULT_FRAME_DURATION_MS, FrameSource, SourceFrame, SourceInfo};
use crate::foundation::{
    error::{CastError, CastResult, Stage},
    frame::Frame,
};

/// Animated GIF or WebP, decoded one frame per [`FrameSource::next_frame`] call.
///
/// Frames are the composited full canvas; per-frame delays are rounded to whole
/// milliseconds and a zero delay is read as [`DEFAULT_FRAME_DURATION_MS`].
///
/// GIF timing comes from a scan of the frame control blocks at open time, which skips
/// pixel decoding. Animated WebP timing is read from the first frame and the frame
/// count is left unknown.
pub struct AnimatedImageSource {
    info: SourceInfo,
    peeked: Option<SourceFrame>,
    frames: Option<image::Frames<'static>>,
    next_index: usize,
}

impl std::fmt::Debug for AnimatedImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimatedImageSource")
            .field("info", &self.info)
            .field("next_index", &self.next_index)
            .field("exhausted", &(self.peeked.is_none() && self.frames.is_none()))
            .finish()
    }
}

impl AnimatedImageSource {
    pub fn open_gif(path: &Path) -> CastResult<Self> {
        let timing = gif_timing(open_reader(path)?).map_err(|e| prefix_path(e, path))?;
        Self::gif(Some(path.to_path_buf()), open_reader(path)?, timing)
            .map_err(|e| prefix_path(e, path))
    }

    pub fn open_webp(path: &Path) -> CastResult<Self> {
        Self::webp(Some(path.to_path_buf()), open_reader(path)?).map_err(|e| prefix_path(e, path))
    }

    pub fn from_gif_bytes(bytes: &[u8]) -> CastResult<Self> {
        let timing = gif_timing(Cursor::new(bytes))?;
        Self::gif(None, Cursor::new(bytes.to_vec()), timing)
    }

    pub fn from_webp_bytes(bytes: &[u8]) -> CastResult<Self> {
        Self::webp(None, Cursor::new(bytes.to_vec()))
    }

    fn gif<R>(path: Option<PathBuf>, reader: R, timing: GifTiming) -> CastResult<Self>
    where
        R: BufRead + Seek + 'static,
    {
        if timing.frames == 0 {
            return Err(CastError::empty_input("animation contains no frames"));
        }
        let decoder = image::codecs::gif::GifDecoder::new(reader)
            .map_err(|e| CastError::source_unavailable(format!("not a decodable gif: {e}")))?;
        let (width, height) = decoder.dimensions();
        tracing::debug!(
            frames = timing.frames,
            total_ms = timing.total_ms,
            "scanned gif timing"
        );

        Ok(Self {
            info: SourceInfo {
                path,
                width,
                height,
                native_frame_rate: timing.frame_rate(),
                frame_count: Some(timing.frames),
            },
            peeked: None,
            frames: Some(decoder.into_frames()),
            next_index: 0,
        })
    }

    fn webp<R>(path: Option<PathBuf>, reader: R) -> CastResult<Self>
    where
        R: BufRead + Seek + 'static,
    {
        let decoder = image::codecs::webp::WebPDecoder::new(reader)
            .map_err(|e| CastError::source_unavailable(format!("not a decodable webp: {e}")))?;
        let (width, height) = decoder.dimensions();

        if !decoder.has_animation() {
            let still = image::DynamicImage::from_decoder(decoder)
                .map_err(|e| CastError::source_unavailable(format!("webp decode failed: {e}")))
                .map_err(|e| e.at_frame(Stage::Decode, 0))?;
            let frame = SourceFrame::new(
                Frame::from_dynamic_image(still)?,
                DEFAULT_FRAME_DURATION_MS,
            )?;
            return Ok(Self {
                info: SourceInfo {
                    path,
                    width,
                    height,
                    native_frame_rate: Some(1000.0 / DEFAULT_FRAME_DURATION_MS),
                    frame_count: Some(1),
                },
                peeked: Some(frame),
                frames: None,
                next_index: 0,
            });
        }

        let mut frames = decoder.into_frames();
        let first = match frames.next() {
            Some(decoded) => source_frame(decoded, 0)?,
            None => return Err(CastError::empty_input("animation contains no frames")),
        };
        Ok(Self {
            info: SourceInfo {
                path,
                width,
                height,
                native_frame_rate: Some(1000.0 / first.duration_ms()),
                frame_count: None,
            },
            peeked: Some(first),
            frames: Some(frames),
            next_index: 0,
        })
    }
}

impl FrameSource for AnimatedImageSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> CastResult<Option<SourceFrame>> {
        let index = self.next_index;
        if let Some(frame) = self.peeked.take() {
            self.next_index += 1;
            return Ok(Some(frame));
        }
        let Some(frames) = self.frames.as_mut() else {
            return Ok(None);
        };
        match frames.next() {
            Some(decoded) => {
                self.next_index += 1;
                source_frame(decoded, index).map(Some)
            }
            None => {
                tracing::debug!(frames = index, "animation exhausted");
                self.frames = None;
                Ok(None)
            }
        }
    }
}

/// Frame count and summed display time of a GIF.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GifTiming {
    pub frames: u64,
    pub total_ms: f64,
}

impl GifTiming {
    fn frame_rate(&self) -> Option<f64> {
        (self.total_ms > 0.0).then(|| 1000.0 * self.frames as f64 / self.total_ms)
    }
}

/// Walk the GIF's frame headers with LZW decoding switched off.
pub(crate) fn gif_timing<R: Read>(reader: R) -> CastResult<GifTiming> {
    let mut options = gif::DecodeOptions::new();
    options.skip_frame_decoding(true);
    let mut decoder = options
        .read_info(reader)
        .map_err(|e| CastError::source_unavailable(format!("not a decodable gif: {e}")))?;

    let mut timing = GifTiming {
        frames: 0,
        total_ms: 0.0,
    };
    loop {
        let index = timing.frames as usize;
        let next = decoder.read_next_frame().map_err(|e| {
            CastError::source_unavailable(format!("gif frame scan failed: {e}"))
                .at_frame(Stage::Decode, index)
        })?;
        let Some(frame) = next else {
            break;
        };
        // GIF delays are in hundredths of a second.
        let delay = image::Delay::from_numer_denom_ms(u32::from(frame.delay) * 10, 1);
        timing.frames += 1;
        timing.total_ms += delay_ms(delay);
    }
    Ok(timing)
}

fn source_frame(
    decoded: image::ImageResult<image::Frame>,
    index: usize,
) -> CastResult<SourceFrame> {
    let decoded = decoded
        .map_err(|e| CastError::source_unavailable(format!("frame decode failed: {e}")))
        .map_err(|e| e.at_frame(Stage::Decode, index))?;
    let duration_ms = delay_ms(decoded.delay());
    let frame = Frame::from_rgba_image(decoded.into_buffer())
        .map_err(|e| e.at_frame(Stage::Decode, index))?;
    SourceFrame::new(frame, duration_ms).map_err(|e| e.at_frame(Stage::Decode, index))
}

fn open_reader(path: &Path) -> CastResult<BufReader<File>> {
    File::open(path).map(BufReader::new).map_err(|e| {
        CastError::source_unavailable(format!("failed to open '{}': {e}", path.display()))
    })
}

fn prefix_path(err: CastError, path: &Path) -> CastError {
    match err {
        CastError::SourceUnavailable(msg) => {
            CastError::source_unavailable(format!("'{}': {msg}", path.display()))
        }
        other => other,
    }
}

pub(crate) fn delay_ms(delay: image::Delay) -> f64 {
    let (numer, denom) = delay.numer_denom_ms();
    if denom == 0 {
        return DEFAULT_FRAME_DURATION_MS;
    }
    let ms = (f64::from(numer) / f64::from(denom)).round();
    if ms <= 0.0 {
        DEFAULT_FRAME_DURATION_MS
    } else {
        ms
    }
}
