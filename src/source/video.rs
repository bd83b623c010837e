use std::path::Path;

#[cfg(feature = "media-ffmpeg")]
use std::io::Read as _;

use super::{FrameSource, SourceFrame, SourceInfo};
#[cfg(feature = "media-ffmpeg")]
use crate::foundation::{
    error::{CastError, CastResult, Stage},
    frame::Frame,
};
#[cfg(not(feature = "media-ffmpeg"))]
use crate::foundation::error::{CastError, CastResult};

/// Stream parameters reported by `ffprobe`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoProbe {
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub frame_count: Option<u64>,
    pub duration_sec: Option<f64>,
}

impl VideoProbe {
    pub fn fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }

    /// Container frame count, else duration times rate.
    pub fn estimated_frame_count(&self) -> Option<u64> {
        if let Some(n) = self.frame_count.filter(|n| *n > 0) {
            return Some(n);
        }
        let fps = self.fps();
        self.duration_sec
            .filter(|d| d.is_finite() && *d > 0.0 && fps > 0.0)
            .map(|d| (d * fps).round() as u64)
    }
}

/// Video decoded by a streaming `ffmpeg` child process (raw RGBA on stdout).
///
/// The child is killed and reaped when the source is dropped.
pub struct VideoSource {
    info: SourceInfo,
    #[cfg(feature = "media-ffmpeg")]
    child: Option<std::process::Child>,
    #[cfg(feature = "media-ffmpeg")]
    stderr: Option<std::thread::JoinHandle<String>>,
    #[cfg(feature = "media-ffmpeg")]
    frame_duration_ms: f64,
    #[cfg(feature = "media-ffmpeg")]
    decoded: usize,
}

impl std::fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSource")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "media-ffmpeg")]
impl VideoSource {
    pub fn open(path: &Path) -> CastResult<Self> {
        let probe = probe_video(path)?;
        let fps = probe.fps();
        if fps <= 0.0 {
            return Err(CastError::source_unavailable(format!(
                "'{}' reports no usable frame rate",
                path.display()
            )));
        }

        let mut child = std::process::Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| {
                CastError::source_unavailable(format!("failed to run ffmpeg for video decode: {e}"))
            })?;
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                let _ = pipe.read_to_end(&mut bytes);
                String::from_utf8_lossy(&bytes).into_owned()
            })
        });
        tracing::debug!(
            path = %path.display(),
            fps,
            frames = ?probe.frame_count,
            duration_sec = ?probe.duration_sec,
            "spawned ffmpeg video decode"
        );

        Ok(Self {
            info: SourceInfo {
                path: Some(path.to_path_buf()),
                width: probe.width,
                height: probe.height,
                native_frame_rate: Some(fps),
                frame_count: probe.estimated_frame_count(),
            },
            child: Some(child),
            stderr,
            frame_duration_ms: 1000.0 / fps,
            decoded: 0,
        })
    }
}

#[cfg(not(feature = "media-ffmpeg"))]
impl VideoSource {
    pub fn open(path: &Path) -> CastResult<Self> {
        Err(CastError::source_unavailable(format!(
            "'{}': video sources require the 'media-ffmpeg' feature",
            path.display()
        )))
    }
}

impl FrameSource for VideoSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    #[cfg(feature = "media-ffmpeg")]
    fn next_frame(&mut self) -> CastResult<Option<SourceFrame>> {
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };
        let Some(stdout) = child.stdout.as_mut() else {
            return Ok(None);
        };

        let frame_len = self.info.width as usize * self.info.height as usize * 4;
        let mut buf = vec![0u8; frame_len];
        let mut filled = 0usize;
        while filled < frame_len {
            let n = stdout
                .read(&mut buf[filled..])
                .map_err(|e| {
                    CastError::source_unavailable(format!("reading ffmpeg output failed: {e}"))
                })
                .map_err(|e| e.at_frame(Stage::Decode, self.decoded))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }
        if filled < frame_len {
            let (_, log) = self.reap();
            return Err(ffmpeg_failure(
                &format!("ffmpeg produced a truncated frame ({filled} of {frame_len} bytes)"),
                &log,
            )
            .at_frame(Stage::Decode, self.decoded));
        }

        let frame = Frame::new(self.info.width, self.info.height, buf)
            .and_then(|frame| SourceFrame::new(frame, self.frame_duration_ms))
            .map_err(|e| e.at_frame(Stage::Decode, self.decoded))?;
        self.decoded += 1;
        Ok(Some(frame))
    }

    #[cfg(not(feature = "media-ffmpeg"))]
    fn next_frame(&mut self) -> CastResult<Option<SourceFrame>> {
        Ok(None)
    }
}

#[cfg(feature = "media-ffmpeg")]
impl VideoSource {
    fn finish(&mut self) -> CastResult<()> {
        if self.child.is_none() {
            return Ok(());
        }
        let (status, log) = self.reap();
        let status = status.map_err(|e| {
            CastError::source_unavailable(format!("waiting for ffmpeg failed: {e}"))
        })?;
        if !status.success() {
            return Err(ffmpeg_failure(
                &format!("ffmpeg video decode exited with {status}"),
                &log,
            ));
        }
        tracing::debug!(frames = self.decoded, "video decode finished");
        Ok(())
    }

    /// Wait for the child and collect everything it wrote to stderr.
    fn reap(&mut self) -> (std::io::Result<std::process::ExitStatus>, String) {
        let status = match self.child.take() {
            Some(mut child) => child.wait(),
            None => Err(std::io::Error::other("ffmpeg already reaped")),
        };
        let log = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        (status, log)
    }
}

#[cfg(feature = "media-ffmpeg")]
impl Drop for VideoSource {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr.take() {
            let _ = handle.join();
        }
    }
}

/// Lines of ffmpeg's stderr kept in an error message.
const STDERR_TAIL_LINES: usize = 6;

/// `what`, followed by the tail of the decoder's stderr when it said anything.
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
pub(crate) fn ffmpeg_failure(what: &str, stderr: &str) -> CastError {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return CastError::source_unavailable(what.to_string());
    }
    let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
    CastError::source_unavailable(format!("{what}: {}", tail.join("; ")))
}

#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(path: &Path) -> CastResult<VideoProbe> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        avg_frame_rate: Option<String>,
        nb_frames: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| CastError::source_unavailable(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(CastError::source_unavailable(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| CastError::source_unavailable(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            CastError::source_unavailable(format!("no video stream in '{}'", path.display()))
        })?;
    let width = stream
        .width
        .filter(|w| *w > 0)
        .ok_or_else(|| CastError::source_unavailable("missing video width from ffprobe"))?;
    let height = stream
        .height
        .filter(|h| *h > 0)
        .ok_or_else(|| CastError::source_unavailable("missing video height from ffprobe"))?;

    let (fps_num, fps_den) = [stream.avg_frame_rate.as_deref(), stream.r_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(parse_ff_ratio)
        .find(|(n, _)| *n > 0)
        .ok_or_else(|| CastError::source_unavailable("invalid video frame rate from ffprobe"))?;

    Ok(VideoProbe {
        width,
        height,
        fps_num,
        fps_den,
        frame_count: stream.nb_frames.as_deref().and_then(|s| s.parse().ok()),
        duration_sec: parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|s| s.parse().ok()),
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_video(_path: &Path) -> CastResult<VideoProbe> {
    Err(CastError::source_unavailable(
        "video sources require the 'media-ffmpeg' feature",
    ))
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
pub(crate) fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = match parts.next() {
        Some(b) => b.parse::<u32>().ok()?,
        None => 1,
    };
    if b == 0 {
        return None;
    }
    Some((a, b))
}
