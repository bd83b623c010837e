use rayon::prelude::*;

use crate::{
    document::model::{AnimationDocument, Asset, Keyframe, Layer, Property, Transform},
    encode::still::{EncodedStill, StillFormat, encode_frame},
    foundation::{
        cancel::CancelToken,
        error::{CastError, CastResult, Stage},
        frame::TimedFrame,
    },
};

/// Lower bound for a derived frame rate.
pub const MIN_DERIVED_FRAME_RATE: u32 = 10;
/// Upper bound for a derived frame rate.
pub const MAX_DERIVED_FRAME_RATE: u32 = 60;
/// Bounds for an explicit frame-rate override.
pub const FRAME_RATE_OVERRIDE_RANGE: std::ops::RangeInclusive<u32> = 1..=240;

/// `nm` used when no better name is known.
pub const DEFAULT_DOCUMENT_NAME: &str = "Animation";

/// How asset encoding is scheduled.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncodeThreading {
    /// Encode assets on a rayon pool; layer order is unaffected.
    pub parallel: bool,
    /// Pool size; `None` lets rayon decide.
    pub threads: Option<usize>,
}

/// Options for [`assemble`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssembleOptions {
    /// Explicit ticks per second; derived from the frame timing when unset.
    pub frame_rate: Option<u32>,
    pub format: StillFormat,
    /// Lossy WebP quality, 0..=100.
    pub quality: u8,
    /// Document name (`nm`); file conversions replace the default with the input stem.
    pub name: String,
    pub threading: EncodeThreading,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            frame_rate: None,
            format: StillFormat::Webp,
            quality: 85,
            name: DEFAULT_DOCUMENT_NAME.to_string(),
            threading: EncodeThreading::default(),
        }
    }
}

impl AssembleOptions {
    pub fn validate(&self) -> CastResult<()> {
        if let Some(fr) = self.frame_rate
            && !FRAME_RATE_OVERRIDE_RANGE.contains(&fr)
        {
            return Err(CastError::validation(format!(
                "frame_rate must be in {}..={}, got {fr}",
                FRAME_RATE_OVERRIDE_RANGE.start(),
                FRAME_RATE_OVERRIDE_RANGE.end()
            )));
        }
        if self.quality > 100 {
            return Err(CastError::validation("quality must be in 0..=100"));
        }
        if let Some(n) = self.threading.threads
            && n == 0
        {
            return Err(CastError::validation(
                "encode threading 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

/// `clamp(round(1000 * n / total_ms), 10, 60)`.
pub fn derive_frame_rate(frame_count: usize, total_duration_ms: f64) -> u32 {
    if frame_count == 0 || !total_duration_ms.is_finite() || total_duration_ms <= 0.0 {
        return MIN_DERIVED_FRAME_RATE;
    }
    let fps = (1000.0 * frame_count as f64 / total_duration_ms).round();
    fps.clamp(
        f64::from(MIN_DERIVED_FRAME_RATE),
        f64::from(MAX_DERIVED_FRAME_RATE),
    ) as u32
}

/// Tick span `[start, end]` of every frame, computed from absolute cumulative durations.
pub fn frame_spans(frames: &[TimedFrame], frame_rate: u32) -> Vec<(f64, f64)> {
    let ticks_per_ms = f64::from(frame_rate) / 1000.0;
    let mut elapsed_ms = 0.0;
    frames
        .iter()
        .map(|f| {
            let start = elapsed_ms * ticks_per_ms;
            let end = start + f.duration_ms() * ticks_per_ms;
            elapsed_ms += f.duration_ms();
            (start, end)
        })
        .collect()
}

/// Build an animation document with one image layer per frame.
///
/// Each layer references its own embedded asset and fades from full opacity at its
/// start tick to zero at its end tick.
#[tracing::instrument(skip(frames, opts, cancel), fields(frames = frames.len()))]
pub fn assemble(
    frames: &[TimedFrame],
    opts: &AssembleOptions,
    cancel: &CancelToken,
) -> CastResult<AnimationDocument> {
    opts.validate()?;
    let first = frames
        .first()
        .ok_or_else(|| CastError::empty_input("no frames to assemble"))?;
    let (width, height) = first.frame().dimensions();
    for (i, f) in frames.iter().enumerate() {
        if f.frame().dimensions() != (width, height) {
            return Err(CastError::invalid_input(format!(
                "frame is {}x{} but the canvas is {width}x{height}",
                f.frame().width(),
                f.frame().height()
            ))
            .at_frame(Stage::Assemble, i));
        }
    }

    let total_duration_ms: f64 = frames.iter().map(TimedFrame::duration_ms).sum();
    let frame_rate = opts
        .frame_rate
        .unwrap_or_else(|| derive_frame_rate(frames.len(), total_duration_ms));
    tracing::info!(
        frames = frames.len(),
        frame_rate,
        total_duration_ms,
        format = ?opts.format,
        "assembling animation"
    );

    let encoded = encode_all(frames, opts, cancel)?;

    let mut doc = AnimationDocument::new(opts.name.clone(), frame_rate, width, height);
    doc.out_tick = total_duration_ms * f64::from(frame_rate) / 1000.0;
    doc.assets.reserve(frames.len());
    doc.layers.reserve(frames.len());

    for (i, ((start, end), still)) in frame_spans(frames, frame_rate)
        .into_iter()
        .zip(encoded)
        .enumerate()
    {
        let asset_id = format!("image_{i}");
        doc.assets
            .push(Asset::embedded(asset_id.clone(), width, height, still.data_uri()));
        let opacity = Property::keyframed(vec![
            Keyframe::at(start, 100.0).ending_at(0.0),
            Keyframe::at(end, 0.0),
        ]);
        doc.layers.push(
            Layer::image(
                i as u32,
                format!("Frame {i}"),
                asset_id,
                Transform::centered(width, height).with_opacity(opacity),
            )
            .spanning(start, end),
        );
    }

    doc.validate()?;
    Ok(doc)
}

fn encode_all(
    frames: &[TimedFrame],
    opts: &AssembleOptions,
    cancel: &CancelToken,
) -> CastResult<Vec<EncodedStill>> {
    let encode_one = |i: usize, f: &TimedFrame| -> CastResult<EncodedStill> {
        cancel.check("assembly cancelled")?;
        let still = encode_frame(f.frame(), opts.format, opts.quality)
            .map_err(|e| e.at_frame(Stage::Encode, i))?;
        tracing::debug!(frame = i, bytes = still.payload.len(), "encoded asset");
        Ok(still)
    };

    if !opts.threading.parallel || frames.len() < 2 {
        return frames
            .iter()
            .enumerate()
            .map(|(i, f)| encode_one(i, f))
            .collect();
    }

    let pool = build_thread_pool(opts.threading.threads)?;
    pool.install(|| {
        frames
            .par_iter()
            .enumerate()
            .map(|(i, f)| encode_one(i, f))
            .collect::<Vec<_>>()
    })
    .into_iter()
    .collect()
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> CastResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CastError::validation(
            "encode threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CastError::encoding(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/document/assemble.rs"]
mod tests;
