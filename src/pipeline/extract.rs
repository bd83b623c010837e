use crate::{
    foundation::{
        cancel::CancelToken,
        caps::Capabilities,
        error::{CastError, CastResult, Stage},
        frame::{Frame, TimedFrame},
    },
    process::{
        diff::frame_difference,
        optimize::optimize_frame,
        remove::{
            BackgroundRemover, ModelRemoverConfig, RemovalPolicy, RemovalStrategy, select_remover,
        },
    },
    source::FrameSource,
};

/// Retained frames between progress log lines.
const PROGRESS_EVERY: usize = 10;

/// Options for [`FrameExtractor`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub remove_background: bool,
    pub removal_strategy: RemovalStrategy,
    /// Threshold policy; also used when a model request falls back.
    pub policy: RemovalPolicy,
    pub model: ModelRemoverConfig,
    /// Bound on the larger side of every output frame.
    pub max_dimension: u32,
    /// Resample to this rate; native timing is kept when unset.
    pub target_frame_rate: Option<f64>,
    /// Additional decimation applied on top of the rate-derived interval.
    pub frame_skip_stride: u32,
    /// Frames closer than this to the last retained frame are dropped; 0 disables.
    pub duplicate_threshold: f64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            remove_background: true,
            removal_strategy: RemovalStrategy::Threshold,
            policy: RemovalPolicy::default(),
            model: ModelRemoverConfig::default(),
            max_dimension: 512,
            target_frame_rate: None,
            frame_skip_stride: 1,
            duplicate_threshold: 0.02,
        }
    }
}

impl ExtractOptions {
    pub fn validate(&self) -> CastResult<()> {
        if self.max_dimension == 0 {
            return Err(CastError::validation("max_dimension must be >= 1"));
        }
        if self.frame_skip_stride == 0 {
            return Err(CastError::validation("frame_skip_stride must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.duplicate_threshold) {
            return Err(CastError::validation("duplicate_threshold must be in [0, 1]"));
        }
        if let Some(fps) = self.target_frame_rate
            && (!fps.is_finite() || fps <= 0.0)
        {
            return Err(CastError::validation(
                "target_frame_rate must be finite and > 0 when set",
            ));
        }
        if self.remove_background && self.removal_strategy != RemovalStrategy::None {
            self.policy.validate()?;
        }
        Ok(())
    }

    /// Remover actually in effect.
    pub fn effective_strategy(&self) -> RemovalStrategy {
        if self.remove_background {
            self.removal_strategy
        } else {
            RemovalStrategy::None
        }
    }
}

/// Counters for one extraction run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Frames read from the source.
    pub source_frames: u64,
    /// Frames that landed on the sampling interval.
    pub sampled: u64,
    /// Sampled frames dropped as near-duplicates.
    pub duplicates_skipped: u64,
    /// Frames in the output.
    pub retained: u64,
}

/// Output of [`FrameExtractor::extract`].
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub frames: Vec<TimedFrame>,
    pub stats: ExtractStats,
}

/// Every `interval`-th source frame is considered.
///
/// `max(1, round(native / target)) * stride`; without both rates only the stride applies.
pub fn sampling_interval(native_rate: Option<f64>, target_rate: Option<f64>, stride: u32) -> u64 {
    let base = match (native_rate, target_rate) {
        (Some(native), Some(target)) if native.is_finite() && native > 0.0 && target > 0.0 => {
            (native / target).round().max(1.0) as u64
        }
        _ => 1,
    };
    base.saturating_mul(u64::from(stride.max(1)))
}

/// Drives a [`FrameSource`] through sampling, duplicate elision, background removal and
/// resizing, in source order.
pub struct FrameExtractor {
    opts: ExtractOptions,
    remover: Option<Box<dyn BackgroundRemover>>,
}

impl std::fmt::Debug for FrameExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameExtractor")
            .field("opts", &self.opts)
            .field("remover", &self.remover.as_ref().map(|r| r.name()))
            .finish()
    }
}

impl FrameExtractor {
    /// Validate `opts` and pick the remover from the probed capabilities.
    pub fn new(opts: ExtractOptions, caps: &Capabilities) -> CastResult<Self> {
        opts.validate()?;
        let remover = select_remover(opts.effective_strategy(), &opts.policy, &opts.model, caps)?;
        Ok(Self { opts, remover })
    }

    /// Use a caller-supplied remover instead of the configured strategy.
    pub fn with_remover(
        opts: ExtractOptions,
        remover: Box<dyn BackgroundRemover>,
    ) -> CastResult<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            remover: Some(remover),
        })
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.opts
    }

    pub fn remover_name(&self) -> Option<&'static str> {
        self.remover.as_ref().map(|r| r.name())
    }

    /// Pull every frame from `source`.
    ///
    /// The duplicate baseline is the last retained frame after processing; dropped
    /// frames never replace it. An empty result is returned as-is.
    #[tracing::instrument(skip(self, source, cancel))]
    pub fn extract(
        &self,
        source: &mut dyn FrameSource,
        cancel: &CancelToken,
    ) -> CastResult<Extraction> {
        let info = source.info().clone();
        let interval = sampling_interval(
            info.native_frame_rate,
            self.opts.target_frame_rate,
            self.opts.frame_skip_stride,
        );
        let fixed_duration_ms = self.opts.target_frame_rate.map(|fps| 1000.0 / fps);
        tracing::info!(
            width = info.width,
            height = info.height,
            native_fps = ?info.native_frame_rate,
            target_fps = ?self.opts.target_frame_rate,
            interval,
            remover = self.remover_name().unwrap_or("none"),
            "extracting frames"
        );

        let mut stats = ExtractStats::default();
        let mut frames: Vec<TimedFrame> = Vec::new();
        let mut index: usize = 0;

        loop {
            cancel.check("extraction cancelled")?;
            let Some(decoded) = source.next_frame().map_err(|e| wrap_decode(e, index))? else {
                break;
            };
            let i = index;
            index += 1;
            stats.source_frames += 1;

            if (i as u64) % interval != 0 {
                continue;
            }
            stats.sampled += 1;

            if self.opts.duplicate_threshold > 0.0
                && let Some(prev) = frames.last()
            {
                let score = frame_difference(prev.frame(), decoded.frame())
                    .map_err(|e| e.at_frame(Stage::Difference, i))?;
                if score < self.opts.duplicate_threshold {
                    stats.duplicates_skipped += 1;
                    tracing::debug!(frame = i, score, "skipping near-duplicate frame");
                    continue;
                }
            }

            let (frame, native_ms) = decoded.into_parts();
            let frame = self.process(frame, i)?;
            let duration_ms = fixed_duration_ms.unwrap_or(native_ms);
            let timed =
                TimedFrame::new(frame, duration_ms).map_err(|e| e.at_frame(Stage::Decode, i))?;
            frames.push(timed);
            stats.retained += 1;

            if frames.len() % PROGRESS_EVERY == 0 {
                tracing::info!(
                    retained = frames.len(),
                    read = stats.source_frames,
                    total = ?info.frame_count,
                    "extraction progress"
                );
            }
        }

        tracing::info!(
            source_frames = stats.source_frames,
            sampled = stats.sampled,
            duplicates = stats.duplicates_skipped,
            retained = stats.retained,
            "extraction finished"
        );
        Ok(Extraction { frames, stats })
    }

    fn process(&self, frame: Frame, index: usize) -> CastResult<Frame> {
        let frame = match &self.remover {
            Some(remover) => remover
                .remove(frame)
                .map_err(|e| e.at_frame(Stage::Removal, index))?,
            None => frame,
        };
        optimize_frame(frame, self.opts.max_dimension)
            .map_err(|e| e.at_frame(Stage::Optimize, index))
    }
}

fn wrap_decode(err: CastError, index: usize) -> CastError {
    match err {
        already @ CastError::AtFrame { .. } => already,
        other => other.at_frame(Stage::Decode, index),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/extract.rs"]
mod tests;
