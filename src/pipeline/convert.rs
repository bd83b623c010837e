use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context as _;

use crate::{
    document::{
        assemble::{
            AssembleOptions, DEFAULT_DOCUMENT_NAME, FRAME_RATE_OVERRIDE_RANGE, assemble,
        },
        model::AnimationDocument,
        store::{default_output_path, write_document},
    },
    foundation::{
        cancel::CancelToken,
        caps::Capabilities,
        error::{CastError, CastResult},
    },
    pipeline::extract::{ExtractOptions, ExtractStats, FrameExtractor},
    process::remove::RemovalStrategy,
    source::{FrameSource, open_source},
};

/// Everything one conversion run needs.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub extract: ExtractOptions,
    pub assemble: AssembleOptions,
    /// Replace an existing output file.
    pub overwrite: bool,
}

impl ConvertOptions {
    /// Load options from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> CastResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let opts: Self = serde_json::from_str(&raw).map_err(|e| {
            CastError::validation(format!("config '{}' is malformed: {e}", path.display()))
        })?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> CastResult<()> {
        self.extract.validate()?;
        self.assemble.validate()
    }

    pub fn preset(preset: Preset) -> Self {
        let mut opts = Self::default();
        preset.apply(&mut opts);
        opts
    }
}

/// Named option recipes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    #[default]
    Balanced,
    /// Model removal, 30 fps, tight duplicate threshold.
    HighQuality,
    /// 256 px, 15 fps, every other frame.
    Compact,
    /// 256 px, 20 fps, no background removal.
    Fast,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Self::Balanced, Self::HighQuality, Self::Compact, Self::Fast];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::HighQuality => "high-quality",
            Self::Compact => "compact",
            Self::Fast => "fast",
        }
    }

    /// Overwrite the sampling, sizing and removal fields of `opts`.
    pub fn apply(self, opts: &mut ConvertOptions) {
        let e = &mut opts.extract;
        let defaults = ExtractOptions::default();
        match self {
            Self::Balanced => {
                e.remove_background = defaults.remove_background;
                e.removal_strategy = defaults.removal_strategy;
                e.max_dimension = defaults.max_dimension;
                e.target_frame_rate = defaults.target_frame_rate;
                e.frame_skip_stride = defaults.frame_skip_stride;
                e.duplicate_threshold = defaults.duplicate_threshold;
            }
            Self::HighQuality => {
                e.remove_background = true;
                e.removal_strategy = RemovalStrategy::Model;
                e.max_dimension = 512;
                e.target_frame_rate = Some(30.0);
                e.frame_skip_stride = 1;
                e.duplicate_threshold = 0.01;
            }
            Self::Compact => {
                e.remove_background = true;
                e.removal_strategy = RemovalStrategy::Threshold;
                e.max_dimension = 256;
                e.target_frame_rate = Some(15.0);
                e.frame_skip_stride = 2;
                e.duplicate_threshold = 0.05;
            }
            Self::Fast => {
                e.remove_background = false;
                e.removal_strategy = RemovalStrategy::None;
                e.max_dimension = 256;
                e.target_frame_rate = Some(20.0);
                e.frame_skip_stride = 1;
                e.duplicate_threshold = defaults.duplicate_threshold;
            }
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown preset '{s}' (expected balanced, high-quality, compact or fast)")
            })
    }
}

/// Summary of a finished conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertReport {
    pub output: PathBuf,
    pub bytes: u64,
    pub frame_rate: u32,
    pub layers: usize,
    pub duration_secs: f64,
    pub stats: ExtractStats,
}

/// Capabilities a run with `opts` needs, probed once.
pub fn probe_capabilities(opts: &ConvertOptions) -> Capabilities {
    let model = (opts.extract.effective_strategy() == RemovalStrategy::Model)
        .then_some(opts.extract.model.command.as_str());
    Capabilities::probe_for(model)
}

/// Extract and assemble an already-opened source.
pub fn convert_source(
    source: &mut dyn FrameSource,
    opts: &ConvertOptions,
    caps: &Capabilities,
    cancel: &CancelToken,
) -> CastResult<(AnimationDocument, ExtractStats)> {
    opts.validate()?;
    let extractor = FrameExtractor::new(opts.extract.clone(), caps)?;
    let extraction = extractor.extract(source, cancel)?;
    let assemble_opts = assemble_options_for(opts);
    let doc = assemble(&extraction.frames, &assemble_opts, cancel)?;
    Ok((doc, extraction.stats))
}

/// A resampled run plays at the target rate unless the document rate is pinned.
fn assemble_options_for(opts: &ConvertOptions) -> AssembleOptions {
    let mut assemble = opts.assemble.clone();
    if assemble.frame_rate.is_none()
        && let Some(target) = opts.extract.target_frame_rate
    {
        let lo = f64::from(*FRAME_RATE_OVERRIDE_RANGE.start());
        let hi = f64::from(*FRAME_RATE_OVERRIDE_RANGE.end());
        assemble.frame_rate = Some(target.round().clamp(lo, hi) as u32);
    }
    assemble
}

/// Convert the animation at `input` into a document at `output`
/// (default: `<stem>_lottie.json` next to the input).
///
/// Nothing is written unless the whole run succeeds.
#[tracing::instrument(skip(opts, cancel))]
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    opts: &ConvertOptions,
    cancel: &CancelToken,
) -> CastResult<ConvertReport> {
    opts.validate()?;
    let output = output.map_or_else(|| default_output_path(input), Path::to_path_buf);
    if output.exists() && !opts.overwrite {
        return Err(CastError::invalid_input(format!(
            "'{}' already exists (pass overwrite to replace it)",
            output.display()
        )));
    }

    let mut opts = opts.clone();
    if opts.assemble.name == DEFAULT_DOCUMENT_NAME
        && let Some(stem) = input.file_stem().and_then(|s| s.to_str())
    {
        opts.assemble.name = stem.to_string();
    }

    let caps = probe_capabilities(&opts);
    let mut source = open_source(input, &caps)?;
    let (doc, stats) = convert_source(source.as_mut(), &opts, &caps, cancel)?;
    drop(source);

    cancel.check("conversion cancelled before write")?;
    let bytes = write_document(&output, &doc, opts.overwrite)?;
    Ok(ConvertReport {
        output,
        bytes,
        frame_rate: doc.frame_rate,
        layers: doc.layers.len(),
        duration_secs: doc.duration_secs(),
        stats,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/convert.rs"]
mod tests;
