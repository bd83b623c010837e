use std::{
    io::{Cursor, Write as _},
    process::{Command, Stdio},
};

use crate::foundation::{
    caps::{Capabilities, DEFAULT_MODEL_COMMAND},
    error::{CastError, CastResult},
    frame::Frame,
};

/// A strategy that makes the background of a frame transparent.
///
/// Implementations keep the output dimensions equal to the input dimensions.
pub trait BackgroundRemover: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn remove(&self, frame: Frame) -> CastResult<Frame>;
}

/// Which background-removal strategy the extractor should use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalStrategy {
    /// Luminance threshold with edge protection ([`ThresholdRemover`]).
    #[default]
    Threshold,
    /// External segmentation model ([`ModelRemover`]).
    Model,
    /// Leave frames untouched.
    None,
}

/// Alpha attenuation for edge pixels close to a removal threshold.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SoftEdge {
    /// How far past a threshold (in luminance units) the attenuation band reaches.
    pub band: u8,
    /// Factor applied to the alpha of attenuated pixels, in `(0, 1]`.
    pub alpha_scale: f32,
}

impl Default for SoftEdge {
    fn default() -> Self {
        Self {
            band: 20,
            alpha_scale: 0.4,
        }
    }
}

/// Threshold policy for [`ThresholdRemover`].
///
/// A pixel is background when its luminance (unweighted RGB mean) is below
/// `dark_threshold` or above `light_threshold`. Background pixels whose gradient
/// magnitude exceeds `edge_tolerance` are kept to protect anti-aliased outlines.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RemovalPolicy {
    pub dark_threshold: Option<u8>,
    pub light_threshold: Option<u8>,
    pub edge_tolerance: f32,
    pub soft_edge: Option<SoftEdge>,
}

impl Default for RemovalPolicy {
    fn default() -> Self {
        Self {
            dark_threshold: Some(30),
            light_threshold: Some(200),
            edge_tolerance: 10.0,
            soft_edge: None,
        }
    }
}

impl RemovalPolicy {
    /// Remove dark pixels only.
    pub fn dark(threshold: u8) -> Self {
        Self {
            dark_threshold: Some(threshold),
            light_threshold: None,
            ..Self::default()
        }
    }

    /// Remove light pixels only.
    pub fn light(threshold: u8) -> Self {
        Self {
            dark_threshold: None,
            light_threshold: Some(threshold),
            ..Self::default()
        }
    }

    pub fn with_edge_tolerance(mut self, edge_tolerance: f32) -> Self {
        self.edge_tolerance = edge_tolerance;
        self
    }

    pub fn with_soft_edge(mut self, soft_edge: SoftEdge) -> Self {
        self.soft_edge = Some(soft_edge);
        self
    }

    pub fn validate(&self) -> CastResult<()> {
        if self.dark_threshold.is_none() && self.light_threshold.is_none() {
            return Err(CastError::validation(
                "removal policy needs a dark threshold, a light threshold, or both",
            ));
        }
        if !self.edge_tolerance.is_finite() || self.edge_tolerance < 0.0 {
            return Err(CastError::validation("edge_tolerance must be finite and >= 0"));
        }
        if let Some(soft) = self.soft_edge
            && !(soft.alpha_scale > 0.0 && soft.alpha_scale <= 1.0)
        {
            return Err(CastError::validation(
                "soft_edge.alpha_scale must be in (0, 1]",
            ));
        }
        Ok(())
    }

    fn is_background(&self, lum: f32) -> bool {
        let dark = self.dark_threshold.is_some_and(|t| lum < f32::from(t));
        let light = self.light_threshold.is_some_and(|t| lum > f32::from(t));
        dark || light
    }

    fn in_soft_band(&self, lum: f32, band: u8) -> bool {
        let band = f32::from(band);
        let dark = self
            .dark_threshold
            .is_some_and(|t| lum < f32::from(t) + band);
        let light = self
            .light_threshold
            .is_some_and(|t| lum > f32::from(t) - band);
        dark || light
    }
}

/// Per-pixel background classification, `true` where the pixel will be cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovalMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl RemovalMask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Number of pixels marked for removal.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }
}

/// Unweighted mean of R, G and B per pixel.
pub(crate) fn luminance_map(frame: &Frame) -> Vec<f32> {
    frame
        .as_rgba8()
        .chunks_exact(4)
        .map(|px| (f32::from(px[0]) + f32::from(px[1]) + f32::from(px[2])) / 3.0)
        .collect()
}

/// Gradient magnitude per pixel from neighbour differences along both axes.
///
/// The first column/row is replicated, so border differences along that axis are 0.
/// Rows that `lum` does not fully cover are left at 0.
pub(crate) fn gradient_map(lum: &[f32], width: u32, height: u32) -> Vec<f32> {
    let w = width as usize;
    let h = if w == 0 {
        0
    } else {
        (height as usize).min(lum.len() / w)
    };
    let mut out = vec![0.0f32; lum.len()];
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let left = if x == 0 { lum[i] } else { lum[i - 1] };
            let up = if y == 0 { lum[i] } else { lum[i - w] };
            let gx = lum[i] - left;
            let gy = lum[i] - up;
            out[i] = (gx * gx + gy * gy).sqrt();
        }
    }
    out
}

/// Compute which pixels `policy` would clear, without touching the frame.
pub fn removal_mask(frame: &Frame, policy: &RemovalPolicy) -> CastResult<RemovalMask> {
    frame.validate()?;
    policy.validate()?;

    let lum = luminance_map(frame);
    let grad = gradient_map(&lum, frame.width(), frame.height());
    let bits = lum
        .iter()
        .zip(&grad)
        .map(|(l, g)| policy.is_background(*l) && *g <= policy.edge_tolerance)
        .collect();

    Ok(RemovalMask {
        width: frame.width(),
        height: frame.height(),
        bits,
    })
}

/// Edge-preserving luminance threshold remover.
#[derive(Clone, Debug, Default)]
pub struct ThresholdRemover {
    policy: RemovalPolicy,
}

impl ThresholdRemover {
    pub fn new(policy: RemovalPolicy) -> CastResult<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &RemovalPolicy {
        &self.policy
    }
}

impl BackgroundRemover for ThresholdRemover {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn remove(&self, mut frame: Frame) -> CastResult<Frame> {
        frame.validate()?;

        let lum = luminance_map(&frame);
        let grad = gradient_map(&lum, frame.width(), frame.height());
        let policy = self.policy;

        for ((px, l), g) in frame
            .as_rgba8_mut()
            .chunks_exact_mut(4)
            .zip(&lum)
            .zip(&grad)
        {
            let near_edge = *g > policy.edge_tolerance;
            if !near_edge {
                if policy.is_background(*l) {
                    px[3] = 0;
                }
                continue;
            }
            if let Some(soft) = policy.soft_edge
                && policy.in_soft_band(*l, soft.band)
            {
                px[3] = (f32::from(px[3]) * soft.alpha_scale).round().clamp(0.0, 255.0) as u8;
            }
        }

        Ok(frame)
    }
}

/// Settings for the external segmentation model.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ModelRemoverConfig {
    /// Program to run.
    pub command: String,
    /// Arguments; the frame is written to stdin as PNG and a PNG is read back from stdout.
    pub args: Vec<String>,
}

impl Default for ModelRemoverConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_MODEL_COMMAND.to_string(),
            args: vec!["i".to_string(), "-".to_string(), "-".to_string()],
        }
    }
}

/// Background removal delegated to an external model process (e.g. `rembg`).
#[derive(Clone, Debug, Default)]
pub struct ModelRemover {
    cfg: ModelRemoverConfig,
}

impl ModelRemover {
    pub fn new(cfg: ModelRemoverConfig) -> CastResult<Self> {
        if cfg.command.trim().is_empty() {
            return Err(CastError::validation("model command must be non-empty"));
        }
        Ok(Self { cfg })
    }
}

impl BackgroundRemover for ModelRemover {
    fn name(&self) -> &'static str {
        "model"
    }

    fn remove(&self, frame: Frame) -> CastResult<Frame> {
        frame.validate()?;
        let (width, height) = frame.dimensions();

        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(frame.into_rgba_image()?)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| CastError::removal(format!("failed to encode model input png: {e}")))?;

        let mut child = Command::new(&self.cfg.command)
            .args(&self.cfg.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CastError::removal(format!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    self.cfg.command
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CastError::removal("failed to open model stdin"))?;
        let writer = std::thread::spawn(move || stdin.write_all(&png));

        let out = child
            .wait_with_output()
            .map_err(|e| CastError::removal(format!("failed to wait for model process: {e}")))?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(CastError::removal(format!(
                    "failed to write frame to model stdin: {e}"
                )));
            }
            Err(_) => return Err(CastError::removal("model stdin writer panicked")),
        }

        if !out.status.success() {
            return Err(CastError::removal(format!(
                "'{}' exited with {}: {}",
                self.cfg.command,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let mut rgba = image::load_from_memory(&out.stdout)
            .map_err(|e| CastError::removal(format!("model returned an unreadable image: {e}")))?
            .into_rgba8();
        if rgba.dimensions() != (width, height) {
            rgba = image::imageops::resize(
                &rgba,
                width,
                height,
                image::imageops::FilterType::Lanczos3,
            );
        }
        Frame::from_rgba_image(rgba)
    }
}

/// Build the remover for `strategy` using the capabilities probed at pipeline construction.
///
/// A model request without an available model falls back to the threshold remover.
pub fn select_remover(
    strategy: RemovalStrategy,
    policy: &RemovalPolicy,
    model: &ModelRemoverConfig,
    caps: &Capabilities,
) -> CastResult<Option<Box<dyn BackgroundRemover>>> {
    match strategy {
        RemovalStrategy::None => Ok(None),
        RemovalStrategy::Threshold => Ok(Some(Box::new(ThresholdRemover::new(*policy)?))),
        RemovalStrategy::Model if caps.model_remover => {
            Ok(Some(Box::new(ModelRemover::new(model.clone())?)))
        }
        RemovalStrategy::Model => {
            tracing::warn!(
                command = %model.command,
                "model background removal unavailable, falling back to threshold removal"
            );
            Ok(Some(Box::new(ThresholdRemover::new(*policy)?)))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/process/remove.rs"]
mod tests;
