use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use image::ImageEncoder as _;

use crate::foundation::{
    error::{CastError, CastResult},
    frame::Frame,
};

/// Still-image codec used for embedded assets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StillFormat {
    /// Lossless, exact alpha.
    Png,
    /// Lossless WebP.
    WebpLossless,
    /// Lossy WebP with alpha; smallest payloads.
    #[default]
    Webp,
}

impl StillFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::WebpLossless | Self::Webp => "image/webp",
        }
    }

    pub fn is_lossless(self) -> bool {
        !matches!(self, Self::Webp)
    }
}

/// An encoded still and its MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedStill {
    pub payload: Vec<u8>,
    pub mime_type: &'static str,
}

impl EncodedStill {
    /// `data:<mime>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            BASE64_STANDARD.encode(&self.payload)
        )
    }
}

/// Encode `frame` with `format`. `quality` (0..=100) only affects lossy WebP.
pub fn encode_frame(frame: &Frame, format: StillFormat, quality: u8) -> CastResult<EncodedStill> {
    frame.validate()?;
    if quality > 100 {
        return Err(CastError::validation("quality must be in 0..=100"));
    }

    let (w, h) = frame.dimensions();
    let mut payload = Vec::new();
    match format {
        StillFormat::Png => {
            image::codecs::png::PngEncoder::new_with_quality(
                Cursor::new(&mut payload),
                image::codecs::png::CompressionType::Best,
                image::codecs::png::FilterType::Adaptive,
            )
            .write_image(frame.as_rgba8(), w, h, image::ExtendedColorType::Rgba8)
            .map_err(|e| CastError::encoding(format!("png encode failed: {e}")))?;
        }
        StillFormat::WebpLossless => {
            image::codecs::webp::WebPEncoder::new_lossless(Cursor::new(&mut payload))
                .write_image(frame.as_rgba8(), w, h, image::ExtendedColorType::Rgba8)
                .map_err(|e| CastError::encoding(format!("lossless webp encode failed: {e}")))?;
        }
        StillFormat::Webp => {
            let mem = webp::Encoder::from_rgba(frame.as_rgba8(), w, h)
                .encode_simple(false, f32::from(quality))
                .map_err(|e| CastError::encoding(format!("webp encode failed: {e:?}")))?;
            payload.extend_from_slice(&mem);
        }
    }

    if payload.is_empty() {
        return Err(CastError::encoding(format!(
            "{format:?} encoder produced an empty payload"
        )));
    }

    Ok(EncodedStill {
        payload,
        mime_type: format.mime_type(),
    })
}

/// Split a base64 data URI into its MIME type and decoded bytes.
pub fn parse_data_uri(uri: &str) -> CastResult<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CastError::validation("data uri must start with 'data:'"))?;
    let (mime, b64) = rest
        .split_once(";base64,")
        .ok_or_else(|| CastError::validation("data uri must be base64 encoded"))?;
    let bytes = BASE64_STANDARD
        .decode(b64)
        .map_err(|e| CastError::validation(format!("invalid base64 payload: {e}")))?;
    Ok((mime.to_string(), bytes))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/still.rs"]
mod tests;
