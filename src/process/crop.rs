use crate::foundation::{error::CastResult, frame::Frame};

/// Outline painted just inside the edge of a circular crop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Ring {
    /// Thickness in pixels, measured inward from the circle.
    pub width: u32,
    pub rgba: [u8; 4],
}

impl Default for Ring {
    fn default() -> Self {
        Self {
            width: 8,
            rgba: [255, 215, 0, 255],
        }
    }
}

/// Crop the centred square of `frame` and clear everything outside its inscribed circle.
///
/// A pixel belongs to the disc when its centre lies within the circle. With `ring`, disc
/// pixels within `ring.width` of the circle take the ring colour.
pub fn circular_crop(frame: Frame, ring: Option<Ring>) -> CastResult<Frame> {
    frame.validate()?;

    let (w, h) = frame.dimensions();
    let size = w.min(h);
    let img = frame.into_rgba_image()?;
    let mut out = if w == h {
        img
    } else {
        image::imageops::crop_imm(&img, (w - size) / 2, (h - size) / 2, size, size).to_image()
    };

    let radius = f64::from(size) / 2.0;
    let band = ring.map(|r| (radius - f64::from(r.width), r.rgba));
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = f64::from(x) + 0.5 - radius;
        let dy = f64::from(y) + 0.5 - radius;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > radius {
            px.0 = [0, 0, 0, 0];
        } else if let Some((inner, rgba)) = band
            && dist > inner
        {
            px.0 = rgba;
        }
    }
    tracing::debug!(from = ?(w, h), size, ring = ?ring, "circular crop");
    Frame::from_rgba_image(out)
}

#[cfg(test)]
#[path = "../../tests/unit/process/crop.rs"]
mod tests;
