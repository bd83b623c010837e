use crate::foundation::{
    error::{CastError, CastResult},
    frame::Frame,
};

/// Downscale `frame` so its larger side is at most `max_dimension`.
///
/// Aspect ratio is preserved and the larger side lands exactly on `max_dimension`; the
/// smaller side is floored (never below 1). Frames already within the bound are returned
/// as-is without copying.
pub fn optimize_frame(frame: Frame, max_dimension: u32) -> CastResult<Frame> {
    if max_dimension == 0 {
        return Err(CastError::validation("max_dimension must be >= 1"));
    }
    frame.validate()?;

    let (w, h) = frame.dimensions();
    let larger = w.max(h);
    if larger <= max_dimension {
        return Ok(frame);
    }

    let (nw, nh) = scaled_dimensions(w, h, max_dimension);
    tracing::trace!(from = ?(w, h), to = ?(nw, nh), "downscaling frame");
    let resized = image::imageops::resize(
        &frame.into_rgba_image()?,
        nw,
        nh,
        image::imageops::FilterType::Lanczos3,
    );
    Frame::from_rgba_image(resized)
}

pub(crate) fn scaled_dimensions(w: u32, h: u32, max_dimension: u32) -> (u32, u32) {
    let larger = w.max(h);
    if larger <= max_dimension {
        return (w, h);
    }
    let ratio = f64::from(max_dimension) / f64::from(larger);
    let scale = |v: u32| ((f64::from(v) * ratio).floor() as u32).max(1);
    if w >= h {
        (max_dimension, scale(h))
    } else {
        (scale(w), max_dimension)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/process/optimize.rs"]
mod tests;
