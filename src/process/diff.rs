use std::borrow::Cow;

use crate::foundation::{error::CastResult, frame::Frame};

/// Normalized dissimilarity between two frames, in `[0, 1]`.
///
/// Mean absolute difference over R, G and B of every pixel, divided by 255; alpha is
/// ignored. When sizes differ, `b` is resampled to `a`'s size with a Catmull-Rom filter
/// first.
pub fn frame_difference(a: &Frame, b: &Frame) -> CastResult<f64> {
    a.validate()?;
    b.validate()?;

    let b: Cow<'_, [u8]> = if a.dimensions() == b.dimensions() {
        Cow::Borrowed(b.as_rgba8())
    } else {
        let resized = image::imageops::resize(
            &b.to_rgba_image()?,
            a.width(),
            a.height(),
            image::imageops::FilterType::CatmullRom,
        );
        Cow::Owned(resized.into_raw())
    };

    let mut sum = 0u64;
    for (pa, pb) in a.as_rgba8().chunks_exact(4).zip(b.chunks_exact(4)) {
        for c in 0..3 {
            sum += u64::from(pa[c].abs_diff(pb[c]));
        }
    }

    let samples = (a.pixel_count() * 3) as f64;
    Ok((sum as f64 / samples / 255.0).clamp(0.0, 1.0))
}
