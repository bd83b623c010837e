use crate::foundation::error::{CastError, CastResult};

/// One straight-alpha RGBA8 raster, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    rgba8: Vec<u8>,
}

impl Frame {
    /// Wrap an RGBA8 buffer; `rgba8.len()` must equal `width * height * 4`.
    pub fn new(width: u32, height: u32, rgba8: Vec<u8>) -> CastResult<Self> {
        if width == 0 || height == 0 {
            return Err(CastError::invalid_input(format!(
                "frame dimensions must be > 0 (got {width}x{height})"
            )));
        }
        let expected = (width as usize) * (height as usize) * 4;
        if rgba8.len() != expected {
            return Err(CastError::invalid_input(format!(
                "frame buffer has {} bytes, expected {expected} for {width}x{height} RGBA",
                rgba8.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8,
        })
    }

    /// A frame filled with one straight-alpha color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> CastResult<Self> {
        let px = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(px * 4);
        for _ in 0..px {
            data.extend_from_slice(&rgba);
        }
        Self::new(width, height, data)
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> CastResult<Self> {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }

    pub fn from_dynamic_image(img: image::DynamicImage) -> CastResult<Self> {
        Self::from_rgba_image(img.into_rgba8())
    }

    /// Copy into an `image` buffer for resampling and encoding.
    pub fn to_rgba_image(&self) -> CastResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.rgba8.clone()).ok_or_else(|| {
            CastError::invalid_input("frame buffer does not match its dimensions")
        })
    }

    pub fn into_rgba_image(self) -> CastResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.rgba8).ok_or_else(|| {
            CastError::invalid_input("frame buffer does not match its dimensions")
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn as_rgba8(&self) -> &[u8] {
        &self.rgba8
    }

    pub(crate) fn as_rgba8_mut(&mut self) -> &mut [u8] {
        &mut self.rgba8
    }

    /// RGBA of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.rgba8[off],
            self.rgba8[off + 1],
            self.rgba8[off + 2],
            self.rgba8[off + 3],
        ])
    }

    pub(crate) fn validate(&self) -> CastResult<()> {
        if self.width == 0 || self.height == 0 || self.rgba8.len() != self.pixel_count() * 4 {
            return Err(CastError::invalid_input(format!(
                "malformed frame {}x{} with {} bytes",
                self.width,
                self.height,
                self.rgba8.len()
            )));
        }
        Ok(())
    }
}

/// A retained frame and how long it stays on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedFrame {
    frame: Frame,
    /// Display duration in milliseconds, always finite and > 0.
    duration_ms: f64,
}

impl TimedFrame {
    pub fn new(frame: Frame, duration_ms: f64) -> CastResult<Self> {
        check_duration(duration_ms)?;
        Ok(Self { frame, duration_ms })
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }
}

pub(crate) fn check_duration(duration_ms: f64) -> CastResult<()> {
    if !duration_ms.is_finite() || duration_ms <= 0.0 {
        return Err(CastError::invalid_input(format!(
            "frame duration must be finite and > 0 ms (got {duration_ms})"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/frame.rs"]
mod tests;
