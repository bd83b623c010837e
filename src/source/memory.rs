use std::collections::VecDeque;

use super::{FrameSource, SourceFrame, SourceInfo};
use crate::foundation::error::{CastError, CastResult};

/// Frames held in memory, e.g. produced by another decoder or a test.
#[derive(Debug)]
pub struct MemorySource {
    info: SourceInfo,
    frames: VecDeque<SourceFrame>,
}

impl MemorySource {
    /// All frames must share the first frame's dimensions.
    pub fn new(frames: Vec<SourceFrame>) -> CastResult<Self> {
        let first = frames
            .first()
            .ok_or_else(|| CastError::empty_input("memory source has no frames"))?;
        let (width, height) = first.frame().dimensions();

        for (i, f) in frames.iter().enumerate() {
            if f.frame().dimensions() != (width, height) {
                return Err(CastError::invalid_input(format!(
                    "frame {i} is {}x{}, expected {width}x{height}",
                    f.frame().width(),
                    f.frame().height()
                )));
            }
        }

        let total_ms: f64 = frames.iter().map(SourceFrame::duration_ms).sum();
        Ok(Self {
            info: SourceInfo {
                path: None,
                width,
                height,
                native_frame_rate: Some(1000.0 * frames.len() as f64 / total_ms),
                frame_count: Some(frames.len() as u64),
            },
            frames: frames.into(),
        })
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> CastResult<Option<SourceFrame>> {
        Ok(self.frames.pop_front())
    }
}
