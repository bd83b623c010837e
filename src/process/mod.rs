//! Per-frame raster operations: background removal, frame difference and downscaling,
//! plus the circular crop used by the still-image tools.

pub mod crop;
pub mod diff;
pub mod optimize;
pub mod remove;
