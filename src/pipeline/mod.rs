//! Pipeline drivers: frame extraction and the file-to-file conversion built on it.

/// File-level conversion with presets and JSON configuration.
pub mod convert;
/// Sampling, duplicate elision, removal and resizing over a frame source.
pub mod extract;
